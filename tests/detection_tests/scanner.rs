//! Scanner entry point tests

use std::io::Write;

use super::test_utils::{aead_rule, cipher_rule, ints, key_parameter_rule, scan, ENGINE};
use crypto_detection_core::rule::{SizeFactory, METHOD_LEVEL};
use crypto_detection_core::{
    CollectingReporter, DetectionRule, Language, NullReporter, Parameter, ScanConfig, Scanner,
};
use pretty_assertions::assert_eq;

const AEAD_SOURCE: &str = r#"
import org.bouncycastle.crypto.params.AEADParameters;
import org.bouncycastle.crypto.params.KeyParameter;

class Demo {
    void run(byte[] nonce) {
        KeyParameter key = new KeyParameter(new byte[16]);
        AEADParameters first = new AEADParameters(key, 128, nonce);
        AEADParameters second = new AEADParameters(key, 96, nonce);
    }
}
"#;

#[test]
fn test_scans_are_deterministic() {
    let scanner = Scanner::new(vec![aead_rule(key_parameter_rule())]);
    let first = scanner
        .scan_source(AEAD_SOURCE, "Demo.java", Language::Java, &mut NullReporter)
        .unwrap();
    let second = scanner
        .scan_source(AEAD_SOURCE, "Demo.java", Language::Java, &mut NullReporter)
        .unwrap();

    assert_eq!(first.findings.len(), 2);
    assert_eq!(first.findings, second.findings);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn test_reporter_sees_every_finding() {
    let (outcome, reporter) = scan(
        AEAD_SOURCE,
        "Demo.java",
        Language::Java,
        vec![aead_rule(key_parameter_rule())],
    );

    assert_eq!(reporter.findings().len(), outcome.findings.len());
    assert!(reporter.visited() >= 1);
}

#[test]
fn test_scan_file_by_extension() {
    let mut file = tempfile::Builder::new().suffix(".java").tempfile().unwrap();
    file.write_all(AEAD_SOURCE.as_bytes()).unwrap();

    let scanner = Scanner::new(vec![key_parameter_rule()]);
    let mut reporter = CollectingReporter::new();
    let outcome = scanner.scan_file(file.path(), &mut reporter).unwrap();

    assert_eq!(outcome.findings.len(), 1);
    assert_eq!(outcome.file_path, file.path().to_string_lossy());
}

#[test]
fn test_scan_file_unsupported_extension() {
    let file = tempfile::Builder::new().suffix(".rb").tempfile().unwrap();
    let scanner = Scanner::new(vec![key_parameter_rule()]);

    let result = scanner.scan_file(file.path(), &mut NullReporter);
    assert!(result.is_err());
}

#[test]
fn test_store_depth_limit() {
    let config = ScanConfig {
        max_store_depth: 1,
        ..ScanConfig::default()
    };
    let scanner = Scanner::with_config(vec![aead_rule(key_parameter_rule())], config);
    let outcome = scanner
        .scan_source(AEAD_SOURCE, "Demo.java", Language::Java, &mut NullReporter)
        .unwrap();

    assert_eq!(outcome.findings.len(), 2, "Roots sit at level zero");
    for finding in &outcome.findings {
        let keys = finding.root().children_at(0);
        assert!(keys.iter().all(|key| key.values().is_empty()));
    }
}

#[test]
fn test_rule_visit_counters_balance_for_sibling_stores() {
    let (outcome, reporter) = scan(
        r#"
import javax.crypto.Cipher;

class Demo {
    void run(java.security.Key key) throws Exception {
        Cipher cipher = Cipher.getInstance("AES");
        cipher.init(1, key);
        cipher.init(2, key);
    }
}
"#,
        "Demo.java",
        Language::Java,
        vec![cipher_rule()],
    );

    assert_eq!(outcome.findings.len(), 1);
    assert_eq!(outcome.findings[0].root().children_at(METHOD_LEVEL).len(), 2);
    assert_eq!(reporter.visited(), reporter.expected());
}

#[test]
fn test_rule_visit_counters_balance_for_moved_values() {
    let configure = DetectionRule::builder()
        .object_type(ENGINE)
        .method("configure")
        .parameter(Parameter::detectable("int", SizeFactory::key_bits()).move_under(METHOD_LEVEL))
        .build()
        .unwrap();
    let (outcome, reporter) = scan(
        "import com.example.Engine;\nclass Demo { void run() { Engine.configure(128); } }\n",
        "Demo.java",
        Language::Java,
        vec![configure],
    );

    assert_eq!(outcome.findings.len(), 1);
    let moved = outcome.findings[0].root().children_at(METHOD_LEVEL);
    assert_eq!(moved.len(), 1);
    assert_eq!(ints(&moved[0], 0), vec![128]);
    assert_eq!(reporter.visited(), reporter.expected());
}
