//! Shared rule catalog and scan helpers for the detection tests

use std::sync::Arc;

use crypto_detection_core::logging::{self, Verbosity};
use crypto_detection_core::rule::{MethodNameAction, NameFactory, SizeFactory};
use crypto_detection_core::{
    CollectingReporter, DetectionRule, FindingNode, Language, Parameter, ScanOutcome, Scanner,
};

pub const KEY_PARAMETER: &str = "org.bouncycastle.crypto.params.KeyParameter";
pub const AEAD_PARAMETERS: &str = "org.bouncycastle.crypto.params.AEADParameters";
pub const ENGINE: &str = "com.example.Engine";

/// Scan Java source code and return the outcome
pub fn scan_java(source: &str, rules: Vec<Arc<DetectionRule>>) -> ScanOutcome {
    scan(source, "Demo.java", Language::Java, rules).0
}

/// Scan Python source code and return the outcome
pub fn scan_python(source: &str, rules: Vec<Arc<DetectionRule>>) -> ScanOutcome {
    scan(source, "crypto_utils.py", Language::Python, rules).0
}

pub fn scan(
    source: &str,
    file_path: &str,
    language: Language,
    rules: Vec<Arc<DetectionRule>>,
) -> (ScanOutcome, CollectingReporter) {
    logging::init(Verbosity::Quiet);
    let scanner = Scanner::new(rules);
    let mut reporter = CollectingReporter::new();
    let outcome = scanner
        .scan_source(source, file_path, language, &mut reporter)
        .unwrap();
    (outcome, reporter)
}

/// Integer values detected at `index` of a node
pub fn ints(node: &FindingNode, index: i32) -> Vec<i64> {
    node.values_at(index).iter().filter_map(|v| v.as_int()).collect()
}

/// String values detected at `index` of a node
pub fn strings(node: &FindingNode, index: i32) -> Vec<String> {
    node.values_at(index)
        .iter()
        .map(|v| v.value().to_string())
        .collect()
}

// =============================================================================
// Rule catalog
// =============================================================================

/// `new KeyParameter(byte[] key)`, key size from the array length
pub fn key_parameter_rule() -> Arc<DetectionRule> {
    DetectionRule::builder()
        .object_type(KEY_PARAMETER)
        .constructor()
        .parameter(Parameter::detectable("byte[]", SizeFactory::key_bytes()))
        .build()
        .unwrap()
}

/// `new AEADParameters(KeyParameter key, int macSize, byte[] nonce)`
pub fn aead_rule(key_rule: Arc<DetectionRule>) -> Arc<DetectionRule> {
    DetectionRule::builder()
        .object_type(AEAD_PARAMETERS)
        .constructor()
        .parameter(Parameter::depending(KEY_PARAMETER, vec![key_rule]))
        .parameter(Parameter::detectable("int", SizeFactory::mac_bits()))
        .parameter(Parameter::new("byte[]"))
        .build()
        .unwrap()
}

/// `Engine.configure(int bits)`
pub fn configure_rule() -> Arc<DetectionRule> {
    DetectionRule::builder()
        .object_type(ENGINE)
        .method("configure")
        .parameter(Parameter::detectable("int", SizeFactory::key_bits()))
        .build()
        .unwrap()
}

/// `Engine.select(String name)`
pub fn select_rule() -> Arc<DetectionRule> {
    DetectionRule::builder()
        .object_type(ENGINE)
        .method("select")
        .parameter(Parameter::detectable("java.lang.String", NameFactory::algorithm()))
        .build()
        .unwrap()
}

/// `Cipher.getInstance(String)` followed by `init(...)` on the same variable
pub fn cipher_rule() -> Arc<DetectionRule> {
    let init = DetectionRule::builder()
        .object_type("javax.crypto.Cipher")
        .method("init")
        .any_parameters()
        .action(MethodNameAction)
        .build()
        .unwrap();
    DetectionRule::builder()
        .object_type("javax.crypto.Cipher")
        .method("getInstance")
        .parameter(Parameter::detectable("java.lang.String", NameFactory::algorithm()))
        .next(init)
        .build()
        .unwrap()
}

/// `os.urandom(int length)`
pub fn urandom_rule() -> Arc<DetectionRule> {
    DetectionRule::builder()
        .object_type("os")
        .method("urandom")
        .parameter(Parameter::detectable("int", SizeFactory::key_bytes()))
        .build()
        .unwrap()
}
