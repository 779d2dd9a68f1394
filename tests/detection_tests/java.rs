//! Java detection tests

use super::test_utils::{
    aead_rule, cipher_rule, configure_rule, ints, key_parameter_rule, scan_java, strings,
    KEY_PARAMETER,
};
use crypto_detection_core::rule::{NameFactory, SizeFactory, METHOD_LEVEL};
use crypto_detection_core::{DetectionRule, Parameter};
use pretty_assertions::assert_eq;

// =============================================================================
// Depending rules
// =============================================================================

#[test]
fn test_aead_parameters_with_local_key() {
    let outcome = scan_java(
        r#"
import org.bouncycastle.crypto.params.AEADParameters;
import org.bouncycastle.crypto.params.KeyParameter;

class Demo {
    void run(byte[] nonce) {
        byte[] k = new byte[16];
        KeyParameter key = new KeyParameter(k);
        AEADParameters params = new AEADParameters(key, 128, nonce);
    }
}
"#,
        vec![aead_rule(key_parameter_rule())],
    );

    assert_eq!(outcome.findings.len(), 1, "One AEADParameters finding");
    let root = outcome.findings[0].root();
    let mac = root.values_at(1);
    assert_eq!(mac.len(), 1);
    assert_eq!(mac[0].to_string(), "128 bits");

    let keys = root.children_at(0);
    assert_eq!(keys.len(), 1, "KeyParameter followed through `key`");
    assert_eq!(ints(&keys[0], 0), vec![16]);
}

#[test]
fn test_aead_parameters_with_inline_key() {
    let outcome = scan_java(
        r#"
import org.bouncycastle.crypto.params.AEADParameters;
import org.bouncycastle.crypto.params.KeyParameter;

class Demo {
    void run(byte[] nonce) {
        AEADParameters params = new AEADParameters(new KeyParameter(new byte[32]), 64, nonce);
    }
}
"#,
        vec![aead_rule(key_parameter_rule())],
    );

    assert_eq!(outcome.findings.len(), 1);
    let root = outcome.findings[0].root();
    assert_eq!(ints(root, 1), vec![64]);
    assert_eq!(ints(&root.children_at(0)[0], 0), vec![32]);
}

// =============================================================================
// Next rules and trace correlation
// =============================================================================

#[test]
fn test_next_rules_follow_the_same_variable() {
    let outcome = scan_java(
        r#"
import javax.crypto.Cipher;

class Demo {
    void run(java.security.Key key) throws Exception {
        Cipher cipher = Cipher.getInstance("AES/GCM/NoPadding");
        Cipher other = Cipher.getInstance("DES");
        cipher.init(1, key);
        other.init(2, key);
    }
}
"#,
        vec![cipher_rule()],
    );

    assert_eq!(outcome.findings.len(), 2, "One finding per getInstance");
    for finding in &outcome.findings {
        let inits = finding.root().children_at(METHOD_LEVEL);
        assert_eq!(inits.len(), 1, "Only the init on the same variable");
        assert_eq!(inits[0].action().map(|a| a.value()), Some("init"));
    }

    let first = outcome.findings[0].root();
    assert_eq!(strings(first, 0), vec!["AES/GCM/NoPadding"]);
    let init_line = first.children_at(METHOD_LEVEL)[0]
        .action()
        .map(|a| a.location().line);
    assert_eq!(init_line, Some(8));

    let second = outcome.findings[1].root();
    assert_eq!(strings(second, 0), vec!["DES"]);
    let init_line = second.children_at(METHOD_LEVEL)[0]
        .action()
        .map(|a| a.location().line);
    assert_eq!(init_line, Some(9));
}

#[test]
fn test_result_passed_as_argument_stops_next_rules() {
    let outcome = scan_java(
        r#"
import javax.crypto.Cipher;

class Demo {
    void run(java.security.Key key) throws Exception {
        use(Cipher.getInstance("AES"));
        Cipher cipher = Cipher.getInstance("DES");
        cipher.init(1, key);
    }
}
"#,
        vec![cipher_rule()],
    );

    assert_eq!(outcome.findings.len(), 2);
    let passed = outcome.findings[0].root();
    assert_eq!(strings(passed, 0), vec!["AES"]);
    assert!(passed.children_at(METHOD_LEVEL).is_empty());
}

#[test]
fn test_builder_chain_one_detection_per_call() {
    let with_key_size = DetectionRule::builder()
        .object_types(&["*"])
        .method("withKeySize")
        .parameter(Parameter::detectable("int", SizeFactory::key_bits()))
        .build()
        .unwrap();
    let create = DetectionRule::builder()
        .object_type("com.example.Builder")
        .method("create")
        .parameter(Parameter::detectable("java.lang.String", NameFactory::algorithm()))
        .next(with_key_size)
        .build()
        .unwrap();

    let outcome = scan_java(
        r#"
import com.example.Builder;

class Demo {
    void run() {
        Builder.create("RSA").withKeySize(2048).build();
    }
}
"#,
        vec![create],
    );

    assert_eq!(outcome.findings.len(), 1);
    let root = outcome.findings[0].root();
    assert_eq!(strings(root, 0), vec!["RSA"]);
    let chained = root.children_at(METHOD_LEVEL);
    assert_eq!(chained.len(), 1);
    assert_eq!(ints(&chained[0], 0), vec![2048]);
}

// =============================================================================
// Matching
// =============================================================================

#[test]
fn test_arity_must_match() {
    let outcome = scan_java(
        r#"
import com.example.Engine;

class Demo {
    void run() {
        Engine.configure(128, 2);
        Engine.configure();
    }
}
"#,
        vec![configure_rule()],
    );

    assert!(outcome.findings.is_empty());
    assert_eq!(outcome.stores, 0, "Unmatched roots are discarded");
}

#[test]
fn test_argument_type_mismatch() {
    let outcome = scan_java(
        r#"
import com.example.Engine;

class Demo {
    void run() {
        Engine.configure("128");
    }
}
"#,
        vec![configure_rule()],
    );

    assert!(outcome.findings.is_empty());
}

#[test]
fn test_unrelated_type_does_not_match() {
    let outcome = scan_java(
        r#"
import com.other.Engine;

class Demo {
    void run() {
        Engine.configure(128);
    }
}
"#,
        vec![configure_rule()],
    );

    assert!(outcome.findings.is_empty());
}

#[test]
fn test_multi_dimensional_array_is_not_sized() {
    let outcome = scan_java(
        r#"
import org.bouncycastle.crypto.params.KeyParameter;

class Demo {
    void run() {
        KeyParameter key = new KeyParameter(new byte[4][8]);
    }
}
"#,
        vec![DetectionRule::builder()
            .object_type(KEY_PARAMETER)
            .constructor()
            .parameter(Parameter::detectable("*", SizeFactory::key_bytes()))
            .build()
            .unwrap()],
    );

    assert!(outcome.findings.is_empty());
    assert_eq!(outcome.stores, 0);
}
