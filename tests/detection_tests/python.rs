//! Python detection tests

use std::sync::Arc;

use super::test_utils::{ints, scan_python, strings};
use crypto_detection_core::rule::{MethodNameAction, NameFactory, SizeFactory, METHOD_LEVEL};
use crypto_detection_core::{DetectionRule, Parameter};
use pretty_assertions::assert_eq;

/// `hashlib.pbkdf2_hmac(hash_name, password, salt, iterations, dklen)`
fn pbkdf2_rule() -> Arc<DetectionRule> {
    DetectionRule::builder()
        .object_type("hashlib")
        .method("pbkdf2_hmac")
        .parameter(Parameter::detectable("str", NameFactory::algorithm()))
        .parameter(Parameter::new("bytes"))
        .parameter(Parameter::new("bytes"))
        .parameter(Parameter::new("int"))
        .parameter(Parameter::detectable("int", SizeFactory::key_bytes()))
        .build()
        .unwrap()
}

/// `hashlib.sha256()` followed by `update(...)` on the same name
fn sha256_rule() -> Arc<DetectionRule> {
    let update = DetectionRule::builder()
        .object_types(&["*"])
        .method("update")
        .any_parameters()
        .action(MethodNameAction)
        .build()
        .unwrap();
    DetectionRule::builder()
        .object_type("hashlib")
        .method("sha256")
        .any_parameters()
        .action(MethodNameAction)
        .next(update)
        .build()
        .unwrap()
}

#[test]
fn test_pbkdf2_literal_arguments() {
    let outcome = scan_python(
        r#"
import hashlib

def derive(password, salt):
    return hashlib.pbkdf2_hmac("sha256", password, salt, 100000, 32)
"#,
        vec![pbkdf2_rule()],
    );

    assert_eq!(outcome.findings.len(), 1);
    let root = outcome.findings[0].root();
    assert_eq!(strings(root, 0), vec!["sha256"]);
    assert_eq!(ints(root, 4), vec![32]);
}

#[test]
fn test_pbkdf2_module_variable() {
    let outcome = scan_python(
        r#"
import hashlib

length = 32

def derive(password, salt):
    return hashlib.pbkdf2_hmac("sha256", password, salt, 100000, length)
"#,
        vec![pbkdf2_rule()],
    );

    assert_eq!(outcome.findings.len(), 1);
    assert_eq!(ints(outcome.findings[0].root(), 4), vec![32]);
}

#[test]
fn test_unimported_module_does_not_match() {
    let outcome = scan_python(
        r#"
def derive(password, salt):
    return hashlib.pbkdf2_hmac("sha256", password, salt, 100000, 32)
"#,
        vec![pbkdf2_rule()],
    );

    assert!(outcome.findings.is_empty());
}

#[test]
fn test_next_rule_follows_assigned_name() {
    let outcome = scan_python(
        r#"
import hashlib

h = hashlib.sha256()
h.update(b"abc")
g = hashlib.md5()
g.update(b"x")
"#,
        vec![sha256_rule()],
    );

    assert_eq!(outcome.findings.len(), 1);
    let root = outcome.findings[0].root();
    assert_eq!(root.action().map(|a| a.value()), Some("sha256"));
    let updates = root.children_at(METHOD_LEVEL);
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].action().map(|a| a.value()), Some("update"));
}
