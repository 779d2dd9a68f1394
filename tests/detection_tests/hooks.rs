//! Outer-scope hook tests
//!
//! Values that only become known at a later call site of the enclosing
//! method are delivered through hooks registered on that method.

use super::test_utils::{
    aead_rule, configure_rule, ints, key_parameter_rule, scan, scan_java, scan_python,
    urandom_rule,
};
use crypto_detection_core::Language;
use pretty_assertions::assert_eq;

#[test]
fn test_parameter_hook_resolves_caller_argument() {
    let outcome = scan_java(
        r#"
import org.bouncycastle.crypto.params.KeyParameter;

class Demo {
    KeyParameter doStuff(byte[] keyBytes) {
        return new KeyParameter(keyBytes);
    }

    void run() {
        byte[] actualKeyBytes = new byte[32];
        doStuff(actualKeyBytes);
    }
}
"#,
        vec![key_parameter_rule()],
    );

    assert_eq!(outcome.findings.len(), 1);
    assert_eq!(ints(outcome.findings[0].root(), 0), vec![32]);
    assert_eq!(outcome.pending_hooks, 1, "Parameter hooks stay registered");
}

#[test]
fn test_parameter_hook_without_caller_keeps_nothing() {
    let outcome = scan_java(
        r#"
import org.bouncycastle.crypto.params.KeyParameter;

class Demo {
    KeyParameter doStuff(byte[] keyBytes) {
        return new KeyParameter(keyBytes);
    }
}
"#,
        vec![key_parameter_rule()],
    );

    assert!(outcome.findings.is_empty());
    assert_eq!(outcome.pending_hooks, 1);
}

#[test]
fn test_hook_firing_twice_emits_root_once() {
    let (outcome, reporter) = scan(
        r#"
import org.bouncycastle.crypto.params.KeyParameter;

class Demo {
    KeyParameter doStuff(byte[] keyBytes) {
        return new KeyParameter(keyBytes);
    }

    void run() {
        doStuff(new byte[32]);
        doStuff(new byte[16]);
    }
}
"#,
        "Demo.java",
        Language::Java,
        vec![key_parameter_rule()],
    );

    assert_eq!(reporter.findings().len(), 1, "Emitted on the first completion only");
    assert_eq!(ints(reporter.findings()[0].root(), 0), vec![32]);

    assert_eq!(outcome.findings.len(), 1);
    assert_eq!(ints(outcome.findings[0].root(), 0), vec![32, 16]);
}

#[test]
fn test_successive_parameter_hooks_reach_outer_caller() {
    let outcome = scan_java(
        r#"
import org.bouncycastle.crypto.params.KeyParameter;

class Demo {
    KeyParameter inner(byte[] k) {
        return new KeyParameter(k);
    }

    KeyParameter outer(byte[] bytes) {
        return inner(bytes);
    }

    void run() {
        byte[] raw = new byte[8];
        outer(raw);
    }
}
"#,
        vec![key_parameter_rule()],
    );

    assert_eq!(outcome.findings.len(), 1);
    assert_eq!(ints(outcome.findings[0].root(), 0), vec![8]);
    assert_eq!(outcome.pending_hooks, 2, "Both parameter hooks stay registered");
}

#[test]
fn test_rules_hook_follows_depending_parameter() {
    let outcome = scan_java(
        r#"
import org.bouncycastle.crypto.params.AEADParameters;
import org.bouncycastle.crypto.params.KeyParameter;

class Demo {
    AEADParameters wrap(KeyParameter key) {
        return new AEADParameters(key, 128, new byte[12]);
    }

    void run() {
        byte[] raw = new byte[16];
        wrap(new KeyParameter(raw));
    }
}
"#,
        vec![aead_rule(key_parameter_rule())],
    );

    assert_eq!(outcome.findings.len(), 1);
    let root = outcome.findings[0].root();
    assert_eq!(ints(root, 1), vec![128]);
    let keys = root.children_at(0);
    assert_eq!(keys.len(), 1, "KeyParameter found at the caller");
    assert_eq!(ints(&keys[0], 0), vec![16]);
}

#[test]
fn test_enum_hook_resolves_selected_constant() {
    let outcome = scan_java(
        r#"
import com.example.Engine;

class Demo {
    enum Algo {
        AES(128), DES(56);

        private final int keySize;

        Algo(int keySize) {
            this.keySize = keySize;
        }

        int getKeySize() {
            return keySize;
        }
    }

    void init(Algo algo) {
        Engine.configure(algo.getKeySize());
    }

    void run() {
        init(Algo.AES);
    }
}
"#,
        vec![configure_rule()],
    );

    assert_eq!(outcome.findings.len(), 1);
    assert_eq!(ints(outcome.findings[0].root(), 0), vec![128]);
}

#[test]
fn test_python_parameter_hook() {
    let outcome = scan_python(
        r#"
import os

def derive(length):
    return os.urandom(length)

derive(32)
"#,
        vec![urandom_rule()],
    );

    assert_eq!(outcome.findings.len(), 1);
    assert_eq!(ints(outcome.findings[0].root(), 0), vec![32]);
}

#[test]
fn test_python_parameter_hook_with_untyped_siblings() {
    let outcome = scan_python(
        r#"
import os

def derive(label, length):
    return os.urandom(length)

derive("session", 16)
"#,
        vec![urandom_rule()],
    );

    assert_eq!(outcome.findings.len(), 1);
    assert_eq!(ints(outcome.findings[0].root(), 0), vec![16]);
}
