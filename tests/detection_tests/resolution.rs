//! Inner-scope resolution tests

use super::test_utils::{configure_rule, ints, scan_java, select_rule, strings};
use pretty_assertions::assert_eq;

// =============================================================================
// Locals and fields
// =============================================================================

#[test]
fn test_initializer_then_reassignment() {
    let outcome = scan_java(
        r#"
import com.example.Engine;

class Demo {
    void run() {
        int size = 5;
        size = 7;
        Engine.configure(size);
    }
}
"#,
        vec![configure_rule()],
    );

    assert_eq!(outcome.findings.len(), 1);
    assert_eq!(ints(outcome.findings[0].root(), 0), vec![5, 7]);
}

#[test]
fn test_field_constant() {
    let outcome = scan_java(
        r#"
import com.example.Engine;

class Demo {
    private static final int KEY_BITS = 0x100;

    void run() {
        Engine.configure(KEY_BITS);
    }
}
"#,
        vec![configure_rule()],
    );

    assert_eq!(ints(outcome.findings[0].root(), 0), vec![256]);
}

#[test]
fn test_static_member_of_unit_type() {
    let outcome = scan_java(
        r#"
import com.example.Engine;

class Sizes {
    static final int LARGE = 4096;
}

class Demo {
    void run() {
        Engine.configure(Sizes.LARGE);
    }
}
"#,
        vec![configure_rule()],
    );

    assert_eq!(ints(outcome.findings[0].root(), 0), vec![4096]);
}

#[test]
fn test_parenthesized_and_cast() {
    let outcome = scan_java(
        r#"
import com.example.Engine;

class Demo {
    void run() {
        Engine.configure((int) (192));
    }
}
"#,
        vec![configure_rule()],
    );

    assert_eq!(ints(outcome.findings[0].root(), 0), vec![192]);
}

// =============================================================================
// Method returns
// =============================================================================

#[test]
fn test_local_method_return() {
    let outcome = scan_java(
        r#"
import com.example.Engine;

class Demo {
    int size() {
        return 256;
    }

    void run() {
        Engine.configure(size());
    }
}
"#,
        vec![configure_rule()],
    );

    assert_eq!(ints(outcome.findings[0].root(), 0), vec![256]);
}

#[test]
fn test_return_of_bound_parameter() {
    let outcome = scan_java(
        r#"
import com.example.Engine;

class Demo {
    int size(int bits) {
        return bits;
    }

    void run() {
        Engine.configure(size(192));
    }
}
"#,
        vec![configure_rule()],
    );

    assert_eq!(ints(outcome.findings[0].root(), 0), vec![192]);
}

// =============================================================================
// Member selections
// =============================================================================

#[test]
fn test_string_selection_applied() {
    let outcome = scan_java(
        r#"
import com.example.Engine;

class Demo {
    void run() {
        String mode = " gcm ";
        Engine.select(mode.trim().toUpperCase());
    }
}
"#,
        vec![select_rule()],
    );

    assert_eq!(strings(outcome.findings[0].root(), 0), vec!["GCM"]);
}

#[test]
fn test_enum_constant_accessor() {
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

    void run() {
        Engine.configure(Algo.AES.getKeySize());
    }
}
"#,
        vec![configure_rule()],
    );

    assert_eq!(outcome.findings.len(), 1);
    assert_eq!(ints(outcome.findings[0].root(), 0), vec![128]);
}

#[test]
fn test_enum_constant_name() {
    let outcome = scan_java(
        r#"
import com.example.Engine;

class Demo {
    enum Algo { AES, DES }

    void run() {
        Engine.select(Algo.DES.name());
    }
}
"#,
        vec![select_rule()],
    );

    assert_eq!(strings(outcome.findings[0].root(), 0), vec!["DES"]);
}

#[test]
fn test_unknown_selection_is_unresolved() {
    let outcome = scan_java(
        r#"
import com.example.Engine;

class Demo {
    void run() {
        String mode = "gcm";
        Engine.select(mode.substring(1));
    }
}
"#,
        vec![select_rule()],
    );

    assert!(outcome.findings.is_empty());
}
