//! Python import extraction
//!
//! - Simple: `import hashlib` binds `hashlib`
//! - Dotted: `import cryptography.hazmat` binds `cryptography`
//! - Aliased: `import hashlib as hl`
//! - From: `from hashlib import sha256, md5`
//! - From aliased: `from hashlib import sha256 as s256`
//! - Wildcard: `from hashlib import *`

use super::{node_text, ImportMap};
use tree_sitter::{Node, Tree};

pub fn extract(tree: &Tree, source: &[u8]) -> ImportMap {
    let mut imports = ImportMap::new();
    extract_recursive(tree.root_node(), source, &mut imports);
    imports
}

fn extract_recursive(node: Node, source: &[u8], imports: &mut ImportMap) {
    match node.kind() {
        "import_statement" => process_import_statement(node, source, imports),
        "import_from_statement" => process_from_import(node, source, imports),
        "function_definition" | "class_definition" => {}
        _ => {
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                extract_recursive(child, source, imports);
            }
        }
    }
}

fn process_import_statement(node: Node, source: &[u8], imports: &mut ImportMap) {
    let mut cursor = node.walk();
    for child in node.children_by_field_name("name", &mut cursor) {
        match child.kind() {
            "dotted_name" => {
                let module = node_text(&child, source);
                let bound = module.split('.').next().unwrap_or(&module).to_string();
                imports.insert(bound.as_str(), bound.as_str());
            }
            "aliased_import" => {
                let module = child.child_by_field_name("name").map(|n| node_text(&n, source));
                let alias = child.child_by_field_name("alias").map(|n| node_text(&n, source));
                if let (Some(module), Some(alias)) = (module, alias) {
                    imports.insert(alias, module);
                }
            }
            _ => {}
        }
    }
}

fn process_from_import(node: Node, source: &[u8], imports: &mut ImportMap) {
    let Some(module) = node
        .child_by_field_name("module_name")
        .map(|n| node_text(&n, source))
    else {
        return;
    };

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() == "wildcard_import" {
            imports.insert_wildcard(module.as_str());
        }
    }

    let mut cursor = node.walk();
    for child in node.children_by_field_name("name", &mut cursor) {
        match child.kind() {
            "dotted_name" | "identifier" => {
                let name = node_text(&child, source);
                imports.insert(name.as_str(), format!("{module}.{name}"));
            }
            "aliased_import" => {
                let name = child.child_by_field_name("name").map(|n| node_text(&n, source));
                let alias = child.child_by_field_name("alias").map(|n| node_text(&n, source));
                if let (Some(name), Some(alias)) = (name, alias) {
                    imports.insert(alias, format!("{module}.{name}"));
                }
            }
            _ => {}
        }
    }
}
