//! Import tables for qualifying type and module names.
//!
//! Each compilation unit gets a mapping from the short name visible in the
//! source to the fully qualified path it was imported from.

mod java;
mod python;

use crate::engine::Language;
use std::collections::HashMap;
use tree_sitter::{Node, Tree};

#[derive(Debug, Clone, Default)]
pub struct ImportMap {
    imports: HashMap<String, String>,
    wildcards: Vec<String>,
}

impl ImportMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, short_name: impl Into<String>, full_path: impl Into<String>) {
        self.imports.insert(short_name.into(), full_path.into());
    }

    /// `import a.b.*` / `from a.b import *`
    pub fn insert_wildcard(&mut self, package: impl Into<String>) {
        self.wildcards.push(package.into());
    }

    pub fn get(&self, short_name: &str) -> Option<&str> {
        self.imports.get(short_name).map(String::as_str)
    }

    pub fn wildcards(&self) -> &[String] {
        &self.wildcards
    }

    pub fn len(&self) -> usize {
        self.imports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.imports.is_empty() && self.wildcards.is_empty()
    }
}

pub fn extract_imports(tree: &Tree, source: &[u8], language: Language) -> ImportMap {
    match language {
        Language::Java => java::extract(tree, source),
        Language::Python => python::extract(tree, source),
    }
}

/// `package com.example;` for Java units.
pub fn extract_package(tree: &Tree, source: &[u8], language: Language) -> Option<String> {
    match language {
        Language::Java => java::extract_package(tree, source),
        Language::Python => None,
    }
}

fn node_text(node: &Node, source: &[u8]) -> String {
    node.utf8_text(source).unwrap_or("").to_string()
}
