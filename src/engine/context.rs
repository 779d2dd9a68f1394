/// Per-unit scan context.
///
/// This gives the engine and the language adapters access to:
/// - The parse tree and source of the compilation unit
/// - The unit's import table and package
/// - Cycle detection state for recursive resolution
use super::Language;
use crate::lang::imports::{extract_imports, extract_package, ImportMap};
use std::cell::{OnceCell, RefCell};
use std::collections::HashSet;
use std::path::Path;
use tree_sitter::{Node, Tree};

pub struct Context<'a> {
    /// The Tree-sitter parse tree
    tree: &'a Tree,

    /// Source code bytes
    source_code: &'a [u8],

    /// File path being analyzed
    file_path: String,

    /// Source language of the unit
    language: Language,

    /// Short name to qualified path
    imports: ImportMap,

    /// Declared package (Java)
    package: Option<String>,

    /// Named declarations, built once by the language adapter
    declarations: OnceCell<Vec<(String, Node<'a>)>>,

    /// Nodes on the current resolution path (cycle detection)
    visited_nodes: RefCell<HashSet<usize>>,
}

impl<'a> Context<'a> {
    pub fn new(
        tree: &'a Tree,
        source_code: &'a [u8],
        file_path: impl Into<String>,
        language: Language,
    ) -> Self {
        Self {
            tree,
            source_code,
            file_path: file_path.into(),
            language,
            imports: extract_imports(tree, source_code, language),
            package: extract_package(tree, source_code, language),
            declarations: OnceCell::new(),
            visited_nodes: RefCell::new(HashSet::new()),
        }
    }

    /// Get the parse tree
    pub fn tree(&self) -> &'a Tree {
        self.tree
    }

    pub fn root(&self) -> Node<'a> {
        self.tree.root_node()
    }

    /// Get the source code bytes
    pub fn source_code(&self) -> &'a [u8] {
        self.source_code
    }

    /// Get the file path
    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn imports(&self) -> &ImportMap {
        &self.imports
    }

    pub fn package(&self) -> Option<&str> {
        self.package.as_deref()
    }

    /// File stem, used as the module name of Python units.
    pub fn module_name(&self) -> String {
        Path::new(&self.file_path)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_string()
    }

    /// Unit declarations indexed by name; `build` runs on first access only.
    pub fn declarations(
        &self,
        build: impl FnOnce() -> Vec<(String, Node<'a>)>,
    ) -> &[(String, Node<'a>)] {
        self.declarations.get_or_init(build)
    }

    /// Get the source code text for a node
    /// Uses lossy UTF-8 conversion to handle invalid sequences gracefully
    pub fn get_node_text(&self, node: &Node) -> String {
        let start = node.start_byte();
        let end = node.end_byte();
        String::from_utf8_lossy(&self.source_code[start..end]).to_string()
    }

    /// Check if we've already visited this node (cycle detection)
    pub fn has_visited(&self, node: &Node) -> bool {
        self.visited_nodes.borrow().contains(&node.id())
    }

    /// Mark a node as visited
    pub fn mark_visited(&self, node: &Node) {
        self.visited_nodes.borrow_mut().insert(node.id());
    }

    /// Unmark a node as visited (for cycle detection cleanup)
    pub fn unmark_visited(&self, node: &Node) {
        self.visited_nodes.borrow_mut().remove(&node.id());
    }
}
