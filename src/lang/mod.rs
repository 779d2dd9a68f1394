//! Language adapter interface.
//!
//! The engine never looks at concrete node kinds. Everything it needs from a
//! front end (site classification, names, types, symbols, declarations) goes
//! through [`LanguageTranslation`] and [`LanguageSupport`].

pub mod imports;
pub mod java;
pub mod python;

pub use java::JavaSupport;
pub use python::PythonSupport;

use crate::engine::{Constant, Context, Language};
use crate::error::ParserError;
use crate::rule::MethodMatcher;
use std::hash::{Hash, Hasher};
use tree_sitter::{Node, Parser, Tree};

static JAVA: JavaSupport = JavaSupport;
static PYTHON: PythonSupport = PythonSupport;

pub fn support_for(language: Language) -> &'static dyn LanguageSupport {
    match language {
        Language::Java => &JAVA,
        Language::Python => &PYTHON,
    }
}

pub fn parse(source: &str, language: Language) -> Result<Tree, ParserError> {
    let mut parser = Parser::new();
    parser
        .set_language(&language.grammar())
        .map_err(|_| ParserError::language_setup_failed(language.tree_sitter_name()))?;
    parser
        .parse(source, None)
        .ok_or_else(|| ParserError::parse_failed("<source>"))
}

/// A node the matchers can evaluate.
#[derive(Debug, Clone, Copy)]
pub enum Site<'a> {
    Invocation(Node<'a>),
    Construction(Node<'a>),
    EnumSelection(Node<'a>),
}

impl<'a> Site<'a> {
    pub fn node(&self) -> Node<'a> {
        match self {
            Self::Invocation(node) | Self::Construction(node) | Self::EnumSelection(node) => *node,
        }
    }

    pub fn same_as(&self, other: &Site<'a>) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
            && self.node().id() == other.node().id()
    }

    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::Invocation(_) => "invocation",
            Self::Construction(_) => "construction",
            Self::EnumSelection(_) => "enum_selection",
        }
    }
}

/// Type predicate object for an invoked object or an argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectType {
    name: String,
    supertypes: Vec<String>,
}

impl ObjectType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            supertypes: Vec::new(),
        }
    }

    pub fn with_supertypes(mut self, supertypes: Vec<String>) -> Self {
        self.supertypes = supertypes;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn simple_name(&self) -> &str {
        simple_name(&self.name)
    }

    pub fn supertypes(&self) -> &[String] {
        &self.supertypes
    }

    /// Exact compares the type itself; otherwise supertypes count too.
    pub fn is(&self, candidate: &str, exact: bool) -> bool {
        if names_match(&self.name, candidate) {
            return true;
        }
        !exact && self.supertypes.iter().any(|s| names_match(s, candidate))
    }
}

/// Unqualified names (no import seen for them) compare on the simple name.
fn names_match(name: &str, candidate: &str) -> bool {
    if name == candidate {
        return true;
    }
    let name_qualified = name.contains('.');
    let candidate_qualified = candidate.contains('.');
    name_qualified != candidate_qualified && simple_name(name) == simple_name(candidate)
}

pub fn simple_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Local,
    Parameter,
    Field,
    EnumConstant,
}

/// A declared variable, identified by its declaring node.
#[derive(Debug, Clone)]
pub struct Symbol<'a> {
    name: String,
    declaration: Node<'a>,
    kind: SymbolKind,
}

impl<'a> Symbol<'a> {
    pub fn new(name: impl Into<String>, declaration: Node<'a>, kind: SymbolKind) -> Self {
        Self {
            name: name.into(),
            declaration,
            kind,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declaration(&self) -> Node<'a> {
        self.declaration
    }

    pub fn kind(&self) -> SymbolKind {
        self.kind
    }
}

impl PartialEq for Symbol<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.declaration.id() == other.declaration.id() && self.kind == other.kind
    }
}

impl Eq for Symbol<'_> {}

impl Hash for Symbol<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.declaration.id().hash(state);
        self.kind.hash(state);
    }
}

/// Resolution-relevant shape of an expression node.
#[derive(Debug, Clone)]
pub enum Expression<'a> {
    Literal(Constant),
    Variable(Symbol<'a>),
    /// Member selected on something that is not a known variable.
    Member { object: Node<'a>, member: String },
    EnumConstant {
        declaration: Node<'a>,
        constant: Node<'a>,
    },
    Call(Site<'a>),
    ArrayCreation {
        dimensions: Vec<Node<'a>>,
        rank: usize,
        elements: Option<usize>,
    },
    /// Parentheses, casts and other value-preserving wrappers.
    Wrapped(Node<'a>),
    Unknown,
}

/// Matchable facts about a site.
pub trait LanguageTranslation {
    /// Method name; constructors report `<init>`.
    fn method_name<'a>(&self, site: &Site<'a>, ctx: &Context<'a>) -> Option<String>;

    fn invoked_object_type<'a>(&self, site: &Site<'a>, ctx: &Context<'a>) -> Option<ObjectType>;

    /// One entry per argument; `None` when the argument type is unknown.
    fn parameter_types<'a>(&self, site: &Site<'a>, ctx: &Context<'a>) -> Vec<Option<ObjectType>>;

    fn enum_class_name<'a>(&self, site: &Site<'a>, ctx: &Context<'a>) -> Option<String>;

    fn enum_constant_name<'a>(&self, site: &Site<'a>, ctx: &Context<'a>) -> Option<String>;

    fn identifier_text<'a>(&self, node: Node<'a>, ctx: &Context<'a>) -> Option<String>;
}

/// Tree inspection primitives used by the engine.
pub trait LanguageSupport: LanguageTranslation + Send + Sync {
    fn language(&self) -> Language;

    fn as_translation(&self) -> &dyn LanguageTranslation;

    fn site<'a>(&self, node: Node<'a>, ctx: &Context<'a>) -> Option<Site<'a>>;

    fn arguments<'a>(&self, site: &Site<'a>) -> Vec<Node<'a>>;

    fn receiver<'a>(&self, site: &Site<'a>) -> Option<Node<'a>>;

    fn expression<'a>(&self, node: Node<'a>, ctx: &Context<'a>) -> Expression<'a>;

    /// Variable the value of `node` is assigned to, if any.
    fn assigned_symbol<'a>(&self, node: Node<'a>, ctx: &Context<'a>) -> Option<Symbol<'a>>;

    fn initializer<'a>(&self, symbol: &Symbol<'a>, ctx: &Context<'a>) -> Option<Node<'a>>;

    /// Right-hand sides of plain reassignments, in source order.
    fn assignments<'a>(&self, symbol: &Symbol<'a>, ctx: &Context<'a>) -> Vec<Node<'a>>;

    fn declared_type<'a>(&self, symbol: &Symbol<'a>, ctx: &Context<'a>) -> Option<ObjectType>;

    /// Subtree in which uses of `symbol` can appear.
    fn symbol_scope<'a>(&self, symbol: &Symbol<'a>, ctx: &Context<'a>) -> Node<'a>;

    fn enclosing_method<'a>(&self, node: Node<'a>) -> Option<Node<'a>>;

    /// Enclosing method, else enclosing type, else the unit root.
    fn enclosing_scope<'a>(&self, node: Node<'a>, ctx: &Context<'a>) -> Node<'a>;

    fn method_parameters<'a>(&self, method: Node<'a>, ctx: &Context<'a>) -> Vec<Symbol<'a>>;

    /// Returned expressions of `method`, excluding nested functions.
    fn method_returns<'a>(&self, method: Node<'a>) -> Vec<Node<'a>>;

    /// Unit-local definition an invocation dispatches to.
    fn method_definition<'a>(&self, site: &Site<'a>, ctx: &Context<'a>) -> Option<Node<'a>>;

    /// Reflect a method definition into a matcher for its call sites.
    fn method_matcher<'a>(&self, method: Node<'a>, ctx: &Context<'a>) -> Option<MethodMatcher>;

    fn enum_named<'a>(&self, type_name: &str, ctx: &Context<'a>) -> Option<Node<'a>>;

    fn enum_constant_arguments<'a>(&self, constant: Node<'a>) -> Vec<Node<'a>>;

    /// Parameter names of every constructor of an enum declaration.
    fn enum_constructor_parameters<'a>(
        &self,
        declaration: Node<'a>,
        ctx: &Context<'a>,
    ) -> Vec<Vec<String>>;

    fn constant_name<'a>(&self, constant: Node<'a>, ctx: &Context<'a>) -> String;

    /// Method declaring a parameter symbol and its position.
    fn parameter_position<'a>(
        &self,
        symbol: &Symbol<'a>,
        ctx: &Context<'a>,
    ) -> Option<(Node<'a>, usize)> {
        let method = self.enclosing_method(symbol.declaration())?;
        let index = self
            .method_parameters(method, ctx)
            .iter()
            .position(|p| p == symbol)?;
        Some((method, index))
    }

    /// Every site under `scope`, in pre-order.
    fn sites_in<'a>(&self, scope: Node<'a>, ctx: &Context<'a>) -> Vec<Site<'a>> {
        let mut sites = Vec::new();
        walk_preorder(scope, &mut |node: Node<'a>| {
            if let Some(site) = self.site(node, ctx) {
                sites.push(site);
            }
            true
        });
        sites
    }
}

/// Depth-first pre-order walk; returning `false` skips the node's children.
pub fn walk_preorder<'a, F>(node: Node<'a>, visit: &mut F)
where
    F: FnMut(Node<'a>) -> bool,
{
    if !visit(node) {
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk_preorder(child, visit);
    }
}

pub(crate) fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

pub(crate) fn ancestors(node: Node<'_>) -> impl Iterator<Item = Node<'_>> {
    std::iter::successors(node.parent(), |n| n.parent())
}
