//! Python front end over tree-sitter-python.
//!
//! Every call is an invocation. Object types are import paths for module
//! functions, `<module>.<Class>` for unit-declared classes, and the
//! qualified callee of a variable's initializer for receivers.

use super::{
    ancestors, named_children, walk_preorder, Expression, LanguageSupport, LanguageTranslation,
    ObjectType, Site, Symbol, SymbolKind,
};
use crate::engine::lang_features::{is_bytes_literal, parse_int_literal};
use crate::engine::{Constant, Context, Language};
use crate::rule::{MethodMatcher, ANY};
use tracing::trace;
use tree_sitter::Node;

const MAX_TYPE_DEPTH: usize = 8;

#[derive(Debug, Clone, Copy, Default)]
pub struct PythonSupport;

fn is_scope_boundary(node: &Node) -> bool {
    matches!(node.kind(), "function_definition" | "class_definition" | "lambda")
}

fn arguments_of(call: Node<'_>) -> Vec<Node<'_>> {
    let Some(list) = call.child_by_field_name("arguments") else {
        return Vec::new();
    };
    named_children(list)
        .into_iter()
        .filter(|n| n.kind() != "comment")
        .filter_map(|n| match n.kind() {
            "keyword_argument" => n.child_by_field_name("value"),
            _ => Some(n),
        })
        .collect()
}

impl PythonSupport {
    fn unit_definitions<'c, 'a>(&self, ctx: &'c Context<'a>) -> &'c [(String, Node<'a>)] {
        ctx.declarations(|| {
            let mut definitions = Vec::new();
            walk_preorder(ctx.root(), &mut |node: Node<'a>| {
                if matches!(node.kind(), "function_definition" | "class_definition") {
                    if let Some(name) = node.child_by_field_name("name") {
                        definitions.push((ctx.get_node_text(&name), node));
                    }
                }
                true
            });
            definitions
        })
    }

    fn enclosing_class<'a>(&self, node: Node<'a>) -> Option<Node<'a>> {
        ancestors(node).find(|n| n.kind() == "class_definition")
    }

    /// Definition whose nearest enclosing class is `owner` (`None` for module level).
    fn definition_named<'a>(
        &self,
        name: &str,
        kind: &str,
        owner: Option<Node<'a>>,
        ctx: &Context<'a>,
    ) -> Option<Node<'a>> {
        self.unit_definitions(ctx)
            .iter()
            .find(|(declared, node)| {
                declared == name
                    && node.kind() == kind
                    && self.enclosing_class(*node).map(|c| c.id()) == owner.map(|o| o.id())
            })
            .map(|(_, node)| *node)
    }

    fn class_type<'a>(&self, class: Node<'a>, ctx: &Context<'a>) -> ObjectType {
        let name = class
            .child_by_field_name("name")
            .map(|n| ctx.get_node_text(&n))
            .unwrap_or_default();
        let supertypes = class
            .child_by_field_name("superclasses")
            .map(|list| {
                named_children(list)
                    .iter()
                    .filter_map(|base| self.dotted_path(*base, ctx))
                    .collect()
            })
            .unwrap_or_default();
        ObjectType::new(format!("{}.{name}", ctx.module_name())).with_supertypes(supertypes)
    }

    /// Qualified path of a name or attribute chain rooted at an import or a
    /// unit-level definition.
    fn dotted_path<'a>(&self, node: Node<'a>, ctx: &Context<'a>) -> Option<String> {
        match node.kind() {
            "identifier" => {
                let name = ctx.get_node_text(&node);
                if self.lookup(&name, node, ctx).is_some() {
                    return None;
                }
                if let Some(path) = ctx.imports().get(&name) {
                    return Some(path.to_string());
                }
                let declared = self.definition_named(&name, "function_definition", None, ctx)
                    .or_else(|| self.definition_named(&name, "class_definition", None, ctx));
                declared.map(|_| format!("{}.{name}", ctx.module_name()))
            }
            "attribute" => {
                let object = node.child_by_field_name("object")?;
                let attribute = node.child_by_field_name("attribute")?;
                let base = self.dotted_path(object, ctx)?;
                Some(format!("{base}.{}", ctx.get_node_text(&attribute)))
            }
            _ => None,
        }
    }

    /// `hashlib.sha256` for `hashlib.sha256(data)`.
    fn qualified_callee<'a>(&self, call: Node<'a>, ctx: &Context<'a>) -> Option<String> {
        let site = Site::Invocation(call);
        let object_type = self.invoked_object_type(&site, ctx)?;
        let name = self.method_name(&site, ctx)?;
        Some(format!("{}.{name}", object_type.name()))
    }

    fn value_type<'a>(
        &self,
        node: Node<'a>,
        ctx: &Context<'a>,
        depth: usize,
    ) -> Option<ObjectType> {
        if depth > MAX_TYPE_DEPTH {
            return None;
        }
        match node.kind() {
            "integer" => Some(ObjectType::new("int")),
            "float" => Some(ObjectType::new("float")),
            "true" | "false" => Some(ObjectType::new("bool")),
            "string" | "concatenated_string" => {
                let bytes = is_bytes_literal(&ctx.get_node_text(&node));
                Some(ObjectType::new(if bytes { "bytes" } else { "str" }))
            }
            "call" => self.qualified_callee(node, ctx).map(ObjectType::new),
            "parenthesized_expression" => {
                let inner = named_children(node).into_iter().next()?;
                self.value_type(inner, ctx, depth + 1)
            }
            "identifier" => {
                let symbol = self.lookup(&ctx.get_node_text(&node), node, ctx)?;
                let value = self.initializer(&symbol, ctx)?;
                if value.id() == node.id() {
                    return None;
                }
                self.value_type(value, ctx, depth + 1)
            }
            _ => None,
        }
    }

    fn lookup<'a>(&self, name: &str, from: Node<'a>, ctx: &Context<'a>) -> Option<Symbol<'a>> {
        for scope in ancestors(from) {
            let found = match scope.kind() {
                "function_definition" => self
                    .method_parameters(scope, ctx)
                    .into_iter()
                    .find(|p| p.name() == name)
                    .or_else(|| {
                        let body = scope.child_by_field_name("body")?;
                        self.first_assignment(name, body, ctx)
                    }),
                "lambda" => scope.child_by_field_name("parameters").and_then(|params| {
                    named_children(params)
                        .into_iter()
                        .find(|p| p.kind() == "identifier" && ctx.get_node_text(p) == name)
                        .map(|p| Symbol::new(name, p, SymbolKind::Parameter))
                }),
                "module" => self.first_assignment(name, scope, ctx),
                _ => None,
            };
            if found.is_some() {
                return found;
            }
        }
        None
    }

    /// First plain assignment to `name` in `scope`, outside nested definitions.
    fn first_assignment<'a>(
        &self,
        name: &str,
        scope: Node<'a>,
        ctx: &Context<'a>,
    ) -> Option<Symbol<'a>> {
        let mut found = None;
        walk_preorder(scope, &mut |node: Node<'a>| {
            if found.is_some() || is_scope_boundary(&node) {
                return false;
            }
            if node.kind() == "assignment" {
                if let Some(left) = node.child_by_field_name("left") {
                    if left.kind() == "identifier" && ctx.get_node_text(&left) == name {
                        found = Some(Symbol::new(name, left, SymbolKind::Local));
                        return false;
                    }
                }
            }
            true
        });
        found
    }

    /// `self.<name>` first assigned anywhere in the class's methods.
    fn field_named<'a>(
        &self,
        name: &str,
        class: Node<'a>,
        ctx: &Context<'a>,
    ) -> Option<Symbol<'a>> {
        let body = class.child_by_field_name("body")?;
        let mut found = None;
        walk_preorder(body, &mut |node: Node<'a>| {
            if found.is_some() || node.kind() == "class_definition" {
                return false;
            }
            if node.kind() == "assignment" {
                if let Some(left) = node.child_by_field_name("left") {
                    if self.self_attribute(left, ctx).as_deref() == Some(name) {
                        found = Some(Symbol::new(name, left, SymbolKind::Field));
                        return false;
                    }
                }
            }
            true
        });
        found
    }

    fn self_attribute(&self, node: Node, ctx: &Context) -> Option<String> {
        if node.kind() != "attribute" {
            return None;
        }
        let object = node.child_by_field_name("object")?;
        if object.kind() != "identifier" || ctx.get_node_text(&object) != "self" {
            return None;
        }
        node.child_by_field_name("attribute").map(|a| ctx.get_node_text(&a))
    }

    fn assignment_target<'a>(&self, left: Node<'a>, ctx: &Context<'a>) -> Option<Symbol<'a>> {
        match left.kind() {
            "identifier" => self.lookup(&ctx.get_node_text(&left), left, ctx),
            "attribute" => {
                let name = self.self_attribute(left, ctx)?;
                self.field_named(&name, self.enclosing_class(left)?, ctx)
            }
            _ => None,
        }
    }

    fn string_value(&self, node: Node, ctx: &Context) -> Option<String> {
        match node.kind() {
            "concatenated_string" => named_children(node)
                .into_iter()
                .map(|part| self.string_value(part, ctx))
                .collect(),
            "string" => {
                let mut value = String::new();
                for part in named_children(node) {
                    match part.kind() {
                        "string_content" | "escape_sequence" => {
                            value.push_str(&ctx.get_node_text(&part))
                        }
                        "interpolation" => return None,
                        _ => {}
                    }
                }
                Some(value)
            }
            _ => None,
        }
    }

    fn is_method(&self, function: Node) -> bool {
        let mut holder = function.parent();
        if holder.is_some_and(|h| h.kind() == "decorated_definition") {
            holder = holder.and_then(|h| h.parent());
        }
        holder
            .and_then(|block| block.parent())
            .is_some_and(|owner| owner.kind() == "class_definition")
    }

    fn accepts_arity<'a>(&self, function: Node<'a>, arity: usize, ctx: &Context<'a>) -> bool {
        let parameters = self.method_parameters(function, ctx);
        let required = parameters
            .iter()
            .filter(|p| {
                !matches!(
                    p.declaration().kind(),
                    "default_parameter" | "typed_default_parameter"
                )
            })
            .count();
        (required..=parameters.len()).contains(&arity)
    }
}

impl LanguageTranslation for PythonSupport {
    fn method_name<'a>(&self, site: &Site<'a>, ctx: &Context<'a>) -> Option<String> {
        let Site::Invocation(call) = site else {
            return None;
        };
        let function = call.child_by_field_name("function")?;
        match function.kind() {
            "identifier" => Some(ctx.get_node_text(&function)),
            "attribute" => function
                .child_by_field_name("attribute")
                .map(|a| ctx.get_node_text(&a)),
            _ => None,
        }
    }

    fn invoked_object_type<'a>(&self, site: &Site<'a>, ctx: &Context<'a>) -> Option<ObjectType> {
        let Site::Invocation(call) = site else {
            return None;
        };
        let function = call.child_by_field_name("function")?;
        match function.kind() {
            "identifier" => {
                let path = self.dotted_path(function, ctx)?;
                let (module, _) = path.rsplit_once('.')?;
                Some(ObjectType::new(module))
            }
            "attribute" => {
                let object = function.child_by_field_name("object")?;
                match object.kind() {
                    "identifier" if ctx.get_node_text(&object) == "self" => self
                        .enclosing_class(*call)
                        .map(|class| self.class_type(class, ctx)),
                    "identifier" => match self.lookup(&ctx.get_node_text(&object), object, ctx) {
                        Some(symbol) => self.declared_type(&symbol, ctx),
                        None => self.dotted_path(object, ctx).map(ObjectType::new),
                    },
                    "attribute" => {
                        if let Expression::Variable(symbol) = self.expression(object, ctx) {
                            return self.declared_type(&symbol, ctx);
                        }
                        self.dotted_path(object, ctx).map(ObjectType::new)
                    }
                    "call" => self.qualified_callee(object, ctx).map(ObjectType::new),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    fn parameter_types<'a>(&self, site: &Site<'a>, ctx: &Context<'a>) -> Vec<Option<ObjectType>> {
        self.arguments(site)
            .into_iter()
            .map(|argument| match argument.kind() {
                "integer" | "float" | "true" | "false" | "string" | "concatenated_string" => {
                    self.value_type(argument, ctx, 0)
                }
                _ => None,
            })
            .collect()
    }

    fn enum_class_name<'a>(&self, _site: &Site<'a>, _ctx: &Context<'a>) -> Option<String> {
        None
    }

    fn enum_constant_name<'a>(&self, _site: &Site<'a>, _ctx: &Context<'a>) -> Option<String> {
        None
    }

    fn identifier_text<'a>(&self, node: Node<'a>, ctx: &Context<'a>) -> Option<String> {
        match node.kind() {
            "identifier" => Some(ctx.get_node_text(&node)),
            "attribute" => node
                .child_by_field_name("attribute")
                .map(|a| ctx.get_node_text(&a)),
            "call" => self.method_name(&Site::Invocation(node), ctx),
            _ => None,
        }
    }
}

impl LanguageSupport for PythonSupport {
    fn language(&self) -> Language {
        Language::Python
    }

    fn as_translation(&self) -> &dyn LanguageTranslation {
        self
    }

    fn site<'a>(&self, node: Node<'a>, _ctx: &Context<'a>) -> Option<Site<'a>> {
        (node.kind() == "call").then_some(Site::Invocation(node))
    }

    fn arguments<'a>(&self, site: &Site<'a>) -> Vec<Node<'a>> {
        match site {
            Site::Invocation(call) => arguments_of(*call),
            _ => Vec::new(),
        }
    }

    fn receiver<'a>(&self, site: &Site<'a>) -> Option<Node<'a>> {
        let Site::Invocation(call) = site else {
            return None;
        };
        let function = call.child_by_field_name("function")?;
        (function.kind() == "attribute")
            .then(|| function.child_by_field_name("object"))
            .flatten()
    }

    fn expression<'a>(&self, node: Node<'a>, ctx: &Context<'a>) -> Expression<'a> {
        match node.kind() {
            "integer" => parse_int_literal(&ctx.get_node_text(&node), Language::Python)
                .map(|n| Expression::Literal(Constant::Int(n)))
                .unwrap_or(Expression::Unknown),
            "string" | "concatenated_string" => match self.string_value(node, ctx) {
                Some(value) => Expression::Literal(Constant::Str(value)),
                None => Expression::Unknown,
            },
            "true" => Expression::Literal(Constant::Bool(true)),
            "false" => Expression::Literal(Constant::Bool(false)),
            "identifier" => match self.lookup(&ctx.get_node_text(&node), node, ctx) {
                Some(symbol) => Expression::Variable(symbol),
                None => {
                    trace!(identifier = %ctx.get_node_text(&node), "unresolved name");
                    Expression::Unknown
                }
            },
            "attribute" => {
                if let Some(name) = self.self_attribute(node, ctx) {
                    let field = self
                        .enclosing_class(node)
                        .and_then(|class| self.field_named(&name, class, ctx));
                    if let Some(symbol) = field {
                        return Expression::Variable(symbol);
                    }
                }
                match (
                    node.child_by_field_name("object"),
                    node.child_by_field_name("attribute"),
                ) {
                    (Some(object), Some(attribute)) => Expression::Member {
                        object,
                        member: ctx.get_node_text(&attribute),
                    },
                    _ => Expression::Unknown,
                }
            }
            "call" => Expression::Call(Site::Invocation(node)),
            "list" | "tuple" => Expression::ArrayCreation {
                dimensions: Vec::new(),
                rank: 1,
                elements: Some(
                    named_children(node)
                        .iter()
                        .filter(|n| n.kind() != "comment")
                        .count(),
                ),
            },
            "parenthesized_expression" => named_children(node)
                .into_iter()
                .find(|n| n.kind() != "comment")
                .map(Expression::Wrapped)
                .unwrap_or(Expression::Unknown),
            "unary_operator" => {
                let operator = node
                    .child_by_field_name("operator")
                    .map(|o| ctx.get_node_text(&o));
                let Some(argument) = node.child_by_field_name("argument") else {
                    return Expression::Unknown;
                };
                match (operator.as_deref(), self.expression(argument, ctx)) {
                    (Some("-"), Expression::Literal(Constant::Int(n))) => {
                        Expression::Literal(Constant::Int(-n))
                    }
                    (Some("+"), _) => Expression::Wrapped(argument),
                    _ => Expression::Unknown,
                }
            }
            _ => Expression::Unknown,
        }
    }

    fn assigned_symbol<'a>(&self, node: Node<'a>, ctx: &Context<'a>) -> Option<Symbol<'a>> {
        let mut current = node;
        while let Some(parent) = current.parent() {
            match parent.kind() {
                "parenthesized_expression" => current = parent,
                "assignment" => {
                    let right = parent.child_by_field_name("right")?;
                    if right.id() != current.id() {
                        return None;
                    }
                    return self.assignment_target(parent.child_by_field_name("left")?, ctx);
                }
                _ => return None,
            }
        }
        None
    }

    fn initializer<'a>(&self, symbol: &Symbol<'a>, _ctx: &Context<'a>) -> Option<Node<'a>> {
        let declaration = symbol.declaration();
        let assignment = declaration.parent()?;
        if assignment.kind() != "assignment" {
            return None;
        }
        let left = assignment.child_by_field_name("left")?;
        if left.id() != declaration.id() {
            return None;
        }
        assignment.child_by_field_name("right")
    }

    fn assignments<'a>(&self, symbol: &Symbol<'a>, ctx: &Context<'a>) -> Vec<Node<'a>> {
        let scope = self.symbol_scope(symbol, ctx);
        let declaration = symbol.declaration();
        let mut values = Vec::new();
        walk_preorder(scope, &mut |node: Node<'a>| {
            if node.kind() != "assignment" {
                return true;
            }
            if let (Some(left), Some(right)) = (
                node.child_by_field_name("left"),
                node.child_by_field_name("right"),
            ) {
                if left.id() != declaration.id()
                    && self.assignment_target(left, ctx).as_ref() == Some(symbol)
                {
                    values.push(right);
                }
            }
            true
        });
        values
    }

    fn declared_type<'a>(&self, symbol: &Symbol<'a>, ctx: &Context<'a>) -> Option<ObjectType> {
        match symbol.kind() {
            SymbolKind::Parameter => {
                let annotation = symbol.declaration().child_by_field_name("type")?;
                let name = ctx.get_node_text(&annotation);
                let qualified = ctx.imports().get(&name).map(str::to_string).unwrap_or(name);
                Some(ObjectType::new(qualified))
            }
            SymbolKind::Local | SymbolKind::Field => {
                let value = self.initializer(symbol, ctx)?;
                self.value_type(value, ctx, 0)
            }
            SymbolKind::EnumConstant => None,
        }
    }

    fn symbol_scope<'a>(&self, symbol: &Symbol<'a>, ctx: &Context<'a>) -> Node<'a> {
        let declaration = symbol.declaration();
        match symbol.kind() {
            SymbolKind::Local => self.enclosing_scope(declaration, ctx),
            SymbolKind::Parameter => ancestors(declaration)
                .find(|n| matches!(n.kind(), "function_definition" | "lambda"))
                .unwrap_or_else(|| ctx.root()),
            SymbolKind::Field => self
                .enclosing_class(declaration)
                .unwrap_or_else(|| ctx.root()),
            SymbolKind::EnumConstant => ctx.root(),
        }
    }

    fn enclosing_method<'a>(&self, node: Node<'a>) -> Option<Node<'a>> {
        ancestors(node).find(|n| n.kind() == "function_definition")
    }

    fn enclosing_scope<'a>(&self, node: Node<'a>, ctx: &Context<'a>) -> Node<'a> {
        self.enclosing_method(node)
            .or_else(|| self.enclosing_class(node))
            .unwrap_or_else(|| ctx.root())
    }

    fn method_parameters<'a>(&self, method: Node<'a>, ctx: &Context<'a>) -> Vec<Symbol<'a>> {
        let Some(parameters) = method.child_by_field_name("parameters") else {
            return Vec::new();
        };
        let skip_receiver = self.is_method(method);
        let mut symbols: Vec<Symbol<'a>> = named_children(parameters)
            .into_iter()
            .filter_map(|parameter| {
                let name = match parameter.kind() {
                    "identifier" => Some(parameter),
                    "typed_parameter" => named_children(parameter)
                        .into_iter()
                        .find(|c| c.kind() == "identifier"),
                    "default_parameter" | "typed_default_parameter" => {
                        parameter.child_by_field_name("name")
                    }
                    _ => None,
                }?;
                Some(Symbol::new(
                    ctx.get_node_text(&name),
                    parameter,
                    SymbolKind::Parameter,
                ))
            })
            .collect();
        if skip_receiver && symbols.first().is_some_and(|p| matches!(p.name(), "self" | "cls")) {
            symbols.remove(0);
        }
        symbols
    }

    fn method_returns<'a>(&self, method: Node<'a>) -> Vec<Node<'a>> {
        let Some(body) = method.child_by_field_name("body") else {
            return Vec::new();
        };
        let mut returns = Vec::new();
        walk_preorder(body, &mut |node: Node<'a>| {
            if is_scope_boundary(&node) {
                return false;
            }
            if node.kind() == "return_statement" {
                returns.extend(named_children(node).into_iter().find(|n| n.kind() != "comment"));
                return false;
            }
            true
        });
        returns
    }

    fn method_definition<'a>(&self, site: &Site<'a>, ctx: &Context<'a>) -> Option<Node<'a>> {
        let Site::Invocation(call) = site else {
            return None;
        };
        let name = self.method_name(site, ctx)?;
        let function = call.child_by_field_name("function")?;
        let definition = match function.kind() {
            "identifier" => {
                if ctx.imports().get(&name).is_some() {
                    return None;
                }
                self.definition_named(&name, "function_definition", None, ctx)?
            }
            "attribute" => {
                let object = function.child_by_field_name("object")?;
                let is_self = object.kind() == "identifier" && ctx.get_node_text(&object) == "self";
                let class = if is_self {
                    self.enclosing_class(*call)?
                } else {
                    let owner = self.invoked_object_type(site, ctx)?;
                    let prefix = format!("{}.", ctx.module_name());
                    let class_name = owner.name().strip_prefix(&prefix)?.to_string();
                    self.definition_named(&class_name, "class_definition", None, ctx)?
                };
                self.definition_named(&name, "function_definition", Some(class), ctx)?
            }
            _ => return None,
        };
        self.accepts_arity(definition, self.arguments(site).len(), ctx)
            .then_some(definition)
    }

    fn method_matcher<'a>(&self, method: Node<'a>, ctx: &Context<'a>) -> Option<MethodMatcher> {
        let name = ctx.get_node_text(&method.child_by_field_name("name")?);
        let owner = if self.is_method(method) {
            self.class_type(self.enclosing_class(method)?, ctx).name().to_string()
        } else {
            ctx.module_name()
        };
        let parameter_types = vec![ANY.to_string(); self.method_parameters(method, ctx).len()];
        Some(MethodMatcher::for_definition(&owner, &name, parameter_types))
    }

    fn enum_named<'a>(&self, _type_name: &str, _ctx: &Context<'a>) -> Option<Node<'a>> {
        None
    }

    fn enum_constant_arguments<'a>(&self, _constant: Node<'a>) -> Vec<Node<'a>> {
        Vec::new()
    }

    fn enum_constructor_parameters<'a>(
        &self,
        _declaration: Node<'a>,
        _ctx: &Context<'a>,
    ) -> Vec<Vec<String>> {
        Vec::new()
    }

    fn constant_name<'a>(&self, constant: Node<'a>, ctx: &Context<'a>) -> String {
        ctx.get_node_text(&constant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::parse;

    const SOURCE: &str = r#"
import hashlib
from cryptography.hazmat.primitives.ciphers import Cipher, algorithms

KEY_SIZE = 32

def make_key(size):
    return size * 8

class Box:
    def __init__(self, key):
        self.key = key

    def seal(self, data):
        h = hashlib.sha256(data)
        h.update(b"pad")
        return self.encrypt(self.key, "AES")

    def encrypt(self, key, name="AES"):
        return Cipher(algorithms.AES(key), None)

x = make_key(KEY_SIZE)
"#;

    fn calls<'a>(node: Node<'a>) -> Vec<Node<'a>> {
        let mut found = Vec::new();
        walk_preorder(node, &mut |n: Node<'a>| {
            if n.kind() == "call" {
                found.push(n);
            }
            true
        });
        found
    }

    fn with_ctx<R>(f: impl for<'a> FnOnce(&Context<'a>) -> R) -> R {
        let tree = parse(SOURCE, Language::Python).unwrap();
        let ctx = Context::new(&tree, SOURCE.as_bytes(), "box.py", Language::Python);
        f(&ctx)
    }

    fn call_named<'a>(ctx: &Context<'a>, name: &str) -> Site<'a> {
        let py = PythonSupport;
        calls(ctx.root())
            .into_iter()
            .map(Site::Invocation)
            .find(|s| py.method_name(s, ctx).as_deref() == Some(name))
            .unwrap()
    }

    #[test]
    fn test_imported_callee_types() {
        with_ctx(|ctx| {
            let py = PythonSupport;
            let sha = call_named(ctx, "sha256");
            assert_eq!(py.invoked_object_type(&sha, ctx).unwrap().name(), "hashlib");

            let cipher = call_named(ctx, "Cipher");
            assert_eq!(
                py.invoked_object_type(&cipher, ctx).unwrap().name(),
                "cryptography.hazmat.primitives.ciphers"
            );
            let aes = call_named(ctx, "AES");
            assert_eq!(
                py.invoked_object_type(&aes, ctx).unwrap().name(),
                "cryptography.hazmat.primitives.ciphers.algorithms"
            );
        });
    }

    #[test]
    fn test_variable_receiver_uses_initializer_callee() {
        with_ctx(|ctx| {
            let py = PythonSupport;
            let update = call_named(ctx, "update");
            assert_eq!(
                py.invoked_object_type(&update, ctx).unwrap().name(),
                "hashlib.sha256"
            );
            let types = py.parameter_types(&update, ctx);
            assert_eq!(types[0].as_ref().unwrap().name(), "bytes");
        });
    }

    #[test]
    fn test_self_method_definition() {
        with_ctx(|ctx| {
            let py = PythonSupport;
            let encrypt = call_named(ctx, "encrypt");
            assert_eq!(py.invoked_object_type(&encrypt, ctx).unwrap().name(), "box.Box");
            let definition = py.method_definition(&encrypt, ctx).unwrap();
            let parameters: Vec<_> = py
                .method_parameters(definition, ctx)
                .iter()
                .map(|p| p.name().to_string())
                .collect();
            assert_eq!(parameters, vec!["key", "name"]);

            let matcher = py.method_matcher(definition, ctx).unwrap();
            assert_eq!(matcher.arity(), Some(2));
        });
    }

    #[test]
    fn test_module_function_and_global() {
        with_ctx(|ctx| {
            let py = PythonSupport;
            let make_key = call_named(ctx, "make_key");
            assert_eq!(py.invoked_object_type(&make_key, ctx).unwrap().name(), "box");
            let definition = py.method_definition(&make_key, ctx).unwrap();
            assert_eq!(py.method_returns(definition).len(), 1);

            let argument = py.arguments(&make_key)[0];
            let Expression::Variable(symbol) = py.expression(argument, ctx) else {
                panic!("expected a variable");
            };
            let initializer = py.initializer(&symbol, ctx).unwrap();
            assert!(matches!(
                py.expression(initializer, ctx),
                Expression::Literal(Constant::Int(32))
            ));
        });
    }

    #[test]
    fn test_self_field_symbol() {
        with_ctx(|ctx| {
            let py = PythonSupport;
            let encrypt = call_named(ctx, "encrypt");
            let argument = py.arguments(&encrypt)[0];
            let Expression::Variable(symbol) = py.expression(argument, ctx) else {
                panic!("expected a field");
            };
            assert_eq!(symbol.kind(), SymbolKind::Field);
            let value = py.initializer(&symbol, ctx).unwrap();
            let Expression::Variable(parameter) = py.expression(value, ctx) else {
                panic!("expected the constructor parameter");
            };
            assert_eq!(parameter.kind(), SymbolKind::Parameter);
            let (_, index) = py.parameter_position(&parameter, ctx).unwrap();
            assert_eq!(index, 0);
        });
    }

    #[test]
    fn test_string_literals() {
        let source = "a = 'x' 'y'\nb = f\"{a}\"\nc = -5\n";
        let tree = parse(source, Language::Python).unwrap();
        let ctx = Context::new(&tree, source.as_bytes(), "m.py", Language::Python);
        let py = PythonSupport;
        let values: Vec<_> = named_children(ctx.root())
            .into_iter()
            .filter_map(|statement| named_children(statement).into_iter().next())
            .filter_map(|assignment| assignment.child_by_field_name("right"))
            .map(|right| py.expression(right, &ctx))
            .collect();
        assert!(matches!(&values[0], Expression::Literal(Constant::Str(s)) if s == "xy"));
        assert!(matches!(values[1], Expression::Unknown));
        assert!(matches!(values[2], Expression::Literal(Constant::Int(-5))));
    }
}
