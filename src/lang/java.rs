//! Java front end over tree-sitter-java.
//!
//! Types are qualified through the unit's imports, its package, unit-declared
//! classes and `java.lang`. Anything that needs a classpath stays unknown.

use super::{
    ancestors, named_children, simple_name, walk_preorder, Expression, LanguageSupport,
    LanguageTranslation, ObjectType, Site, Symbol, SymbolKind,
};
use crate::engine::lang_features::{parse_int_literal, unquote_string};
use crate::engine::{Constant, Context, Language, NodeCategory, NodeTypes};
use crate::rule::{MethodMatcher, ANY, CONSTRUCTOR};
use tracing::trace;
use tree_sitter::Node;

const PRIMITIVES: &[&str] = &[
    "byte", "short", "int", "long", "float", "double", "boolean", "char", "void",
];

const JAVA_LANG: &[&str] = &[
    "String",
    "Object",
    "Integer",
    "Long",
    "Short",
    "Byte",
    "Boolean",
    "Character",
    "Double",
    "Float",
    "Number",
    "Math",
    "System",
    "StringBuilder",
    "CharSequence",
    "Enum",
    "Class",
];

const MAX_SUPERTYPE_DEPTH: usize = 8;

#[derive(Debug, Clone, Copy, Default)]
pub struct JavaSupport;

fn is(node: &Node, category: NodeCategory) -> bool {
    NodeTypes::new(Language::Java).is_category(node.kind(), category)
}

fn is_comment(node: &Node) -> bool {
    node.kind().ends_with("comment")
}

fn expressions_of(node: Node<'_>) -> Vec<Node<'_>> {
    named_children(node)
        .into_iter()
        .filter(|n| !is_comment(n))
        .collect()
}

fn bracket_count(node: Node) -> usize {
    let mut cursor = node.walk();
    let count = node.children(&mut cursor).filter(|n| n.kind() == "[").count();
    count
}

fn split_array_suffix(name: &str) -> (&str, &str) {
    let base = name.trim_end_matches("[]");
    (base, &name[base.len()..])
}

impl JavaSupport {
    fn unit_types<'c, 'a>(&self, ctx: &'c Context<'a>) -> &'c [(String, Node<'a>)] {
        ctx.declarations(|| {
            let mut declarations = Vec::new();
            walk_preorder(ctx.root(), &mut |node: Node<'a>| {
                if is(&node, NodeCategory::TypeDeclaration) {
                    if let Some(name) = node.child_by_field_name("name") {
                        declarations.push((ctx.get_node_text(&name), node));
                    }
                }
                true
            });
            declarations
        })
    }

    fn type_declaration_named<'a>(&self, name: &str, ctx: &Context<'a>) -> Option<Node<'a>> {
        let wanted = simple_name(name);
        self.unit_types(ctx)
            .iter()
            .find(|(declared, _)| declared == wanted)
            .map(|(_, node)| *node)
    }

    fn enclosing_type<'a>(&self, node: Node<'a>) -> Option<Node<'a>> {
        ancestors(node).find(|n| is(n, NodeCategory::TypeDeclaration))
    }

    fn type_text(&self, node: Node, ctx: &Context) -> String {
        match node.kind() {
            "generic_type" => named_children(node)
                .first()
                .map(|base| self.type_text(*base, ctx))
                .unwrap_or_else(|| ctx.get_node_text(&node)),
            "array_type" => {
                let element = node
                    .child_by_field_name("element")
                    .map(|e| self.type_text(e, ctx))
                    .unwrap_or_default();
                let rank = node
                    .child_by_field_name("dimensions")
                    .map(bracket_count)
                    .unwrap_or(1)
                    .max(1);
                format!("{element}{}", "[]".repeat(rank))
            }
            "annotated_type" => named_children(node)
                .last()
                .map(|inner| self.type_text(*inner, ctx))
                .unwrap_or_else(|| ctx.get_node_text(&node)),
            _ => ctx.get_node_text(&node),
        }
    }

    fn qualify(&self, name: &str, ctx: &Context) -> String {
        let (base, suffix) = split_array_suffix(name);
        if base.is_empty() || base.contains('.') || PRIMITIVES.iter().any(|p| *p == base) {
            return name.to_string();
        }
        if let Some(full) = ctx.imports().get(base) {
            return format!("{full}{suffix}");
        }
        if self.type_declaration_named(base, ctx).is_some() {
            return match ctx.package() {
                Some(package) => format!("{package}.{name}"),
                None => name.to_string(),
            };
        }
        if JAVA_LANG.iter().any(|t| *t == base) {
            return format!("java.lang.{name}");
        }
        name.to_string()
    }

    fn declared_object_type(&self, declaration: Node, ctx: &Context) -> ObjectType {
        let name = declaration
            .child_by_field_name("name")
            .map(|n| ctx.get_node_text(&n))
            .unwrap_or_default();
        let mut supertypes = Vec::new();
        self.collect_supertypes(declaration, ctx, &mut supertypes, 0);
        ObjectType::new(self.qualify(&name, ctx)).with_supertypes(supertypes)
    }

    fn collect_supertypes(
        &self,
        declaration: Node,
        ctx: &Context,
        out: &mut Vec<String>,
        depth: usize,
    ) {
        if depth > MAX_SUPERTYPE_DEPTH {
            return;
        }
        let mut direct = Vec::new();
        if let Some(superclass) = declaration.child_by_field_name("superclass") {
            direct.extend(named_children(superclass));
        }
        for child in named_children(declaration) {
            if matches!(child.kind(), "super_interfaces" | "extends_interfaces") {
                for list in named_children(child) {
                    direct.extend(named_children(list));
                }
            }
        }

        for type_node in direct {
            let text = self.type_text(type_node, ctx);
            let qualified = self.qualify(&text, ctx);
            if out.contains(&qualified) {
                continue;
            }
            out.push(qualified);
            if ctx.imports().get(&text).is_none() {
                if let Some(parent) = self.type_declaration_named(&text, ctx) {
                    self.collect_supertypes(parent, ctx, out, depth + 1);
                }
            }
        }
    }

    fn object_type_named(&self, name: &str, ctx: &Context) -> ObjectType {
        let (base, suffix) = split_array_suffix(name);
        if suffix.is_empty() && !base.contains('.') && ctx.imports().get(base).is_none() {
            if let Some(declaration) = self.type_declaration_named(base, ctx) {
                return self.declared_object_type(declaration, ctx);
            }
        }
        ObjectType::new(self.qualify(name, ctx))
    }

    fn lookup<'a>(&self, name: &str, from: Node<'a>, ctx: &Context<'a>) -> Option<Symbol<'a>> {
        let position = from.start_byte();
        for scope in ancestors(from) {
            let found = match scope.kind() {
                "block" | "constructor_body" | "switch_block_statement_group" => {
                    self.local_in_block(name, scope, position, ctx)
                }
                "for_statement" => scope
                    .child_by_field_name("init")
                    .and_then(|init| self.declarator_named(name, init, ctx))
                    .map(|d| Symbol::new(name, d, SymbolKind::Local)),
                "enhanced_for_statement" => scope
                    .child_by_field_name("name")
                    .filter(|n| ctx.get_node_text(n) == name)
                    .map(|n| Symbol::new(name, n, SymbolKind::Local)),
                "catch_clause" => named_children(scope)
                    .into_iter()
                    .find(|c| c.kind() == "catch_formal_parameter")
                    .filter(|p| {
                        p.child_by_field_name("name")
                            .is_some_and(|n| ctx.get_node_text(&n) == name)
                    })
                    .map(|p| Symbol::new(name, p, SymbolKind::Local)),
                "lambda_expression" => self.lambda_parameter(name, scope, ctx),
                "method_declaration"
                | "constructor_declaration"
                | "compact_constructor_declaration" => self.parameter_named(name, scope, ctx),
                "class_body" | "interface_body" | "enum_body_declarations" => {
                    self.field_in_body(name, scope, ctx)
                }
                "enum_body" => self.enum_constant_in_body(name, scope, ctx),
                _ => None,
            };
            if found.is_some() {
                return found;
            }
        }
        None
    }

    fn resolve_identifier<'a>(
        &self,
        identifier: Node<'a>,
        ctx: &Context<'a>,
    ) -> Option<Symbol<'a>> {
        let name = ctx.get_node_text(&identifier);
        self.lookup(&name, identifier, ctx)
    }

    fn local_in_block<'a>(
        &self,
        name: &str,
        block: Node<'a>,
        position: usize,
        ctx: &Context<'a>,
    ) -> Option<Symbol<'a>> {
        let mut found = None;
        for statement in named_children(block) {
            if statement.start_byte() >= position {
                break;
            }
            if statement.kind() == "local_variable_declaration" {
                if let Some(declarator) = self.declarator_named(name, statement, ctx) {
                    found = Some(Symbol::new(name, declarator, SymbolKind::Local));
                }
            }
        }
        found
    }

    fn declarator_named<'a>(
        &self,
        name: &str,
        declaration: Node<'a>,
        ctx: &Context<'a>,
    ) -> Option<Node<'a>> {
        let mut cursor = declaration.walk();
        let found = declaration
            .children_by_field_name("declarator", &mut cursor)
            .find(|d| {
                d.child_by_field_name("name")
                    .is_some_and(|n| ctx.get_node_text(&n) == name)
            });
        found
    }

    fn parameter_named<'a>(
        &self,
        name: &str,
        method: Node<'a>,
        ctx: &Context<'a>,
    ) -> Option<Symbol<'a>> {
        self.method_parameters(method, ctx)
            .into_iter()
            .find(|p| p.name() == name)
    }

    fn lambda_parameter<'a>(
        &self,
        name: &str,
        lambda: Node<'a>,
        ctx: &Context<'a>,
    ) -> Option<Symbol<'a>> {
        let parameters = lambda.child_by_field_name("parameters")?;
        let candidates = match parameters.kind() {
            "identifier" => vec![parameters],
            "inferred_parameters" => named_children(parameters),
            _ => named_children(parameters)
                .into_iter()
                .filter_map(|p| p.child_by_field_name("name"))
                .collect(),
        };
        candidates
            .into_iter()
            .find(|n| ctx.get_node_text(n) == name)
            .map(|n| Symbol::new(name, n, SymbolKind::Local))
    }

    fn field_in_body<'a>(
        &self,
        name: &str,
        body: Node<'a>,
        ctx: &Context<'a>,
    ) -> Option<Symbol<'a>> {
        named_children(body)
            .into_iter()
            .filter(|m| matches!(m.kind(), "field_declaration" | "constant_declaration"))
            .find_map(|field| self.declarator_named(name, field, ctx))
            .map(|d| Symbol::new(name, d, SymbolKind::Field))
    }

    fn enum_constant_in_body<'a>(
        &self,
        name: &str,
        body: Node<'a>,
        ctx: &Context<'a>,
    ) -> Option<Symbol<'a>> {
        named_children(body)
            .into_iter()
            .filter(|c| c.kind() == "enum_constant")
            .find(|c| {
                c.child_by_field_name("name")
                    .is_some_and(|n| ctx.get_node_text(&n) == name)
            })
            .map(|c| Symbol::new(name, c, SymbolKind::EnumConstant))
    }

    /// Field or enum constant declared directly in a type.
    fn member_of_type<'a>(
        &self,
        name: &str,
        declaration: Node<'a>,
        ctx: &Context<'a>,
    ) -> Option<Symbol<'a>> {
        let body = declaration.child_by_field_name("body")?;
        if body.kind() == "enum_body" {
            return self.enum_constant_in_body(name, body, ctx).or_else(|| {
                named_children(body)
                    .into_iter()
                    .filter(|c| c.kind() == "enum_body_declarations")
                    .find_map(|decls| self.field_in_body(name, decls, ctx))
            });
        }
        self.field_in_body(name, body, ctx)
    }

    fn type_members<'a>(&self, declaration: Node<'a>) -> Vec<Node<'a>> {
        let Some(body) = declaration.child_by_field_name("body") else {
            return Vec::new();
        };
        if body.kind() == "enum_body" {
            return named_children(body)
                .into_iter()
                .filter(|c| c.kind() == "enum_body_declarations")
                .flat_map(named_children)
                .collect();
        }
        named_children(body)
    }

    fn this_field<'a>(&self, name: &str, from: Node<'a>, ctx: &Context<'a>) -> Option<Symbol<'a>> {
        let owner = self.enclosing_type(from)?;
        self.member_of_type(name, owner, ctx)
    }

    /// `Algo.AES` where `Algo` is an enum declared in this unit.
    fn enum_selection<'a>(
        &self,
        node: Node<'a>,
        ctx: &Context<'a>,
    ) -> Option<(Node<'a>, Node<'a>)> {
        if node.kind() != "field_access" {
            return None;
        }
        let object = node.child_by_field_name("object")?;
        let field = node.child_by_field_name("field")?;
        if !matches!(object.kind(), "identifier" | "field_access") {
            return None;
        }
        if object.kind() == "identifier" && self.resolve_identifier(object, ctx).is_some() {
            return None;
        }
        let declaration = self.enum_named(&ctx.get_node_text(&object), ctx)?;
        let body = declaration.child_by_field_name("body")?;
        let constant = self.enum_constant_in_body(&ctx.get_node_text(&field), body, ctx)?;
        Some((declaration, constant.declaration()))
    }

    /// `Type.FIELD` where `Type` is declared in this unit.
    fn static_member<'a>(
        &self,
        object: Node<'a>,
        field: &str,
        ctx: &Context<'a>,
    ) -> Option<Symbol<'a>> {
        if object.kind() != "identifier" || self.resolve_identifier(object, ctx).is_some() {
            return None;
        }
        let declaration = self.type_declaration_named(&ctx.get_node_text(&object), ctx)?;
        self.member_of_type(field, declaration, ctx)
    }

    fn receiver_type<'a>(&self, object: Node<'a>, ctx: &Context<'a>) -> Option<ObjectType> {
        match object.kind() {
            "this" => self
                .enclosing_type(object)
                .map(|t| self.declared_object_type(t, ctx)),
            "super" => {
                let owner = self.enclosing_type(object)?;
                let superclass = owner.child_by_field_name("superclass")?;
                let type_node = named_children(superclass).into_iter().next()?;
                Some(self.object_type_named(&self.type_text(type_node, ctx), ctx))
            }
            "identifier" => match self.resolve_identifier(object, ctx) {
                Some(symbol) => self.declared_type(&symbol, ctx),
                None => Some(self.object_type_named(&ctx.get_node_text(&object), ctx)),
            },
            "field_access" => {
                if let Some((declaration, _)) = self.enum_selection(object, ctx) {
                    return Some(self.declared_object_type(declaration, ctx));
                }
                match self.expression(object, ctx) {
                    Expression::Variable(symbol) => self.declared_type(&symbol, ctx),
                    _ => self.qualified_name(object, ctx).map(ObjectType::new),
                }
            }
            _ => self.expression_type(object, ctx),
        }
    }

    /// `javax.crypto.Cipher` written out in full, as long as its leftmost
    /// segment is not a variable.
    fn qualified_name<'a>(&self, node: Node<'a>, ctx: &Context<'a>) -> Option<String> {
        let mut leftmost = node;
        while leftmost.kind() == "field_access" {
            leftmost = leftmost.child_by_field_name("object")?;
        }
        if leftmost.kind() != "identifier" || self.resolve_identifier(leftmost, ctx).is_some() {
            return None;
        }
        Some(ctx.get_node_text(&node))
    }

    fn expression_type<'a>(&self, node: Node<'a>, ctx: &Context<'a>) -> Option<ObjectType> {
        let text = || ctx.get_node_text(&node);
        match node.kind() {
            _ if is(&node, NodeCategory::IntegerLiteral) => {
                let long = text().ends_with(['l', 'L']);
                Some(ObjectType::new(if long { "long" } else { "int" }))
            }
            _ if is(&node, NodeCategory::FloatLiteral) => {
                let float = text().ends_with(['f', 'F']);
                Some(ObjectType::new(if float { "float" } else { "double" }))
            }
            "string_literal" | "text_block" => Some(ObjectType::new("java.lang.String")),
            "character_literal" => Some(ObjectType::new("char")),
            "true" | "false" => Some(ObjectType::new("boolean")),
            "identifier" => {
                let symbol = self.resolve_identifier(node, ctx)?;
                self.declared_type(&symbol, ctx)
            }
            "this" | "field_access" => self.receiver_type(node, ctx),
            "object_creation_expression" => {
                let type_node = node.child_by_field_name("type")?;
                Some(self.object_type_named(&self.type_text(type_node, ctx), ctx))
            }
            "array_creation_expression" => {
                let type_node = node.child_by_field_name("type")?;
                let rank = match self.expression(node, ctx) {
                    Expression::ArrayCreation { rank, .. } => rank.max(1),
                    _ => 1,
                };
                let name = format!("{}{}", self.type_text(type_node, ctx), "[]".repeat(rank));
                Some(ObjectType::new(self.qualify(&name, ctx)))
            }
            "cast_expression" => {
                let type_node = node.child_by_field_name("type")?;
                Some(self.object_type_named(&self.type_text(type_node, ctx), ctx))
            }
            "parenthesized_expression" => {
                let inner = expressions_of(node).into_iter().next()?;
                self.expression_type(inner, ctx)
            }
            "unary_expression" => {
                let operand = node.child_by_field_name("operand")?;
                self.expression_type(operand, ctx)
            }
            "ternary_expression" => {
                let consequence = node.child_by_field_name("consequence")?;
                self.expression_type(consequence, ctx)
            }
            "method_invocation" => {
                let definition = self.method_definition(&Site::Invocation(node), ctx)?;
                let return_type = definition.child_by_field_name("type")?;
                Some(self.object_type_named(&self.type_text(return_type, ctx), ctx))
            }
            _ => None,
        }
    }

    fn method_in_type<'a>(
        &self,
        owner: Node<'a>,
        name: &str,
        arity: usize,
        ctx: &Context<'a>,
    ) -> Option<Node<'a>> {
        self.type_members(owner).into_iter().find(|member| {
            member.kind() == "method_declaration"
                && member
                    .child_by_field_name("name")
                    .is_some_and(|n| ctx.get_node_text(&n) == name)
                && self.method_parameters(*member, ctx).len() == arity
        })
    }

    fn literal(&self, node: Node, ctx: &Context) -> Option<Constant> {
        let text = ctx.get_node_text(&node);
        match node.kind() {
            _ if is(&node, NodeCategory::IntegerLiteral) => {
                parse_int_literal(&text, Language::Java).map(Constant::Int)
            }
            "string_literal" | "character_literal" | "text_block" => {
                let value = unquote_string(&text, Language::Java);
                if text.starts_with("\"\"\"") {
                    Some(Constant::Str(value.trim().to_string()))
                } else {
                    Some(Constant::Str(value))
                }
            }
            "true" => Some(Constant::Bool(true)),
            "false" => Some(Constant::Bool(false)),
            _ => None,
        }
    }

    fn array_creation<'a>(&self, node: Node<'a>) -> Expression<'a> {
        if node.kind() == "array_initializer" {
            return Expression::ArrayCreation {
                dimensions: Vec::new(),
                rank: 1,
                elements: Some(expressions_of(node).len()),
            };
        }
        let mut dimensions = Vec::new();
        let mut rank = 0;
        let mut elements = None;
        for child in named_children(node) {
            match child.kind() {
                "dimensions_expr" => {
                    rank += 1;
                    if let Some(size) = expressions_of(child)
                        .into_iter()
                        .find(|n| !n.kind().ends_with("annotation"))
                    {
                        dimensions.push(size);
                    }
                }
                "dimensions" => rank += bracket_count(child),
                "array_initializer" => elements = Some(expressions_of(child).len()),
                _ => {}
            }
        }
        Expression::ArrayCreation {
            dimensions,
            rank,
            elements,
        }
    }

    fn symbol_for_declarator<'a>(
        &self,
        declarator: Node<'a>,
        ctx: &Context<'a>,
    ) -> Option<Symbol<'a>> {
        let name = ctx.get_node_text(&declarator.child_by_field_name("name")?);
        let kind = match declarator.parent().map(|p| p.kind()) {
            Some("field_declaration") | Some("constant_declaration") => SymbolKind::Field,
            _ => SymbolKind::Local,
        };
        Some(Symbol::new(name, declarator, kind))
    }

    fn assignment_target<'a>(&self, left: Node<'a>, ctx: &Context<'a>) -> Option<Symbol<'a>> {
        match left.kind() {
            "identifier" => self.resolve_identifier(left, ctx),
            "field_access" => {
                let object = left.child_by_field_name("object")?;
                let field = left.child_by_field_name("field")?;
                if object.kind() == "this" {
                    self.this_field(&ctx.get_node_text(&field), left, ctx)
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}

impl LanguageTranslation for JavaSupport {
    fn method_name<'a>(&self, site: &Site<'a>, ctx: &Context<'a>) -> Option<String> {
        match site {
            Site::Invocation(node) => node
                .child_by_field_name("name")
                .map(|n| ctx.get_node_text(&n)),
            Site::Construction(_) => Some(CONSTRUCTOR.to_string()),
            Site::EnumSelection(_) => None,
        }
    }

    fn invoked_object_type<'a>(&self, site: &Site<'a>, ctx: &Context<'a>) -> Option<ObjectType> {
        match site {
            Site::Construction(node) => {
                let type_node = node.child_by_field_name("type")?;
                Some(self.object_type_named(&self.type_text(type_node, ctx), ctx))
            }
            Site::Invocation(node) => match node.child_by_field_name("object") {
                Some(object) => self.receiver_type(object, ctx),
                None => self
                    .enclosing_type(*node)
                    .map(|t| self.declared_object_type(t, ctx)),
            },
            Site::EnumSelection(node) => {
                let (declaration, _) = self.enum_selection(*node, ctx)?;
                Some(self.declared_object_type(declaration, ctx))
            }
        }
    }

    fn parameter_types<'a>(&self, site: &Site<'a>, ctx: &Context<'a>) -> Vec<Option<ObjectType>> {
        self.arguments(site)
            .into_iter()
            .map(|argument| self.expression_type(argument, ctx))
            .collect()
    }

    fn enum_class_name<'a>(&self, site: &Site<'a>, ctx: &Context<'a>) -> Option<String> {
        let Site::EnumSelection(node) = site else {
            return None;
        };
        let (declaration, _) = self.enum_selection(*node, ctx)?;
        Some(self.declared_object_type(declaration, ctx).name().to_string())
    }

    fn enum_constant_name<'a>(&self, site: &Site<'a>, ctx: &Context<'a>) -> Option<String> {
        let Site::EnumSelection(node) = site else {
            return None;
        };
        node.child_by_field_name("field")
            .map(|f| ctx.get_node_text(&f))
    }

    fn identifier_text<'a>(&self, node: Node<'a>, ctx: &Context<'a>) -> Option<String> {
        match node.kind() {
            "identifier" | "type_identifier" => Some(ctx.get_node_text(&node)),
            "field_access" => node.child_by_field_name("field").map(|f| ctx.get_node_text(&f)),
            "method_invocation" => node.child_by_field_name("name").map(|n| ctx.get_node_text(&n)),
            _ => None,
        }
    }
}

impl LanguageSupport for JavaSupport {
    fn language(&self) -> Language {
        Language::Java
    }

    fn as_translation(&self) -> &dyn LanguageTranslation {
        self
    }

    fn site<'a>(&self, node: Node<'a>, ctx: &Context<'a>) -> Option<Site<'a>> {
        match node.kind() {
            "method_invocation" => Some(Site::Invocation(node)),
            "object_creation_expression" => Some(Site::Construction(node)),
            "field_access" => self
                .enum_selection(node, ctx)
                .map(|_| Site::EnumSelection(node)),
            _ => None,
        }
    }

    fn arguments<'a>(&self, site: &Site<'a>) -> Vec<Node<'a>> {
        match site {
            Site::Invocation(node) | Site::Construction(node) => node
                .child_by_field_name("arguments")
                .map(expressions_of)
                .unwrap_or_default(),
            Site::EnumSelection(_) => Vec::new(),
        }
    }

    fn receiver<'a>(&self, site: &Site<'a>) -> Option<Node<'a>> {
        match site {
            Site::Invocation(node) => node.child_by_field_name("object"),
            _ => None,
        }
    }

    fn expression<'a>(&self, node: Node<'a>, ctx: &Context<'a>) -> Expression<'a> {
        if let Some(constant) = self.literal(node, ctx) {
            return Expression::Literal(constant);
        }
        match node.kind() {
            "identifier" => match self.resolve_identifier(node, ctx) {
                Some(symbol) if symbol.kind() == SymbolKind::EnumConstant => {
                    match self.enclosing_type(symbol.declaration()) {
                        Some(declaration) => Expression::EnumConstant {
                            declaration,
                            constant: symbol.declaration(),
                        },
                        None => Expression::Unknown,
                    }
                }
                Some(symbol) => Expression::Variable(symbol),
                None => {
                    trace!(identifier = %ctx.get_node_text(&node), "unresolved identifier");
                    Expression::Unknown
                }
            },
            "field_access" => {
                if let Some((declaration, constant)) = self.enum_selection(node, ctx) {
                    return Expression::EnumConstant {
                        declaration,
                        constant,
                    };
                }
                let (Some(object), Some(field)) = (
                    node.child_by_field_name("object"),
                    node.child_by_field_name("field"),
                ) else {
                    return Expression::Unknown;
                };
                let member = ctx.get_node_text(&field);
                let symbol = if object.kind() == "this" {
                    self.this_field(&member, node, ctx)
                } else {
                    self.static_member(object, &member, ctx)
                };
                match symbol {
                    Some(symbol) => Expression::Variable(symbol),
                    None => Expression::Member { object, member },
                }
            }
            "method_invocation" => Expression::Call(Site::Invocation(node)),
            "object_creation_expression" => Expression::Call(Site::Construction(node)),
            "array_creation_expression" | "array_initializer" => self.array_creation(node),
            "parenthesized_expression" => expressions_of(node)
                .into_iter()
                .next()
                .map(Expression::Wrapped)
                .unwrap_or(Expression::Unknown),
            "cast_expression" => node
                .child_by_field_name("value")
                .map(Expression::Wrapped)
                .unwrap_or(Expression::Unknown),
            "unary_expression" => {
                let operator = node.child_by_field_name("operator").map(|o| ctx.get_node_text(&o));
                let Some(operand) = node.child_by_field_name("operand") else {
                    return Expression::Unknown;
                };
                match (operator.as_deref(), self.literal(operand, ctx)) {
                    (Some("-"), Some(Constant::Int(n))) => Expression::Literal(Constant::Int(-n)),
                    (Some("+"), _) => Expression::Wrapped(operand),
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
                "parenthesized_expression" | "cast_expression" => current = parent,
                "variable_declarator" => {
                    let value = parent.child_by_field_name("value")?;
                    return if value.id() == current.id() {
                        self.symbol_for_declarator(parent, ctx)
                    } else {
                        None
                    };
                }
                "assignment_expression" => {
                    let right = parent.child_by_field_name("right")?;
                    let operator = parent.child_by_field_name("operator")?;
                    if right.id() != current.id() || ctx.get_node_text(&operator) != "=" {
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
        if declaration.kind() != "variable_declarator" {
            return None;
        }
        declaration.child_by_field_name("value")
    }

    fn assignments<'a>(&self, symbol: &Symbol<'a>, ctx: &Context<'a>) -> Vec<Node<'a>> {
        let scope = self.symbol_scope(symbol, ctx);
        let mut values = Vec::new();
        walk_preorder(scope, &mut |node: Node<'a>| {
            if node.kind() != "assignment_expression" {
                return true;
            }
            let plain = node
                .child_by_field_name("operator")
                .is_some_and(|o| ctx.get_node_text(&o) == "=");
            if let (true, Some(left), Some(right)) = (
                plain,
                node.child_by_field_name("left"),
                node.child_by_field_name("right"),
            ) {
                if self.assignment_target(left, ctx).as_ref() == Some(symbol) {
                    values.push(right);
                }
            }
            true
        });
        values
    }

    fn declared_type<'a>(&self, symbol: &Symbol<'a>, ctx: &Context<'a>) -> Option<ObjectType> {
        let declaration = symbol.declaration();
        match symbol.kind() {
            SymbolKind::EnumConstant => self
                .enclosing_type(declaration)
                .map(|t| self.declared_object_type(t, ctx)),
            SymbolKind::Parameter => match declaration.kind() {
                "formal_parameter" => {
                    let type_node = declaration.child_by_field_name("type")?;
                    let rank = declaration
                        .child_by_field_name("dimensions")
                        .map(bracket_count)
                        .unwrap_or(0);
                    let name = format!("{}{}", self.type_text(type_node, ctx), "[]".repeat(rank));
                    Some(self.object_type_named(&name, ctx))
                }
                "spread_parameter" => {
                    let type_node = named_children(declaration)
                        .into_iter()
                        .find(|c| c.kind() != "variable_declarator" && c.kind() != "modifiers")?;
                    let name = format!("{}[]", self.type_text(type_node, ctx));
                    Some(self.object_type_named(&name, ctx))
                }
                _ => None,
            },
            SymbolKind::Local | SymbolKind::Field => match declaration.kind() {
                "variable_declarator" => {
                    let holder = declaration.parent()?;
                    let type_node = holder.child_by_field_name("type")?;
                    let text = self.type_text(type_node, ctx);
                    if text == "var" {
                        let value = declaration.child_by_field_name("value")?;
                        return self.expression_type(value, ctx);
                    }
                    let rank = declaration
                        .child_by_field_name("dimensions")
                        .map(bracket_count)
                        .unwrap_or(0);
                    Some(self.object_type_named(&format!("{text}{}", "[]".repeat(rank)), ctx))
                }
                "identifier" => {
                    let holder = declaration.parent()?;
                    if holder.kind() != "enhanced_for_statement" {
                        return None;
                    }
                    let type_node = holder.child_by_field_name("type")?;
                    Some(self.object_type_named(&self.type_text(type_node, ctx), ctx))
                }
                _ => None,
            },
        }
    }

    fn symbol_scope<'a>(&self, symbol: &Symbol<'a>, ctx: &Context<'a>) -> Node<'a> {
        let declaration = symbol.declaration();
        match symbol.kind() {
            SymbolKind::Local => self.enclosing_scope(declaration, ctx),
            SymbolKind::Parameter => self
                .enclosing_method(declaration)
                .unwrap_or_else(|| ctx.root()),
            SymbolKind::Field | SymbolKind::EnumConstant => self
                .enclosing_type(declaration)
                .unwrap_or_else(|| ctx.root()),
        }
    }

    fn enclosing_method<'a>(&self, node: Node<'a>) -> Option<Node<'a>> {
        ancestors(node).find(|n| is(n, NodeCategory::FunctionDeclaration))
    }

    fn enclosing_scope<'a>(&self, node: Node<'a>, ctx: &Context<'a>) -> Node<'a> {
        self.enclosing_method(node)
            .or_else(|| self.enclosing_type(node))
            .unwrap_or_else(|| ctx.root())
    }

    fn method_parameters<'a>(&self, method: Node<'a>, ctx: &Context<'a>) -> Vec<Symbol<'a>> {
        let Some(parameters) = method.child_by_field_name("parameters") else {
            return Vec::new();
        };
        named_children(parameters)
            .into_iter()
            .filter_map(|parameter| {
                let name_node = match parameter.kind() {
                    "formal_parameter" => parameter.child_by_field_name("name"),
                    "spread_parameter" => named_children(parameter)
                        .into_iter()
                        .find(|c| c.kind() == "variable_declarator")
                        .and_then(|d| d.child_by_field_name("name")),
                    _ => None,
                }?;
                Some(Symbol::new(
                    ctx.get_node_text(&name_node),
                    parameter,
                    SymbolKind::Parameter,
                ))
            })
            .collect()
    }

    fn method_returns<'a>(&self, method: Node<'a>) -> Vec<Node<'a>> {
        let Some(body) = method.child_by_field_name("body") else {
            return Vec::new();
        };
        let mut returns = Vec::new();
        walk_preorder(body, &mut |node: Node<'a>| match node.kind() {
            "lambda_expression" | "class_body" | "method_declaration" => false,
            "return_statement" => {
                returns.extend(expressions_of(node).into_iter().next());
                false
            }
            _ => true,
        });
        returns
    }

    fn method_definition<'a>(&self, site: &Site<'a>, ctx: &Context<'a>) -> Option<Node<'a>> {
        let Site::Invocation(node) = site else {
            return None;
        };
        let name = ctx.get_node_text(&node.child_by_field_name("name")?);
        let arity = self.arguments(site).len();

        match node.child_by_field_name("object") {
            None => ancestors(*node)
                .filter(|n| is(n, NodeCategory::TypeDeclaration))
                .find_map(|owner| self.method_in_type(owner, &name, arity, ctx)),
            Some(object) if object.kind() == "this" => {
                let owner = self.enclosing_type(*node)?;
                self.method_in_type(owner, &name, arity, ctx)
            }
            Some(object) => {
                let receiver = self.receiver_type(object, ctx)?;
                let owner = self.type_declaration_named(receiver.name(), ctx)?;
                if self.declared_object_type(owner, ctx).name() != receiver.name() {
                    return None;
                }
                self.method_in_type(owner, &name, arity, ctx)
            }
        }
    }

    fn method_matcher<'a>(&self, method: Node<'a>, ctx: &Context<'a>) -> Option<MethodMatcher> {
        let owner = self.enclosing_type(method)?;
        let object_type = self.declared_object_type(owner, ctx);
        let name = match method.kind() {
            "constructor_declaration" | "compact_constructor_declaration" => {
                CONSTRUCTOR.to_string()
            }
            _ => ctx.get_node_text(&method.child_by_field_name("name")?),
        };
        let parameter_types: Vec<String> = self
            .method_parameters(method, ctx)
            .iter()
            .map(|p| {
                self.declared_type(p, ctx)
                    .map(|t| t.name().to_string())
                    .unwrap_or_else(|| ANY.to_string())
            })
            .collect();

        Some(MethodMatcher::for_definition(object_type.name(), &name, parameter_types))
    }

    fn enum_named<'a>(&self, type_name: &str, ctx: &Context<'a>) -> Option<Node<'a>> {
        let wanted = simple_name(type_name);
        self.unit_types(ctx)
            .iter()
            .find(|(name, node)| name == wanted && node.kind() == "enum_declaration")
            .map(|(_, node)| *node)
    }

    fn enum_constant_arguments<'a>(&self, constant: Node<'a>) -> Vec<Node<'a>> {
        constant
            .child_by_field_name("arguments")
            .map(expressions_of)
            .unwrap_or_default()
    }

    fn enum_constructor_parameters<'a>(
        &self,
        declaration: Node<'a>,
        ctx: &Context<'a>,
    ) -> Vec<Vec<String>> {
        self.type_members(declaration)
            .into_iter()
            .filter(|m| m.kind() == "constructor_declaration")
            .map(|constructor| {
                self.method_parameters(constructor, ctx)
                    .iter()
                    .map(|p| p.name().to_string())
                    .collect()
            })
            .collect()
    }

    fn constant_name<'a>(&self, constant: Node<'a>, ctx: &Context<'a>) -> String {
        constant
            .child_by_field_name("name")
            .map(|n| ctx.get_node_text(&n))
            .unwrap_or_default()
    }
}
