#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Java,
    Python,
}

impl Language {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "java" => Some(Self::Java),
            "python" | "py" => Some(Self::Python),
            _ => None,
        }
    }

    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_lowercase().as_str() {
            "java" => Some(Self::Java),
            "py" | "pyi" => Some(Self::Python),
            _ => None,
        }
    }

    pub fn tree_sitter_name(&self) -> &'static str {
        match self {
            Self::Java => "java",
            Self::Python => "python",
        }
    }

    pub fn grammar(&self) -> tree_sitter::Language {
        match self {
            Self::Java => tree_sitter_java::LANGUAGE.into(),
            Self::Python => tree_sitter_python::LANGUAGE.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeCategory {
    IntegerLiteral,
    FloatLiteral,
    StringLiteral,
    BooleanLiteral,
    NullLiteral,
    Identifier,
    Invocation,
    Construction,
    MemberAccess,
    ArrayCreation,
    Parenthesized,
    Cast,
    UnaryExpression,
    FunctionDeclaration,
    TypeDeclaration,
    Assignment,
    ReturnStatement,
}

pub struct NodeTypes {
    language: Language,
}

impl NodeTypes {
    pub fn new(language: Language) -> Self {
        Self { language }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn is_category(&self, kind: &str, category: NodeCategory) -> bool {
        self.node_types(category).iter().any(|k| *k == kind)
    }

    pub fn is_literal(&self, kind: &str) -> bool {
        [
            NodeCategory::IntegerLiteral,
            NodeCategory::FloatLiteral,
            NodeCategory::StringLiteral,
            NodeCategory::BooleanLiteral,
            NodeCategory::NullLiteral,
        ]
        .into_iter()
        .any(|category| self.is_category(kind, category))
    }

    pub fn node_types(&self, category: NodeCategory) -> &'static [&'static str] {
        match self.language {
            Language::Java => java_node_types(category),
            Language::Python => python_node_types(category),
        }
    }
}

fn java_node_types(category: NodeCategory) -> &'static [&'static str] {
    match category {
        NodeCategory::IntegerLiteral => &[
            "decimal_integer_literal",
            "hex_integer_literal",
            "octal_integer_literal",
            "binary_integer_literal",
        ],
        NodeCategory::FloatLiteral => &[
            "decimal_floating_point_literal",
            "hex_floating_point_literal",
        ],
        NodeCategory::StringLiteral => &["string_literal", "character_literal", "text_block"],
        NodeCategory::BooleanLiteral => &["true", "false"],
        NodeCategory::NullLiteral => &["null_literal"],
        NodeCategory::Identifier => &["identifier"],
        NodeCategory::Invocation => &["method_invocation"],
        NodeCategory::Construction => &["object_creation_expression"],
        NodeCategory::MemberAccess => &["field_access"],
        NodeCategory::ArrayCreation => &["array_creation_expression", "array_initializer"],
        NodeCategory::Parenthesized => &["parenthesized_expression"],
        NodeCategory::Cast => &["cast_expression"],
        NodeCategory::UnaryExpression => &["unary_expression"],
        NodeCategory::FunctionDeclaration => &[
            "method_declaration",
            "constructor_declaration",
            "compact_constructor_declaration",
        ],
        NodeCategory::TypeDeclaration => &[
            "class_declaration",
            "interface_declaration",
            "enum_declaration",
            "record_declaration",
        ],
        NodeCategory::Assignment => &["assignment_expression"],
        NodeCategory::ReturnStatement => &["return_statement"],
    }
}

fn python_node_types(category: NodeCategory) -> &'static [&'static str] {
    match category {
        NodeCategory::IntegerLiteral => &["integer"],
        NodeCategory::FloatLiteral => &["float"],
        NodeCategory::StringLiteral => &["string", "concatenated_string"],
        NodeCategory::BooleanLiteral => &["true", "false"],
        NodeCategory::NullLiteral => &["none"],
        NodeCategory::Identifier => &["identifier"],
        NodeCategory::Invocation => &["call"],
        NodeCategory::Construction => &[],
        NodeCategory::MemberAccess => &["attribute"],
        NodeCategory::ArrayCreation => &["list", "tuple"],
        NodeCategory::Parenthesized => &["parenthesized_expression"],
        NodeCategory::Cast => &[],
        NodeCategory::UnaryExpression => &["unary_operator"],
        NodeCategory::FunctionDeclaration => &["function_definition"],
        NodeCategory::TypeDeclaration => &["class_definition"],
        NodeCategory::Assignment => &["assignment"],
        NodeCategory::ReturnStatement => &["return_statement"],
    }
}
