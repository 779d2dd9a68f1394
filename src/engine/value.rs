//! Constants recovered from the syntax tree during value resolution.
//!
//! A constant is what resolution bottoms out at before a value factory turns
//! it into a typed `DetectedValue`.
use serde::Serialize;
use std::fmt;
use tree_sitter::Node;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum Constant {
    Int(i64),
    Str(String),
    Bool(bool),
}

/// Runtime representation a value factory expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstantKind {
    Int,
    Str,
    Bool,
    Any,
}

impl Constant {
    pub fn kind(&self) -> ConstantKind {
        match self {
            Self::Int(_) => ConstantKind::Int,
            Self::Str(_) => ConstantKind::Str,
            Self::Bool(_) => ConstantKind::Bool,
        }
    }

    /// Convert to the expected representation.
    ///
    /// `None` is a failed cast, which callers treat as "not resolved".
    pub fn cast(&self, kind: ConstantKind) -> Option<Constant> {
        match (self, kind) {
            (_, ConstantKind::Any) => Some(self.clone()),
            (Self::Int(n), ConstantKind::Int) => Some(Self::Int(*n)),
            (Self::Str(s), ConstantKind::Int) => s.trim().parse().ok().map(Self::Int),
            (Self::Bool(_), ConstantKind::Int) => None,
            (Self::Str(s), ConstantKind::Str) => Some(Self::Str(s.clone())),
            (Self::Int(n), ConstantKind::Str) => Some(Self::Str(n.to_string())),
            (Self::Bool(b), ConstantKind::Str) => Some(Self::Str(b.to_string())),
            (Self::Bool(b), ConstantKind::Bool) => Some(Self::Bool(*b)),
            (Self::Str(s), ConstantKind::Bool) => match s.as_str() {
                "true" => Some(Self::Bool(true)),
                "false" => Some(Self::Bool(false)),
                _ => None,
            },
            (Self::Int(_), ConstantKind::Bool) => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Str(s) => f.write_str(s),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// A constant together with the node it was read from.
#[derive(Debug, Clone)]
pub struct ResolvedValue<'a> {
    pub constant: Constant,
    pub node: Node<'a>,
}

impl<'a> ResolvedValue<'a> {
    pub fn new(constant: Constant, node: Node<'a>) -> Self {
        Self { constant, node }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cast_string_to_int() {
        let value = Constant::Str(" 256 ".to_string());
        assert_eq!(value.cast(ConstantKind::Int), Some(Constant::Int(256)));
    }

    #[test]
    fn test_cast_failure_is_none() {
        let value = Constant::Str("AES".to_string());
        assert_eq!(value.cast(ConstantKind::Int), None);
        assert_eq!(Constant::Int(1).cast(ConstantKind::Bool), None);
    }

    #[test]
    fn test_cast_any_keeps_value() {
        let value = Constant::Bool(true);
        assert_eq!(value.cast(ConstantKind::Any), Some(Constant::Bool(true)));
        assert_eq!(value.cast(ConstantKind::Str), Some(Constant::Str("true".into())));
    }
}
