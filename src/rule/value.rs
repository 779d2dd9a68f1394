//! Typed detection values produced by value and action factories.

use serde::Serialize;
use std::fmt;
use tree_sitter::Node;

/// 1-based source position plus the byte span of the node a value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
    pub start_byte: usize,
    pub end_byte: usize,
}

impl Location {
    pub fn of(node: &Node) -> Self {
        let start = node.start_position();
        Self {
            line: start.row + 1,
            column: start.column + 1,
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Algorithm,
    Mode,
    Padding,
    Curve,
    OperationMode,
    KeySize,
    MacSize,
    BlockSize,
    DigestSize,
    SaltSize,
    IterationCount,
    Action,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeUnit {
    Bit,
    Byte,
}

impl SizeUnit {
    fn label(self) -> &'static str {
        match self {
            Self::Bit => "bits",
            Self::Byte => "bytes",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DetectedValue {
    kind: ValueKind,
    value: String,
    unit: Option<SizeUnit>,
    location: Location,
}

impl DetectedValue {
    pub fn new(kind: ValueKind, value: impl Into<String>, location: Location) -> Self {
        Self {
            kind,
            value: value.into(),
            unit: None,
            location,
        }
    }

    pub fn sized(kind: ValueKind, size: i64, unit: SizeUnit, location: Location) -> Self {
        Self {
            kind,
            value: size.to_string(),
            unit: Some(unit),
            location,
        }
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn unit(&self) -> Option<SizeUnit> {
        self.unit
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub fn as_int(&self) -> Option<i64> {
        self.value.parse().ok()
    }
}

impl fmt::Display for DetectedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.unit {
            Some(unit) => write!(f, "{} {}", self.value, unit.label()),
            None => f.write_str(&self.value),
        }
    }
}
