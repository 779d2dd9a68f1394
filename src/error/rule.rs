use thiserror::Error;

/// Catalog authoring mistakes. These are the only hard failures in the crate
/// and are raised while rules are being built, never during a scan.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("wildcard cannot be combined with other values in {group}")]
    WildcardCombined { group: String },

    #[error("no candidate values supplied for {group}")]
    EmptySelector { group: String },

    #[error("method-only rules cannot declare parameters")]
    ParametersOnMethodOnlyRule,

    #[error("invalid move-under target index {index}")]
    InvalidMoveUnder { index: i32 },
}

impl RuleError {
    pub fn wildcard_combined(group: impl Into<String>) -> Self {
        Self::WildcardCombined {
            group: group.into(),
        }
    }

    pub fn empty_selector(group: impl Into<String>) -> Self {
        Self::EmptySelector {
            group: group.into(),
        }
    }

    pub fn invalid_move_under(index: i32) -> Self {
        Self::InvalidMoveUnder { index }
    }
}
