use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {message}")]
    ReadFailed { path: PathBuf, message: String },

    #[error("failed to parse config file '{path}': {message}")]
    ParseFailed { path: PathBuf, message: String },

    #[error("unsupported config format: {format} (expected json or yaml)")]
    UnsupportedFormat { format: String },
}

impl ConfigError {
    pub fn read_failed(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ReadFailed {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn parse_failed(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ParseFailed {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_failed_display() {
        let err = ConfigError::read_failed("/etc/scan.yaml", "permission denied");
        assert_eq!(
            err.to_string(),
            "failed to read config file '/etc/scan.yaml': permission denied"
        );
    }

    #[test]
    fn test_unsupported_format_display() {
        let err = ConfigError::unsupported_format("toml");
        assert_eq!(
            err.to_string(),
            "unsupported config format: toml (expected json or yaml)"
        );
    }
}
