//! Scan tuning knobs.
//!
//! Loaded from JSON or YAML; every field has a default so partial files are
//! accepted.

use crate::error::ConfigError;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::debug;

pub const DEFAULT_MAX_RESOLUTION_DEPTH: usize = 50;
pub const DEFAULT_MAX_HOOK_CHAIN: usize = 8;
pub const DEFAULT_MAX_STORE_DEPTH: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Recursion bound for inner and outer value resolution
    pub max_resolution_depth: usize,

    /// Successive hooks allowed from one original request
    pub max_hook_chain: usize,

    /// Maximum nesting level of detection stores
    pub max_store_depth: usize,

    /// Allow subtype matches outside hook context
    pub match_subtypes: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_resolution_depth: DEFAULT_MAX_RESOLUTION_DEPTH,
            max_hook_chain: DEFAULT_MAX_HOOK_CHAIN,
            max_store_depth: DEFAULT_MAX_STORE_DEPTH,
            match_subtypes: true,
        }
    }
}

impl ScanConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::read_failed(path, e.to_string()))?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        let config: ScanConfig = match extension.as_str() {
            "json" => serde_json::from_str(&content)
                .map_err(|e| ConfigError::parse_failed(path, e.to_string()))?,
            "yaml" | "yml" => serde_yaml::from_str(&content)
                .map_err(|e| ConfigError::parse_failed(path, e.to_string()))?,
            other => return Err(ConfigError::unsupported_format(other)),
        };

        debug!(
            path = %path.display(),
            max_resolution_depth = config.max_resolution_depth,
            max_hook_chain = config.max_hook_chain,
            "loaded scan config"
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(suffix: &str, content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = ScanConfig::default();
        assert_eq!(config.max_resolution_depth, 50);
        assert_eq!(config.max_hook_chain, 8);
        assert!(config.match_subtypes);
    }

    #[test]
    fn test_load_json_partial() {
        let file = write_config(".json", r#"{"max_hook_chain": 2}"#);
        let config = ScanConfig::load(file.path()).unwrap();
        assert_eq!(config.max_hook_chain, 2);
        assert_eq!(config.max_resolution_depth, DEFAULT_MAX_RESOLUTION_DEPTH);
    }

    #[test]
    fn test_load_yaml() {
        let file = write_config(".yaml", "match_subtypes: false\nmax_store_depth: 4\n");
        let config = ScanConfig::load(file.path()).unwrap();
        assert!(!config.match_subtypes);
        assert_eq!(config.max_store_depth, 4);
    }

    #[test]
    fn test_unsupported_extension() {
        let file = write_config(".toml", "max_hook_chain = 2");
        let err = ScanConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_invalid_json() {
        let file = write_config(".json", "{ not json");
        let err = ScanConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseFailed { .. }));
    }
}
