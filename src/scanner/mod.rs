use std::path::Path;
use std::sync::Arc;

use anyhow::{Context as AnyhowContext, Result};
use serde::Serialize;
use tracing::trace;
use tree_sitter::Tree;

use crate::config::ScanConfig;
use crate::engine::{Context, Language};
use crate::error::ParserError;
use crate::handler::Handler;
use crate::lang::parse;
use crate::reporting::StatusReporting;
use crate::rule::DetectionRule;
use crate::store::Finding;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanOutcome {
    pub file_path: String,
    pub findings: Vec<Finding>,
    /// Hooks nothing satisfied before the unit ended.
    pub pending_hooks: usize,
    /// Stores allocated during the scan.
    pub stores: usize,
}

impl ScanOutcome {
    pub fn finding_count(&self) -> usize {
        self.findings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }
}

/// Runs a fixed rule set over compilation units. Each scan gets its own
/// stores, hooks and call stack, so one scanner can serve many units.
pub struct Scanner {
    rules: Vec<Arc<DetectionRule>>,
    config: ScanConfig,
}

impl Scanner {
    pub fn new(rules: Vec<Arc<DetectionRule>>) -> Self {
        Self::with_config(rules, ScanConfig::default())
    }

    pub fn with_config(rules: Vec<Arc<DetectionRule>>, config: ScanConfig) -> Self {
        Self { rules, config }
    }

    pub fn rules(&self) -> &[Arc<DetectionRule>] {
        &self.rules
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn scan_tree(
        &self,
        tree: &Tree,
        source: &str,
        file_path: &str,
        language: Language,
        reporting: &mut dyn StatusReporting,
    ) -> ScanOutcome {
        trace!(file_path, language = language.tree_sitter_name(), "scanning tree");
        let ctx = Context::new(tree, source.as_bytes(), file_path, language);
        let mut handler = Handler::new(&ctx, &self.config, &self.rules, reporting);
        handler.scan();
        handler.finish()
    }

    pub fn scan_source(
        &self,
        source: &str,
        file_path: &str,
        language: Language,
        reporting: &mut dyn StatusReporting,
    ) -> Result<ScanOutcome, ParserError> {
        let tree = parse(source, language).map_err(|err| match err {
            ParserError::ParseFailed { .. } => ParserError::parse_failed(file_path),
            other => other,
        })?;
        Ok(self.scan_tree(&tree, source, file_path, language, reporting))
    }

    /// Read, parse and scan a file; the language comes from its extension.
    pub fn scan_file(
        &self,
        path: &Path,
        reporting: &mut dyn StatusReporting,
    ) -> Result<ScanOutcome> {
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        let language = Language::from_extension(extension)
            .ok_or_else(|| ParserError::unsupported_language(extension))
            .with_context(|| format!("Cannot scan {}", path.display()))?;
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let outcome = self.scan_source(&source, &path.to_string_lossy(), language, reporting)?;
        Ok(outcome)
    }
}
