//! Crypto Detection Core
//!
//! Rule-driven detection of cryptographic API usage. Rules describe calls on
//! crypto library types; a single pre-order pass over a tree-sitter syntax
//! tree matches them, resolves their arguments to constants and collects the
//! results into detection trees.
pub mod config;
pub mod engine;
pub mod error;
pub mod handler;
pub mod hooks;
pub mod lang;
pub mod logging;
pub mod reporting;
pub mod rule;
pub mod scanner;
pub mod store;

pub use config::ScanConfig;
pub use engine::{Context, DetectionEngine, Language};
pub use error::{Error, Result};
pub use reporting::{CollectingReporter, NullReporter, StatusReporting};
pub use rule::{DetectionRule, Parameter};
pub use scanner::{ScanOutcome, Scanner};
pub use store::{Finding, FindingNode};
