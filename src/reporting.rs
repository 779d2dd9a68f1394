//! Status reporting surface for a scan.

use crate::store::Finding;

/// Receives progress and findings while a unit is scanned.
pub trait StatusReporting {
    /// One rule evaluation started.
    fn increment_visited_rules(&mut self);

    /// More rule evaluations were scheduled.
    fn add_expected_rule_visits(&mut self, count: usize);

    fn emit_finding(&mut self, finding: Finding);
}

/// Keeps everything in memory.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    visited: usize,
    expected: usize,
    findings: Vec<Finding>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visited(&self) -> usize {
        self.visited
    }

    pub fn expected(&self) -> usize {
        self.expected
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn into_findings(self) -> Vec<Finding> {
        self.findings
    }
}

impl StatusReporting for CollectingReporter {
    fn increment_visited_rules(&mut self) {
        self.visited += 1;
    }

    fn add_expected_rule_visits(&mut self, count: usize) {
        self.expected += count;
    }

    fn emit_finding(&mut self, finding: Finding) {
        self.findings.push(finding);
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl StatusReporting for NullReporter {
    fn increment_visited_rules(&mut self) {}

    fn add_expected_rule_visits(&mut self, _count: usize) {}

    fn emit_finding(&mut self, _finding: Finding) {}
}
