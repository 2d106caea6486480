//! Hierarchical pass/fail test results.
//!
//! Every pipeline stage — regex classification, file IO, geometry math,
//! store lookups — reports through the same tree shape so the UI and
//! persistence share one vocabulary. Nodes are append-only during a
//! run: a child is built up by the stage that evaluates its rule and
//! then attached to the parent, never mutated by a sibling afterwards.

use serde::{Deserialize, Serialize};

/// One node in the result tree.
///
/// `passed` reflects only this node's own rule outcome. The composite
/// verdict is [`TestResult::overall_passed`], computed recursively on
/// read — it is never written back onto children.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    /// Which rule produced this node.
    pub rule_name: String,
    /// Outcome of this node's own rule.
    pub passed: bool,
    /// Human-readable commentary, in the order it was added.
    pub comments: Vec<String>,
    /// Children, insertion order = execution order.
    pub sub_results: Vec<TestResult>,
}

impl TestResult {
    /// Create a node with an explicit outcome and no commentary.
    pub fn new(rule_name: impl Into<String>, passed: bool) -> Self {
        Self {
            rule_name: rule_name.into(),
            passed,
            comments: Vec::new(),
            sub_results: Vec::new(),
        }
    }

    /// Create a passing node.
    pub fn pass(rule_name: impl Into<String>) -> Self {
        Self::new(rule_name, true)
    }

    /// Create a failing node with one comment explaining why.
    pub fn fail(rule_name: impl Into<String>, comment: impl Into<String>) -> Self {
        let mut result = Self::new(rule_name, false);
        result.add_comment(comment);
        result
    }

    /// Append a comment to this node.
    pub fn add_comment(&mut self, comment: impl Into<String>) {
        self.comments.push(comment.into());
    }

    /// Attach a child. Children are owned by the parent from this
    /// point on and must not be edited through another handle.
    pub fn add_subordinate_result(&mut self, child: TestResult) {
        self.sub_results.push(child);
    }

    /// Recursive AND over this node and its whole subtree.
    pub fn overall_passed(&self) -> bool {
        self.passed && self.sub_results.iter().all(TestResult::overall_passed)
    }

    /// Mark this node's own rule failed and record why.
    pub fn mark_failed(&mut self, comment: impl Into<String>) {
        self.passed = false;
        self.add_comment(comment);
    }

    /// Count of failing nodes in the subtree (including this one).
    pub fn failure_count(&self) -> usize {
        let own = usize::from(!self.passed);
        own + self
            .sub_results
            .iter()
            .map(TestResult::failure_count)
            .sum::<usize>()
    }

    /// The single status line shown to a reviewer for this subtree.
    pub fn summary_line(&self) -> String {
        if self.overall_passed() {
            format!("{}: passed", self.rule_name)
        } else {
            let first_reason = self
                .first_failure_comment()
                .unwrap_or_else(|| "no reason recorded".to_string());
            format!(
                "{}: failed ({} failing check{}) — {}",
                self.rule_name,
                self.failure_count(),
                if self.failure_count() == 1 { "" } else { "s" },
                first_reason
            )
        }
    }

    /// Depth-first search for the first comment on a failing node.
    fn first_failure_comment(&self) -> Option<String> {
        if !self.passed
            && let Some(comment) = self.comments.first()
        {
            return Some(comment.clone());
        }
        self.sub_results
            .iter()
            .find_map(TestResult::first_failure_comment)
    }
}
