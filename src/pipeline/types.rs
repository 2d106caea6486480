//! Shared types for the submission pipeline.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::geometry::ShapeItem;
use crate::report::TestResult;

// ── Disposition ─────────────────────────────────────────────────────

/// Terminal decision for one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Validated, deduplicated, and persisted.
    Saved,
    /// Set aside without a verdict (auto-replies, manual skip).
    Skipped,
    /// Failed validation or aborted; nothing was recorded.
    Rejected,
    /// Well-formed but needs a human call (e.g. duplicates only).
    RequiresManualReview,
}

impl Disposition {
    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Saved => "saved",
            Self::Skipped => "skipped",
            Self::Rejected => "rejected",
            Self::RequiresManualReview => "manual_review",
        }
    }
}

// ── Session counters ────────────────────────────────────────────────

/// Per-session tallies, passed into and returned from each run.
///
/// An explicit value rather than shared mutable state: each run gets
/// its own copy and the caller merges, so concurrent sessions cannot
/// trample each other's counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionCounters {
    pub passed: u32,
    pub failed: u32,
    pub skipped: u32,
}

impl SessionCounters {
    pub fn record_passed(&mut self) {
        self.passed += 1;
    }

    pub fn record_failed(&mut self) {
        self.failed += 1;
    }

    pub fn record_skipped(&mut self) {
        self.skipped += 1;
    }

    /// Undo an optimistic `record_passed` after a failed save.
    pub fn rollback_passed(&mut self) {
        self.passed = self.passed.saturating_sub(1);
    }

    /// Fold another session's tallies into this one.
    pub fn merge(&mut self, other: &SessionCounters) {
        self.passed += other.passed;
        self.failed += other.failed;
        self.skipped += other.skipped;
    }
}

// ── Submission outcome ──────────────────────────────────────────────

/// Result of running one submission through the pipeline.
#[derive(Debug)]
pub struct SubmissionOutcome {
    /// Identifier of this pipeline run.
    pub run_id: Uuid,
    /// Source message the run processed.
    pub email_id: String,
    /// Terminal decision.
    pub disposition: Disposition,
    /// Root of the hierarchical test report.
    pub result: TestResult,
    /// Features that validated cleanly and were not duplicates.
    pub accepted: Vec<ShapeItem>,
    /// Valid features that duplicate an active existing record.
    pub duplicates: Vec<ShapeItem>,
    /// Features that failed validation.
    pub rejected: Vec<ShapeItem>,
    /// When the run finished.
    pub completed_at: DateTime<Utc>,
}

impl SubmissionOutcome {
    /// The one-line status shown to the reviewer.
    pub fn status_line(&self) -> String {
        format!("[{}] {}", self.disposition.label(), self.result.summary_line())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rollback_undoes_one_pass() {
        let mut counters = SessionCounters::default();
        counters.record_passed();
        counters.record_passed();
        counters.rollback_passed();
        assert_eq!(counters.passed, 1);
    }

    #[test]
    fn rollback_at_zero_saturates() {
        let mut counters = SessionCounters::default();
        counters.rollback_passed();
        assert_eq!(counters.passed, 0);
    }

    #[test]
    fn merge_sums_all_tallies() {
        let mut a = SessionCounters {
            passed: 1,
            failed: 2,
            skipped: 3,
        };
        let b = SessionCounters {
            passed: 10,
            failed: 20,
            skipped: 30,
        };
        a.merge(&b);
        assert_eq!(
            a,
            SessionCounters {
                passed: 11,
                failed: 22,
                skipped: 33,
            }
        );
    }

    #[test]
    fn status_line_includes_disposition() {
        let outcome = SubmissionOutcome {
            run_id: Uuid::new_v4(),
            email_id: "msg-1".into(),
            disposition: Disposition::Rejected,
            result: TestResult::fail("submission", "no attachments"),
            accepted: vec![],
            duplicates: vec![],
            rejected: vec![],
            completed_at: Utc::now(),
        };
        assert!(outcome.status_line().starts_with("[rejected]"));
        assert!(outcome.status_line().contains("no attachments"));
    }
}
