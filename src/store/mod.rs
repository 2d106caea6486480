//! Persistence and notification seams.
//!
//! The pipeline core never opens a database connection or draws UI; it
//! records a finished result tree through [`PersistenceGateway`] and
//! streams progress through [`Notifier`]. Both are called only after a
//! disposition is reached — there are no partial writes mid-pipeline.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::pipeline::types::SubmissionOutcome;
use crate::report::TestResult;

/// Severity of a progress message shown to the reviewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Write-side persistence, behind an opaque named-query capability.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Record a submission's full result tree against a deliverable.
    async fn record_test_result(
        &self,
        tree: &TestResult,
        deliverable_id: &str,
    ) -> Result<(), StoreError>;

    /// Allocate the next identifier of a given kind (e.g. "deliverable").
    async fn next_id(&self, kind: &str) -> Result<String, StoreError>;

    /// Execute a named query for counters and status updates.
    async fn run_named_query(
        &self,
        name: &str,
        params: &[(&str, serde_json::Value)],
    ) -> Result<(), StoreError>;
}

/// Pure sink for reviewer-facing progress and outcomes.
pub trait Notifier: Send + Sync {
    /// Per-stage progress message.
    fn progress(&self, message: &str, severity: Severity);

    /// Terminal outcome of a run.
    fn outcome(&self, outcome: &SubmissionOutcome);
}

/// Notifier that only logs, for headless runs and tests.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn progress(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Info => tracing::info!("{message}"),
            Severity::Warning => tracing::warn!("{message}"),
            Severity::Error => tracing::error!("{message}"),
        }
    }

    fn outcome(&self, outcome: &SubmissionOutcome) {
        tracing::info!(
            disposition = ?outcome.disposition,
            summary = %outcome.result.summary_line(),
            "Submission outcome"
        );
    }
}
