//! Pipeline orchestration.
//!
//! One submission flows through:
//! 1. `Classifier::classify()` — ordered pattern rules, may short-circuit
//! 2. `AttachmentAnalyzer::analyze()` — extraction and file-set discovery
//! 3. `FeatureValidator::validate_feature()` — per-feature state machine
//! 4. `DeduplicationEngine::is_duplicate()` — per valid feature
//! 5. Aggregation — one result tree, one terminal disposition
//!
//! Stages execute strictly in order; collections are processed in
//! deterministic discovery order so reruns of the same input reproduce
//! the same results.

pub mod orchestrator;
pub mod types;

pub use orchestrator::{PipelineDeps, PipelineOrchestrator};
pub use types::{Disposition, SessionCounters, SubmissionOutcome};
