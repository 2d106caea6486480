//! Error types for IC Intake.

/// Top-level error type for the intake pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Mail error: {0}")]
    Mail(#[from] MailError),

    #[error("Attachment analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}

/// Configuration-related errors.
///
/// Distinct from validation failures: a `ConfigError` means an operator
/// has to fix the rule tables, not that a submitter sent bad data.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("No classification patterns configured")]
    NoClassificationPatterns,

    #[error("Invalid pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Missing geometry rules for submission type {0}")]
    MissingGeometryRules(String),

    #[error("Missing required-extension set for submission type {0}")]
    MissingRequiredExtensions(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Mail source and message-parsing errors.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Failed to parse message {id}: {reason}")]
    Parse { id: String, reason: String },

    #[error("Mail source failure in folder {folder}: {reason}")]
    Source { folder: String, reason: String },

    #[error("Failed to move message {id} to {folder}: {reason}")]
    Move {
        id: String,
        folder: String,
        reason: String,
    },
}

/// Attachment extraction and file-set analysis errors.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("Failed to extract archive {archive}: {reason}")]
    Extraction { archive: String, reason: String },

    #[error("Failed to walk attachment folder {path}: {reason}")]
    FolderScan { path: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Geometry backend and feature-reading errors.
#[derive(Debug, thiserror::Error)]
pub enum GeometryError {
    #[error("Failed to read features from {fileset}: {reason}")]
    Read { fileset: String, reason: String },

    #[error("No transform registered from SRID {from} to SRID {to}")]
    UnsupportedTransform { from: u32, to: u32 },

    #[error("Reprojection to SRID {target} failed: {reason}")]
    Reprojection { target: u32, reason: String },

    #[error("Repair produced no polygon")]
    RepairProducedNothing,
}

/// Reference-store and persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Reference layer unavailable: {0}")]
    ReferenceUnavailable(String),

    #[error("Duplicate lookup failed: {0}")]
    Lookup(String),

    #[error("Named query {name} failed: {reason}")]
    Query { name: String, reason: String },

    #[error("Failed to record test result for deliverable {deliverable_id}: {reason}")]
    RecordFailed {
        deliverable_id: String,
        reason: String,
    },

    #[error("Id allocation failed for kind {kind}: {reason}")]
    IdAllocation { kind: String, reason: String },
}

/// Pipeline orchestration errors.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Configuration failure: {0}")]
    Config(#[from] ConfigError),

    #[error("Feature read failed: {0}")]
    FeatureRead(#[from] GeometryError),

    #[error("Store failure: {0}")]
    Store(#[from] StoreError),

    #[error("Pipeline aborted at stage {stage}: {reason}")]
    Aborted { stage: String, reason: String },
}

/// Result type alias for the intake pipeline.
pub type Result<T> = std::result::Result<T, Error>;
