//! Attachment handling — archive extraction, file-set discovery, and
//! the per-submission file manifest.

pub mod analyzer;
pub mod archive;
pub mod types;

pub use analyzer::{AnalysisReport, AttachmentAnalyzer};
pub use archive::{ArchiveExtractor, ExtractedArchive, ExtractionOutcome, ZipExtractor};
pub use types::{AnalyzedFile, FileSet};
