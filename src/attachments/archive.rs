//! Archive extraction.
//!
//! Every archive found under the attachment folder is extracted into a
//! sibling directory named after the archive (numeric suffix on
//! collision) and the original is deleted. Nested archives are picked
//! up on subsequent passes until the folder reaches a fixed point.
//! A corrupt archive is a recorded per-archive failure, never fatal to
//! the batch.

use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::AnalysisError;

/// Passes over the folder before giving up on nested archives. Keeps a
/// zip-of-itself from looping forever.
const MAX_EXTRACTION_PASSES: usize = 8;

/// One successfully extracted archive.
#[derive(Debug, Clone)]
pub struct ExtractedArchive {
    /// Bare archive file name (e.g. "site_123.zip").
    pub archive_name: String,
    /// Directory its contents were extracted into.
    pub extraction_path: PathBuf,
}

/// Result of an extraction batch.
#[derive(Debug, Default)]
pub struct ExtractionOutcome {
    pub extracted: Vec<ExtractedArchive>,
    /// (archive name, reason) per archive that could not be extracted.
    pub failures: Vec<(String, String)>,
}

/// Recursively extracts archives found under a folder.
pub trait ArchiveExtractor: Send + Sync {
    fn extract_all(&self, folder: &Path) -> Result<ExtractionOutcome, AnalysisError>;
}

/// Zip-backed extractor.
#[derive(Debug, Default)]
pub struct ZipExtractor;

impl ZipExtractor {
    pub fn new() -> Self {
        Self
    }

    fn extract_one(&self, archive_path: &Path) -> Result<ExtractedArchive, AnalysisError> {
        let archive_name = archive_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let target = unique_sibling_dir(archive_path);

        let file = File::open(archive_path).map_err(|e| AnalysisError::Extraction {
            archive: archive_name.clone(),
            reason: e.to_string(),
        })?;
        let mut zip = zip::ZipArchive::new(file).map_err(|e| AnalysisError::Extraction {
            archive: archive_name.clone(),
            reason: e.to_string(),
        })?;
        zip.extract(&target).map_err(|e| AnalysisError::Extraction {
            archive: archive_name.clone(),
            reason: e.to_string(),
        })?;

        debug!(archive = %archive_name, target = %target.display(), "Extracted archive");
        Ok(ExtractedArchive {
            archive_name,
            extraction_path: target,
        })
    }
}

impl ArchiveExtractor for ZipExtractor {
    fn extract_all(&self, folder: &Path) -> Result<ExtractionOutcome, AnalysisError> {
        let mut outcome = ExtractionOutcome::default();

        for _ in 0..MAX_EXTRACTION_PASSES {
            let archives = find_archives(folder)?;
            if archives.is_empty() {
                break;
            }
            for archive_path in archives {
                match self.extract_one(&archive_path) {
                    Ok(extracted) => {
                        // Original removed so later passes and the
                        // manifest only see payload files.
                        if let Err(e) = std::fs::remove_file(&archive_path) {
                            warn!(
                                archive = %archive_path.display(),
                                error = %e,
                                "Could not delete extracted archive"
                            );
                        }
                        outcome.extracted.push(extracted);
                    }
                    Err(e) => {
                        warn!(archive = %archive_path.display(), error = %e, "Extraction failed");
                        let name = archive_path
                            .file_name()
                            .map(|n| n.to_string_lossy().into_owned())
                            .unwrap_or_default();
                        outcome.failures.push((name, e.to_string()));
                        // Quarantine the corrupt file so it is not
                        // rediscovered on the next pass.
                        if let Err(remove_err) = std::fs::rename(
                            &archive_path,
                            archive_path.with_extension("zip.corrupt"),
                        ) {
                            warn!(
                                archive = %archive_path.display(),
                                error = %remove_err,
                                "Could not quarantine corrupt archive"
                            );
                            return Ok(outcome);
                        }
                    }
                }
            }
        }

        Ok(outcome)
    }
}

/// All zip files currently under the folder, in deterministic order.
fn find_archives(folder: &Path) -> Result<Vec<PathBuf>, AnalysisError> {
    let mut archives = Vec::new();
    for entry in WalkDir::new(folder).sort_by_file_name() {
        let entry = entry.map_err(|e| AnalysisError::FolderScan {
            path: folder.display().to_string(),
            reason: e.to_string(),
        })?;
        if entry.file_type().is_file()
            && entry
                .path()
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
        {
            archives.push(entry.into_path());
        }
    }
    Ok(archives)
}

/// Sibling directory named after the archive stem, suffixed on
/// collision: `site`, `site_1`, `site_2`, …
fn unique_sibling_dir(archive_path: &Path) -> PathBuf {
    let parent = archive_path.parent().unwrap_or_else(|| Path::new("."));
    let stem = archive_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "archive".to_string());

    let base = parent.join(&stem);
    if !base.exists() {
        return base;
    }
    let mut suffix = 1;
    loop {
        let candidate = parent.join(format!("{stem}_{suffix}"));
        if !candidate.exists() {
            return candidate;
        }
        suffix += 1;
    }
}
