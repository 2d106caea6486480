//! Attachment analyzer — extraction, file-set discovery, manifest.
//!
//! Each analysis step reports as a child of the analyzer's own
//! `TestResult`, so a reviewer can see exactly which stage of
//! attachment handling failed.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};
use walkdir::WalkDir;

use crate::attachments::archive::ArchiveExtractor;
use crate::attachments::types::{AnalyzedFile, FileSet};
use crate::classify::rules::RuleProvider;
use crate::classify::types::SubmissionType;
use crate::error::ConfigError;
use crate::report::TestResult;

/// Everything the analyzer learned about a submission's attachments.
#[derive(Debug)]
pub struct AnalysisReport {
    /// Discovered logical file-sets, in discovery order.
    pub file_sets: Vec<FileSet>,
    /// Manifest of every individual file post-extraction.
    pub all_files: Vec<AnalyzedFile>,
    /// The analyzer's subtree of the submission result.
    pub result: TestResult,
}

/// Discovers and catalogs the GIS content of an attachment folder.
pub struct AttachmentAnalyzer {
    extractor: Arc<dyn ArchiveExtractor>,
    rules: Arc<dyn RuleProvider>,
}

impl AttachmentAnalyzer {
    pub fn new(extractor: Arc<dyn ArchiveExtractor>, rules: Arc<dyn RuleProvider>) -> Self {
        Self { extractor, rules }
    }

    /// Analyze a submission's attachment folder.
    ///
    /// `Err` is reserved for configuration problems (no required
    /// extension set for the type). Everything data-driven — including
    /// a missing folder — lands in the returned result tree.
    pub fn analyze(
        &self,
        attachment_dir: Option<&Path>,
        submission_type: SubmissionType,
    ) -> Result<AnalysisReport, ConfigError> {
        let required = self
            .rules
            .required_extensions(submission_type)
            .ok_or_else(|| {
                ConfigError::MissingRequiredExtensions(submission_type.label().to_string())
            })?;

        let mut result = TestResult::pass("attachment analysis");

        // 1. No folder means the email had no attachments. A
        // validation failure, not a system error.
        let Some(folder) = attachment_dir else {
            result.add_subordinate_result(TestResult::fail("attachment folder", "no attachments"));
            return Ok(AnalysisReport {
                file_sets: Vec::new(),
                all_files: Vec::new(),
                result,
            });
        };
        result.add_subordinate_result(TestResult::pass("attachment folder"));

        // 2. Extract archives. Per-archive failures are sub-failures;
        // an unreadable folder fails the analyzer but still returns
        // what was gathered.
        let extracted = match self.extractor.extract_all(folder) {
            Ok(outcome) => {
                let mut extraction = TestResult::pass("archive extraction");
                extraction.add_comment(format!("{} archive(s) extracted", outcome.extracted.len()));
                for (archive, reason) in &outcome.failures {
                    extraction
                        .add_subordinate_result(TestResult::fail(format!("extract {archive}"), reason));
                }
                result.add_subordinate_result(extraction);
                outcome.extracted
            }
            Err(e) => {
                warn!(folder = %folder.display(), error = %e, "Attachment analysis failed");
                result.mark_failed(e.to_string());
                result.add_subordinate_result(TestResult::fail("archive extraction", e.to_string()));
                return Ok(AnalysisReport {
                    file_sets: Vec::new(),
                    all_files: Vec::new(),
                    result,
                });
            }
        };

        // 3 + 4. Walk once for file-sets and the manifest.
        let files = match collect_files(folder) {
            Ok(files) => files,
            Err(reason) => {
                result.mark_failed(reason.clone());
                result.add_subordinate_result(TestResult::fail("file manifest", reason));
                return Ok(AnalysisReport {
                    file_sets: Vec::new(),
                    all_files: Vec::new(),
                    result,
                });
            }
        };

        let file_sets = identify_file_sets(&files, &required);
        let valid_count = file_sets.iter().filter(|s| s.valid_set).count();
        let mut set_result = TestResult::new("file set identification", valid_count > 0);
        set_result.add_comment(format!(
            "{} file set(s) found, {} valid",
            file_sets.len(),
            valid_count
        ));
        if valid_count == 0 {
            set_result.add_comment(format!(
                "required extensions: {}",
                required.iter().cloned().collect::<Vec<_>>().join(", ")
            ));
        }
        result.add_subordinate_result(set_result);

        let all_files = build_manifest(files, &extracted);
        let mut manifest_result = TestResult::pass("file manifest");
        manifest_result.add_comment(format!("{} file(s)", all_files.len()));
        result.add_subordinate_result(manifest_result);

        info!(
            folder = %folder.display(),
            file_sets = file_sets.len(),
            valid_sets = valid_count,
            files = all_files.len(),
            "Attachment analysis complete"
        );

        Ok(AnalysisReport {
            file_sets,
            all_files,
            result,
        })
    }
}

/// Every regular file under the folder, in deterministic order.
fn collect_files(folder: &Path) -> Result<Vec<PathBuf>, String> {
    let mut files = Vec::new();
    for entry in WalkDir::new(folder).sort_by_file_name() {
        let entry = entry.map_err(|e| e.to_string())?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Group files into file-sets by (directory, base name).
fn identify_file_sets(
    files: &[PathBuf],
    required: &std::collections::BTreeSet<String>,
) -> Vec<FileSet> {
    let mut groups: BTreeMap<(PathBuf, String), std::collections::BTreeSet<String>> =
        BTreeMap::new();

    for file in files {
        let (Some(parent), Some(stem), Some(ext)) = (
            file.parent(),
            file.file_stem().map(|s| s.to_string_lossy().into_owned()),
            file.extension()
                .map(|e| e.to_string_lossy().to_lowercase()),
        ) else {
            continue;
        };
        groups
            .entry((parent.to_path_buf(), stem))
            .or_default()
            .insert(ext);
    }

    groups
        .into_iter()
        // Only groups that look like GIS datasets at all.
        .filter(|(_, extensions)| extensions.iter().any(|e| required.contains(e)))
        .map(|((path, file_name), extensions)| {
            let valid_set = required.is_subset(&extensions);
            FileSet {
                file_name,
                path,
                fileset_type: "shapefile".to_string(),
                extensions,
                valid_set,
            }
        })
        .collect()
}

/// Tag each file with the archive it came out of, matched by path
/// prefix against the extraction directories.
fn build_manifest(files: Vec<PathBuf>, extracted: &[super::ExtractedArchive]) -> Vec<AnalyzedFile> {
    files
        .into_iter()
        .map(|path| {
            let origin_archive = extracted
                .iter()
                .find(|a| path.starts_with(&a.extraction_path))
                .map(|a| a.archive_name.clone());
            AnalyzedFile {
                file_name: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                origin_archive,
                current_path: path,
            }
        })
        .collect()
}
