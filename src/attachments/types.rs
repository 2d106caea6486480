//! File-set and manifest value types.

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A logical group of files composing one GIS dataset — e.g. the
/// .shp/.shx/.dbf/.prj files sharing a base name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSet {
    /// Shared base name of the member files.
    pub file_name: String,
    /// Directory the members live in.
    pub path: PathBuf,
    /// Dataset format label (e.g. "shapefile").
    pub fileset_type: String,
    /// Lower-cased extensions present for this base name.
    pub extensions: BTreeSet<String>,
    /// True only when every required extension for the type is present.
    pub valid_set: bool,
}

impl FileSet {
    /// Path of one member file by extension.
    pub fn member_path(&self, extension: &str) -> PathBuf {
        self.path.join(format!("{}.{extension}", self.file_name))
    }
}

/// One physical file post-extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzedFile {
    /// Bare file name.
    pub file_name: String,
    /// Name of the archive this file came out of, when it did.
    pub origin_archive: Option<String>,
    /// Where the file sits on disk now.
    pub current_path: PathBuf,
}
