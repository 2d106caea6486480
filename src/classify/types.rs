//! Classification result types.

use serde::{Deserialize, Serialize};

/// Actively handled submission types, in classification priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SubmissionType {
    Cea,
    Dna,
    Cke,
    Iec,
    Wrs,
}

impl SubmissionType {
    /// All handled types in fixed priority order.
    pub const ALL: [SubmissionType; 5] = [
        SubmissionType::Cea,
        SubmissionType::Dna,
        SubmissionType::Cke,
        SubmissionType::Iec,
        SubmissionType::Wrs,
    ];

    /// Short label for logging and rule names.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Cea => "CEA",
            Self::Dna => "DNA",
            Self::Cke => "CKE",
            Self::Iec => "IEC",
            Self::Wrs => "WRS",
        }
    }
}

impl std::fmt::Display for SubmissionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// What an email was classified as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "class", rename_all = "snake_case")]
pub enum EmailClass {
    Unknown,
    EmptySubject,
    Spam,
    AutoResponse,
    Submission { submission_type: SubmissionType },
}

impl EmailClass {
    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::EmptySubject => "empty_subject",
            Self::Spam => "spam",
            Self::AutoResponse => "auto_response",
            Self::Submission { .. } => "submission",
        }
    }

    /// True for classes that never enter the validation pipeline.
    pub fn is_simple_case(&self) -> bool {
        !matches!(self, Self::Submission { .. })
    }
}

/// Result of classifying one inbound email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub class: EmailClass,
    pub is_subject_valid: bool,
    /// Why the subject was judged invalid, when it was.
    pub invalid_reason: Option<String>,
    /// Which pattern matched, for the audit trail.
    pub note: Option<String>,
    /// Pref IDs mined from the subject.
    pub pref_ids: Vec<String>,
    /// Alternate site IDs mined from the subject.
    pub alt_ids: Vec<String>,
    /// Activity numbers mined from the subject.
    pub activity_nums: Vec<String>,
}

impl ClassificationResult {
    /// The submission type, when this is an actively handled class.
    pub fn submission_type(&self) -> Option<SubmissionType> {
        match self.class {
            EmailClass::Submission { submission_type } => Some(submission_type),
            _ => None,
        }
    }
}
