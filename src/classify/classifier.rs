//! Classifier — ordered rule evaluation over subject and sender.
//!
//! Pure over the email plus the configured pattern list: no IO, no
//! backtracking, first match wins. The empty-subject check runs before
//! any pattern so a blank subject can never be spam or a submission.

use std::sync::Arc;

use tracing::debug;

use crate::classify::rules::{self, RuleField, RuleProvider, Verdict};
use crate::classify::types::{ClassificationResult, EmailClass};
use crate::error::ConfigError;
use crate::mail::EmailSummary;

/// Rule-driven email classifier.
pub struct Classifier {
    rules: Arc<dyn RuleProvider>,
}

impl std::fmt::Debug for Classifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Classifier").finish_non_exhaustive()
    }
}

impl Classifier {
    /// Create a classifier over a rule provider.
    ///
    /// Fails fast when the provider has no patterns — a silent
    /// `Unknown`-for-everything classifier would look like bad data
    /// instead of bad configuration.
    pub fn new(rules: Arc<dyn RuleProvider>) -> Result<Self, ConfigError> {
        if rules.classification_patterns().is_empty() {
            return Err(ConfigError::NoClassificationPatterns);
        }
        Ok(Self { rules })
    }

    /// Classify one inbound email.
    pub fn classify(&self, email: &EmailSummary) -> ClassificationResult {
        if email.subject.trim().is_empty() {
            debug!(id = %email.id, "Empty subject");
            return ClassificationResult {
                class: EmailClass::EmptySubject,
                is_subject_valid: false,
                invalid_reason: Some("subject is empty".to_string()),
                note: None,
                pref_ids: Vec::new(),
                alt_ids: Vec::new(),
                activity_nums: Vec::new(),
            };
        }

        for rule in self.rules.classification_patterns() {
            let field_value = match rule.field {
                RuleField::Sender => &email.sender,
                RuleField::Subject => &email.subject,
            };
            if !rule.regex.is_match(field_value) {
                continue;
            }

            let class = match rule.verdict {
                Verdict::Spam => EmailClass::Spam,
                Verdict::AutoResponse => EmailClass::AutoResponse,
                Verdict::Submission(submission_type) => EmailClass::Submission { submission_type },
            };
            debug!(
                id = %email.id,
                class = class.label(),
                pattern = %rule.pattern,
                "Email matched classification rule"
            );
            return self.build_result(email, class, Some(rule.pattern.clone()));
        }

        debug!(id = %email.id, "No classification rule matched");
        self.build_result(email, EmailClass::Unknown, None)
    }

    fn build_result(
        &self,
        email: &EmailSummary,
        class: EmailClass,
        note: Option<String>,
    ) -> ClassificationResult {
        let is_subject_valid = matches!(class, EmailClass::Submission { .. });
        let invalid_reason = match class {
            EmailClass::Spam => Some("matched a spam pattern".to_string()),
            EmailClass::AutoResponse => Some("automated reply".to_string()),
            EmailClass::Unknown => Some("no configured pattern matched".to_string()),
            _ => None,
        };
        ClassificationResult {
            class,
            is_subject_valid,
            invalid_reason,
            note,
            pref_ids: rules::mine_pref_ids(&email.subject),
            alt_ids: rules::mine_alt_ids(&email.subject),
            activity_nums: rules::mine_activity_nums(&email.subject),
        }
    }
}
