//! Pattern rules and the rule-provider seam.
//!
//! Classification is driven by one ordered list of tagged rules — a
//! uniform `(field, regex, verdict)` triple per rule — evaluated by a
//! single matcher. There are no per-type rule subclasses; adding a
//! submission type means adding a row, not a type.

use std::collections::BTreeSet;

use regex::Regex;

use crate::classify::types::SubmissionType;
use crate::error::ConfigError;
use crate::geometry::GeometryRules;

/// Which email field a rule matches against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleField {
    Sender,
    Subject,
}

/// What a matching rule classifies the email as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Spam,
    AutoResponse,
    Submission(SubmissionType),
}

/// One classification rule with a compiled regex.
#[derive(Debug, Clone)]
pub struct PatternRule {
    /// Human-readable pattern description for the audit trail.
    pub pattern: String,
    /// Compiled regex for matching.
    pub regex: Regex,
    /// Which email field to match.
    pub field: RuleField,
    /// Classification applied on match.
    pub verdict: Verdict,
}

impl PatternRule {
    pub fn new(
        pattern: &str,
        field: RuleField,
        verdict: Verdict,
    ) -> Result<Self, ConfigError> {
        let regex = Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
            field,
            verdict,
        })
    }
}

/// Source of classification patterns, geometry rules, and required
/// extension sets.
///
/// Backed by configuration tables in production; tests supply statics.
pub trait RuleProvider: Send + Sync {
    /// Ordered classification patterns — spam first, then auto-reply,
    /// then submission types in priority order.
    fn classification_patterns(&self) -> &[PatternRule];

    /// Geometry rules for a submission type, if configured.
    fn geometry_rules(&self, submission_type: SubmissionType) -> Option<GeometryRules>;

    /// Required file extensions for a submission type's file-sets.
    fn required_extensions(&self, submission_type: SubmissionType) -> Option<BTreeSet<String>>;
}

// ── Static provider ─────────────────────────────────────────────────

/// In-memory rule provider with the production default patterns.
pub struct StaticRuleProvider {
    patterns: Vec<PatternRule>,
    geometry_rules: Vec<(SubmissionType, GeometryRules)>,
    required_extensions: Vec<(SubmissionType, BTreeSet<String>)>,
}

impl StaticRuleProvider {
    /// Build the default rule tables.
    pub fn default_rules() -> Result<Self, ConfigError> {
        let mut patterns = vec![
            PatternRule::new(r"(?i)^no[\-_.]?reply@", RuleField::Sender, Verdict::Spam)?,
            PatternRule::new(
                r"(?i)@(marketing|newsletter|promo|campaign)\b",
                RuleField::Sender,
                Verdict::Spam,
            )?,
            PatternRule::new(
                r"(?i)^(mailer[\-_]?daemon|postmaster)@",
                RuleField::Sender,
                Verdict::Spam,
            )?,
            PatternRule::new(r"(?i)\bunsubscribe\b", RuleField::Subject, Verdict::Spam)?,
            PatternRule::new(
                r"(?i)\b(out of office|automatic reply|auto[\-\s]?reply|away from the office)\b",
                RuleField::Subject,
                Verdict::AutoResponse,
            )?,
        ];
        for submission_type in SubmissionType::ALL {
            patterns.push(PatternRule::new(
                &format!(r"(?i)\b{}\b", submission_type.label()),
                RuleField::Subject,
                Verdict::Submission(submission_type),
            )?);
        }
        // "Institutional Control Submission" with no explicit type code
        // defaults to CEA, the most common deliverable.
        patterns.push(PatternRule::new(
            r"(?i)\binstitutional control submission\b",
            RuleField::Subject,
            Verdict::Submission(SubmissionType::Cea),
        )?);

        let shapefile_extensions: BTreeSet<String> = ["shp", "shx", "dbf", "prj"]
            .into_iter()
            .map(String::from)
            .collect();

        Ok(Self {
            patterns,
            geometry_rules: SubmissionType::ALL
                .into_iter()
                .map(|t| (t, GeometryRules::default_for(t)))
                .collect(),
            required_extensions: SubmissionType::ALL
                .into_iter()
                .map(|t| (t, shapefile_extensions.clone()))
                .collect(),
        })
    }

    /// Build a provider from explicit tables (tests, alternate config).
    pub fn new(
        patterns: Vec<PatternRule>,
        geometry_rules: Vec<(SubmissionType, GeometryRules)>,
        required_extensions: Vec<(SubmissionType, BTreeSet<String>)>,
    ) -> Self {
        Self {
            patterns,
            geometry_rules,
            required_extensions,
        }
    }
}

impl RuleProvider for StaticRuleProvider {
    fn classification_patterns(&self) -> &[PatternRule] {
        &self.patterns
    }

    fn geometry_rules(&self, submission_type: SubmissionType) -> Option<GeometryRules> {
        self.geometry_rules
            .iter()
            .find(|(t, _)| *t == submission_type)
            .map(|(_, r)| r.clone())
    }

    fn required_extensions(&self, submission_type: SubmissionType) -> Option<BTreeSet<String>> {
        self.required_extensions
            .iter()
            .find(|(t, _)| *t == submission_type)
            .map(|(_, e)| e.clone())
    }
}

// ── Identifier mining ───────────────────────────────────────────────

/// Mine pref IDs from a subject line (e.g. `PREF-04512`).
pub fn mine_pref_ids(subject: &str) -> Vec<String> {
    mine(subject, r"(?i)\bPREF[-\s]?(\d{3,})\b", "PREF-")
}

/// Mine alternate site IDs from a subject line (e.g. `ALT-0091`).
pub fn mine_alt_ids(subject: &str) -> Vec<String> {
    mine(subject, r"(?i)\bALT[-\s]?(\d{3,})\b", "ALT-")
}

/// Mine activity numbers (three letters + six digits, e.g. `LSR043210`).
pub fn mine_activity_nums(subject: &str) -> Vec<String> {
    let regex = Regex::new(r"\b([A-Z]{3}\d{6})\b").expect("activity regex is valid");
    regex
        .captures_iter(subject)
        .map(|c| c[1].to_string())
        .collect()
}

fn mine(subject: &str, pattern: &str, prefix: &str) -> Vec<String> {
    let regex = Regex::new(pattern).expect("id regex is valid");
    regex
        .captures_iter(subject)
        .map(|c| format!("{prefix}{}", &c[1]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rules_compile() {
        let provider = StaticRuleProvider::default_rules().unwrap();
        assert!(!provider.classification_patterns().is_empty());
    }

    #[test]
    fn spam_rules_precede_type_rules() {
        let provider = StaticRuleProvider::default_rules().unwrap();
        let first_type_idx = provider
            .classification_patterns()
            .iter()
            .position(|r| matches!(r.verdict, Verdict::Submission(_)))
            .unwrap();
        assert!(
            provider.classification_patterns()[..first_type_idx]
                .iter()
                .all(|r| !matches!(r.verdict, Verdict::Submission(_)))
        );
    }

    #[test]
    fn type_rules_follow_priority_order() {
        let provider = StaticRuleProvider::default_rules().unwrap();
        let types: Vec<SubmissionType> = provider
            .classification_patterns()
            .iter()
            .filter_map(|r| match r.verdict {
                Verdict::Submission(t) => Some(t),
                _ => None,
            })
            .collect();
        assert_eq!(&types[..5], &SubmissionType::ALL);
    }

    #[test]
    fn invalid_pattern_is_a_config_error() {
        let err = PatternRule::new(r"(unclosed", RuleField::Subject, Verdict::Spam).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }

    #[test]
    fn every_type_has_geometry_rules_and_extensions() {
        let provider = StaticRuleProvider::default_rules().unwrap();
        for submission_type in SubmissionType::ALL {
            assert!(provider.geometry_rules(submission_type).is_some());
            let exts = provider.required_extensions(submission_type).unwrap();
            assert!(exts.contains("shp"));
            assert!(exts.contains("dbf"));
        }
    }

    #[test]
    fn mines_pref_and_alt_ids() {
        let subject = "FW: DNA Submission PREF-04512 / ALT 0091";
        assert_eq!(mine_pref_ids(subject), vec!["PREF-04512"]);
        assert_eq!(mine_alt_ids(subject), vec!["ALT-0091"]);
    }

    #[test]
    fn mines_activity_numbers() {
        let subject = "CKE Submission LSR043210 for Site 12";
        assert_eq!(mine_activity_nums(subject), vec!["LSR043210"]);
    }

    #[test]
    fn no_ids_yields_empty_lists() {
        assert!(mine_pref_ids("hello").is_empty());
        assert!(mine_alt_ids("hello").is_empty());
        assert!(mine_activity_nums("hello").is_empty());
    }
}
