//! Email classification — ordered pattern rules, first match wins.

pub mod classifier;
pub mod rules;
pub mod types;

pub use classifier::Classifier;
pub use rules::{PatternRule, RuleField, RuleProvider, StaticRuleProvider, Verdict};
pub use types::{ClassificationResult, EmailClass, SubmissionType};
