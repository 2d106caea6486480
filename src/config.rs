//! Configuration types.

/// Intake pipeline configuration.
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    /// Canonical spatial reference every feature is normalized to
    /// before validation.
    pub canonical_srid: u32,
    /// Tolerance for the geometric-equality test used by dedup
    /// (map units; hausdorff distance).
    pub dedup_tolerance: f64,
    /// Lifecycle statuses that make an existing record count as an
    /// active duplicate.
    pub active_dedup_statuses: Vec<String>,
    /// Mailbox folder holding unprocessed submissions.
    pub inbox_folder: String,
    /// Mailbox folder processed submissions are moved to.
    pub processed_folder: String,
    /// Mailbox folder rejected submissions are moved to.
    pub rejected_folder: String,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            canonical_srid: 3857,
            dedup_tolerance: 0.5,
            active_dedup_statuses: vec![
                "To Be Reviewed".to_string(),
                "Shape Approved".to_string(),
            ],
            inbox_folder: "Inbox".to_string(),
            processed_folder: "Processed".to_string(),
            rejected_folder: "Rejected".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_active_statuses() {
        let cfg = IntakeConfig::default();
        assert!(cfg.active_dedup_statuses.contains(&"To Be Reviewed".to_string()));
        assert!(cfg.active_dedup_statuses.contains(&"Shape Approved".to_string()));
    }
}
