//! Pipeline orchestrator — sequences the stages and decides the
//! terminal disposition.
//!
//! **Core invariant: nothing is ever half-recorded.** Persistence is
//! called once, after a disposition is reached; any collaborator
//! failure aborts the run, marks the root result failed, and rolls
//! back optimistic counter updates.
//!
//! Flow:
//! 1. Classify (fast, pure) → simple-case exit or continue
//! 2. Analyze attachments → file-sets + manifest
//! 3. Validate features per valid file-set, in discovery order
//! 4. Deduplicate each valid feature
//! 5. Aggregate and persist

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use geo::Point;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::attachments::{ArchiveExtractor, AttachmentAnalyzer};
use crate::classify::types::{ClassificationResult, EmailClass, SubmissionType};
use crate::classify::{Classifier, RuleProvider};
use crate::config::IntakeConfig;
use crate::dedup::{DeduplicationEngine, ReferenceStore};
use crate::error::{ConfigError, PipelineError};
use crate::geometry::{FeatureReader, FeatureValidator, GeometryOps, ShapeItem};
use crate::mail::{EmailSummary, MailSource};
use crate::pipeline::types::{Disposition, SessionCounters, SubmissionOutcome};
use crate::report::TestResult;
use crate::store::{Notifier, PersistenceGateway, Severity};

/// Collaborators the orchestrator is wired with.
pub struct PipelineDeps {
    pub rules: Arc<dyn RuleProvider>,
    pub mail: Arc<dyn MailSource>,
    pub extractor: Arc<dyn ArchiveExtractor>,
    pub ops: Arc<dyn GeometryOps>,
    pub reader: Arc<dyn FeatureReader>,
    pub reference_store: Arc<dyn ReferenceStore>,
    pub persistence: Arc<dyn PersistenceGateway>,
    pub notifier: Arc<dyn Notifier>,
}

/// Runs one submission at a time through the full pipeline.
pub struct PipelineOrchestrator {
    classifier: Classifier,
    analyzer: AttachmentAnalyzer,
    validator: FeatureValidator,
    dedup: DeduplicationEngine<Arc<dyn ReferenceStore>>,
    rules: Arc<dyn RuleProvider>,
    reader: Arc<dyn FeatureReader>,
    mail: Arc<dyn MailSource>,
    persistence: Arc<dyn PersistenceGateway>,
    notifier: Arc<dyn Notifier>,
    config: IntakeConfig,
    /// Shared counters and the review cursor are per-session state;
    /// only one submission may progress at a time.
    run_gate: tokio::sync::Mutex<()>,
}

impl PipelineOrchestrator {
    pub fn new(deps: PipelineDeps, config: IntakeConfig) -> Result<Self, ConfigError> {
        let classifier = Classifier::new(deps.rules.clone())?;
        let analyzer = AttachmentAnalyzer::new(deps.extractor, deps.rules.clone());
        let validator = FeatureValidator::new(deps.ops, config.canonical_srid);
        let dedup = DeduplicationEngine::new(
            deps.reference_store,
            config.dedup_tolerance,
            config.active_dedup_statuses.clone(),
        );
        Ok(Self {
            classifier,
            analyzer,
            validator,
            dedup,
            rules: deps.rules,
            reader: deps.reader,
            mail: deps.mail,
            persistence: deps.persistence,
            notifier: deps.notifier,
            config,
            run_gate: tokio::sync::Mutex::new(()),
        })
    }

    /// Process one submission end to end.
    ///
    /// Takes the session counters by value and returns the updated
    /// copy; the caller merges across runs.
    pub async fn run(
        &self,
        email: &EmailSummary,
        attachment_dir: Option<&Path>,
        site: Option<Point<f64>>,
        counters: SessionCounters,
    ) -> (SubmissionOutcome, SessionCounters) {
        let _guard = self.run_gate.lock().await;
        let run_id = Uuid::new_v4();
        info!(
            run_id = %run_id,
            email_id = %email.id,
            sender = %email.sender,
            "Processing submission"
        );

        let classification = self.classifier.classify(email);
        let submission_type = match classification.class {
            EmailClass::Submission { submission_type } => submission_type,
            _ => {
                return self
                    .simple_exit(run_id, email, &classification, counters)
                    .await;
            }
        };
        self.notifier.progress(
            &format!("Classified {} as {submission_type}", email.id),
            Severity::Info,
        );

        let mut root = TestResult::pass("submission");
        let mut class_node = TestResult::pass("classification");
        class_node.add_comment(format!("classified as {submission_type}"));
        if !classification.pref_ids.is_empty() {
            class_node.add_comment(format!("pref ids: {}", classification.pref_ids.join(", ")));
        }
        root.add_subordinate_result(class_node);

        let mut counters = counters;
        match self
            .process_submission(
                email,
                submission_type,
                &classification,
                attachment_dir,
                site,
                &mut root,
                &mut counters,
            )
            .await
        {
            Ok((disposition, accepted, duplicates, rejected)) => {
                let outcome = self
                    .finish(run_id, email, disposition, root, accepted, duplicates, rejected)
                    .await;
                (outcome, counters)
            }
            Err(e) => {
                // Optimistic counter updates were already rolled back
                // by the failing step; this run still counts as failed.
                error!(run_id = %run_id, error = %e, "Pipeline aborted");
                root.mark_failed(format!("pipeline aborted: {e}"));
                self.notifier.progress(
                    &format!("Submission {} aborted: {e}", email.id),
                    Severity::Error,
                );
                counters.record_failed();
                let outcome = self
                    .finish(
                        run_id,
                        email,
                        Disposition::Rejected,
                        root,
                        Vec::new(),
                        Vec::new(),
                        Vec::new(),
                    )
                    .await;
                (outcome, counters)
            }
        }
    }

    /// Reviewer-initiated skip: bypasses the automatic pipeline.
    pub async fn skip(
        &self,
        email: &EmailSummary,
        mut counters: SessionCounters,
    ) -> (SubmissionOutcome, SessionCounters) {
        let _guard = self.run_gate.lock().await;
        let mut root = TestResult::pass("submission");
        let mut decision = TestResult::pass("manual decision");
        decision.add_comment("skipped by reviewer");
        root.add_subordinate_result(decision);
        counters.record_skipped();
        let outcome = self
            .finish(
                Uuid::new_v4(),
                email,
                Disposition::Skipped,
                root,
                Vec::new(),
                Vec::new(),
                Vec::new(),
            )
            .await;
        (outcome, counters)
    }

    /// Reviewer-initiated reject: bypasses the automatic pipeline.
    pub async fn reject(
        &self,
        email: &EmailSummary,
        reason: &str,
        mut counters: SessionCounters,
    ) -> (SubmissionOutcome, SessionCounters) {
        let _guard = self.run_gate.lock().await;
        let mut root = TestResult::fail("submission", reason);
        let mut decision = TestResult::new("manual decision", false);
        decision.add_comment(format!("rejected by reviewer: {reason}"));
        root.add_subordinate_result(decision);
        counters.record_failed();
        let outcome = self
            .finish(
                Uuid::new_v4(),
                email,
                Disposition::Rejected,
                root,
                Vec::new(),
                Vec::new(),
                Vec::new(),
            )
            .await;
        (outcome, counters)
    }

    // ── Stages ──────────────────────────────────────────────────────

    #[allow(clippy::too_many_arguments)]
    async fn process_submission(
        &self,
        email: &EmailSummary,
        submission_type: SubmissionType,
        classification: &ClassificationResult,
        attachment_dir: Option<&Path>,
        site: Option<Point<f64>>,
        root: &mut TestResult,
        counters: &mut SessionCounters,
    ) -> Result<(Disposition, Vec<ShapeItem>, Vec<ShapeItem>, Vec<ShapeItem>), PipelineError> {
        // Missing rule configuration is fatal to the run, not a data
        // problem the submitter can fix.
        let geometry_rules = self
            .rules
            .geometry_rules(submission_type)
            .ok_or_else(|| {
                ConfigError::MissingGeometryRules(submission_type.label().to_string())
            })?;

        // Stage: attachment analysis.
        let analysis = self.analyzer.analyze(attachment_dir, submission_type)?;
        let valid_sets: Vec<_> = analysis
            .file_sets
            .iter()
            .filter(|s| s.valid_set)
            .cloned()
            .collect();
        root.add_subordinate_result(analysis.result);
        self.notifier.progress(
            &format!(
                "Attachment analysis: {} valid file set(s)",
                valid_sets.len()
            ),
            Severity::Info,
        );
        if valid_sets.is_empty() {
            counters.record_failed();
            return Ok((Disposition::Rejected, Vec::new(), Vec::new(), Vec::new()));
        }

        // Stage: feature validation, file-sets in discovery order and
        // features in source iteration order.
        let mut valid_shapes = Vec::new();
        let mut rejected = Vec::new();
        for file_set in &valid_sets {
            let raws = self.reader.read_features(file_set).await?;
            let mut set_node = TestResult::pass(format!("validate {}", file_set.file_name));
            set_node.add_comment(format!("{} feature(s)", raws.len()));
            for raw in &raws {
                let item =
                    self.validator
                        .validate_feature(raw, Some(&geometry_rules), site.as_ref());
                let mut feature_node =
                    TestResult::new(format!("feature {}", item.reference_id), item.is_valid);
                feature_node.add_comment(item.status.to_string());
                if item.area > 0.0 {
                    feature_node.add_comment(format!("area {:.2}", item.area));
                }
                if let Some(distance) = item.distance_from_site {
                    feature_node.add_comment(format!("distance from site {distance:.2}"));
                }
                set_node.add_subordinate_result(feature_node);
                if item.is_valid {
                    valid_shapes.push(item);
                } else {
                    rejected.push(item);
                }
            }
            root.add_subordinate_result(set_node);
        }
        self.notifier.progress(
            &format!(
                "Validated {} feature(s), {} rejected",
                valid_shapes.len(),
                rejected.len()
            ),
            Severity::Info,
        );

        // Stage: deduplication per valid feature.
        let pref_id = classification.pref_ids.first().cloned().unwrap_or_default();
        let mut accepted = Vec::new();
        let mut duplicates = Vec::new();
        let mut dedup_node = TestResult::pass("deduplication");
        for item in valid_shapes {
            let is_duplicate = match &item.geometry {
                Some(polygon) => {
                    self.dedup
                        .is_duplicate(polygon, &pref_id, submission_type)
                        .await?
                }
                None => false,
            };
            if is_duplicate {
                dedup_node.add_subordinate_result(TestResult::fail(
                    format!("feature {}", item.reference_id),
                    format!("duplicate of an active record for {pref_id}"),
                ));
                duplicates.push(item);
            } else {
                accepted.push(item);
            }
        }
        dedup_node.add_comment(format!(
            "{} accepted, {} duplicate(s)",
            accepted.len(),
            duplicates.len()
        ));
        root.add_subordinate_result(dedup_node);

        // Stage: aggregate and persist.
        if !accepted.is_empty() && root.overall_passed() {
            counters.record_passed();
            match self.persist(email, root).await {
                Ok(deliverable_id) => {
                    root.add_comment(format!("recorded as deliverable {deliverable_id}"));
                    Ok((Disposition::Saved, accepted, duplicates, rejected))
                }
                Err(e) => {
                    // The optimistic pass is undone; the caller turns
                    // this into a Rejected outcome.
                    counters.rollback_passed();
                    Err(e.into())
                }
            }
        } else if accepted.is_empty() && !duplicates.is_empty() && rejected.is_empty() {
            counters.record_skipped();
            Ok((
                Disposition::RequiresManualReview,
                accepted,
                duplicates,
                rejected,
            ))
        } else {
            counters.record_failed();
            Ok((Disposition::Rejected, accepted, duplicates, rejected))
        }
    }

    async fn persist(
        &self,
        email: &EmailSummary,
        root: &TestResult,
    ) -> Result<String, crate::error::StoreError> {
        let deliverable_id = self.persistence.next_id("deliverable").await?;
        self.persistence
            .record_test_result(root, &deliverable_id)
            .await?;
        self.persistence
            .run_named_query(
                "mark_deliverable_saved",
                &[
                    ("deliverable_id", serde_json::json!(deliverable_id)),
                    ("email_id", serde_json::json!(email.id)),
                ],
            )
            .await?;
        Ok(deliverable_id)
    }

    async fn simple_exit(
        &self,
        run_id: Uuid,
        email: &EmailSummary,
        classification: &ClassificationResult,
        mut counters: SessionCounters,
    ) -> (SubmissionOutcome, SessionCounters) {
        let reason = classification
            .invalid_reason
            .clone()
            .unwrap_or_else(|| "not a submission".to_string());
        info!(
            email_id = %email.id,
            class = classification.class.label(),
            reason = %reason,
            "Simple-case exit"
        );

        let mut root = TestResult::fail("submission", &reason);
        root.add_subordinate_result(TestResult::fail(
            "classification",
            format!("{}: {reason}", classification.class.label()),
        ));

        let disposition = match classification.class {
            EmailClass::AutoResponse => {
                counters.record_skipped();
                Disposition::Skipped
            }
            _ => {
                counters.record_failed();
                Disposition::Rejected
            }
        };
        let outcome = self
            .finish(run_id, email, disposition, root, Vec::new(), Vec::new(), Vec::new())
            .await;
        (outcome, counters)
    }

    #[allow(clippy::too_many_arguments)]
    async fn finish(
        &self,
        run_id: Uuid,
        email: &EmailSummary,
        disposition: Disposition,
        result: TestResult,
        accepted: Vec<ShapeItem>,
        duplicates: Vec<ShapeItem>,
        rejected: Vec<ShapeItem>,
    ) -> SubmissionOutcome {
        // File the message after the disposition; a filing failure
        // must not change an already-decided outcome.
        let target_folder = match disposition {
            Disposition::Saved => Some(&self.config.processed_folder),
            Disposition::Rejected => Some(&self.config.rejected_folder),
            Disposition::Skipped | Disposition::RequiresManualReview => None,
        };
        if let Some(folder) = target_folder
            && let Err(e) = self
                .mail
                .move_email(&email.id, &self.config.inbox_folder, folder)
                .await
        {
            warn!(email_id = %email.id, folder = %folder, error = %e, "Could not file message");
        }

        let outcome = SubmissionOutcome {
            run_id,
            email_id: email.id.clone(),
            disposition,
            result,
            accepted,
            duplicates,
            rejected,
            completed_at: Utc::now(),
        };
        info!(
            run_id = %run_id,
            disposition = disposition.label(),
            status = %outcome.status_line(),
            "Run complete"
        );
        self.notifier.outcome(&outcome);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Utc;
    use geo::{Geometry, Polygon, Rect, polygon};

    use super::*;
    use crate::attachments::{FileSet, ZipExtractor};
    use crate::classify::StaticRuleProvider;
    use crate::dedup::ReferenceFeature;
    use crate::error::{GeometryError, MailError, StoreError};
    use crate::geometry::{PlanarOps, RawFeature};
    use crate::store::LogNotifier;

    // ── Mocks ───────────────────────────────────────────────────

    #[derive(Default)]
    struct MockMail {
        moves: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl MailSource for MockMail {
        async fn list_emails(&self, _folder: &str) -> Result<Vec<EmailSummary>, MailError> {
            Ok(Vec::new())
        }

        async fn get_attachments(&self, _email_id: &str) -> Result<Option<PathBuf>, MailError> {
            Ok(None)
        }

        async fn move_email(&self, email_id: &str, _from: &str, to: &str) -> Result<(), MailError> {
            self.moves
                .lock()
                .unwrap()
                .push((email_id.to_string(), to.to_string()));
            Ok(())
        }
    }

    struct MockReader {
        features: Vec<RawFeature>,
    }

    #[async_trait]
    impl FeatureReader for MockReader {
        async fn read_features(&self, _file_set: &FileSet) -> Result<Vec<RawFeature>, GeometryError> {
            Ok(self.features.clone())
        }
    }

    struct MockRefStore {
        features: Vec<ReferenceFeature>,
        fail: bool,
    }

    #[async_trait]
    impl ReferenceStore for MockRefStore {
        async fn find_candidate_duplicates(
            &self,
            _extent: Rect<f64>,
            _submission_type: SubmissionType,
        ) -> Result<Vec<ReferenceFeature>, StoreError> {
            if self.fail {
                return Err(StoreError::ReferenceUnavailable("layer offline".into()));
            }
            Ok(self.features.clone())
        }
    }

    #[derive(Default)]
    struct MockGateway {
        fail_record: bool,
        recorded: Mutex<Vec<String>>,
        queries: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PersistenceGateway for MockGateway {
        async fn record_test_result(
            &self,
            _tree: &TestResult,
            deliverable_id: &str,
        ) -> Result<(), StoreError> {
            if self.fail_record {
                return Err(StoreError::RecordFailed {
                    deliverable_id: deliverable_id.to_string(),
                    reason: "disk full".into(),
                });
            }
            self.recorded
                .lock()
                .unwrap()
                .push(deliverable_id.to_string());
            Ok(())
        }

        async fn next_id(&self, kind: &str) -> Result<String, StoreError> {
            Ok(format!("{kind}-1"))
        }

        async fn run_named_query(
            &self,
            name: &str,
            _params: &[(&str, serde_json::Value)],
        ) -> Result<(), StoreError> {
            self.queries.lock().unwrap().push(name.to_string());
            Ok(())
        }
    }

    // ── Fixtures ────────────────────────────────────────────────

    fn square() -> Polygon<f64> {
        polygon![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 0.0),
            (x: 10.0, y: 10.0),
            (x: 0.0, y: 10.0),
        ]
    }

    fn feature(reference_id: i64, geometry: Option<Geometry<f64>>) -> RawFeature {
        RawFeature {
            reference_id,
            geometry,
            srid: Some(3857),
            source_file: "site_123".into(),
            attributes: BTreeMap::new(),
        }
    }

    fn email(subject: &str) -> EmailSummary {
        EmailSummary {
            id: "msg-1".into(),
            subject: subject.into(),
            sender: "alice@agency.example".into(),
            sender_name: None,
            received_at: Utc::now(),
        }
    }

    /// A folder with a complete loose shapefile set.
    fn attachment_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for ext in ["shp", "shx", "dbf", "prj"] {
            std::fs::write(dir.path().join(format!("site_123.{ext}")), b"x").unwrap();
        }
        dir
    }

    struct Harness {
        orchestrator: PipelineOrchestrator,
        mail: Arc<MockMail>,
        gateway: Arc<MockGateway>,
    }

    fn harness(
        features: Vec<RawFeature>,
        reference: Vec<ReferenceFeature>,
        fail_store: bool,
        fail_record: bool,
    ) -> Harness {
        let mail = Arc::new(MockMail::default());
        let gateway = Arc::new(MockGateway {
            fail_record,
            ..MockGateway::default()
        });
        let deps = PipelineDeps {
            rules: Arc::new(StaticRuleProvider::default_rules().unwrap()),
            mail: mail.clone(),
            extractor: Arc::new(ZipExtractor::new()),
            ops: Arc::new(PlanarOps::new()),
            reader: Arc::new(MockReader { features }),
            reference_store: Arc::new(MockRefStore {
                features: reference,
                fail: fail_store,
            }),
            persistence: gateway.clone(),
            notifier: Arc::new(LogNotifier),
        };
        Harness {
            orchestrator: PipelineOrchestrator::new(deps, IntakeConfig::default()).unwrap(),
            mail,
            gateway,
        }
    }

    // ── Tests ───────────────────────────────────────────────────

    #[tokio::test]
    async fn spam_takes_the_simple_exit() {
        let h = harness(vec![], vec![], false, false);
        let (outcome, counters) = h
            .orchestrator
            .run(
                &EmailSummary {
                    sender: "noreply@agency.example".into(),
                    ..email("DNA Submission")
                },
                None,
                None,
                SessionCounters::default(),
            )
            .await;
        assert_eq!(outcome.disposition, Disposition::Rejected);
        assert!(!outcome.result.overall_passed());
        assert_eq!(counters.failed, 1);
        assert!(h.gateway.recorded.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn auto_reply_is_skipped() {
        let h = harness(vec![], vec![], false, false);
        let (outcome, counters) = h
            .orchestrator
            .run(
                &email("Automatic reply: out of office"),
                None,
                None,
                SessionCounters::default(),
            )
            .await;
        assert_eq!(outcome.disposition, Disposition::Skipped);
        assert_eq!(counters.skipped, 1);
    }

    #[tokio::test]
    async fn no_attachments_rejects_without_error() {
        let h = harness(vec![], vec![], false, false);
        let (outcome, counters) = h
            .orchestrator
            .run(&email("DNA Submission PREF-100"), None, None, SessionCounters::default())
            .await;
        assert_eq!(outcome.disposition, Disposition::Rejected);
        assert_eq!(counters.failed, 1);
        assert!(!outcome.result.overall_passed());
    }

    #[tokio::test]
    async fn clean_submission_is_saved() {
        let dir = attachment_dir();
        let h = harness(
            vec![feature(1, Some(Geometry::Polygon(square())))],
            vec![],
            false,
            false,
        );
        let (outcome, counters) = h
            .orchestrator
            .run(
                &email("DNA Submission PREF-100"),
                Some(dir.path()),
                None,
                SessionCounters::default(),
            )
            .await;
        assert_eq!(outcome.disposition, Disposition::Saved);
        assert!(outcome.result.overall_passed());
        assert_eq!(outcome.accepted.len(), 1);
        assert_eq!(counters.passed, 1);
        assert_eq!(h.gateway.recorded.lock().unwrap().len(), 1);
        assert_eq!(
            h.gateway.queries.lock().unwrap().as_slice(),
            ["mark_deliverable_saved"]
        );
        // Filed into the processed folder.
        assert_eq!(
            h.mail.moves.lock().unwrap().as_slice(),
            [("msg-1".to_string(), "Processed".to_string())]
        );
    }

    #[tokio::test]
    async fn save_failure_rolls_back_the_passed_counter() {
        let dir = attachment_dir();
        let h = harness(
            vec![feature(1, Some(Geometry::Polygon(square())))],
            vec![],
            false,
            true,
        );
        let before = SessionCounters {
            passed: 4,
            failed: 0,
            skipped: 2,
        };
        let (outcome, counters) = h
            .orchestrator
            .run(&email("DNA Submission PREF-100"), Some(dir.path()), None, before)
            .await;
        assert_eq!(outcome.disposition, Disposition::Rejected);
        // Passed is back at its pre-attempt value; the run counts failed.
        assert_eq!(counters.passed, before.passed);
        assert_eq!(counters.failed, 1);
        assert!(!outcome.result.overall_passed());
    }

    #[tokio::test]
    async fn duplicates_only_requires_manual_review() {
        let dir = attachment_dir();
        let existing = ReferenceFeature {
            geometry: square(),
            pref_id: "PREF-100".into(),
            submission_type: SubmissionType::Dna,
            status: "To Be Reviewed".into(),
        };
        let h = harness(
            vec![feature(1, Some(Geometry::Polygon(square())))],
            vec![existing],
            false,
            false,
        );
        let (outcome, counters) = h
            .orchestrator
            .run(
                &email("DNA Submission PREF-100"),
                Some(dir.path()),
                None,
                SessionCounters::default(),
            )
            .await;
        assert_eq!(outcome.disposition, Disposition::RequiresManualReview);
        assert_eq!(outcome.duplicates.len(), 1);
        assert!(outcome.accepted.is_empty());
        assert_eq!(counters.skipped, 1);
        assert!(h.gateway.recorded.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn reference_store_failure_aborts_the_run() {
        let dir = attachment_dir();
        let h = harness(
            vec![feature(1, Some(Geometry::Polygon(square())))],
            vec![],
            true,
            false,
        );
        let (outcome, counters) = h
            .orchestrator
            .run(
                &email("DNA Submission PREF-100"),
                Some(dir.path()),
                None,
                SessionCounters::default(),
            )
            .await;
        assert_eq!(outcome.disposition, Disposition::Rejected);
        assert_eq!(counters.passed, 0);
        assert_eq!(counters.failed, 1);
        // The abort reason is visible in the tree.
        assert!(
            outcome
                .result
                .comments
                .iter()
                .any(|c| c.contains("aborted"))
        );
    }

    #[tokio::test]
    async fn invalid_feature_rejects_submission() {
        let dir = attachment_dir();
        let h = harness(vec![feature(1, None)], vec![], false, false);
        let (outcome, _) = h
            .orchestrator
            .run(
                &email("CEA Submission PREF-7"),
                Some(dir.path()),
                None,
                SessionCounters::default(),
            )
            .await;
        assert_eq!(outcome.disposition, Disposition::Rejected);
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(
            outcome.rejected[0].status.to_string(),
            "Missing Geometry"
        );
    }

    #[tokio::test]
    async fn mixed_valid_and_invalid_features_reject() {
        let dir = attachment_dir();
        let h = harness(
            vec![
                feature(1, Some(Geometry::Polygon(square()))),
                feature(2, None),
            ],
            vec![],
            false,
            false,
        );
        let (outcome, _) = h
            .orchestrator
            .run(
                &email("CEA Submission PREF-7"),
                Some(dir.path()),
                None,
                SessionCounters::default(),
            )
            .await;
        // One bad feature fails the tree, which gates the save.
        assert_eq!(outcome.disposition, Disposition::Rejected);
        assert_eq!(outcome.accepted.len(), 1);
        assert_eq!(outcome.rejected.len(), 1);
    }

    #[tokio::test]
    async fn manual_skip_and_reject() {
        let h = harness(vec![], vec![], false, false);
        let (outcome, counters) = h
            .orchestrator
            .skip(&email("DNA Submission"), SessionCounters::default())
            .await;
        assert_eq!(outcome.disposition, Disposition::Skipped);
        assert_eq!(counters.skipped, 1);

        let (outcome, counters) = h
            .orchestrator
            .reject(&email("DNA Submission"), "wrong site", SessionCounters::default())
            .await;
        assert_eq!(outcome.disposition, Disposition::Rejected);
        assert_eq!(counters.failed, 1);
        assert!(outcome.result.comments.contains(&"wrong site".to_string()));
    }

    #[tokio::test]
    async fn reruns_of_the_same_input_are_deterministic() {
        let dir = attachment_dir();
        let h = harness(
            vec![feature(1, Some(Geometry::Polygon(square())))],
            vec![],
            false,
            false,
        );
        let e = email("DNA Submission PREF-100");
        let (first, _) = h
            .orchestrator
            .run(&e, Some(dir.path()), None, SessionCounters::default())
            .await;
        let (second, _) = h
            .orchestrator
            .run(&e, Some(dir.path()), None, SessionCounters::default())
            .await;
        assert_eq!(first.disposition, second.disposition);
        assert_eq!(
            serde_json::to_value(&first.result).unwrap()["sub_results"],
            serde_json::to_value(&second.result).unwrap()["sub_results"]
        );
    }
}
