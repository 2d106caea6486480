//! Deduplication against the reference "proposed features" layer.
//!
//! A candidate is a duplicate only when all three gates agree: the
//! geometries match within tolerance, the business key (pref ID +
//! submission type) matches, and the existing record is in an active
//! lifecycle status. A geometrically identical but superseded record
//! does not count.

use async_trait::async_trait;
use geo::{BoundingRect, HausdorffDistance, Polygon, Rect};
use tracing::{debug, info};

use crate::classify::types::SubmissionType;
use crate::error::StoreError;

/// One existing record from the reference layer.
#[derive(Debug, Clone)]
pub struct ReferenceFeature {
    pub geometry: Polygon<f64>,
    /// Business identifier of the site.
    pub pref_id: String,
    pub submission_type: SubmissionType,
    /// Lifecycle status of the record (e.g. "To Be Reviewed").
    pub status: String,
}

/// Read-only access to already-recorded features.
///
/// Writes belong to the persistence gateway and are sequenced after a
/// successful dedup check, so a feature is never compared against
/// itself.
#[async_trait]
pub trait ReferenceStore: Send + Sync {
    /// Records whose bounding extent intersects the given extent.
    async fn find_candidate_duplicates(
        &self,
        extent: Rect<f64>,
        submission_type: SubmissionType,
    ) -> Result<Vec<ReferenceFeature>, StoreError>;
}

#[async_trait]
impl<T: ReferenceStore + ?Sized> ReferenceStore for std::sync::Arc<T> {
    async fn find_candidate_duplicates(
        &self,
        extent: Rect<f64>,
        submission_type: SubmissionType,
    ) -> Result<Vec<ReferenceFeature>, StoreError> {
        (**self).find_candidate_duplicates(extent, submission_type).await
    }
}

/// Decides whether a candidate feature duplicates an existing record.
pub struct DeduplicationEngine<S> {
    store: S,
    /// Hausdorff distance below which two polygons count as the same
    /// shape, in map units.
    tolerance: f64,
    /// Lifecycle statuses that make a match count.
    active_statuses: Vec<String>,
}

impl<S: ReferenceStore> DeduplicationEngine<S> {
    pub fn new(store: S, tolerance: f64, active_statuses: Vec<String>) -> Self {
        Self {
            store,
            tolerance,
            active_statuses,
        }
    }

    /// Whether the candidate duplicates an active existing record.
    ///
    /// A store failure is surfaced, never folded into `false` — a
    /// false negative here lets duplicate data into the store.
    pub async fn is_duplicate(
        &self,
        candidate: &Polygon<f64>,
        pref_id: &str,
        submission_type: SubmissionType,
    ) -> Result<bool, StoreError> {
        let Some(extent) = candidate.bounding_rect() else {
            // Degenerate candidates cannot match anything.
            return Ok(false);
        };

        let candidates = self
            .store
            .find_candidate_duplicates(extent, submission_type)
            .await?;
        debug!(
            pref_id,
            submission_type = %submission_type,
            candidates = candidates.len(),
            "Dedup spatial pre-filter"
        );

        for existing in candidates {
            if candidate.hausdorff_distance(&existing.geometry) > self.tolerance {
                continue;
            }
            if existing.pref_id != pref_id || existing.submission_type != submission_type {
                debug!(
                    pref_id,
                    existing_pref_id = %existing.pref_id,
                    "Geometric match but business key differs"
                );
                continue;
            }
            if !self.active_statuses.contains(&existing.status) {
                debug!(
                    pref_id,
                    status = %existing.status,
                    "Geometric match but record is not active"
                );
                continue;
            }
            info!(pref_id, status = %existing.status, "Duplicate confirmed");
            return Ok(true);
        }
        Ok(false)
    }
}
