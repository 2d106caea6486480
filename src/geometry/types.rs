//! Geometry value types.

use std::collections::BTreeMap;

use geo::{Coord, Geometry, Polygon, Rect};

use crate::classify::types::SubmissionType;

/// Per-type geometry validation rules, supplied by the rule provider.
#[derive(Debug, Clone)]
pub struct GeometryRules {
    /// Minimum acceptable feature area, in square map units.
    pub min_area: f64,
    /// Allowable extent; a feature's bounding box must lie fully
    /// inside it.
    pub extent: Rect<f64>,
    /// Projection the rules are expressed in. May differ from the
    /// canonical SRID for types with their own projection requirement.
    pub projection_srid: u32,
    /// Maximum allowed distance from the site location, when a site is
    /// known for the submission.
    pub max_site_distance: Option<f64>,
}

impl GeometryRules {
    /// Production defaults per submission type.
    pub fn default_for(submission_type: SubmissionType) -> Self {
        let min_area = match submission_type {
            SubmissionType::Cea | SubmissionType::Dna => 10.0,
            SubmissionType::Cke | SubmissionType::Iec | SubmissionType::Wrs => 1.0,
        };
        Self {
            min_area,
            extent: Rect::new(
                Coord {
                    x: -20_037_508.34,
                    y: -20_048_966.1,
                },
                Coord {
                    x: 20_037_508.34,
                    y: 20_048_966.1,
                },
            ),
            projection_srid: 3857,
            max_site_distance: Some(5_000.0),
        }
    }
}

/// One raw feature row as read from a file-set, before validation.
#[derive(Debug, Clone)]
pub struct RawFeature {
    /// Source feature identity (record number in the dataset).
    pub reference_id: i64,
    /// Geometry, absent when the record carried none.
    pub geometry: Option<Geometry<f64>>,
    /// Spatial reference the geometry is expressed in, when declared.
    pub srid: Option<u32>,
    /// File-set the feature came from.
    pub source_file: String,
    /// Mined attribute fields, keys unique.
    pub attributes: BTreeMap<String, serde_json::Value>,
}

/// Validation status of a feature.
///
/// Transitions only move forward through the state machine: once a
/// terminal failure is set, no later check overrides it. The one
/// non-failure transition besides `Valid` is `RepairedSimplified`,
/// which is preserved through the final verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeStatus {
    PendingValidation,
    Valid,
    RepairedSimplified,
    MissingGeometry,
    MissingGeometryRules,
    ReprojectionFailed,
    WrongGeometryKind(String),
    EmptyGeometry,
    RepairFailed,
    AreaBelowMinimum,
    OutsideAllowableExtent,
    ExceedsMaxSiteDistance,
}

impl ShapeStatus {
    /// Whether this status still lets the feature count as valid.
    pub fn is_acceptable(&self) -> bool {
        matches!(self, Self::Valid | Self::RepairedSimplified)
    }
}

impl std::fmt::Display for ShapeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PendingValidation => write!(f, "Pending Validation"),
            Self::Valid => write!(f, "Valid"),
            Self::RepairedSimplified => write!(f, "Repaired (Simplified)"),
            Self::MissingGeometry => write!(f, "Missing Geometry"),
            Self::MissingGeometryRules => write!(f, "Missing Geometry Rules"),
            Self::ReprojectionFailed => write!(f, "Reprojection Failed"),
            Self::WrongGeometryKind(kind) => write!(f, "Wrong Geometry Kind: {kind}"),
            Self::EmptyGeometry => write!(f, "Empty Geometry"),
            Self::RepairFailed => write!(f, "Repair Failed"),
            Self::AreaBelowMinimum => write!(f, "Area Below Minimum"),
            Self::OutsideAllowableExtent => write!(f, "Outside Allowable Extent"),
            Self::ExceedsMaxSiteDistance => write!(f, "Exceeds Max Distance from Site"),
        }
    }
}

/// One geometric feature carrying its validation state.
#[derive(Debug, Clone)]
pub struct ShapeItem {
    /// Source feature identity.
    pub reference_id: i64,
    /// The (possibly repaired and reprojected) polygon. Retained even
    /// on distance failures; absent only when the source had none.
    pub geometry: Option<Polygon<f64>>,
    /// File-set the feature came from.
    pub source_file: String,
    /// Computed area in square map units. Zero until measured.
    pub area: f64,
    /// Computed distance from the site, when a site was supplied.
    pub distance_from_site: Option<f64>,
    /// Final verdict of the state machine.
    pub is_valid: bool,
    /// Where in the state machine the feature ended up.
    pub status: ShapeStatus,
    /// Mined attribute fields carried through from the source row.
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl ShapeItem {
    /// A not-yet-validated item for a raw feature.
    pub fn pending(raw: &RawFeature) -> Self {
        Self {
            reference_id: raw.reference_id,
            geometry: None,
            source_file: raw.source_file.clone(),
            area: 0.0,
            distance_from_site: None,
            is_valid: false,
            status: ShapeStatus::PendingValidation,
            attributes: raw.attributes.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_strings_match_reporting_vocabulary() {
        assert_eq!(ShapeStatus::Valid.to_string(), "Valid");
        assert_eq!(
            ShapeStatus::RepairedSimplified.to_string(),
            "Repaired (Simplified)"
        );
        assert_eq!(
            ShapeStatus::ExceedsMaxSiteDistance.to_string(),
            "Exceeds Max Distance from Site"
        );
        assert_eq!(
            ShapeStatus::WrongGeometryKind("Point".into()).to_string(),
            "Wrong Geometry Kind: Point"
        );
    }

    #[test]
    fn only_valid_and_repaired_are_acceptable() {
        assert!(ShapeStatus::Valid.is_acceptable());
        assert!(ShapeStatus::RepairedSimplified.is_acceptable());
        assert!(!ShapeStatus::AreaBelowMinimum.is_acceptable());
        assert!(!ShapeStatus::PendingValidation.is_acceptable());
    }
}
