//! Per-feature validation state machine.
//!
//! Checks run strictly in order and the first failure is terminal for
//! the feature. Cheap structural checks (kind, emptiness) run before
//! the expensive geometric operations, and repair runs before area and
//! extent measurement since simplification changes the geometry.

use std::sync::Arc;

use geo::{Area, BoundingRect, Geometry, Point};
use tracing::{debug, warn};

use crate::geometry::ops::GeometryOps;
use crate::geometry::types::{GeometryRules, RawFeature, ShapeItem, ShapeStatus};

/// Validates raw features against per-type geometry rules.
pub struct FeatureValidator {
    ops: Arc<dyn GeometryOps>,
    canonical_srid: u32,
}

impl FeatureValidator {
    pub fn new(ops: Arc<dyn GeometryOps>, canonical_srid: u32) -> Self {
        Self {
            ops,
            canonical_srid,
        }
    }

    /// Run the validation state machine over one raw feature.
    ///
    /// Returns the feature as a [`ShapeItem`] carrying the terminal
    /// status. Idempotent for already-valid input: a feature that
    /// satisfies every rule comes out with the same geometry and
    /// `Valid` status on every run.
    pub fn validate_feature(
        &self,
        raw: &RawFeature,
        rules: Option<&GeometryRules>,
        site: Option<&Point<f64>>,
    ) -> ShapeItem {
        let mut item = ShapeItem::pending(raw);

        // 1. A record with no geometry at all.
        let Some(geometry) = raw.geometry.clone() else {
            return self.fail(item, ShapeStatus::MissingGeometry);
        };

        // 2. No rules configured for the type.
        let Some(rules) = rules else {
            return self.fail(item, ShapeStatus::MissingGeometryRules);
        };

        // 3. Normalize to the canonical spatial reference.
        let mut current_srid = raw.srid.unwrap_or(self.canonical_srid);
        let geometry = if current_srid != self.canonical_srid {
            match self.ops.reproject(&geometry, current_srid, self.canonical_srid) {
                Ok(g) => {
                    current_srid = self.canonical_srid;
                    g
                }
                Err(e) => {
                    warn!(reference_id = raw.reference_id, error = %e, "Reprojection failed");
                    return self.fail(item, ShapeStatus::ReprojectionFailed);
                }
            }
        } else {
            geometry
        };

        // 4. Only polygons are accepted. A single-part multipolygon is
        // a common artifact of shapefile readers and unwraps cleanly.
        let polygon = match geometry {
            Geometry::Polygon(p) => p,
            Geometry::MultiPolygon(mut mp) if mp.0.len() == 1 => mp.0.remove(0),
            other => {
                return self.fail(item, ShapeStatus::WrongGeometryKind(kind_name(&other)));
            }
        };

        // 5. Degenerate rings cannot form a feature.
        if polygon.exterior().0.len() < 4 {
            return self.fail(item, ShapeStatus::EmptyGeometry);
        }

        // 6. Rule-specific projection, when it differs from canonical.
        let polygon = if rules.projection_srid != current_srid {
            match self.ops.reproject(
                &Geometry::Polygon(polygon),
                current_srid,
                rules.projection_srid,
            ) {
                Ok(Geometry::Polygon(p)) => p,
                Ok(_) | Err(_) => {
                    return self.fail(item, ShapeStatus::ReprojectionFailed);
                }
            }
        } else {
            polygon
        };

        // 7. Repair self-intersections before anything is measured.
        // A repair is a retained correction, not a failure.
        let polygon = if self.ops.is_simple(&polygon) {
            polygon
        } else {
            match self.ops.repair(&polygon) {
                Ok(repaired) => {
                    debug!(
                        reference_id = raw.reference_id,
                        "Repaired self-intersecting polygon"
                    );
                    item.status = ShapeStatus::RepairedSimplified;
                    repaired
                }
                Err(e) => {
                    warn!(reference_id = raw.reference_id, error = %e, "Repair failed");
                    return self.fail(item, ShapeStatus::RepairFailed);
                }
            }
        };

        item.area = polygon.unsigned_area();

        // 8. Minimum area, measured on the repaired geometry.
        if item.area < rules.min_area.abs() {
            item.geometry = Some(polygon);
            return self.fail(item, ShapeStatus::AreaBelowMinimum);
        }

        // 9. Bounding box fully inside the allowable extent.
        let inside = polygon
            .bounding_rect()
            .is_some_and(|b| rect_contains(&rules.extent, &b));
        if !inside {
            item.geometry = Some(polygon);
            return self.fail(item, ShapeStatus::OutsideAllowableExtent);
        }

        // 10. Distance from the site, when one is known. The geometry
        // and computed distance are retained even on failure.
        let distance = site.map(|s| self.ops.distance(&polygon, s));
        item.geometry = Some(polygon);
        if let Some(distance) = distance {
            item.distance_from_site = Some(distance);
            if let Some(max) = rules.max_site_distance
                && distance > max
            {
                return self.fail(item, ShapeStatus::ExceedsMaxSiteDistance);
            }
        }

        // 11. A repair set earlier is preserved through the verdict.
        item.is_valid = true;
        if item.status == ShapeStatus::PendingValidation {
            item.status = ShapeStatus::Valid;
        }
        item
    }

    fn fail(&self, mut item: ShapeItem, status: ShapeStatus) -> ShapeItem {
        debug!(
            reference_id = item.reference_id,
            status = %status,
            "Feature failed validation"
        );
        item.is_valid = false;
        item.status = status;
        item
    }
}

fn kind_name(geometry: &Geometry<f64>) -> String {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
    .to_string()
}

/// Whether `inner` lies fully inside `outer` (closed comparison).
fn rect_contains(outer: &geo::Rect<f64>, inner: &geo::Rect<f64>) -> bool {
    outer.min().x <= inner.min().x
        && outer.min().y <= inner.min().y
        && outer.max().x >= inner.max().x
        && outer.max().y >= inner.max().y
}
