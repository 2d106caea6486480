//! Geometry backend seam and the planar default implementation.
//!
//! The validator never calls `geo` directly for the operations a GIS
//! runtime would normally own (reprojection, simplicity, repair,
//! distance) — those sit behind [`GeometryOps`] so a host can swap in
//! its own engine. [`PlanarOps`] is the shipped backend: planar math
//! over `geo`, with caller-registered coordinate transforms standing
//! in for a projection library.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use geo::algorithm::line_intersection::{LineIntersection, line_intersection};
use geo::{Area, BooleanOps, Coord, EuclideanDistance, Geometry, Line, MapCoords, Point, Polygon};

use crate::attachments::FileSet;
use crate::error::GeometryError;
use crate::geometry::types::RawFeature;

/// Reads raw feature rows out of a discovered file-set.
#[async_trait]
pub trait FeatureReader: Send + Sync {
    /// Read all features from a file-set, in source iteration order.
    async fn read_features(&self, file_set: &FileSet) -> Result<Vec<RawFeature>, GeometryError>;
}

/// Geometric operations the validator delegates to a backend.
pub trait GeometryOps: Send + Sync {
    /// Reproject a geometry between spatial reference systems.
    fn reproject(
        &self,
        geometry: &Geometry<f64>,
        from: u32,
        to: u32,
    ) -> Result<Geometry<f64>, GeometryError>;

    /// Whether a polygon is simple (no self-intersections).
    fn is_simple(&self, polygon: &Polygon<f64>) -> bool;

    /// Repair a non-simple polygon, allowing endpoint changes.
    fn repair(&self, polygon: &Polygon<f64>) -> Result<Polygon<f64>, GeometryError>;

    /// Planar distance between a polygon and a point.
    fn distance(&self, polygon: &Polygon<f64>, site: &Point<f64>) -> f64;
}

type CoordTransform = Arc<dyn Fn(Coord<f64>) -> Coord<f64> + Send + Sync>;

/// Planar geometry backend over `geo`.
#[derive(Default)]
pub struct PlanarOps {
    transforms: HashMap<(u32, u32), CoordTransform>,
}

impl PlanarOps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a coordinate transform for a (from, to) SRID pair.
    pub fn register_transform(
        &mut self,
        from: u32,
        to: u32,
        transform: impl Fn(Coord<f64>) -> Coord<f64> + Send + Sync + 'static,
    ) {
        self.transforms.insert((from, to), Arc::new(transform));
    }
}

impl GeometryOps for PlanarOps {
    fn reproject(
        &self,
        geometry: &Geometry<f64>,
        from: u32,
        to: u32,
    ) -> Result<Geometry<f64>, GeometryError> {
        if from == to {
            return Ok(geometry.clone());
        }
        let transform = self
            .transforms
            .get(&(from, to))
            .ok_or(GeometryError::UnsupportedTransform { from, to })?;
        let f = transform.as_ref();
        Ok(geometry.map_coords(|c| f(c)))
    }

    fn is_simple(&self, polygon: &Polygon<f64>) -> bool {
        let mut segments: Vec<(usize, usize, Line<f64>)> = Vec::new();
        for (ring_idx, ring) in std::iter::once(polygon.exterior())
            .chain(polygon.interiors().iter())
            .enumerate()
        {
            // Tag with ring and position so adjacency can be told
            // apart from a genuine crossing.
            for (seg_idx, line) in ring.lines().enumerate() {
                segments.push((ring_idx, seg_idx, line));
            }
        }

        for i in 0..segments.len() {
            for j in (i + 1)..segments.len() {
                let (ring_a, idx_a, line_a) = segments[i];
                let (ring_b, idx_b, line_b) = segments[j];
                let Some(intersection) = line_intersection(line_a, line_b) else {
                    continue;
                };

                match intersection {
                    LineIntersection::Collinear { .. } => return false,
                    LineIntersection::SinglePoint { is_proper: true, .. } => return false,
                    LineIntersection::SinglePoint {
                        intersection: point,
                        is_proper: false,
                    } => {
                        // Consecutive segments of one ring legitimately
                        // share an endpoint; anything else touching is
                        // a self-intersection.
                        let adjacent = ring_a == ring_b
                            && (idx_b == idx_a + 1
                                || (idx_a == 0 && idx_b == ring_len(polygon, ring_a) - 1));
                        let shared_endpoint = adjacent
                            && (line_a.start == point || line_a.end == point)
                            && (line_b.start == point || line_b.end == point);
                        if !shared_endpoint {
                            return false;
                        }
                    }
                }
            }
        }
        true
    }

    fn repair(&self, polygon: &Polygon<f64>) -> Result<Polygon<f64>, GeometryError> {
        // Self-union re-nodes the boundary, splitting a self-crossing
        // ring into simple parts. The largest part is the feature.
        let unioned = polygon.union(polygon);
        unioned
            .into_iter()
            .max_by(|a, b| {
                a.unsigned_area()
                    .partial_cmp(&b.unsigned_area())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .ok_or(GeometryError::RepairProducedNothing)
    }

    fn distance(&self, polygon: &Polygon<f64>, site: &Point<f64>) -> f64 {
        polygon.euclidean_distance(site)
    }
}

fn ring_len(polygon: &Polygon<f64>, ring_idx: usize) -> usize {
    if ring_idx == 0 {
        polygon.exterior().lines().count()
    } else {
        polygon.interiors()[ring_idx - 1].lines().count()
    }
}

#[cfg(test)]
mod tests {
    use geo::polygon;

    use super::*;

    fn square() -> Polygon<f64> {
        polygon![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 0.0),
            (x: 10.0, y: 10.0),
            (x: 0.0, y: 10.0),
        ]
    }

    fn bowtie() -> Polygon<f64> {
        polygon![
            (x: 0.0, y: 0.0),
            (x: 2.0, y: 2.0),
            (x: 2.0, y: 0.0),
            (x: 0.0, y: 2.0),
        ]
    }

    #[test]
    fn square_is_simple() {
        assert!(PlanarOps::new().is_simple(&square()));
    }

    #[test]
    fn bowtie_is_not_simple() {
        assert!(!PlanarOps::new().is_simple(&bowtie()));
    }

    #[test]
    fn repair_bowtie_yields_simple_polygon() {
        let ops = PlanarOps::new();
        let repaired = ops.repair(&bowtie()).unwrap();
        assert!(ops.is_simple(&repaired));
        assert!(repaired.unsigned_area() > 0.0);
    }

    #[test]
    fn repair_recovers_area_lost_to_self_crossing() {
        // The bowtie's shoelace area cancels to ~0; the repaired part
        // has real area.
        let ops = PlanarOps::new();
        assert!(bowtie().unsigned_area() < 0.1);
        assert!(ops.repair(&bowtie()).unwrap().unsigned_area() > 0.5);
    }

    #[test]
    fn identity_reprojection_is_a_clone() {
        let ops = PlanarOps::new();
        let g = Geometry::Polygon(square());
        let out = ops.reproject(&g, 3857, 3857).unwrap();
        assert_eq!(out, g);
    }

    #[test]
    fn unregistered_transform_is_an_error() {
        let ops = PlanarOps::new();
        let g = Geometry::Polygon(square());
        let err = ops.reproject(&g, 4326, 3857).unwrap_err();
        assert!(matches!(
            err,
            GeometryError::UnsupportedTransform { from: 4326, to: 3857 }
        ));
    }

    #[test]
    fn registered_transform_applies() {
        let mut ops = PlanarOps::new();
        ops.register_transform(4326, 3857, |c| Coord {
            x: c.x * 2.0,
            y: c.y * 2.0,
        });
        let g = Geometry::Polygon(square());
        let out = ops.reproject(&g, 4326, 3857).unwrap();
        match out {
            Geometry::Polygon(p) => assert!((p.unsigned_area() - 400.0).abs() < 1e-9),
            other => panic!("expected polygon, got {other:?}"),
        }
    }

    #[test]
    fn distance_from_exterior_point() {
        let ops = PlanarOps::new();
        let d = ops.distance(&square(), &Point::new(13.0, 14.0));
        assert!((d - 5.0).abs() < 1e-9);
    }

    #[test]
    fn distance_inside_polygon_is_zero() {
        let ops = PlanarOps::new();
        assert_eq!(ops.distance(&square(), &Point::new(5.0, 5.0)), 0.0);
    }
}
