//! Feature geometry — value types, the geometry backend seam, and the
//! per-feature validation state machine.

pub mod ops;
pub mod types;
pub mod validator;

pub use ops::{FeatureReader, GeometryOps, PlanarOps};
pub use types::{GeometryRules, RawFeature, ShapeItem, ShapeStatus};
pub use validator::FeatureValidator;
