//! Screen-space picking: which voxel cell lies under a point in normalized
//! device coordinates.
//!
//! # Invariants
//! - Picking is pure: same matrices and point, same answer.
//! - Points on a projected edge are outside.
//! - Geometry with a corner behind the eye is never hit.

pub mod cube;
pub mod polygon;
pub mod sheet;

pub use cube::{CUBE_CORNERS, ScreenRect, cube_bounds, cube_hit};
pub use polygon::ConvexQuad;
pub use sheet::{QUAD_CORNERS, SheetPicker, project_point};
