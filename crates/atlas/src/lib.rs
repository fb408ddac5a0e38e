//! Voxel Atlas: dense voxel grids encoded as 2D RGBA textures.
//!
//! Z slices are tiled horizontally (last slice first) and Y rows run top-down,
//! so the texel for voxel `(x, y, z)` in a `size` grid is
//! `(x + size.x * (size.z - 1 - z), size.y - 1 - y)`.
//!
//! # Invariants
//! - Every voxel maps to exactly one texel and vice versa.
//! - Alpha 0 is empty space; anything else is solid.
//! - Writes are bounds-checked; nothing spills into a neighbouring texel.
//! - Every write marks the atlas dirty until the GPU copy is refreshed.

mod atlas;
mod error;
mod grid;
mod layout;
mod registry;
mod view;

pub use atlas::VoxelAtlas;
pub use error::AtlasError;
pub use grid::VoxelGrid;
pub use layout::{AtlasLayout, SliceOrder, SubRegion};
pub use registry::{AtlasId, AtlasRegistry};
pub use view::{AtlasView, VoxelSampler};
