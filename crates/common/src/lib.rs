//! Shared types for the voxsprite workspace.

mod types;

pub use types::{Rgba, SpriteId, Tick, grid_cell_count};
