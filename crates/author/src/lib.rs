//! Voxel editor: paint an atlas through per-layer sheets and rotate its
//! preview by dragging.
//!
//! # Invariants
//! - Every recorded paint is reversible; painting a voxel its current color
//!   records nothing.
//! - A new paint clears the redo history.
//! - Atlas writes go through the registry so the renderer sees them dirty.

mod config;
mod editor;
mod error;
mod sheet;
mod sprite;

pub use config::EditorConfig;
pub use editor::{EditCommand, Editor};
pub use error::EditError;
pub use sheet::VoxelSheet;
pub use sprite::EditableSprite;
