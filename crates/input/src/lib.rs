//! Input for the editor and the scene: raw pointer/key state in, edges and
//! actions out.
//!
//! # Invariants
//! - Pointer positions are normalized device coordinates in `[-1, 1]²`.
//! - Edges are derived from button 1 only and from consecutive samples, so a
//!   press and release inside one tick is never observed.

pub mod action;
pub mod controls;
pub mod pointer;

pub use action::Action;
pub use controls::{Controls, KeyBindings};
pub use pointer::{PointerEdge, PointerSample, PointerTracker, PRIMARY_BUTTON};
