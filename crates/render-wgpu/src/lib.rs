//! wgpu backend for the voxsprite graphics device.
//!
//! Programs become render pipelines sharing one bind group layout (uniform
//! block at binding 0, atlas texture at binding 1). Draws are queued and
//! replayed in order into a colour target with a depth buffer.
//!
//! # Invariants
//! - Draws are executed in submission order within a frame.
//! - A texture keeps the size it was created with.

mod gpu;

pub use gpu::WgpuDevice;
