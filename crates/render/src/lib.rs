//! Voxel Ray-March Renderer: draws voxel atlases as lit cubes.
//!
//! Rendering goes through the [`GraphicsDevice`] facade so the same sprite
//! and sheet renderers drive the wgpu backend, the headless
//! [`RecordingDevice`] and tests. [`raymarch`] is the CPU reference of the
//! shader and backs the [`SoftwareRenderer`].
//!
//! # Invariants
//! - Rendering never mutates scene state; only atlas dirty flags are cleared
//!   once their texture has been re-uploaded.
//! - A ray visits at most `x + y + z - 2` voxels.
//! - Uniforms are checked against the program's schema before any draw.

pub mod camera;
pub mod device;
pub mod headless;
pub mod raymarch;
pub mod shaders;
mod sheet_renderer;
pub mod software;
mod sprite_renderer;

pub use camera::Camera;
pub use device::{
    AttributeSlot, BoundUniforms, BufferHandle, DeviceError, DrawCall, GraphicsDevice, ProgramDesc,
    ProgramHandle, TextureHandle, UniformKind, UniformSchema, UniformSlot, UniformValue,
};
pub use headless::{DeviceStats, DrawRecord, RecordingDevice};
pub use raymarch::{MarchHit, RayMarchState, lighting, march, march_counted, max_march_steps};
pub use sheet_renderer::SheetRenderer;
pub use software::{SoftwareRenderer, SpriteInstance, ray_box_entry};
pub use sprite_renderer::{AtlasTextures, SpriteRenderer};
