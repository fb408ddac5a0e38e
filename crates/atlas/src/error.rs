use glam::UVec3;

/// Errors from atlas operations.
#[derive(Debug, thiserror::Error)]
pub enum AtlasError {
    #[error("voxel ({x}, {y}, {z}) is outside a {size} grid")]
    VoxelIndexOutOfRange { x: u32, y: u32, z: u32, size: UVec3 },
    #[error("sprite {index} is outside an atlas stack of {stack}")]
    StackIndexOutOfRange { index: u32, stack: u32 },
    #[error("atlas image is {actual:?}, layout expects {expected:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
    #[error("invalid grid size {0}: every axis must be at least 1")]
    InvalidSize(UVec3),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image codec error: {0}")]
    Image(#[from] image::ImageError),
}
