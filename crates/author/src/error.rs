use voxsprite_atlas::{AtlasError, AtlasId};

/// Errors from editor operations.
#[derive(Debug, thiserror::Error)]
pub enum EditError {
    #[error("atlas {0:?} is not in the registry")]
    MissingAtlas(AtlasId),
    #[error(transparent)]
    Atlas(#[from] AtlasError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
