use crate::kind::KindTag;
use voxsprite_atlas::AtlasError;

/// Errors building a scene or its render context.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("no atlas registered for {}", .0.name())]
    MissingAtlas(KindTag),
    #[error("{} sprites are not spawned by the scene", .0.name())]
    NotSpawnable(KindTag),
    #[error(transparent)]
    Atlas(#[from] AtlasError),
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
}
