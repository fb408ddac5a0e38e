use crate::config::EditorConfig;
use crate::error::EditError;
use crate::sheet::VoxelSheet;
use glam::{Mat4, UVec3, Vec3};
use std::path::Path;
use voxsprite_atlas::{AtlasId, AtlasLayout, AtlasRegistry, VoxelAtlas};
use voxsprite_common::Rgba;
use voxsprite_sprite::{Sprite, SpriteKind, SpriteVisual};

/// The sprite being edited: one atlas, its preview rotation and one sheet
/// per z layer.
#[derive(Debug, Clone)]
pub struct EditableSprite {
    atlas: AtlasId,
    size: UVec3,
    placement: Mat4,
    rotation: Mat4,
    sheets: Vec<VoxelSheet>,
}

impl EditableSprite {
    /// Register an empty cube atlas sized by `config.grid_edge`.
    pub fn new(registry: &mut AtlasRegistry, config: &EditorConfig) -> Result<Self, EditError> {
        let atlas = VoxelAtlas::empty(AtlasLayout::cube(config.grid_edge)?);
        let id = registry.insert(atlas);
        Self::from_atlas(registry, id, config)
    }

    /// Edit an atlas that is already registered.
    pub fn from_atlas(registry: &AtlasRegistry, atlas: AtlasId, config: &EditorConfig) -> Result<Self, EditError> {
        let size = registry.get(atlas).ok_or(EditError::MissingAtlas(atlas))?.size();
        let sheets = (0..size.z).map(|z| VoxelSheet::new(size, z, config)).collect();
        Ok(Self {
            atlas,
            size,
            placement: Mat4::from_translation(Vec3::from(config.preview_position)),
            rotation: Mat4::IDENTITY,
            sheets,
        })
    }

    pub fn atlas(&self) -> AtlasId {
        self.atlas
    }

    pub fn size(&self) -> UVec3 {
        self.size
    }

    pub fn sheets(&self) -> &[VoxelSheet] {
        &self.sheets
    }

    pub fn rotation(&self) -> Mat4 {
        self.rotation
    }

    pub fn set_rotation(&mut self, rotation: Mat4) {
        self.rotation = rotation;
    }

    pub fn model_matrix(&self) -> Mat4 {
        self.placement * self.rotation
    }

    /// Preview sprite for the renderer.
    pub fn to_sprite(&self) -> Sprite {
        Sprite::new(SpriteKind::Editable, SpriteVisual::new(self.atlas, self.size))
            .with_placement(self.model_matrix())
    }

    pub fn get_voxel(&self, registry: &AtlasRegistry, voxel: UVec3) -> Result<Rgba, EditError> {
        let atlas = registry.get(self.atlas).ok_or(EditError::MissingAtlas(self.atlas))?;
        Ok(atlas.get_voxel(voxel.x, voxel.y, voxel.z)?)
    }

    /// Write one voxel and return the color it replaced.
    pub fn set_voxel(&self, registry: &mut AtlasRegistry, voxel: UVec3, color: Rgba) -> Result<Rgba, EditError> {
        let atlas = registry
            .get_mut(self.atlas)
            .ok_or(EditError::MissingAtlas(self.atlas))?;
        let old = atlas.get_voxel(voxel.x, voxel.y, voxel.z)?;
        atlas.set_voxel(voxel.x, voxel.y, voxel.z, color)?;
        Ok(old)
    }

    pub fn save_working(&self, registry: &AtlasRegistry, path: impl AsRef<Path>) -> Result<(), EditError> {
        let atlas = registry.get(self.atlas).ok_or(EditError::MissingAtlas(self.atlas))?;
        atlas.save(path.as_ref())?;
        tracing::info!(path = %path.as_ref().display(), "working sprite saved");
        Ok(())
    }

    /// Replace the atlas contents with the image at `path`. The image must
    /// match the atlas dimensions.
    pub fn load_working(&self, registry: &mut AtlasRegistry, path: impl AsRef<Path>) -> Result<(), EditError> {
        let atlas = registry
            .get_mut(self.atlas)
            .ok_or(EditError::MissingAtlas(self.atlas))?;
        let loaded = VoxelAtlas::load(path.as_ref(), *atlas.layout())?;
        atlas.replace_image(loaded.to_image())?;
        tracing::info!(path = %path.as_ref().display(), "working sprite loaded");
        Ok(())
    }
}
