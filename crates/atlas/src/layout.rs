use crate::error::AtlasError;
use glam::{UVec3, Vec2};
use serde::{Deserialize, Serialize};

/// Order in which Z slices are tiled along the atlas X axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SliceOrder {
    /// Slice `z` starts at `size.x * (size.z - 1 - z)`. Every shipped atlas uses this.
    #[default]
    Descending,
    /// Slice `z` starts at `size.x * z`.
    Ascending,
}

/// Selects one sprite inside a shared atlas: `uv * scale + offset`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubRegion {
    pub scale: Vec2,
    pub offset: Vec2,
}

impl SubRegion {
    /// The whole atlas.
    pub const FULL: Self = Self {
        scale: Vec2::ONE,
        offset: Vec2::ZERO,
    };

    /// Entry `index` of `count` sprites stacked top to bottom.
    pub fn stacked(index: u32, count: u32) -> Self {
        let count = count.max(1) as f32;
        Self {
            scale: Vec2::new(1.0, 1.0 / count),
            offset: Vec2::new(0.0, index as f32 / count),
        }
    }

    pub fn apply(&self, uv: Vec2) -> Vec2 {
        uv * self.scale + self.offset
    }
}

impl Default for SubRegion {
    fn default() -> Self {
        Self::FULL
    }
}

/// Maps voxel coordinates to atlas texels.
///
/// A layout describes a `size` grid, optionally repeated `stack` times
/// vertically so several sprites (font glyphs) share one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtlasLayout {
    pub size: UVec3,
    pub order: SliceOrder,
    pub stack: u32,
}

impl AtlasLayout {
    /// Single-sprite layout with descending slice order.
    pub fn new(size: UVec3) -> Result<Self, AtlasError> {
        Self::stacked(size, 1)
    }

    pub fn cube(edge: u32) -> Result<Self, AtlasError> {
        Self::new(UVec3::splat(edge))
    }

    pub fn stacked(size: UVec3, stack: u32) -> Result<Self, AtlasError> {
        if size.min_element() == 0 || stack == 0 {
            return Err(AtlasError::InvalidSize(size));
        }
        Ok(Self {
            size,
            order: SliceOrder::Descending,
            stack,
        })
    }

    pub fn with_order(mut self, order: SliceOrder) -> Self {
        self.order = order;
        self
    }

    /// Pixel dimensions of one sprite: `(size.x * size.z, size.y)`.
    pub fn sprite_dimensions(&self) -> (u32, u32) {
        (self.size.x * self.size.z, self.size.y)
    }

    /// Pixel dimensions of the whole image, including the stack.
    pub fn dimensions(&self) -> (u32, u32) {
        let (w, h) = self.sprite_dimensions();
        (w, h * self.stack)
    }

    pub fn contains(&self, voxel: UVec3) -> bool {
        voxel.cmplt(self.size).all()
    }

    /// Texel of `voxel` in stack entry 0.
    pub fn texel(&self, voxel: UVec3) -> Result<(u32, u32), AtlasError> {
        self.texel_in(0, voxel)
    }

    /// Texel of `voxel` in stack entry `index`.
    pub fn texel_in(&self, index: u32, voxel: UVec3) -> Result<(u32, u32), AtlasError> {
        if !self.contains(voxel) {
            return Err(AtlasError::VoxelIndexOutOfRange {
                x: voxel.x,
                y: voxel.y,
                z: voxel.z,
                size: self.size,
            });
        }
        if index >= self.stack {
            return Err(AtlasError::StackIndexOutOfRange {
                index,
                stack: self.stack,
            });
        }
        let slice = match self.order {
            SliceOrder::Descending => self.size.z - 1 - voxel.z,
            SliceOrder::Ascending => voxel.z,
        };
        let tx = voxel.x + self.size.x * slice;
        let ty = self.size.y - 1 - voxel.y + self.size.y * index;
        Ok((tx, ty))
    }

    /// Inverse of [`Self::texel_in`]: `(stack index, voxel)` for a texel.
    pub fn voxel_at(&self, tx: u32, ty: u32) -> Option<(u32, UVec3)> {
        let (w, h) = self.dimensions();
        if tx >= w || ty >= h {
            return None;
        }
        let index = ty / self.size.y;
        let y = self.size.y - 1 - ty % self.size.y;
        let x = tx % self.size.x;
        let slice = tx / self.size.x;
        let z = match self.order {
            SliceOrder::Descending => self.size.z - 1 - slice,
            SliceOrder::Ascending => slice,
        };
        Some((index, UVec3::new(x, y, z)))
    }

    /// Region of stack entry `index` in normalized texture coordinates.
    pub fn region(&self, index: u32) -> SubRegion {
        SubRegion::stacked(index, self.stack)
    }

    /// Normalized coordinate of the centre of `voxel`'s texel within one sprite,
    /// before any [`SubRegion`] is applied. Matches the shader's lookup.
    pub fn sprite_uv(&self, voxel: UVec3) -> Vec2 {
        let slice = match self.order {
            SliceOrder::Descending => self.size.z - 1 - voxel.z,
            SliceOrder::Ascending => voxel.z,
        };
        let (w, h) = self.sprite_dimensions();
        Vec2::new(
            (voxel.x + self.size.x * slice) as f32 + 0.5,
            (self.size.y - 1 - voxel.y) as f32 + 0.5,
        ) / Vec2::new(w as f32, h as f32)
    }
}
