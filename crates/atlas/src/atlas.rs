use crate::error::AtlasError;
use crate::grid::VoxelGrid;
use crate::layout::{AtlasLayout, SubRegion};
use crate::view::AtlasView;
use glam::UVec3;
use image::{DynamicImage, ImageFormat, RgbaImage};
use sha2::{Digest, Sha256};
use std::io::Cursor;
use std::path::Path;
use voxsprite_common::Rgba;

/// A voxel atlas: the encoded image plus its layout and upload state.
///
/// The image is the source of truth. Each voxel write touches exactly one
/// texel and leaves the atlas dirty until [`VoxelAtlas::mark_clean`] is
/// called by whoever refreshed the GPU copy.
#[derive(Debug, Clone)]
pub struct VoxelAtlas {
    image: RgbaImage,
    layout: AtlasLayout,
    dirty: bool,
}

impl VoxelAtlas {
    /// An empty (fully transparent) atlas. Starts dirty so it gets uploaded.
    pub fn empty(layout: AtlasLayout) -> Self {
        let (w, h) = layout.dimensions();
        Self {
            image: RgbaImage::new(w, h),
            layout,
            dirty: true,
        }
    }

    /// Wrap an existing atlas image, checking its dimensions against `layout`.
    pub fn from_image(image: RgbaImage, layout: AtlasLayout) -> Result<Self, AtlasError> {
        let expected = layout.dimensions();
        let actual = image.dimensions();
        if expected != actual {
            return Err(AtlasError::DimensionMismatch { expected, actual });
        }
        Ok(Self {
            image,
            layout,
            dirty: true,
        })
    }

    pub fn from_grid(grid: &VoxelGrid) -> Result<Self, AtlasError> {
        let layout = AtlasLayout::new(grid.size())?;
        Self::from_image(grid.encode(&layout)?, layout)
    }

    pub fn layout(&self) -> &AtlasLayout {
        &self.layout
    }

    pub fn size(&self) -> UVec3 {
        self.layout.size
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Copy of the encoded image.
    pub fn to_image(&self) -> RgbaImage {
        self.image.clone()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Write one voxel of stack entry 0.
    pub fn set_voxel(&mut self, x: u32, y: u32, z: u32, color: Rgba) -> Result<(), AtlasError> {
        self.set_voxel_in(0, UVec3::new(x, y, z), color)
    }

    pub fn set_voxel_in(&mut self, index: u32, voxel: UVec3, color: Rgba) -> Result<(), AtlasError> {
        let (tx, ty) = self.layout.texel_in(index, voxel)?;
        self.image.put_pixel(tx, ty, image::Rgba(color.to_array()));
        self.dirty = true;
        tracing::trace!(?voxel, index, tx, ty, "voxel written");
        Ok(())
    }

    pub fn get_voxel(&self, x: u32, y: u32, z: u32) -> Result<Rgba, AtlasError> {
        self.get_voxel_in(0, UVec3::new(x, y, z))
    }

    pub fn get_voxel_in(&self, index: u32, voxel: UVec3) -> Result<Rgba, AtlasError> {
        let (tx, ty) = self.layout.texel_in(index, voxel)?;
        Ok(Rgba::from_array(self.image.get_pixel(tx, ty).0))
    }

    /// Replace the whole image (loading a saved sprite). Marks dirty.
    pub fn replace_image(&mut self, image: RgbaImage) -> Result<(), AtlasError> {
        let expected = self.layout.dimensions();
        let actual = image.dimensions();
        if expected != actual {
            return Err(AtlasError::DimensionMismatch { expected, actual });
        }
        self.image = image;
        self.dirty = true;
        Ok(())
    }

    /// Decode stack entry `index` into a dense grid.
    pub fn to_grid(&self, index: u32) -> Result<VoxelGrid, AtlasError> {
        VoxelGrid::decode(&self.image, &self.layout, index)
    }

    /// Sampler over stack entry `index`.
    pub fn view(&self, index: u32) -> AtlasView<'_> {
        AtlasView::new(&self.image, self.layout, self.layout.region(index))
    }

    /// Sampler over an arbitrary sub-region.
    pub fn view_region(&self, region: SubRegion) -> AtlasView<'_> {
        AtlasView::new(&self.image, self.layout, region)
    }

    /// Encode as PNG bytes.
    pub fn encode_png(&self) -> Result<Vec<u8>, AtlasError> {
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(self.image.clone())
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }

    /// Decode PNG bytes laid out per `layout`.
    pub fn decode_png(bytes: &[u8], layout: AtlasLayout) -> Result<Self, AtlasError> {
        let image = image::load_from_memory_with_format(bytes, ImageFormat::Png)?.to_rgba8();
        Self::from_image(image, layout)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), AtlasError> {
        std::fs::write(path.as_ref(), self.encode_png()?)?;
        tracing::debug!(path = %path.as_ref().display(), "atlas saved");
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>, layout: AtlasLayout) -> Result<Self, AtlasError> {
        let bytes = std::fs::read(path.as_ref())?;
        let atlas = Self::decode_png(&bytes, layout)?;
        tracing::debug!(path = %path.as_ref().display(), "atlas loaded");
        Ok(atlas)
    }

    /// Content fingerprint over layout and pixels.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = Sha256::new();
        hasher.update(self.layout.size.x.to_le_bytes());
        hasher.update(self.layout.size.y.to_le_bytes());
        hasher.update(self.layout.size.z.to_le_bytes());
        hasher.update(self.layout.stack.to_le_bytes());
        hasher.update(self.image.as_raw());
        let result = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&result[..8]);
        u64::from_le_bytes(bytes)
    }

    /// Number of solid texels across the whole image.
    pub fn solid_count(&self) -> usize {
        self.image.pixels().filter(|p| p.0[3] > 0).count()
    }
}
