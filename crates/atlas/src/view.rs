use crate::layout::{AtlasLayout, SubRegion};
use glam::{UVec3, Vec2};
use image::RgbaImage;
use voxsprite_common::Rgba;

/// Anything the ray-marcher can read voxel colors from.
pub trait VoxelSampler {
    fn grid_size(&self) -> UVec3;

    /// Color at `voxel`. Out-of-grid coordinates read as transparent.
    fn sample(&self, voxel: UVec3) -> Rgba;
}

/// Read-only view of one sprite inside an atlas image.
///
/// Performs the same lookup as the sprite shader: texel-centre UV within the
/// sprite, then the [`SubRegion`] transform, then nearest-texel fetch with
/// clamp-to-edge addressing.
#[derive(Debug, Clone, Copy)]
pub struct AtlasView<'a> {
    image: &'a RgbaImage,
    layout: AtlasLayout,
    region: SubRegion,
}

impl<'a> AtlasView<'a> {
    pub fn new(image: &'a RgbaImage, layout: AtlasLayout, region: SubRegion) -> Self {
        Self {
            image,
            layout,
            region,
        }
    }

    pub fn layout(&self) -> &AtlasLayout {
        &self.layout
    }

    pub fn region(&self) -> SubRegion {
        self.region
    }

    fn fetch(&self, uv: Vec2) -> Rgba {
        let (w, h) = self.image.dimensions();
        if w == 0 || h == 0 {
            return Rgba::TRANSPARENT;
        }
        let tx = ((uv.x * w as f32).floor().max(0.0) as u32).min(w - 1);
        let ty = ((uv.y * h as f32).floor().max(0.0) as u32).min(h - 1);
        Rgba::from_array(self.image.get_pixel(tx, ty).0)
    }
}

impl VoxelSampler for AtlasView<'_> {
    fn grid_size(&self) -> UVec3 {
        self.layout.size
    }

    fn sample(&self, voxel: UVec3) -> Rgba {
        if !self.layout.contains(voxel) {
            return Rgba::TRANSPARENT;
        }
        self.fetch(self.region.apply(self.layout.sprite_uv(voxel)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VoxelGrid;

    #[test]
    fn view_reads_what_grid_encoded() {
        let size = UVec3::new(4, 4, 2);
        let mut grid = VoxelGrid::new(size).unwrap();
        grid.set(UVec3::new(1, 2, 1), Rgba::rgb(9, 8, 7)).unwrap();
        let layout = AtlasLayout::new(size).unwrap();
        let image = grid.encode(&layout).unwrap();
        let view = AtlasView::new(&image, layout, SubRegion::FULL);
        for (voxel, color) in grid.iter() {
            assert_eq!(view.sample(voxel), color);
        }
        assert_eq!(view.sample(UVec3::new(4, 0, 0)), Rgba::TRANSPARENT);
    }

    #[test]
    fn view_selects_stack_entry() {
        let layout = AtlasLayout::stacked(UVec3::splat(8), 40).unwrap();
        let (w, h) = layout.dimensions();
        let mut image = RgbaImage::new(w, h);
        let voxel = UVec3::new(3, 4, 5);
        let (tx, ty) = layout.texel_in(26, voxel).unwrap();
        image.put_pixel(tx, ty, image::Rgba([1, 2, 3, 255]));

        let glyph = AtlasView::new(&image, layout, layout.region(26));
        assert_eq!(glyph.sample(voxel), Rgba::rgb(1, 2, 3));
        let other = AtlasView::new(&image, layout, layout.region(25));
        assert_eq!(other.sample(voxel), Rgba::TRANSPARENT);
    }
}
