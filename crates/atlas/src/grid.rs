use crate::error::AtlasError;
use crate::layout::AtlasLayout;
use crate::view::VoxelSampler;
use glam::UVec3;
use image::RgbaImage;
use voxsprite_common::{Rgba, grid_cell_count};

/// Dense 3D array of voxel colors, x fastest then y then z.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoxelGrid {
    size: UVec3,
    cells: Vec<Rgba>,
}

impl VoxelGrid {
    /// An all-empty grid.
    pub fn new(size: UVec3) -> Result<Self, AtlasError> {
        if size.min_element() == 0 {
            return Err(AtlasError::InvalidSize(size));
        }
        Ok(Self {
            size,
            cells: vec![Rgba::TRANSPARENT; grid_cell_count(size)],
        })
    }

    pub fn size(&self) -> UVec3 {
        self.size
    }

    fn index(&self, voxel: UVec3) -> Result<usize, AtlasError> {
        if !voxel.cmplt(self.size).all() {
            return Err(AtlasError::VoxelIndexOutOfRange {
                x: voxel.x,
                y: voxel.y,
                z: voxel.z,
                size: self.size,
            });
        }
        let (sx, sy) = (self.size.x as usize, self.size.y as usize);
        Ok(voxel.x as usize + sx * (voxel.y as usize + sy * voxel.z as usize))
    }

    pub fn get(&self, voxel: UVec3) -> Result<Rgba, AtlasError> {
        Ok(self.cells[self.index(voxel)?])
    }

    pub fn set(&mut self, voxel: UVec3, color: Rgba) -> Result<(), AtlasError> {
        let i = self.index(voxel)?;
        self.cells[i] = color;
        Ok(())
    }

    /// Number of solid cells.
    pub fn solid_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_solid()).count()
    }

    /// Iterate `(voxel, color)` over every cell.
    pub fn iter(&self) -> impl Iterator<Item = (UVec3, Rgba)> + '_ {
        let size = self.size;
        self.cells.iter().enumerate().map(move |(i, c)| {
            let i = i as u32;
            let x = i % size.x;
            let y = (i / size.x) % size.y;
            let z = i / (size.x * size.y);
            (UVec3::new(x, y, z), *c)
        })
    }

    /// Pack into an atlas image using `layout` (stack entry 0).
    pub fn encode(&self, layout: &AtlasLayout) -> Result<RgbaImage, AtlasError> {
        if layout.size != self.size {
            return Err(AtlasError::DimensionMismatch {
                expected: layout.sprite_dimensions(),
                actual: (self.size.x * self.size.z, self.size.y),
            });
        }
        let (w, h) = layout.dimensions();
        let mut image = RgbaImage::new(w, h);
        for (voxel, color) in self.iter() {
            let (tx, ty) = layout.texel(voxel)?;
            image.put_pixel(tx, ty, image::Rgba(color.to_array()));
        }
        Ok(image)
    }

    /// Unpack stack entry `index` of an atlas image.
    pub fn decode(image: &RgbaImage, layout: &AtlasLayout, index: u32) -> Result<Self, AtlasError> {
        let expected = layout.dimensions();
        let actual = image.dimensions();
        if expected != actual {
            return Err(AtlasError::DimensionMismatch { expected, actual });
        }
        let mut grid = Self::new(layout.size)?;
        for z in 0..layout.size.z {
            for y in 0..layout.size.y {
                for x in 0..layout.size.x {
                    let voxel = UVec3::new(x, y, z);
                    let (tx, ty) = layout.texel_in(index, voxel)?;
                    grid.set(voxel, Rgba::from_array(image.get_pixel(tx, ty).0))?;
                }
            }
        }
        Ok(grid)
    }
}

impl VoxelSampler for VoxelGrid {
    fn grid_size(&self) -> UVec3 {
        self.size
    }

    fn sample(&self, voxel: UVec3) -> Rgba {
        self.get(voxel).unwrap_or(Rgba::TRANSPARENT)
    }
}
