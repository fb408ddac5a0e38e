use crate::config::EditorConfig;
use glam::{Mat4, UVec3, Vec2};
use voxsprite_pick::SheetPicker;

/// One z layer of the edited grid shown as a flat quad.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoxelSheet {
    z: u32,
    model: Mat4,
    picker: SheetPicker,
}

impl VoxelSheet {
    pub fn new(size: UVec3, z: u32, config: &EditorConfig) -> Self {
        Self {
            z,
            model: config.sheet_model(z),
            picker: SheetPicker::new(size),
        }
    }

    pub fn z(&self) -> u32 {
        self.z
    }

    pub fn model(&self) -> Mat4 {
        self.model
    }

    pub fn pick(&self, projection: Mat4, point: Vec2) -> Option<UVec3> {
        self.picker.pick(projection, self.model, self.z, point)
    }

    /// NDC centre of cell `(x, y)` on this sheet.
    pub fn cell_center(&self, projection: Mat4, x: u32, y: u32) -> Option<Vec2> {
        self.picker.cell_center(projection, self.model, x, y)
    }
}
