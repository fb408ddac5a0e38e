use crate::error::EditError;
use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};
use std::path::Path;
use voxsprite_common::Rgba;

/// Editor tuning. Missing JSON fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Edge of the edited cube grid.
    pub grid_edge: u32,
    pub paint_color: Rgba,
    pub fov_y_degrees: f32,
    /// Position of sheet 0; later sheets step down by `sheet_spacing`.
    pub sheet_origin: [f32; 3],
    pub sheet_spacing: f32,
    pub sheet_scale: f32,
    /// Radians of rotation per NDC unit dragged.
    pub drag_speed: f32,
    /// Where the rotating preview sits in view space.
    pub preview_position: [f32; 3],
    pub working_file: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            grid_edge: 8,
            paint_color: Rgba::MAGENTA,
            fov_y_degrees: 45.0,
            sheet_origin: [0.75, 0.775, -5.0],
            sheet_spacing: 0.225,
            sheet_scale: 0.1,
            drag_speed: 5.0,
            preview_position: [-0.3, 0.0, -3.0],
            working_file: "working.voxelmap.png".to_string(),
        }
    }
}

impl EditorConfig {
    pub fn from_json_str(json: &str) -> Result<Self, EditError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, EditError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json(&self) -> Result<String, EditError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Model matrix of the sheet showing layer `z`.
    pub fn sheet_model(&self, z: u32) -> Mat4 {
        let [x, y, depth] = self.sheet_origin;
        Mat4::from_translation(Vec3::new(x, y - self.sheet_spacing * z as f32, depth))
            * Mat4::from_scale(Vec3::splat(self.sheet_scale))
    }

    pub fn projection(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_y_degrees.to_radians(), aspect, 0.1, 100.0)
    }
}
