use crate::device::{
    BufferHandle, DeviceError, DrawCall, GraphicsDevice, ProgramHandle, TextureHandle, UniformSchema,
    UniformValue,
};
use crate::shaders::{quad_vertices, sheet_program};
use crate::sprite_renderer::{grid_uniform, region_uniform};
use glam::Mat4;
use voxsprite_atlas::{AtlasLayout, SubRegion};

/// Draws editor sheets: one alpha-blended quad per z layer.
#[derive(Debug)]
pub struct SheetRenderer {
    program: ProgramHandle,
    quad: BufferHandle,
    quad_vertices: u32,
    schema: UniformSchema,
}

impl SheetRenderer {
    pub fn new<D: GraphicsDevice + ?Sized>(device: &mut D) -> Result<Self, DeviceError> {
        let desc = sheet_program()?;
        let program = device.compile_program(&desc)?;
        let vertices = quad_vertices();
        let quad = device.create_vertex_buffer(&vertices)?;
        Ok(Self {
            program,
            quad,
            quad_vertices: vertices.len() as u32,
            schema: desc.uniforms,
        })
    }

    /// Draw layer `z` of the atlas in `texture` with the sheet's `model`.
    #[allow(clippy::too_many_arguments)]
    pub fn draw<D: GraphicsDevice + ?Sized>(
        &self,
        device: &mut D,
        projection: Mat4,
        model: Mat4,
        z: u32,
        texture: TextureHandle,
        layout: &AtlasLayout,
        region: SubRegion,
    ) -> Result<(), DeviceError> {
        let uniforms = self.schema.bind(&[
            ("projection", UniformValue::Mat4(projection)),
            ("model", UniformValue::Mat4(model)),
            ("grid_size", UniformValue::Vec4(grid_uniform(layout))),
            ("region", UniformValue::Vec4(region_uniform(region))),
            ("layer", UniformValue::Float(z as f32)),
        ])?;
        device.draw(&DrawCall {
            program: self.program,
            uniforms: &uniforms,
            texture: Some(texture),
            vertices: self.quad,
            vertex_count: self.quad_vertices,
        })
    }
}
