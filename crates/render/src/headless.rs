use crate::device::{
    BoundUniforms, BufferHandle, DeviceError, DrawCall, GraphicsDevice, ProgramDesc, ProgramHandle,
    TextureHandle,
};
use image::RgbaImage;

/// A draw as seen by [`RecordingDevice`].
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub program: ProgramHandle,
    pub label: &'static str,
    pub uniforms: BoundUniforms,
    pub texture: Option<TextureHandle>,
    pub vertices: BufferHandle,
    pub vertex_count: u32,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeviceStats {
    pub programs: usize,
    pub textures: usize,
    pub buffers: usize,
    pub uploads: usize,
    pub updates: usize,
    pub draws: usize,
}

/// Headless [`GraphicsDevice`] that validates and records every call.
///
/// Behaves like a real device for error purposes: programs are link
/// checked, handles must exist, texture updates must keep the size and
/// draws must bind a uniform block of the program's size.
#[derive(Debug, Default)]
pub struct RecordingDevice {
    programs: Vec<ProgramDesc>,
    textures: Vec<(u32, u32)>,
    buffers: Vec<usize>,
    draws: Vec<DrawRecord>,
    uploads: usize,
    updates: usize,
    reject_compile: Option<String>,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// A device whose shader compiler rejects everything with `reason`.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            reject_compile: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn draws(&self) -> &[DrawRecord] {
        &self.draws
    }

    pub fn program(&self, handle: ProgramHandle) -> Option<&ProgramDesc> {
        self.programs.get(handle.0 as usize)
    }

    pub fn texture_size(&self, handle: TextureHandle) -> Option<(u32, u32)> {
        self.textures.get(handle.0 as usize).copied()
    }

    pub fn stats(&self) -> DeviceStats {
        DeviceStats {
            programs: self.programs.len(),
            textures: self.textures.len(),
            buffers: self.buffers.len(),
            uploads: self.uploads,
            updates: self.updates,
            draws: self.draws.len(),
        }
    }

    /// Forget recorded draws; called once per presented frame.
    pub fn clear_draws(&mut self) {
        self.draws.clear();
    }

    fn texture_mut(&mut self, handle: TextureHandle) -> Result<&mut (u32, u32), DeviceError> {
        self.textures
            .get_mut(handle.0 as usize)
            .ok_or(DeviceError::UnknownHandle {
                kind: "texture",
                id: handle.0,
            })
    }
}

impl GraphicsDevice for RecordingDevice {
    fn compile_program(&mut self, desc: &ProgramDesc) -> Result<ProgramHandle, DeviceError> {
        if let Some(reason) = &self.reject_compile {
            return Err(DeviceError::Compile {
                label: desc.label.to_string(),
                reason: reason.clone(),
            });
        }
        desc.validate()?;
        self.programs.push(desc.clone());
        tracing::debug!(label = desc.label, "program recorded");
        Ok(ProgramHandle(self.programs.len() as u32 - 1))
    }

    fn upload_texture(&mut self, image: &RgbaImage) -> Result<TextureHandle, DeviceError> {
        self.textures.push(image.dimensions());
        self.uploads += 1;
        Ok(TextureHandle(self.textures.len() as u32 - 1))
    }

    fn update_texture(&mut self, texture: TextureHandle, image: &RgbaImage) -> Result<(), DeviceError> {
        let expected = *self.texture_mut(texture)?;
        if expected != image.dimensions() {
            return Err(DeviceError::TextureSize {
                expected,
                actual: image.dimensions(),
            });
        }
        self.updates += 1;
        Ok(())
    }

    fn create_vertex_buffer(&mut self, vertices: &[[f32; 3]]) -> Result<BufferHandle, DeviceError> {
        self.buffers.push(vertices.len());
        Ok(BufferHandle(self.buffers.len() as u32 - 1))
    }

    fn draw(&mut self, call: &DrawCall<'_>) -> Result<(), DeviceError> {
        let desc = self
            .programs
            .get(call.program.0 as usize)
            .ok_or(DeviceError::UnknownHandle {
                kind: "program",
                id: call.program.0,
            })?;
        let len = *self
            .buffers
            .get(call.vertices.0 as usize)
            .ok_or(DeviceError::UnknownHandle {
                kind: "buffer",
                id: call.vertices.0,
            })?;
        if let Some(texture) = call.texture {
            self.texture_size(texture).ok_or(DeviceError::UnknownHandle {
                kind: "texture",
                id: texture.0,
            })?;
        }
        if call.uniforms.bytes().len() != desc.uniforms.byte_size() {
            return Err(DeviceError::Backend(format!(
                "program '{}' expects a {}-byte uniform block, got {}",
                desc.label,
                desc.uniforms.byte_size(),
                call.uniforms.bytes().len()
            )));
        }
        if call.vertex_count as usize > len {
            return Err(DeviceError::Backend(format!(
                "draw of {} vertices from a {len}-vertex buffer",
                call.vertex_count
            )));
        }
        self.draws.push(DrawRecord {
            program: call.program,
            label: desc.label,
            uniforms: call.uniforms.clone(),
            texture: call.texture,
            vertices: call.vertices,
            vertex_count: call.vertex_count,
        });
        Ok(())
    }
}
