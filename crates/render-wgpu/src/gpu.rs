use image::RgbaImage;
use voxsprite_render::{
    BufferHandle, DeviceError, DrawCall, GraphicsDevice, ProgramDesc, ProgramHandle, TextureHandle,
};
use wgpu::util::DeviceExt;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const VERTEX_STRIDE: u64 = std::mem::size_of::<[f32; 3]>() as u64;

struct Program {
    label: &'static str,
    pipeline: wgpu::RenderPipeline,
    uniform_size: usize,
}

struct Texture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    size: (u32, u32),
}

struct VertexBuffer {
    buffer: wgpu::Buffer,
    len: u32,
}

struct QueuedDraw {
    program: usize,
    _uniforms: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    buffer: usize,
    vertex_count: u32,
}

/// One vertex attribute per declared slot, each a `vec3<f32>` at offset 0.
fn vertex_attributes(desc: &ProgramDesc) -> Vec<wgpu::VertexAttribute> {
    desc.attributes
        .iter()
        .map(|attr| wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32x3,
            offset: 0,
            shader_location: attr.location,
        })
        .collect()
}

fn blend_state(blend: bool) -> wgpu::BlendState {
    if blend {
        wgpu::BlendState::ALPHA_BLENDING
    } else {
        wgpu::BlendState::REPLACE
    }
}

fn unknown(kind: &'static str, id: u32) -> DeviceError {
    DeviceError::UnknownHandle { kind, id }
}

/// [`GraphicsDevice`] on top of a wgpu device and queue.
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    target_format: wgpu::TextureFormat,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    programs: Vec<Program>,
    textures: Vec<Texture>,
    buffers: Vec<VertexBuffer>,
    fallback_texture: wgpu::TextureView,
    depth_texture: wgpu::TextureView,
    queued: Vec<QueuedDraw>,
}

impl WgpuDevice {
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        target_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("voxsprite_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("voxsprite_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let fallback = Self::create_texture(&device, &queue, &RgbaImage::new(1, 1), "fallback_texture");
        let depth_texture = Self::create_depth_texture(&device, width, height);

        Self {
            device,
            queue,
            target_format,
            bind_group_layout,
            pipeline_layout,
            programs: Vec::new(),
            textures: Vec::new(),
            buffers: Vec::new(),
            fallback_texture: fallback.view,
            depth_texture,
            queued: Vec::new(),
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn target_format(&self) -> wgpu::TextureFormat {
        self.target_format
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.depth_texture = Self::create_depth_texture(&self.device, width, height);
    }

    /// Replay every queued draw into `view`, clearing it to `clear` first.
    pub fn render(&mut self, view: &wgpu::TextureView, clear: wgpu::Color) {
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("voxsprite_encoder"),
        });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("voxsprite_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            for draw in &self.queued {
                pass.set_pipeline(&self.programs[draw.program].pipeline);
                pass.set_bind_group(0, &draw.bind_group, &[]);
                pass.set_vertex_buffer(0, self.buffers[draw.buffer].buffer.slice(..));
                pass.draw(0..draw.vertex_count, 0..1);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        tracing::trace!(draws = self.queued.len(), "frame submitted");
        self.queued.clear();
    }

    fn create_texture(device: &wgpu::Device, queue: &wgpu::Queue, image: &RgbaImage, label: &str) -> Texture {
        let (width, height) = image.dimensions();
        let size = wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let result = Texture {
            view: texture.create_view(&Default::default()),
            texture,
            size: (width, height),
        };
        Self::write_texture(queue, &result, image);
        result
    }

    fn write_texture(queue: &wgpu::Queue, target: &Texture, image: &RgbaImage) {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return;
        }
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &target.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            image.as_raw(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
    }

    fn create_depth_texture(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth_texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&Default::default())
    }
}

impl GraphicsDevice for WgpuDevice {
    fn compile_program(&mut self, desc: &ProgramDesc) -> Result<ProgramHandle, DeviceError> {
        desc.validate()?;
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(desc.label),
            source: wgpu::ShaderSource::Wgsl(desc.source.into()),
        });
        let attributes = vertex_attributes(desc);
        let pipeline = self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(desc.label),
            layout: Some(&self.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &module,
                entry_point: Some(desc.vertex_entry),
                compilation_options: Default::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: VERTEX_STRIDE,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &attributes,
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &module,
                entry_point: Some(desc.fragment_entry),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.target_format,
                    blend: Some(blend_state(desc.blend)),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: !desc.blend,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });

        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(DeviceError::Compile {
                label: desc.label.to_string(),
                reason: error.to_string(),
            });
        }

        self.programs.push(Program {
            label: desc.label,
            pipeline,
            uniform_size: desc.uniforms.byte_size(),
        });
        tracing::info!(label = desc.label, "render pipeline created");
        Ok(ProgramHandle(self.programs.len() as u32 - 1))
    }

    fn upload_texture(&mut self, image: &RgbaImage) -> Result<TextureHandle, DeviceError> {
        let texture = Self::create_texture(&self.device, &self.queue, image, "atlas_texture");
        self.textures.push(texture);
        Ok(TextureHandle(self.textures.len() as u32 - 1))
    }

    fn update_texture(&mut self, texture: TextureHandle, image: &RgbaImage) -> Result<(), DeviceError> {
        let target = self
            .textures
            .get(texture.0 as usize)
            .ok_or_else(|| unknown("texture", texture.0))?;
        if target.size != image.dimensions() {
            return Err(DeviceError::TextureSize {
                expected: target.size,
                actual: image.dimensions(),
            });
        }
        Self::write_texture(&self.queue, target, image);
        Ok(())
    }

    fn create_vertex_buffer(&mut self, vertices: &[[f32; 3]]) -> Result<BufferHandle, DeviceError> {
        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("vertex_buffer"),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        self.buffers.push(VertexBuffer {
            buffer,
            len: vertices.len() as u32,
        });
        Ok(BufferHandle(self.buffers.len() as u32 - 1))
    }

    fn draw(&mut self, call: &DrawCall<'_>) -> Result<(), DeviceError> {
        let program = call.program.0 as usize;
        let desc = self
            .programs
            .get(program)
            .ok_or_else(|| unknown("program", call.program.0))?;
        let buffer = call.vertices.0 as usize;
        let vertices = self
            .buffers
            .get(buffer)
            .ok_or_else(|| unknown("buffer", call.vertices.0))?;
        if call.uniforms.bytes().len() != desc.uniform_size {
            return Err(DeviceError::Backend(format!(
                "program '{}' expects a {}-byte uniform block, got {}",
                desc.label,
                desc.uniform_size,
                call.uniforms.bytes().len()
            )));
        }
        if call.vertex_count > vertices.len {
            return Err(DeviceError::Backend(format!(
                "draw of {} vertices from a {}-vertex buffer",
                call.vertex_count, vertices.len
            )));
        }
        let texture_view = match call.texture {
            Some(handle) => {
                &self
                    .textures
                    .get(handle.0 as usize)
                    .ok_or_else(|| unknown("texture", handle.0))?
                    .view
            }
            None => &self.fallback_texture,
        };

        let uniforms = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("draw_uniforms"),
            contents: call.uniforms.bytes(),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("draw_bind_group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniforms.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(texture_view),
                },
            ],
        });

        self.queued.push(QueuedDraw {
            program,
            _uniforms: uniforms,
            bind_group,
            buffer,
            vertex_count: call.vertex_count,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxsprite_render::shaders::{sheet_program, sprite_program};

    #[test]
    fn attributes_follow_declared_locations() {
        let desc = sprite_program().unwrap();
        let attributes = vertex_attributes(&desc);
        assert_eq!(attributes.len(), 1);
        assert_eq!(attributes[0].shader_location, 0);
        assert_eq!(attributes[0].format, wgpu::VertexFormat::Float32x3);
    }

    #[test]
    fn only_sheets_blend() {
        assert_eq!(blend_state(sprite_program().unwrap().blend), wgpu::BlendState::REPLACE);
        assert_eq!(
            blend_state(sheet_program().unwrap().blend),
            wgpu::BlendState::ALPHA_BLENDING
        );
    }
}
