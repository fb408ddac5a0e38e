use crate::camera::Camera;
use crate::device::{
    BoundUniforms, BufferHandle, DeviceError, DrawCall, GraphicsDevice, ProgramHandle, TextureHandle,
    UniformSchema, UniformValue,
};
use crate::shaders::{cube_vertices, sprite_program};
use glam::{Mat4, Vec4};
use std::collections::BTreeMap;
use voxsprite_atlas::{AtlasId, AtlasLayout, AtlasRegistry, SliceOrder, SubRegion};
use voxsprite_sprite::Sprite;

/// GPU copies of registry atlases, keyed by atlas id.
#[derive(Debug, Default)]
pub struct AtlasTextures {
    textures: BTreeMap<AtlasId, TextureHandle>,
}

impl AtlasTextures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: AtlasId) -> Option<TextureHandle> {
        self.textures.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Upload atlases the device has never seen and re-upload every dirty
    /// one, then mark them clean. Returns how many textures were written.
    pub fn sync<D: GraphicsDevice + ?Sized>(
        &mut self,
        device: &mut D,
        registry: &mut AtlasRegistry,
    ) -> Result<usize, DeviceError> {
        self.textures.retain(|id, _| registry.get(*id).is_some());
        let mut written = Vec::new();
        for (id, atlas) in registry.iter() {
            match self.textures.get(&id) {
                None => {
                    let handle = device.upload_texture(atlas.image())?;
                    self.textures.insert(id, handle);
                    written.push(id);
                }
                Some(&handle) if atlas.is_dirty() => {
                    device.update_texture(handle, atlas.image())?;
                    written.push(id);
                }
                Some(_) => {}
            }
        }
        for id in &written {
            registry.mark_clean(*id);
        }
        if !written.is_empty() {
            tracing::trace!(count = written.len(), "atlas textures synced");
        }
        Ok(written.len())
    }
}

/// `grid_size` uniform: grid extent plus the slice order flag in `w`.
pub(crate) fn grid_uniform(layout: &AtlasLayout) -> Vec4 {
    let order = match layout.order {
        SliceOrder::Descending => 0.0,
        SliceOrder::Ascending => 1.0,
    };
    layout.size.as_vec3().extend(order)
}

pub(crate) fn region_uniform(region: SubRegion) -> Vec4 {
    Vec4::new(region.scale.x, region.scale.y, region.offset.x, region.offset.y)
}

/// Draws voxel sprites as ray-marched cubes through a [`GraphicsDevice`].
#[derive(Debug)]
pub struct SpriteRenderer {
    program: ProgramHandle,
    cube: BufferHandle,
    cube_vertices: u32,
    schema: UniformSchema,
    textures: AtlasTextures,
}

impl SpriteRenderer {
    /// Compile the sprite program and upload the cube. Any failure here is
    /// fatal for the caller.
    pub fn new<D: GraphicsDevice + ?Sized>(device: &mut D) -> Result<Self, DeviceError> {
        let desc = sprite_program()?;
        let program = device.compile_program(&desc)?;
        let vertices = cube_vertices();
        let cube = device.create_vertex_buffer(&vertices)?;
        tracing::info!(uniform_bytes = desc.uniforms.byte_size(), "sprite program ready");
        Ok(Self {
            program,
            cube,
            cube_vertices: vertices.len() as u32,
            schema: desc.uniforms,
            textures: AtlasTextures::new(),
        })
    }

    pub fn textures(&self) -> &AtlasTextures {
        &self.textures
    }

    /// Bring GPU textures up to date; call at the start of every frame.
    pub fn sync_atlases<D: GraphicsDevice + ?Sized>(
        &mut self,
        device: &mut D,
        registry: &mut AtlasRegistry,
    ) -> Result<usize, DeviceError> {
        self.textures.sync(device, registry)
    }

    /// Uniforms for one cube. `None` when `model` cannot be inverted.
    pub fn uniforms(
        &self,
        camera: &Camera,
        model: Mat4,
        layout: &AtlasLayout,
        region: SubRegion,
    ) -> Result<Option<BoundUniforms>, DeviceError> {
        if model.determinant().abs() <= f32::EPSILON {
            return Ok(None);
        }
        let eye_local = model.inverse().transform_point3(camera.eye);
        self.schema
            .bind(&[
                ("projection", UniformValue::Mat4(camera.view_projection())),
                ("model", UniformValue::Mat4(model)),
                ("eye_local", UniformValue::Vec4(eye_local.extend(1.0))),
                ("grid_size", UniformValue::Vec4(grid_uniform(layout))),
                ("region", UniformValue::Vec4(region_uniform(region))),
            ])
            .map(Some)
    }

    /// Draw one sprite. Returns `false` when it was skipped.
    pub fn draw<D: GraphicsDevice + ?Sized>(
        &self,
        device: &mut D,
        camera: &Camera,
        registry: &AtlasRegistry,
        sprite: &Sprite,
    ) -> Result<bool, DeviceError> {
        let visual = sprite.visual();
        let (Some(atlas), Some(texture)) = (registry.get(visual.atlas), self.textures.get(visual.atlas)) else {
            tracing::warn!(sprite = %sprite.id().short(), atlas = visual.atlas.0, "atlas not uploaded, sprite skipped");
            return Ok(false);
        };
        let Some(uniforms) = self.uniforms(camera, sprite.model_matrix(), atlas.layout(), visual.region)? else {
            tracing::warn!(sprite = %sprite.id().short(), "degenerate model matrix, sprite skipped");
            return Ok(false);
        };
        device.draw(&DrawCall {
            program: self.program,
            uniforms: &uniforms,
            texture: Some(texture),
            vertices: self.cube,
            vertex_count: self.cube_vertices,
        })?;
        Ok(true)
    }

    /// Draw every sprite in order; returns how many were drawn.
    pub fn draw_all<'s, D: GraphicsDevice + ?Sized>(
        &self,
        device: &mut D,
        camera: &Camera,
        registry: &AtlasRegistry,
        sprites: impl IntoIterator<Item = &'s Sprite>,
    ) -> Result<usize, DeviceError> {
        let mut drawn = 0;
        for sprite in sprites {
            if self.draw(device, camera, registry, sprite)? {
                drawn += 1;
            }
        }
        Ok(drawn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::RecordingDevice;
    use glam::{UVec3, Vec3};
    use voxsprite_atlas::VoxelAtlas;
    use voxsprite_common::Rgba;
    use voxsprite_sprite::{SpriteKind, SpriteVisual};

    fn registry() -> (AtlasRegistry, AtlasId, AtlasId) {
        let mut registry = AtlasRegistry::new();
        let a = registry.insert(VoxelAtlas::empty(AtlasLayout::cube(8).unwrap()));
        let b = registry.insert(VoxelAtlas::empty(AtlasLayout::cube(16).unwrap()));
        (registry, a, b)
    }

    #[test]
    fn construction_compiles_once() {
        let mut device = RecordingDevice::new();
        SpriteRenderer::new(&mut device).unwrap();
        let stats = device.stats();
        assert_eq!((stats.programs, stats.buffers), (1, 1));
    }

    #[test]
    fn compile_failure_is_fatal() {
        let mut device = RecordingDevice::failing("driver lost");
        assert!(matches!(
            SpriteRenderer::new(&mut device),
            Err(DeviceError::Compile { .. })
        ));
    }

    #[test]
    fn dirty_atlases_upload_exactly_once() {
        let mut device = RecordingDevice::new();
        let mut renderer = SpriteRenderer::new(&mut device).unwrap();
        let (mut registry, a, _) = registry();

        assert_eq!(renderer.sync_atlases(&mut device, &mut registry).unwrap(), 2);
        assert_eq!(renderer.sync_atlases(&mut device, &mut registry).unwrap(), 0);
        assert!(registry.dirty_ids().is_empty());

        registry
            .get_mut(a)
            .unwrap()
            .set_voxel(2, 5, 1, Rgba::MAGENTA)
            .unwrap();
        assert_eq!(renderer.sync_atlases(&mut device, &mut registry).unwrap(), 1);
        assert_eq!(renderer.sync_atlases(&mut device, &mut registry).unwrap(), 0);

        let stats = device.stats();
        assert_eq!((stats.uploads, stats.updates), (2, 1));
    }

    #[test]
    fn removed_atlas_leaves_cache() {
        let mut device = RecordingDevice::new();
        let mut renderer = SpriteRenderer::new(&mut device).unwrap();
        let (mut registry, _, b) = registry();
        renderer.sync_atlases(&mut device, &mut registry).unwrap();
        registry.remove(b);
        renderer.sync_atlases(&mut device, &mut registry).unwrap();
        assert_eq!(renderer.textures().len(), 1);
        assert!(renderer.textures().get(b).is_none());
    }

    #[test]
    fn draw_binds_sprite_uniforms() {
        let mut device = RecordingDevice::new();
        let mut renderer = SpriteRenderer::new(&mut device).unwrap();
        let (mut registry, a, _) = registry();
        renderer.sync_atlases(&mut device, &mut registry).unwrap();

        let sprite = Sprite::new(SpriteKind::Treasure, SpriteVisual::new(a, UVec3::splat(8)))
            .with_placement(Mat4::from_translation(Vec3::new(0.0, 0.0, -10.0)));
        let camera = Camera::look_at(Vec3::ZERO, Vec3::NEG_Z);
        assert!(renderer.draw(&mut device, &camera, &registry, &sprite).unwrap());

        let record = &device.draws()[0];
        assert_eq!(record.label, "sprite");
        assert_eq!(record.vertex_count, 36);
        assert_eq!(record.texture, renderer.textures().get(a));
        let values = record.uniforms.values();
        assert_eq!(values[2], UniformValue::Vec4(Vec4::new(0.0, 0.0, 10.0, 1.0)));
        assert_eq!(values[3], UniformValue::Vec4(Vec4::new(8.0, 8.0, 8.0, 0.0)));
        assert_eq!(values[4], UniformValue::Vec4(Vec4::new(1.0, 1.0, 0.0, 0.0)));
    }

    #[test]
    fn unsynced_atlas_is_skipped() {
        let mut device = RecordingDevice::new();
        let renderer = SpriteRenderer::new(&mut device).unwrap();
        let (registry, a, _) = registry();
        let sprite = Sprite::new(SpriteKind::Plant, SpriteVisual::new(a, UVec3::splat(8)));
        let camera = Camera::default();
        let drawn = renderer
            .draw_all(&mut device, &camera, &registry, [&sprite])
            .unwrap();
        assert_eq!(drawn, 0);
        assert!(device.draws().is_empty());
    }
}
