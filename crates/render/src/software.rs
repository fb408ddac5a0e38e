use crate::camera::Camera;
use crate::raymarch::march;
use glam::{Mat4, Vec2, Vec3};
use image::RgbaImage;
use voxsprite_atlas::{AtlasRegistry, AtlasView, VoxelSampler};
use voxsprite_common::Rgba;
use voxsprite_sprite::Sprite;

/// Parameter along `dir` where a ray from `origin` enters the cube
/// `[-0.5, 0.5]³`. `None` when the ray misses or starts inside the cube,
/// matching back-face culling on the GPU.
pub fn ray_box_entry(origin: Vec3, dir: Vec3) -> Option<f32> {
    if origin.abs().cmple(Vec3::splat(0.5)).all() {
        return None;
    }
    let mut t_min = f32::NEG_INFINITY;
    let mut t_max = f32::INFINITY;
    for axis in 0..3 {
        let (o, d) = (origin[axis], dir[axis]);
        if d.abs() <= f32::EPSILON {
            if o.abs() > 0.5 {
                return None;
            }
            continue;
        }
        let a = (-0.5 - o) / d;
        let b = (0.5 - o) / d;
        t_min = t_min.max(a.min(b));
        t_max = t_max.min(a.max(b));
    }
    (t_min <= t_max && t_min > 0.0).then_some(t_min)
}

/// One cube to draw: its model matrix and voxel source.
#[derive(Clone, Copy)]
pub struct SpriteInstance<'a> {
    pub model: Mat4,
    pub sampler: &'a dyn VoxelSampler,
}

/// CPU renderer producing the same pixels as the sprite program, one ray
/// per pixel centre.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoftwareRenderer {
    pub width: u32,
    pub height: u32,
    pub background: Rgba,
}

impl SoftwareRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            background: Rgba::new(0, 0, 0, 255),
        }
    }

    pub fn with_background(mut self, background: Rgba) -> Self {
        self.background = background;
        self
    }

    /// NDC of the centre of pixel `(px, py)`, y up.
    pub fn pixel_ndc(&self, px: u32, py: u32) -> Vec2 {
        Vec2::new(
            (px as f32 + 0.5) / self.width as f32 * 2.0 - 1.0,
            1.0 - (py as f32 + 0.5) / self.height as f32 * 2.0,
        )
    }

    pub fn render(&self, camera: &Camera, instances: &[SpriteInstance<'_>]) -> RgbaImage {
        let prepared: Vec<(Mat4, Mat4, &dyn VoxelSampler)> = instances
            .iter()
            .filter_map(|inst| {
                if inst.model.determinant().abs() <= f32::EPSILON {
                    tracing::warn!("skipping sprite with a degenerate model matrix");
                    return None;
                }
                Some((inst.model, inst.model.inverse(), inst.sampler))
            })
            .collect();

        let mut image = RgbaImage::from_pixel(self.width, self.height, image::Rgba(self.background.to_array()));
        for py in 0..self.height {
            for px in 0..self.width {
                let Some((origin, dir)) = camera.ray(self.pixel_ndc(px, py)) else {
                    continue;
                };
                let mut nearest: Option<(f32, Rgba)> = None;
                for (model, inverse, sampler) in &prepared {
                    let local_origin = inverse.transform_point3(origin);
                    let local_dir = inverse.transform_vector3(dir);
                    let Some(t) = ray_box_entry(local_origin, local_dir) else {
                        continue;
                    };
                    let near = local_origin + local_dir * t;
                    let Some(hit) = march(*sampler, local_origin, near) else {
                        continue;
                    };
                    let local_hit = near + local_dir.normalize() * hit.distance;
                    let depth = (model.transform_point3(local_hit) - origin).length();
                    if nearest.is_none_or(|(d, _)| depth < d) {
                        nearest = Some((depth, hit.color));
                    }
                }
                if let Some((_, color)) = nearest {
                    image.put_pixel(px, py, image::Rgba(color.to_array()));
                }
            }
        }
        image
    }

    /// Render every sprite whose atlas is in `registry`.
    pub fn render_sprites<'s>(
        &self,
        camera: &Camera,
        sprites: impl IntoIterator<Item = &'s Sprite>,
        registry: &AtlasRegistry,
    ) -> RgbaImage {
        let mut views: Vec<(Mat4, AtlasView<'_>)> = Vec::new();
        for sprite in sprites {
            let visual = sprite.visual();
            match registry.get(visual.atlas) {
                Some(atlas) => views.push((sprite.model_matrix(), atlas.view_region(visual.region))),
                None => tracing::warn!(sprite = %sprite.id().short(), "no atlas for sprite, skipped"),
            }
        }
        let instances: Vec<SpriteInstance<'_>> = views
            .iter()
            .map(|(model, view)| SpriteInstance {
                model: *model,
                sampler: view,
            })
            .collect();
        self.render(camera, &instances)
    }
}
