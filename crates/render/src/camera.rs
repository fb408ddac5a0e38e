use glam::{Mat4, Vec2, Vec3, Vec4Swizzles};

/// Look-at camera with a right-handed perspective projection.
/// Depth in clip space runs 0..1 (wgpu convention).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            eye: Vec3::ZERO,
            target: Vec3::NEG_Z,
            up: Vec3::Y,
            fov_y: 45.0_f32.to_radians(),
            aspect: 1.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl Camera {
    pub fn look_at(eye: Vec3, target: Vec3) -> Self {
        Self {
            eye,
            target,
            ..Self::default()
        }
    }

    pub fn with_aspect(mut self, width: u32, height: u32) -> Self {
        self.set_viewport(width, height);
        self
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    pub fn forward(&self) -> Vec3 {
        (self.target - self.eye).normalize_or(Vec3::NEG_Z)
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection() * self.view()
    }

    /// World-space ray through `ndc`, as `(origin, unit direction)`.
    /// The origin lies on the near plane.
    pub fn ray(&self, ndc: Vec2) -> Option<(Vec3, Vec3)> {
        let vp = self.view_projection();
        if vp.determinant().abs() <= f32::EPSILON {
            return None;
        }
        let inverse = vp.inverse();
        let unproject = |depth: f32| {
            let p = inverse * ndc.extend(depth).extend(1.0);
            (p.w.abs() > f32::EPSILON).then(|| p.xyz() / p.w)
        };
        let near = unproject(0.0)?;
        let far = unproject(1.0)?;
        let dir = (far - near).try_normalize()?;
        Some((near, dir))
    }
}
