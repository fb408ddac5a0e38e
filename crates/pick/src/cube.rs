use crate::sheet::project_point;
use glam::{Mat4, Vec2, Vec3};

/// Corners of the unit sprite cube `[-0.5, 0.5]³`.
pub const CUBE_CORNERS: [Vec3; 8] = [
    Vec3::new(-0.5, -0.5, -0.5),
    Vec3::new(0.5, -0.5, -0.5),
    Vec3::new(-0.5, 0.5, -0.5),
    Vec3::new(0.5, 0.5, -0.5),
    Vec3::new(-0.5, -0.5, 0.5),
    Vec3::new(0.5, -0.5, 0.5),
    Vec3::new(-0.5, 0.5, 0.5),
    Vec3::new(0.5, 0.5, 0.5),
];

/// Axis-aligned rectangle in NDC.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenRect {
    pub min: Vec2,
    pub max: Vec2,
}

impl ScreenRect {
    pub fn contains(&self, p: Vec2) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }
}

/// Screen-space bounds of a sprite cube, `None` if any corner is behind the
/// eye.
pub fn cube_bounds(projection: Mat4, model: Mat4) -> Option<ScreenRect> {
    let mvp = projection * model;
    let mut min = Vec2::splat(f32::INFINITY);
    let mut max = Vec2::splat(f32::NEG_INFINITY);
    for corner in CUBE_CORNERS {
        let p = project_point(mvp, corner)?;
        min = min.min(p);
        max = max.max(p);
    }
    Some(ScreenRect { min, max })
}

/// Coarse test: could `point` be over the sprite? Only rejects points
/// outside the projected bounds; it does not resolve a voxel.
pub fn cube_hit(projection: Mat4, model: Mat4, point: Vec2) -> bool {
    cube_bounds(projection, model).is_some_and(|r| r.contains(point))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn projection() -> Mat4 {
        Mat4::perspective_rh(45f32.to_radians(), 1.0, 0.1, 100.0)
    }

    #[test]
    fn centre_of_cube_in_front_is_a_hit() {
        let model = Mat4::from_translation(Vec3::new(0.0, 0.0, -3.0));
        assert!(cube_hit(projection(), model, Vec2::ZERO));
        assert!(!cube_hit(projection(), model, Vec2::new(0.9, 0.9)));
    }

    #[test]
    fn bounds_grow_as_cube_approaches() {
        let far = cube_bounds(projection(), Mat4::from_translation(Vec3::new(0.0, 0.0, -10.0))).unwrap();
        let near = cube_bounds(projection(), Mat4::from_translation(Vec3::new(0.0, 0.0, -2.0))).unwrap();
        assert!(near.max.x - near.min.x > far.max.x - far.min.x);
    }

    #[test]
    fn cube_around_eye_is_rejected() {
        assert!(!cube_hit(projection(), Mat4::IDENTITY, Vec2::ZERO));
    }
}
