use crate::polygon::ConvexQuad;
use glam::{Mat4, UVec3, Vec2, Vec3};

/// A sheet's local quad at z = 0, in winding order.
pub const QUAD_CORNERS: [Vec3; 4] = [
    Vec3::new(-1.0, -1.0, 0.0),
    Vec3::new(1.0, -1.0, 0.0),
    Vec3::new(1.0, 1.0, 0.0),
    Vec3::new(-1.0, 1.0, 0.0),
];

/// Project a local point to NDC. `None` if it is at or behind the eye.
pub fn project_point(mvp: Mat4, p: Vec3) -> Option<Vec2> {
    let clip = mvp * p.extend(1.0);
    if clip.w <= f32::EPSILON {
        return None;
    }
    Some(Vec2::new(clip.x, clip.y) / clip.w)
}

/// Picks cells on flat sheets showing one z layer of a `size` grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetPicker {
    pub size: UVec3,
}

impl SheetPicker {
    pub fn new(size: UVec3) -> Self {
        Self { size }
    }

    /// The sheet's corners in NDC. `None` if a corner is behind the eye or
    /// the sheet projects to zero area.
    pub fn project(&self, projection: Mat4, modelview: Mat4) -> Option<ConvexQuad> {
        let mvp = projection * modelview;
        let mut corners = [Vec2::ZERO; 4];
        for (out, corner) in corners.iter_mut().zip(QUAD_CORNERS) {
            *out = project_point(mvp, corner)?;
        }
        let quad = ConvexQuad::new(corners);
        (!quad.is_degenerate()).then_some(quad)
    }

    /// Cell under `point` on the sheet for layer `z`, or `None` if the point
    /// misses the sheet or `z` is not a layer of the grid.
    pub fn pick(&self, projection: Mat4, modelview: Mat4, z: u32, point: Vec2) -> Option<UVec3> {
        if z >= self.size.z {
            return None;
        }
        let quad = self.project(projection, modelview)?;
        if !quad.contains(point) {
            return None;
        }
        let uv = quad.local_coords(point)?;
        let x = cell(uv.x, self.size.x);
        let y = cell(uv.y, self.size.y);
        let hit = UVec3::new(x, y, z);
        tracing::trace!(?hit, "sheet pick");
        Some(hit)
    }

    /// NDC position of the centre of cell `(x, y)`. The inverse of
    /// [`Self::pick`] up to rounding.
    pub fn cell_center(&self, projection: Mat4, modelview: Mat4, x: u32, y: u32) -> Option<Vec2> {
        let u = (x as f32 + 0.5) / self.size.x as f32;
        let v = (y as f32 + 0.5) / self.size.y as f32;
        let local = Vec3::new(u * 2.0 - 1.0, v * 2.0 - 1.0, 0.0);
        project_point(projection * modelview, local)
    }
}

fn cell(t: f32, n: u32) -> u32 {
    ((t * n as f32).floor().max(0.0) as u32).min(n.saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn projection() -> Mat4 {
        Mat4::perspective_rh(45f32.to_radians(), 1.0, 0.1, 100.0)
    }

    fn sheet(z: u32) -> Mat4 {
        Mat4::from_translation(Vec3::new(0.75, 0.775 - 0.225 * z as f32, -5.0))
            * Mat4::from_scale(Vec3::splat(0.1))
    }

    #[test]
    fn picking_cell_centres_is_inverse() {
        let picker = SheetPicker::new(UVec3::splat(8));
        for z in [0, 3, 7] {
            for (x, y) in [(0, 0), (7, 7), (2, 5), (6, 1)] {
                let p = picker.cell_center(projection(), sheet(z), x, y).unwrap();
                assert_eq!(picker.pick(projection(), sheet(z), z, p), Some(UVec3::new(x, y, z)));
            }
        }
    }

    #[test]
    fn points_off_the_sheet_miss() {
        let picker = SheetPicker::new(UVec3::splat(8));
        assert_eq!(picker.pick(projection(), sheet(0), 0, Vec2::ZERO), None);
        assert_eq!(picker.pick(projection(), sheet(0), 0, Vec2::new(-0.9, -0.9)), None);
    }

    #[test]
    fn sheets_do_not_overlap() {
        let picker = SheetPicker::new(UVec3::splat(8));
        let p = picker.cell_center(projection(), sheet(2), 4, 4).unwrap();
        let hits: Vec<u32> = (0..8)
            .filter(|&z| picker.pick(projection(), sheet(z), z, p).is_some())
            .collect();
        assert_eq!(hits, vec![2]);
    }

    #[test]
    fn sheet_behind_eye_is_never_hit() {
        let picker = SheetPicker::new(UVec3::splat(8));
        let behind = Mat4::from_translation(Vec3::new(0.0, 0.0, 5.0));
        assert_eq!(picker.pick(projection(), behind, 0, Vec2::ZERO), None);
    }

    #[test]
    fn layer_outside_grid_is_never_hit() {
        let picker = SheetPicker::new(UVec3::splat(8));
        let p = picker.cell_center(projection(), sheet(0), 4, 4).unwrap();
        assert_eq!(picker.pick(projection(), sheet(0), 7, p), Some(UVec3::new(4, 4, 7)));
        assert_eq!(picker.pick(projection(), sheet(0), 8, p), None);
        assert_eq!(picker.pick(projection(), sheet(0), 42, p), None);
    }

    #[test]
    fn edge_on_sheet_is_never_hit() {
        let picker = SheetPicker::new(UVec3::splat(8));
        let edge_on = Mat4::from_translation(Vec3::new(0.0, 0.0, -5.0))
            * Mat4::from_rotation_y(std::f32::consts::FRAC_PI_2);
        assert!(picker.project(projection(), edge_on).is_none());
        for point in [Vec2::ZERO, Vec2::new(0.0, 0.1), Vec2::new(0.01, 0.0)] {
            assert_eq!(picker.pick(projection(), edge_on, 0, point), None);
        }
    }

    #[test]
    fn non_square_grid() {
        let picker = SheetPicker::new(UVec3::new(4, 2, 3));
        let p = picker.cell_center(projection(), sheet(0), 3, 1).unwrap();
        assert_eq!(picker.pick(projection(), sheet(0), 1, p), Some(UVec3::new(3, 1, 1)));
    }
}
