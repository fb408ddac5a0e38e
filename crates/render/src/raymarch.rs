//! CPU reference of the per-pixel voxel march. The WGSL programs in
//! [`crate::shaders`] run the same steps.

use glam::{IVec3, UVec3, Vec3};
use voxsprite_atlas::VoxelSampler;
use voxsprite_common::Rgba;

/// Shrinks the far bound so a ray exiting exactly on a face does not sample
/// the voxel beyond it.
const FAR_EPSILON_SCALE: f32 = 0.999;

/// Upper bound on voxels visited by one ray: `x + y + z - 2`.
pub fn max_march_steps(size: UVec3) -> u32 {
    (size.x + size.y + size.z).saturating_sub(2)
}

/// Voxel containing `p` (local cube coordinates), clamped into the grid.
pub fn voxel_at(p: Vec3, size: UVec3) -> IVec3 {
    let v = ((p + 0.5) * size.as_vec3()).floor().as_ivec3();
    v.clamp(IVec3::ZERO, size.as_ivec3() - 1)
}

/// Lighting factor for a face: `dot(|normal|, |dir| * 0.5 + 0.5)`.
pub fn lighting(normal: IVec3, dir: Vec3) -> f32 {
    normal.abs().as_vec3().dot(dir.abs() * 0.5 + 0.5)
}

/// A solid voxel found by [`march`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarchHit {
    pub voxel: UVec3,
    /// Normal of the face the ray entered through.
    pub normal: IVec3,
    /// Distance from the entry point, in local cube units.
    pub distance: f32,
    /// Voxel color as stored.
    pub albedo: Rgba,
    /// Lit output color, always opaque.
    pub color: Rgba,
    /// Voxels visited including the hit.
    pub steps: u32,
}

/// DDA state for one ray through a voxel grid spanning `[-0.5, 0.5]³`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayMarchState {
    dir: Vec3,
    voxel: IVec3,
    step: IVec3,
    /// Distance at which the ray crosses the next boundary on each axis.
    next_boundary: Vec3,
    /// Distance between boundaries on each axis.
    boundary_delta: Vec3,
    distance: f32,
    far: f32,
    normal: IVec3,
    size: UVec3,
}

impl RayMarchState {
    /// Start a march from the eye `origin` through the entry point `near` on
    /// the cube surface. `None` if the two coincide.
    pub fn new(origin: Vec3, near: Vec3, size: UVec3) -> Option<Self> {
        let dir = (near - origin).try_normalize()?;
        let step = IVec3::new(axis_sign(dir.x), axis_sign(dir.y), axis_sign(dir.z));
        let voxel = voxel_at(near, size);
        let cells = size.as_vec3();

        let mut far = f32::INFINITY;
        let mut next_boundary = Vec3::INFINITY;
        let mut boundary_delta = Vec3::INFINITY;
        for axis in 0..3 {
            if step[axis] == 0 {
                continue;
            }
            let exit = 0.5 * step[axis] as f32;
            far = far.min((exit - near[axis]) / dir[axis]);
            let edge = if step[axis] > 0 {
                voxel[axis] + 1
            } else {
                voxel[axis]
            };
            let boundary = edge as f32 / cells[axis] - 0.5;
            next_boundary[axis] = (boundary - near[axis]) / dir[axis];
            boundary_delta[axis] = 1.0 / (dir[axis].abs() * cells[axis]);
        }

        Some(Self {
            dir,
            voxel,
            step,
            next_boundary,
            boundary_delta,
            distance: 0.0,
            far: far * FAR_EPSILON_SCALE,
            normal: entry_normal(near),
            size,
        })
    }

    pub fn dir(&self) -> Vec3 {
        self.dir
    }

    pub fn voxel(&self) -> IVec3 {
        self.voxel
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn far(&self) -> f32 {
        self.far
    }

    pub fn normal(&self) -> IVec3 {
        self.normal
    }

    /// Whether the current voxel is inside the grid.
    pub fn in_grid(&self) -> bool {
        self.voxel.cmpge(IVec3::ZERO).all() && self.voxel.cmplt(self.size.as_ivec3()).all()
    }

    /// Whether the march has left the cube.
    pub fn finished(&self) -> bool {
        self.distance >= self.far || !self.in_grid()
    }

    /// Advance to the next voxel along the single axis whose boundary is
    /// nearest. Ties go to x, then y, then z.
    pub fn step(&mut self) {
        let t = self.next_boundary;
        let axis = if t.x <= t.y && t.x <= t.z {
            0
        } else if t.y <= t.z {
            1
        } else {
            2
        };
        self.distance = t[axis];
        self.voxel[axis] += self.step[axis];
        self.next_boundary[axis] += self.boundary_delta[axis];
        self.normal = IVec3::ZERO;
        self.normal[axis] = -self.step[axis];
    }
}

fn axis_sign(v: f32) -> i32 {
    if v > 0.0 {
        1
    } else if v < 0.0 {
        -1
    } else {
        0
    }
}

/// Normal of the cube face `near` lies on: the axis where it is closest to
/// ±0.5.
fn entry_normal(near: Vec3) -> IVec3 {
    let d = near.abs();
    let axis = if d.x >= d.y && d.x >= d.z {
        0
    } else if d.y >= d.z {
        1
    } else {
        2
    };
    let mut n = IVec3::ZERO;
    n[axis] = if near[axis] < 0.0 { -1 } else { 1 };
    n
}

/// March from `origin` (eye in local cube space) through the entry point
/// `near`, returning the first solid voxel.
pub fn march<S: VoxelSampler + ?Sized>(sampler: &S, origin: Vec3, near: Vec3) -> Option<MarchHit> {
    march_counted(sampler, origin, near).0
}

/// [`march`] that also reports how many voxels were visited.
pub fn march_counted<S: VoxelSampler + ?Sized>(
    sampler: &S,
    origin: Vec3,
    near: Vec3,
) -> (Option<MarchHit>, u32) {
    let size = sampler.grid_size();
    let Some(mut state) = RayMarchState::new(origin, near, size) else {
        return (None, 0);
    };
    let bound = max_march_steps(size);
    for visited in 1..=bound {
        let voxel = state.voxel().as_uvec3();
        let albedo = sampler.sample(voxel);
        if albedo.is_solid() {
            let light = lighting(state.normal(), state.dir());
            let shade = |c: u8| (c as f32 * light).round().clamp(0.0, 255.0) as u8;
            let hit = MarchHit {
                voxel,
                normal: state.normal(),
                distance: state.distance(),
                albedo,
                color: Rgba::rgb(shade(albedo.r), shade(albedo.g), shade(albedo.b)),
                steps: visited,
            };
            return (Some(hit), visited);
        }
        state.step();
        if state.finished() {
            return (None, visited);
        }
    }
    (None, bound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxsprite_atlas::VoxelGrid;

    fn single(voxel: UVec3) -> VoxelGrid {
        let mut grid = VoxelGrid::new(UVec3::splat(8)).unwrap();
        grid.set(voxel, Rgba::rgb(200, 100, 50)).unwrap();
        grid
    }

    /// Entry point and eye for a ray along `axis_dir` through the centre of
    /// voxel (3,3,3) of an 8³ grid.
    fn axis_ray(axis_dir: Vec3) -> (Vec3, Vec3) {
        let centre = (Vec3::splat(3.0) + 0.5) / 8.0 - 0.5;
        let mut near = centre;
        for axis in 0..3 {
            if axis_dir[axis] != 0.0 {
                near[axis] = -0.5 * axis_dir[axis];
            }
        }
        (near - axis_dir * 2.0, near)
    }

    #[test]
    fn step_bounds() {
        assert_eq!(max_march_steps(UVec3::splat(8)), 22);
        assert_eq!(max_march_steps(UVec3::splat(16)), 46);
    }

    #[test]
    fn single_voxel_hit_from_every_axis() {
        let grid = single(UVec3::splat(3));
        for dir in [Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y, Vec3::Z, Vec3::NEG_Z] {
            let (origin, near) = axis_ray(dir);
            let hit = march(&grid, origin, near).unwrap_or_else(|| panic!("miss along {dir}"));
            assert_eq!(hit.voxel, UVec3::splat(3));
            assert_eq!(hit.normal, (-dir).as_ivec3());
            // Axis-aligned ray: face lighting is |dir| * 0.5 + 0.5 = 1.
            assert_eq!(hit.color, Rgba::rgb(200, 100, 50));
            assert_eq!(hit.albedo, Rgba::rgb(200, 100, 50));
        }
    }

    #[test]
    fn entry_face_hit_keeps_entry_normal() {
        let grid = single(UVec3::new(0, 4, 4));
        let near = Vec3::new(-0.5, 0.06, 0.06);
        let hit = march(&grid, near - Vec3::X, near).unwrap();
        assert_eq!(hit.voxel, UVec3::new(0, 4, 4));
        assert_eq!(hit.normal, IVec3::NEG_X);
        assert_eq!(hit.distance, 0.0);
        assert_eq!(hit.steps, 1);
    }

    #[test]
    fn corner_ray_misses_centre_voxel() {
        let grid = single(UVec3::splat(3));
        // Enter the (0,0,0) cell through the -y face, leave through -x.
        let near = Vec3::new(-0.45, -0.5, -0.45);
        let origin = near - Vec3::new(-1.0, 1.0, 0.2);
        let (hit, steps) = march_counted(&grid, origin, near);
        assert!(hit.is_none());
        assert!(steps <= 2);
    }

    #[test]
    fn empty_grid_never_hits() {
        let grid = VoxelGrid::new(UVec3::splat(8)).unwrap();
        let dirs = [
            Vec3::new(1.0, 0.3, 0.2),
            Vec3::new(-0.4, 1.0, 0.7),
            Vec3::new(0.1, -0.2, -1.0),
            Vec3::ONE,
        ];
        for dir in dirs {
            let dir = dir.normalize();
            let near = -dir * 0.5 / dir.abs().max_element();
            let (hit, steps) = march_counted(&grid, near - dir, near);
            assert!(hit.is_none());
            assert!(steps <= max_march_steps(grid.size()));
        }
    }

    #[test]
    fn diagonal_through_full_grid_stays_in_bound() {
        let grid = VoxelGrid::new(UVec3::splat(16)).unwrap();
        let near = Vec3::splat(-0.5);
        let (hit, steps) = march_counted(&grid, near - Vec3::ONE, near);
        assert!(hit.is_none());
        assert!(steps <= 46);
        assert!(steps > 16);
    }

    #[test]
    fn oblique_light_is_dimmer() {
        let grid = single(UVec3::new(3, 3, 0));
        let dir = Vec3::new(0.0, 0.6, 0.8);
        let near = Vec3::new(3.5 / 8.0 - 0.5, 3.5 / 8.0 - 0.5, -0.5);
        // Enter through the -z face.
        let hit = march(&grid, near - dir, near).unwrap();
        assert_eq!(hit.normal, IVec3::NEG_Z);
        let expected = (200.0 * (0.8 * 0.5 + 0.5) as f32).round() as u8;
        assert_eq!(hit.color.r, expected);
        assert_eq!(hit.color.a, 255);
    }

    #[test]
    fn coincident_eye_and_entry_is_a_miss() {
        let grid = single(UVec3::ZERO);
        assert!(march(&grid, Vec3::splat(-0.5), Vec3::splat(-0.5)).is_none());
    }

    #[test]
    fn steps_are_single_axis() {
        let mut state = RayMarchState::new(
            Vec3::new(-1.0, -0.9, -0.8),
            Vec3::new(-0.5, -0.45, -0.4),
            UVec3::splat(8),
        )
        .unwrap();
        let mut last = state.voxel();
        while !state.finished() {
            state.step();
            let moved = (state.voxel() - last).abs();
            assert_eq!(moved.element_sum(), 1);
            last = state.voxel();
        }
    }
}
