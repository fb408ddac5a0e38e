use crate::animation::AnimationFlags;
use crate::config::SceneConfig;
use crate::rng::SceneRng;
use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use voxsprite_common::Tick;
use voxsprite_input::Controls;

/// Per-tick inputs shared by every sprite behavior.
pub struct TickContext<'a> {
    pub tick: Tick,
    pub config: &'a SceneConfig,
    pub rng: &'a mut SceneRng,
    /// Frog position at the start of the tick, if a frog is alive.
    pub frog: Option<Vec3>,
}

/// Discriminant of [`SpriteKind`], used for atlas lookup and summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KindTag {
    Duck,
    Treasure,
    Plant,
    Fish,
    Frog,
    Font,
    Editable,
}

impl KindTag {
    pub const ALL: [KindTag; 7] = [
        KindTag::Duck,
        KindTag::Treasure,
        KindTag::Plant,
        KindTag::Fish,
        KindTag::Frog,
        KindTag::Font,
        KindTag::Editable,
    ];

    pub fn animation_flags(self) -> AnimationFlags {
        match self {
            KindTag::Duck => AnimationFlags::new(false, true, true, true),
            KindTag::Treasure | KindTag::Plant | KindTag::Font => AnimationFlags::ALL,
            KindTag::Fish => AnimationFlags::new(false, true, false, true),
            KindTag::Frog => AnimationFlags::new(false, true, true, true),
            KindTag::Editable => AnimationFlags::NONE,
        }
    }

    /// Voxels per axis of this kind's sprites.
    pub fn grid_edge(self) -> u32 {
        match self {
            KindTag::Duck => 16,
            _ => 8,
        }
    }

    /// File name of the shipped atlas for this kind.
    pub fn atlas_file(self) -> &'static str {
        match self {
            KindTag::Duck => "duck.voxelmap.png",
            KindTag::Treasure => "treasure.voxelmap.png",
            KindTag::Plant => "plant.voxelmap.png",
            KindTag::Fish => "fish.voxelmap.png",
            KindTag::Frog => "frog.voxelmap.png",
            KindTag::Font => "font.voxelmap.png",
            KindTag::Editable => "working.voxelmap.png",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            KindTag::Duck => "duck",
            KindTag::Treasure => "treasure",
            KindTag::Plant => "plant",
            KindTag::Fish => "fish",
            KindTag::Frog => "frog",
            KindTag::Font => "font",
            KindTag::Editable => "editable",
        }
    }
}

/// Where a swimmer is heading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SteerTarget {
    Point(Vec3),
    /// Chase the frog. Holds the last seen position for when it is gone.
    Frog(Vec3),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Steering {
    pub target: SteerTarget,
}

impl Steering {
    /// Chase the frog with a 25% chance, or always when it is within 15
    /// units; otherwise pick a random point in `area` at the current height.
    pub fn select(placement: &Mat4, area: [f32; 4], frog: Option<Vec3>, rng: &mut SceneRng) -> Self {
        let pos = placement.w_axis.truncate();
        if let Some(frog) = frog {
            let dx = pos.x - frog.x;
            let dz = pos.z - frog.z;
            if rng.next_f32() > 0.75 || dx * dx + dz * dz < 225.0 {
                return Self {
                    target: SteerTarget::Frog(frog),
                };
            }
        }
        let x = rng.range(area[0], area[2]);
        let z = rng.range(area[1], area[3]);
        Self {
            target: SteerTarget::Point(Vec3::new(x, pos.y, z)),
        }
    }

    /// Turn a tenth of the way towards the target.
    pub fn bear(&mut self, placement: &mut Mat4, frog: Option<Vec3>) {
        let goal = match &mut self.target {
            SteerTarget::Point(p) => *p,
            SteerTarget::Frog(last) => {
                if let Some(frog) = frog {
                    *last = frog;
                }
                *last
            }
        };
        let pos = placement.w_axis;
        let mut dx = goal.x - pos.x;
        let mut dz = goal.z - pos.z;
        let d = (dx * dx + dz * dz).sqrt();
        if d <= f32::EPSILON {
            return;
        }
        dx /= d;
        dz /= d;
        let forward = placement.z_axis;
        rotate_y(placement, PI * (dx * forward.z - dz * forward.x) * 0.1);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DuckState {
    pub phase: f32,
    pub y_velocity: f32,
    pub steering: Steering,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FishState {
    pub phase: f32,
    pub steering: Steering,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrogState {
    pub phase: f32,
    pub y_velocity: f32,
    pub oxygen: u32,
    pub score: u32,
}

impl FrogState {
    /// Apply one tick of held controls: turn left/right, dive while above
    /// the sand and breathing.
    pub fn steer(&mut self, placement: &mut Mat4, controls: Controls, config: &SceneConfig) {
        if controls.left {
            rotate_y(placement, PI / 30.0);
        }
        if controls.right {
            rotate_y(placement, -PI / 30.0);
        }
        if controls.dive && placement.w_axis.y > config.sand_depth + 0.5 && self.oxygen > 0 {
            self.y_velocity -= 0.05;
        }
    }
}

/// Tagged sprite variants. Shared lifecycle animation lives in the
/// [`crate::Animator`]; each variant adds its own idle motion on top.
#[derive(Debug, Clone, PartialEq)]
pub enum SpriteKind {
    Duck(DuckState),
    Treasure,
    Plant,
    Fish(FishState),
    Frog(FrogState),
    Font { character: char, cell: [f32; 2] },
    Editable,
}

impl SpriteKind {
    pub fn tag(&self) -> KindTag {
        match self {
            SpriteKind::Duck(_) => KindTag::Duck,
            SpriteKind::Treasure => KindTag::Treasure,
            SpriteKind::Plant => KindTag::Plant,
            SpriteKind::Fish(_) => KindTag::Fish,
            SpriteKind::Frog(_) => KindTag::Frog,
            SpriteKind::Font { .. } => KindTag::Font,
            SpriteKind::Editable => KindTag::Editable,
        }
    }

    /// Variant motion for one tick. `animation` already holds the lifecycle
    /// transform for this tick.
    pub fn tick(&mut self, placement: &mut Mat4, animation: &mut Mat4, ctx: &mut TickContext<'_>) {
        let config = ctx.config;
        let area = config.play_area;
        match self {
            SpriteKind::Duck(duck) => {
                if heading_out(placement, area) {
                    rotate_y(placement, -PI / 32.0);
                } else {
                    if ctx.rng.next_f32() > 0.995 {
                        duck.steering = Steering::select(placement, area, ctx.frog, ctx.rng);
                    }
                    duck.steering.bear(placement, ctx.frog);
                }
                let y = placement.w_axis.y;
                if y > config.water_depth + 1.0 {
                    duck.y_velocity = duck.y_velocity * 0.98 - 0.01;
                } else {
                    let w = wave(ctx.tick, duck.phase);
                    let bob = -(ctx.tick as f32 / PI / 3.0 + duck.phase).cos() * PI / 10.0;
                    *animation *= Mat4::from_rotation_x(bob);
                    duck.y_velocity *= 0.95;
                    if y > config.water_depth {
                        duck.y_velocity += (y - config.water_depth - 0.5) * 0.002;
                    } else {
                        duck.y_velocity += 0.01;
                    }
                    translate(placement, Vec3::new(0.0, 0.0, w * 0.1 + 0.075));
                }
                translate(placement, Vec3::new(0.0, duck.y_velocity, 0.0));
            }
            SpriteKind::Fish(fish) => {
                if heading_out(placement, area) {
                    rotate_y(placement, PI / 32.0);
                } else {
                    if ctx.rng.next_f32() > 0.995 {
                        fish.steering = Steering::select(placement, area, None, ctx.rng);
                    }
                    fish.steering.bear(placement, None);
                }
                let w = wave(ctx.tick, fish.phase);
                *animation *= squash(w);
                translate(placement, Vec3::new(0.0, 0.0, w * 0.1 + 0.075));
            }
            SpriteKind::Frog(frog) => {
                let w = wave(ctx.tick, frog.phase);
                *animation *= squash(w);
                translate(placement, Vec3::new(0.0, 0.0, w * 0.05 + 0.2));
                placement.w_axis.x = placement.w_axis.x.clamp(area[0] + 3.0, area[2] - 3.0);
                placement.w_axis.z = placement.w_axis.z.clamp(area[1] + 3.0, area[3] - 3.0);
                let y = placement.w_axis.y;
                if y > config.water_depth - 2.5 {
                    frog.oxygen = (frog.oxygen + 1).min(config.max_oxygen);
                } else {
                    frog.oxygen = frog.oxygen.saturating_sub(5);
                }
                if y > config.water_depth + 1.0 {
                    frog.y_velocity = frog.y_velocity * 0.98 - 0.01;
                } else {
                    frog.y_velocity *= 0.99;
                    if y > config.water_depth {
                        frog.y_velocity += (y - config.water_depth - 0.5) * 0.002;
                    } else if y > config.sand_depth + 1.0 {
                        frog.y_velocity += 0.01;
                    } else {
                        frog.y_velocity = frog.y_velocity.max(0.01);
                    }
                }
                translate(placement, Vec3::new(0.0, frog.y_velocity, 0.0));
                placement.w_axis.y = placement.w_axis.y.max(config.sand_depth + 1.0);
            }
            SpriteKind::Treasure | SpriteKind::Plant | SpriteKind::Font { .. } | SpriteKind::Editable => {}
        }
    }
}

/// Post-multiplied Y rotation, as a turn in the sprite's own frame.
pub fn rotate_y(m: &mut Mat4, radians: f32) {
    *m *= Mat4::from_rotation_y(radians);
}

/// Post-multiplied translation, as a move in the sprite's own frame.
pub fn translate(m: &mut Mat4, v: Vec3) {
    *m *= Mat4::from_translation(v);
}

/// Place at a random point of `area` at height `y`, facing a random heading
/// in `[yaw_min, yaw_max)`.
pub fn position_randomly(m: &mut Mat4, area: [f32; 4], y: f32, yaw: (f32, f32), rng: &mut SceneRng) {
    let x = rng.range(area[0], area[2]);
    let z = rng.range(area[1], area[3]);
    translate(m, Vec3::new(x, y, z));
    rotate_y(m, rng.range(yaw.0, yaw.1));
}

fn wave(tick: Tick, phase: f32) -> f32 {
    (tick as f32 / PI / 3.0 + phase).sin()
}

fn squash(w: f32) -> Mat4 {
    Mat4::from_scale(Vec3::new(1.0 - w * 0.15, 1.0 - w * 0.15, 1.0 + w * 0.3))
}

/// Within 3 units of an edge and still facing out of the area.
fn heading_out(m: &Mat4, area: [f32; 4]) -> bool {
    let p = m.w_axis;
    let f = m.z_axis;
    (p.x < area[0] + 3.0 && f.x < 0.0)
        || (p.x > area[2] - 3.0 && f.x > 0.0)
        || (p.z < area[1] + 3.0 && f.z < 0.0)
        || (p.z > area[3] - 3.0 && f.z > 0.0)
}
