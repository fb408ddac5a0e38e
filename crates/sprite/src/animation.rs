use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use voxsprite_common::Tick;

/// Ticks taken by the spawn-in spin/scale.
pub const SPAWN_WINDOW: Tick = 10;
/// Ticks taken by the death spin/scale.
pub const DEATH_WINDOW: Tick = 10;
/// Offset used when scheduling a death: the sprite keeps animating for
/// [`DEATH_WINDOW`] ticks and is removed on the tick after.
pub const DEATH_DELAY: Tick = DEATH_WINDOW + 1;

/// Which lifecycle animations a sprite plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnimationFlags {
    pub spin_on_spawn: bool,
    pub scale_on_spawn: bool,
    pub spin_on_die: bool,
    pub scale_on_die: bool,
}

impl AnimationFlags {
    pub const NONE: Self = Self {
        spin_on_spawn: false,
        scale_on_spawn: false,
        spin_on_die: false,
        scale_on_die: false,
    };

    pub const ALL: Self = Self {
        spin_on_spawn: true,
        scale_on_spawn: true,
        spin_on_die: true,
        scale_on_die: true,
    };

    pub const fn new(
        spin_on_spawn: bool,
        scale_on_spawn: bool,
        spin_on_die: bool,
        scale_on_die: bool,
    ) -> Self {
        Self {
            spin_on_spawn,
            scale_on_spawn,
            spin_on_die,
            scale_on_die,
        }
    }
}

/// Lifecycle phase derived from the animator's ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Spawning,
    Steady,
    Dying,
    Removed,
}

/// Spawn/death clock. Rebuilds the lifecycle part of the animation matrix
/// from identity on every tick.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Animator {
    flags: AnimationFlags,
    first_tick: Option<Tick>,
    death_tick: Option<Tick>,
}

impl Animator {
    pub fn new(flags: AnimationFlags) -> Self {
        Self {
            flags,
            first_tick: None,
            death_tick: None,
        }
    }

    pub fn flags(&self) -> AnimationFlags {
        self.flags
    }

    pub fn first_tick(&self) -> Option<Tick> {
        self.first_tick
    }

    pub fn death_tick(&self) -> Option<Tick> {
        self.death_tick
    }

    /// Schedule removal at `tick`. Overrides any earlier schedule.
    pub fn die_at(&mut self, tick: Tick) {
        self.death_tick = Some(tick);
    }

    pub fn is_dying(&self) -> bool {
        self.death_tick.is_some()
    }

    /// True once the death tick has been reached.
    pub fn is_expired(&self, tick: Tick) -> bool {
        self.death_tick.is_some_and(|d| d <= tick)
    }

    pub fn lifecycle(&self, tick: Tick) -> Lifecycle {
        if self.is_expired(tick) {
            return Lifecycle::Removed;
        }
        if self.death_tick.is_some() {
            return Lifecycle::Dying;
        }
        match self.first_tick {
            Some(first) if tick.saturating_sub(first) + 1 <= SPAWN_WINDOW => Lifecycle::Spawning,
            None => Lifecycle::Spawning,
            _ => Lifecycle::Steady,
        }
    }

    /// Animation matrix for `tick`: identity, then spawn spin, spawn scale,
    /// death spin, death scale, each post-multiplied.
    ///
    /// The death scale is `(death_tick - tick) / DEATH_WINDOW` and is not
    /// clamped; ticking past the death tick yields a mirrored, negative scale.
    pub fn animate(&mut self, tick: Tick) -> Mat4 {
        let first = *self.first_tick.get_or_insert(tick);
        let age = tick.saturating_sub(first) + 1;
        let mut m = Mat4::IDENTITY;
        if self.flags.spin_on_spawn {
            let angle = if age > SPAWN_WINDOW {
                0.0
            } else {
                (age as f32 - SPAWN_WINDOW as f32) * PI / 5.0
            };
            m *= Mat4::from_rotation_y(angle);
        }
        if self.flags.scale_on_spawn {
            let s = if age > SPAWN_WINDOW {
                1.0
            } else {
                age as f32 / SPAWN_WINDOW as f32
            };
            m *= Mat4::from_scale(Vec3::splat(s));
        }
        if let Some(death) = self.death_tick {
            let remaining = death as f32 - tick as f32;
            if self.flags.spin_on_die {
                m *= Mat4::from_rotation_y(remaining * PI / 5.0);
            }
            if self.flags.scale_on_die {
                m *= Mat4::from_scale(Vec3::splat(remaining / DEATH_WINDOW as f32));
            }
        }
        m
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Mat4, b: Mat4) -> bool {
        a.abs_diff_eq(b, 1e-5)
    }

    #[test]
    fn no_flags_is_identity_every_tick() {
        let mut animator = Animator::new(AnimationFlags::NONE);
        for tick in 100..140 {
            assert_eq!(animator.animate(tick), Mat4::IDENTITY);
        }
        animator.die_at(150);
        for tick in 140..150 {
            assert_eq!(animator.animate(tick), Mat4::IDENTITY);
        }
    }

    #[test]
    fn spawn_scale_grows_to_full() {
        let mut animator = Animator::new(AnimationFlags::new(false, true, false, false));
        let first = animator.animate(50);
        assert!(approx(first, Mat4::from_scale(Vec3::splat(0.1))));
        let mid = animator.animate(54);
        assert!(approx(mid, Mat4::from_scale(Vec3::splat(0.5))));
        assert!(approx(animator.animate(59), Mat4::IDENTITY));
        assert!(approx(animator.animate(60), Mat4::IDENTITY));
    }

    #[test]
    fn spawn_spin_unwinds_to_zero() {
        let mut animator = Animator::new(AnimationFlags::new(true, false, false, false));
        let first = animator.animate(0);
        assert!(approx(first, Mat4::from_rotation_y(-9.0 * PI / 5.0)));
        assert!(approx(animator.animate(9), Mat4::IDENTITY));
        assert!(approx(animator.animate(25), Mat4::IDENTITY));
    }

    #[test]
    fn first_tick_zero_is_remembered() {
        let mut animator = Animator::new(AnimationFlags::new(false, true, false, false));
        animator.animate(0);
        assert_eq!(animator.first_tick(), Some(0));
        assert!(approx(animator.animate(1), Mat4::from_scale(Vec3::splat(0.2))));
    }

    #[test]
    fn death_scale_shrinks_over_window() {
        let mut animator = Animator::new(AnimationFlags::new(false, false, false, true));
        animator.animate(0);
        animator.die_at(20 + DEATH_DELAY);
        assert!(approx(animator.animate(21), Mat4::IDENTITY));
        assert!(approx(animator.animate(30), Mat4::from_scale(Vec3::splat(0.1))));
    }

    #[test]
    fn death_scale_is_not_clamped() {
        let mut animator = Animator::new(AnimationFlags::new(false, false, false, true));
        animator.die_at(10);
        let m = animator.animate(12);
        assert!(approx(m, Mat4::from_scale(Vec3::splat(-0.2))));
    }

    #[test]
    fn lifecycle_phases() {
        let mut animator = Animator::new(AnimationFlags::ALL);
        assert_eq!(animator.lifecycle(0), Lifecycle::Spawning);
        animator.animate(0);
        assert_eq!(animator.lifecycle(9), Lifecycle::Spawning);
        assert_eq!(animator.lifecycle(10), Lifecycle::Steady);
        animator.die_at(30);
        assert_eq!(animator.lifecycle(29), Lifecycle::Dying);
        assert_eq!(animator.lifecycle(30), Lifecycle::Removed);
        assert!(animator.is_expired(30));
        assert!(!animator.is_expired(29));
    }
}
