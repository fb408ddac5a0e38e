use crate::animation::{Animator, DEATH_DELAY, Lifecycle};
use crate::config::SceneConfig;
use crate::kind::{KindTag, SpriteKind, TickContext};
use glam::{Mat4, UVec3, Vec3};
use voxsprite_atlas::{AtlasId, SubRegion};
use voxsprite_common::{SpriteId, Tick};
use voxsprite_input::Controls;

/// What a sprite draws: which atlas, which part of it, and its grid size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteVisual {
    pub atlas: AtlasId,
    pub size: UVec3,
    pub region: SubRegion,
}

impl SpriteVisual {
    pub fn new(atlas: AtlasId, size: UVec3) -> Self {
        Self {
            atlas,
            size,
            region: SubRegion::FULL,
        }
    }

    pub fn with_region(mut self, region: SubRegion) -> Self {
        self.region = region;
        self
    }
}

/// Result of one sprite reacting to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionOutcome {
    /// The frog landed on a duck.
    Stomped,
    /// The frog was caught by a duck.
    Caught,
    Collected,
    Breathed,
}

/// A voxel sprite: stable placement, per-tick animation and a variant.
///
/// The renderer draws the unit cube `[-0.5, 0.5]³` through
/// `placement * animation * scale(extent)`.
#[derive(Debug, Clone)]
pub struct Sprite {
    id: SpriteId,
    placement: Mat4,
    animation: Mat4,
    animator: Animator,
    visual: SpriteVisual,
    extent: f32,
    kind: SpriteKind,
}

impl Sprite {
    /// New sprite at the origin. Extent is one world unit per 8 voxels.
    pub fn new(kind: SpriteKind, visual: SpriteVisual) -> Self {
        let flags = kind.tag().animation_flags();
        Self {
            id: SpriteId::new(),
            placement: Mat4::IDENTITY,
            animation: Mat4::IDENTITY,
            animator: Animator::new(flags),
            extent: visual.size.max_element() as f32 / 8.0,
            visual,
            kind,
        }
    }

    pub fn with_extent(mut self, extent: f32) -> Self {
        self.extent = extent;
        self
    }

    pub fn with_placement(mut self, placement: Mat4) -> Self {
        self.placement = placement;
        self
    }

    pub fn id(&self) -> SpriteId {
        self.id
    }

    pub fn kind(&self) -> &SpriteKind {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut SpriteKind {
        &mut self.kind
    }

    pub fn tag(&self) -> KindTag {
        self.kind.tag()
    }

    pub fn visual(&self) -> &SpriteVisual {
        &self.visual
    }

    pub fn extent(&self) -> f32 {
        self.extent
    }

    pub fn placement(&self) -> Mat4 {
        self.placement
    }

    pub fn placement_mut(&mut self) -> &mut Mat4 {
        &mut self.placement
    }

    pub fn set_placement(&mut self, placement: Mat4) {
        self.placement = placement;
    }

    pub fn animation(&self) -> Mat4 {
        self.animation
    }

    /// Overrides the animation until the next tick. Used for sprites that are
    /// never ticked (HUD glyphs).
    pub fn set_animation(&mut self, animation: Mat4) {
        self.animation = animation;
    }

    /// `placement * animation * scale(extent)`.
    pub fn model_matrix(&self) -> Mat4 {
        self.placement * self.animation * Mat4::from_scale(Vec3::splat(self.extent))
    }

    pub fn position(&self) -> Vec3 {
        self.placement.w_axis.truncate()
    }

    pub fn first_tick(&self) -> Option<Tick> {
        self.animator.first_tick()
    }

    pub fn death_tick(&self) -> Option<Tick> {
        self.animator.death_tick()
    }

    pub fn die_at(&mut self, tick: Tick) {
        self.animator.die_at(tick);
    }

    /// Start the death animation now; the sprite is removed `DEATH_DELAY`
    /// ticks later.
    pub fn kill(&mut self, tick: Tick) {
        self.animator.die_at(tick + DEATH_DELAY);
    }

    pub fn is_dying(&self) -> bool {
        self.animator.is_dying()
    }

    pub fn is_expired(&self, tick: Tick) -> bool {
        self.animator.is_expired(tick)
    }

    pub fn lifecycle(&self, tick: Tick) -> Lifecycle {
        self.animator.lifecycle(tick)
    }

    /// Rebuild the animation from identity and run the variant's behavior.
    pub fn tick(&mut self, ctx: &mut TickContext<'_>) {
        self.animation = self.animator.animate(ctx.tick);
        self.kind
            .tick(&mut self.placement, &mut self.animation, ctx);
    }

    /// Apply held controls. Only the frog responds.
    pub fn steer(&mut self, controls: Controls, config: &SceneConfig) {
        if let SpriteKind::Frog(state) = &mut self.kind {
            state.steer(&mut self.placement, controls, config);
        }
    }

    /// React to touching `other`. Only the frog reacts; nothing happens
    /// while either sprite is already dying.
    pub fn collide(&mut self, other: &mut Sprite, tick: Tick, max_oxygen: u32) -> Option<CollisionOutcome> {
        if self.is_dying() || other.is_dying() {
            return None;
        }
        let this_y = self.placement.w_axis.y;
        let other_y = other.placement.w_axis.y;
        let SpriteKind::Frog(frog) = &mut self.kind else {
            return None;
        };
        let outcome = match other.kind {
            SpriteKind::Duck(_) if this_y > other_y + 0.8 => {
                other.kill(tick);
                frog.score += 1;
                CollisionOutcome::Stomped
            }
            SpriteKind::Duck(_) => {
                self.animator.die_at(tick + DEATH_DELAY);
                CollisionOutcome::Caught
            }
            SpriteKind::Treasure => {
                other.kill(tick);
                frog.score += 1;
                CollisionOutcome::Collected
            }
            SpriteKind::Plant => {
                other.kill(tick);
                frog.oxygen = (frog.oxygen + 500).min(max_oxygen);
                CollisionOutcome::Breathed
            }
            _ => return None,
        };
        tracing::debug!(frog = %self.id.short(), other = other.tag().name(), ?outcome, tick, "collision");
        Some(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::FrogState;
    use crate::rng::SceneRng;

    fn visual() -> SpriteVisual {
        SpriteVisual::new(AtlasId(0), UVec3::splat(8))
    }

    fn frog() -> Sprite {
        Sprite::new(
            SpriteKind::Frog(FrogState {
                phase: 0.0,
                y_velocity: 0.0,
                oxygen: 600,
                score: 0,
            }),
            visual(),
        )
    }

    fn frog_state(sprite: &Sprite) -> FrogState {
        match sprite.kind() {
            SpriteKind::Frog(f) => *f,
            other => panic!("not a frog: {other:?}"),
        }
    }

    #[test]
    fn extent_follows_grid_size() {
        assert_eq!(Sprite::new(SpriteKind::Plant, visual()).extent(), 1.0);
        let duck_visual = SpriteVisual::new(AtlasId(0), UVec3::splat(16));
        assert_eq!(Sprite::new(SpriteKind::Treasure, duck_visual).extent(), 2.0);
    }

    #[test]
    fn model_is_placement_animation_extent() {
        let mut sprite = Sprite::new(SpriteKind::Editable, visual())
            .with_placement(Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)))
            .with_extent(2.0);
        sprite.set_animation(Mat4::from_rotation_y(0.5));
        let expected = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0))
            * Mat4::from_rotation_y(0.5)
            * Mat4::from_scale(Vec3::splat(2.0));
        assert!(sprite.model_matrix().abs_diff_eq(expected, 1e-6));
    }

    #[test]
    fn editable_animation_stays_identity() {
        let config = SceneConfig::default();
        let mut rng = SceneRng::new(0);
        let mut sprite = Sprite::new(SpriteKind::Editable, visual());
        for tick in 0..30 {
            let mut ctx = TickContext {
                tick,
                config: &config,
                rng: &mut rng,
                frog: None,
            };
            sprite.tick(&mut ctx);
            assert_eq!(sprite.animation(), Mat4::IDENTITY);
        }
    }

    #[test]
    fn kill_schedules_removal_after_window() {
        let mut sprite = Sprite::new(SpriteKind::Plant, visual());
        sprite.kill(100);
        assert_eq!(sprite.death_tick(), Some(111));
        assert!(!sprite.is_expired(110));
        assert!(sprite.is_expired(111));
    }

    #[test]
    fn frog_collects_treasure() {
        let mut f = frog().with_placement(Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0)));
        let mut treasure = Sprite::new(SpriteKind::Treasure, visual());
        assert_eq!(f.collide(&mut treasure, 5, 1000), Some(CollisionOutcome::Collected));
        assert_eq!(frog_state(&f).score, 1);
        assert_eq!(treasure.death_tick(), Some(16));
    }

    #[test]
    fn frog_vs_duck_depends_on_height() {
        use crate::kind::{DuckState, SteerTarget, Steering};
        let duck_kind = SpriteKind::Duck(DuckState {
            phase: 0.0,
            y_velocity: 0.0,
            steering: Steering {
                target: SteerTarget::Point(Vec3::ZERO),
            },
        });
        let mut high = frog().with_placement(Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0)));
        let mut duck = Sprite::new(duck_kind.clone(), visual());
        assert_eq!(high.collide(&mut duck, 0, 1000), Some(CollisionOutcome::Stomped));
        assert!(duck.is_dying());
        assert!(!high.is_dying());

        let mut low = frog().with_placement(Mat4::from_translation(Vec3::new(0.0, 0.5, 0.0)));
        let mut duck = Sprite::new(duck_kind, visual());
        assert_eq!(low.collide(&mut duck, 0, 1000), Some(CollisionOutcome::Caught));
        assert!(low.is_dying());
        assert!(!duck.is_dying());
    }

    #[test]
    fn plant_refills_oxygen_up_to_cap() {
        let mut f = frog();
        let mut plant = Sprite::new(SpriteKind::Plant, visual());
        assert_eq!(f.collide(&mut plant, 0, 1000), Some(CollisionOutcome::Breathed));
        assert_eq!(frog_state(&f).oxygen, 1000);
    }

    #[test]
    fn dying_sprites_do_not_collide() {
        let mut f = frog();
        let mut plant = Sprite::new(SpriteKind::Plant, visual());
        plant.kill(0);
        assert_eq!(f.collide(&mut plant, 1, 1000), None);
        assert_eq!(frog_state(&f).oxygen, 600);
    }

    #[test]
    fn non_frogs_ignore_collisions() {
        let mut plant = Sprite::new(SpriteKind::Plant, visual());
        let mut f = frog();
        assert_eq!(plant.collide(&mut f, 0, 1000), None);
    }
}
