use crate::animation::DEATH_DELAY;
use crate::config::SceneConfig;
use crate::context::RenderContext;
use crate::error::SceneError;
use crate::font::{self, CELL_SPACING};
use crate::kind::{
    DuckState, FishState, FrogState, KindTag, SpriteKind, Steering, TickContext, position_randomly,
    translate,
};
use crate::rng::SceneRng;
use crate::sprite::{Sprite, SpriteVisual};
use glam::{Mat4, Vec3};
use std::collections::BTreeMap;
use std::f32::consts::PI;
use voxsprite_common::{SpriteId, Tick};
use voxsprite_input::{Action, Controls};

/// Title card shown until the player presses a control.
pub const TITLE_MESSAGE: &str = "FROG V DUCKS\n\nLEFT   A\nRIGHT  D\nDIVE   S";

/// HUD row in font cell units.
const HUD_ROW: f32 = 10.0;

/// Atlas visuals for each game kind, resolved once from a [`RenderContext`].
#[derive(Debug, Clone)]
pub struct KindVisuals {
    visuals: BTreeMap<KindTag, SpriteVisual>,
}

impl KindVisuals {
    pub fn from_context(ctx: &RenderContext) -> Result<Self, SceneError> {
        let mut visuals = BTreeMap::new();
        for tag in KindTag::ALL {
            if tag == KindTag::Editable {
                continue;
            }
            visuals.insert(tag, ctx.visual_for(tag)?);
        }
        Ok(Self { visuals })
    }

    fn get(&self, tag: KindTag) -> Result<SpriteVisual, SceneError> {
        self.visuals
            .get(&tag)
            .copied()
            .ok_or(SceneError::MissingAtlas(tag))
    }
}

/// The "Frog v Ducks" scene: an ordered set of sprites advanced one tick at
/// a time.
///
/// Each tick: spawn the frog on the first control press, respawn pickups
/// while it lives, remove expired sprites, tick the rest in order, then
/// resolve collisions. Given the same seed and control sequence, two scenes
/// evolve identically.
#[derive(Debug, Clone)]
pub struct Scene {
    config: SceneConfig,
    visuals: KindVisuals,
    rng: SceneRng,
    tick: Tick,
    sprites: Vec<Sprite>,
    frog: Option<SpriteId>,
    message: Vec<SpriteId>,
    hud: Vec<Sprite>,
    mask_controls: bool,
}

impl Scene {
    pub fn new(config: SceneConfig, ctx: &RenderContext) -> Result<Self, SceneError> {
        config.validate()?;
        let visuals = KindVisuals::from_context(ctx)?;
        let mut scene = Self {
            rng: SceneRng::new(config.seed),
            config,
            visuals,
            tick: 0,
            sprites: Vec::new(),
            frog: None,
            message: Vec::new(),
            hud: Vec::new(),
            mask_controls: false,
        };
        scene.add_initial_sprites()?;
        scene.display_hud(0, 0)?;
        tracing::info!(
            sprites = scene.sprites.len(),
            seed = scene.config.seed,
            "scene ready"
        );
        Ok(scene)
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn tick(&self) -> Tick {
        self.tick
    }

    pub fn sprites(&self) -> &[Sprite] {
        &self.sprites
    }

    pub fn sprite_mut(&mut self, id: SpriteId) -> Option<&mut Sprite> {
        self.sprites.iter_mut().find(|s| s.id() == id)
    }

    /// Append a sprite; it is ticked from the next step on.
    pub fn insert(&mut self, sprite: Sprite) -> SpriteId {
        let id = sprite.id();
        self.sprites.push(sprite);
        id
    }

    /// HUD glyphs. Drawn after the sprites and never ticked.
    pub fn hud(&self) -> &[Sprite] {
        &self.hud
    }

    pub fn frog(&self) -> Option<&Sprite> {
        let id = self.frog?;
        self.sprites.iter().find(|s| s.id() == id)
    }

    pub fn frog_state(&self) -> Option<FrogState> {
        match self.frog()?.kind() {
            SpriteKind::Frog(state) => Some(*state),
            _ => None,
        }
    }

    /// Camera `(eye, target)`: looks at the frog (or where it will spawn)
    /// from above the water.
    pub fn camera_rig(&self) -> (Vec3, Vec3) {
        let target = self
            .frog()
            .map(Sprite::position)
            .unwrap_or_else(|| self.spawn_point());
        let eye = Vec3::new(0.0, target.y - self.config.water_depth, 0.0);
        (eye, target)
    }

    fn spawn_point(&self) -> Vec3 {
        let (cx, cz) = self.config.area_center();
        Vec3::new(cx, self.config.water_depth + 2.0, cz)
    }

    /// Advance one tick driven by an input action. Anything but
    /// [`Action::Steer`] ticks with no controls held.
    pub fn apply(&mut self, action: Action) -> Result<(), SceneError> {
        let controls = match action {
            Action::Steer(controls) => controls,
            _ => Controls::default(),
        };
        self.step(controls)
    }

    /// Advance one tick with the controls held during it.
    pub fn step(&mut self, controls: Controls) -> Result<(), SceneError> {
        self.tick += 1;
        let tick = self.tick;
        let any = controls.any();
        if !any {
            self.mask_controls = false;
        }

        if self.frog.is_none() && any && !self.mask_controls {
            let frog = self.spawn(KindTag::Frog)?;
            self.frog = Some(frog.id());
            self.clear_message();
            self.sprites.push(frog);
            tracing::info!(tick, "frog spawned");
        }

        if let Some(frog_id) = self.frog {
            let chance = self.config.spawn_chance;
            for tag in [KindTag::Duck, KindTag::Treasure, KindTag::Plant, KindTag::Fish] {
                if self.rng.chance(chance) {
                    let sprite = self.spawn(tag)?;
                    tracing::debug!(tick, kind = tag.name(), "respawn");
                    self.sprites.push(sprite);
                }
            }
            let config = &self.config;
            if let Some(frog) = self.sprites.iter_mut().find(|s| s.id() == frog_id) {
                frog.steer(controls, config);
            }
            if let Some(state) = self.frog_state() {
                self.display_hud(state.score, state.oxygen)?;
            }
        }

        self.advance(tick, any)?;
        self.resolve_collisions(tick);
        self.place_hud();
        Ok(())
    }

    /// Remove expired sprites and tick the rest, in order. Sprites added
    /// during the pass are ticked in the same pass.
    fn advance(&mut self, tick: Tick, any: bool) -> Result<(), SceneError> {
        let frog_position = self.frog().map(Sprite::position);
        let mut i = 0;
        while i < self.sprites.len() {
            if self.sprites[i].is_expired(tick) {
                let removed = self.sprites.remove(i);
                if Some(removed.id()) == self.frog {
                    let score = match removed.kind() {
                        SpriteKind::Frog(state) => state.score,
                        _ => 0,
                    };
                    tracing::info!(tick, score, "frog removed, resetting");
                    self.frog = None;
                    for sprite in &mut self.sprites {
                        sprite.die_at(tick + DEATH_DELAY);
                    }
                    self.add_initial_sprites()?;
                    self.mask_controls = any;
                }
                continue;
            }
            let mut ctx = TickContext {
                tick,
                config: &self.config,
                rng: &mut self.rng,
                frog: frog_position,
            };
            self.sprites[i].tick(&mut ctx);
            i += 1;
        }
        Ok(())
    }

    /// Every pair closer than the collision radius reacts, first sprite
    /// first.
    fn resolve_collisions(&mut self, tick: Tick) {
        let radius = self.config.collision_radius;
        let max_oxygen = self.config.max_oxygen;
        for i in 0..self.sprites.len() {
            for j in (i + 1)..self.sprites.len() {
                let (head, tail) = self.sprites.split_at_mut(j);
                let (a, b) = (&mut head[i], &mut tail[0]);
                if a.position().distance(b.position()) >= radius {
                    continue;
                }
                a.collide(b, tick, max_oxygen);
                b.collide(a, tick, max_oxygen);
            }
        }
    }

    fn add_initial_sprites(&mut self) -> Result<(), SceneError> {
        for (tag, count) in [
            (KindTag::Duck, 10),
            (KindTag::Treasure, 5),
            (KindTag::Plant, 5),
            (KindTag::Fish, 10),
        ] {
            for _ in 0..count {
                let sprite = self.spawn(tag)?;
                self.sprites.push(sprite);
            }
        }
        self.display_message(TITLE_MESSAGE)
    }

    /// Build a sprite of `tag` at its kind's spawn position. Only the five
    /// game kinds can be spawned; glyphs come from [`Self::glyph`].
    pub fn spawn(&mut self, tag: KindTag) -> Result<Sprite, SceneError> {
        if matches!(tag, KindTag::Font | KindTag::Editable) {
            return Err(SceneError::NotSpawnable(tag));
        }
        let visual = self.visuals.get(tag)?;
        let frog = self.frog().map(Sprite::position);
        let spawn_point = self.spawn_point();
        let SceneConfig {
            play_area: area,
            water_depth: water,
            sand_depth: sand,
            max_oxygen,
            ..
        } = self.config;
        let rng = &mut self.rng;
        let mut placement = Mat4::IDENTITY;
        let kind = match tag {
            KindTag::Duck => {
                position_randomly(&mut placement, area, water + 10.0, (0.0, 2.0 * PI), rng);
                let phase = rng.range(0.0, 2.0 * PI);
                let steering = Steering::select(&placement, area, frog, rng);
                SpriteKind::Duck(DuckState {
                    phase,
                    y_velocity: 0.0,
                    steering,
                })
            }
            KindTag::Treasure => {
                position_randomly(&mut placement, area, sand + 0.5, (-PI / 4.0, PI / 4.0), rng);
                SpriteKind::Treasure
            }
            KindTag::Plant => {
                position_randomly(&mut placement, area, sand + 0.5, (0.0, 2.0 * PI), rng);
                SpriteKind::Plant
            }
            KindTag::Fish => {
                let y = rng.next_f32() * (water - sand - 2.0) + sand + 0.5;
                position_randomly(&mut placement, area, y, (0.0, 2.0 * PI), rng);
                let phase = rng.range(0.0, 2.0 * PI);
                let steering = Steering::select(&placement, area, None, rng);
                SpriteKind::Fish(FishState { phase, steering })
            }
            _ => {
                translate(&mut placement, spawn_point);
                SpriteKind::Frog(FrogState {
                    phase: rng.range(0.0, 2.0 * PI),
                    y_velocity: 0.0,
                    oxygen: max_oxygen,
                    score: 0,
                })
            }
        };
        Ok(Sprite::new(kind, visual).with_placement(placement))
    }

    /// A font sprite for `character` in text cell `cell`.
    pub fn glyph(&self, character: char, cell: [f32; 2]) -> Result<Sprite, SceneError> {
        let visual = self
            .visuals
            .get(KindTag::Font)?
            .with_region(font::glyph_region(character));
        let placement = Mat4::from_translation(Vec3::new(
            cell[0] * CELL_SPACING - 15.0,
            cell[1] * -CELL_SPACING - 23.0,
            -50.0,
        ));
        Ok(Sprite::new(SpriteKind::Font { character, cell }, visual).with_placement(placement))
    }

    /// Show a centred multi-line message as glyph sprites.
    pub fn display_message(&mut self, message: &str) -> Result<(), SceneError> {
        for (c, cell) in font::layout_message(message) {
            let sprite = self.glyph(c, cell)?;
            self.message.push(sprite.id());
            self.sprites.push(sprite);
        }
        Ok(())
    }

    /// Start the death animation of every message glyph.
    pub fn clear_message(&mut self) {
        let tick = self.tick;
        for id in std::mem::take(&mut self.message) {
            if let Some(sprite) = self.sprite_mut(id) {
                sprite.die_at(tick + DEATH_DELAY);
            }
        }
    }

    fn display_hud(&mut self, score: u32, oxygen: u32) -> Result<(), SceneError> {
        let line = font::hud_line(score, oxygen);
        let mut hud = Vec::new();
        for (col, c) in line.chars().enumerate() {
            if c != ' ' {
                hud.push(self.glyph(c, [col as f32, HUD_ROW])?);
            }
        }
        self.hud = hud;
        Ok(())
    }

    /// Offset the HUD by how far the frog has moved from its spawn point so
    /// it stays in view.
    fn place_hud(&mut self) {
        let offset = self
            .frog()
            .map(|f| f.position() - self.spawn_point())
            .unwrap_or(Vec3::ZERO);
        for sprite in &mut self.hud {
            sprite.set_animation(Mat4::from_translation(offset));
        }
    }

    pub fn summary(&self) -> SceneSummary {
        let mut kinds = BTreeMap::new();
        for sprite in &self.sprites {
            *kinds.entry(sprite.tag()).or_insert(0) += 1;
        }
        SceneSummary {
            tick: self.tick,
            sprites: self.sprites.len(),
            dying: self.sprites.iter().filter(|s| s.is_dying()).count(),
            kinds,
            frog: self.frog_state().map(|f| (f.score, f.oxygen)),
        }
    }
}

/// Snapshot of scene state for display.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneSummary {
    pub tick: Tick,
    pub sprites: usize,
    pub dying: usize,
    pub kinds: BTreeMap<KindTag, usize>,
    /// `(score, oxygen)` while a frog is alive.
    pub frog: Option<(u32, u32)>,
}

impl std::fmt::Display for SceneSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Scene: tick={} sprites={} dying={}",
            self.tick, self.sprites, self.dying
        )?;
        for (tag, count) in &self.kinds {
            write!(f, " {}={}", tag.name(), count)?;
        }
        match self.frog {
            Some((score, oxygen)) => write!(f, " frog(score={score} oxygen={oxygen})"),
            None => write!(f, " frog=none"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TITLE_GLYPHS: usize = 26;

    fn scene() -> Scene {
        let ctx = RenderContext::placeholder().unwrap();
        Scene::new(SceneConfig::default(), &ctx).unwrap()
    }

    fn press() -> Controls {
        Controls {
            left: true,
            ..Controls::default()
        }
    }

    #[test]
    fn starts_with_initial_sprites_and_title() {
        let scene = scene();
        let summary = scene.summary();
        assert_eq!(summary.kinds[&KindTag::Duck], 10);
        assert_eq!(summary.kinds[&KindTag::Treasure], 5);
        assert_eq!(summary.kinds[&KindTag::Plant], 5);
        assert_eq!(summary.kinds[&KindTag::Fish], 10);
        assert_eq!(summary.kinds[&KindTag::Font], TITLE_GLYPHS);
        assert!(summary.frog.is_none());
        assert!(!scene.hud().is_empty());
    }

    #[test]
    fn glyphs_are_not_spawnable() {
        let mut scene = scene();
        assert!(matches!(
            scene.spawn(KindTag::Font),
            Err(SceneError::NotSpawnable(KindTag::Font))
        ));
    }

    #[test]
    fn missing_atlas_is_an_error() {
        let ctx = RenderContext::new();
        assert!(matches!(
            Scene::new(SceneConfig::default(), &ctx),
            Err(SceneError::MissingAtlas(_))
        ));
    }

    #[test]
    fn death_scheduled_sprite_is_removed_on_its_death_tick() {
        let mut scene = scene();
        let id = scene.sprites()[0].id();
        let t0 = scene.tick();
        scene.sprite_mut(id).unwrap().die_at(t0 + DEATH_DELAY);
        for _ in 0..10 {
            scene.step(Controls::default()).unwrap();
        }
        assert_eq!(scene.tick(), t0 + 10);
        assert!(scene.sprites().iter().any(|s| s.id() == id));
        scene.step(Controls::default()).unwrap();
        assert!(scene.sprites().iter().all(|s| s.id() != id));
    }

    #[test]
    fn control_press_spawns_frog_and_clears_title() {
        let mut scene = scene();
        scene.step(Controls::default()).unwrap();
        assert!(scene.frog().is_none());
        scene.step(press()).unwrap();
        let state = scene.frog_state().unwrap();
        assert_eq!(state.score, 0);
        assert!(state.oxygen > 0);
        let dying_glyphs = scene
            .sprites()
            .iter()
            .filter(|s| s.tag() == KindTag::Font && s.is_dying())
            .count();
        assert_eq!(dying_glyphs, TITLE_GLYPHS);
        for _ in 0..DEATH_DELAY {
            scene.step(Controls::default()).unwrap();
        }
        assert!(scene.sprites().iter().all(|s| s.tag() != KindTag::Font));
    }

    #[test]
    fn steer_action_drives_the_frog() {
        let mut scene = scene();
        scene.apply(Action::Noop).unwrap();
        assert!(scene.frog().is_none());
        scene.apply(Action::Steer(press())).unwrap();
        assert!(scene.frog().is_some());
        assert_eq!(scene.tick(), 2);
        // Non-steering actions still advance time.
        scene.apply(Action::Undo).unwrap();
        assert_eq!(scene.tick(), 3);
    }

    #[test]
    fn hud_shows_score_and_oxygen() {
        let mut scene = scene();
        scene.step(press()).unwrap();
        let glyphs: String = scene
            .hud()
            .iter()
            .filter_map(|s| match s.kind() {
                SpriteKind::Font { character, .. } => Some(*character),
                _ => None,
            })
            .collect();
        assert!(glyphs.starts_with("SCORE0"));
        assert!(glyphs.ends_with("O2"));
    }

    #[test]
    fn frog_death_resets_and_masks_held_controls() {
        let mut scene = scene();
        scene.step(press()).unwrap();
        let frog = scene.frog().unwrap().id();
        let tick = scene.tick();
        scene.sprite_mut(frog).unwrap().die_at(tick + 2);
        scene.step(press()).unwrap();
        scene.step(press()).unwrap();
        assert!(scene.frog().is_none());
        // Old sprites are dying and a fresh set plus the title exist.
        let summary = scene.summary();
        assert!(summary.dying >= 30);
        assert!(summary.kinds[&KindTag::Duck] >= 20);

        scene.step(press()).unwrap();
        assert!(scene.frog().is_none(), "held controls must not respawn");
        scene.step(Controls::default()).unwrap();
        scene.step(press()).unwrap();
        assert!(scene.frog().is_some());
    }

    #[test]
    fn frog_eats_plant_in_reach() {
        let mut scene = scene();
        scene.step(press()).unwrap();
        let pos = scene.frog().unwrap().position();
        let mut plant = scene.spawn(KindTag::Plant).unwrap();
        plant.set_placement(Mat4::from_translation(pos));
        let plant_id = scene.insert(plant);
        scene.step(Controls::default()).unwrap();
        assert!(scene.sprite_mut(plant_id).unwrap().is_dying());
    }

    #[test]
    fn frog_collects_treasure_and_scores() {
        let mut scene = scene();
        scene.step(press()).unwrap();
        let pos = scene.frog().unwrap().position();
        let mut treasure = scene.spawn(KindTag::Treasure).unwrap();
        treasure.set_placement(Mat4::from_translation(pos));
        scene.insert(treasure);
        scene.step(Controls::default()).unwrap();
        assert_eq!(scene.frog_state().unwrap().score, 1);
    }

    #[test]
    fn same_seed_same_evolution() {
        let mut a = scene();
        let mut b = scene();
        let inputs = [press(), Controls::default(), press()];
        for i in 0..60 {
            let c = inputs[i % inputs.len()];
            a.step(c).unwrap();
            b.step(c).unwrap();
        }
        let pa: Vec<Vec3> = a.sprites().iter().map(Sprite::position).collect();
        let pb: Vec<Vec3> = b.sprites().iter().map(Sprite::position).collect();
        assert_eq!(pa, pb);
        assert_eq!(a.summary(), b.summary());
    }

    #[test]
    fn camera_follows_frog() {
        let mut scene = scene();
        let (eye, target) = scene.camera_rig();
        assert_eq!(target, Vec3::new(0.0, -38.0, -60.0));
        assert_eq!(eye, Vec3::new(0.0, 2.0, 0.0));
        scene.step(press()).unwrap();
        let (_, target) = scene.camera_rig();
        assert_eq!(target, scene.frog().unwrap().position());
    }

    #[test]
    fn summary_display() {
        let text = scene().summary().to_string();
        assert!(text.starts_with("Scene: tick=0"));
        assert!(text.contains("duck=10"));
        assert!(text.ends_with("frog=none"));
    }
}
