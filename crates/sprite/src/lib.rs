//! Sprite state: stable placement, per-tick animation, tagged variants, and
//! the tick-driven scene that owns them.
//!
//! # Invariants
//! - The animation matrix is rebuilt from identity every tick.
//! - A sprite whose death tick has been reached is removed before it is
//!   ticked again.
//! - All scene randomness comes from one seeded generator.

pub mod animation;
pub mod config;
pub mod context;
pub mod error;
pub mod font;
pub mod kind;
pub mod rng;
pub mod scene;
pub mod sprite;

pub use animation::{
    AnimationFlags, Animator, DEATH_DELAY, DEATH_WINDOW, Lifecycle, SPAWN_WINDOW,
};
pub use config::{ConfigError, SceneConfig};
pub use context::RenderContext;
pub use error::SceneError;
pub use kind::{KindTag, SpriteKind, SteerTarget, Steering, TickContext};
pub use rng::SceneRng;
pub use scene::{Scene, SceneSummary, TITLE_MESSAGE};
pub use sprite::{CollisionOutcome, Sprite, SpriteVisual};
