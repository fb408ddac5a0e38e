use serde::{Deserialize, Serialize};
use std::path::Path;

/// Errors loading scene tuning.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid play area {0:?}: min must be below max")]
    InvalidPlayArea([f32; 4]),
}

/// Tuning for the "Frog v Ducks" scene. Every field has a default, so a
/// partial JSON file only overrides what it names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// `[min_x, min_z, max_x, max_z]` of the swimmable area.
    pub play_area: [f32; 4],
    pub water_depth: f32,
    pub sand_depth: f32,
    /// Sprites closer than this collide.
    pub collision_radius: f32,
    /// Per-tick chance of each respawn kind while the frog is alive.
    pub spawn_chance: f32,
    pub ticks_per_second: f32,
    pub max_oxygen: u32,
    pub seed: u64,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            play_area: [-50.0, -100.0, 50.0, -20.0],
            water_depth: -40.0,
            sand_depth: -50.0,
            collision_radius: 2.0,
            spawn_chance: 0.005,
            ticks_per_second: 30.0,
            max_oxygen: 1000,
            seed: 0x5eed,
        }
    }
}

impl SceneConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&text)?;
        tracing::debug!(path = %path.display(), "loaded scene config");
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let [x0, z0, x1, z1] = self.play_area;
        if x0 >= x1 || z0 >= z1 {
            return Err(ConfigError::InvalidPlayArea(self.play_area));
        }
        Ok(())
    }

    pub fn area_center(&self) -> (f32, f32) {
        let [x0, z0, x1, z1] = self.play_area;
        ((x0 + x1) / 2.0, (z0 + z1) / 2.0)
    }

    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f32(1.0 / self.ticks_per_second.max(1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_scene_constants() {
        let config = SceneConfig::default();
        assert_eq!(config.play_area, [-50.0, -100.0, 50.0, -20.0]);
        assert_eq!(config.water_depth, -40.0);
        assert_eq!(config.sand_depth, -50.0);
        assert_eq!(config.area_center(), (0.0, -60.0));
    }

    #[test]
    fn json_roundtrip() {
        let config = SceneConfig {
            seed: 99,
            ..SceneConfig::default()
        };
        let json = config.to_json().unwrap();
        assert_eq!(SceneConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = SceneConfig::from_json_str(r#"{ "seed": 3 }"#).unwrap();
        assert_eq!(config.seed, 3);
        assert_eq!(config.collision_radius, 2.0);
    }

    #[test]
    fn inverted_area_rejected() {
        let err = SceneConfig::from_json_str(r#"{ "play_area": [10, 0, -10, 5] }"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPlayArea(_)));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.json");
        std::fs::write(&path, r#"{ "water_depth": -30 }"#).unwrap();
        let config = SceneConfig::load(&path).unwrap();
        assert_eq!(config.water_depth, -30.0);
    }
}
