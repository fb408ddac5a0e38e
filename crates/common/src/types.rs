use glam::UVec3;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Discrete simulation step counter.
pub type Tick = u64;

/// Unique identifier for a sprite instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpriteId(pub Uuid);

impl SpriteId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First eight hex digits, for log lines and HUD labels.
    pub fn short(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for SpriteId {
    fn default() -> Self {
        Self::new()
    }
}

/// One voxel / texel color. Alpha 0 means empty space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);
    pub const WHITE: Self = Self::new(255, 255, 255, 255);
    pub const MAGENTA: Self = Self::new(255, 0, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Opaque greyscale shorthand: the red channel is reused for green and blue.
    pub const fn grey(v: u8) -> Self {
        Self::new(v, v, v, 255)
    }

    pub const fn is_solid(&self) -> bool {
        self.a > 0
    }

    pub const fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub const fn from_array(c: [u8; 4]) -> Self {
        Self::new(c[0], c[1], c[2], c[3])
    }
}

/// Total number of cells in a grid of the given size.
pub fn grid_cell_count(size: UVec3) -> usize {
    size.x as usize * size.y as usize * size.z as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sprite_id_uniqueness() {
        let a = SpriteId::new();
        let b = SpriteId::new();
        assert_ne!(a, b);
        assert_eq!(a.short().len(), 8);
    }

    #[test]
    fn color_shorthands() {
        assert_eq!(Rgba::grey(7), Rgba::new(7, 7, 7, 255));
        assert_eq!(Rgba::rgb(1, 2, 3).a, 255);
        assert!(!Rgba::TRANSPARENT.is_solid());
        assert!(Rgba::new(0, 0, 0, 1).is_solid());
    }

    #[test]
    fn color_array_conversion() {
        let c = Rgba::new(10, 20, 30, 40);
        assert_eq!(Rgba::from_array(c.to_array()), c);
    }

    #[test]
    fn color_serde_roundtrip() {
        let c = Rgba::MAGENTA;
        let json = serde_json::to_string(&c).unwrap();
        let back: Rgba = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn cell_count() {
        assert_eq!(grid_cell_count(UVec3::splat(8)), 512);
        assert_eq!(grid_cell_count(UVec3::new(16, 16, 1)), 256);
    }
}
