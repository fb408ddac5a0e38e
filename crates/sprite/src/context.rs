use crate::error::SceneError;
use crate::font::GLYPH_COUNT;
use crate::kind::KindTag;
use crate::sprite::SpriteVisual;
use glam::{UVec3, Vec3};
use std::collections::BTreeMap;
use std::path::Path;
use voxsprite_atlas::{AtlasId, AtlasLayout, AtlasRegistry, VoxelAtlas};
use voxsprite_common::Rgba;

/// Atlases shared by every sprite of a kind, owned by whoever drives the
/// scene and handed to sprite factories.
#[derive(Debug, Default)]
pub struct RenderContext {
    pub registry: AtlasRegistry,
    kinds: BTreeMap<KindTag, AtlasId>,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atlas layout used for `tag`'s shipped atlas.
    pub fn layout_for(tag: KindTag) -> Result<AtlasLayout, SceneError> {
        let size = UVec3::splat(tag.grid_edge());
        Ok(match tag {
            KindTag::Font => AtlasLayout::stacked(size, GLYPH_COUNT)?,
            _ => AtlasLayout::new(size)?,
        })
    }

    pub fn register(&mut self, tag: KindTag, atlas: VoxelAtlas) -> AtlasId {
        let id = self.registry.insert(atlas);
        self.kinds.insert(tag, id);
        id
    }

    pub fn atlas_for(&self, tag: KindTag) -> Option<AtlasId> {
        self.kinds.get(&tag).copied()
    }

    /// Visual for a whole-atlas sprite of `tag`.
    pub fn visual_for(&self, tag: KindTag) -> Result<SpriteVisual, SceneError> {
        let atlas = self.atlas_for(tag).ok_or(SceneError::MissingAtlas(tag))?;
        Ok(SpriteVisual::new(atlas, UVec3::splat(tag.grid_edge())))
    }

    /// Load every game atlas (`duck.voxelmap.png`, ...) from `dir`.
    pub fn load_dir(dir: &Path) -> Result<Self, SceneError> {
        let mut ctx = Self::new();
        for tag in KindTag::ALL {
            if tag == KindTag::Editable {
                continue;
            }
            let layout = Self::layout_for(tag)?;
            let atlas = VoxelAtlas::load(dir.join(tag.atlas_file()), layout)?;
            ctx.register(tag, atlas);
        }
        tracing::info!(dir = %dir.display(), atlases = ctx.registry.len(), "loaded sprite atlases");
        Ok(ctx)
    }

    /// Procedural stand-in atlases for every game kind, for running without
    /// asset files.
    pub fn placeholder() -> Result<Self, SceneError> {
        let mut ctx = Self::new();
        for tag in KindTag::ALL {
            let atlas = match tag {
                KindTag::Editable => continue,
                KindTag::Font => placeholder_font()?,
                _ => placeholder_blob(tag)?,
            };
            ctx.register(tag, atlas);
        }
        Ok(ctx)
    }
}

/// Solid ellipsoid in the kind's color.
fn placeholder_blob(tag: KindTag) -> Result<VoxelAtlas, SceneError> {
    let layout = RenderContext::layout_for(tag)?;
    let (color, radii) = match tag {
        KindTag::Duck => (Rgba::rgb(240, 220, 40), Vec3::new(0.35, 0.3, 0.45)),
        KindTag::Treasure => (Rgba::rgb(200, 160, 30), Vec3::new(0.45, 0.3, 0.35)),
        KindTag::Plant => (Rgba::rgb(40, 170, 60), Vec3::new(0.2, 0.5, 0.2)),
        KindTag::Fish => (Rgba::rgb(240, 120, 30), Vec3::new(0.2, 0.3, 0.45)),
        _ => (Rgba::rgb(60, 200, 80), Vec3::new(0.4, 0.3, 0.4)),
    };
    let mut atlas = VoxelAtlas::empty(layout);
    let size = layout.size;
    for z in 0..size.z {
        for y in 0..size.y {
            for x in 0..size.x {
                let p = (Vec3::new(x as f32, y as f32, z as f32) + 0.5) / size.as_vec3() - 0.5;
                if (p / radii).length_squared() <= 1.0 {
                    atlas.set_voxel(x, y, z, color)?;
                }
            }
        }
    }
    Ok(atlas)
}

/// 3x5 glyph bitmaps for `A`-`Z` then `0`-`9`, rows top to bottom.
const GLYPH_ROWS: [&str; 36] = [
    "010101111101101", "110101110101110", "011100100100011", "110101101101110",
    "111100110100111", "111100110100100", "011100101101011", "101101111101101",
    "111010010010111", "001001001101010", "101101110101101", "100100100100111",
    "101111111101101", "110101101101101", "010101101101010", "110101110100100",
    "010101101110011", "110101110101101", "011100010001110", "111010010010010",
    "101101101101111", "101101101101010", "101101111111101", "101101010101101",
    "101101010010010", "111001010100111", "111101101101111", "010110010010111",
    "110001010100111", "110001010001110", "101101111001001", "111100110001110",
    "011100110101010", "111001010010010", "010101010101010", "010101011001110",
];

/// Font atlas of 40 stacked 8³ glyphs; unknown glyph indices are a block.
fn placeholder_font() -> Result<VoxelAtlas, SceneError> {
    let layout = RenderContext::layout_for(KindTag::Font)?;
    let mut atlas = VoxelAtlas::empty(layout);
    for index in 0..GLYPH_COUNT {
        let rows = GLYPH_ROWS.get(index as usize).copied().unwrap_or("111111111111111");
        for (bit, on) in rows.chars().enumerate() {
            if on != '1' {
                continue;
            }
            let (row, col) = (bit as u32 / 3, bit as u32 % 3);
            for z in 3..5 {
                let voxel = UVec3::new(2 + col, 6 - row, z);
                atlas.set_voxel_in(index, voxel, Rgba::WHITE)?;
            }
        }
    }
    Ok(atlas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::glyph_index;

    #[test]
    fn placeholder_covers_game_kinds() {
        let ctx = RenderContext::placeholder().unwrap();
        for tag in KindTag::ALL {
            assert_eq!(ctx.atlas_for(tag).is_some(), tag != KindTag::Editable);
        }
        assert!(matches!(
            ctx.visual_for(KindTag::Editable),
            Err(SceneError::MissingAtlas(KindTag::Editable))
        ));
    }

    #[test]
    fn placeholder_atlases_have_shipped_dimensions() {
        let ctx = RenderContext::placeholder().unwrap();
        let duck = ctx.registry.get(ctx.atlas_for(KindTag::Duck).unwrap()).unwrap();
        assert_eq!(duck.image().dimensions(), (256, 16));
        assert!(duck.solid_count() > 0);
        let font = ctx.registry.get(ctx.atlas_for(KindTag::Font).unwrap()).unwrap();
        assert_eq!(font.image().dimensions(), (64, 320));
    }

    #[test]
    fn font_glyphs_differ() {
        let ctx = RenderContext::placeholder().unwrap();
        let font = ctx.registry.get(ctx.atlas_for(KindTag::Font).unwrap()).unwrap();
        let a = font.to_grid(glyph_index('A')).unwrap();
        let i = font.to_grid(glyph_index('I')).unwrap();
        assert_ne!(a, i);
        // Top row of 'A' has only its middle column set.
        assert!(!a.get(UVec3::new(2, 6, 3)).unwrap().is_solid());
        assert!(a.get(UVec3::new(3, 6, 3)).unwrap().is_solid());
    }

    #[test]
    fn load_dir_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = RenderContext::placeholder().unwrap();
        for (tag, id) in &ctx.kinds {
            ctx.registry.get(*id).unwrap().save(dir.path().join(tag.atlas_file())).unwrap();
        }
        let loaded = RenderContext::load_dir(dir.path()).unwrap();
        for tag in [KindTag::Duck, KindTag::Font] {
            let a = ctx.registry.get(ctx.atlas_for(tag).unwrap()).unwrap();
            let b = loaded.registry.get(loaded.atlas_for(tag).unwrap()).unwrap();
            assert_eq!(a.image(), b.image());
        }
    }

    #[test]
    fn load_dir_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(RenderContext::load_dir(dir.path()).is_err());
    }
}
