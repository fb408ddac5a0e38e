use crate::atlas::VoxelAtlas;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Handle to an atlas owned by an [`AtlasRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AtlasId(pub u64);

/// Owns every atlas in a scene. Sprites and renderers refer to atlases by id.
///
/// BTreeMap keeps iteration (and therefore upload order) deterministic.
#[derive(Debug, Clone, Default)]
pub struct AtlasRegistry {
    atlases: BTreeMap<AtlasId, VoxelAtlas>,
    next_id: u64,
}

impl AtlasRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of an atlas and return its id.
    pub fn insert(&mut self, atlas: VoxelAtlas) -> AtlasId {
        let id = AtlasId(self.next_id);
        self.next_id += 1;
        tracing::debug!(id = id.0, size = %atlas.size(), "atlas registered");
        self.atlases.insert(id, atlas);
        id
    }

    pub fn get(&self, id: AtlasId) -> Option<&VoxelAtlas> {
        self.atlases.get(&id)
    }

    pub fn get_mut(&mut self, id: AtlasId) -> Option<&mut VoxelAtlas> {
        self.atlases.get_mut(&id)
    }

    pub fn remove(&mut self, id: AtlasId) -> Option<VoxelAtlas> {
        self.atlases.remove(&id)
    }

    /// Ids of atlases written since their last upload.
    pub fn dirty_ids(&self) -> Vec<AtlasId> {
        self.atlases
            .iter()
            .filter(|(_, a)| a.is_dirty())
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn mark_clean(&mut self, id: AtlasId) {
        if let Some(atlas) = self.atlases.get_mut(&id) {
            atlas.mark_clean();
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (AtlasId, &VoxelAtlas)> {
        self.atlases.iter().map(|(id, a)| (*id, a))
    }

    pub fn len(&self) -> usize {
        self.atlases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atlases.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AtlasLayout;
    use voxsprite_common::Rgba;

    #[test]
    fn insert_assigns_distinct_ids() {
        let mut registry = AtlasRegistry::new();
        let a = registry.insert(VoxelAtlas::empty(AtlasLayout::cube(8).unwrap()));
        let b = registry.insert(VoxelAtlas::empty(AtlasLayout::cube(16).unwrap()));
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(b).unwrap().size().x, 16);
    }

    #[test]
    fn dirty_tracking() {
        let mut registry = AtlasRegistry::new();
        let a = registry.insert(VoxelAtlas::empty(AtlasLayout::cube(8).unwrap()));
        let b = registry.insert(VoxelAtlas::empty(AtlasLayout::cube(8).unwrap()));
        assert_eq!(registry.dirty_ids(), vec![a, b]);

        registry.mark_clean(a);
        registry.mark_clean(b);
        assert!(registry.dirty_ids().is_empty());

        registry
            .get_mut(b)
            .unwrap()
            .set_voxel(1, 1, 1, Rgba::WHITE)
            .unwrap();
        assert_eq!(registry.dirty_ids(), vec![b]);
    }

    #[test]
    fn remove_returns_atlas() {
        let mut registry = AtlasRegistry::new();
        let a = registry.insert(VoxelAtlas::empty(AtlasLayout::cube(8).unwrap()));
        assert!(registry.remove(a).is_some());
        assert!(registry.is_empty());
        assert!(registry.get(a).is_none());
    }
}
