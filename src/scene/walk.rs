// Walkable regions of a scene
//
// A scene without regions is walkable everywhere. Regions can be switched
// off while a cutscene blocks part of the room.

use std::collections::BTreeSet;

use glam::IVec2;

use crate::core::Rect;

/// Set of numbered walkable rectangles
#[derive(Debug, Default, Clone)]
pub struct WalkRegions {
    regions: Vec<(u32, Rect)>,
    disabled: BTreeSet<u32>,
}

impl WalkRegions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a region, replacing any region with the same id
    pub fn add(&mut self, id: u32, rect: Rect) {
        self.regions.retain(|(existing, _)| *existing != id);
        self.regions.push((id, rect));
    }

    pub fn disable(&mut self, id: u32) {
        self.disabled.insert(id);
    }

    pub fn enable(&mut self, id: u32) {
        self.disabled.remove(&id);
    }

    pub fn is_enabled(&self, id: u32) -> bool {
        !self.disabled.contains(&id)
    }

    /// Ids of the regions switched off, ascending
    pub fn disabled(&self) -> impl Iterator<Item = u32> + '_ {
        self.disabled.iter().copied()
    }

    /// Replace the set of switched-off regions
    pub fn set_disabled<I: IntoIterator<Item = u32>>(&mut self, ids: I) {
        self.disabled = ids.into_iter().collect();
    }

    /// Check if a point may be walked on
    pub fn is_walkable(&self, point: IVec2) -> bool {
        if self.regions.is_empty() {
            return true;
        }
        self.regions
            .iter()
            .any(|(id, rect)| !self.disabled.contains(id) && rect.contains(point))
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_regions_walkable_everywhere() {
        let walk = WalkRegions::new();
        assert!(walk.is_walkable(IVec2::new(-500, 9000)));
    }

    #[test]
    fn test_disabled_region_blocks() {
        let mut walk = WalkRegions::new();
        walk.add(6, Rect::new(0, 100, 160, 168));
        walk.add(14, Rect::new(160, 100, 320, 168));

        assert!(walk.is_walkable(IVec2::new(200, 130)));
        walk.disable(14);
        assert!(!walk.is_walkable(IVec2::new(200, 130)));
        assert!(walk.is_walkable(IVec2::new(20, 130)));

        walk.enable(14);
        assert!(walk.is_enabled(14));
        assert!(walk.is_walkable(IVec2::new(200, 130)));
    }

    #[test]
    fn test_add_replaces_same_id() {
        let mut walk = WalkRegions::new();
        walk.add(1, Rect::new(0, 0, 10, 10));
        walk.add(1, Rect::new(50, 50, 60, 60));
        assert_eq!(walk.len(), 1);
        assert!(!walk.is_walkable(IVec2::new(5, 5)));
    }
}
