// Scene palette and periodic color-range rotation
//
// Rotations reuse the scheduler's delay idiom: each entry counts down its
// own tick delay and shifts its range by one slot when the countdown
// expires. Colors themselves are opaque RGB triples.

use serde::{Deserialize, Serialize};

/// Number of entries in an indexed palette
pub const PALETTE_SIZE: usize = 256;

/// One periodic rotation over an inclusive range of palette indices
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaletteRotation {
    /// First palette index of the range
    pub start: u8,
    /// Last palette index of the range (inclusive)
    pub end: u8,
    /// Ticks between shifts
    pub delay: u32,
    /// Shift direction: positive moves colors toward higher indices
    pub direction: i8,
    countdown: u32,
}

impl PaletteRotation {
    pub fn new(start: u8, end: u8, delay: u32) -> Self {
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        let delay = delay.max(1);
        Self {
            start,
            end,
            delay,
            direction: 1,
            countdown: delay,
        }
    }

    /// Reverse the shift direction
    pub fn reversed(mut self) -> Self {
        self.direction = -self.direction;
        self
    }

    /// Count down one tick, returns true if the range should shift now
    fn tick(&mut self) -> bool {
        self.countdown = self.countdown.saturating_sub(1);
        if self.countdown == 0 {
            self.countdown = self.delay;
            true
        } else {
            false
        }
    }
}

/// Indexed palette with its active rotations
#[derive(Debug, Clone)]
pub struct Palette {
    colors: Vec<[u8; 3]>,
    rotations: Vec<PaletteRotation>,
    revision: u64,
}

impl Palette {
    /// Create an all-black palette
    pub fn new() -> Self {
        Self {
            colors: vec![[0, 0, 0]; PALETTE_SIZE],
            rotations: Vec::new(),
            revision: 0,
        }
    }

    /// Replace the colors, keeping rotations
    pub fn set_colors(&mut self, colors: &[[u8; 3]]) {
        let count = colors.len().min(PALETTE_SIZE);
        self.colors[..count].copy_from_slice(&colors[..count]);
        self.revision += 1;
    }

    pub fn colors(&self) -> &[[u8; 3]] {
        &self.colors
    }

    /// Register a rotation, returns its index in the rotation list
    pub fn add_rotation(&mut self, rotation: PaletteRotation) -> usize {
        log::debug!(
            "Palette rotation {}..={} every {} ticks",
            rotation.start,
            rotation.end,
            rotation.delay
        );
        self.rotations.push(rotation);
        self.rotations.len() - 1
    }

    /// Drop every rotation (scene teardown, cutscene end)
    pub fn clear_rotations(&mut self) {
        self.rotations.clear();
    }

    pub fn rotations(&self) -> &[PaletteRotation] {
        &self.rotations
    }

    /// Bumped whenever colors change; hosts re-upload the palette on change
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Advance all rotations by one tick
    pub fn tick(&mut self) {
        let mut changed = false;
        for rotation in &mut self.rotations {
            if !rotation.tick() {
                continue;
            }
            let range = &mut self.colors[rotation.start as usize..=rotation.end as usize];
            if rotation.direction >= 0 {
                range.rotate_right(1);
            } else {
                range.rotate_left(1);
            }
            changed = true;
        }
        if changed {
            self.revision += 1;
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> Palette {
        let mut palette = Palette::new();
        let colors: Vec<[u8; 3]> = (0..=255u8).map(|i| [i, i, i]).collect();
        palette.set_colors(&colors);
        palette
    }

    #[test]
    fn test_rotation_waits_for_delay() {
        let mut palette = ramp();
        palette.add_rotation(PaletteRotation::new(64, 79, 10));

        for _ in 0..9 {
            palette.tick();
        }
        assert_eq!(palette.colors()[64], [64, 64, 64]);

        palette.tick();
        assert_eq!(palette.colors()[64], [79, 79, 79]);
        assert_eq!(palette.colors()[65], [64, 64, 64]);
        assert_eq!(palette.colors()[80], [80, 80, 80], "Outside the range is untouched");
    }

    #[test]
    fn test_reverse_rotation() {
        let mut palette = ramp();
        palette.add_rotation(PaletteRotation::new(96, 111, 1).reversed());
        palette.tick();
        assert_eq!(palette.colors()[96], [97, 97, 97]);
        assert_eq!(palette.colors()[111], [96, 96, 96]);
    }

    #[test]
    fn test_revision_tracks_changes() {
        let mut palette = ramp();
        let before = palette.revision();
        palette.add_rotation(PaletteRotation::new(0, 3, 2));
        palette.tick();
        assert_eq!(palette.revision(), before);
        palette.tick();
        assert_eq!(palette.revision(), before + 1);
    }

    #[test]
    fn test_clear_rotations() {
        let mut palette = ramp();
        palette.add_rotation(PaletteRotation::new(64, 79, 1));
        palette.add_rotation(PaletteRotation::new(96, 111, 1));
        assert_eq!(palette.rotations().len(), 2);

        palette.clear_rotations();
        palette.tick();
        assert_eq!(palette.colors()[64], [64, 64, 64]);
    }

    #[test]
    fn test_swapped_bounds_normalized() {
        let rotation = PaletteRotation::new(79, 64, 0);
        assert_eq!((rotation.start, rotation.end, rotation.delay), (64, 79, 1));
    }
}
