// Integer math helpers shared by movers and walk regions

use glam::IVec2;
use serde::{Deserialize, Serialize};

/// Move `value` toward `target` by at most `max_step`
///
/// A non-positive `max_step` never moves the value.
pub fn step_toward(value: i32, target: i32, max_step: i32) -> i32 {
    if max_step <= 0 {
        return value;
    }
    let delta = (target - value).clamp(-max_step, max_step);
    value + delta
}

/// Move a point toward a target, each axis independently clamped
///
/// This is not constant-speed diagonal motion: an axis that finishes early
/// simply stops while the other keeps stepping.
pub fn step_toward_axes(position: IVec2, target: IVec2, step: IVec2) -> IVec2 {
    IVec2::new(
        step_toward(position.x, target.x, step.x),
        step_toward(position.y, target.y, step.y),
    )
}

/// Axis-aligned integer rectangle, `min` inclusive and `max` exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub min: IVec2,
    pub max: IVec2,
}

impl Rect {
    /// Create a rectangle from its left/top and right/bottom edges
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            min: IVec2::new(left.min(right), top.min(bottom)),
            max: IVec2::new(left.max(right), top.max(bottom)),
        }
    }

    /// Check if a point lies inside the rectangle
    pub fn contains(&self, point: IVec2) -> bool {
        point.x >= self.min.x
            && point.x < self.max.x
            && point.y >= self.min.y
            && point.y < self.max.y
    }

    pub fn width(&self) -> i32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> i32 {
        self.max.y - self.min.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_toward() {
        assert_eq!(step_toward(0, 100, 10), 10);
        assert_eq!(step_toward(95, 100, 10), 100);
        assert_eq!(step_toward(100, 0, 30), 70);
        assert_eq!(step_toward(5, 5, 10), 5);
    }

    #[test]
    fn test_step_toward_zero_step_stalls() {
        assert_eq!(step_toward(0, 100, 0), 0);
        assert_eq!(step_toward(0, 100, -3), 0);
    }

    #[test]
    fn test_axes_are_independent() {
        let next = step_toward_axes(IVec2::ZERO, IVec2::new(3, 40), IVec2::new(8, 8));
        assert_eq!(next, IVec2::new(3, 8));
    }

    #[test]
    fn test_rect_contains() {
        let rect = Rect::new(310, 115, 320, 167);
        assert!(rect.contains(IVec2::new(310, 115)));
        assert!(rect.contains(IVec2::new(319, 166)));
        assert!(!rect.contains(IVec2::new(320, 140)));
        assert_eq!(rect.width(), 10);
        assert_eq!(rect.height(), 52);
    }

    #[test]
    fn test_rect_normalizes_edges() {
        let rect = Rect::new(10, 10, 0, 0);
        assert_eq!(rect.min, IVec2::ZERO);
        assert_eq!(rect.max, IVec2::new(10, 10));
    }
}
