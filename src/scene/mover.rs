// Per-object position stepper

use glam::IVec2;
use serde::{Deserialize, Serialize};

use super::walk::WalkRegions;
use crate::core::step_toward_axes;

/// Moves one object toward a target, a clamped step per axis per tick
///
/// Identical start, target, step and tick count always give the identical
/// position; the trajectory itself is never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mover {
    target: IVec2,
    step: IVec2,
    arrived: bool,
}

impl Mover {
    /// Create a mover heading for `target` with a per-axis `step`
    pub fn new(target: IVec2, step: IVec2) -> Self {
        Self {
            target,
            step,
            arrived: false,
        }
    }

    /// Retarget the mover and clear its arrival
    pub fn configure(&mut self, target: IVec2, step: IVec2) {
        self.target = target;
        self.step = step;
        self.arrived = false;
    }

    /// Advance `position` by one tick, returns true on the tick of arrival
    ///
    /// A step that would leave the walkable area is not taken, so a mover
    /// aimed at an unreachable spot stalls where it is.
    pub fn step(&mut self, position: &mut IVec2, walk: &WalkRegions) -> bool {
        if self.arrived {
            return false;
        }

        let next = step_toward_axes(*position, self.target, self.step);
        if next != *position && !walk.is_walkable(next) {
            return false;
        }
        *position = next;

        if *position == self.target {
            self.arrived = true;
            return true;
        }
        false
    }

    /// Whether a mover leaving `from` would ever arrive at `target`
    ///
    /// Replays the per-axis stepping of `step` against the walk regions.
    /// Every step shortens the remaining distance, so the walk is bounded.
    pub fn can_arrive(from: IVec2, target: IVec2, step: IVec2, walk: &WalkRegions) -> bool {
        let mut position = from;
        while position != target {
            let next = step_toward_axes(position, target, step);
            if next == position || !walk.is_walkable(next) {
                return false;
            }
            position = next;
        }
        true
    }

    pub fn target(&self) -> IVec2 {
        self.target
    }

    pub fn step_size(&self) -> IVec2 {
        self.step
    }

    pub fn has_arrived(&self) -> bool {
        self.arrived
    }
}
