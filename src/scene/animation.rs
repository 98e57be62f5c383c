// Frame animation for scene objects
//
// Only frame numbers are stepped here; turning a (visage, strip, frame)
// triple into pixels is the renderer's business.

use serde::{Deserialize, Serialize};

/// How an object's frame advances over time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimMode {
    /// Frame never changes
    #[default]
    Static,
    /// Loop through the strip forever
    Cycle,
    /// Play forward to the last frame, then end
    ToEnd,
    /// Play backward to the first frame, then end
    ToStart,
    /// Step in `direction` (wrapping) until `frame` is shown, then end
    ToFrame { frame: u16, direction: i8 },
    /// Loop through the strip only while the object is moving
    WhileMoving,
}

impl AnimMode {
    /// Whether this mode finishes on its own
    pub fn is_finite(&self) -> bool {
        matches!(self, Self::ToEnd | Self::ToStart | Self::ToFrame { .. })
    }
}

/// Per-object frame stepper
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Animator {
    mode: AnimMode,
    /// Ticks elapsed since the last frame change
    frame_timer: u32,
}

impl Animator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new animation mode from the current frame
    pub fn play(&mut self, mode: AnimMode) {
        self.mode = mode;
        self.frame_timer = 0;
    }

    /// Stop animating and keep the current frame
    pub fn stop(&mut self) {
        self.mode = AnimMode::Static;
        self.frame_timer = 0;
    }

    pub fn mode(&self) -> AnimMode {
        self.mode
    }

    /// True while a finite animation is still running
    pub fn is_animating(&self) -> bool {
        self.mode.is_finite()
    }

    /// Advance one tick, returns true on the tick a finite animation ends
    ///
    /// Frames are 1-based; `frame_count` is the length of the current strip.
    pub fn update(
        &mut self,
        frame: &mut u16,
        frame_count: u16,
        frame_delay: u32,
        moving: bool,
    ) -> bool {
        if self.mode == AnimMode::Static {
            return false;
        }

        let frame_count = frame_count.max(1);

        // A finite animation that starts on its final frame ends at once
        if self.reached_end(*frame, frame_count) {
            self.stop();
            return true;
        }

        if self.mode == AnimMode::WhileMoving && !moving {
            self.frame_timer = 0;
            return false;
        }

        self.frame_timer += 1;
        if self.frame_timer < frame_delay.max(1) {
            return false;
        }
        self.frame_timer = 0;

        *frame = match self.mode {
            AnimMode::Static => *frame,
            AnimMode::Cycle | AnimMode::WhileMoving | AnimMode::ToEnd => {
                wrap_frame(*frame, 1, frame_count)
            }
            AnimMode::ToStart => wrap_frame(*frame, -1, frame_count),
            AnimMode::ToFrame { direction, .. } => {
                wrap_frame(*frame, if direction < 0 { -1 } else { 1 }, frame_count)
            }
        };

        if self.reached_end(*frame, frame_count) {
            self.stop();
            return true;
        }
        false
    }

    fn reached_end(&self, frame: u16, frame_count: u16) -> bool {
        match self.mode {
            AnimMode::ToEnd => frame >= frame_count,
            AnimMode::ToStart => frame <= 1,
            AnimMode::ToFrame { frame: target, .. } => frame == target.clamp(1, frame_count),
            _ => false,
        }
    }
}

/// Step a 1-based frame number by `delta`, wrapping within `1..=count`
fn wrap_frame(frame: u16, delta: i32, count: u16) -> u16 {
    let count = i32::from(count.max(1));
    let zero_based = (i32::from(frame.max(1)) - 1 + delta).rem_euclid(count);
    (zero_based + 1) as u16
}
