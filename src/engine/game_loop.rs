// Fixed-rate tick clock
//
// Converts wall-clock frame time into a whole number of scheduler ticks.
// Scripts count time in ticks only, so cutscene timing stays identical no
// matter how fast frames are rendered.

use std::time::{Duration, Instant};

use super::config::EngineConfig;

/// Tick clock state owned by the host loop
pub struct TickClock {
    /// Accumulated time not yet converted into ticks
    accumulator: Duration,

    /// Duration of one tick
    tick_duration: Duration,

    /// Maximum ticks returned for a single frame
    max_ticks_per_frame: u32,

    /// Time of last frame
    last_frame_time: Instant,

    /// Whether ticking is suspended
    paused: bool,

    /// Current frame number
    frame_count: u64,

    /// Total ticks handed out
    tick_count: u64,
}

impl TickClock {
    /// Create a clock from engine configuration
    pub fn new(config: &EngineConfig) -> Self {
        let hz = config.tick_rate_hz.max(1);
        Self {
            accumulator: Duration::ZERO,
            tick_duration: Duration::from_secs(1) / hz,
            max_ticks_per_frame: config.max_ticks_per_frame.max(1),
            last_frame_time: Instant::now(),
            paused: false,
            frame_count: 0,
            tick_count: 0,
        }
    }

    /// Begin a new frame, returns the number of ticks to run
    pub fn begin_frame(&mut self) -> u32 {
        let now = Instant::now();
        let frame_time = now.duration_since(self.last_frame_time);
        self.last_frame_time = now;
        self.advance_by(frame_time)
    }

    /// Feed an explicit frame duration, returns the number of ticks to run
    pub fn advance_by(&mut self, frame_time: Duration) -> u32 {
        self.frame_count += 1;

        if self.paused {
            return 0;
        }

        self.accumulator += frame_time;

        let mut ticks = 0;
        while self.accumulator >= self.tick_duration && ticks < self.max_ticks_per_frame {
            self.accumulator -= self.tick_duration;
            ticks += 1;
        }

        // Drop the backlog instead of replaying it on later frames
        if ticks == self.max_ticks_per_frame && self.accumulator >= self.tick_duration {
            log::debug!(
                "Tick backlog of {:?} dropped after {} ticks",
                self.accumulator,
                ticks
            );
            self.accumulator = Duration::ZERO;
        }

        self.tick_count += ticks as u64;
        ticks
    }

    /// Duration of one tick
    pub fn tick_duration(&self) -> Duration {
        self.tick_duration
    }

    /// Fraction of the next tick already accumulated, in `[0, 1)`
    pub fn alpha(&self) -> f32 {
        self.accumulator.as_secs_f32() / self.tick_duration.as_secs_f32()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            log::info!("Tick clock paused");
        }
    }

    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            // Reset accumulator to prevent a tick burst
            self.accumulator = Duration::ZERO;
            self.last_frame_time = Instant::now();
            log::info!("Tick clock resumed");
        }
    }

    pub fn toggle_pause(&mut self) {
        if self.paused {
            self.resume();
        } else {
            self.pause();
        }
    }
}

impl Default for TickClock {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}
