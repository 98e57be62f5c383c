// Engine configuration
//
// Defaults are tuned for 60 Hz adventure-game content. A JSON file can
// override any subset of fields; missing fields keep their defaults.

use std::path::Path;

use glam::IVec2;
use serde::{Deserialize, Serialize};

use super::error::ConfigError;

/// Runtime tuning shared by every scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Scheduler ticks per second
    pub tick_rate_hz: u32,

    /// Maximum number of ticks run for one rendered frame
    pub max_ticks_per_frame: u32,

    /// How many times one Action may re-enter within a single tick via `Delay(0)`
    pub max_reentries_per_tick: u32,

    /// Soft capacity of the host request queue; exceeding it is a development error
    pub request_queue_capacity: usize,

    /// Per-axis Mover step for objects that do not set their own
    pub default_move_step: IVec2,

    /// Ticks between frame changes for objects that do not set their own
    pub default_frame_delay: u32,

    /// Treat precondition violations (malformed sequences, queue overflow) as fatal
    pub strict: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 60,
            max_ticks_per_frame: 5,
            max_reentries_per_tick: 8,
            request_queue_capacity: 256,
            default_move_step: IVec2::new(4, 2),
            default_frame_delay: 6,
            strict: cfg!(debug_assertions),
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from JSON text
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file from disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// Check that values are usable by the tick clock and scheduler
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_rate_hz == 0 {
            return Err(ConfigError::Invalid("tick_rate_hz must be positive".into()));
        }
        if self.max_ticks_per_frame == 0 {
            return Err(ConfigError::Invalid(
                "max_ticks_per_frame must be positive".into(),
            ));
        }
        if self.default_frame_delay == 0 {
            return Err(ConfigError::Invalid(
                "default_frame_delay must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn with_tick_rate(mut self, hz: u32) -> Self {
        self.tick_rate_hz = hz;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_request_queue_capacity(mut self, capacity: usize) -> Self {
        self.request_queue_capacity = capacity;
        self
    }

    pub fn with_default_move_step(mut self, step: IVec2) -> Self {
        self.default_move_step = step;
        self
    }

    pub fn with_default_frame_delay(mut self, ticks: u32) -> Self {
        self.default_frame_delay = ticks.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tick_rate_hz, 60);
        assert_eq!(config.default_move_step, IVec2::new(4, 2));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EngineConfig::from_json_str(r#"{ "tick_rate_hz": 30, "strict": false }"#)
            .expect("config should parse");
        assert_eq!(config.tick_rate_hz, 30);
        assert!(!config.strict);
        assert_eq!(config.max_ticks_per_frame, 5);
        assert_eq!(config.request_queue_capacity, 256);
    }

    #[test]
    fn test_move_step_from_json() {
        let config = EngineConfig::from_json_str(r#"{ "default_move_step": [8, 4] }"#)
            .expect("config should parse");
        assert_eq!(config.default_move_step, IVec2::new(8, 4));
    }

    #[test]
    fn test_zero_tick_rate_rejected() {
        let result = EngineConfig::from_json_str(r#"{ "tick_rate_hz": 0 }"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_malformed_json_rejected() {
        let result = EngineConfig::from_json_str("{ tick_rate_hz: ");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_builders() {
        let config = EngineConfig::default()
            .with_tick_rate(30)
            .with_strict(false)
            .with_default_frame_delay(0);
        assert_eq!(config.tick_rate_hz, 30);
        assert!(!config.strict);
        assert_eq!(config.default_frame_delay, 1);
    }
}
