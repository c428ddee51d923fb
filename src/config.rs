//! Engine configuration.
//!
//! Process-wide limits and defaults are carried in an explicitly-injected
//! [`EngineConfig`] handed to the service at construction time, so tests can
//! substitute tightened limits without touching global state.

use serde::{Deserialize, Serialize};

/// Configuration for the timer engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of visible (non-hidden) presets (1-100)
    pub max_visible_presets: usize,
    /// Maximum number of concurrently running timers (1-64)
    pub max_running_timers: usize,
    /// Size of the bounded post-expiry banner run (1-60)
    pub max_repeat_notifications: u32,
    /// Interval between post-expiry banners, in seconds (>= 1)
    pub repeat_interval_secs: u32,
    /// Default sound flag for timers created without an explicit policy
    pub default_sound_on: bool,
    /// Default vibration flag for timers created without an explicit policy
    pub default_vibration_on: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_visible_presets: 20,
            max_running_timers: 10,
            max_repeat_notifications: 60,
            repeat_interval_secs: 1,
            default_sound_on: true,
            default_vibration_on: true,
        }
    }
}

impl EngineConfig {
    /// Creates a configuration with the specified preset cap.
    #[must_use]
    pub fn with_max_visible_presets(mut self, cap: usize) -> Self {
        self.max_visible_presets = cap;
        self
    }

    /// Creates a configuration with the specified running-timer cap.
    #[must_use]
    pub fn with_max_running_timers(mut self, cap: usize) -> Self {
        self.max_running_timers = cap;
        self
    }

    /// Creates a configuration with the specified banner-run length.
    #[must_use]
    pub fn with_max_repeat_notifications(mut self, count: u32) -> Self {
        self.max_repeat_notifications = count;
        self
    }

    /// Creates a configuration with the specified banner interval.
    #[must_use]
    pub fn with_repeat_interval_secs(mut self, secs: u32) -> Self {
        self.repeat_interval_secs = secs;
        self
    }

    /// Validates the configuration.
    ///
    /// Returns an error message if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_visible_presets < 1 || self.max_visible_presets > 100 {
            return Err("max_visible_presets must be within 1-100".to_string());
        }
        if self.max_running_timers < 1 || self.max_running_timers > 64 {
            return Err("max_running_timers must be within 1-64".to_string());
        }
        if self.max_repeat_notifications < 1 || self.max_repeat_notifications > 60 {
            return Err("max_repeat_notifications must be within 1-60".to_string());
        }
        if self.repeat_interval_secs < 1 {
            return Err("repeat_interval_secs must be at least 1".to_string());
        }
        Ok(())
    }
}
