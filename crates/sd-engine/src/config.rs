//! Scheduler configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A configuration value is out of range.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid {field}: {value}")]
pub struct ConfigError {
    pub field: &'static str,
    pub value: f64,
}

/// Timing parameters for the lookahead scheduler. All times in seconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Delay between `start` and the first step
    pub start_delay: f64,
    /// How far ahead of the audio clock steps are scheduled
    pub lookahead: f64,
    /// Wake interval of the scheduler loop
    pub tick_interval: f64,
    /// Let the horizon grow and shrink with measured tick cost
    pub adaptive_lookahead: bool,
    pub diagnostics: DiagnosticsConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            start_delay: 0.1,
            lookahead: 0.1,
            tick_interval: 0.025,
            adaptive_lookahead: false,
            diagnostics: DiagnosticsConfig::default(),
        }
    }
}

/// Bar timing capture.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub enabled: bool,
    /// Channel whose notes are timed
    pub reference_channel: usize,
    /// Extra wait after a bar's last note ends before reporting
    pub flush_margin: f64,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self { enabled: true, reference_channel: 0, flush_margin: 0.25 }
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError { field, value })
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("start_delay", self.start_delay)?;
        positive("lookahead", self.lookahead)?;
        positive("tick_interval", self.tick_interval)?;
        if self.tick_interval >= self.lookahead {
            return Err(ConfigError { field: "tick_interval", value: self.tick_interval });
        }
        let margin = self.diagnostics.flush_margin;
        if !margin.is_finite() || margin < 0.0 {
            return Err(ConfigError { field: "diagnostics.flush_margin", value: margin });
        }
        Ok(())
    }

    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(self.tick_interval.max(0.001))
    }
}
