//! Configuration structures for the frame engine and runner.
//!
//! These structs are designed to be deserialized from a configuration file
//! (e.g., a TOML file) using `serde`, with every field optional. This allows
//! the engine's behavior to be defined externally from the application code.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

/// The top-level configuration for a [`FrameEngine`](crate::engine::FrameEngine).
///
/// Typically loaded from a TOML file or environment at application startup
/// via [`FrameConfig::load`], or built literally in code.
#[derive(Debug, Clone, Deserialize)]
pub struct FrameConfig {
    /// Optional target tick rate in frames per second.
    ///
    /// When set, the engine throttles phase work to this rate with drift
    /// correction and reports a fixed-step delta of `1000 / fps` ms. When
    /// absent, the engine follows the host's native rate with a clamped
    /// variable-step delta.
    #[serde(default)]
    pub fps: Option<f64>,

    /// Upper bound on the variable-step delta, in milliseconds.
    ///
    /// Bounds pathological deltas after the process was suspended or
    /// backgrounded. Defaults to 40 ms; values below 1 ms are raised to
    /// 1 ms when the engine is built.
    #[serde(default = "default_max_delta")]
    pub max_delta: f64,

    /// The native refresh cadence the [`FrameRunner`](crate::runner::FrameRunner)
    /// simulates when delivering host ticks.
    #[serde(default)]
    pub refresh: RefreshRate,
}

/// The host refresh cadence used by the runner.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RefreshRate {
    /// ~60 ticks per second. Matches a typical display refresh.
    #[default]
    High,
    /// ~30 ticks per second. Suitable for throttled or background work.
    Medium,
    /// ~10 ticks per second. Suitable for coarse periodic updates.
    Low,
    /// A user-defined cadence in ticks per second.
    Custom { ticks_per_second: u64 },
}

impl RefreshRate {
    /// Ticks per second for this cadence.
    pub fn ticks_per_second(&self) -> f64 {
        match self {
            RefreshRate::High => 60.0,
            RefreshRate::Medium => 30.0,
            RefreshRate::Low => 10.0,
            RefreshRate::Custom { ticks_per_second } => (*ticks_per_second).max(1) as f64,
        }
    }

    /// The interval between consecutive host ticks.
    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.ticks_per_second())
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            fps: None,
            max_delta: default_max_delta(),
            refresh: RefreshRate::default(),
        }
    }
}

impl FrameConfig {
    /// Loads configuration from an optional TOML file plus `FRAMEPULSE_*`
    /// environment variable overrides.
    ///
    /// With `path: None`, a `framepulse.toml` next to the working directory
    /// is used if present; missing files fall back to defaults.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(explicit) => File::with_name(explicit),
            None => File::with_name("framepulse").required(false),
        };
        Config::builder()
            .add_source(file)
            .add_source(Environment::with_prefix("FRAMEPULSE"))
            .build()?
            .try_deserialize()
    }
}

fn default_max_delta() -> f64 {
    40.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_host_rate() {
        let config = FrameConfig::default();
        assert_eq!(config.fps, None);
        assert_eq!(config.max_delta, 40.0);
        assert_eq!(config.refresh.ticks_per_second(), 60.0);
    }

    #[test]
    fn refresh_rate_periods() {
        assert_eq!(RefreshRate::Medium.period(), Duration::from_secs_f64(1.0 / 30.0));
        let custom = RefreshRate::Custom { ticks_per_second: 120 };
        assert_eq!(custom.ticks_per_second(), 120.0);
        // Zero is clamped to one tick per second rather than dividing by zero.
        let zero = RefreshRate::Custom { ticks_per_second: 0 };
        assert_eq!(zero.ticks_per_second(), 1.0);
    }

    #[test]
    fn load_without_file_uses_defaults() {
        let config = FrameConfig::load(None).expect("defaults should deserialize");
        assert_eq!(config.fps, None);
        assert_eq!(config.max_delta, 40.0);
    }
}
