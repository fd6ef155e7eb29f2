//! Installation configuration
//!
//! Every struct has a `Default` matching the values the installation was
//! tuned with, and deserializes with `#[serde(default)]` so a config file only
//! needs to name what it overrides.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{DiskinectError, DiskinectResult, Vec3};

/// User tracker configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Centre of the activation zone in room space
    pub activation_zone: Vec3,
    /// Users whose torso is closer than this (ground plane) are active
    pub activation_radius: f32,
    /// Joint samples at or below this confidence keep the previous value
    pub confidence_threshold: f32,
    /// Summed squared joint displacement at or below this counts as still
    pub motion_tolerance: f32,
    /// Consecutive tracked ticks before a candidate counts as a real user
    pub frames_before_real_user: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        TrackerConfig {
            activation_zone: Vec3::new(0.0, 0.0, 3.0),
            activation_radius: 0.5,
            confidence_threshold: 0.5,
            motion_tolerance: 2.0,
            frames_before_real_user: 10,
        }
    }
}

/// Live / recorder / player configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Ticks without an active user before the live stream asks to be replaced
    pub idle_ticks_before_playback: u32,
    /// Whether players wrap around at the end of a recording
    pub loop_playback: bool,
    /// Directory recorder output is written to
    pub recording_dir: PathBuf,
    /// File name prefix for recorder output
    pub recording_prefix: String,
}

impl Default for StreamConfig {
    fn default() -> Self {
        StreamConfig {
            idle_ticks_before_playback: 8000,
            loop_playback: true,
            recording_dir: PathBuf::from("recordings"),
            recording_prefix: "gesture".to_string(),
        }
    }
}

/// Repeater ("echo") configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepeaterConfig {
    /// Movement that must accumulate while a user is active before capture starts
    pub min_cumulative_delta: f32,
    /// Captures shorter than this are discarded
    pub min_frames: u32,
    /// Captures stop at this length
    pub max_frames: u32,
}

impl Default for RepeaterConfig {
    fn default() -> Self {
        RepeaterConfig {
            min_cumulative_delta: 25.0,
            min_frames: 50,
            max_frames: 200,
        }
    }
}

impl RepeaterConfig {
    /// Short captures for quick interactive testing
    pub fn quick() -> Self {
        RepeaterConfig {
            min_cumulative_delta: 1.0,
            min_frames: 5,
            max_frames: 20,
        }
    }
}

/// Actuator mapping configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PuppeteerConfig {
    /// Minimum seconds between two actuator messages
    pub update_interval_secs: f64,
    /// Full-scale actuator value
    pub actuator_unit: f32,
    /// Changes smaller than this keep the previously sent value
    pub deadband: f32,
}

impl Default for PuppeteerConfig {
    fn default() -> Self {
        PuppeteerConfig {
            update_interval_secs: 0.5,
            actuator_unit: 10.0,
            deadband: 0.25,
        }
    }
}

/// Top-level relay configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub tracker: TrackerConfig,
    pub stream: StreamConfig,
    pub repeater: RepeaterConfig,
    pub puppeteer: PuppeteerConfig,
    /// Gesture recording path -> selection weight
    pub gestures: BTreeMap<String, u32>,
    /// Directory gesture paths are resolved against
    pub gesture_dir: PathBuf,
    /// Automatic live/playback substitution
    pub use_idle_timer: bool,
    /// Application tick rate
    pub tick_rate_hz: u32,
}

impl Default for RelayConfig {
    fn default() -> Self {
        RelayConfig {
            tracker: TrackerConfig::default(),
            stream: StreamConfig::default(),
            repeater: RepeaterConfig::default(),
            puppeteer: PuppeteerConfig::default(),
            gestures: BTreeMap::new(),
            gesture_dir: PathBuf::from("resources"),
            use_idle_timer: true,
            tick_rate_hz: 30,
        }
    }
}

impl RelayConfig {
    /// Parse a JSON config
    pub fn from_json_str(json: &str) -> DiskinectResult<Self> {
        let config: RelayConfig =
            serde_json::from_str(json).map_err(|e| DiskinectError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file
    pub fn from_json_file(path: impl AsRef<Path>) -> DiskinectResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| DiskinectError::io(path, e))?;
        Self::from_json_str(&json)
    }

    /// Reject values the tick loop cannot work with
    pub fn validate(&self) -> DiskinectResult<()> {
        if self.tracker.activation_radius < 0.0 {
            return Err(DiskinectError::Config(
                "activation_radius must not be negative".to_string(),
            ));
        }
        if self.repeater.min_frames > self.repeater.max_frames {
            return Err(DiskinectError::Config(format!(
                "repeater min_frames ({}) exceeds max_frames ({})",
                self.repeater.min_frames, self.repeater.max_frames
            )));
        }
        if self.tick_rate_hz == 0 {
            return Err(DiskinectError::Config("tick_rate_hz must be positive".to_string()));
        }
        Ok(())
    }
}
