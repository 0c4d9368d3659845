// config.rs
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::traffic_signal::GreenLimits;

pub const DEFAULT_EPISODE_LENGTH: f64 = 20_000.0;
pub const DEFAULT_STEP_CHUNK: u32 = 5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Construction-time settings of an [`crate::Environment`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvConfig {
    /// Scenario descriptor handed to the simulator start call.
    pub scenario: String,
    /// Visible run instead of headless. Has no effect on states or rewards.
    #[serde(default)]
    pub render: bool,
    /// Simulated seconds after which an episode is done.
    #[serde(default = "default_episode_length")]
    pub episode_length: f64,
    /// Ticks advanced before the first observation so traffic can build up.
    #[serde(default)]
    pub warm_up_ticks: u32,
    /// Ticks advanced per environment step.
    #[serde(default = "default_step_chunk")]
    pub step_chunk: u32,
    #[serde(default)]
    pub min_green: Option<f64>,
    #[serde(default)]
    pub max_green: Option<f64>,
}

fn default_episode_length() -> f64 {
    DEFAULT_EPISODE_LENGTH
}

fn default_step_chunk() -> u32 {
    DEFAULT_STEP_CHUNK
}

impl EnvConfig {
    pub fn new(scenario: impl Into<String>) -> Self {
        Self {
            scenario: scenario.into(),
            render: false,
            episode_length: DEFAULT_EPISODE_LENGTH,
            warm_up_ticks: 0,
            step_chunk: DEFAULT_STEP_CHUNK,
            min_green: None,
            max_green: None,
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scenario.trim().is_empty() {
            return Err(ConfigError::Invalid("scenario must not be empty".into()));
        }
        if self.step_chunk == 0 {
            return Err(ConfigError::Invalid("step_chunk must be at least 1".into()));
        }
        if !self.episode_length.is_finite() || self.episode_length < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "episode_length must be a non-negative number of seconds, got {}",
                self.episode_length
            )));
        }
        for (name, value) in [("min_green", self.min_green), ("max_green", self.max_green)] {
            if let Some(seconds) = value {
                if !seconds.is_finite() || seconds < 0.0 {
                    return Err(ConfigError::Invalid(format!(
                        "{} must be a non-negative number of seconds, got {}",
                        name, seconds
                    )));
                }
            }
        }
        if let (Some(min_green), Some(max_green)) = (self.min_green, self.max_green) {
            if min_green > max_green {
                return Err(ConfigError::Invalid(format!(
                    "min_green ({}) exceeds max_green ({})",
                    min_green, max_green
                )));
            }
        }
        Ok(())
    }

    pub fn green_limits(&self) -> GreenLimits {
        GreenLimits {
            min_green: self.min_green,
            max_green: self.max_green,
        }
    }
}
