//! Tunables for a canvas session.

use crate::items::SerializableColor;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid canvas config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid canvas config: {0}")]
    Invalid(String),
}

/// Session configuration. Every field has a default, so partial JSON is accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub history: HistoryConfig,
    pub placement: PlacementConfig,
    pub render: RenderConfig,
    pub collaboration: CollaborationConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub max_entries: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_entries: crate::history::DEFAULT_MAX_ENTRIES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    /// Maximum offset, in world units, applied around the viewport center
    /// when placing a new item.
    pub jitter: f64,
    /// Seed of the placement generator; `None` derives one from the clock.
    pub seed: Option<u64>,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            jitter: 40.0,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Item count above which the retained backend is used.
    pub retained_threshold: usize,
    pub selection_color: SerializableColor,
    /// Skip items outside the viewport in the retained backend.
    pub cull: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            retained_threshold: 200,
            selection_color: SerializableColor::new(59, 130, 246, 255),
            cull: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollaborationConfig {
    pub cursor_throttle_ms: u64,
    pub heartbeat_ms: u64,
    pub presence_window_ms: u64,
}

impl Default for CollaborationConfig {
    fn default() -> Self {
        Self {
            cursor_throttle_ms: 50,
            heartbeat_ms: 10_000,
            presence_window_ms: 30_000,
        }
    }
}

impl CanvasConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: CanvasConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history.max_entries == 0 {
            return Err(ConfigError::Invalid(
                "history.max_entries must be at least 1".into(),
            ));
        }
        if !self.placement.jitter.is_finite() || self.placement.jitter < 0.0 {
            return Err(ConfigError::Invalid(
                "placement.jitter must be a non-negative number".into(),
            ));
        }
        if self.collaboration.presence_window_ms < self.collaboration.heartbeat_ms {
            return Err(ConfigError::Invalid(
                "collaboration.presence_window_ms must not be shorter than heartbeat_ms".into(),
            ));
        }
        Ok(())
    }
}
