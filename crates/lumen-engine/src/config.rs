//! Engine configuration.
//!
//! Loaded from JSON; every field is optional and falls back to
//! [`EngineConfig::default`]:
//!
//! ```
//! use lumen_engine::config::EngineConfig;
//!
//! let config = EngineConfig::from_json_str(r#"{ "window": { "width": 800, "height": 600 } }"#).unwrap();
//! assert_eq!(config.window.width, 800);
//! assert_eq!(config.max_entities, 5000);
//! ```

use std::path::Path;

use lumen_ecs::prelude::{SceneConfig, DEFAULT_MAX_ENTITIES, MAX_ENTITIES};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::math::Vec3;

// ---------------------------------------------------------------------------
// WindowConfig
// ---------------------------------------------------------------------------

/// Initial window geometry requested from the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            title: "Lumen".to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub window: WindowConfig,
    /// Entity capacity of the scene, in `1..=MAX_ENTITIES`.
    pub max_entities: u32,
    /// Acceleration applied to every body with a positive mass, in m/s^2.
    pub gravity: [f32; 3],
    /// Seconds of simulation per frame. Must be positive and finite.
    pub fixed_dt: f32,
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for EngineConfig {
    /// 1280x720 window, 5000 entities, earth gravity, 60 Hz.
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            max_entities: DEFAULT_MAX_ENTITIES,
            gravity: [0.0, -9.81, 0.0],
            fixed_dt: 1.0 / 60.0,
            log_filter: "warn".to_owned(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, EngineError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate the JSON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| EngineError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&text)?;
        tracing::debug!(path = %path.display(), "loaded engine config");
        Ok(config)
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.fixed_dt > 0.0 && self.fixed_dt.is_finite()) {
            return Err(EngineError::InvalidConfig(format!(
                "fixed_dt must be positive and finite, got {}",
                self.fixed_dt
            )));
        }
        if self.window.width == 0 || self.window.height == 0 {
            return Err(EngineError::InvalidConfig(format!(
                "window must have a non-zero size, got {}x{}",
                self.window.width, self.window.height
            )));
        }
        if self.max_entities == 0 || self.max_entities > MAX_ENTITIES {
            return Err(EngineError::InvalidConfig(format!(
                "max_entities must be in 1..={MAX_ENTITIES}, got {}",
                self.max_entities
            )));
        }
        if self.gravity.iter().any(|g| !g.is_finite()) {
            return Err(EngineError::InvalidConfig(format!(
                "gravity must be finite, got {:?}",
                self.gravity
            )));
        }
        Ok(())
    }

    pub fn scene_config(&self) -> SceneConfig {
        SceneConfig {
            max_entities: self.max_entities,
        }
    }

    pub fn gravity(&self) -> Vec3 {
        Vec3::from_array(self.gravity)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
