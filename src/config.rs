//! Engine configuration
//!
//! Every field has a default, so an empty TOML document is a valid
//! configuration.
//!
//! ```toml
//! history_limit = 50
//! storage_key = "tokens-v2"
//! theme = "dark"
//!
//! [impact]
//! high_component_threshold = 10
//! medium_component_threshold = 2
//! ```
//!
//! Author: Moroya Sakamoto

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TokenError};
use crate::history::DEFAULT_HISTORY_LIMIT;
use crate::impact::ImpactPolicy;
use crate::persist::STORAGE_KEY;
use crate::projection::ThemeMode;

/// Session-wide settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum undo depth
    pub history_limit: usize,

    /// Key the store is persisted under
    pub storage_key: String,

    /// Theme used for projection
    pub theme: ThemeMode,

    /// Impact classification thresholds
    pub impact: ImpactPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            storage_key: String::from(STORAGE_KEY),
            theme: ThemeMode::Light,
            impact: ImpactPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| TokenError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.history_limit == 0 {
            return Err(TokenError::Config(String::from("history_limit must be at least 1")));
        }
        if self.storage_key.trim().is_empty() {
            return Err(TokenError::Config(String::from("storage_key cannot be empty")));
        }
        self.impact.validate()
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| TokenError::Config(e.to_string()))
    }
}
