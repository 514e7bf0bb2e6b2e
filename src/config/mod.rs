// PortCrab - GPL-3.0-or-later
// This file is part of PortCrab.
//
// Copyright (C) 2025 Daniel Freiermuth
//
// PortCrab is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// PortCrab is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with PortCrab.  If not, see <https://www.gnu.org/licenses/>.

use crate::core::log_store::DEFAULT_MAX_LINES;
use crate::parser::DisplayMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("max_lines must be a positive integer, got {0}")]
    InvalidMaxLines(usize),
    #[error("Could not determine config directory")]
    NoConfigDir,
    #[error("Failed to access config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Live console settings; all of them can change without a restart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleSettings {
    #[serde(default = "default_max_lines")]
    pub max_lines: usize,
    #[serde(default)]
    pub display_mode: DisplayMode,
    #[serde(default = "default_true")]
    pub show_timestamps: bool,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            max_lines: DEFAULT_MAX_LINES,
            display_mode: DisplayMode::Text,
            show_timestamps: true,
        }
    }
}

impl ConsoleSettings {
    /// Reject values the console cannot honour
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_lines == 0 {
            return Err(ConfigError::InvalidMaxLines(self.max_lines));
        }
        Ok(())
    }
}

const fn default_max_lines() -> usize {
    DEFAULT_MAX_LINES
}

const fn default_true() -> bool {
    true
}

/// Global user configuration stored in config directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub console: ConsoleSettings,

    /// Colour the delta decorations by severity
    #[serde(default = "default_true")]
    pub color: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            console: ConsoleSettings::default(),
            color: true,
        }
    }
}

impl GlobalConfig {
    /// Get the path to the global config file
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("portcrab").join("config.json"))
    }

    /// Load global config from disk, returning defaults if not found
    pub fn load() -> Self {
        Self::config_path().map_or_else(Self::default, |path| Self::load_from(&path))
    }

    /// Load from an explicit path. Unreadable or invalid files fall back to defaults.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            tracing::info!("No global config found, using defaults");
            return Self::default();
        }

        tracing::info!("Loading global config from {}", path.display());
        let config = std::fs::read_to_string(path)
            .map_err(|e| tracing::warn!("Cannot read {}: {e}", path.display()))
            .ok()
            .and_then(|contents| {
                serde_json::from_str::<Self>(&contents)
                    .map_err(|e| tracing::warn!("Ignoring invalid config {}: {e}", path.display()))
                    .ok()
            })
            .unwrap_or_default();

        if let Err(e) = config.console.validate() {
            tracing::warn!("{e}, falling back to default console settings");
            return Self {
                console: ConsoleSettings::default(),
                ..config
            };
        }
        config
    }

    /// Save global config to disk
    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = Self::config_path().ok_or(ConfigError::NoConfigDir)?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        self.console.validate()?;

        // Create directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::info!("Saved global config to {}", path.display());
        Ok(())
    }
}
