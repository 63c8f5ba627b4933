//! # Terminal Configuration
//!
//! Configuration for one POS terminal.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     PUNTO_MAX_SESSIONS=5                                               │
//! │     PUNTO_CASH_ROUNDING=100                                            │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/pos/punto.toml (Linux)                                   │
//! │     ~/Library/Application Support/com.punto.pos/punto.toml (macOS)     │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     max_sessions = 10, cash_rounding = 500                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # punto.toml
//! max_sessions = 10
//! cash_rounding = 500
//! snapshot_path = "/var/lib/punto/sessions.json"
//! database_path = "/var/lib/punto/punto.db"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use punto_core::{Money, CASH_ROUNDING_BUCKET, MAX_SESSIONS};

use crate::error::{ConfigError, ConfigResult};

// =============================================================================
// Engine Configuration
// =============================================================================

/// Complete terminal configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum concurrently open sessions (1 to `MAX_SESSIONS`).
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// Cash totals round to the nearest multiple of this (pesos).
    #[serde(default = "default_cash_rounding")]
    pub cash_rounding: i64,

    /// Where session snapshots are written.
    /// Platform data directory when unset.
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,

    /// SQLite database location.
    /// Platform data directory when unset.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

fn default_max_sessions() -> usize {
    MAX_SESSIONS
}

fn default_cash_rounding() -> i64 {
    CASH_ROUNDING_BUCKET
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_sessions: default_max_sessions(),
            cash_rounding: default_cash_rounding(),
            snapshot_path: None,
            database_path: None,
        }
    }
}

impl EngineConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (punto.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading terminal config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns defaults if the load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load terminal config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ConfigError::SaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::SaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| ConfigError::SaveFailed(e.to_string()))?;

        info!(?path, "Terminal config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_sessions == 0 || self.max_sessions > MAX_SESSIONS {
            return Err(ConfigError::Invalid(format!(
                "max_sessions must be between 1 and {}, got {}",
                MAX_SESSIONS, self.max_sessions
            )));
        }

        if self.cash_rounding < 1 {
            return Err(ConfigError::Invalid(format!(
                "cash_rounding must be at least 1, got {}",
                self.cash_rounding
            )));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var("PUNTO_MAX_SESSIONS") {
            if let Ok(n) = value.parse::<usize>() {
                debug!(max_sessions = n, "Overriding max sessions from environment");
                self.max_sessions = n;
            }
        }

        if let Ok(value) = std::env::var("PUNTO_CASH_ROUNDING") {
            if let Ok(n) = value.parse::<i64>() {
                debug!(cash_rounding = n, "Overriding cash rounding from environment");
                self.cash_rounding = n;
            }
        }

        if let Ok(path) = std::env::var("PUNTO_SNAPSHOT_PATH") {
            self.snapshot_path = Some(PathBuf::from(path));
        }

        if let Ok(path) = std::env::var("PUNTO_DATABASE_PATH") {
            self.database_path = Some(PathBuf::from(path));
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "punto", "pos")
            .map(|dirs| dirs.config_dir().join("punto.toml"))
    }

    /// The cash rounding bucket as a money amount.
    pub fn bucket(&self) -> Money {
        Money::from_pesos(self.cash_rounding)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
