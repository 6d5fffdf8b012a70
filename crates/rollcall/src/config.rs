//! Configuration management for rollcall.
//!
//! Configuration is layered with figment: built-in defaults, then a TOML
//! file, then `ROLLCALL_` environment variables (sections separated by `__`,
//! e.g. `ROLLCALL_SCAN__DURATION_MS=5000`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};
use crate::scan::ScanTiming;

const CONFIG_FILE_NAME: &str = "config.toml";
const DATA_DIR_NAME: &str = "rollcall";
const DATABASE_FILE_NAME: &str = "rollcall.db";
const ENV_PREFIX: &str = "ROLLCALL_";

const PIN_PATTERN: &str = r"^\d{4}$";
const SESSION_CODE_PATTERN: &str = r"^[A-Za-z0-9]{6}$";

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Scan timing.
    pub scan: ScanConfig,
    /// PIN and login session.
    pub auth: AuthConfig,
    /// Session code gate.
    pub gate: GateConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/rollcall/rollcall.db`
    pub database_path: Option<PathBuf>,
}

/// Scan timing and detection order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Total scan duration in milliseconds.
    pub duration_ms: u64,
    /// Time between ticks in milliseconds.
    pub tick_interval_ms: u64,
    /// Seed for the detection order. Random when unset.
    pub seed: Option<u64>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            duration_ms: 15_000,
            tick_interval_ms: 500,
            seed: None,
        }
    }
}

/// PIN unlock and session lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Four-digit unlock PIN.
    #[serde(deserialize_with = "string_or_number")]
    pub pin: String,
    /// Minutes a login stays valid.
    pub session_ttl_minutes: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            pin: "1234".to_string(),
            session_ttl_minutes: 60,
        }
    }
}

/// Session code gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Six-character code that opens the automatic scan.
    #[serde(deserialize_with = "string_or_number")]
    pub session_code: String,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            session_code: "123456".to_string(),
        }
    }
}

/// Environment values that look numeric arrive as numbers. Leading zeros
/// are lost that way, so such values must be quoted (`ROLLCALL_AUTH__PIN='"0123"'`).
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(text) => text,
        Raw::Number(number) => number.to_string(),
    })
}

impl Config {
    /// Load configuration from the default file and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if loading, parsing or validation fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// A missing file is not an error; defaults apply.
    ///
    /// # Errors
    ///
    /// Returns an error if loading, parsing or validation fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);
        let config: Config = Self::figment(&config_file).extract()?;
        config.validate()?;
        Ok(config)
    }

    fn figment(config_file: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_file).nested())
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigValidation`] naming the first invalid value.
    pub fn validate(&self) -> Result<()> {
        let pin = Regex::new(PIN_PATTERN).map_err(|e| Error::internal(e.to_string()))?;
        if !pin.is_match(&self.auth.pin) {
            return Err(Error::config_validation("auth.pin must be exactly 4 digits"));
        }

        let code = Regex::new(SESSION_CODE_PATTERN).map_err(|e| Error::internal(e.to_string()))?;
        if !code.is_match(&self.gate.session_code) {
            return Err(Error::config_validation(
                "gate.session_code must be exactly 6 letters or digits",
            ));
        }

        if self.scan.tick_interval_ms == 0 {
            return Err(Error::config_validation(
                "scan.tick_interval_ms must be greater than 0",
            ));
        }

        if self.scan.duration_ms < self.scan.tick_interval_ms {
            return Err(Error::config_validation(format!(
                "scan.duration_ms ({}) cannot be less than scan.tick_interval_ms ({})",
                self.scan.duration_ms, self.scan.tick_interval_ms
            )));
        }

        if self.auth.session_ttl_minutes == 0 {
            return Err(Error::config_validation(
                "auth.session_ttl_minutes must be greater than 0",
            ));
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Scan timing.
    #[must_use]
    pub fn scan_timing(&self) -> ScanTiming {
        ScanTiming {
            duration: Duration::from_millis(self.scan.duration_ms),
            tick_interval: Duration::from_millis(self.scan.tick_interval_ms),
        }
    }

    /// How long a login stays valid.
    #[must_use]
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.auth.session_ttl_minutes))
    }
}
