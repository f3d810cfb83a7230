//! Configuration management for carecode.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::code::{MAX_CODE_LENGTH, PERMANENT_CODE_LENGTH};
use crate::error::{Error, Result};
use crate::grant::AccessScope;
use crate::ratelimit::LimiterConfig;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "carecode";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "carecode.db";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `CARECODE_`)
/// 2. TOML config file at `~/.config/carecode/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Sharing (issue/extend) configuration.
    pub sharing: SharingConfig,
    /// Validation (redeem) configuration.
    pub validation: ValidationConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/carecode/carecode.db`
    pub database_path: Option<PathBuf>,
}

/// Sharing-related configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SharingConfig {
    /// Length of random temporary codes.
    pub code_length: usize,
    /// Expiry applied when the caller doesn't specify one, in days.
    pub default_expiry_days: i64,
    /// Upper bound on expiry and extension, in days.
    pub max_expiry_days: i64,
    /// Bound on the code-generation collision retry loop.
    pub max_code_attempts: u32,
}

/// Validation-related configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Corroborate personal info for global-scope grants.
    pub corroborate_global: bool,
    /// Corroborate personal info for institution-scope grants.
    pub corroborate_institution: bool,
    /// Corroborate personal info for personal-scope grants.
    pub corroborate_personal: bool,
    /// Enable the failed-attempt limiter.
    pub rate_limit_enabled: bool,
    /// Failed attempts allowed per caller within the window.
    pub max_failed_attempts: u32,
    /// Sliding-window length for the attempt limiter, in seconds.
    pub attempt_window_secs: u64,
}

impl Default for SharingConfig {
    fn default() -> Self {
        Self {
            code_length: 8,
            default_expiry_days: 30,
            max_expiry_days: 365,
            max_code_attempts: 5,
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            corroborate_global: false,
            corroborate_institution: true,
            corroborate_personal: true,
            rate_limit_enabled: true,
            max_failed_attempts: 10,
            attempt_window_secs: 300,
        }
    }
}

impl ValidationConfig {
    /// Whether grants of the given scope require personal-info
    /// corroboration before releasing the snapshot.
    #[must_use]
    pub fn corroboration_required(&self, scope: AccessScope) -> bool {
        match scope {
            AccessScope::Global => self.corroborate_global,
            AccessScope::Institution => self.corroborate_institution,
            AccessScope::Personal => self.corroborate_personal,
        }
    }

    /// Build the attempt-limiter configuration.
    #[must_use]
    pub fn limiter_config(&self) -> LimiterConfig {
        LimiterConfig {
            enabled: self.rate_limit_enabled,
            max_failures: self.max_failed_attempts,
            window_secs: self.attempt_window_secs,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. TOML config file (if exists)
    /// 3. Environment variables (prefixed with `CARECODE_`)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file).nested())
            .merge(Env::prefixed("CARECODE_").split("_"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
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
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.sharing.code_length < PERMANENT_CODE_LENGTH
            || self.sharing.code_length > MAX_CODE_LENGTH
        {
            return Err(Error::ConfigValidation {
                message: format!(
                    "code_length ({}) must be between {PERMANENT_CODE_LENGTH} and {MAX_CODE_LENGTH}",
                    self.sharing.code_length
                ),
            });
        }

        if self.sharing.default_expiry_days < 1 {
            return Err(Error::ConfigValidation {
                message: "default_expiry_days must be at least 1".to_string(),
            });
        }

        if self.sharing.default_expiry_days > self.sharing.max_expiry_days {
            return Err(Error::ConfigValidation {
                message: format!(
                    "default_expiry_days ({}) cannot be greater than max_expiry_days ({})",
                    self.sharing.default_expiry_days, self.sharing.max_expiry_days
                ),
            });
        }

        if self.sharing.max_code_attempts == 0 {
            return Err(Error::ConfigValidation {
                message: "max_code_attempts must be greater than 0".to_string(),
            });
        }

        if self.validation.attempt_window_secs == 0 {
            return Err(Error::ConfigValidation {
                message: "attempt_window_secs must be greater than 0".to_string(),
            });
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
}
