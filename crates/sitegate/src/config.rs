//! Configuration management for sitegate.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::compliance::InactiveEntryPolicy;
use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "sitegate";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "sitegate.db";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `SITEGATE_`)
/// 2. TOML config file at `~/.config/sitegate/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// RAMS reading gate configuration.
    pub rams: RamsConfig,
    /// Compliance aggregation configuration.
    pub compliance: ComplianceConfig,
    /// Qualification expiry configuration.
    pub qualifications: QualificationsConfig,
    /// Change event configuration.
    pub events: EventsConfig,
    /// User record configuration.
    pub users: UsersConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/sitegate/sitegate.db`
    pub database_path: Option<PathBuf>,
}

/// RAMS reading gate configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RamsConfig {
    /// Interval between reading timer ticks in milliseconds.
    pub tick_interval_ms: u64,
    /// Require the reader to scroll through the document before confirming.
    pub require_scroll: bool,
    /// Fraction of the content height that counts as scrolled through.
    pub scroll_threshold: f64,
    /// Allow the reader to fast-forward the timer to the minimum read time.
    /// Skipped readings are flagged on the stored signature.
    pub allow_skip_to_minimum: bool,
    /// Maximum accepted signature image size in bytes.
    pub max_signature_bytes: usize,
}

/// Compliance aggregation configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplianceConfig {
    /// How expired and superseded register entries count towards compliance.
    pub inactive_entries: InactiveEntryPolicy,
}

/// Qualification expiry configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualificationsConfig {
    /// Days before expiry at which a qualification is flagged as expiring soon.
    pub expiry_warning_days: u32,
}

/// Change event configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Number of events buffered per subscriber before it starts lagging.
    pub channel_capacity: usize,
}

/// User record configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsersConfig {
    /// Pattern user emails must match (regex).
    pub email_pattern: String,
}

impl Default for RamsConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            require_scroll: false,
            scroll_threshold: 0.9,
            allow_skip_to_minimum: false,
            max_signature_bytes: 512 * 1024,
        }
    }
}

impl Default for QualificationsConfig {
    fn default() -> Self {
        Self {
            expiry_warning_days: 30,
        }
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
        }
    }
}

impl Default for UsersConfig {
    fn default() -> Self {
        Self {
            email_pattern: default_email_pattern(),
        }
    }
}

/// Default pattern for user emails.
fn default_email_pattern() -> String {
    r"^[^@\s]+@[^@\s]+\.[^@\s]+$".to_string()
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. TOML config file (if exists)
    /// 3. Environment variables (prefixed with `SITEGATE_`)
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
            .merge(Env::prefixed("SITEGATE_").split("__"));

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
        if self.rams.tick_interval_ms == 0 {
            return Err(Error::ConfigValidation {
                message: "tick_interval_ms must be greater than 0".to_string(),
            });
        }

        if !(self.rams.scroll_threshold > 0.0 && self.rams.scroll_threshold <= 1.0) {
            return Err(Error::ConfigValidation {
                message: format!(
                    "scroll_threshold ({}) must be within (0, 1]",
                    self.rams.scroll_threshold
                ),
            });
        }

        if self.rams.max_signature_bytes == 0 {
            return Err(Error::ConfigValidation {
                message: "max_signature_bytes must be greater than 0".to_string(),
            });
        }

        if self.events.channel_capacity == 0 {
            return Err(Error::ConfigValidation {
                message: "channel_capacity must be greater than 0".to_string(),
            });
        }

        if regex::Regex::new(&self.users.email_pattern).is_err() {
            return Err(Error::ConfigValidation {
                message: format!("invalid regex pattern: {}", self.users.email_pattern),
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

    /// Get the reading timer tick interval as a Duration.
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.rams.tick_interval_ms)
    }

    /// Get the qualification warning window as a chrono Duration.
    #[must_use]
    pub fn expiry_warning(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.qualifications.expiry_warning_days))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(!config.rams.require_scroll);
        assert!(!config.rams.allow_skip_to_minimum);
        assert_eq!(
            config.compliance.inactive_entries,
            InactiveEntryPolicy::Exclude
        );
    }

    #[test]
    fn test_default_rams_config() {
        let rams = RamsConfig::default();

        assert_eq!(rams.tick_interval_ms, 1000);
        assert!((rams.scroll_threshold - 0.9).abs() < f64::EPSILON);
        assert_eq!(rams.max_signature_bytes, 512 * 1024);
    }

    #[test]
    fn test_default_storage_config() {
        let storage = StorageConfig::default();
        assert!(storage.database_path.is_none());
    }

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_tick_interval() {
        let mut config = Config::default();
        config.rams.tick_interval_ms = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("tick_interval_ms"));
    }

    #[test]
    fn test_validate_scroll_threshold_out_of_range() {
        let mut config = Config::default();
        config.rams.scroll_threshold = 1.5;
        assert!(config.validate().is_err());

        config.rams.scroll_threshold = 0.0;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("scroll_threshold"));
    }

    #[test]
    fn test_validate_zero_channel_capacity() {
        let mut config = Config::default();
        config.events.channel_capacity = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("channel_capacity"));
    }

    #[test]
    fn test_validate_invalid_email_regex() {
        let mut config = Config::default();
        config.users.email_pattern = "[invalid".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("invalid regex"));
    }

    #[test]
    fn test_default_email_pattern_accepts_plain_address() {
        let re = regex::Regex::new(&default_email_pattern()).unwrap();
        assert!(re.is_match("site.manager@example.co.uk"));
        assert!(!re.is_match("not an email"));
    }

    #[test]
    fn test_database_path_default() {
        let config = Config::default();
        assert!(config
            .database_path()
            .to_string_lossy()
            .contains("sitegate.db"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::from("/custom/path/db.sqlite"));

        assert_eq!(
            config.database_path(),
            PathBuf::from("/custom/path/db.sqlite")
        );
    }

    #[test]
    fn test_tick_interval() {
        let config = Config::default();
        assert_eq!(config.tick_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_expiry_warning() {
        let config = Config::default();
        assert_eq!(config.expiry_warning(), chrono::Duration::days(30));
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("sitegate"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        let result = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml")));
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), Config::default());
    }

    #[test]
    fn test_compliance_config_deserialize() {
        let json = r#"{"inactive_entries": "count_as_outstanding"}"#;
        let compliance: ComplianceConfig = serde_json::from_str(json).unwrap();
        assert_eq!(
            compliance.inactive_entries,
            InactiveEntryPolicy::CountAsOutstanding
        );
    }

    #[test]
    fn test_rams_config_serialize() {
        let json = serde_json::to_string(&RamsConfig::default()).unwrap();
        assert!(json.contains("allow_skip_to_minimum"));
    }
}
