//! # Billing Configuration
//!
//! Configuration for the persistence layer and the numbering policy.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                            │
//! │     BATIFLOW_DB_PATH=/srv/batiflow/billing.db                           │
//! │     BATIFLOW_NUMBERING=sequential                                       │
//! │                                                                         │
//! │  2. TOML Config File                                                    │
//! │     ~/.config/batiflow/billing.toml (Linux)                             │
//! │     ~/Library/Application Support/com.batiflow.batiflow/billing.toml    │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                    │
//! │     sequential numbering, 30 % deposit, no discount                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "/srv/batiflow/billing.db"
//! max_connections = 5
//!
//! [billing]
//! account_id = "00000000-0000-0000-0000-000000000001"
//! numbering = "sequential"   # sequential | random
//! deposit_value = 30.0
//! deposit_type = "percent"   # percent | fixed
//! discount_value = 0.0
//! discount_type = "percent"
//! ```

use batiflow_core::validation::{validate_settings, validate_uuid};
use batiflow_core::{AmountType, GlobalSettings, ValidationError, DEFAULT_ACCOUNT_ID};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::pool::DbConfig;

/// File name of the config file inside the platform config dir.
pub const CONFIG_FILE_NAME: &str = "billing.toml";

/// File name of the database inside the platform data dir.
pub const DATABASE_FILE_NAME: &str = "batiflow.db";

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to write config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Invalid configuration: {0}")]
    Validation(#[from] ValidationError),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Numbering Strategy
// =============================================================================

/// How new document numbers are allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberingStrategy {
    /// Per-account, per-type, per-month counter stored in SQLite.
    #[default]
    Sequential,
    /// Random 4-digit suffix, as documents were numbered before sequences.
    Random,
}

impl std::fmt::Display for NumberingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NumberingStrategy::Sequential => write!(f, "sequential"),
            NumberingStrategy::Random => write!(f, "random"),
        }
    }
}

impl std::str::FromStr for NumberingStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sequential" | "sequence" => Ok(NumberingStrategy::Sequential),
            "random" | "legacy" => Ok(NumberingStrategy::Random),
            other => Err(ConfigError::Invalid(format!(
                "Unknown numbering strategy: '{}'. Valid options: sequential, random",
                other
            ))),
        }
    }
}

// =============================================================================
// Sections
// =============================================================================

/// `[database]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. Defaults to the platform data dir.
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: None,
            max_connections: default_max_connections(),
        }
    }
}

/// `[billing]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingSettings {
    /// Account whose numbering sequences are used.
    #[serde(default = "default_account_id")]
    pub account_id: String,

    #[serde(default)]
    pub numbering: NumberingStrategy,

    /// Deposit settings given to new documents.
    #[serde(default = "default_deposit_value")]
    pub deposit_value: f64,
    #[serde(default)]
    pub deposit_type: AmountType,

    /// Discount settings given to new documents.
    #[serde(default)]
    pub discount_value: f64,
    #[serde(default)]
    pub discount_type: AmountType,
}

fn default_account_id() -> String {
    DEFAULT_ACCOUNT_ID.to_string()
}

fn default_deposit_value() -> f64 {
    GlobalSettings::default().down_payment_value
}

impl Default for BillingSettings {
    fn default() -> Self {
        let settings = GlobalSettings::default();
        BillingSettings {
            account_id: default_account_id(),
            numbering: NumberingStrategy::default(),
            deposit_value: settings.down_payment_value,
            deposit_type: settings.down_payment_type,
            discount_value: settings.discount_value,
            discount_type: settings.discount_type,
        }
    }
}

impl BillingSettings {
    /// Settings attached to freshly created documents.
    pub fn default_settings(&self) -> GlobalSettings {
        GlobalSettings {
            down_payment_value: self.deposit_value,
            down_payment_type: self.deposit_type,
            discount_value: self.discount_value,
            discount_type: self.discount_type,
        }
    }
}

// =============================================================================
// Billing Configuration
// =============================================================================

/// Complete configuration of the persistence layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BillingConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub billing: BillingSettings,
}

impl BillingConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (billing.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading billing config from file");
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

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ConfigError::Invalid("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Billing config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        validate_uuid(&self.billing.account_id)?;
        validate_settings(&self.billing.default_settings())?;

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "max_connections must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies `BATIFLOW_*` overrides read through `lookup`.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("BATIFLOW_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(max) = lookup("BATIFLOW_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(max) => self.database.max_connections = max,
                Err(_) => warn!(value = %max, "Ignoring invalid BATIFLOW_MAX_CONNECTIONS"),
            }
        }

        if let Some(id) = lookup("BATIFLOW_ACCOUNT_ID") {
            debug!(account_id = %id, "Overriding account ID from environment");
            self.billing.account_id = id;
        }

        if let Some(strategy) = lookup("BATIFLOW_NUMBERING") {
            match strategy.parse() {
                Ok(parsed) => self.billing.numbering = parsed,
                Err(_) => warn!(value = %strategy, "Unknown numbering strategy in environment"),
            }
        }
    }

    fn project_dirs() -> Option<directories::ProjectDirs> {
        directories::ProjectDirs::from("com", "batiflow", "batiflow")
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Configured database path, else the platform data dir.
    pub fn database_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .or_else(|| Self::project_dirs().map(|dirs| dirs.data_dir().join(DATABASE_FILE_NAME)))
            .unwrap_or_else(|| PathBuf::from(DATABASE_FILE_NAME))
    }

    /// Builds the pool configuration.
    pub fn to_db_config(&self) -> DbConfig {
        DbConfig::new(self.database_path())
            .max_connections(self.database.max_connections)
            .account_id(self.billing.account_id.clone())
            .numbering(self.billing.numbering)
            .default_settings(self.billing.default_settings())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = BillingConfig::default();
        assert_eq!(config.billing.account_id, DEFAULT_ACCOUNT_ID);
        assert_eq!(config.billing.numbering, NumberingStrategy::Sequential);
        assert_eq!(config.billing.default_settings(), GlobalSettings::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_numbering_strategy_parsing() {
        assert_eq!(
            "sequential".parse::<NumberingStrategy>().unwrap(),
            NumberingStrategy::Sequential
        );
        assert_eq!(
            "Random".parse::<NumberingStrategy>().unwrap(),
            NumberingStrategy::Random
        );
        assert!("hex".parse::<NumberingStrategy>().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &path,
            r#"
            [database]
            path = "/srv/batiflow/billing.db"

            [billing]
            numbering = "random"
            deposit_value = 500.0
            deposit_type = "fixed"
            "#,
        )
        .unwrap();

        let config = BillingConfig::load(Some(path)).unwrap();
        assert_eq!(config.database_path(), PathBuf::from("/srv/batiflow/billing.db"));
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.billing.numbering, NumberingStrategy::Random);

        let settings = config.billing.default_settings();
        assert_eq!(settings.down_payment_value, 500.0);
        assert_eq!(settings.down_payment_type, AmountType::Fixed);
        assert_eq!(settings.discount_value, 0.0);
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);

        std::fs::write(&path, "[billing]\ndeposit_value = 140.0\n").unwrap();
        assert!(matches!(
            BillingConfig::load(Some(path.clone())),
            Err(ConfigError::Validation(_))
        ));

        std::fs::write(&path, "[billing\n").unwrap();
        assert!(matches!(
            BillingConfig::load(Some(path)),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("BATIFLOW_DB_PATH", "/tmp/override.db"),
            ("BATIFLOW_NUMBERING", "random"),
            ("BATIFLOW_MAX_CONNECTIONS", "not-a-number"),
        ]);

        let mut config = BillingConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.database_path(), PathBuf::from("/tmp/override.db"));
        assert_eq!(config.billing.numbering, NumberingStrategy::Random);
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);

        let mut config = BillingConfig::default();
        config.billing.discount_value = 5.0;
        config.save(Some(path.clone())).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[billing]"));

        let loaded = BillingConfig::load(Some(path)).unwrap();
        assert_eq!(loaded.billing.discount_value, 5.0);
    }
}
