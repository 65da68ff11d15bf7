//! Configuration management with validation and defaults
//!
//! Settings come from an optional TOML file, then `HOOPSHOT_*` environment
//! variables, and are validated before use.

use crate::errors::{ConfigurationError, HoopshotResult};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level client configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HoopshotConfig {
    pub game: GameConfig,
    pub timing: TimingConfig,
    pub storage: StorageConfig,
    pub notifier: NotifierConfig,
    pub monitoring: MonitoringConfig,
}

/// Game rules and stake shortcuts
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Game identifier passed to the host game surface
    pub game_short_name: String,
    /// Currency label used in result messages
    pub currency: String,
    pub win_coefficient: Decimal,
    pub lose_coefficient: Decimal,
    /// Preset stake shortcuts offered next to the stake input
    pub preset_amounts: Vec<Decimal>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            game_short_name: "basketball".to_string(),
            currency: "USDT".to_string(),
            win_coefficient: dec!(1.8),
            lose_coefficient: Decimal::ZERO,
            preset_amounts: vec![dec!(1), dec!(5), dec!(10), dec!(50)],
        }
    }
}

/// Resolver timing contract (milliseconds)
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// How long the scored/missed state is held before a round resolves
    pub presentation_delay_ms: u64,
    /// Wait after dispatching a game request to the relay
    pub relay_dispatch_delay_ms: u64,
    /// Local simulation "throw" time
    pub simulation_throw_delay_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            presentation_delay_ms: 2_000,
            relay_dispatch_delay_ms: 1_000,
            simulation_throw_delay_ms: 1_500,
        }
    }
}

impl TimingConfig {
    pub fn presentation_delay(&self) -> Duration {
        Duration::from_millis(self.presentation_delay_ms)
    }

    pub fn relay_dispatch_delay(&self) -> Duration {
        Duration::from_millis(self.relay_dispatch_delay_ms)
    }

    pub fn simulation_throw_delay(&self) -> Duration {
        Duration::from_millis(self.simulation_throw_delay_ms)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    RocksDb,
    Memory,
}

/// Balance persistence settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub data_directory: String,
    /// Balance records are stored under `{key_prefix}{user_id}`
    pub key_prefix: String,
    /// fsync every balance commit
    pub sync_writes: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::RocksDb,
            data_directory: "./DB/balances".to_string(),
            key_prefix: "balance_".to_string(),
            sync_writes: true,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    pub enabled: bool,
    /// Action tag carried by every settlement report
    pub action: String,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            action: "place_bet".to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub log_level: LogLevel,
    pub enable_metrics: bool,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            enable_metrics: true,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Directive string for `tracing_subscriber::EnvFilter`
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

impl HoopshotConfig {
    /// In-memory storage and zero delays, for tests and dry runs
    pub fn testing() -> Self {
        Self {
            timing: TimingConfig {
                presentation_delay_ms: 0,
                relay_dispatch_delay_ms: 0,
                simulation_throw_delay_ms: 0,
            },
            storage: StorageConfig {
                backend: StorageBackend::Memory,
                sync_writes: false,
                ..Default::default()
            },
            monitoring: MonitoringConfig {
                log_level: LogLevel::Debug,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Durable RocksDB storage with the full presentation timing
    pub fn production() -> Self {
        Self {
            storage: StorageConfig {
                backend: StorageBackend::RocksDb,
                data_directory: "./DB/balances".to_string(),
                sync_writes: true,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Validate configuration for logical consistency
    pub fn validate(&self) -> HoopshotResult<()> {
        if self.game.win_coefficient <= Decimal::ONE {
            return Err(invalid(
                "game.win_coefficient",
                self.game.win_coefficient,
                "Win coefficient must be greater than 1",
            ));
        }

        if self.game.lose_coefficient.is_sign_negative() {
            return Err(invalid(
                "game.lose_coefficient",
                self.game.lose_coefficient,
                "Lose coefficient cannot be negative",
            ));
        }

        if self.game.preset_amounts.is_empty() {
            return Err(ConfigurationError::MissingRequired("game.preset_amounts".to_string()).into());
        }

        if let Some(bad) = self.game.preset_amounts.iter().find(|a| **a <= Decimal::ZERO) {
            return Err(invalid(
                "game.preset_amounts",
                bad,
                "Preset amounts must be positive",
            ));
        }

        if self.game.game_short_name.is_empty() {
            return Err(ConfigurationError::MissingRequired("game.game_short_name".to_string()).into());
        }

        if self.storage.key_prefix.is_empty() {
            return Err(ConfigurationError::MissingRequired("storage.key_prefix".to_string()).into());
        }

        if self.storage.backend == StorageBackend::RocksDb && self.storage.data_directory.is_empty() {
            return Err(ConfigurationError::MissingRequired("storage.data_directory".to_string()).into());
        }

        Ok(())
    }
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> crate::errors::HoopshotError {
    ConfigurationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

/// Configuration loader with environment variable support
#[derive(Default)]
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Set the configuration file path
    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Load configuration from file and environment variables
    pub fn load(&self) -> HoopshotResult<HoopshotConfig> {
        self.load_with_env(|key| std::env::var(key).ok())
    }

    /// Same as [`load`](Self::load) with an explicit variable lookup
    pub fn load_with_env<F>(&self, lookup: F) -> HoopshotResult<HoopshotConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match self.config_path {
            Some(ref path) => Self::load_from_file(path)?,
            None => HoopshotConfig::default(),
        };

        apply_overrides(&mut config, lookup)?;
        config.validate()?;

        Ok(config)
    }

    fn load_from_file(path: &Path) -> HoopshotResult<HoopshotConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigurationError::LoadFailed(format!("Failed to read {}: {}", path.display(), e))
        })?;

        toml::from_str(&content)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to parse TOML: {}", e)).into())
    }

    /// Save configuration to file
    pub fn save(&self, config: &HoopshotConfig, path: &Path) -> HoopshotResult<()> {
        let toml_string = toml::to_string_pretty(config).map_err(|e| {
            ConfigurationError::SaveFailed(format!("Failed to serialize config: {}", e))
        })?;

        std::fs::write(path, toml_string).map_err(|e| {
            ConfigurationError::SaveFailed(format!("Failed to write to {}: {}", path.display(), e))
                .into()
        })
    }
}

fn apply_overrides<F>(config: &mut HoopshotConfig, lookup: F) -> HoopshotResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(dir) = lookup("HOOPSHOT_DATA_DIR") {
        config.storage.data_directory = dir;
    }

    if let Some(backend) = lookup("HOOPSHOT_STORAGE_BACKEND") {
        config.storage.backend = match backend.to_ascii_lowercase().as_str() {
            "rocksdb" => StorageBackend::RocksDb,
            "memory" => StorageBackend::Memory,
            _ => {
                return Err(invalid(
                    "HOOPSHOT_STORAGE_BACKEND",
                    backend,
                    "Expected 'rocksdb' or 'memory'",
                ))
            }
        };
    }

    if let Some(delay) = lookup("HOOPSHOT_PRESENTATION_DELAY_MS") {
        config.timing.presentation_delay_ms = delay
            .parse()
            .map_err(|_| invalid("HOOPSHOT_PRESENTATION_DELAY_MS", &delay, "Invalid delay value"))?;
    }

    if let Some(enabled) = lookup("HOOPSHOT_NOTIFIER_ENABLED") {
        config.notifier.enabled = enabled
            .parse()
            .map_err(|_| invalid("HOOPSHOT_NOTIFIER_ENABLED", &enabled, "Invalid boolean value"))?;
    }

    if let Some(level) = lookup("HOOPSHOT_LOG_LEVEL") {
        config.monitoring.log_level = level
            .parse()
            .map_err(|reason: String| invalid("HOOPSHOT_LOG_LEVEL", &level, &reason))?;
    }

    Ok(())
}

/// Generate a sample configuration file
pub fn generate_sample_config(path: &Path) -> HoopshotResult<()> {
    ConfigLoader::new().save(&HoopshotConfig::default(), path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config_is_valid() {
        let config = HoopshotConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.game.win_coefficient, dec!(1.8));
        assert_eq!(config.game.lose_coefficient, Decimal::ZERO);
        assert_eq!(config.timing.presentation_delay(), Duration::from_secs(2));
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(HoopshotConfig::testing().validate().is_ok());
        assert!(HoopshotConfig::production().validate().is_ok());
        assert_eq!(HoopshotConfig::testing().storage.backend, StorageBackend::Memory);
    }

    #[test]
    fn test_invalid_config_validation() {
        let mut config = HoopshotConfig::default();
        config.game.win_coefficient = dec!(0.9);
        assert!(config.validate().is_err());

        let mut config = HoopshotConfig::default();
        config.game.preset_amounts = vec![dec!(5), dec!(0)];
        assert!(config.validate().is_err());

        let mut config = HoopshotConfig::default();
        config.storage.key_prefix.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("HOOPSHOT_STORAGE_BACKEND", "memory"),
            ("HOOPSHOT_PRESENTATION_DELAY_MS", "250"),
            ("HOOPSHOT_LOG_LEVEL", "WARN"),
        ]
        .into_iter()
        .collect();

        let config = ConfigLoader::new()
            .load_with_env(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.timing.presentation_delay_ms, 250);
        assert_eq!(config.monitoring.log_level, LogLevel::Warn);
    }

    #[test]
    fn test_bad_env_override_is_rejected() {
        let result = ConfigLoader::new().load_with_env(|k| {
            (k == "HOOPSHOT_NOTIFIER_ENABLED").then(|| "maybe".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_save_and_load_config() -> HoopshotResult<()> {
        let temp_file = NamedTempFile::new().unwrap();

        let mut original = HoopshotConfig::default();
        original.game.preset_amounts = vec![dec!(2.5), dec!(20)];
        ConfigLoader::new().save(&original, temp_file.path())?;

        let loaded = ConfigLoader::new()
            .with_path(temp_file.path())
            .load_with_env(|_| None)?;

        assert_eq!(loaded.game.preset_amounts, original.game.preset_amounts);
        assert_eq!(loaded.game.win_coefficient, original.game.win_coefficient);
        assert_eq!(loaded.storage.key_prefix, "balance_");

        Ok(())
    }
}
