//! Configuration loading and database path resolution
//!
//! Settings resolve in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! Command-line and environment values arrive together through clap's `env`
//! fallbacks; this module merges them with the TOML file and defaults.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 5780;

/// Default bind address
pub const DEFAULT_BIND: &str = "127.0.0.1";

/// Environment variable naming a config file
pub const CONFIG_ENV_VAR: &str = "SALON_CONFIG";

/// Contents of the optional TOML config file
///
/// Every field is optional; missing fields fall through to defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub port: Option<u16>,
    pub bind: Option<String>,
    pub database_path: Option<PathBuf>,
    pub admin_secret: Option<String>,
    #[serde(default)]
    pub secure_cookies: bool,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error or an EnvFilter directive)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Values supplied on the command line or via environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub port: Option<u16>,
    pub bind: Option<String>,
    pub database_path: Option<PathBuf>,
    pub admin_secret: Option<String>,
    pub config_file: Option<PathBuf>,
}

/// Where the TOML layer came from
///
/// Resolution runs before logging is initialized, so the caller reports this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Loaded from this file
    File(PathBuf),
    /// Looked for this file but it does not exist; defaults used
    Missing(PathBuf),
    /// No config directory on this platform
    Defaults,
}

/// Fully resolved server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub bind: String,
    pub database_path: PathBuf,
    /// `None` means no secret was configured; one is generated and stored
    pub admin_secret: Option<String>,
    pub secure_cookies: bool,
    pub log_level: String,
    pub source: ConfigSource,
}

impl ServerConfig {
    /// Merge overrides, TOML file and compiled defaults
    ///
    /// A missing config file is not an error (defaults are used and the
    /// source says so). A config file that exists but cannot be parsed is.
    pub fn resolve(overrides: Overrides) -> Result<Self> {
        let (toml_config, source) = match overrides.config_file.clone().or_else(default_config_file) {
            Some(path) if path.exists() => (load_toml_config(&path)?, ConfigSource::File(path)),
            Some(path) => (TomlConfig::default(), ConfigSource::Missing(path)),
            None => (TomlConfig::default(), ConfigSource::Defaults),
        };

        let mut config = Self::merge(overrides, toml_config);
        config.source = source;
        Ok(config)
    }

    /// Merge without touching the filesystem
    pub fn merge(overrides: Overrides, toml_config: TomlConfig) -> Self {
        let admin_secret = overrides
            .admin_secret
            .or(toml_config.admin_secret)
            .filter(|s| !s.is_empty());

        ServerConfig {
            port: overrides.port.or(toml_config.port).unwrap_or(DEFAULT_PORT),
            bind: overrides
                .bind
                .or(toml_config.bind)
                .unwrap_or_else(|| DEFAULT_BIND.to_string()),
            database_path: overrides
                .database_path
                .or(toml_config.database_path)
                .unwrap_or_else(default_database_path),
            admin_secret,
            secure_cookies: toml_config.secure_cookies,
            log_level: toml_config.logging.level,
            source: ConfigSource::Defaults,
        }
    }

    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str::<TomlConfig>(&content)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
}

/// Default config file location for the platform
///
/// `SALON_CONFIG` wins; otherwise `<config_dir>/salon/config.toml`.
pub fn default_config_file() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|d| d.join("salon").join("config.toml"))
}

/// OS-dependent default database path
pub fn default_database_path() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/salon (or /var/lib/salon for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("salon"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/salon"))
            .join("salon.db")
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("salon"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/salon"))
            .join("salon.db")
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("salon"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\salon"))
            .join("salon.db")
    } else {
        PathBuf::from("./salon_data/salon.db")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_nothing_supplied() {
        let config = ServerConfig::merge(Overrides::default(), TomlConfig::default());
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.bind, DEFAULT_BIND);
        assert!(config.database_path.ends_with("salon.db"));
        assert!(config.admin_secret.is_none());
        assert_eq!(config.log_level, "info");
        assert!(!config.secure_cookies);
    }

    #[test]
    fn test_overrides_beat_toml() {
        let toml_config: TomlConfig = toml::from_str(
            r#"
            port = 6000
            bind = "0.0.0.0"
            admin_secret = "from-file"
            secure_cookies = true

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        let overrides = Overrides {
            port: Some(7000),
            admin_secret: Some("from-cli".to_string()),
            ..Default::default()
        };

        let config = ServerConfig::merge(overrides, toml_config);
        assert_eq!(config.port, 7000);
        assert_eq!(config.bind, "0.0.0.0");
        assert_eq!(config.admin_secret.as_deref(), Some("from-cli"));
        assert!(config.secure_cookies);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.socket_addr(), "0.0.0.0:7000");
    }

    #[test]
    fn test_empty_admin_secret_counts_as_unset() {
        let overrides = Overrides {
            admin_secret: Some(String::new()),
            ..Default::default()
        };
        let config = ServerConfig::merge(overrides, TomlConfig::default());
        assert!(config.admin_secret.is_none());
    }
}
