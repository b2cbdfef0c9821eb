//! Configuration loading and config file resolution
//!
//! Bootstrap configuration comes from a TOML file. Every field has a
//! built-in default, so a missing file (or a file with only some sections)
//! still yields a usable configuration.
//!
//! Config file resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. `SMP_CONFIG` environment variable
//! 3. `<config_dir>/smp/config.toml`
//! 4. Built-in defaults (no file)

use crate::logging::LogLevel;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "SMP_CONFIG";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub playback: PlaybackConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Media server connection settings
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// Transport endpoint (e.g. `sim://localhost:1935`)
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Upper bound for one connect attempt
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

/// Playback engine settings
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PlaybackConfig {
    /// Tick interval in milliseconds (clamped by the engine to 100-1000)
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Wrap to the other end of the playlist instead of ending it
    #[serde(default)]
    pub wrap_playlist: bool,

    /// Volume on startup (0-100)
    #[serde(default = "default_initial_volume")]
    pub initial_volume: u8,

    /// Display name of the playlist
    #[serde(default = "default_playlist_name")]
    pub playlist_name: String,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (none, error, warning, info, debug, trace)
    #[serde(default)]
    pub level: LogLevel,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_endpoint() -> String {
    "sim://localhost:1935".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    5000
}

fn default_tick_interval_ms() -> u64 {
    250
}

fn default_initial_volume() -> u8 {
    75
}

fn default_playlist_name() -> String {
    "default".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            wrap_playlist: false,
            initial_volume: default_initial_volume(),
            playlist_name: default_playlist_name(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            file: None,
        }
    }
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Resolve the config file and load it, falling back to defaults
    ///
    /// A missing file is not fatal: a warning is logged and built-in
    /// defaults are used. A file that exists but fails to parse is an error.
    pub fn load_or_default(cli_path: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        let resolver = ConfigResolver::new();
        match resolver.resolve(cli_path) {
            Some(path) if path.exists() => {
                let config = Self::load(&path)?;
                info!("Loaded configuration from {}", path.display());
                Ok((config, Some(path)))
            }
            Some(path) => {
                warn!(
                    "Config file {} not found, using built-in defaults",
                    path.display()
                );
                Ok((Self::default(), None))
            }
            None => Ok((Self::default(), None)),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.playback.initial_volume > 100 {
            return Err(Error::Config(format!(
                "playback.initial_volume must be 0-100, got {}",
                self.playback.initial_volume
            )));
        }
        if self.server.endpoint.trim().is_empty() {
            return Err(Error::Config("server.endpoint must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Locates the config file following the priority order
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    env_var_name: String,
}

impl ConfigResolver {
    pub fn new() -> Self {
        Self {
            env_var_name: CONFIG_ENV_VAR.to_string(),
        }
    }

    /// Returns the path that should be loaded, if any candidate applies
    ///
    /// The CLI path and env path are returned even if they do not exist, so
    /// the caller can warn about them. The platform default is only returned
    /// when the file is present.
    pub fn resolve(&self, cli_path: Option<&Path>) -> Option<PathBuf> {
        // Priority 1: Command-line argument
        if let Some(path) = cli_path {
            return Some(path.to_path_buf());
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(&self.env_var_name) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        // Priority 3: Platform config directory
        default_config_path().filter(|path| path.exists())
    }
}

impl Default for ConfigResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// `<config_dir>/smp/config.toml` for the current platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("smp").join("config.toml"))
}
