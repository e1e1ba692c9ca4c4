//! Configuration loading and root folder resolution
//!
//! Settings come from, in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing or unreadable TOML file is not fatal: the service logs a
//! warning and starts on defaults.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Default HTTP port for the session coordinator
pub const DEFAULT_PORT: u16 = 5760;

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "wkune.db";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    /// Root folder holding the database
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Explicit database path (overrides `<root_folder>/wkune.db`)
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// HTTP server port
    #[serde(default)]
    pub port: Option<u16>,

    /// HTTP bind address
    #[serde(default)]
    pub bind_address: Option<String>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Session policy (timeouts, expiry)
    #[serde(default)]
    pub policy: PolicyConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
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

/// Session policy knobs
///
/// Defaults: auto-ready after 2 minutes of silence, creator considered
/// connected for 30 seconds after last contact, sessions purged after 7 days
/// of inactivity.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyConfig {
    /// Seconds without contact after which a not-ready member counts as ready
    #[serde(default = "default_auto_ready_timeout_secs")]
    pub auto_ready_timeout_secs: u64,

    /// Seconds after last contact during which the creator counts as connected
    #[serde(default = "default_creator_presence_secs")]
    pub creator_presence_secs: u64,

    /// Days of inactivity before a session may be purged
    #[serde(default = "default_session_expiry_days")]
    pub session_expiry_days: u64,

    /// Interval of the background expiry sweep (0 disables the sweep)
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,

    /// Event bus channel capacity
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            auto_ready_timeout_secs: default_auto_ready_timeout_secs(),
            creator_presence_secs: default_creator_presence_secs(),
            session_expiry_days: default_session_expiry_days(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl PolicyConfig {
    /// Reject values that would make the barriers meaningless
    pub fn validate(&self) -> Result<()> {
        if self.session_expiry_days == 0 {
            return Err(Error::Config(
                "policy.session_expiry_days must be at least 1".to_string(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(Error::Config(
                "policy.event_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_auto_ready_timeout_secs() -> u64 {
    120
}

fn default_creator_presence_secs() -> u64 {
    30
}

fn default_session_expiry_days() -> u64 {
    7
}

fn default_cleanup_interval_secs() -> u64 {
    3600
}

fn default_event_capacity() -> usize {
    1000
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.policy.validate()?;
        Ok(config)
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load the platform config file, falling back to defaults
    ///
    /// Parse errors are reported; a missing file is not.
    pub fn load_or_default() -> Result<Self> {
        match load_config_file() {
            Ok(path) => Self::load_from(&path),
            Err(e) => {
                warn!("{}; using built-in defaults", e);
                Ok(Self::default())
            }
        }
    }
}

/// Root folder resolution in priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    toml: &TomlConfig,
) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(root_folder) = &toml.root_folder {
        return root_folder.clone();
    }

    // Priority 4: OS-dependent compiled default
    get_default_root_folder()
}

/// Database path: explicit TOML path, else `<root_folder>/wkune.db`
pub fn resolve_database_path(root_folder: &Path, toml: &TomlConfig) -> PathBuf {
    toml.database_path
        .clone()
        .unwrap_or_else(|| root_folder.join(DATABASE_FILE_NAME))
}

/// Get default configuration file path for the platform
fn load_config_file() -> Result<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("wkune").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Ok(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/wkune/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }
    }

    Err(Error::Config("No config file found".to_string()))
}

/// Get OS-dependent default root folder path
fn get_default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/wkune (or /var/lib/wkune for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("wkune"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/wkune"))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/wkune
        dirs::data_dir()
            .map(|d| d.join("wkune"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/wkune"))
    } else if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\wkune
        dirs::data_local_dir()
            .map(|d| d.join("wkune"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\wkune"))
    } else {
        PathBuf::from("./wkune_data")
    }
}
