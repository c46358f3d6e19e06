//! Configuration for the download flow.
//!
//! [`DownloadConfig`] is what the orchestrator runs with. [`ConfigFile`] is
//! the on-disk `config.ini` it can be built from:
//!
//! ```ini
//! [download]
//! timeout_secs = 300
//! device = modem0
//!
//! [logging]
//! level = info
//! directory = /var/log/esimbot
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use crate::device::DeviceId;

/// Ceiling for one attempt, interactive pauses included.
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Device used when none is configured.
pub const DEFAULT_DEVICE: &str = "default";

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

const CONFIG_DIR_NAME: &str = "esimbot";
const CONFIG_FILE_NAME: &str = "config.ini";

/// Errors reading or writing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("no configuration directory available on this platform")]
    NoConfigDir,
}

/// Settings the orchestrator runs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadConfig {
    /// Wall-clock ceiling for one attempt.
    pub timeout: Duration,
    /// Device every attempt locks and downloads to.
    pub device: DeviceId,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_DOWNLOAD_TIMEOUT,
            device: DeviceId::new(DEFAULT_DEVICE),
        }
    }
}

impl DownloadConfig {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: DeviceId::new(device),
            ..Default::default()
        }
    }

    /// Set the attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the device.
    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = DeviceId::new(device);
        self
    }

    pub fn from_config_file(config: &ConfigFile) -> Self {
        Self {
            timeout: Duration::from_secs(config.download.timeout_secs),
            device: DeviceId::new(config.download.device.clone()),
        }
    }
}

/// `[download]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSection {
    pub timeout_secs: u64,
    pub device: String,
}

impl Default for DownloadSection {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT.as_secs(),
            device: DEFAULT_DEVICE.to_string(),
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSection {
    pub level: String,
    /// Directory for rolling log files; console only when unset.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            directory: None,
        }
    }
}

/// Contents of `config.ini`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub download: DownloadSection,
    pub logging: LoggingSection,
}

/// Default location of `config.ini`.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
        .ok_or(ConfigError::NoConfigDir)
}

impl ConfigFile {
    /// Load from the default location; a missing file yields defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path()?)
    }

    /// Load from `path`; a missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(section) = ini.section(Some("download")) {
            if let Some(value) = section.get("timeout_secs") {
                config.download.timeout_secs =
                    value
                        .trim()
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue {
                            key: "download.timeout_secs".to_string(),
                            value: value.to_string(),
                        })?;
            }
            if let Some(value) = section.get("device").map(str::trim) {
                if !value.is_empty() {
                    config.download.device = value.to_string();
                }
            }
        }

        if let Some(section) = ini.section(Some("logging")) {
            if let Some(value) = section.get("level").map(str::trim) {
                if !value.is_empty() {
                    config.logging.level = value.to_string();
                }
            }
            config.logging.directory = section
                .get("directory")
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(PathBuf::from);
        }

        Ok(config)
    }

    fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        ini.with_section(Some("download"))
            .set("timeout_secs", self.download.timeout_secs.to_string())
            .set("device", self.download.device.clone());
        ini.with_section(Some("logging"))
            .set("level", self.logging.level.clone());
        if let Some(directory) = &self.logging.directory {
            ini.with_section(Some("logging"))
                .set("directory", directory.display().to_string());
        }
        ini
    }

    /// Save to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path()?)
    }

    /// Save to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        self.to_ini()
            .write_to_file(path)
            .map_err(|source| ConfigError::Write {
                path: path.to_path_buf(),
                source,
            })
    }
}
