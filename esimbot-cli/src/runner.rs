//! Shared setup for commands that run the download flow.

use esimbot::config::{config_file_path, ConfigFile};
use esimbot::logging::{self, LogGuard};
use tracing::info;

use crate::error::CliError;

/// Loaded configuration plus the installed logging subscriber.
pub struct CliRunner {
    config: ConfigFile,
    _log_guard: LogGuard,
}

impl CliRunner {
    /// Load `config.ini` and install logging.
    pub fn new() -> Result<Self, CliError> {
        let config = match config_file_path() {
            Ok(path) => ConfigFile::load_from(&path)?,
            Err(_) => ConfigFile::default(),
        };
        let log_guard = logging::init(&config.logging)?;
        Ok(Self {
            config,
            _log_guard: log_guard,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn log_startup(&self, command: &str) {
        info!(
            version = esimbot::VERSION,
            command,
            device = %self.config.download.device,
            timeout_secs = self.config.download.timeout_secs,
            "esimbot starting"
        );
    }
}
