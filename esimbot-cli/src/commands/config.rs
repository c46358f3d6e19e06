//! Configuration CLI commands.
//!
//! Provides `config path` and `config show`.

use std::path::Path;

use clap::Subcommand;
use esimbot::config::{config_file_path, ConfigFile};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the configuration file path
    Path,

    /// Show the effective configuration
    Show,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Path => run_path(),
        ConfigCommands::Show => run_show(),
    }
}

/// Show the configuration file path.
fn run_path() -> Result<(), CliError> {
    println!("{}", config_file_path()?.display());
    Ok(())
}

/// Show the effective configuration.
fn run_show() -> Result<(), CliError> {
    let path = config_file_path()?;
    print!("{}", show(&path)?);
    Ok(())
}

fn show(path: &Path) -> Result<String, CliError> {
    let config = ConfigFile::load_from(path)?;
    let source = if path.exists() {
        path.display().to_string()
    } else {
        format!("{} (not found, using defaults)", path.display())
    };

    let directory = config
        .logging
        .directory
        .as_ref()
        .map(|dir| dir.display().to_string())
        .unwrap_or_else(|| "(console only)".to_string());

    Ok(format!(
        "# {}\n\
         [download]\n\
         timeout_secs = {}\n\
         device = {}\n\
         \n\
         [logging]\n\
         level = {}\n\
         directory = {}\n",
        source,
        config.download.timeout_secs,
        config.download.device,
        config.logging.level,
        directory
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_show_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let text = show(&dir.path().join("config.ini")).unwrap();
        assert!(text.contains("not found, using defaults"));
        assert!(text.contains("timeout_secs = 300\n"));
        assert!(text.contains("device = default\n"));
        assert!(text.contains("directory = (console only)\n"));
    }

    #[test]
    fn test_show_reads_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "[download]\ntimeout_secs = 60\ndevice = modem1\n").unwrap();

        let text = show(&path).unwrap();
        assert!(text.contains("timeout_secs = 60\n"));
        assert!(text.contains("device = modem1\n"));
    }

    #[test]
    fn test_show_rejects_bad_timeout() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "[download]\ntimeout_secs = soon\n").unwrap();

        assert!(matches!(show(&path), Err(CliError::Config(_))));
    }
}
