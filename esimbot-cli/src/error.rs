//! CLI error type.

use std::fmt;

use esimbot::activation::ActivationCodeError;
use esimbot::config::ConfigError;
use esimbot::error::FlowError;
use esimbot::logging::LoggingError;

/// Errors surfaced to the command line.
#[derive(Debug)]
pub enum CliError {
    /// Configuration could not be loaded or was invalid.
    Config(String),
    /// Logging could not be set up.
    Logging(LoggingError),
    /// The argument is not an activation code.
    InvalidActivationCode(ActivationCodeError),
    /// The download flow failed.
    Flow(FlowError),
    /// The async runtime could not be started.
    Runtime(std::io::Error),
    /// Reading the console failed.
    Io(std::io::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Logging(e) => write!(f, "Logging error: {}", e),
            CliError::InvalidActivationCode(e) => write!(f, "Invalid activation code: {}", e),
            CliError::Flow(e) => write!(f, "Download error: {}", e),
            CliError::Runtime(e) => write!(f, "Failed to start runtime: {}", e),
            CliError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(_) => None,
            CliError::Logging(e) => Some(e),
            CliError::InvalidActivationCode(e) => Some(e),
            CliError::Flow(e) => Some(e),
            CliError::Runtime(e) | CliError::Io(e) => Some(e),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Logging(e)
    }
}

impl From<FlowError> for CliError {
    fn from(e: FlowError) -> Self {
        CliError::Flow(e)
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_display_and_source() {
        let err = CliError::InvalidActivationCode(ActivationCodeError::MissingPrefix);
        assert!(err.to_string().starts_with("Invalid activation code: "));
        assert!(err.source().is_some());

        let err = CliError::Config("bad timeout".to_string());
        assert_eq!(err.to_string(), "Configuration error: bad timeout");
        assert!(err.source().is_none());
    }

    #[test]
    fn test_flow_error_converts() {
        let err: CliError = FlowError::Busy.into();
        assert_eq!(err.to_string(), "Download error: a download is already in progress");
    }
}
