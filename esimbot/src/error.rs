//! Error types for the download flow.

use thiserror::Error;

use crate::activation::ActivationCodeError;
use crate::conversation::TransitionError;
use crate::device::DeviceError;
use crate::transport::TransportError;

/// Result type for download flow operations.
pub type FlowResult<T> = Result<T, FlowError>;

/// Errors surfaced by the download flow.
///
/// The first two are recoverable input errors: the conversation re-prompts
/// and keeps the session. The rest end the current attempt. A user declining
/// the download is not an error; it is
/// [`DownloadOutcome::Declined`](crate::download::DownloadOutcome::Declined).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    /// The activation code could not be parsed.
    #[error("invalid activation code: {0}")]
    InvalidActivationCode(#[from] ActivationCodeError),

    /// An empty confirmation code was sent.
    #[error("invalid confirmation code")]
    InvalidConfirmationCode,

    /// The attempt exceeded its deadline.
    #[error("download timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The engine failed; carries its message verbatim.
    #[error("{0}")]
    Failed(String),

    /// The chat transport failed, so progress could not reach the user.
    #[error("chat transport failure: {0}")]
    Transport(#[from] TransportError),

    /// The device could not be reached.
    #[error(transparent)]
    Device(#[from] DeviceError),

    /// A download is already in flight for this conversation.
    #[error("a download is already in progress")]
    Busy,

    /// A download was requested without a pending activation code.
    #[error("no activation code is pending")]
    NotReady,

    /// Internal state machine violation.
    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),
}

impl FlowError {
    /// Input errors the conversation recovers from by re-prompting.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InvalidActivationCode(_) | Self::InvalidConfirmationCode
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ChatId;

    #[test]
    fn test_recoverable_errors() {
        assert!(FlowError::from(ActivationCodeError::MissingPrefix).is_recoverable());
        assert!(FlowError::InvalidConfirmationCode.is_recoverable());
        assert!(!FlowError::Timeout { secs: 300 }.is_recoverable());
        assert!(!FlowError::Busy.is_recoverable());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            FlowError::Timeout { secs: 300 }.to_string(),
            "download timed out after 300s"
        );
        assert_eq!(
            FlowError::Failed("profile already installed".to_string()).to_string(),
            "profile already installed"
        );
        let transport = FlowError::from(TransportError::Edit {
            id: 3,
            reason: "message not found".to_string(),
        });
        assert!(transport.to_string().contains("message not found"));
        let send = FlowError::from(TransportError::Send {
            chat: ChatId(9),
            reason: "blocked".to_string(),
        });
        assert!(send.to_string().contains("chat 9"));
    }
}
