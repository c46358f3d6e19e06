//! Download engine interface.
//!
//! The engine implements the SGP.22 profile download against the SM-DP+ and
//! the eUICC. It is synchronous: [`DownloadEngine::download`] blocks until the
//! profile is installed or the attempt fails, and calls back into
//! [`DownloadHooks`] along the way to report progress and to ask the user for
//! input. The orchestrator runs it on a blocking worker thread.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::activation::ActivationCode;

/// Highest progress step; a full bar.
pub const MAX_PROGRESS_STEP: u8 = 10;

/// Progress reported by the engine.
///
/// `Step` values advance the bar. The named milestones mark points where the
/// engine pauses for input or hands over to the eUICC; they do not advance it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DownloadProgress {
    /// Advancement from 0 to [`MAX_PROGRESS_STEP`].
    Step(u8),
    /// The SM-DP+ wants a confirmation code.
    ConfirmationCodeRequired,
    /// The user is asked to confirm the profile metadata.
    ConfirmDownload,
    /// The bound profile package is being loaded onto the eUICC.
    LoadBoundProfile,
}

impl DownloadProgress {
    /// The step value, or `None` for milestones.
    pub fn step(self) -> Option<u8> {
        match self {
            Self::Step(step) => Some(step.min(MAX_PROGRESS_STEP)),
            _ => None,
        }
    }

    pub fn is_milestone(self) -> bool {
        self.step().is_none()
    }
}

/// Profile metadata shown to the user before the download is confirmed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProfileMetadata {
    pub provider_name: String,
    pub profile_name: String,
    pub iccid: String,
}

impl ProfileMetadata {
    pub fn new(
        provider_name: impl Into<String>,
        profile_name: impl Into<String>,
        iccid: impl Into<String>,
    ) -> Self {
        Self {
            provider_name: provider_name.into(),
            profile_name: profile_name.into(),
            iccid: iccid.into(),
        }
    }
}

/// Errors reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The user declined the download.
    #[error("download canceled")]
    Canceled,

    /// The attempt stopped because its cancellation token fired.
    #[error("download interrupted")]
    Interrupted,

    /// The engine could not be opened on the device.
    #[error("failed to open download engine: {0}")]
    Open(String),

    /// Any other failure, carrying the engine's message.
    #[error("{0}")]
    Failed(String),
}

/// Callbacks invoked by the engine from its own thread.
///
/// `confirmation_code` and `confirm_download` block until the user answers
/// or the attempt is cancelled.
pub trait DownloadHooks: Send + Sync {
    /// Progress update. Must return promptly.
    fn progress(&self, progress: DownloadProgress);

    /// Ask for a confirmation code. An empty string means none was obtained.
    fn confirmation_code(&self) -> String;

    /// Ask whether to go ahead with the described profile.
    fn confirm_download(&self, metadata: &ProfileMetadata) -> bool;
}

/// Synchronous profile downloader bound to one device connection.
pub trait DownloadEngine: Send + 'static {
    /// Run one download attempt.
    ///
    /// Implementations should check `cancel` between protocol steps and return
    /// [`EngineError::Interrupted`] once it fires. A negative answer from
    /// [`DownloadHooks::confirm_download`] must end in [`EngineError::Canceled`].
    fn download(
        &mut self,
        cancel: &CancellationToken,
        code: &ActivationCode,
        hooks: &dyn DownloadHooks,
    ) -> Result<(), EngineError>;

    /// Release engine resources. Called once after every attempt.
    fn close(&mut self);
}

/// Opens engines over a device connection.
pub trait EngineFactory: Send + Sync + 'static {
    /// Connection type shared through the device lock.
    type Connection: Send + Sync + 'static;
    type Engine: DownloadEngine;

    fn open(&self, connection: Arc<Self::Connection>) -> Result<Self::Engine, EngineError>;
}

impl fmt::Display for DownloadProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Step(step) => write!(f, "step {}", step),
            Self::ConfirmationCodeRequired => f.write_str("confirmation code required"),
            Self::ConfirmDownload => f.write_str("confirm download"),
            Self::LoadBoundProfile => f.write_str("load bound profile"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_milestones_have_no_step() {
        assert!(DownloadProgress::ConfirmationCodeRequired.is_milestone());
        assert!(DownloadProgress::ConfirmDownload.is_milestone());
        assert!(DownloadProgress::LoadBoundProfile.is_milestone());
        assert!(!DownloadProgress::Step(0).is_milestone());
    }

    #[test]
    fn test_step_clamps_to_max() {
        assert_eq!(DownloadProgress::Step(4).step(), Some(4));
        assert_eq!(DownloadProgress::Step(42).step(), Some(MAX_PROGRESS_STEP));
    }

    #[test]
    fn test_engine_error_display_is_verbatim() {
        let err = EngineError::Failed("SM-DP+ rejected matching id".to_string());
        assert_eq!(err.to_string(), "SM-DP+ rejected matching id");
    }
}
