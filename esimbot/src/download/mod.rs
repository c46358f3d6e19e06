//! Interactive profile download.
//!
//! ```text
//! inbound text ──► DownloadFlow ──► state handler ──► ActivationCode::parse
//!                      │                                   │
//!                      │ button press                      ▼
//!                      ▼                          DownloadOrchestrator::download
//!                  Handoff<bool> ◄──── confirm-download hook ◄───┐
//!                  Handoff<String> ◄── confirmation-code hook ◄──┤ engine
//!                                       progress hook ──► status ◄┘ (blocking)
//! ```
//!
//! The engine runs on a blocking thread and pauses inside its hooks. Each
//! pause is a [`Handoff`] that the conversation fills from a later message.

mod flow;
pub mod handoff;
mod orchestrator;
pub mod progress;
pub mod prompt;

pub use flow::{
    Dispatch, DownloadFlow, ACTIVATION_CODE_PROMPT, INVALID_ACTIVATION_CODE_TEXT,
    INVALID_CONFIRMATION_CODE_TEXT,
};
pub use handoff::{Handoff, HandoffError};
pub use orchestrator::{
    failure_text, DownloadOrchestrator, DownloadOutcome, CANCELED_TEXT, CONFIRMATION_CODE_PROMPT,
    SUCCESS_TEXT,
};
pub use progress::{render, ProgressReporter, DOWNLOADING_TEXT};
pub use prompt::ConfirmPrompt;
