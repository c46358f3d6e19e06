//! Conversation state for the download dialogue.
//!
//! ```text
//! AwaitActivationCode ──► [AwaitConfirmationCode] ──► Downloading ──► Done
//!        ▲  │ invalid            ▲  │ empty              │   ▲
//!        └──┘                    └──┘                    ▼   │
//!                                         AwaitConfirmationCodeDuringDownload
//! ```
//!
//! - [`StateMachine`] owns transitions and the "next expected input" slot
//! - [`Session`] bundles the machine with the pending code and handoffs
//! - [`SessionRegistry`] keeps at most one session per conversation

mod registry;
mod session;
mod state;

pub use registry::{OpenSession, SessionRegistry};
pub use session::Session;
pub use state::{DialogueState, StateMachine, TransitionError};
