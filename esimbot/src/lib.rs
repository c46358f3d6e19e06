//! esimbot - Interactive eSIM profile downloads over chat
//!
//! This library drives a blocking eSIM download engine from a turn-based chat
//! conversation: it collects the activation code, holds the device lock for
//! the attempt, relays progress into one status message and routes the
//! engine's mid-download questions back to the user.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use esimbot::config::DownloadConfig;
//! use esimbot::device::DeviceLocks;
//! use esimbot::download::{DownloadFlow, DownloadOrchestrator};
//!
//! let locks = Arc::new(DeviceLocks::from_fn(open_modem));
//! let orchestrator =
//!     DownloadOrchestrator::new(transport, factory, locks, DownloadConfig::default());
//! let flow = DownloadFlow::new(orchestrator);
//!
//! flow.begin(chat).await?;
//! // for each inbound message:
//! flow.handle_text(&message).await?;
//! ```

pub mod activation;
pub mod config;
pub mod conversation;
pub mod device;
pub mod download;
pub mod engine;
pub mod error;
pub mod logging;
pub mod telemetry;
pub mod transport;

pub use activation::{ActivationCode, ActivationCodeError};
pub use error::{FlowError, FlowResult};

/// Version of the esimbot library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
