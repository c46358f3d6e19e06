//! Exclusive device access.
//!
//! Every download attempt holds the lock for its device from engine start to
//! engine return. The lock provider also owns the device connection: it is
//! opened on first use, shared through an `Arc`, and reused by later attempts
//! instead of being reopened for every operation.

mod lock;

use std::fmt;

use thiserror::Error;

pub use lock::{DeviceConnector, DeviceGuard, DeviceLockStats, DeviceLocks};

/// Identity of one physical modem/eUICC.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Errors raised while connecting to a device.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    /// The connection could not be established.
    #[error("failed to connect to device {device}: {reason}")]
    Connect { device: DeviceId, reason: String },
}
