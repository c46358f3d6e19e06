//! Keyed device locks with lazily opened, shared connections.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info};

use super::{DeviceError, DeviceId};

/// Opens a connection to a device.
pub trait DeviceConnector<C>: Send + Sync {
    fn connect(&self, device: &DeviceId) -> Result<C, DeviceError>;
}

impl<C, F> DeviceConnector<C> for F
where
    F: Fn(&DeviceId) -> Result<C, DeviceError> + Send + Sync,
{
    fn connect(&self, device: &DeviceId) -> Result<C, DeviceError> {
        self(device)
    }
}

/// Lock counters for one device.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeviceLockStats {
    pub acquisitions: u64,
    pub releases: u64,
    pub connections_opened: u64,
}

struct DeviceSlot<C> {
    gate: Arc<AsyncMutex<()>>,
    connection: Mutex<Option<Arc<C>>>,
    acquisitions: AtomicU64,
    releases: AtomicU64,
    connections_opened: AtomicU64,
}

impl<C> DeviceSlot<C> {
    fn new() -> Self {
        Self {
            gate: Arc::new(AsyncMutex::new(())),
            connection: Mutex::new(None),
            acquisitions: AtomicU64::new(0),
            releases: AtomicU64::new(0),
            connections_opened: AtomicU64::new(0),
        }
    }
}

/// Exclusive, non-reentrant locks keyed by device.
///
/// `acquire` waits for the current holder instead of failing. Acquiring the
/// same device twice from one task deadlocks; callers hold one guard per
/// attempt.
pub struct DeviceLocks<C> {
    connector: Box<dyn DeviceConnector<C>>,
    slots: DashMap<DeviceId, Arc<DeviceSlot<C>>>,
}

impl<C: Send + Sync + 'static> DeviceLocks<C> {
    pub fn new(connector: impl DeviceConnector<C> + 'static) -> Self {
        Self {
            connector: Box::new(connector),
            slots: DashMap::new(),
        }
    }

    /// Build from a connect function.
    pub fn from_fn<F>(connect: F) -> Self
    where
        F: Fn(&DeviceId) -> Result<C, DeviceError> + Send + Sync + 'static,
    {
        Self::new(connect)
    }

    fn slot(&self, device: &DeviceId) -> Arc<DeviceSlot<C>> {
        Arc::clone(
            self.slots
                .entry(device.clone())
                .or_insert_with(|| Arc::new(DeviceSlot::new()))
                .value(),
        )
    }

    /// Wait for exclusive access to `device`.
    pub async fn acquire(&self, device: &DeviceId) -> DeviceGuard<C> {
        let slot = self.slot(device);
        let started = Instant::now();
        let permit = Arc::clone(&slot.gate).lock_owned().await;
        slot.acquisitions.fetch_add(1, Ordering::SeqCst);
        debug!(
            device = %device,
            waited_ms = started.elapsed().as_millis() as u64,
            "Device lock acquired"
        );
        DeviceGuard {
            device: device.clone(),
            slot,
            _permit: permit,
        }
    }

    /// Shared connection for the locked device, opened on first use.
    ///
    /// Taking the guard proves the caller holds the lock. A failed connect is
    /// not cached; the next attempt tries again.
    pub fn connection(&self, guard: &DeviceGuard<C>) -> Result<Arc<C>, DeviceError> {
        let mut connection = guard.slot.connection.lock();
        if let Some(existing) = connection.as_ref() {
            return Ok(Arc::clone(existing));
        }
        let opened = Arc::new(self.connector.connect(&guard.device)?);
        guard.slot.connections_opened.fetch_add(1, Ordering::SeqCst);
        info!(device = %guard.device, "Device connection opened");
        *connection = Some(Arc::clone(&opened));
        Ok(opened)
    }

    /// Whether `device` is currently held.
    pub fn is_locked(&self, device: &DeviceId) -> bool {
        self.slots
            .get(device)
            .map(|slot| slot.gate.try_lock().is_err())
            .unwrap_or(false)
    }

    pub fn stats(&self, device: &DeviceId) -> DeviceLockStats {
        self.slots
            .get(device)
            .map(|slot| DeviceLockStats {
                acquisitions: slot.acquisitions.load(Ordering::SeqCst),
                releases: slot.releases.load(Ordering::SeqCst),
                connections_opened: slot.connections_opened.load(Ordering::SeqCst),
            })
            .unwrap_or_default()
    }
}

/// Proof of exclusive access to one device. Dropping it releases the lock.
pub struct DeviceGuard<C> {
    device: DeviceId,
    slot: Arc<DeviceSlot<C>>,
    _permit: OwnedMutexGuard<()>,
}

impl<C> DeviceGuard<C> {
    pub fn device(&self) -> &DeviceId {
        &self.device
    }
}

impl<C> Drop for DeviceGuard<C> {
    fn drop(&mut self) {
        self.slot.releases.fetch_add(1, Ordering::SeqCst);
        debug!(device = %self.device, "Device lock released");
    }
}

impl<C> std::fmt::Debug for DeviceGuard<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceGuard")
            .field("device", &self.device)
            .finish()
    }
}
