//! Single-slot handoff mailboxes.
//!
//! A [`Handoff`] carries one value from the conversation (async side) into a
//! hook blocked inside the download engine (blocking side). The reader arms
//! the mailbox when it starts waiting; the first delivery disarms it, so
//! every request cycle accepts exactly one value and a second delivery is
//! rejected instead of overwriting or queueing behind the first.
//!
//! ```text
//!   hook (engine thread)              conversation (async)
//!   ────────────────────              ────────────────────
//!   arm() ─────────────────────────►  deliver(v)  ──► Ok
//!   take(&cancel).await ◄── v         deliver(w)  ──► Err(NotAwaiting)
//! ```

use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

/// Why a value could not be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HandoffError {
    /// Nobody is waiting for a value right now.
    #[error("no request is waiting for a value")]
    NotAwaiting,

    /// The slot already holds an unread value.
    #[error("a value is already pending")]
    Occupied,
}

/// Single-reader, single-writer mailbox with one slot.
#[derive(Debug)]
pub struct Handoff<T> {
    tx: mpsc::Sender<T>,
    rx: Mutex<mpsc::Receiver<T>>,
    armed: AtomicBool,
}

impl<T: Send> Default for Handoff<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send> Handoff<T> {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(1);
        Self {
            tx,
            rx: Mutex::new(rx),
            armed: AtomicBool::new(false),
        }
    }

    /// Open a request cycle. Values delivered before this are rejected.
    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    /// Close the request cycle without a value.
    pub fn disarm(&self) {
        self.armed.store(false, Ordering::SeqCst);
    }

    /// Whether a request is waiting for a value.
    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }

    /// Hand a value to the waiting reader.
    pub fn deliver(&self, value: T) -> Result<(), HandoffError> {
        if !self.armed.swap(false, Ordering::SeqCst) {
            return Err(HandoffError::NotAwaiting);
        }
        self.tx.try_send(value).map_err(|_| HandoffError::Occupied)
    }

    /// Wait for the value of the current request cycle.
    ///
    /// Returns `None` when `cancel` fires first; the cycle is closed so a late
    /// delivery is rejected rather than left for the next request.
    pub async fn take(&self, cancel: &CancellationToken) -> Option<T> {
        let mut rx = self.rx.lock().await;
        tokio::select! {
            biased;
            value = rx.recv() => value,
            _ = cancel.cancelled() => {
                self.disarm();
                // A delivery may have raced the cancellation.
                while rx.try_recv().is_ok() {}
                None
            }
        }
    }
}
