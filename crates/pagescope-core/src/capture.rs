//! Channel between the external timing-capture source and the active session
//!
//! The capture side holds an `Arc<CaptureBridge>` and delivers whole batches.
//! Whoever starts a session registers a receiver; registering again or
//! deregistering closes the previous channel, which cancels its capture.

use pagescope_telemetry::RawTimingSample;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::mpsc;

pub type SampleBatch = Vec<RawTimingSample>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliverError {
    #[error("no session is registered for capture")]
    NotRegistered,

    #[error("capture buffer is full, batch dropped")]
    Full,

    #[error("capture receiver has closed")]
    Closed,
}

#[derive(Debug)]
struct Registration {
    generation: u64,
    tx: mpsc::Sender<SampleBatch>,
}

/// Registration slot shared with the capture source
#[derive(Debug, Default)]
pub struct CaptureBridge {
    slot: Mutex<Option<Registration>>,
    generations: AtomicU64,
}

/// Receiving end owned by the active session
#[derive(Debug)]
pub struct CaptureReceiver {
    generation: u64,
    rx: mpsc::Receiver<SampleBatch>,
}

impl CaptureReceiver {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Wait for the next batch; `None` once the channel is closed and drained
    pub async fn next_batch(&mut self) -> Option<SampleBatch> {
        self.rx.recv().await
    }

    /// Take a buffered batch without waiting
    pub fn try_next_batch(&mut self) -> Option<SampleBatch> {
        self.rx.try_recv().ok()
    }
}

impl CaptureBridge {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Option<Registration>> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a new receiver, replacing (and closing) any previous one
    pub fn register(&self, capacity: usize) -> CaptureReceiver {
        let generation = self.generations.fetch_add(1, Ordering::SeqCst) + 1;
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let previous = self.slot().replace(Registration { generation, tx });
        if let Some(previous) = previous {
            tracing::debug!(cancelled = previous.generation, generation, "capture re-registered");
        }
        CaptureReceiver { generation, rx }
    }

    /// Drop the current registration
    pub fn deregister(&self) {
        self.slot().take();
    }

    /// Drop the registration only if it still belongs to `generation`
    pub fn deregister_generation(&self, generation: u64) {
        let mut slot = self.slot();
        if slot.as_ref().map(|r| r.generation) == Some(generation) {
            slot.take();
        }
    }

    pub fn is_registered(&self) -> bool {
        self.slot().is_some()
    }

    /// Hand a batch to the registered session without blocking
    pub fn deliver(&self, batch: SampleBatch) -> Result<(), DeliverError> {
        let slot = self.slot();
        let registration = slot.as_ref().ok_or(DeliverError::NotRegistered)?;
        registration.tx.try_send(batch).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliverError::Full,
            mpsc::error::TrySendError::Closed(_) => DeliverError::Closed,
        })
    }

    /// Hand a batch to the registered session, waiting for buffer space.
    ///
    /// The sender is cloned out of the slot first; if the session is replaced
    /// while waiting, the batch is refused with `Closed`.
    pub async fn send(&self, batch: SampleBatch) -> Result<(), DeliverError> {
        let tx = self
            .slot()
            .as_ref()
            .map(|r| r.tx.clone())
            .ok_or(DeliverError::NotRegistered)?;
        tx.send(batch).await.map_err(|_| DeliverError::Closed)
    }
}
