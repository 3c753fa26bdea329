//! Owns the single active session and drives its navigation lifecycle

use crate::aggregate::SessionAggregate;
use crate::capture::{CaptureBridge, CaptureReceiver};
use crate::config::Config;
use crate::filter::ResourceFilter;
use crate::observer::{ObserverRegistry, SessionObserver};
use chrono::{DateTime, Utc};
use pagescope_telemetry::RawTimingSample;
use std::sync::Arc;

/// Session aggregator: exactly one active session at a time.
///
/// Every mutation runs through `&mut self`, so observers never see a
/// half-applied update.
pub struct SessionMonitor {
    bridge: Arc<CaptureBridge>,
    capture_buffer: usize,
    active: Option<SessionAggregate>,
    receiver: Option<CaptureReceiver>,
    observers: ObserverRegistry,
}

impl SessionMonitor {
    pub fn new(bridge: Arc<CaptureBridge>, config: &Config) -> Self {
        Self {
            bridge,
            capture_buffer: config.capture_buffer,
            active: None,
            receiver: None,
            observers: ObserverRegistry::new(),
        }
    }

    pub fn subscribe(&mut self, observer: Box<dyn SessionObserver>) {
        self.observers.register(observer);
    }

    pub fn unsubscribe(&mut self, name: &str) -> usize {
        self.observers.unregister(name)
    }

    pub fn active(&self) -> Option<&SessionAggregate> {
        self.active.as_ref()
    }

    pub fn is_capturing(&self) -> bool {
        self.receiver.is_some()
    }

    /// Start a navigation now
    pub fn start_navigation(&mut self, url: &str) -> &SessionAggregate {
        self.start_navigation_at(url, Utc::now())
    }

    /// Start a navigation at `start_time`, discarding the previous session
    /// and cancelling its capture
    pub fn start_navigation_at(&mut self, url: &str, start_time: DateTime<Utc>) -> &SessionAggregate {
        self.stop_capture();

        let mut session = SessionAggregate::new(url, start_time);
        session.set_loading(true);
        self.receiver = Some(self.bridge.register(self.capture_buffer));

        tracing::info!(session = session.id(), url, "navigation started");
        self.observers.navigation_started(session.id(), url);
        self.active.insert(session)
    }

    /// Navigation settled: ingest anything still buffered, then stop capture
    pub fn finish_navigation(&mut self) -> Option<&SessionAggregate> {
        self.drain_pending();
        self.stop_capture();

        let session = self.active.as_mut()?;
        session.set_loading(false);
        let totals = session.totals();
        tracing::info!(
            session = session.id(),
            resources = totals.resource_count,
            bytes = totals.total_bytes,
            duration_ms = totals.total_duration_ms,
            "navigation finished"
        );
        self.observers.navigation_finished(session.id(), &totals);
        self.active.as_ref()
    }

    /// Navigation failed: keep what was collected, stop capture
    pub fn fail_navigation(&mut self, reason: &str) -> Option<&SessionAggregate> {
        self.stop_capture();

        let session = self.active.as_mut()?;
        session.set_failure(reason);
        tracing::warn!(session = session.id(), reason, "navigation failed");
        self.observers.navigation_failed(session.id(), reason);
        self.active.as_ref()
    }

    /// Normalize and append one batch to the active session
    pub fn ingest_batch(&mut self, samples: &[RawTimingSample]) -> usize {
        let Some(session) = self.active.as_mut() else {
            tracing::debug!(samples = samples.len(), "no active session, batch ignored");
            return 0;
        };
        let added = session.ingest(samples);
        let totals = session.totals();
        self.observers.resources_added(&added, &totals);
        added.len()
    }

    /// Wait for the next captured batch and ingest it.
    ///
    /// Returns `None` when nothing is registered or the capture channel closed.
    pub async fn next_batch(&mut self) -> Option<usize> {
        let batch = self.receiver.as_mut()?.next_batch().await?;
        Some(self.ingest_batch(&batch))
    }

    /// Ingest every batch already buffered without waiting
    pub fn drain_pending(&mut self) -> usize {
        let mut batches = Vec::new();
        if let Some(receiver) = self.receiver.as_mut() {
            while let Some(batch) = receiver.try_next_batch() {
                batches.push(batch);
            }
        }
        batches.iter().map(|b| self.ingest_batch(b)).sum()
    }

    /// Replace the active session's display filter
    pub fn set_filter(&mut self, filter: ResourceFilter) {
        if let Some(session) = self.active.as_mut() {
            session.filter = filter;
        }
    }

    /// Drop the active session's resources and totals
    pub fn clear(&mut self) {
        if let Some(session) = self.active.as_mut() {
            session.clear();
            self.observers.cleared(session.id());
        }
    }

    /// Hand the active session off (e.g. to scoring and the store)
    pub fn take_session(&mut self) -> Option<SessionAggregate> {
        self.stop_capture();
        self.active.take()
    }

    fn stop_capture(&mut self) {
        if let Some(receiver) = self.receiver.take() {
            self.bridge.deregister_generation(receiver.generation());
        }
    }
}

impl Drop for SessionMonitor {
    fn drop(&mut self) {
        self.stop_capture();
    }
}
