//! Global atomic counters for Cotton Doctor.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (at shutdown or the end of a capture run).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

pub struct Metrics {
    detections: AtomicU64,
    detection_failures: AtomicU64,
    sends_acked: AtomicU64,
    sends_unavailable: AtomicU64,
    ingested: AtomicU64,
    rejected: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of every counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct MetricsSnapshot {
    pub detections: u64,
    pub detection_failures: u64,
    pub sends_acked: u64,
    pub sends_unavailable: u64,
    pub ingested: u64,
    pub rejected: u64,
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            detections: AtomicU64::new(0),
            detection_failures: AtomicU64::new(0),
            sends_acked: AtomicU64::new(0),
            sends_unavailable: AtomicU64::new(0),
            ingested: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    fn bump(counter: &AtomicU64, name: &'static str) {
        counter.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = name, "counter incremented");
    }

    pub fn inc_detections(&self) {
        Self::bump(&self.detections, "detections");
    }

    pub fn inc_detection_failures(&self) {
        Self::bump(&self.detection_failures, "detection_failures");
    }

    pub fn inc_sends_acked(&self) {
        Self::bump(&self.sends_acked, "sends_acked");
    }

    pub fn inc_sends_unavailable(&self) {
        Self::bump(&self.sends_unavailable, "sends_unavailable");
    }

    pub fn inc_ingested(&self) {
        Self::bump(&self.ingested, "ingested");
    }

    pub fn inc_rejected(&self) {
        Self::bump(&self.rejected, "rejected");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            detections: self.detections.load(Ordering::Relaxed),
            detection_failures: self.detection_failures.load(Ordering::Relaxed),
            sends_acked: self.sends_acked.load(Ordering::Relaxed),
            sends_unavailable: self.sends_unavailable.load(Ordering::Relaxed),
            ingested: self.ingested.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        let s = self.snapshot();
        tracing::info!(
            metric = "flush",
            detections = s.detections,
            detection_failures = s.detection_failures,
            sends_acked = s.sends_acked,
            sends_unavailable = s.sends_unavailable,
            ingested = s.ingested,
            rejected = s.rejected,
        );
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        for counter in [
            &self.detections,
            &self.detection_failures,
            &self.sends_acked,
            &self.sends_unavailable,
            &self.ingested,
            &self.rejected,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}
