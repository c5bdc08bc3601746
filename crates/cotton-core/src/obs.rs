//! Structured observability hooks for detection and record lifecycle events.
//!
//! This module provides:
//! - Cycle-scoped tracing spans via `CycleSpan`
//! - Emission functions for detection, transmission and ingestion events
//!
//! Events are emitted at `info!` (failures at `warn!`), filtered by `RUST_LOG`.

use tracing::{info, warn};

use crate::domain::{PipelineError, Record, ValidationError};
use crate::transport::UnavailableReason;

/// Capture-cycle span tagged with a generated cycle id.
///
/// ```ignore
/// let cycle = CycleSpan::new();
/// process(frame).instrument(cycle.span()).await;
/// ```
pub struct CycleSpan {
    cycle_id: String,
    span: tracing::Span,
}

impl CycleSpan {
    pub fn new() -> Self {
        Self::with_id(&uuid::Uuid::new_v4().to_string())
    }

    pub fn with_id(cycle_id: &str) -> Self {
        Self {
            cycle_id: cycle_id.to_string(),
            span: tracing::info_span!("cotton.cycle", cycle_id = %cycle_id),
        }
    }

    pub fn cycle_id(&self) -> &str {
        &self.cycle_id
    }

    /// Handle for `Instrument::instrument` on async work.
    pub fn span(&self) -> tracing::Span {
        self.span.clone()
    }

    /// Enter for synchronous sections; exits on drop.
    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

impl Default for CycleSpan {
    fn default() -> Self {
        Self::new()
    }
}

pub fn emit_detection_completed(record: &Record) {
    info!(
        event = "detection.completed",
        category = %record.category(),
        confidence = record.confidence(),
        treat = record.treat(),
        captured_at = %record.captured_at(),
    );
}

pub fn emit_detection_failed(error: &PipelineError) {
    warn!(event = "detection.failed", error = %error);
}

pub fn emit_record_sent(record: &Record, attempts: u32) {
    info!(
        event = "record.sent",
        category = %record.category(),
        captured_at = %record.captured_at(),
        attempts = attempts,
    );
}

/// The record is dropped after this; nothing is queued.
pub fn emit_record_unavailable(record: &Record, reason: &UnavailableReason, attempts: u32) {
    warn!(
        event = "record.unavailable",
        category = %record.category(),
        captured_at = %record.captured_at(),
        reason = %reason,
        attempts = attempts,
    );
}

pub fn emit_record_ingested(record: &Record, history_len: usize) {
    info!(
        event = "record.ingested",
        category = %record.category(),
        confidence = record.confidence(),
        history_len = history_len,
    );
}

pub fn emit_record_rejected(error: &ValidationError) {
    warn!(event = "record.rejected", error = %error);
}
