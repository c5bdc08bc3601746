//! Collector store: validated ingestion in front of a [`HistoryStore`].

use std::sync::Arc;

use cotton_core::{obs, parse_record, Record, ValidationError, METRICS};
use cotton_history::{HistoryStore, StorageError, StorageResult};
use thiserror::Error;

/// Why an ingest was refused. Nothing is appended in either case.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    BadRequest(#[from] ValidationError),

    #[error("history unavailable: {0}")]
    Storage(#[from] StorageError),
}

/// Owner of the history; the only writer.
#[derive(Clone)]
pub struct CollectorStore {
    history: Arc<dyn HistoryStore>,
}

impl CollectorStore {
    pub fn new(history: Arc<dyn HistoryStore>) -> Self {
        Self { history }
    }

    pub fn backend(&self) -> &'static str {
        self.history.backend()
    }

    /// Validate a wire payload and append it. Returns the stored record.
    pub async fn ingest(&self, payload: serde_json::Value) -> Result<Record, IngestError> {
        let record = match parse_record(payload) {
            Ok(record) => record,
            Err(err) => {
                METRICS.inc_rejected();
                obs::emit_record_rejected(&err);
                return Err(err.into());
            }
        };
        self.append(record).await
    }

    /// Append an already validated record.
    pub async fn append(&self, record: Record) -> Result<Record, IngestError> {
        let position = self.history.append(record.clone()).await?;
        METRICS.inc_ingested();
        obs::emit_record_ingested(&record, position as usize);
        Ok(record)
    }

    pub async fn latest(&self) -> StorageResult<Option<Record>> {
        self.history.latest().await
    }

    pub async fn all(&self) -> StorageResult<Vec<Record>> {
        self.history.all().await
    }

    pub async fn len(&self) -> StorageResult<u64> {
        self.history.len().await
    }
}
