//! Process-local history, lost on restart.

use async_trait::async_trait;
use cotton_core::Record;
use tokio::sync::RwLock;

use crate::error::StorageResult;
use crate::history::HistoryStore;

/// In-memory history backed by `RwLock<Vec<Record>>`.
///
/// Appends take the write lock, so readers see whole records only.
#[derive(Debug, Default)]
pub struct MemoryHistory {
    records: RwLock<Vec<Record>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistory {
    async fn append(&self, record: Record) -> StorageResult<u64> {
        let mut records = self.records.write().await;
        records.push(record);
        Ok(records.len() as u64)
    }

    async fn all(&self) -> StorageResult<Vec<Record>> {
        Ok(self.records.read().await.clone())
    }

    async fn latest(&self) -> StorageResult<Option<Record>> {
        Ok(self.records.read().await.last().cloned())
    }

    async fn len(&self) -> StorageResult<u64> {
        Ok(self.records.read().await.len() as u64)
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
