//! The `HistoryStore` trait: append-only, arrival-ordered record history.
//!
//! Guarantees every backend must uphold:
//! - `append` is atomic: a record is either fully visible to readers or not at all.
//! - `all()` returns records in the order their appends completed.
//! - `latest()` equals the last element of `all()`.
//! - Nothing is ever updated or removed.

use async_trait::async_trait;
use cotton_core::Record;

use crate::error::StorageResult;

#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Append one record. Returns its 1-based position in the history.
    async fn append(&self, record: Record) -> StorageResult<u64>;

    /// Every record, oldest first.
    async fn all(&self) -> StorageResult<Vec<Record>>;

    /// Most recent record, `None` when the history is empty.
    async fn latest(&self) -> StorageResult<Option<Record>>;

    async fn len(&self) -> StorageResult<u64>;

    async fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.len().await? == 0)
    }

    /// Short backend name for logs and health output.
    fn backend(&self) -> &'static str;
}
