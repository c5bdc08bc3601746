//! SurrealDB-backed [`HistoryStore`].
//!
//! Appends are serialized through an async mutex that hands out a monotonic
//! `seq`; reads order by `seq`. On disk the store uses `surrealkv://`, tests
//! use `mem://`.

use std::path::Path;

use async_trait::async_trait;
use cotton_core::{Record, WireRecord};
use serde::{Deserialize, Serialize};
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};
use crate::history::HistoryStore;
use crate::migrations::{self, RECORDS_TABLE};

const NAMESPACE: &str = "cotton";
const DATABASE: &str = "history";

/// One stored row.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct HistoryRow {
    seq: u64,
    category: String,
    confidence: f64,
    treat: bool,
    guidance_primary: String,
    guidance_secondary: String,
    agent_primary: String,
    agent_secondary: String,
    captured_at: String,
}

impl HistoryRow {
    fn new(seq: u64, record: &Record) -> Self {
        HistoryRow {
            seq,
            category: record.category().to_string(),
            confidence: record.confidence(),
            treat: record.treat(),
            guidance_primary: record.guidance_primary().to_string(),
            guidance_secondary: record.guidance_secondary().to_string(),
            agent_primary: record.agent_primary().to_string(),
            agent_secondary: record.agent_secondary().to_string(),
            captured_at: record.captured_at().to_string(),
        }
    }

    fn into_record(self) -> StorageResult<Record> {
        let wire = WireRecord {
            category: self.category,
            confidence: self.confidence,
            treat: self.treat,
            guidance_primary: self.guidance_primary,
            guidance_secondary: self.guidance_secondary,
            agent_primary: self.agent_primary,
            agent_secondary: self.agent_secondary,
            captured_at: self.captured_at,
        };
        Ok(wire.validate()?)
    }
}

#[derive(Debug, Deserialize)]
struct SeqRow {
    seq: u64,
}

#[derive(Debug, Deserialize)]
struct CountRow {
    count: u64,
}

/// SurrealDB history.
pub struct SurrealHistory {
    db: Surreal<Any>,
    /// Last assigned sequence number.
    last_seq: Mutex<u64>,
}

impl SurrealHistory {
    /// Fresh in-memory database (`mem://`).
    pub async fn in_memory() -> StorageResult<Self> {
        Self::connect("mem://").await
    }

    /// Open (or create) an on-disk store under `path`.
    pub async fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path).map_err(|e| {
            StorageError::Connection(format!(
                "failed to create history directory {}: {e}",
                path.display()
            ))
        })?;
        Self::connect(&format!("surrealkv://{}", path.display())).await
    }

    /// Connect to any SurrealDB endpoint the `any` engine accepts.
    pub async fn connect(endpoint: &str) -> StorageResult<Self> {
        let db = surrealdb::engine::any::connect(endpoint)
            .await
            .map_err(|e| StorageError::Connection(format!("{endpoint}: {e}")))?;

        db.use_ns(NAMESPACE)
            .use_db(DATABASE)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        migrations::init_schema(&db).await?;

        let last_seq = Self::max_seq(&db).await?;
        info!(endpoint = %endpoint, records = last_seq, "SurrealHistory connected");

        Ok(Self {
            db,
            last_seq: Mutex::new(last_seq),
        })
    }

    async fn max_seq(db: &Surreal<Any>) -> StorageResult<u64> {
        let mut res = db
            .query("SELECT seq FROM type::table($table) ORDER BY seq DESC LIMIT 1")
            .bind(("table", RECORDS_TABLE))
            .await?;
        let row: Option<SeqRow> = res.take(0)?;
        Ok(row.map(|r| r.seq).unwrap_or(0))
    }
}

#[async_trait]
impl HistoryStore for SurrealHistory {
    async fn append(&self, record: Record) -> StorageResult<u64> {
        let mut last_seq = self.last_seq.lock().await;
        let seq = *last_seq + 1;

        let _created: Option<HistoryRow> = self
            .db
            .create(RECORDS_TABLE)
            .content(HistoryRow::new(seq, &record))
            .await?;

        *last_seq = seq;
        debug!(seq, category = %record.category(), "record appended");
        Ok(seq)
    }

    async fn all(&self) -> StorageResult<Vec<Record>> {
        let mut res = self
            .db
            .query("SELECT * FROM type::table($table) ORDER BY seq ASC")
            .bind(("table", RECORDS_TABLE))
            .await?;
        let rows: Vec<HistoryRow> = res.take(0)?;
        rows.into_iter().map(HistoryRow::into_record).collect()
    }

    async fn latest(&self) -> StorageResult<Option<Record>> {
        let mut res = self
            .db
            .query("SELECT * FROM type::table($table) ORDER BY seq DESC LIMIT 1")
            .bind(("table", RECORDS_TABLE))
            .await?;
        let row: Option<HistoryRow> = res.take(0)?;
        row.map(HistoryRow::into_record).transpose()
    }

    async fn len(&self) -> StorageResult<u64> {
        let mut res = self
            .db
            .query("SELECT count() AS count FROM type::table($table) GROUP ALL")
            .bind(("table", RECORDS_TABLE))
            .await?;
        let row: Option<CountRow> = res.take(0)?;
        Ok(row.map(|r| r.count).unwrap_or(0))
    }

    fn backend(&self) -> &'static str {
        "surreal"
    }
}
