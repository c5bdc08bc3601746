//! Collector configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::ValueEnum;
use cotton_history::{HistoryStore, MemoryHistory, StorageResult, SurrealHistory};

pub const DEFAULT_BIND: &str = "0.0.0.0:8000";
pub const DEFAULT_DATA_DIR: &str = ".cotton/history";

/// History backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum StoreKind {
    /// Process-local; history is lost on restart
    #[default]
    Memory,
    /// SurrealDB on disk under the data directory
    Surreal,
}

#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub bind: SocketAddr,
    pub store: StoreKind,
    pub data_dir: PathBuf,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        let bind = std::env::var("COTTON_BIND")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8000)));
        let store = std::env::var("COTTON_STORE")
            .ok()
            .and_then(|v| StoreKind::from_str(&v, true).ok())
            .unwrap_or_default();
        let data_dir = std::env::var("COTTON_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR));

        CollectorConfig {
            bind,
            store,
            data_dir,
        }
    }
}

impl CollectorConfig {
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Open the configured history backend.
    pub async fn open_history(&self) -> StorageResult<Arc<dyn HistoryStore>> {
        let history: Arc<dyn HistoryStore> = match self.store {
            StoreKind::Memory => Arc::new(MemoryHistory::new()),
            StoreKind::Surreal => Arc::new(SurrealHistory::open(&self.data_dir).await?),
        };
        Ok(history)
    }
}
