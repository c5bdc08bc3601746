//! Cotton-History: the collector's append-only record history.
//!
//! ## Key Components
//!
//! - `HistoryStore`: the storage seam (append / all / latest / len)
//! - `MemoryHistory`: process-local backend, the default
//! - `SurrealHistory`: durable SurrealDB backend (`surrealkv://` on disk)

mod error;
pub mod history;
pub mod memory;
pub mod migrations;
pub mod surreal_history;

pub use error::{StorageError, StorageResult};
pub use history::HistoryStore;
pub use memory::MemoryHistory;
pub use surreal_history::SurrealHistory;
