//! Cottond: the Cotton Doctor collector.
//!
//! Receives advisory records from capture devices, appends them to the
//! history, and serves the history to display consumers.

pub mod collector;
pub mod config;
pub mod export;
pub mod routes;
pub mod server;

pub use collector::{CollectorStore, IngestError};
pub use config::{CollectorConfig, StoreKind};
pub use server::{app, run, AppState};
