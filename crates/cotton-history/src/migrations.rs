//! SurrealDB schema for the record history.

use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

use crate::error::StorageResult;

/// Table holding one row per ingested record.
pub const RECORDS_TABLE: &str = "records";

/// Define the history tables. Idempotent.
pub async fn init_schema(db: &Surreal<Any>) -> StorageResult<()> {
    info!("initializing history schema");
    init_records_table(db).await?;
    Ok(())
}

/// `records` table
///
/// ```text
/// TABLE records {
///   seq:                 INT (unique, arrival order)
///   category:            STRING
///   confidence:          FLOAT
///   treat:               BOOL
///   guidance_primary:    STRING
///   guidance_secondary:  STRING
///   agent_primary:       STRING
///   agent_secondary:     STRING
///   captured_at:         STRING (YYYY-MM-DD HH:MM:SS)
/// }
/// ```
///
/// Rows are append-only: update and delete are denied.
async fn init_records_table(db: &Surreal<Any>) -> StorageResult<()> {
    debug!("initializing records table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS records
            SCHEMALESS
            PERMISSIONS
                FOR create FULL
                FOR select FULL
                FOR update NONE
                FOR delete NONE;

        DEFINE INDEX IF NOT EXISTS idx_seq ON TABLE records COLUMNS seq UNIQUE;
        DEFINE INDEX IF NOT EXISTS idx_category ON TABLE records COLUMNS category;
    "#;

    db.query(sql).await?.check()?;
    Ok(())
}
