use rusqlite::Connection;

use crate::error::Result;

/// Current schema version, stored in `PRAGMA user_version`
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize database schema
///
/// # Errors
///
/// Returns an error if table or index creation fails
pub fn init_schema(conn: &Connection) -> Result<()> {
    // Records table - one row per queued record, addressed by partition and id
    conn.execute(
        "CREATE TABLE IF NOT EXISTS records (
            partition TEXT NOT NULL,
            id TEXT NOT NULL,
            body BLOB NOT NULL,
            stored_at TEXT NOT NULL,
            PRIMARY KEY (partition, id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_records_partition ON records(partition)",
        [],
    )?;

    let version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if version < SCHEMA_VERSION {
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        log::info!("Local store schema upgraded from v{version} to v{SCHEMA_VERSION}");
    }

    Ok(())
}

/// Switch a file-backed database to write-ahead logging
///
/// # Errors
///
/// Returns an error if the pragma cannot be applied
pub fn enable_wal(conn: &Connection) -> Result<()> {
    let mode: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    log::debug!("Journal mode: {mode}");
    Ok(())
}
