//! Connection management

use std::path::Path;
use std::time::Duration;

use rusqlite::Connection;

use crate::errors::{from_rusqlite, Result};

pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

pub fn open<P: AsRef<Path>>(path: P) -> Result<Connection> {
    Connection::open(path).map_err(from_rusqlite)
}

pub fn open_in_memory() -> Result<Connection> {
    Connection::open_in_memory().map_err(from_rusqlite)
}

/// Apply connection pragmas
///
/// WAL lets readers proceed while a unit of work holds the write lock;
/// `busy_timeout_ms` bounds how long a writer waits for that lock.
pub fn configure(conn: &Connection, busy_timeout_ms: u64) -> Result<()> {
    conn.busy_timeout(Duration::from_millis(busy_timeout_ms))
        .map_err(from_rusqlite)?;
    // journal_mode returns a row, so it cannot go through execute()
    conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA journal_mode = WAL;")
        .map_err(from_rusqlite)?;
    Ok(())
}
