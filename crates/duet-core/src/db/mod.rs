//! SQLite document store utilities.
//!
//! Runtime defaults:
//! - `journal_mode = WAL` so searches can read while a bulk insert commits
//! - `busy_timeout = 5s` to ride out transient lock contention
//! - `foreign_keys = ON`
//!
//! The sqlite-vec auto-extension is registered before every open. When it is
//! unavailable the store still works and vector search falls back to a Rust
//! cosine scan (see [`vector_extension_available`]).

pub mod embedding;
pub mod migrations;
pub mod query;
pub mod schema;
pub mod store;

pub use store::DocumentStore;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::{path::Path, time::Duration};
use tracing::debug;

/// Busy timeout used for document store connections.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open (or create) the database file and apply runtime pragmas.
///
/// Schema creation is left to [`DocumentStore`], which needs the vector
/// dimension.
///
/// # Errors
///
/// Returns an error if the parent directory cannot be created or SQLite
/// cannot open or configure the file.
pub fn open_connection(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create store directory {}", parent.display()))?;
    }

    register_vector_extension();

    let conn = Connection::open(path)
        .with_context(|| format!("open document store {}", path.display()))?;
    configure_connection(&conn).context("configure sqlite pragmas")?;
    Ok(conn)
}

/// In-memory connection with the same extension setup, for tests and
/// throwaway stores.
///
/// # Errors
///
/// Returns an error if SQLite cannot allocate the database.
pub fn open_in_memory_connection() -> Result<Connection> {
    register_vector_extension();
    let conn = Connection::open_in_memory().context("open in-memory document store")?;
    conn.pragma_update(None, "foreign_keys", "ON")
        .context("enable foreign keys")?;
    Ok(conn)
}

/// Whether `vec_distance_cosine` and `vec_f32` are callable on `conn`.
#[must_use]
pub fn vector_extension_available(conn: &Connection) -> bool {
    duet_sqlite_vec::vec_version(conn).is_some()
}

fn register_vector_extension() {
    if let Err(err) = duet_sqlite_vec::register_auto_extension() {
        debug!(error = %err, "sqlite-vec unavailable; vector search uses the Rust scan");
    }
}

fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    let _journal_mode: String =
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
    Ok(())
}
