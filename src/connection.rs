//! Connection lifecycle for one database file.
//!
//! [`ConnectionHandle`] wraps the engine connection and exposes the few
//! primitives the client needs. [`ConnectionManager`] owns at most one
//! handle and hands it out through scoped acquisition: every engine call
//! runs inside [`ConnectionManager::with_connection`] on the blocking pool,
//! one scope at a time.

use crate::config::SqliteConfig;
use crate::error::{interrupted, AdapterError, Result};
use crate::types::{RawResult, Row, Value};
use rusqlite::{params_from_iter, Batch, Connection, InterruptHandle, OpenFlags, Statement};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// VM instructions between two checks of the cancel flag.
const PROGRESS_OPS: i32 = 1000;

/// Reads the file header; fails on files that are not databases.
const SCHEMA_VERSION: &str = "PRAGMA schema_version";

/// One open session against the database file.
#[derive(Debug)]
pub struct ConnectionHandle {
    conn: Connection,
    path: PathBuf,
}

impl ConnectionHandle {
    /// Opens the file in serialized threading mode.
    ///
    /// The file header is read right away, so a file that is not a database
    /// fails here with a connection error rather than on first use.
    pub fn open(config: &SqliteConfig) -> Result<Self> {
        let mut flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
        if config.create {
            flags |= OpenFlags::SQLITE_OPEN_CREATE;
        }

        let path = config.db_path.clone();
        debug!(path = %path.display(), "sqlite.open");
        let connection_failed = |source| AdapterError::ConnectionFailed {
            path: path.clone(),
            source,
        };
        let conn = Connection::open_with_flags(&path, flags).map_err(connection_failed)?;
        conn.query_row(SCHEMA_VERSION, [], |row| row.get::<_, i64>(0))
            .map_err(connection_failed)?;

        Ok(Self { conn, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.conn.get_interrupt_handle()
    }

    /// Runs every statement in `sql`, in order, returning one raw result per
    /// statement. `params` bind to the statements that declare parameters.
    pub fn all(&self, sql: &str, params: &[Value]) -> Result<Vec<RawResult>> {
        self.run(sql, params, None)
            .map_err(|source| AdapterError::engine("executing query", source))
    }

    /// Like [`ConnectionHandle::all`], but aborts with an interrupt error as
    /// soon as `canceled` is raised, between statements or mid-statement.
    pub fn all_cancellable(
        &self,
        sql: &str,
        params: &[Value],
        canceled: &Arc<AtomicBool>,
    ) -> Result<Vec<RawResult>> {
        let flag = Arc::clone(canceled);
        self.conn
            .progress_handler(PROGRESS_OPS, Some(move || flag.load(Ordering::SeqCst)));
        let results = self.run(sql, params, Some(canceled));
        self.conn.progress_handler(0, None::<fn() -> bool>);

        results.map_err(|source| AdapterError::engine("executing query", source))
    }

    fn run(
        &self,
        sql: &str,
        params: &[Value],
        canceled: Option<&AtomicBool>,
    ) -> rusqlite::Result<Vec<RawResult>> {
        let mut results = Vec::new();
        let mut batch = Batch::new(&self.conn, sql);
        while let Some(mut stmt) = batch.next()? {
            if canceled.is_some_and(|flag| flag.load(Ordering::SeqCst)) {
                return Err(interrupted());
            }
            results.push(read_statement(&self.conn, &mut stmt, params)?);
        }
        Ok(results)
    }

    /// Closes the engine connection, logging instead of failing.
    pub fn close(self) {
        let path = self.path;
        match self.conn.close() {
            Ok(()) => debug!(path = %path.display(), "sqlite.close"),
            Err((_conn, err)) => {
                warn!(path = %path.display(), error = %err, "sqlite.close.failed")
            }
        }
    }
}

/// Rows changed by INSERT, UPDATE and DELETE since the connection opened.
fn total_changes(conn: &Connection) -> i64 {
    // SAFETY: the raw handle stays valid while `conn` is borrowed.
    i64::from(unsafe { rusqlite::ffi::sqlite3_total_changes(conn.handle()) })
}

fn read_statement(
    conn: &Connection,
    stmt: &mut Statement<'_>,
    params: &[Value],
) -> rusqlite::Result<RawResult> {
    let bound: &[Value] = if stmt.parameter_count() > 0 { params } else { &[] };
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    if columns.is_empty() {
        // `changes()` keeps the last DML count across DDL, PRAGMA and
        // transaction control, so only trust it when this statement moved
        // the total.
        let before = total_changes(conn);
        let changed = stmt.execute(params_from_iter(bound.iter()))?;
        let affected = if total_changes(conn) == before {
            0
        } else {
            changed as u64
        };
        return Ok(RawResult {
            rows: Vec::new(),
            affected_rows: Some(affected),
        });
    }

    let mut rows = Vec::new();
    let mut cursor = stmt.query(params_from_iter(bound.iter()))?;
    while let Some(row) = cursor.next()? {
        let mut entries = Vec::with_capacity(columns.len());
        for (idx, name) in columns.iter().enumerate() {
            entries.push((name.clone(), Value::from(row.get_ref(idx)?)));
        }
        rows.push(Row::from(entries));
    }

    Ok(RawResult {
        rows,
        affected_rows: None,
    })
}

/// Owns the single connection handle of one client.
#[derive(Debug, Clone)]
pub struct ConnectionManager {
    config: Arc<SqliteConfig>,
    slot: Arc<Mutex<Option<ConnectionHandle>>>,
}

impl ConnectionManager {
    pub fn new(config: SqliteConfig) -> Self {
        Self {
            config: Arc::new(config),
            slot: Arc::new(Mutex::new(None)),
        }
    }

    pub fn config(&self) -> &SqliteConfig {
        &self.config
    }

    /// Runs `f` with a live handle, opening one when none is retained.
    ///
    /// Scopes are serialized. Unless `keep_alive` is set the handle is closed
    /// when `f` returns, whatever its outcome; a panic in `f` drops it.
    pub async fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&ConnectionHandle) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let mut slot = Arc::clone(&self.slot).lock_owned().await;
        let config = Arc::clone(&self.config);

        tokio::task::spawn_blocking(move || {
            let handle = match slot.take() {
                Some(handle) => handle,
                None => ConnectionHandle::open(&config)?,
            };

            let result = f(&handle);

            if config.keep_alive {
                *slot = Some(handle);
            } else {
                handle.close();
            }
            result
        })
        .await?
    }

    /// Closes the retained handle, if any.
    pub async fn disconnect(&self) -> Result<()> {
        let handle = self.slot.lock().await.take();
        if let Some(handle) = handle {
            tokio::task::spawn_blocking(move || handle.close()).await?;
        }
        Ok(())
    }

    /// Whether a handle is currently retained between scopes.
    pub async fn is_open(&self) -> bool {
        self.slot.lock().await.is_some()
    }
}
