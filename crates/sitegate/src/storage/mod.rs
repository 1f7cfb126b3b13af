//! Storage layer for sitegate.
//!
//! This module provides `SQLite`-based persistent storage for every site
//! record. Queries for each record family live in their own submodule as
//! further `impl Storage` blocks. Writes that must land together (a
//! signature and its register entry, a revision and the entries it
//! supersedes, a change and the notifications it sends) run inside one
//! [`Storage::atomically`] unit.

pub mod migrations;
pub mod schema;

mod deliveries;
mod notices;
mod notifications;
mod projects;
mod qualifications;
mod rams;
mod users;

use std::path::{Path, PathBuf};
use std::str::FromStr;

use rusqlite::types::Type;
use rusqlite::{Connection, Row};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

pub use rams::Revised;

/// Storage engine for site records.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        // Enable WAL mode for better concurrent read performance
        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;",
        )?;

        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `work` as one unit: every write it makes lands, or none do.
    ///
    /// Units nest. A failing inner unit rolls back its own writes, and the
    /// outer unit rolls back the rest when the error is passed on.
    ///
    /// # Errors
    ///
    /// Returns the error from `work` once its writes are rolled back, or a
    /// database error if the unit cannot be opened or released.
    pub fn atomically<T>(&self, work: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        self.conn.execute_batch("SAVEPOINT site_unit;")?;
        let outcome = work(self).and_then(|value| {
            self.conn.execute_batch("RELEASE site_unit;")?;
            Ok(value)
        });
        if outcome.is_err() {
            if let Err(e) = self
                .conn
                .execute_batch("ROLLBACK TO site_unit; RELEASE site_unit;")
            {
                warn!(error = %e, "Failed to roll back storage unit");
            }
        }
        outcome
    }

    fn count_rows(&self, table: &str) -> Result<i64> {
        let count: i64 =
            self.conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                    row.get(0)
                })?;
        Ok(count)
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let outstanding_register_entries: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM task_plan_rams_register WHERE status = 'outstanding'",
            [],
            |row| row.get(0),
        )?;

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            users: self.count_rows("users")?,
            projects: self.count_rows("projects")?,
            rams_documents: self.count_rows("rams_documents")?,
            signatures: self.count_rows("contractor_rams_signatures")?,
            outstanding_register_entries,
            deliveries: self.count_rows("delivery_requests")?,
            notices: self.count_rows("site_notices")?,
            notifications: self.count_rows("smart_notifications")?,
            qualifications: self.count_rows("qualifications")?,
            db_size_bytes,
        })
    }
}

/// Statistics about the storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageStats {
    /// User profiles.
    pub users: i64,
    /// Projects.
    pub projects: i64,
    /// RAMS document versions.
    pub rams_documents: i64,
    /// Captured signatures.
    pub signatures: i64,
    /// Register entries awaiting a signature.
    pub outstanding_register_entries: i64,
    /// Delivery requests.
    pub deliveries: i64,
    /// Site notices.
    pub notices: i64,
    /// Notifications.
    pub notifications: i64,
    /// Qualifications.
    pub qualifications: i64,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

/// Read a text column and parse it into a domain type.
fn decode<T: FromStr>(row: &Row, idx: usize, column: &'static str) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|_| corrupt(idx, column, raw.clone()))
}

/// Read a nullable text column and parse it into a domain type.
fn decode_opt<T: FromStr>(
    row: &Row,
    idx: usize,
    column: &'static str,
) -> rusqlite::Result<Option<T>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|raw| raw.parse().map_err(|_| corrupt(idx, column, raw.clone())))
        .transpose()
}

fn corrupt(idx: usize, column: &'static str, value: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        Type::Text,
        Box::new(Error::CorruptValue { column, value }),
    )
}

/// Map "no row changed" to a not-found error.
fn expect_changed(affected: usize, entity: &'static str, id: i64) -> Result<()> {
    if affected == 0 {
        Err(Error::not_found(entity, id))
    } else {
        Ok(())
    }
}
