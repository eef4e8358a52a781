// SQLite adapter - runs the same lifecycle against a database file
//
// - connection: the `DriverConnection` wrapper and blocking-task plumbing
// - query: statement execution and value extraction
//
// The configured host is the database path. The read-only role opens it with read-only flags,
// so a `READER_HOST` pointing at the same file through a URI (`file:app.db?mode=ro`) is honoured.

mod connection;
pub mod query;

use async_trait::async_trait;
use rusqlite::OpenFlags;
use tokio::task::spawn_blocking;

use crate::config::ConnectParams;
use crate::driver::{Driver, DriverConnection};
use crate::error::SqlInstanceError;
use crate::types::{ConnectionRole, Dialect};

pub use connection::SqliteConnection;
pub use query::{build_result_set, sqlite_extract_value_sync};

/// Opens `rusqlite` connections on the blocking pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDriver;

impl SqliteDriver {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Driver for SqliteDriver {
    async fn connect(
        &self,
        params: &ConnectParams,
    ) -> Result<Box<dyn DriverConnection>, SqlInstanceError> {
        let path = params.host.clone();
        let read_only = params.role == ConnectionRole::ReadOnly;
        let flags = if read_only {
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_URI
        } else {
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI
        };

        let conn = spawn_blocking(move || rusqlite::Connection::open_with_flags(&path, flags))
            .await
            .map_err(|e| {
                SqlInstanceError::ConnectionError(format!("sqlite spawn_blocking join error: {e}"))
            })??;
        Ok(Box::new(SqliteConnection::new(conn, read_only)))
    }

    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }
}
