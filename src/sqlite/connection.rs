use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::task::spawn_blocking;

use crate::driver::DriverConnection;
use crate::error::SqlInstanceError;
use crate::results::QueryOutput;

use super::query::run_statements;

pub(crate) type SharedSqliteConnection = Arc<Mutex<rusqlite::Connection>>;

/// One open `rusqlite` connection; `None` once ended or destroyed.
pub struct SqliteConnection {
    conn: Option<SharedSqliteConnection>,
    read_only: bool,
}

impl SqliteConnection {
    pub(crate) fn new(conn: rusqlite::Connection, read_only: bool) -> Self {
        Self {
            conn: Some(Arc::new(Mutex::new(conn))),
            read_only,
        }
    }

    fn conn_handle(&self) -> Result<SharedSqliteConnection, SqlInstanceError> {
        self.conn
            .as_ref()
            .map(Arc::clone)
            .ok_or_else(|| SqlInstanceError::ConnectionError("SQLite connection is closed".into()))
    }
}

impl fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("open", &self.conn.is_some())
            .field("read_only", &self.read_only)
            .finish()
    }
}

#[async_trait]
impl DriverConnection for SqliteConnection {
    async fn query(&mut self, sql: &str) -> Result<QueryOutput, SqlInstanceError> {
        let sql_owned = sql.to_owned();
        run_blocking(self.conn_handle()?, move |guard| run_statements(guard, &sql_owned)).await
    }

    async fn end(&mut self) -> Result<(), SqlInstanceError> {
        let Some(handle) = self.conn.take() else {
            return Ok(());
        };
        let Ok(mutex) = Arc::try_unwrap(handle) else {
            // a blocking task still holds it; that task's drop closes the handle
            return Ok(());
        };
        spawn_blocking(move || {
            mutex
                .into_inner()
                .close()
                .map_err(|(_, err)| SqlInstanceError::SqliteError(err))
        })
        .await
        .map_err(|e| SqlInstanceError::ConnectionError(format!("sqlite spawn_blocking join error: {e}")))?
    }

    fn destroy(&mut self) {
        drop(self.conn.take());
    }
}

pub(crate) async fn run_blocking<F, R>(
    conn: SharedSqliteConnection,
    func: F,
) -> Result<R, SqlInstanceError>
where
    F: FnOnce(&mut rusqlite::Connection) -> Result<R, SqlInstanceError> + Send + 'static,
    R: Send + 'static,
{
    spawn_blocking(move || {
        let mut guard = conn.blocking_lock();
        func(&mut guard)
    })
    .await
    .map_err(|e| SqlInstanceError::ExecutionError(format!("sqlite spawn_blocking join error: {e}")))?
}
