//! The seam between this crate and a database client library.
//!
//! A [`Driver`] opens connections; a [`DriverConnection`] runs SQL text and tears itself down.
//! Adapters for `mysql_async` and `rusqlite` live behind the `mysql` and `sqlite` features.

use async_trait::async_trait;

use crate::config::ConnectParams;
use crate::error::SqlInstanceError;
use crate::results::QueryOutput;
use crate::types::Dialect;

/// Opens connections.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Establish a new connection using `params`.
    ///
    /// # Errors
    /// Returns the driver's error when the host is unreachable or rejects the credentials.
    async fn connect(
        &self,
        params: &ConnectParams,
    ) -> Result<Box<dyn DriverConnection>, SqlInstanceError>;

    /// Dialect used for escaping and transaction keywords.
    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }
}

/// One live connection.
///
/// `query` accepts several `;`-separated statements and returns one output per statement. If a
/// statement fails while an explicit transaction is open, the adapter discards that transaction
/// before returning the error, the way a server aborts it when the session ends.
#[async_trait]
pub trait DriverConnection: Send {
    /// Execute `sql` verbatim.
    ///
    /// # Errors
    /// Returns the driver's error for malformed SQL, constraint violations and aborted
    /// transactions.
    async fn query(&mut self, sql: &str) -> Result<QueryOutput, SqlInstanceError>;

    /// Graceful disconnect.
    ///
    /// # Errors
    /// Returns the driver's error if the goodbye exchange fails; the caller then calls
    /// [`DriverConnection::destroy`].
    async fn end(&mut self) -> Result<(), SqlInstanceError>;

    /// Drop the connection immediately without talking to the server.
    fn destroy(&mut self);
}
