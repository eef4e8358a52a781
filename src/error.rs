use thiserror::Error;

#[cfg(feature = "mysql")]
use mysql_async;
#[cfg(feature = "sqlite")]
use rusqlite;

use crate::types::ConnectionRole;

#[derive(Debug, Error)]
pub enum SqlInstanceError {
    #[cfg(feature = "mysql")]
    #[error(transparent)]
    MysqlError(#[from] mysql_async::Error),

    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    /// Opening the connection for `role` failed; `source` is the driver's error untouched.
    #[error("Failed to open {role} connection: {source}")]
    ConnectFailed {
        role: ConnectionRole,
        #[source]
        source: Box<SqlInstanceError>,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Parameter error: {0}")]
    ParameterError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("Other database error: {0}")]
    Other(String),
}

/// Coarse classification of a [`SqlInstanceError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Host unreachable, authentication failure, misconfigured role host.
    Connection,
    /// Malformed SQL, constraint violation, aborted transaction.
    Query,
    /// Unsupported input handed to the query builder.
    BuilderMisuse,
    /// Invalid configuration detected before any network activity.
    Config,
}

impl SqlInstanceError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            #[cfg(feature = "mysql")]
            Self::MysqlError(mysql_async::Error::Io(_) | mysql_async::Error::Driver(_)) => {
                ErrorKind::Connection
            }
            #[cfg(feature = "mysql")]
            Self::MysqlError(_) => ErrorKind::Query,
            #[cfg(feature = "sqlite")]
            Self::SqliteError(_) => ErrorKind::Query,
            Self::ConnectFailed { .. } | Self::ConnectionError(_) => ErrorKind::Connection,
            Self::ConfigError(_) => ErrorKind::Config,
            Self::ParameterError(_) => ErrorKind::BuilderMisuse,
            Self::ExecutionError(_) | Self::Other(_) => ErrorKind::Query,
        }
    }

    /// The error as reported by the driver, looking through `ConnectFailed`.
    #[must_use]
    pub fn driver_error(&self) -> &SqlInstanceError {
        match self {
            Self::ConnectFailed { source, .. } => source.driver_error(),
            other => other,
        }
    }
}
