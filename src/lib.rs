//! Per-request database connections with read/write routing, normalized results and
//! transactional write batches.
//!
//! A [`RequestInstance`] owns at most one connection per [`ConnectionRole`]. Connections open
//! on first use through a [`SqlClient`], and [`RequestInstance::cleanup`] closes each of them
//! exactly once when the request ends.

pub mod config;
pub mod driver;
pub mod error;
pub mod executor;
pub mod instance;
pub mod manager;
pub mod prelude;
pub mod query_builder;
pub mod results;
pub mod types;

#[cfg(feature = "mysql")]
pub mod mysql;
#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::{ConnectParams, DbConfig, DbConfigBuilder, DbConfigOverride};
pub use driver::{Driver, DriverConnection};
pub use error::{ErrorKind, SqlInstanceError};
pub use executor::{Record, SqlClient, SqlUnit};
pub use instance::{CleanupRoutine, RequestInstance};
pub use manager::{ConnectionFuture, ConnectionManager};
pub use query_builder::{
    JoinOperator, RawFragment, SqlInput, build_multi_condition, build_query, build_raw_text,
};
pub use results::{QueryOutput, ResultSet, Row, RowMap, WriteSummary};
pub use types::{Access, ConnectionRole, Dialect, SqlValue};

#[cfg(feature = "mysql")]
pub use mysql::MySqlDriver;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDriver;
