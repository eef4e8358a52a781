//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::config::{DbConfig, DbConfigOverride};
pub use crate::driver::{Driver, DriverConnection};
pub use crate::error::{ErrorKind, SqlInstanceError};
pub use crate::executor::{Record, SqlClient, SqlUnit};
pub use crate::instance::{CleanupRoutine, RequestInstance};
pub use crate::query_builder::{
    JoinOperator, RawFragment, SqlInput, build_multi_condition, build_query, build_raw_text,
};
pub use crate::results::{QueryOutput, ResultSet, RowMap};
pub use crate::types::{ConnectionRole, Dialect, SqlValue};

#[cfg(feature = "mysql")]
pub use crate::mysql::MySqlDriver;
#[cfg(feature = "sqlite")]
pub use crate::sqlite::SqliteDriver;
