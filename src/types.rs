use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A single value read from a row or bound into a query.
///
/// ```rust
/// use sql_instance::prelude::*;
///
/// let values = vec![
///     SqlValue::Int(1),
///     SqlValue::Text("alice".into()),
///     SqlValue::from(Some(true)),
///     SqlValue::from(None::<i64>),
/// ];
/// assert!(values[3].is_null());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value
    JSON(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl SqlValue {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        if let SqlValue::Int(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let SqlValue::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    /// MySQL has no boolean column type; `TINYINT(1)` values 0/1 read back as booleans here.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SqlValue::Bool(value) => Some(*value),
            SqlValue::Int(1) => Some(true),
            SqlValue::Int(0) => Some(false),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            SqlValue::Timestamp(value) => Some(*value),
            SqlValue::Text(s) => parse_timestamp(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            SqlValue::Float(value) => Some(*value),
            #[allow(clippy::cast_precision_loss)]
            SqlValue::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let SqlValue::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_json(&self) -> Option<&JsonValue> {
        if let SqlValue::JSON(value) = self {
            Some(value)
        } else {
            None
        }
    }
}

/// Parse the timestamp layouts MySQL and SQLite hand back as text.
pub(crate) fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

macro_rules! sql_value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for SqlValue {
                fn from(value: $ty) -> Self {
                    SqlValue::$variant(value.into())
                }
            }
        )*
    };
}

sql_value_from!(
    i8 => Int,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    u8 => Int,
    u16 => Int,
    u32 => Int,
    f32 => Float,
    f64 => Float,
    bool => Bool,
    String => Text,
    &str => Text,
    NaiveDateTime => Timestamp,
    JsonValue => JSON,
    Vec<u8> => Blob,
);

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(SqlValue::Null, Into::into)
    }
}

/// Which of the two per-instance connections an operation uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectionRole {
    /// Read/write connection against `HOST`.
    Primary,
    /// Read-only connection against `READER_HOST`.
    ReadOnly,
}

impl ConnectionRole {
    pub const ALL: [ConnectionRole; 2] = [ConnectionRole::Primary, ConnectionRole::ReadOnly];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionRole::Primary => "primary",
            ConnectionRole::ReadOnly => "read-only",
        }
    }
}

impl fmt::Display for ConnectionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an operation intends to do with its connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

/// SQL dialect spoken by a driver; drives escaping and transaction keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// MySQL / MariaDB: backslash escapes, backtick identifiers.
    #[default]
    MySql,
    /// SQLite: doubled single quotes, double-quoted identifiers.
    Sqlite,
}

impl Dialect {
    /// Statement opening an explicit transaction.
    #[must_use]
    pub fn begin_transaction(self) -> &'static str {
        match self {
            Dialect::MySql => "START TRANSACTION",
            Dialect::Sqlite => "BEGIN TRANSACTION",
        }
    }

    /// Statement committing an explicit transaction.
    #[must_use]
    pub fn commit(self) -> &'static str {
        "COMMIT"
    }

    /// Statement discarding an explicit transaction.
    #[must_use]
    pub fn rollback(self) -> &'static str {
        "ROLLBACK"
    }
}
