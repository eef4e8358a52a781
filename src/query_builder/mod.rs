//! Escaped SQL text from a template and inputs.
//!
//! `?` takes a value, `??` takes an identifier. Placeholders inside quoted text and comments are
//! left alone, as are runs of three or more `?`.
//!
//! ```rust
//! use sql_instance::prelude::*;
//!
//! let sql = build_query(
//!     "SELECT * FROM ?? WHERE ?? = ?",
//!     &["test".into(), "id".into(), 42.into()],
//! )
//! .unwrap();
//! assert_eq!(sql, "SELECT * FROM `test` WHERE `id` = 42");
//! ```

mod escape;
mod scanner;

use std::fmt;

use indexmap::IndexMap;

use crate::error::SqlInstanceError;
use crate::types::{Dialect, SqlValue};

use escape::{escape_identifier_input, escape_input};
use scanner::find_placeholders;

/// SQL text that is emitted verbatim by [`build_query`].
///
/// Bypasses escaping entirely; only build these from trusted text such as keywords or
/// sub-queries that were themselves built with [`build_query`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFragment(String);

impl RawFragment {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RawFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One input to [`build_query`].
#[derive(Debug, Clone, PartialEq)]
pub enum SqlInput {
    /// Escaped scalar.
    Value(SqlValue),
    /// Emitted verbatim.
    Raw(RawFragment),
    /// Comma-separated values, e.g. for `IN (?)`; nested lists are parenthesized.
    List(Vec<SqlInput>),
    /// `` `key` = value `` pairs, e.g. for `SET ?`.
    FieldMap(IndexMap<String, SqlInput>),
}

impl SqlInput {
    /// Build a field map input from `(key, value)` pairs, keeping their order.
    pub fn field_map<K, V, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<SqlInput>,
    {
        SqlInput::FieldMap(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

macro_rules! sql_input_from_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for SqlInput {
                fn from(value: $ty) -> Self {
                    SqlInput::Value(value.into())
                }
            }
        )*
    };
}

sql_input_from_value!(
    SqlValue,
    i8,
    i16,
    i32,
    i64,
    u8,
    u16,
    u32,
    f32,
    f64,
    bool,
    String,
    &str,
    chrono::NaiveDateTime,
    serde_json::Value,
    Vec<u8>,
);

impl<T: Into<SqlValue>> From<Option<T>> for SqlInput {
    fn from(value: Option<T>) -> Self {
        SqlInput::Value(value.into())
    }
}

impl From<RawFragment> for SqlInput {
    fn from(raw: RawFragment) -> Self {
        SqlInput::Raw(raw)
    }
}

/// Join operator for [`build_multi_condition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinOperator {
    #[default]
    And,
    Or,
}

impl JoinOperator {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            JoinOperator::And => "AND",
            JoinOperator::Or => "OR",
        }
    }
}

/// Substitute `inputs` into `template` using MySQL escaping.
///
/// # Errors
/// Returns `SqlInstanceError::ParameterError` when an input cannot be rendered for its
/// placeholder (non-finite float, map where an identifier is expected, nested map).
pub fn build_query(template: &str, inputs: &[SqlInput]) -> Result<String, SqlInstanceError> {
    build_query_for(Dialect::MySql, template, inputs)
}

/// [`build_query`] for an explicit dialect.
///
/// # Errors
/// See [`build_query`].
pub fn build_query_for(
    dialect: Dialect,
    template: &str,
    inputs: &[SqlInput],
) -> Result<String, SqlInstanceError> {
    let placeholders = find_placeholders(template, dialect);
    if placeholders.is_empty() || inputs.is_empty() {
        return Ok(template.to_string());
    }

    let mut out = String::with_capacity(template.len() + inputs.len() * 8);
    let mut cursor = 0;
    let mut next_input = inputs.iter();

    for placeholder in placeholders {
        if placeholder.len > 2 {
            continue;
        }
        let Some(input) = next_input.next() else {
            break;
        };
        let rendered = if placeholder.len == 2 {
            escape_identifier_input(input, dialect)?
        } else {
            escape_input(input, dialect)?
        };
        out.push_str(&template[cursor..placeholder.start]);
        out.push_str(&rendered);
        cursor = placeholder.start + placeholder.len;
    }

    out.push_str(&template[cursor..]);
    Ok(out)
}

/// Wrap trusted SQL so it is emitted unescaped.
#[must_use]
pub fn build_raw_text(fragment: impl Into<String>) -> RawFragment {
    RawFragment(fragment.into())
}

/// Join `` `field` = value `` conditions with `AND` / `OR`, in the map's order.
///
/// An empty map yields an empty string; the caller decides whether to omit the `WHERE`.
///
/// # Errors
/// Returns `SqlInstanceError::ParameterError` if a value cannot be escaped.
pub fn build_multi_condition(
    fields: &IndexMap<String, SqlInput>,
    operator: JoinOperator,
) -> Result<String, SqlInstanceError> {
    build_multi_condition_for(Dialect::MySql, fields, operator)
}

/// [`build_multi_condition`] for an explicit dialect.
///
/// # Errors
/// See [`build_multi_condition`].
pub fn build_multi_condition_for(
    dialect: Dialect,
    fields: &IndexMap<String, SqlInput>,
    operator: JoinOperator,
) -> Result<String, SqlInstanceError> {
    let conditions = fields
        .iter()
        .map(|(key, value)| {
            build_query_for(
                dialect,
                " ?? = ? ",
                &[SqlInput::from(key.as_str()), value.clone()],
            )
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(conditions.join(&format!(" {} ", operator.as_str())))
}
