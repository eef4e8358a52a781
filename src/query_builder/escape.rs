use std::fmt::Write as _;

use crate::error::SqlInstanceError;
use crate::types::{Dialect, SqlValue};

use super::SqlInput;

/// Render one input for a `?` placeholder.
pub(super) fn escape_input(input: &SqlInput, dialect: Dialect) -> Result<String, SqlInstanceError> {
    match input {
        SqlInput::Value(value) => escape_value(value, dialect),
        SqlInput::Raw(raw) => Ok(raw.as_str().to_string()),
        SqlInput::List(items) => items
            .iter()
            .map(|item| match item {
                SqlInput::List(_) => escape_input(item, dialect).map(|inner| format!("({inner})")),
                _ => escape_input(item, dialect),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(|parts| parts.join(", ")),
        SqlInput::FieldMap(map) => {
            let mut parts = Vec::with_capacity(map.len());
            for (key, value) in map {
                let rendered = match value {
                    SqlInput::Value(_) | SqlInput::Raw(_) => escape_input(value, dialect)?,
                    SqlInput::List(_) | SqlInput::FieldMap(_) => {
                        return Err(SqlInstanceError::ParameterError(format!(
                            "field `{key}` must hold a single value, not a list or map"
                        )));
                    }
                };
                parts.push(format!("{} = {rendered}", escape_identifier(key, dialect)));
            }
            Ok(parts.join(", "))
        }
    }
}

/// Render one input for a `??` placeholder.
pub(super) fn escape_identifier_input(
    input: &SqlInput,
    dialect: Dialect,
) -> Result<String, SqlInstanceError> {
    match input {
        SqlInput::Value(SqlValue::Text(name)) => Ok(escape_identifier(name, dialect)),
        SqlInput::Value(SqlValue::Int(n)) => Ok(escape_identifier(&n.to_string(), dialect)),
        SqlInput::Raw(raw) => Ok(raw.as_str().to_string()),
        SqlInput::List(items) => items
            .iter()
            .map(|item| match item {
                SqlInput::List(_) => Err(SqlInstanceError::ParameterError(
                    "identifier lists cannot be nested".to_string(),
                )),
                _ => escape_identifier_input(item, dialect),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(|parts| parts.join(", ")),
        other => Err(SqlInstanceError::ParameterError(format!(
            "identifier placeholder needs a name, got {other:?}"
        ))),
    }
}

pub(super) fn escape_value(value: &SqlValue, dialect: Dialect) -> Result<String, SqlInstanceError> {
    match value {
        SqlValue::Null => Ok("NULL".to_string()),
        SqlValue::Bool(b) => Ok(if *b { "true" } else { "false" }.to_string()),
        SqlValue::Int(i) => Ok(i.to_string()),
        SqlValue::Float(f) => {
            if f.is_finite() {
                Ok(f.to_string())
            } else {
                Err(SqlInstanceError::ParameterError(format!(
                    "{f} has no SQL literal form"
                )))
            }
        }
        SqlValue::Text(s) => escape_string(s, dialect),
        SqlValue::Timestamp(ts) => {
            escape_string(&ts.format("%Y-%m-%d %H:%M:%S%.3f").to_string(), dialect)
        }
        SqlValue::JSON(json) => escape_string(&json.to_string(), dialect),
        SqlValue::Blob(bytes) => Ok(hex_literal(bytes)),
    }
}

/// Quote a string literal.
///
/// MySQL escapes NUL, backspace, tab, newline, carriage return, ctrl-Z, both quote characters and
/// the backslash. SQLite only understands doubled single quotes and cannot carry NUL in a literal.
pub(super) fn escape_string(s: &str, dialect: Dialect) -> Result<String, SqlInstanceError> {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    match dialect {
        Dialect::MySql => {
            for ch in s.chars() {
                match ch {
                    '\0' => out.push_str("\\0"),
                    '\u{8}' => out.push_str("\\b"),
                    '\t' => out.push_str("\\t"),
                    '\n' => out.push_str("\\n"),
                    '\r' => out.push_str("\\r"),
                    '\u{1a}' => out.push_str("\\Z"),
                    '"' => out.push_str("\\\""),
                    '\'' => out.push_str("\\'"),
                    '\\' => out.push_str("\\\\"),
                    other => out.push(other),
                }
            }
        }
        Dialect::Sqlite => {
            if s.contains('\0') {
                return Err(SqlInstanceError::ParameterError(
                    "SQLite string literals cannot contain NUL".to_string(),
                ));
            }
            for ch in s.chars() {
                if ch == '\'' {
                    out.push('\'');
                }
                out.push(ch);
            }
        }
    }
    out.push('\'');
    Ok(out)
}

/// Quote an identifier; `.` separates qualified parts (`db.table` → `` `db`.`table` ``).
pub(super) fn escape_identifier(name: &str, dialect: Dialect) -> String {
    let quote = match dialect {
        Dialect::MySql => '`',
        Dialect::Sqlite => '"',
    };
    let mut out = String::with_capacity(name.len() + 2);
    out.push(quote);
    for ch in name.chars() {
        match ch {
            c if c == quote => {
                out.push(quote);
                out.push(quote);
            }
            '.' => {
                out.push(quote);
                out.push('.');
                out.push(quote);
            }
            other => out.push(other),
        }
    }
    out.push(quote);
    out
}

fn hex_literal(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2 + 3);
    out.push_str("X'");
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out.push('\'');
    out
}
