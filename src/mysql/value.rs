use chrono::NaiveDate;
use mysql_async::Column;
use mysql_async::Value;
use mysql_async::consts::ColumnType;

use crate::types::{SqlValue, parse_timestamp};

/// Character set id MySQL reports for binary columns.
const BINARY_CHARSET: u16 = 63;

/// Convert a text-protocol value using its column metadata.
///
/// Integer, float, temporal and JSON columns are parsed into typed values. `DECIMAL` stays text
/// so no precision is lost. Binary strings become blobs; anything unparseable falls back to text.
#[must_use]
pub fn mysql_value_to_sql(value: Value, column: &Column) -> SqlValue {
    match value {
        Value::NULL => SqlValue::Null,
        Value::Int(i) => SqlValue::Int(i),
        Value::UInt(u) => i64::try_from(u).map_or_else(|_| SqlValue::Text(u.to_string()), SqlValue::Int),
        Value::Float(f) => SqlValue::Float(f64::from(f)),
        Value::Double(f) => SqlValue::Float(f),
        Value::Date(year, month, day, hour, minute, second, micros) => {
            NaiveDate::from_ymd_opt(i32::from(year), u32::from(month), u32::from(day))
                .and_then(|d| {
                    d.and_hms_micro_opt(u32::from(hour), u32::from(minute), u32::from(second), micros)
                })
                .map_or(SqlValue::Null, SqlValue::Timestamp)
        }
        Value::Time(negative, days, hours, minutes, seconds, micros) => {
            let total_hours = days * 24 + u32::from(hours);
            let sign = if negative { "-" } else { "" };
            SqlValue::Text(format!(
                "{sign}{total_hours:02}:{minutes:02}:{seconds:02}.{micros:06}"
            ))
        }
        Value::Bytes(bytes) => convert_bytes(bytes, column),
    }
}

fn convert_bytes(bytes: Vec<u8>, column: &Column) -> SqlValue {
    let column_type = column.column_type();
    if column_type == ColumnType::MYSQL_TYPE_BIT
        || (is_string_type(column_type) && column.character_set() == BINARY_CHARSET)
    {
        return SqlValue::Blob(bytes);
    }

    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => return SqlValue::Blob(err.into_bytes()),
    };

    match column_type {
        ColumnType::MYSQL_TYPE_TINY
        | ColumnType::MYSQL_TYPE_SHORT
        | ColumnType::MYSQL_TYPE_LONG
        | ColumnType::MYSQL_TYPE_INT24
        | ColumnType::MYSQL_TYPE_LONGLONG
        | ColumnType::MYSQL_TYPE_YEAR => text.parse::<i64>().map_or(SqlValue::Text(text), SqlValue::Int),
        ColumnType::MYSQL_TYPE_FLOAT | ColumnType::MYSQL_TYPE_DOUBLE => {
            text.parse::<f64>().map_or(SqlValue::Text(text), SqlValue::Float)
        }
        ColumnType::MYSQL_TYPE_DATE
        | ColumnType::MYSQL_TYPE_DATETIME
        | ColumnType::MYSQL_TYPE_DATETIME2
        | ColumnType::MYSQL_TYPE_TIMESTAMP
        | ColumnType::MYSQL_TYPE_TIMESTAMP2
        | ColumnType::MYSQL_TYPE_NEWDATE => {
            parse_timestamp(&text).map_or(SqlValue::Text(text), SqlValue::Timestamp)
        }
        ColumnType::MYSQL_TYPE_JSON => {
            serde_json::from_str(&text).map_or(SqlValue::Text(text), SqlValue::JSON)
        }
        _ => SqlValue::Text(text),
    }
}

fn is_string_type(column_type: ColumnType) -> bool {
    matches!(
        column_type,
        ColumnType::MYSQL_TYPE_STRING
            | ColumnType::MYSQL_TYPE_VAR_STRING
            | ColumnType::MYSQL_TYPE_VARCHAR
            | ColumnType::MYSQL_TYPE_BLOB
            | ColumnType::MYSQL_TYPE_TINY_BLOB
            | ColumnType::MYSQL_TYPE_MEDIUM_BLOB
            | ColumnType::MYSQL_TYPE_LONG_BLOB
    )
}
