use rusqlite::fallible_iterator::FallibleIterator;
use rusqlite::types::Value;
use rusqlite::{Batch, Connection, Statement};
use tracing::warn;

use crate::error::SqlInstanceError;
use crate::results::{QueryOutput, ResultSet, WriteSummary};
use crate::types::{Dialect, SqlValue};

/// Extract a `SqlValue` from a `SQLite` row.
///
/// # Errors
///
/// Returns `SqlInstanceError` if the value cannot be read.
pub fn sqlite_extract_value_sync(
    row: &rusqlite::Row,
    idx: usize,
) -> Result<SqlValue, SqlInstanceError> {
    let value: Value = row.get(idx)?;
    match value {
        Value::Null => Ok(SqlValue::Null),
        Value::Integer(i) => Ok(SqlValue::Int(i)),
        Value::Real(f) => Ok(SqlValue::Float(f)),
        Value::Text(s) => Ok(SqlValue::Text(s)),
        Value::Blob(b) => Ok(SqlValue::Blob(b)),
    }
}

/// Run every statement of `sql` in order, one output per statement.
///
/// If a statement fails while an explicit transaction is open, the transaction is rolled back
/// before the error is returned.
///
/// # Errors
/// Returns `SqlInstanceError::SqliteError` for the first failing statement.
pub fn run_statements(conn: &Connection, sql: &str) -> Result<QueryOutput, SqlInstanceError> {
    match run_batch(conn, sql) {
        Ok(outputs) => Ok(QueryOutput::from_statements(outputs)),
        Err(err) => {
            if !conn.is_autocommit() {
                if let Err(rollback_err) = conn.execute_batch(Dialect::Sqlite.rollback()) {
                    warn!(error = %rollback_err, "ROLLBACK after failed statement did not complete");
                }
            }
            Err(err)
        }
    }
}

fn run_batch(conn: &Connection, sql: &str) -> Result<Vec<QueryOutput>, SqlInstanceError> {
    let mut batch = Batch::new(conn, sql);
    let mut outputs = Vec::new();
    while let Some(mut stmt) = batch.next()? {
        let output = if stmt.column_count() > 0 {
            QueryOutput::Rows(build_result_set(&mut stmt)?)
        } else if stmt.readonly() {
            // BEGIN / COMMIT and friends
            stmt.raw_execute()?;
            QueryOutput::affected(0)
        } else {
            QueryOutput::Write(execute_write(conn, &mut stmt)?)
        };
        outputs.push(output);
    }
    Ok(outputs)
}

/// `changes()` keeps reporting the last DML count after DDL, so measure the statement itself.
fn execute_write(conn: &Connection, stmt: &mut Statement) -> Result<WriteSummary, SqlInstanceError> {
    let before = total_changes(conn)?;
    stmt.raw_execute()?;
    let affected_rows = total_changes(conn)?.saturating_sub(before);
    let last_insert_id = (affected_rows > 0)
        .then(|| u64::try_from(conn.last_insert_rowid()).ok())
        .flatten()
        .filter(|id| *id > 0);
    Ok(WriteSummary {
        affected_rows,
        last_insert_id,
    })
}

fn total_changes(conn: &Connection) -> Result<u64, SqlInstanceError> {
    let total: i64 = conn.query_row("SELECT total_changes()", [], |row| row.get(0))?;
    Ok(u64::try_from(total).unwrap_or_default())
}

/// Build a result set from a prepared `SQLite` statement.
///
/// # Errors
/// Returns `SqlInstanceError` if stepping the statement or reading a value fails.
pub fn build_result_set(stmt: &mut Statement) -> Result<ResultSet, SqlInstanceError> {
    let column_names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(std::string::ToString::to_string)
        .collect();
    let col_count = column_names.len();
    let mut result_set = ResultSet::with_capacity(column_names, 10);

    let mut rows_iter = stmt.raw_query();
    while let Some(row) = rows_iter.next()? {
        let mut row_values = Vec::with_capacity(col_count);
        for i in 0..col_count {
            row_values.push(sqlite_extract_value_sync(row, i)?);
        }
        result_set.add_row_values(row_values);
    }

    Ok(result_set)
}
