use tracing::{debug, error};

use crate::error::SqlInstanceError;
use crate::instance::RequestInstance;
use crate::results::{ResultSet, RowMap};
use crate::types::{Access, SqlValue};

use super::SqlClient;

/// A read result collapsed to the shape its row and column counts imply.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Record {
    /// No rows.
    #[default]
    Empty,
    /// One row with one column; the bare value.
    Scalar(SqlValue),
    /// One row with two or more columns, in column order.
    Row(RowMap),
    /// Two or more rows.
    Rows(Vec<RowMap>),
}

impl Record {
    /// True only for [`Record::Rows`].
    #[must_use]
    pub fn has_multiple_rows(&self) -> bool {
        matches!(self, Record::Rows(_))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Record::Empty)
    }

    #[must_use]
    pub fn scalar(&self) -> Option<&SqlValue> {
        match self {
            Record::Scalar(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn row(&self) -> Option<&RowMap> {
        match self {
            Record::Row(row) => Some(row),
            _ => None,
        }
    }

    #[must_use]
    pub fn rows(&self) -> Option<&[RowMap]> {
        match self {
            Record::Rows(rows) => Some(rows),
            _ => None,
        }
    }

    /// Every row as a field map, whatever the shape. A scalar has no column name left, so it
    /// comes back as a one-entry map keyed by `column`.
    #[must_use]
    pub fn into_rows(self, column: &str) -> Vec<RowMap> {
        match self {
            Record::Empty => Vec::new(),
            Record::Scalar(value) => {
                let mut row = RowMap::with_capacity(1);
                row.insert(column.to_string(), value);
                vec![row]
            }
            Record::Row(row) => vec![row],
            Record::Rows(rows) => rows,
        }
    }
}

/// Collapse a result set into a [`Record`].
#[must_use]
pub fn normalize(set: ResultSet) -> Record {
    let mut rows = set.into_rows();
    match rows.len() {
        0 => Record::Empty,
        1 => {
            let row = rows.remove(0);
            if row.len() == 1 {
                row.into_first().map_or(Record::Empty, Record::Scalar)
            } else {
                Record::Row(row.into_map())
            }
        }
        _ => Record::Rows(rows.into_iter().map(|row| row.into_map()).collect()),
    }
}

impl SqlClient {
    /// Run `sql` on the reader connection when one is configured, else on the primary, and
    /// normalize the rows.
    ///
    /// A multi-statement text is normalized on its first result set; text that returns no result
    /// set at all reads as [`Record::Empty`].
    ///
    /// # Errors
    /// Returns `SqlInstanceError::ConnectFailed` when the connection cannot be opened, or the
    /// driver's error when execution fails.
    pub async fn get_record(
        &self,
        instance: &RequestInstance,
        sql: &str,
    ) -> Result<Record, SqlInstanceError> {
        debug!(
            instance = instance.id(),
            elapsed_ms = instance.elapsed_ms(),
            op = "get_record",
            "Init-Start Get Record"
        );

        let role = self.manager.route(Access::Read);
        let output = self.run_on(instance, role, sql).await.map_err(|err| {
            error!(
                instance = instance.id(),
                op = "get_record",
                %role,
                sql,
                error = %err,
                "Get Record failed"
            );
            err
        })?;

        let record = output.into_first_result_set().map_or(Record::Empty, normalize);
        debug!(
            instance = instance.id(),
            elapsed_ms = instance.elapsed_ms(),
            op = "get_record",
            "Init-End Get Record"
        );
        Ok(record)
    }
}
