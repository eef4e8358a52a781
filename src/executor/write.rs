use tracing::{debug, error};

use crate::error::SqlInstanceError;
use crate::instance::RequestInstance;
use crate::types::{ConnectionRole, Dialect};

use super::SqlClient;

/// What [`SqlClient::set_record`] executes: one statement, or a batch that runs as one
/// transaction when it holds two or more statements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlUnit {
    Statement(String),
    Batch(Vec<String>),
}

impl SqlUnit {
    /// Nothing to execute: an empty string or an empty batch.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            SqlUnit::Statement(sql) => sql.trim().is_empty(),
            SqlUnit::Batch(statements) => statements.is_empty(),
        }
    }

    /// The SQL text sent to the server, or `None` when there is nothing to run.
    ///
    /// Batch members are trimmed of whitespace and trailing `;`. A batch of two or more becomes
    /// `BEGIN;s1;s2;COMMIT;` with the dialect's BEGIN keyword; a single member or a bare
    /// statement is sent unchanged.
    #[must_use]
    pub fn final_sql(&self, dialect: Dialect) -> Option<String> {
        match self {
            SqlUnit::Statement(sql) if sql.trim().is_empty() => None,
            SqlUnit::Statement(sql) => Some(sql.clone()),
            SqlUnit::Batch(statements) => match statements.as_slice() {
                [] => None,
                [single] => Some(single.clone()),
                many => {
                    let body = many
                        .iter()
                        .map(|s| s.trim().trim_end_matches(';').trim_end())
                        .collect::<Vec<_>>()
                        .join(";");
                    Some(format!(
                        "{};{body};{};",
                        dialect.begin_transaction(),
                        dialect.commit()
                    ))
                }
            },
        }
    }
}

impl From<&str> for SqlUnit {
    fn from(sql: &str) -> Self {
        SqlUnit::Statement(sql.to_string())
    }
}

impl From<String> for SqlUnit {
    fn from(sql: String) -> Self {
        SqlUnit::Statement(sql)
    }
}

impl From<Vec<String>> for SqlUnit {
    fn from(statements: Vec<String>) -> Self {
        SqlUnit::Batch(statements)
    }
}

impl From<Vec<&str>> for SqlUnit {
    fn from(statements: Vec<&str>) -> Self {
        SqlUnit::Batch(statements.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for SqlUnit {
    fn from(statements: [&str; N]) -> Self {
        SqlUnit::Batch(statements.iter().map(|s| (*s).to_string()).collect())
    }
}

impl<T: Into<SqlUnit>> From<Option<T>> for SqlUnit {
    fn from(sql: Option<T>) -> Self {
        sql.map_or(SqlUnit::Batch(Vec::new()), Into::into)
    }
}

impl SqlClient {
    /// Execute a write on the primary connection and return the total affected rows.
    ///
    /// Returns `Ok(None)` without opening a connection when there is nothing to execute. If a
    /// batch fails part-way the whole transaction is discarded and the driver's error returned.
    ///
    /// # Errors
    /// Returns `SqlInstanceError::ConnectFailed` when the connection cannot be opened, or the
    /// driver's error when execution fails.
    pub async fn set_record(
        &self,
        instance: &RequestInstance,
        sql: impl Into<SqlUnit>,
    ) -> Result<Option<u64>, SqlInstanceError> {
        let Some(final_sql) = sql.into().final_sql(self.dialect()) else {
            return Ok(None);
        };

        debug!(
            instance = instance.id(),
            elapsed_ms = instance.elapsed_ms(),
            op = "set_record",
            "Init-Start Set Record"
        );

        let output = self
            .run_on(instance, ConnectionRole::Primary, &final_sql)
            .await
            .map_err(|err| {
                error!(
                    instance = instance.id(),
                    op = "set_record",
                    sql = %final_sql,
                    error = %err,
                    "Set Record failed"
                );
                err
            })?;

        let affected = output.affected_rows();
        debug!(
            instance = instance.id(),
            elapsed_ms = instance.elapsed_ms(),
            op = "set_record",
            affected,
            "Init-End Set Record"
        );
        Ok(Some(affected))
    }
}
