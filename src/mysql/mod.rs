//! `mysql_async` adapter.
//!
//! SQL is sent over the text protocol with multi-statement support, so a transactional batch
//! travels as one round trip and yields one result per statement.

mod value;

use async_trait::async_trait;
use mysql_async::prelude::Queryable;
use mysql_async::{Conn, OptsBuilder, TextProtocol};
use tracing::debug;

use crate::config::ConnectParams;
use crate::driver::{Driver, DriverConnection};
use crate::error::SqlInstanceError;
use crate::results::{QueryOutput, ResultSet, WriteSummary};
use crate::types::Dialect;

pub use value::mysql_value_to_sql;

const DEFAULT_PORT: u16 = 3306;

/// Opens `mysql_async` connections.
#[derive(Debug, Clone, Default)]
pub struct MySqlDriver {
    default_port: Option<u16>,
}

impl MySqlDriver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Port used when the configuration sets none; 3306 otherwise.
    #[must_use]
    pub fn with_default_port(mut self, port: u16) -> Self {
        self.default_port = Some(port);
        self
    }

    fn opts(&self, params: &ConnectParams) -> OptsBuilder {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        OptsBuilder::default()
            .ip_or_hostname(params.host.clone())
            .tcp_port(params.port.or(self.default_port).unwrap_or(DEFAULT_PORT))
            .user(non_empty(&params.user))
            .pass(non_empty(&params.password))
            .db_name(non_empty(&params.database))
    }
}

#[async_trait]
impl Driver for MySqlDriver {
    async fn connect(
        &self,
        params: &ConnectParams,
    ) -> Result<Box<dyn DriverConnection>, SqlInstanceError> {
        let conn = Conn::new(self.opts(params)).await?;
        Ok(Box::new(MySqlConnection { conn: Some(conn) }))
    }

    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }
}

/// One open `mysql_async` connection; `None` once ended or destroyed.
pub struct MySqlConnection {
    conn: Option<Conn>,
}

impl std::fmt::Debug for MySqlConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlConnection")
            .field("open", &self.conn.is_some())
            .finish()
    }
}

impl MySqlConnection {
    fn conn(&mut self) -> Result<&mut Conn, SqlInstanceError> {
        self.conn
            .as_mut()
            .ok_or_else(|| SqlInstanceError::ConnectionError("MySQL connection is closed".into()))
    }
}

#[async_trait]
impl DriverConnection for MySqlConnection {
    async fn query(&mut self, sql: &str) -> Result<QueryOutput, SqlInstanceError> {
        let conn = self.conn()?;
        match run_text(conn, sql).await {
            Ok(output) => Ok(output),
            Err(err) => {
                if opens_transaction(sql) {
                    if let Err(rollback_err) = conn.query_drop(Dialect::MySql.rollback()).await {
                        debug!(error = %rollback_err, "ROLLBACK after failed batch did not complete");
                    }
                }
                Err(err.into())
            }
        }
    }

    async fn end(&mut self) -> Result<(), SqlInstanceError> {
        match self.conn.take() {
            Some(conn) => conn.disconnect().await.map_err(SqlInstanceError::from),
            None => Ok(()),
        }
    }

    fn destroy(&mut self) {
        drop(self.conn.take());
    }
}

/// Whether `sql` is a batch carrying its own transaction, which a failure must not leave open.
///
/// Other failed text is left alone so a transaction the caller opened earlier survives.
fn opens_transaction(sql: &str) -> bool {
    let begin = Dialect::MySql.begin_transaction();
    sql.trim_start()
        .get(..begin.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(begin))
}

/// Run `sql` and collect one output per statement.
async fn run_text(conn: &mut Conn, sql: &str) -> Result<QueryOutput, mysql_async::Error> {
    let mut result = conn.query_iter(sql).await?;
    let mut outputs = Vec::new();
    loop {
        outputs.push(next_output(&mut result).await?);
        if result.is_empty() {
            break;
        }
    }
    Ok(QueryOutput::from_statements(outputs))
}

async fn next_output(
    result: &mut mysql_async::QueryResult<'_, 'static, TextProtocol>,
) -> Result<QueryOutput, mysql_async::Error> {
    let columns = result.columns();
    let summary = WriteSummary {
        affected_rows: result.affected_rows(),
        last_insert_id: result.last_insert_id(),
    };
    let rows: Vec<mysql_async::Row> = result.collect().await?;

    let Some(columns) = columns.filter(|c| !c.is_empty()) else {
        return Ok(QueryOutput::Write(summary));
    };

    let names = columns.iter().map(|c| c.name_str().into_owned()).collect();
    let mut set = ResultSet::with_capacity(names, rows.len());
    for mut row in rows {
        let values = columns
            .iter()
            .enumerate()
            .map(|(idx, column)| {
                let raw = row
                    .take::<mysql_async::Value, _>(idx)
                    .unwrap_or(mysql_async::Value::NULL);
                mysql_value_to_sql(raw, column)
            })
            .collect();
        set.add_row_values(values);
    }
    Ok(QueryOutput::Rows(set))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_wrapped_batches_are_rolled_back() {
        assert!(opens_transaction(
            "START TRANSACTION;INSERT INTO t VALUES (1);INSERT INTO t VALUES (2);COMMIT;"
        ));
        assert!(opens_transaction("  start transaction;UPDATE t SET a = 1;COMMIT;"));
        assert!(!opens_transaction("SELECT * FROM t"));
        assert!(!opens_transaction("UPDATE t SET a = 1"));
        assert!(!opens_transaction("START"));
        assert!(!opens_transaction("ÉSTART TRANSACTION"));
    }
}
