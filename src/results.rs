use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::types::SqlValue;

/// Field name to value, in column order.
pub type RowMap = IndexMap<String, SqlValue>;

/// A row from a database query result
///
/// Column names are shared with every other row of the same result set.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<Columns>,
    values: Vec<SqlValue>,
}

/// Column names plus a name-to-index lookup, built once per result set.
#[derive(Debug, PartialEq)]
struct Columns {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl Columns {
    fn new(names: Vec<String>) -> Self {
        let mut index = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            // later duplicates win, like a field map built row by row
            index.insert(name.clone(), i);
        }
        Self { names, index }
    }
}

impl Row {
    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.columns.names
    }

    #[must_use]
    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get a value from the row by column name
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&SqlValue> {
        self.columns
            .index
            .get(column_name)
            .and_then(|&idx| self.values.get(idx))
    }

    /// Get a value from the row by column index
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&SqlValue> {
        self.values.get(index)
    }

    /// Consume the row into a field map.
    #[must_use]
    pub fn into_map(self) -> RowMap {
        let columns = self.columns;
        columns.names.iter().cloned().zip(self.values).collect()
    }

    /// Consume the row, returning its first value.
    #[must_use]
    pub fn into_first(self) -> Option<SqlValue> {
        self.values.into_iter().next()
    }
}

/// Rows returned by one statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    columns: Option<Arc<Columns>>,
    rows: Vec<Row>,
}

impl ResultSet {
    /// Create an empty result set for the given columns.
    #[must_use]
    pub fn new(column_names: Vec<String>) -> Self {
        Self::with_capacity(column_names, 0)
    }

    /// Create a new result set with a known capacity
    #[must_use]
    pub fn with_capacity(column_names: Vec<String>, capacity: usize) -> Self {
        Self {
            columns: Some(Arc::new(Columns::new(column_names))),
            rows: Vec::with_capacity(capacity),
        }
    }

    /// Build a result set in one go; handy for drivers and tests.
    #[must_use]
    pub fn from_rows<C, R>(column_names: C, rows: R) -> Self
    where
        C: IntoIterator,
        C::Item: Into<String>,
        R: IntoIterator<Item = Vec<SqlValue>>,
    {
        let mut set = Self::new(column_names.into_iter().map(Into::into).collect());
        for row in rows {
            set.add_row_values(row);
        }
        set
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        self.columns.as_ref().map_or(&[], |c| c.names.as_slice())
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        self.column_names().len()
    }

    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    #[must_use]
    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Add a row to the result set
    pub fn add_row_values(&mut self, values: Vec<SqlValue>) {
        let columns = Arc::clone(
            self.columns
                .get_or_insert_with(|| Arc::new(Columns::new(Vec::new()))),
        );
        self.rows.push(Row { columns, values });
    }
}

/// Outcome of a statement that returns no rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub affected_rows: u64,
    pub last_insert_id: Option<u64>,
}

/// What a driver hands back for one executed SQL text.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutput {
    /// A statement that produced a result set.
    Rows(ResultSet),
    /// A statement that modified (or could have modified) rows.
    Write(WriteSummary),
    /// One entry per statement of a multi-statement text, in execution order.
    Multiple(Vec<QueryOutput>),
}

impl QueryOutput {
    /// Collapse a per-statement list: one entry stays a single result.
    #[must_use]
    pub fn from_statements(mut outputs: Vec<QueryOutput>) -> Self {
        if outputs.len() == 1 {
            outputs.remove(0)
        } else {
            QueryOutput::Multiple(outputs)
        }
    }

    #[must_use]
    pub fn affected(affected_rows: u64) -> Self {
        QueryOutput::Write(WriteSummary {
            affected_rows,
            last_insert_id: None,
        })
    }

    /// Total affected rows: a single result reports its own count, a list sums its entries in
    /// order. Result sets count as zero.
    #[must_use]
    pub fn affected_rows(&self) -> u64 {
        match self {
            QueryOutput::Rows(_) => 0,
            QueryOutput::Write(summary) => summary.affected_rows,
            QueryOutput::Multiple(outputs) => outputs
                .iter()
                .map(QueryOutput::affected_rows)
                .fold(0u64, u64::saturating_add),
        }
    }

    /// The first result set, searching multi-statement output in order.
    #[must_use]
    pub fn into_first_result_set(self) -> Option<ResultSet> {
        match self {
            QueryOutput::Rows(set) => Some(set),
            QueryOutput::Write(_) => None,
            QueryOutput::Multiple(outputs) => outputs
                .into_iter()
                .find_map(QueryOutput::into_first_result_set),
        }
    }
}
