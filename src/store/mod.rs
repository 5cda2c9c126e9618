use std::collections::BTreeSet;
use std::path::Path;

use duckdb::types::{ToSqlOutput, Value, ValueRef};
use duckdb::{params_from_iter, Connection, ToSql};
use thiserror::Error;

use crate::data::model::{CellValue, DataTable};

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot import an empty table as '{0}'")]
    EmptyTable(String),

    #[error("invalid table name '{0}': only letters, digits and underscores are allowed")]
    InvalidTableName(String),

    #[error("table '{0}' already exists")]
    TableExists(String),

    #[error("no table named '{0}'")]
    NoSuchTable(String),

    #[error("table '{table}' has no column '{column}'")]
    MissingColumn { table: String, column: String },

    /// Engine rejections (type mismatch on append, malformed query, …)
    /// with the underlying cause preserved.
    #[error("storage engine error: {0}")]
    Engine(#[from] duckdb::Error),
}

// ---------------------------------------------------------------------------
// Import conflict policy
// ---------------------------------------------------------------------------

/// What to do when the target relation already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IfExists {
    /// Drop the old relation and recreate it; no partial-table state is
    /// ever visible to subsequent queries.
    Replace,
    /// Insert into the existing relation (schema must match).
    Append,
    /// Refuse the import.
    Fail,
}

// ---------------------------------------------------------------------------
// TabularStore – embedded analytical engine wrapper
// ---------------------------------------------------------------------------

/// Wraps a DuckDB connection holding this session's relations. One store
/// per interactive session; in-memory by default, file-backed when a
/// path is configured. Not shareable across sessions.
pub struct TabularStore {
    conn: Connection,
}

impl TabularStore {
    /// Transient store; relations vanish with the session.
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        log::debug!("opened in-memory analytical store");
        Ok(TabularStore { conn })
    }

    /// File-backed store; relations persist across process restarts.
    pub fn at_path(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        log::debug!("opened analytical store at {}", path.display());
        Ok(TabularStore { conn })
    }

    /// Release the engine connection. Explicit teardown counterpart to
    /// the constructors.
    pub fn close(self) -> Result<(), StoreError> {
        self.conn.close().map_err(|(_, e)| StoreError::Engine(e))
    }

    // -- Import --------------------------------------------------------

    /// Materialize a validated table as a named relation.
    ///
    /// Errors on an empty table or a non-alphanumeric/underscore name;
    /// engine rejections (e.g. type mismatch on append) surface as
    /// [`StoreError::Engine`] with the cause attached.
    pub fn import_table(
        &mut self,
        table: &DataTable,
        name: &str,
        if_exists: IfExists,
    ) -> Result<(), StoreError> {
        validate_table_name(name)?;
        if table.is_empty() {
            return Err(StoreError::EmptyTable(name.to_string()));
        }

        let exists = self.tables()?.contains(name);
        match if_exists {
            IfExists::Fail if exists => return Err(StoreError::TableExists(name.to_string())),
            IfExists::Append if !exists => return Err(StoreError::NoSuchTable(name.to_string())),
            _ => {}
        }

        let tx = self.conn.transaction()?;
        if if_exists == IfExists::Replace {
            tx.execute_batch(&format!("DROP TABLE IF EXISTS {}", quote_ident(name)))?;
        }
        if if_exists != IfExists::Append || !exists {
            let column_defs: Vec<String> = table
                .columns
                .iter()
                .zip(&table.types)
                .map(|(col, ty)| format!("{} {}", quote_ident(col), ty.sql_name()))
                .collect();
            tx.execute_batch(&format!(
                "CREATE TABLE {} ({})",
                quote_ident(name),
                column_defs.join(", ")
            ))?;
        }

        let column_list: Vec<String> = table.columns.iter().map(|c| quote_ident(c)).collect();
        let placeholders: Vec<&str> = table.columns.iter().map(|_| "?").collect();
        let insert_sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(name),
            column_list.join(", "),
            placeholders.join(", ")
        );
        {
            let mut stmt = tx.prepare(&insert_sql)?;
            for row in &table.rows {
                stmt.execute(params_from_iter(row.iter()))?;
            }
        }
        tx.commit()?;

        log::info!("imported {} rows into relation '{name}'", table.len());
        Ok(())
    }

    // -- Reflection ----------------------------------------------------

    /// Names of the relations currently in the store.
    pub fn tables(&self) -> Result<BTreeSet<String>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT table_name FROM information_schema.tables WHERE table_schema = 'main'")?;
        let names = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut out = BTreeSet::new();
        for name in names {
            out.insert(name?);
        }
        Ok(out)
    }

    /// Column names of a relation, in schema order.
    pub fn columns(&self, table: &str) -> Result<Vec<String>, StoreError> {
        validate_table_name(table)?;
        if !self.tables()?.contains(table) {
            return Err(StoreError::NoSuchTable(table.to_string()));
        }
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info('{table}')"))?;
        let names = stmt.query_map([], |row| row.get::<_, String>(1))?;
        let mut out = Vec::new();
        for name in names {
            out.push(name?);
        }
        Ok(out)
    }

    /// Error unless `column` exists on `table`. KPI queries use this so
    /// a missing grouping column fails descriptively instead of
    /// returning an empty result.
    pub fn require_column(&self, table: &str, column: &str) -> Result<(), StoreError> {
        if self.columns(table)?.iter().any(|c| c == column) {
            Ok(())
        } else {
            Err(StoreError::MissingColumn {
                table: table.to_string(),
                column: column.to_string(),
            })
        }
    }

    // -- Queries -------------------------------------------------------

    /// All rows of `table` passing the predicate. An empty predicate
    /// string means no WHERE clause. Values are always bound, never
    /// interpolated into the SQL text.
    pub fn select_rows(
        &self,
        table: &str,
        predicate: &str,
        params: &[CellValue],
    ) -> Result<DataTable, StoreError> {
        let columns = self.columns(table)?;
        let column_list: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
        let mut sql = format!(
            "SELECT {} FROM {}",
            column_list.join(", "),
            quote_ident(table)
        );
        if !predicate.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(predicate);
        }
        self.query_table(&sql, params, columns)
    }

    /// Number of rows of `table` passing the predicate.
    pub fn count_rows(
        &self,
        table: &str,
        predicate: &str,
        params: &[CellValue],
    ) -> Result<i64, StoreError> {
        validate_table_name(table)?;
        let mut sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table));
        if !predicate.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(predicate);
        }
        let count =
            self.conn
                .query_row(&sql, params_from_iter(params.iter()), |row| row.get(0))?;
        Ok(count)
    }

    /// Sorted distinct values of one column, for filter-option widgets.
    pub fn distinct_values(&self, table: &str, column: &str) -> Result<Vec<CellValue>, StoreError> {
        self.require_column(table, column)?;
        let sql = format!(
            "SELECT DISTINCT {col} FROM {table} ORDER BY {col}",
            col = quote_ident(column),
            table = quote_ident(table)
        );
        let result = self.query_table(&sql, &[], vec![column.to_string()])?;
        Ok(result.rows.into_iter().map(|mut row| row.remove(0)).collect())
    }

    /// Run an arbitrary read query with bound params, shaping the result
    /// as a [`DataTable`] with the given column names. Crate-internal:
    /// the KPI layer builds its SQL from closed column sets only.
    pub(crate) fn query_table(
        &self,
        sql: &str,
        params: &[CellValue],
        columns: Vec<String>,
    ) -> Result<DataTable, StoreError> {
        log::debug!("query: {sql} (params: {params:?})");
        let n = columns.len();
        let mut stmt = self.conn.prepare(sql)?;
        let mapped = stmt.query_map(params_from_iter(params.iter()), |row| {
            let mut cells = Vec::with_capacity(n);
            for i in 0..n {
                cells.push(cell_from_ref(row.get_ref(i)?));
            }
            Ok(cells)
        })?;
        let mut rows = Vec::new();
        for row in mapped {
            rows.push(row?);
        }
        Ok(DataTable::from_rows(columns, rows))
    }
}

// ---------------------------------------------------------------------------
// Identifier and value plumbing
// ---------------------------------------------------------------------------

/// Relation names come from fixed call sites, but the rule is enforced
/// here regardless: alphanumeric and underscore only.
fn validate_table_name(name: &str) -> Result<(), StoreError> {
    if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(StoreError::InvalidTableName(name.to_string()))
    }
}

/// Double-quote an identifier so normalized names that collide with SQL
/// keywords ("group", "count") stay usable.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

impl ToSql for CellValue {
    fn to_sql(&self) -> duckdb::Result<ToSqlOutput<'_>> {
        Ok(match self {
            CellValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            CellValue::Integer(i) => ToSqlOutput::Owned(Value::BigInt(*i)),
            CellValue::Float(f) => ToSqlOutput::Owned(Value::Double(*f)),
            CellValue::Bool(b) => ToSqlOutput::Owned(Value::Boolean(*b)),
            CellValue::Null => ToSqlOutput::Owned(Value::Null),
        })
    }
}

fn cell_from_ref(value: ValueRef<'_>) -> CellValue {
    match value {
        ValueRef::Null => CellValue::Null,
        ValueRef::Boolean(b) => CellValue::Bool(b),
        ValueRef::TinyInt(i) => CellValue::Integer(i as i64),
        ValueRef::SmallInt(i) => CellValue::Integer(i as i64),
        ValueRef::Int(i) => CellValue::Integer(i as i64),
        ValueRef::BigInt(i) => CellValue::Integer(i),
        ValueRef::UTinyInt(i) => CellValue::Integer(i as i64),
        ValueRef::USmallInt(i) => CellValue::Integer(i as i64),
        ValueRef::UInt(i) => CellValue::Integer(i as i64),
        ValueRef::UBigInt(i) => CellValue::Integer(i as i64),
        ValueRef::Float(f) => CellValue::Float(f as f64),
        ValueRef::Double(f) => CellValue::Float(f),
        ValueRef::Text(bytes) => CellValue::Text(String::from_utf8_lossy(bytes).into_owned()),
        other => {
            log::debug!("unsupported engine value {other:?}, reading as null");
            CellValue::Null
        }
    }
}
