use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CellValue – a single cell of a table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value covering the scalar kinds a student
/// dataset can hold. Missing cells are `Null`, never the empty string.
/// Used as keys in `BTreeSet`/`HashMap` downstream so it must be `Ord`
/// and `Hash`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

// -- Manual Eq/Ord/Hash so CellValue can live in ordered sets and maps --

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use CellValue::*;
        fn discriminant(v: &CellValue) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                Text(_) => 4,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for CellValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::Text(s) => s.hash(state),
            CellValue::Integer(i) => i.hash(state),
            CellValue::Float(f) => f.to_bits().hash(state),
            CellValue::Bool(b) => b.hash(state),
            CellValue::Null => {}
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl CellValue {
    /// Try to interpret the value as an `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// The column type this cell belongs to, if any.
    pub fn column_type(&self) -> Option<ColumnType> {
        match self {
            CellValue::Text(_) => Some(ColumnType::Text),
            CellValue::Integer(_) => Some(ColumnType::Integer),
            CellValue::Float(_) => Some(ColumnType::Float),
            CellValue::Bool(_) => Some(ColumnType::Boolean),
            CellValue::Null => None,
        }
    }
}

// ---------------------------------------------------------------------------
// ColumnType – inferred storage type of a column
// ---------------------------------------------------------------------------

/// The inferred type of a whole column. Drives the SQL schema on import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ColumnType {
    Text,
    Integer,
    Float,
    Boolean,
}

impl ColumnType {
    /// SQL type name used when creating the backing relation.
    pub fn sql_name(self) -> &'static str {
        match self {
            ColumnType::Text => "TEXT",
            ColumnType::Integer => "BIGINT",
            ColumnType::Float => "DOUBLE",
            ColumnType::Boolean => "BOOLEAN",
        }
    }

    /// Widen `self` to also admit `other`. Integer and Float unify to
    /// Float; everything else unifies to Text.
    pub fn unify(self, other: ColumnType) -> ColumnType {
        use ColumnType::*;
        match (self, other) {
            (a, b) if a == b => a,
            (Integer, Float) | (Float, Integer) => Float,
            _ => Text,
        }
    }
}

// ---------------------------------------------------------------------------
// DataTable – the parsed tabular structure
// ---------------------------------------------------------------------------

/// A named-column, row-ordered table: the unit that flows from the parser
/// through deduplication into the store, and back out as a KPI result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataTable {
    /// Column names, in file order.
    pub columns: Vec<String>,
    /// Inferred type per column, aligned with `columns`.
    pub types: Vec<ColumnType>,
    /// Rows, each aligned with `columns`.
    pub rows: Vec<Vec<CellValue>>,
}

impl DataTable {
    /// Build a table from columns and rows, inferring each column's type
    /// from its non-null cells. An all-null (or empty) column is Text.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let types = (0..columns.len())
            .map(|i| {
                rows.iter()
                    .filter_map(|row| row[i].column_type())
                    .fold(None, |acc: Option<ColumnType>, t| {
                        Some(acc.map_or(t, |a| a.unify(t)))
                    })
                    .unwrap_or(ColumnType::Text)
            })
            .collect();
        DataTable {
            columns,
            types,
            rows,
        }
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has zero data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a column by exact name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Sorted set of distinct values in one column.
    pub fn distinct_values(&self, name: &str) -> Option<BTreeSet<CellValue>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| row[idx].clone()).collect())
    }
}
