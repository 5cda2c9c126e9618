use crate::data::model::{CellValue, DataTable};
use crate::data::validate::DatasetKind;
use crate::store::{quote_ident, StoreError, TabularStore};

use super::filter::Predicate;

// ---------------------------------------------------------------------------
// Aggregation builders
// ---------------------------------------------------------------------------

/// Width of the fixed attendance buckets (inclusive lower bound).
const BAND_WIDTH: f64 = 10.0;

/// Average score and row count per category. Result columns are the
/// chart contract: `group`, `average_score`, `count`, ordered by group.
/// Rows with a null category are skipped.
pub fn average_by_category(
    store: &TabularStore,
    table: &str,
    category_col: &str,
    score_col: &str,
    predicate: &Predicate,
) -> Result<DataTable, StoreError> {
    store.require_column(table, category_col)?;
    store.require_column(table, score_col)?;

    let cat = quote_ident(category_col);
    let score = quote_ident(score_col);
    let (where_sql, params) = where_clause(predicate, &[format!("{cat} IS NOT NULL")]);
    let sql = format!(
        "SELECT {cat} AS \"group\", AVG({score}) AS \"average_score\", \
         COUNT(*) AS \"count\" FROM \"{table}\"{where_sql} GROUP BY 1 ORDER BY 1"
    );
    store.query_table(
        &sql,
        &params,
        vec![
            "group".to_string(),
            "average_score".to_string(),
            "count".to_string(),
        ],
    )
}

/// Row-level (metric, score) pairs for correlation/scatter display, no
/// aggregation. Pairs with a null on either side are excluded. Result
/// columns carry the source column names.
pub fn metric_score_pairs(
    store: &TabularStore,
    table: &str,
    metric_col: &str,
    score_col: &str,
    predicate: &Predicate,
) -> Result<DataTable, StoreError> {
    store.require_column(table, metric_col)?;
    store.require_column(table, score_col)?;

    let metric = quote_ident(metric_col);
    let score = quote_ident(score_col);
    let (where_sql, params) = where_clause(
        predicate,
        &[
            format!("{metric} IS NOT NULL"),
            format!("{score} IS NOT NULL"),
        ],
    );
    let sql = format!(
        "SELECT {metric}, {score} FROM \"{table}\"{where_sql} ORDER BY 1, 2"
    );
    store.query_table(
        &sql,
        &params,
        vec![metric_col.to_string(), score_col.to_string()],
    )
}

/// Average score and row count per fixed-width bucket of a numeric
/// metric. `bucket` is the inclusive lower bound of each band (87 with
/// width 10 lands in bucket 80). Result columns: `bucket`,
/// `average_score`, `count`, ordered by bucket.
pub fn average_by_band(
    store: &TabularStore,
    table: &str,
    metric_col: &str,
    score_col: &str,
    band_width: f64,
    predicate: &Predicate,
) -> Result<DataTable, StoreError> {
    store.require_column(table, metric_col)?;
    store.require_column(table, score_col)?;

    let metric = quote_ident(metric_col);
    let score = quote_ident(score_col);
    let (where_sql, mut all_params) = where_clause(predicate, &[format!("{metric} IS NOT NULL")]);
    let sql = format!(
        "SELECT CAST(FLOOR({metric} / ?) * ? AS BIGINT) AS \"bucket\", \
         AVG({score}) AS \"average_score\", COUNT(*) AS \"count\" \
         FROM \"{table}\"{where_sql} GROUP BY 1 ORDER BY 1"
    );
    // The two band-width placeholders appear before the WHERE clause.
    let mut params = vec![CellValue::Float(band_width), CellValue::Float(band_width)];
    params.append(&mut all_params);
    store.query_table(
        &sql,
        &params,
        vec![
            "bucket".to_string(),
            "average_score".to_string(),
            "count".to_string(),
        ],
    )
}

/// Combine the compiled filter with KPI-specific conditions into one
/// WHERE clause (empty when there is nothing to constrain).
fn where_clause(predicate: &Predicate, extra: &[String]) -> (String, Vec<CellValue>) {
    let mut conditions: Vec<String> = Vec::new();
    if !predicate.is_empty() {
        conditions.push(predicate.clause().to_string());
    }
    conditions.extend(extra.iter().cloned());
    if conditions.is_empty() {
        (String::new(), Vec::new())
    } else {
        (
            format!(" WHERE {}", conditions.join(" AND ")),
            predicate.params().to_vec(),
        )
    }
}

// ---------------------------------------------------------------------------
// The four fixed KPIs
// ---------------------------------------------------------------------------

/// Column bindings for the four KPIs on one dataset shape.
#[derive(Debug, Clone, Copy)]
pub struct KpiColumns {
    pub category: &'static str,
    pub study_habit: &'static str,
    pub attendance: &'static str,
    pub lifestyle: &'static str,
    pub score: &'static str,
}

/// The four fixed KPI views over a stored relation, bound to a dataset
/// kind's canonical columns.
#[derive(Debug, Clone, Copy)]
pub struct KpiSuite {
    table: &'static str,
    columns: KpiColumns,
}

impl KpiSuite {
    pub fn for_kind(kind: DatasetKind) -> Self {
        let columns = match kind {
            DatasetKind::Habits => KpiColumns {
                category: "gender",
                study_habit: "study_hours_per_day",
                attendance: "attendance_percentage",
                lifestyle: "sleep_hours",
                score: "exam_score",
            },
            DatasetKind::Factors => KpiColumns {
                category: "gender",
                study_habit: "hours_studied",
                attendance: "attendance",
                lifestyle: "sleep_hours",
                score: "exam_score",
            },
        };
        KpiSuite {
            table: kind.table_name(),
            columns,
        }
    }

    /// KPI 1: average score and count grouped by the categorical
    /// attribute (gender).
    pub fn score_by_category(
        &self,
        store: &TabularStore,
        predicate: &Predicate,
    ) -> Result<DataTable, StoreError> {
        average_by_category(
            store,
            self.table,
            self.columns.category,
            self.columns.score,
            predicate,
        )
    }

    /// KPI 2: study-time vs exam-score pairs.
    pub fn study_habit_scatter(
        &self,
        store: &TabularStore,
        predicate: &Predicate,
    ) -> Result<DataTable, StoreError> {
        metric_score_pairs(
            store,
            self.table,
            self.columns.study_habit,
            self.columns.score,
            predicate,
        )
    }

    /// KPI 3: average score per attendance band.
    pub fn score_by_attendance_band(
        &self,
        store: &TabularStore,
        predicate: &Predicate,
    ) -> Result<DataTable, StoreError> {
        average_by_band(
            store,
            self.table,
            self.columns.attendance,
            self.columns.score,
            BAND_WIDTH,
            predicate,
        )
    }

    /// KPI 4: lifestyle metric (sleep hours) vs exam-score pairs.
    pub fn lifestyle_scatter(
        &self,
        store: &TabularStore,
        predicate: &Predicate,
    ) -> Result<DataTable, StoreError> {
        metric_score_pairs(
            store,
            self.table,
            self.columns.lifestyle,
            self.columns.score,
            predicate,
        )
    }

    /// All four KPIs, labelled for the chart layer.
    pub fn compute_all(
        &self,
        store: &TabularStore,
        predicate: &Predicate,
    ) -> Result<Vec<(&'static str, DataTable)>, StoreError> {
        Ok(vec![
            ("score_by_category", self.score_by_category(store, predicate)?),
            (
                "study_habit_vs_score",
                self.study_habit_scatter(store, predicate)?,
            ),
            (
                "score_by_attendance_band",
                self.score_by_attendance_band(store, predicate)?,
            ),
            (
                "lifestyle_vs_score",
                self.lifestyle_scatter(store, predicate)?,
            ),
        ])
    }
}
