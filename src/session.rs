use std::path::PathBuf;

use thiserror::Error;

use crate::data::dedup::{dedup_rows, Keep};
use crate::data::loader::{decode_upload, file_info, parse_csv, FileInfo, IngestError};
use crate::data::validate::{
    validate_csv_not_empty, validate_csv_structure, validate_data_types, validate_file_size,
    DatasetKind, DEFAULT_MAX_UPLOAD_BYTES,
};
use crate::query::filter::{ColumnFilter, FilterSpec, Predicate};
use crate::query::kpi::KpiSuite;
use crate::store::{IfExists, StoreError, TabularStore};

// ---------------------------------------------------------------------------
// Session configuration
// ---------------------------------------------------------------------------

/// Knobs for one interactive session.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Back the store with a file so relations persist across restarts;
    /// `None` keeps everything in memory (the default).
    pub store_path: Option<PathBuf>,
    /// Upload size ceiling; zero means the default (10 MiB).
    pub max_upload_bytes: usize,
}

// ---------------------------------------------------------------------------
// Session errors
// ---------------------------------------------------------------------------

/// Per-file ingestion failures surfaced to the orchestration layer. One
/// failed file must never abort processing of the others; callers log
/// or display these and move on.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A recoverable validation rejection, carrying the check's
    /// diagnostic message verbatim.
    #[error("{0}")]
    Rejected(String),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// Session – explicit pipeline state, injected instead of ambient
// ---------------------------------------------------------------------------

/// All state for one interactive analysis session: the store, the
/// active filter selections, and which dataset kinds have been loaded.
/// Created explicitly, torn down explicitly.
pub struct Session {
    store: TabularStore,
    filters: FilterSpec,
    loaded: Vec<DatasetKind>,
    max_upload_bytes: usize,
}

impl Session {
    pub fn new(config: SessionConfig) -> Result<Self, StoreError> {
        let store = match &config.store_path {
            Some(path) => TabularStore::at_path(path)?,
            None => TabularStore::in_memory()?,
        };
        let max_upload_bytes = if config.max_upload_bytes == 0 {
            DEFAULT_MAX_UPLOAD_BYTES
        } else {
            config.max_upload_bytes
        };
        Ok(Session {
            store,
            filters: FilterSpec::new(),
            loaded: Vec::new(),
            max_upload_bytes,
        })
    }

    /// Release the store connection.
    pub fn teardown(self) -> Result<(), StoreError> {
        self.store.close()
    }

    // -- Ingestion -----------------------------------------------------

    /// Run one upload through the whole pipeline: size check → decode →
    /// structure check → parse → content checks → dedup (keep first) →
    /// import with replace semantics.
    pub fn ingest(
        &mut self,
        file_name: &str,
        bytes: &[u8],
        kind: DatasetKind,
    ) -> Result<FileInfo, SessionError> {
        let size_check = validate_file_size(bytes.len(), self.max_upload_bytes);
        if !size_check.ok {
            return Err(SessionError::Rejected(size_check.message));
        }

        let content = decode_upload(bytes)?;

        let structure = validate_csv_structure(content, kind.required_columns());
        if !structure.ok {
            return Err(SessionError::Rejected(structure.message));
        }

        let table = parse_csv(content)?;
        for check in [validate_csv_not_empty(&table), validate_data_types(&table)] {
            if !check.ok {
                return Err(SessionError::Rejected(check.message));
            }
        }

        let table = dedup_rows(&table, Keep::First);
        self.store
            .import_table(&table, kind.table_name(), IfExists::Replace)?;
        if !self.loaded.contains(&kind) {
            self.loaded.push(kind);
        }

        let info = file_info(file_name, bytes, &table);
        log::info!(
            "ingested '{}' as {}: {} rows",
            info.name,
            kind.table_name(),
            info.rows
        );
        Ok(info)
    }

    pub fn is_loaded(&self, kind: DatasetKind) -> bool {
        self.loaded.contains(&kind)
    }

    pub fn loaded_kinds(&self) -> &[DatasetKind] {
        &self.loaded
    }

    // -- Filters -------------------------------------------------------

    pub fn set_filter(&mut self, column: impl Into<String>, filter: ColumnFilter) {
        self.filters.set(column, filter);
    }

    pub fn clear_filter(&mut self, column: &str) {
        self.filters.clear(column);
    }

    pub fn reset_filters(&mut self) {
        self.filters = FilterSpec::new();
    }

    pub fn filters(&self) -> &FilterSpec {
        &self.filters
    }

    /// Compile the active filter selections.
    pub fn predicate(&self) -> Predicate {
        self.filters.compile()
    }

    // -- Queries -------------------------------------------------------

    pub fn store(&self) -> &TabularStore {
        &self.store
    }

    /// All four KPIs for a loaded dataset kind under the active filters.
    pub fn kpis(
        &self,
        kind: DatasetKind,
    ) -> Result<Vec<(&'static str, crate::data::model::DataTable)>, StoreError> {
        KpiSuite::for_kind(kind).compute_all(&self.store, &self.predicate())
    }

    /// Distinct values of a column, for filter widgets.
    pub fn filter_options(
        &self,
        kind: DatasetKind,
        column: &str,
    ) -> Result<Vec<crate::data::model::CellValue>, StoreError> {
        self.store.distinct_values(kind.table_name(), column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HABITS_CSV: &str = "\
student_id,gender,study_hours_per_day,attendance_percentage,sleep_hours,exam_score
S1,Male,3.5,91.0,7.0,85.0
S2,Female,4.0,88.5,6.5,88.0
S2,Female,4.0,88.5,6.5,88.0
";

    #[test]
    fn ingest_deduplicates_and_imports() {
        let mut session = Session::new(SessionConfig::default()).unwrap();
        let info = session
            .ingest("habits.csv", HABITS_CSV.as_bytes(), DatasetKind::Habits)
            .unwrap();
        // The duplicate S2 row is collapsed before import.
        assert_eq!(info.rows, 2);
        assert!(session.is_loaded(DatasetKind::Habits));
        assert!(session
            .store()
            .tables()
            .unwrap()
            .contains("student_habits_performance"));
    }

    #[test]
    fn wrong_shape_is_rejected_with_message() {
        let mut session = Session::new(SessionConfig::default()).unwrap();
        let err = session
            .ingest("other.csv", b"a,b\n1,2\n", DatasetKind::Habits)
            .unwrap_err();
        match err {
            SessionError::Rejected(msg) => assert!(msg.contains("exam_score")),
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn undecodable_upload_is_an_encoding_error() {
        let mut session = Session::new(SessionConfig::default()).unwrap();
        let err = session
            .ingest("bad.csv", &[0xff, 0xfe, 0x00], DatasetKind::Habits)
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::Ingest(IngestError::Encoding(_))
        ));
    }

    #[test]
    fn oversized_upload_is_rejected() {
        let mut session = Session::new(SessionConfig {
            max_upload_bytes: 8,
            ..SessionConfig::default()
        })
        .unwrap();
        let err = session
            .ingest("big.csv", HABITS_CSV.as_bytes(), DatasetKind::Habits)
            .unwrap_err();
        assert!(matches!(err, SessionError::Rejected(_)));
    }

    #[test]
    fn one_failed_file_leaves_the_session_usable() {
        let mut session = Session::new(SessionConfig::default()).unwrap();
        let _ = session
            .ingest("bad.csv", b"not,a,habits\nfile,at,all\n", DatasetKind::Habits)
            .unwrap_err();
        session
            .ingest("habits.csv", HABITS_CSV.as_bytes(), DatasetKind::Habits)
            .unwrap();
        assert!(session.is_loaded(DatasetKind::Habits));
    }

    #[test]
    fn filters_flow_into_kpis() {
        let mut session = Session::new(SessionConfig::default()).unwrap();
        session
            .ingest("habits.csv", HABITS_CSV.as_bytes(), DatasetKind::Habits)
            .unwrap();
        session.set_filter(
            "gender",
            ColumnFilter::Equals(crate::data::model::CellValue::Text("Male".into())),
        );
        let kpis = session.kpis(DatasetKind::Habits).unwrap();
        let (_, by_category) = &kpis[0];
        assert_eq!(by_category.len(), 1);
    }

    #[test]
    fn filter_options_reflect_stored_values() {
        let mut session = Session::new(SessionConfig::default()).unwrap();
        session
            .ingest("habits.csv", HABITS_CSV.as_bytes(), DatasetKind::Habits)
            .unwrap();
        let options = session
            .filter_options(DatasetKind::Habits, "gender")
            .unwrap();
        assert_eq!(options.len(), 2);
    }
}
