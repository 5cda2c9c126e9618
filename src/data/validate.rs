use super::model::DataTable;

// ---------------------------------------------------------------------------
// CheckResult – recoverable pass/fail with a diagnostic message
// ---------------------------------------------------------------------------

/// Outcome of a validation check. Validation problems are user-facing
/// and recoverable, so they are reported as a pass/fail plus message
/// rather than an error type; the caller displays the message and keeps
/// accepting input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub ok: bool,
    pub message: String,
}

impl CheckResult {
    pub fn pass() -> Self {
        CheckResult {
            ok: true,
            message: String::new(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        let message = message.into();
        log::warn!("validation failed: {message}");
        CheckResult { ok: false, message }
    }
}

// ---------------------------------------------------------------------------
// Header normalization
// ---------------------------------------------------------------------------

/// Normalize header names to lowercase snake_case: trim, lowercase,
/// whitespace and hyphens to underscores, other punctuation stripped,
/// runs of underscores collapsed.
pub fn normalize_column_names<'a>(headers: impl Iterator<Item = &'a str>) -> Vec<String> {
    headers.map(normalize_column_name).collect()
}

fn normalize_column_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_underscore = true; // suppress leading underscores
    for ch in raw.trim().chars() {
        let mapped = match ch {
            c if c.is_ascii_alphanumeric() => Some(c.to_ascii_lowercase()),
            c if c.is_whitespace() => Some('_'),
            '-' | '_' => Some('_'),
            _ => None,
        };
        if let Some(c) = mapped {
            if c == '_' {
                if !last_underscore {
                    out.push('_');
                }
                last_underscore = true;
            } else {
                out.push(c);
                last_underscore = false;
            }
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

// ---------------------------------------------------------------------------
// Structural checks
// ---------------------------------------------------------------------------

/// Parse the header row of `content` and check that every required
/// column is present, case-insensitively. The failure message names
/// every missing column; content that cannot be read as delimited text
/// with a header fails with a generic format message.
pub fn validate_csv_structure(content: &str, required_columns: &[&str]) -> CheckResult {
    if content.trim().is_empty() {
        return CheckResult::fail("file is not valid CSV: content is empty");
    }

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());
    let headers = match reader.headers() {
        Ok(h) if !h.is_empty() => normalize_column_names(h.iter()),
        _ => return CheckResult::fail("file is not valid CSV: could not read a header row"),
    };

    let missing: Vec<&str> = required_columns
        .iter()
        .filter(|req| {
            let want = normalize_column_name(req);
            !headers.iter().any(|have| *have == want)
        })
        .copied()
        .collect();

    if missing.is_empty() {
        CheckResult::pass()
    } else {
        CheckResult::fail(format!(
            "missing required columns: {}",
            missing.join(", ")
        ))
    }
}

/// Fail when the parsed table carries zero data rows.
pub fn validate_csv_not_empty(table: &DataTable) -> CheckResult {
    if table.is_empty() {
        CheckResult::fail("file contains no data rows")
    } else {
        CheckResult::pass()
    }
}

/// Default upload ceiling: 10 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Fail when the upload exceeds the size ceiling.
pub fn validate_file_size(size_bytes: usize, max_bytes: usize) -> CheckResult {
    if size_bytes > max_bytes {
        CheckResult::fail(format!(
            "file is {size_bytes} bytes, above the {max_bytes} byte limit"
        ))
    } else {
        CheckResult::pass()
    }
}

/// Fail when any column holds cells of more than one scalar kind
/// (ignoring nulls). Inference normally prevents this for parsed CSVs;
/// the check guards tables assembled by other paths.
pub fn validate_data_types(table: &DataTable) -> CheckResult {
    let mut inconsistent: Vec<&str> = Vec::new();
    for (i, name) in table.columns.iter().enumerate() {
        let kinds: std::collections::BTreeSet<_> = table
            .rows
            .iter()
            .filter_map(|row| row[i].column_type())
            .collect();
        let unified = table
            .rows
            .iter()
            .filter_map(|row| row[i].column_type())
            .reduce(|a, b| a.unify(b));
        // More than one kind that only Text can absorb means the column
        // genuinely mixes scalars (integer/float pairs unify fine).
        if kinds.len() > 1 && unified == Some(super::model::ColumnType::Text) {
            inconsistent.push(name.as_str());
        }
    }
    if inconsistent.is_empty() {
        CheckResult::pass()
    } else {
        CheckResult::fail(format!(
            "columns with mixed value types: {}",
            inconsistent.join(", ")
        ))
    }
}

// ---------------------------------------------------------------------------
// Recognized dataset shapes
// ---------------------------------------------------------------------------

/// The two dataset shapes the pipeline recognizes, each identified by
/// its required column set and mapped to a fixed relation name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetKind {
    /// Daily-habits survey joined with exam results.
    Habits,
    /// School/home-environment factors joined with exam results.
    Factors,
}

impl DatasetKind {
    /// Columns that must be present (case-insensitively) for ingestion
    /// to proceed.
    pub fn required_columns(self) -> &'static [&'static str] {
        match self {
            DatasetKind::Habits => &[
                "student_id",
                "gender",
                "study_hours_per_day",
                "attendance_percentage",
                "sleep_hours",
                "exam_score",
            ],
            DatasetKind::Factors => &[
                "hours_studied",
                "attendance",
                "sleep_hours",
                "previous_scores",
                "gender",
                "exam_score",
            ],
        }
    }

    /// Canonical relation name in the tabular store.
    pub fn table_name(self) -> &'static str {
        match self {
            DatasetKind::Habits => "student_habits_performance",
            DatasetKind::Factors => "student_performance_factors",
        }
    }
}
