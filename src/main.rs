use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};

use edustat::data::model::{CellValue, DataTable};
use edustat::data::validate::{validate_csv_structure, DatasetKind};
use edustat::query::filter::ColumnFilter;
use edustat::session::{Session, SessionConfig};

// ---------------------------------------------------------------------------
// CLI driver – stand-in for the dashboard's orchestration layer
// ---------------------------------------------------------------------------

const USAGE: &str = "\
usage: edustat [--json] [--db PATH] [--range COL=LO..HI] [--equals COL=VALUE] FILE...

Ingests student-performance CSV files (habits or factors shape, detected
from the header), applies the given filters, and prints the four KPI
tables per loaded dataset.";

struct Args {
    json: bool,
    db_path: Option<PathBuf>,
    filters: Vec<(String, ColumnFilter)>,
    files: Vec<PathBuf>,
}

fn parse_args(argv: &[String]) -> Result<Args> {
    let mut args = Args {
        json: false,
        db_path: None,
        filters: Vec::new(),
        files: Vec::new(),
    };
    let mut it = argv.iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--json" => args.json = true,
            "--db" => {
                let path = it.next().context("--db needs a path")?;
                args.db_path = Some(PathBuf::from(path));
            }
            "--range" => {
                let spec = it.next().context("--range needs COL=LO..HI")?;
                args.filters.push(parse_range(spec)?);
            }
            "--equals" => {
                let spec = it.next().context("--equals needs COL=VALUE")?;
                args.filters.push(parse_equals(spec)?);
            }
            "--help" | "-h" => bail!("{USAGE}"),
            other if other.starts_with('-') => bail!("unknown option '{other}'\n{USAGE}"),
            file => args.files.push(PathBuf::from(file)),
        }
    }
    if args.files.is_empty() {
        bail!("no input files\n{USAGE}");
    }
    Ok(args)
}

fn parse_range(spec: &str) -> Result<(String, ColumnFilter)> {
    let (col, bounds) = spec
        .split_once('=')
        .context("expected COL=LO..HI")?;
    let (lo, hi) = bounds.split_once("..").context("expected COL=LO..HI")?;
    Ok((
        col.to_string(),
        ColumnFilter::Range {
            lo: lo.parse().with_context(|| format!("bad lower bound '{lo}'"))?,
            hi: hi.parse().with_context(|| format!("bad upper bound '{hi}'"))?,
        },
    ))
}

fn parse_equals(spec: &str) -> Result<(String, ColumnFilter)> {
    let (col, value) = spec.split_once('=').context("expected COL=VALUE")?;
    let value = if let Ok(i) = value.parse::<i64>() {
        CellValue::Integer(i)
    } else if let Ok(f) = value.parse::<f64>() {
        CellValue::Float(f)
    } else {
        CellValue::Text(value.to_string())
    };
    Ok((col.to_string(), ColumnFilter::Equals(value)))
}

/// Identify which recognized dataset shape a file's header matches.
fn detect_kind(content: &str) -> Option<DatasetKind> {
    [DatasetKind::Habits, DatasetKind::Factors]
        .into_iter()
        .find(|kind| validate_csv_structure(content, kind.required_columns()).ok)
}

fn main() -> ExitCode {
    env_logger::init();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let args = match parse_args(&argv) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    let mut session = Session::new(SessionConfig {
        store_path: args.db_path.clone(),
        ..SessionConfig::default()
    })
    .context("opening the tabular store")?;

    // Ingest every file; a failed file is reported and skipped, it never
    // aborts its siblings.
    for path in &args.files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        match ingest_file(&mut session, path, &name) {
            Ok(info) => println!(
                "loaded {} ({} rows, {} columns)",
                info.name, info.rows, info.columns
            ),
            Err(e) => {
                log::error!("skipping '{name}': {e:#}");
                eprintln!("skipping '{name}': {e:#}");
            }
        }
    }
    if session.loaded_kinds().is_empty() {
        bail!("no file could be ingested");
    }

    for (column, filter) in args.filters {
        session.set_filter(column, filter);
    }

    let kinds: Vec<DatasetKind> = session.loaded_kinds().to_vec();
    for kind in kinds {
        match session.kpis(kind) {
            Ok(kpis) if args.json => print_json(kind, &kpis)?,
            Ok(kpis) => print_text(kind, &kpis),
            Err(e) => {
                log::error!("KPIs for {} failed: {e:#}", kind.table_name());
                eprintln!("KPIs for {} failed: {e:#}", kind.table_name());
            }
        }
    }

    session.teardown().context("closing the tabular store")?;
    Ok(())
}

fn ingest_file(
    session: &mut Session,
    path: &Path,
    name: &str,
) -> Result<edustat::data::loader::FileInfo> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let content = std::str::from_utf8(&bytes).context("file is not valid UTF-8 text")?;
    let kind = detect_kind(content)
        .context("header matches neither the habits nor the factors dataset shape")?;
    Ok(session.ingest(name, &bytes, kind)?)
}

// -- Output ----------------------------------------------------------------

fn print_text(kind: DatasetKind, kpis: &[(&'static str, DataTable)]) {
    println!("\n== {} ==", kind.table_name());
    for (name, table) in kpis {
        println!("\n{name} ({} rows)", table.len());
        println!("  {}", table.columns.join(" | "));
        for row in &table.rows {
            let cells: Vec<String> = row.iter().map(|c| c.to_string()).collect();
            println!("  {}", cells.join(" | "));
        }
    }
}

fn print_json(kind: DatasetKind, kpis: &[(&'static str, DataTable)]) -> Result<()> {
    let payload = serde_json::json!({
        "table": kind.table_name(),
        "kpis": kpis
            .iter()
            .map(|(name, table)| serde_json::json!({ "name": name, "result": table }))
            .collect::<Vec<_>>(),
    });
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}
