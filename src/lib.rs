//! Analytics pipeline for student academic-performance datasets.
//!
//! The flow: uploaded CSV bytes are decoded, validated, and parsed into
//! a [`data::model::DataTable`]; duplicate rows are collapsed; the
//! table is materialized in an embedded DuckDB store
//! ([`store::TabularStore`]); declarative per-column filters
//! ([`query::filter::FilterSpec`]) compile to parameterized predicates;
//! and four fixed KPI aggregations ([`query::kpi`]) shape chart-ready
//! result tables. [`session::Session`] ties the pieces together for one
//! interactive session. Presentation (widgets, charting) stays outside
//! this crate; result tables cross that boundary as JSON.

pub mod data;
pub mod query;
pub mod session;
pub mod store;
