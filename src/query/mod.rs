/// Query layer: declarative filters compiled to parameterized
/// predicates, and the fixed KPI aggregations built on top of them.
pub mod filter;
pub mod kpi;
