use std::collections::{btree_map, BTreeMap};

use serde::{Deserialize, Serialize};

use crate::data::model::CellValue;

// ---------------------------------------------------------------------------
// Per-column constraints
// ---------------------------------------------------------------------------

/// One column's constraint, decided at construction time. A closed set
/// of variants: a two-element value list and a numeric range can never
/// collide, they are different constructors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnFilter {
    /// No constraint; the entry is skipped during compilation.
    Unconstrained,
    /// Exact match on a single value.
    Equals(CellValue),
    /// Set membership. An empty set matches nothing (an empty selection
    /// in a filter widget hides everything).
    OneOf(Vec<CellValue>),
    /// Inclusive numeric range.
    Range { lo: f64, hi: f64 },
}

// ---------------------------------------------------------------------------
// FilterSpec – declarative per-column constraint set
// ---------------------------------------------------------------------------

/// Maps column name → constraint. Ordered so compilation is
/// deterministic (entries combine with AND in key order). An empty spec
/// compiles to an empty predicate: all rows pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    entries: BTreeMap<String, ColumnFilter>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, column: impl Into<String>, filter: ColumnFilter) -> Self {
        self.set(column, filter);
        self
    }

    pub fn set(&mut self, column: impl Into<String>, filter: ColumnFilter) {
        self.entries.insert(column.into(), filter);
    }

    /// Drop a column's constraint entirely.
    pub fn clear(&mut self, column: &str) {
        self.entries.remove(column);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, ColumnFilter> {
        self.entries.iter()
    }

    /// Compile into a parameterized predicate. String values
    /// travel as bound parameters, so quote characters in user data are
    /// inert; only the closed set of column names reaches the SQL text.
    pub fn compile(&self) -> Predicate {
        let mut conditions: Vec<String> = Vec::new();
        let mut params: Vec<CellValue> = Vec::new();

        for (column, filter) in &self.entries {
            let col = quote_ident(column);
            match filter {
                ColumnFilter::Unconstrained => continue,
                ColumnFilter::Equals(CellValue::Null) => {
                    conditions.push(format!("{col} IS NULL"));
                }
                ColumnFilter::Equals(value) => {
                    conditions.push(format!("{col} = ?"));
                    params.push(value.clone());
                }
                ColumnFilter::OneOf(values) if values.is_empty() => {
                    // Nothing selected for this column: hide everything.
                    conditions.push("FALSE".to_string());
                }
                ColumnFilter::OneOf(values) => {
                    let placeholders = vec!["?"; values.len()].join(", ");
                    conditions.push(format!("{col} IN ({placeholders})"));
                    params.extend(values.iter().cloned());
                }
                ColumnFilter::Range { lo, hi } => {
                    conditions.push(format!("{col} BETWEEN ? AND ?"));
                    params.push(CellValue::Float(*lo));
                    params.push(CellValue::Float(*hi));
                }
            }
        }

        Predicate {
            clause: conditions.join(" AND "),
            params,
        }
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

// ---------------------------------------------------------------------------
// Predicate – compiled row-selection expression
// ---------------------------------------------------------------------------

/// The compiled boolean row-selection expression: a SQL fragment with
/// `?` placeholders plus the values to bind, in placeholder order. An
/// empty clause selects every row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    clause: String,
    params: Vec<CellValue>,
}

impl Predicate {
    /// The match-everything predicate.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn clause(&self) -> &str {
        &self.clause
    }

    pub fn params(&self) -> &[CellValue] {
        &self.params
    }

    pub fn is_empty(&self) -> bool {
        self.clause.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_spec_compiles_to_empty_predicate() {
        let pred = FilterSpec::new().compile();
        assert_eq!(pred.clause(), "");
        assert!(pred.params().is_empty());
        assert!(pred.is_empty());
    }

    #[test]
    fn unconstrained_entries_are_skipped() {
        let pred = FilterSpec::new()
            .with("gender", ColumnFilter::Unconstrained)
            .compile();
        assert!(pred.is_empty());
    }

    #[test]
    fn membership_binds_each_value() {
        let pred = FilterSpec::new()
            .with(
                "gender",
                ColumnFilter::OneOf(vec![
                    CellValue::Text("Male".into()),
                    CellValue::Text("Female".into()),
                ]),
            )
            .compile();
        assert_eq!(pred.clause(), "\"gender\" IN (?, ?)");
        assert_eq!(
            pred.params(),
            &[
                CellValue::Text("Male".into()),
                CellValue::Text("Female".into())
            ]
        );
    }

    #[test]
    fn range_is_inclusive_between() {
        let pred = FilterSpec::new()
            .with("age", ColumnFilter::Range { lo: 18.0, hi: 25.0 })
            .compile();
        assert_eq!(pred.clause(), "\"age\" BETWEEN ? AND ?");
        assert_eq!(
            pred.params(),
            &[CellValue::Float(18.0), CellValue::Float(25.0)]
        );
    }

    #[test]
    fn equality_binds_scalars_of_any_kind() {
        let pred = FilterSpec::new()
            .with("part_time_job", ColumnFilter::Equals(CellValue::Bool(true)))
            .compile();
        assert_eq!(pred.clause(), "\"part_time_job\" = ?");
        assert_eq!(pred.params(), &[CellValue::Bool(true)]);
    }

    #[test]
    fn null_equality_uses_is_null() {
        let pred = FilterSpec::new()
            .with("gender", ColumnFilter::Equals(CellValue::Null))
            .compile();
        assert_eq!(pred.clause(), "\"gender\" IS NULL");
        assert!(pred.params().is_empty());
    }

    #[test]
    fn empty_membership_matches_nothing() {
        let pred = FilterSpec::new()
            .with("gender", ColumnFilter::OneOf(Vec::new()))
            .compile();
        assert_eq!(pred.clause(), "FALSE");
    }

    #[test]
    fn entries_combine_with_and_in_key_order() {
        let pred = FilterSpec::new()
            .with("gender", ColumnFilter::Equals(CellValue::Text("Male".into())))
            .with("age", ColumnFilter::Range { lo: 18.0, hi: 25.0 })
            .compile();
        assert_eq!(
            pred.clause(),
            "\"age\" BETWEEN ? AND ? AND \"gender\" = ?"
        );
        assert_eq!(
            pred.params(),
            &[
                CellValue::Float(18.0),
                CellValue::Float(25.0),
                CellValue::Text("Male".into())
            ]
        );
    }

    #[test]
    fn two_element_set_and_range_are_distinct_constructors() {
        let set = FilterSpec::new()
            .with(
                "age",
                ColumnFilter::OneOf(vec![CellValue::Integer(18), CellValue::Integer(25)]),
            )
            .compile();
        let range = FilterSpec::new()
            .with("age", ColumnFilter::Range { lo: 18.0, hi: 25.0 })
            .compile();
        assert_eq!(set.clause(), "\"age\" IN (?, ?)");
        assert_eq!(range.clause(), "\"age\" BETWEEN ? AND ?");
    }
}
