use std::collections::HashMap;

use super::model::{CellValue, DataTable};

// ---------------------------------------------------------------------------
// Row deduplication – runs between parsing and import
// ---------------------------------------------------------------------------

/// Which occurrence survives when exact-duplicate rows are collapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keep {
    First,
    Last,
}

/// Collapse exact-duplicate rows, keeping one occurrence per duplicate
/// group. Order of the surviving rows follows the kept occurrence's
/// original position.
pub fn dedup_rows(table: &DataTable, keep: Keep) -> DataTable {
    // Position of the kept occurrence per distinct row.
    let mut kept: HashMap<&[CellValue], usize> = HashMap::new();
    for (i, row) in table.rows.iter().enumerate() {
        match keep {
            Keep::First => {
                kept.entry(row.as_slice()).or_insert(i);
            }
            Keep::Last => {
                kept.insert(row.as_slice(), i);
            }
        }
    }

    let mut indices: Vec<usize> = kept.into_values().collect();
    indices.sort_unstable();

    let rows = indices.into_iter().map(|i| table.rows[i].clone()).collect();
    let deduped = DataTable {
        columns: table.columns.clone(),
        types: table.types.clone(),
        rows,
    };
    if deduped.len() < table.len() {
        log::info!(
            "dropped {} duplicate rows ({} remain)",
            table.len() - deduped.len(),
            deduped.len()
        );
    }
    deduped
}

/// Remove every row that has at least one exact duplicate, keeping none
/// of the group. Distinct from [`dedup_rows`], which keeps one.
pub fn drop_duplicate_groups(table: &DataTable) -> DataTable {
    let mut counts: HashMap<&[CellValue], usize> = HashMap::new();
    for row in &table.rows {
        *counts.entry(row.as_slice()).or_insert(0) += 1;
    }

    let rows = table
        .rows
        .iter()
        .filter(|row| counts[row.as_slice()] == 1)
        .cloned()
        .collect();
    DataTable {
        columns: table.columns.clone(),
        types: table.types.clone(),
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DataTable {
        DataTable::from_rows(
            vec!["id".into(), "name".into()],
            vec![
                vec![CellValue::Integer(1), CellValue::Text("Alice".into())],
                vec![CellValue::Integer(1), CellValue::Text("Alice".into())],
                vec![CellValue::Integer(2), CellValue::Text("Bob".into())],
            ],
        )
    }

    #[test]
    fn keep_first_retains_first_occurrence() {
        let deduped = dedup_rows(&sample(), Keep::First);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped.rows[0][0], CellValue::Integer(1));
        assert_eq!(deduped.rows[1][0], CellValue::Integer(2));
    }

    #[test]
    fn keep_last_retains_last_occurrence_in_order() {
        let table = DataTable::from_rows(
            vec!["id".into()],
            vec![
                vec![CellValue::Integer(1)],
                vec![CellValue::Integer(2)],
                vec![CellValue::Integer(1)],
            ],
        );
        let deduped = dedup_rows(&table, Keep::Last);
        // The surviving copy of id=1 is the later one, so id=2 now leads.
        assert_eq!(deduped.rows[0][0], CellValue::Integer(2));
        assert_eq!(deduped.rows[1][0], CellValue::Integer(1));
    }

    #[test]
    fn drop_groups_keeps_only_unique_rows() {
        let cleaned = drop_duplicate_groups(&sample());
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned.rows[0][1], CellValue::Text("Bob".into()));
    }

    #[test]
    fn order_of_remaining_rows_is_preserved() {
        let table = DataTable::from_rows(
            vec!["id".into()],
            vec![
                vec![CellValue::Integer(3)],
                vec![CellValue::Integer(1)],
                vec![CellValue::Integer(3)],
                vec![CellValue::Integer(2)],
            ],
        );
        let deduped = dedup_rows(&table, Keep::First);
        let ids: Vec<_> = deduped.rows.iter().map(|r| r[0].clone()).collect();
        assert_eq!(
            ids,
            vec![
                CellValue::Integer(3),
                CellValue::Integer(1),
                CellValue::Integer(2)
            ]
        );
    }
}
