//! Grouping and reduction of measurement tables.
//!
//! This module provides the reductions applied between loading and
//! rendering: averaging repetitions per configuration key, summing
//! per-column footprints, and appending the "average across queries" row.

use crate::error::AggregateError;
use crate::models::{Record, Table, Value};
use std::collections::BTreeMap;
use tracing::debug;

/// Sentinel label of the grand-average row.
pub const AVERAGE_LABEL: &str = "avg";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reduction {
    Mean,
    Sum,
}

/// Group rows by `keys` and average every numeric non-key column.
///
/// Rows sharing a key are repetitions of one configuration; all of them
/// contribute to the mean. The result holds exactly one row per distinct key.
pub fn group_mean(table: &Table, keys: &[&str]) -> Result<Table, AggregateError> {
    reduce(table, keys, Reduction::Mean)
}

/// Group rows by `keys` and add up every numeric non-key column.
pub fn group_sum(table: &Table, keys: &[&str]) -> Result<Table, AggregateError> {
    reduce(table, keys, Reduction::Sum)
}

/// Append one average row per `keys` group, averaging over `dimension`.
///
/// The appended rows carry [`AVERAGE_LABEL`] in the `dimension` column.
pub fn append_grand_average(
    table: &Table,
    dimension: &str,
    keys: &[&str],
) -> Result<Table, AggregateError> {
    if keys.contains(&dimension) {
        return Err(AggregateError::DimensionInKey(dimension.to_string()));
    }

    let mut without_dimension = table.clone();
    without_dimension.drop_columns(&[dimension]);

    let mut averages = group_mean(&without_dimension, keys)?;
    averages.set_all(dimension, AVERAGE_LABEL);

    let mut combined = table.clone();
    combined.extend(averages);
    Ok(combined)
}

/// Columns that can be reduced: not part of the key and numeric wherever set.
fn reducible_columns(table: &Table, keys: &[&str]) -> Vec<String> {
    table
        .columns()
        .iter()
        .filter(|column| !keys.contains(&column.as_str()))
        .filter(|column| {
            let mut present = table
                .records()
                .iter()
                .filter_map(|r| r.get(column))
                .peekable();
            if present.peek().is_none() {
                return false;
            }
            let numeric = present.all(|v| matches!(v, Value::Number(_)));
            if !numeric {
                debug!("Column '{}' is not numeric and is left out of the aggregate", column);
            }
            numeric
        })
        .cloned()
        .collect()
}

fn reduce(table: &Table, keys: &[&str], reduction: Reduction) -> Result<Table, AggregateError> {
    let columns = reducible_columns(table, keys);

    // key -> per-column (sum, count)
    let mut groups: BTreeMap<Vec<Value>, Vec<(f64, usize)>> = BTreeMap::new();

    for record in table.records() {
        let key = keys
            .iter()
            .map(|k| {
                record
                    .get(k)
                    .cloned()
                    .ok_or_else(|| AggregateError::MissingKey(k.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let slots = groups
            .entry(key)
            .or_insert_with(|| vec![(0.0, 0); columns.len()]);

        for (slot, column) in slots.iter_mut().zip(&columns) {
            if let Some(n) = record.get(column).and_then(Value::as_number) {
                slot.0 += n;
                slot.1 += 1;
            }
        }
    }

    let mut order: Vec<&str> = keys.to_vec();
    order.extend(columns.iter().map(String::as_str));

    let mut result = Table::with_columns(&order);
    for (key, slots) in groups {
        let mut record = Record::new();
        for (column, value) in keys.iter().zip(key) {
            record.set(column, value);
        }
        for (column, (sum, count)) in columns.iter().zip(slots) {
            if count == 0 {
                continue;
            }
            let value = match reduction {
                Reduction::Mean => sum / count as f64,
                Reduction::Sum => sum,
            };
            record.set(column, value);
        }
        result.push(record);
    }

    debug!(
        "Reduced {} rows to {} groups over {:?}",
        table.len(),
        result.len(),
        keys
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(variant: &str, query: &str, runtime: f64) -> Record {
        Record::new()
            .with("variant", variant)
            .with("query", query)
            .with("runtime", runtime)
    }

    fn table(rows: Vec<Record>) -> Table {
        let mut table = Table::new();
        for r in rows {
            table.push(r);
        }
        table
    }

    #[test]
    fn test_mean_of_repetitions() {
        let input = table(vec![
            row("A", "1.1", 10.0),
            row("A", "1.1", 20.0),
            row("A", "1.1", 30.0),
        ]);

        let result = group_mean(&input, &["variant", "query"]).unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result.records()[0].number("runtime").unwrap(), 20.0);
    }

    #[test]
    fn test_one_row_per_distinct_key() {
        let input = table(vec![
            row("A", "1.1", 1.0),
            row("B", "1.1", 2.0),
            row("A", "1.2", 3.0),
            row("A", "1.1", 4.0),
            row("B", "1.1", 5.0),
        ]);

        let result = group_mean(&input, &["variant", "query"]).unwrap();

        assert_eq!(result.len(), 3);
        let mut keys: Vec<(String, String)> = result
            .records()
            .iter()
            .map(|r| (r.text("variant").unwrap(), r.text("query").unwrap()))
            .collect();
        keys.dedup();
        assert_eq!(keys.len(), 3);
        assert_eq!(
            result.rows_where("variant", "B")[0].number("runtime").unwrap(),
            3.5
        );
    }

    #[test]
    fn test_sum_per_key() {
        let input = table(vec![
            row("A", "1.1", 1.0),
            row("A", "1.1", 2.5),
            row("A", "1.2", 4.0),
        ]);

        let result = group_sum(&input, &["query"]).unwrap();

        assert_eq!(result.rows_where("query", "1.1")[0].number("runtime").unwrap(), 3.5);
        assert_eq!(result.rows_where("query", "1.2")[0].number("runtime").unwrap(), 4.0);
    }

    #[test]
    fn test_grand_average() {
        let input = table(vec![
            row("X", "A", 10.0),
            row("X", "B", 20.0),
            row("X", "C", 30.0),
        ]);

        let result = append_grand_average(&input, "query", &["variant"]).unwrap();

        assert_eq!(result.len(), 4);
        let avg = result.rows_where("query", AVERAGE_LABEL);
        assert_eq!(avg.len(), 1);
        assert_eq!(avg[0].number("runtime").unwrap(), 20.0);
        assert_eq!(avg[0].text("variant").unwrap(), "X");
    }

    #[test]
    fn test_grand_average_rejects_key_dimension() {
        let input = table(vec![row("X", "A", 10.0)]);
        assert!(matches!(
            append_grand_average(&input, "query", &["query"]),
            Err(AggregateError::DimensionInKey(_))
        ));
    }

    #[test]
    fn test_text_columns_are_not_reduced() {
        let input = table(vec![
            row("A", "1.1", 1.0).with("note", "warm"),
            row("A", "1.1", 3.0).with("note", "cold"),
        ]);

        let result = group_mean(&input, &["variant"]).unwrap();

        assert!(!result.has_column("note"));
        assert!(!result.has_column("query"));
        assert_eq!(result.records()[0].number("runtime").unwrap(), 2.0);
    }

    #[test]
    fn test_missing_key_fails() {
        let input = table(vec![Record::new().with("runtime", 1.0)]);
        assert!(matches!(
            group_mean(&input, &["variant"]),
            Err(AggregateError::MissingKey(_))
        ));
    }

    #[test]
    fn test_mean_skips_absent_cells() {
        let input = table(vec![
            row("A", "1.1", 4.0),
            Record::new().with("variant", "A").with("query", "1.1"),
        ]);

        let result = group_mean(&input, &["variant"]).unwrap();
        assert_eq!(result.records()[0].number("runtime").unwrap(), 4.0);
    }
}
