//! Measurement loading.
//!
//! This module reads the per-repetition measurement files of an experiment,
//! applies the experiment's row filters and derivations and hands a single
//! combined table to the aggregator.

pub mod micro;
pub mod ssb;
pub mod tsv;

pub use tsv::TsvSource;

use crate::error::LoadError;
use crate::models::{Table, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Path of repetition `rep` (1-based) of `experiment` inside `dir`.
pub fn repetition_path(dir: &Path, experiment: &str, rep: usize) -> PathBuf {
    dir.join(format!("{}_{}.csv", experiment, rep))
}

/// Load `repetitions` files of `experiment` and concatenate them.
///
/// `prepare` runs on every file before concatenation and carries the
/// experiment-specific filters and derivations. A missing file or a failing
/// derivation aborts the whole load.
pub fn load_repetitions(
    dir: &Path,
    experiment: &str,
    repetitions: usize,
    source: &TsvSource,
    mut prepare: impl FnMut(Table) -> Result<Table, LoadError>,
) -> Result<Table, LoadError> {
    if repetitions == 0 {
        return Err(LoadError::NoRepetitions(experiment.to_string()));
    }

    let mut tables = Vec::with_capacity(repetitions);
    for rep in 1..=repetitions {
        let table = prepare(source.read(&repetition_path(dir, experiment, rep))?)?;
        if table.is_empty() {
            warn!("Repetition {} of {} has no rows left after filtering", rep, experiment);
        }
        tables.push(table);
    }

    let combined = Table::concat(tables);
    debug!(
        "Loaded {} rows over {} repetitions of {}",
        combined.len(),
        repetitions,
        experiment
    );
    Ok(combined)
}

/// Map a categorical value through a fixed lookup; unmapped values fail.
pub fn map_category(column: &str, value: &str, lookup: &[(&str, &str)]) -> Result<Value, LoadError> {
    lookup
        .iter()
        .find(|(from, _)| *from == value)
        .map(|(_, to)| Value::from(*to))
        .ok_or_else(|| LoadError::UnmappedCategory {
            column: column.to_string(),
            value: value.to_string(),
        })
}

/// Read `column` as a whole-number index (e.g. dataset or setting ids).
pub fn index_value(record: &crate::models::Record, column: &str) -> Result<i64, LoadError> {
    let value = record.number(column)?;
    if value.fract() != 0.0 || !value.is_finite() {
        return Err(LoadError::NotAnIndex {
            column: column.to_string(),
            value,
        });
    }
    Ok(value as i64)
}

/// Read `column` as a non-negative count (value counts, bit widths).
pub fn count_value(record: &crate::models::Record, column: &str) -> Result<u64, LoadError> {
    let index = index_value(record, column)?;
    u64::try_from(index).map_err(|_| LoadError::NotAnIndex {
        column: column.to_string(),
        value: index as f64,
    })
}
