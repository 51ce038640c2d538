//! Unit conversions for derived columns.

use crate::error::TableError;
use crate::models::{Table, Value};

const KIB: f64 = 1024.0;

pub fn micros_to_millis(us: f64) -> f64 {
    us / 1000.0
}

pub fn micros_to_secs(us: f64) -> f64 {
    us / 1000.0 / 1000.0
}

pub fn millis_to_secs(ms: f64) -> f64 {
    ms / 1000.0
}

pub fn bytes_to_gib(bytes: f64) -> f64 {
    bytes / KIB / KIB / KIB
}

/// Derive `target` from the numeric column `source` through `convert`.
pub fn convert_column(
    table: &mut Table,
    source: &str,
    target: &str,
    convert: fn(f64) -> f64,
) -> Result<(), TableError> {
    table.derive(target, |r| r.number(source).map(|v| Value::Number(convert(v))))
}
