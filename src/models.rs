//! Data models for measurement tables.
//!
//! Measurement files are loosely typed: the column set differs between
//! experiments and the same column may hold identifiers or numbers. This
//! module provides a small column-oriented model ([`Table`], [`Record`],
//! [`Value`]) that the loader fills and the aggregator reduces.

use crate::error::TableError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// A single cell of a measurement table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Numeric measurement or numeric identifier.
    Number(f64),
    /// Categorical value (format names, variant names, query ids).
    Text(String),
}

impl Value {
    /// Parse a raw cell: numbers become [`Value::Number`], anything else text.
    pub fn parse_cell(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<f64>() {
            Ok(number) if !trimmed.is_empty() => Value::from(number),
            _ => Value::Text(trimmed.to_string()),
        }
    }

    /// Returns the number if this is a numeric cell.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

// Numbers order before text so mixed key columns still sort deterministically.
impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.total_cmp(b),
            (Value::Number(_), Value::Text(_)) => Ordering::Less,
            (Value::Text(_), Value::Number(_)) => Ordering::Greater,
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        // -0.0 and 0.0 are one key
        Value::Number(if n == 0.0 { 0.0 } else { n })
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

/// One row of a measurement table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    values: BTreeMap<String, Value>,
}

impl Record {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    pub fn set(&mut self, column: &str, value: impl Into<Value>) {
        self.values.insert(column.to_string(), value.into());
    }

    pub fn remove(&mut self, column: &str) -> Option<Value> {
        self.values.remove(column)
    }

    /// Returns the cell of `column` or a missing-column error.
    pub fn value(&self, column: &str) -> Result<&Value, TableError> {
        self.values.get(column).ok_or_else(|| TableError::MissingColumn {
            column: column.to_string(),
        })
    }

    /// Returns the numeric cell of `column`.
    pub fn number(&self, column: &str) -> Result<f64, TableError> {
        match self.value(column)? {
            Value::Number(n) => Ok(*n),
            Value::Text(s) => Err(TableError::NotNumeric {
                column: column.to_string(),
                value: s.clone(),
            }),
        }
    }

    /// Returns the cell of `column` rendered as text (numbers included).
    pub fn text(&self, column: &str) -> Result<String, TableError> {
        self.value(column).map(Value::to_string)
    }
}

#[cfg(test)]
impl Record {
    pub fn with(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }
}

/// An ordered collection of records sharing a column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    records: Vec<Record>,
}

impl Table {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty table with a known column order.
    pub fn with_columns<S: AsRef<str>>(columns: &[S]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
            records: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    fn register_column(&mut self, column: &str) {
        if !self.has_column(column) {
            self.columns.push(column.to_string());
        }
    }

    /// Appends a record; columns unknown so far are appended to the order.
    pub fn push(&mut self, record: Record) {
        for column in record.values.keys() {
            self.register_column(column);
        }
        self.records.push(record);
    }

    /// Concatenates another table below this one (union of columns).
    pub fn extend(&mut self, other: Table) {
        for column in &other.columns {
            self.register_column(column);
        }
        self.records.extend(other.records);
    }

    /// Concatenates several tables, e.g. the repetitions of one experiment.
    pub fn concat(tables: impl IntoIterator<Item = Table>) -> Table {
        let mut combined = Table::new();
        for table in tables {
            combined.extend(table);
        }
        combined
    }

    /// Keeps only the records for which `keep` returns true.
    pub fn retain<E>(
        &mut self,
        mut keep: impl FnMut(&Record) -> Result<bool, E>,
    ) -> Result<(), E> {
        let mut kept = Vec::with_capacity(self.records.len());
        for record in self.records.drain(..) {
            if keep(&record)? {
                kept.push(record);
            }
        }
        self.records = kept;
        Ok(())
    }

    /// Returns a copy holding only the records for which `keep` returns true.
    pub fn filtered<E>(&self, keep: impl FnMut(&Record) -> Result<bool, E>) -> Result<Table, E> {
        let mut table = self.clone();
        table.retain(keep)?;
        Ok(table)
    }

    /// Computes `column` for every record from the record itself.
    pub fn derive<E>(
        &mut self,
        column: &str,
        mut compute: impl FnMut(&Record) -> Result<Value, E>,
    ) -> Result<(), E> {
        for record in &mut self.records {
            let value = compute(record)?;
            record.set(column, value);
        }
        self.register_column(column);
        Ok(())
    }

    /// Sets `column` to the same value in every record.
    pub fn set_all(&mut self, column: &str, value: impl Into<Value>) {
        let value = value.into();
        for record in &mut self.records {
            record.set(column, value.clone());
        }
        self.register_column(column);
    }

    /// Removes the given columns from the order and from every record.
    pub fn drop_columns(&mut self, columns: &[&str]) {
        self.columns.retain(|c| !columns.contains(&c.as_str()));
        for record in &mut self.records {
            for column in columns {
                record.remove(column);
            }
        }
    }

    /// Returns a copy restricted to the given columns, in that order.
    pub fn select(&self, columns: &[&str]) -> Table {
        let mut table = Table::with_columns(columns);
        for record in &self.records {
            let mut projected = Record::new();
            for column in columns {
                if let Some(value) = record.get(column) {
                    projected.set(column, value.clone());
                }
            }
            table.records.push(projected);
        }
        table
    }

    /// Returns the sorted distinct values of `column`.
    pub fn distinct(&self, column: &str) -> Vec<Value> {
        let mut values: Vec<Value> = self
            .records
            .iter()
            .filter_map(|r| r.get(column).cloned())
            .collect();
        values.sort();
        values.dedup();
        values
    }

    /// Returns the records whose `column` renders as `label`.
    pub fn rows_where(&self, column: &str, label: &str) -> Vec<&Record> {
        self.records
            .iter()
            .filter(|r| r.get(column).map(|v| v.to_string() == label).unwrap_or(false))
            .collect()
    }
}

/// Processing style of the benchmarked engine (scalar or SIMD width).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStyle {
    Scalar,
    Vec128,
    Vec256,
    Vec512,
}

impl ProcessingStyle {
    /// Human-readable name used in diagram labels.
    pub fn display_name(&self) -> &'static str {
        match self {
            ProcessingStyle::Scalar => "scalar",
            ProcessingStyle::Vec128 => "SSE",
            ProcessingStyle::Vec256 => "AVX2",
            ProcessingStyle::Vec512 => "AVX-512",
        }
    }

    /// Identifier used in artifact directory names.
    pub fn id(&self) -> &'static str {
        match self {
            ProcessingStyle::Scalar => "scalar",
            ProcessingStyle::Vec128 => "vec128",
            ProcessingStyle::Vec256 => "vec256",
            ProcessingStyle::Vec512 => "vec512",
        }
    }

    /// Width of one vector register in bits.
    pub fn vector_size_bit(&self) -> u64 {
        match self {
            ProcessingStyle::Scalar => 64,
            ProcessingStyle::Vec128 => 128,
            ProcessingStyle::Vec256 => 256,
            ProcessingStyle::Vec512 => 512,
        }
    }
}

impl fmt::Display for ProcessingStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cell() {
        assert_eq!(Value::parse_cell(" 42 "), Value::Number(42.0));
        assert_eq!(Value::parse_cell("uncompr_f"), Value::from("uncompr_f"));
        assert_eq!(Value::parse_cell(""), Value::from(""));
    }

    #[test]
    fn test_signed_zero_is_one_key() {
        let negative = Value::parse_cell("-0.0");
        assert_eq!(negative, Value::parse_cell("0"));
        assert!(matches!(negative, Value::Number(n) if n.is_sign_positive()));
        assert_eq!(negative.to_string(), "0");
    }

    #[test]
    fn test_value_ordering() {
        assert!(Value::Number(2.0) < Value::Number(10.0));
        assert!(Value::Number(1e9) < Value::from("a"));
        assert!(Value::from("1.1") < Value::from("1.2"));
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Number(2.0).to_string(), "2");
        assert_eq!(Value::Number(0.01).to_string(), "0.01");
    }

    #[test]
    fn test_push_tracks_columns() {
        let mut table = Table::new();
        table.push(Record::new().with("b", 1.0).with("a", "x"));
        table.push(Record::new().with("c", 2.0));

        assert_eq!(table.len(), 2);
        assert!(table.has_column("a"));
        assert!(table.has_column("c"));
    }

    #[test]
    fn test_concat_and_retain() {
        let mut first = Table::new();
        first.push(Record::new().with("rep", 1.0));
        let mut second = Table::new();
        second.push(Record::new().with("rep", 2.0));
        second.push(Record::new().with("rep", 3.0));

        let mut table = Table::concat(vec![first, second]);
        assert_eq!(table.len(), 3);

        table
            .retain(|r| r.number("rep").map(|rep| rep > 1.0))
            .unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_derive_and_drop() {
        let mut table = Table::new();
        table.push(Record::new().with("us", 1500.0).with("junk", "x"));

        table
            .derive("ms", |r| r.number("us").map(|us| Value::Number(us / 1000.0)))
            .unwrap();
        table.drop_columns(&["junk"]);

        assert_eq!(table.records()[0].number("ms").unwrap(), 1.5);
        assert!(!table.has_column("junk"));
        assert!(table.records()[0].get("junk").is_none());
    }

    #[test]
    fn test_number_errors() {
        let record = Record::new().with("fmt", "uncompr_f");
        assert!(matches!(
            record.number("fmt"),
            Err(TableError::NotNumeric { .. })
        ));
        assert!(matches!(
            record.number("missing"),
            Err(TableError::MissingColumn { .. })
        ));
    }

    #[test]
    fn test_select_and_rows_where() {
        let mut table = Table::new();
        table.push(Record::new().with("q", "1.1").with("v", 1.0).with("x", 9.0));
        table.push(Record::new().with("q", "avg").with("v", 2.0).with("x", 9.0));

        let selected = table.select(&["q", "v"]);
        assert_eq!(selected.columns(), &["q".to_string(), "v".to_string()]);
        assert_eq!(selected.rows_where("q", "avg").len(), 1);
        assert_eq!(table.distinct("x"), vec![Value::Number(9.0)]);
    }

    #[test]
    fn test_processing_style_names() {
        assert_eq!(ProcessingStyle::Vec512.display_name(), "AVX-512");
        assert_eq!(ProcessingStyle::Scalar.vector_size_bit(), 64);
        assert_eq!(ProcessingStyle::Vec256.to_string(), "vec256");
    }
}
