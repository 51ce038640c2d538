//! Delimited measurement file reader.
//!
//! Benchmark tools prefix their CSV output with a few lines of run
//! metadata. [`TsvSource`] discards a fixed number of those lines, treats
//! the next line as the header and parses every cell into a [`Value`].

use crate::error::LoadError;
use crate::models::{Record, Table, Value};
use csv::ReaderBuilder;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use tracing::debug;

/// Description of how a family of measurement files is laid out.
#[derive(Debug, Clone)]
pub struct TsvSource {
    /// Field delimiter (tab for all known artifacts).
    pub delimiter: u8,
    /// Number of lines preceding the header line.
    pub skip_lines: usize,
    /// Columns kept as text even when their cells look numeric.
    pub text_columns: Vec<String>,
}

impl Default for TsvSource {
    fn default() -> Self {
        Self {
            delimiter: b'\t',
            skip_lines: 2,
            text_columns: Vec::new(),
        }
    }
}

impl TsvSource {
    pub fn new(delimiter: u8, skip_lines: usize) -> Self {
        Self {
            delimiter,
            skip_lines,
            text_columns: Vec::new(),
        }
    }

    /// Returns a copy with a different number of skipped lines.
    pub fn with_skip_lines(&self, skip_lines: usize) -> Self {
        Self {
            skip_lines,
            ..self.clone()
        }
    }

    /// Returns a copy that keeps the given columns as text.
    pub fn with_text_columns(&self, columns: &[&str]) -> Self {
        let mut source = self.clone();
        source
            .text_columns
            .extend(columns.iter().map(|c| c.to_string()));
        source
    }

    /// Read one measurement file.
    pub fn read(&self, path: &Path) -> Result<Table, LoadError> {
        debug!("Reading {}", path.display());

        let file = File::open(path).map_err(|source| LoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        self.read_from(path, file)
    }

    /// Parse measurements from any reader; `origin` is only used in errors.
    pub fn read_from<R: Read>(&self, origin: &Path, reader: R) -> Result<Table, LoadError> {
        let mut reader = BufReader::new(reader);
        let mut skipped = Vec::new();

        for _ in 0..self.skip_lines {
            skipped.clear();
            let read = reader
                .read_until(b'\n', &mut skipped)
                .map_err(|source| LoadError::Read {
                    path: origin.to_path_buf(),
                    source,
                })?;
            if read == 0 {
                return Err(self.missing_header(origin));
            }
        }

        let mut csv = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .from_reader(reader);

        let malformed = |source| LoadError::Malformed {
            path: origin.to_path_buf(),
            source,
        };

        let headers: Vec<String> = csv
            .headers()
            .map_err(malformed)?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        if headers.iter().all(String::is_empty) {
            return Err(self.missing_header(origin));
        }

        let mut table = Table::with_columns(&headers);
        for row in csv.records() {
            let row = row.map_err(malformed)?;
            let mut record = Record::new();
            for (column, cell) in headers.iter().zip(row.iter()) {
                let value = if self.text_columns.iter().any(|c| c == column) {
                    Value::Text(cell.trim().to_string())
                } else {
                    Value::parse_cell(cell)
                };
                record.set(column, value);
            }
            table.push(record);
        }

        debug!("Read {} rows from {}", table.len(), origin.display());
        Ok(table)
    }

    fn missing_header(&self, origin: &Path) -> LoadError {
        LoadError::MissingHeader {
            path: origin.to_path_buf(),
            skip: self.skip_lines,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = "# vector_extension\tavx512\n\
                          # generated by the benchmark driver\n\
                          vector_extension\tin_data_f\truntime:µs\n\
                          ps_avx512\tuncompr_f\t1500\n\
                          ps_scalar\tuncompr_f\t3000\n";

    #[test]
    fn test_skips_metadata_lines() {
        let source = TsvSource::default();
        let table = source
            .read_from(Path::new("sample.csv"), SAMPLE.as_bytes())
            .unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(
            table.columns(),
            &["vector_extension", "in_data_f", "runtime:µs"]
        );
        assert_eq!(table.records()[0].number("runtime:µs").unwrap(), 1500.0);
        assert_eq!(
            table.records()[1].text("vector_extension").unwrap(),
            "ps_scalar"
        );
    }

    #[test]
    fn test_text_columns_stay_text() {
        let source = TsvSource::default()
            .with_skip_lines(0)
            .with_text_columns(&["query"]);
        let table = source
            .read_from(Path::new("q.csv"), "query\truntime [ms]\n1.1\t20\n".as_bytes())
            .unwrap();

        assert_eq!(table.records()[0].get("query"), Some(&Value::from("1.1")));
        assert_eq!(table.records()[0].number("runtime [ms]").unwrap(), 20.0);
    }

    #[test]
    fn test_missing_header() {
        let source = TsvSource::default();
        let result = source.read_from(Path::new("short.csv"), "only one line\n".as_bytes());
        assert!(matches!(result, Err(LoadError::MissingHeader { skip: 2, .. })));
    }

    #[test]
    fn test_ragged_row_is_malformed() {
        let source = TsvSource::default().with_skip_lines(0);
        let result = source.read_from(Path::new("ragged.csv"), "a\tb\n1\t2\t3\n".as_bytes());
        assert!(matches!(result, Err(LoadError::Malformed { .. })));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = TsvSource::default().read(&dir.path().join("absent.csv"));
        assert!(matches!(result, Err(LoadError::Read { .. })));
    }

    #[test]
    fn test_read_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("example_1.csv");
        let mut file = File::create(&path).unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let table = TsvSource::default().read(&path).unwrap();
        assert_eq!(table.len(), 2);
    }
}
