//! Loaders for the Star Schema Benchmark experiments.
//!
//! Runtimes come from the column store (one directory per compression
//! strategy and repetition) and from the reference DBMS (one file per
//! integer type). Memory footprints come from pre-computed per-column
//! format choices.

use super::TsvSource;
use crate::analysis::{self, units};
use crate::error::LoadError;
use crate::models::{ProcessingStyle, Table, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// All SSB queries in their canonical order.
pub const SSB_QUERIES: [&str; 13] = [
    "1.1", "1.2", "1.3", "2.1", "2.2", "2.3", "3.1", "3.2", "3.3", "3.4", "4.1", "4.2", "4.3",
];

/// Compression strategies; `{obj}` is replaced by the optimization objective.
pub const STRATEGY_TEMPLATES: [&str; 6] = [
    "Uncompr",
    "StaticBP32",
    "ActualWorst{obj}",
    "ActualBest{obj}",
    "ActualBestBase{obj}",
    "CostBasedBest{obj}",
];

/// Uncompressed data processed with the scalar style.
pub const UNCOMPR_SCALAR: &str = "UncomprScalar";

/// Integer types used for the base data in the reference DBMS.
pub const MONETDB_INT_TYPES: [&str; 2] = ["BIGINT", "tight"];

const RUNTIME_KEY: [&str; 3] = ["query", "ps", "cs"];
const FOOTPRINT_KEY: [&str; 3] = ["query", "cs", "ps"];

/// Optimization objective of a compression strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Objective {
    Mem,
    Perf,
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Objective::Mem => write!(f, "Mem"),
            Objective::Perf => write!(f, "Perf"),
        }
    }
}

/// Resolve a strategy template for an objective.
pub fn strategy_name(template: &str, objective: Objective) -> String {
    template.replace("{obj}", &objective.to_string())
}

/// Everything needed to locate the SSB artifacts of one run.
#[derive(Debug, Clone)]
pub struct SsbInputs {
    /// The `ssb` artifacts directory.
    pub dir: PathBuf,
    pub scale_factor: u32,
    pub processing_style: ProcessingStyle,
    pub repetitions: usize,
    pub queries: Vec<String>,
    pub source: TsvSource,
}

impl SsbInputs {
    fn morphstore_times_dir(&self) -> PathBuf {
        self.dir
            .join(format!("times_MorphStore_sf{}", self.scale_factor))
    }

    fn monetdb_times_dir(&self) -> PathBuf {
        self.dir.join(format!("times_MonetDB_sf{}", self.scale_factor))
    }

    fn footprints_dir(&self) -> PathBuf {
        self.dir.join(format!(
            "footprints_sf{}_{}",
            self.scale_factor,
            self.processing_style.id()
        ))
    }

    /// Runtime file of one query under one strategy and repetition.
    pub fn runtime_path(&self, cs: &str, rep: usize, query: &str) -> PathBuf {
        self.morphstore_times_dir()
            .join(format!("time_sf{}_{}_{}", self.scale_factor, cs, rep))
            .join(format!("q{}.csv", query))
    }

    /// Per-column footprint file of one query under one strategy.
    pub fn footprint_path(&self, cs: &str, query: &str) -> PathBuf {
        self.footprints_dir().join(cs).join(format!("q{}.csv", query))
    }

    /// Runtime file of the reference DBMS for one integer type.
    pub fn monetdb_path(&self, int_type: &str) -> PathBuf {
        self.monetdb_times_dir().join(format!("{}.csv", int_type))
    }
}

fn tag(table: &mut Table, query: &str, ps: &str, cs: &str) {
    table.set_all("query", query);
    table.set_all("ps", ps);
    table.set_all("cs", cs);
}

/// Load the column-store runtimes of all selected queries.
///
/// Only the whole-query row of each file is used. The result is averaged
/// over repetitions, extended by the `avg` row per strategy and carries
/// `runtime [s]`.
pub fn load_runtimes_morphstore(inputs: &SsbInputs) -> Result<Table, LoadError> {
    if inputs.repetitions == 0 {
        return Err(LoadError::NoRepetitions("ssb runtimes".to_string()));
    }

    let source = inputs.source.with_text_columns(&["opName"]);
    let mut strategies: Vec<String> = STRATEGY_TEMPLATES
        .iter()
        .map(|t| strategy_name(t, Objective::Perf))
        .collect();
    strategies.push(UNCOMPR_SCALAR.to_string());

    let mut tables = Vec::new();
    for rep in 1..=inputs.repetitions {
        for query in &inputs.queries {
            for cs in &strategies {
                let ps = if cs == UNCOMPR_SCALAR {
                    ProcessingStyle::Scalar
                } else {
                    inputs.processing_style
                };

                let mut table = source.read(&inputs.runtime_path(cs, rep, query))?;
                table.retain(|r| r.number("opIdx").map(|idx| idx == 0.0))?;
                table.drop_columns(&["opIdx", "opName"]);
                tag(&mut table, query, ps.display_name(), cs);
                tables.push(table);
            }
        }
    }

    let combined = Table::concat(tables);
    debug!("Loaded {} column-store runtime rows", combined.len());

    let per_query = analysis::group_mean(&combined, &RUNTIME_KEY)?;
    let mut table = analysis::append_grand_average(&per_query, "query", &["ps", "cs"])?;
    units::convert_column(&mut table, "runtime", "runtime [s]", units::micros_to_secs)?;
    Ok(table)
}

/// Load the reference DBMS runtimes for one integer type.
///
/// The first two repetitions are warm-up runs and are discarded.
pub fn load_runtimes_monetdb(inputs: &SsbInputs, int_type: &str) -> Result<Table, LoadError> {
    let source = inputs
        .source
        .with_skip_lines(0)
        .with_text_columns(&["query"]);

    let mut table = source.read(&inputs.monetdb_path(int_type))?;
    table.retain(|r| r.number("repetition").map(|rep| rep > 2.0))?;
    table.drop_columns(&["repetition"]);
    table.retain(|r| {
        r.text("query")
            .map(|q| inputs.queries.iter().any(|selected| *selected == q))
    })?;
    table.set_all("ps", ProcessingStyle::Scalar.display_name());
    table.set_all("cs", int_type);

    let per_query = analysis::group_mean(&table, &RUNTIME_KEY)?;
    let mut table = analysis::append_grand_average(&per_query, "query", &["ps", "cs"])?;
    units::convert_column(&mut table, "runtime [ms]", "runtime [s]", units::millis_to_secs)?;
    Ok(table)
}

/// Physical size in bytes of a column stored in the static bit-packed format.
///
/// Complete blocks of `block` values use `bw` bits per value; the remainder
/// stays uncompressed at 8 bytes per value.
pub fn static_vbp_size(count_values: u64, bw: u64, block: u64) -> f64 {
    let packed = (count_values / block) * block;
    (packed * bw) as f64 / 8.0 + ((count_values % block) * 8) as f64
}

/// Load the memory footprints of all selected queries.
///
/// Per-column sizes are summed per query and strategy, the `avg` row is
/// appended and `footprint [GiB]` is derived.
pub fn load_footprints_morphstore(inputs: &SsbInputs) -> Result<Table, LoadError> {
    let source = inputs
        .source
        .with_skip_lines(0)
        .with_text_columns(&["colName", "format"]);
    let block = inputs.processing_style.vector_size_bit();

    let mut tables = Vec::new();
    for query in &inputs.queries {
        for template in STRATEGY_TEMPLATES {
            let cs = strategy_name(template, Objective::Mem);
            let mut table = source.read(&inputs.footprint_path(&cs, query))?;

            table.derive("sizeUsedByte", |r| {
                let format = r.text("format")?;
                let size = if format.starts_with("static_vbp") {
                    let count = super::count_value(r, "countValues")?;
                    let bw = super::count_value(r, "bw")?;
                    static_vbp_size(count, bw, block)
                } else {
                    r.number("sizeUsedByte")?
                };
                Ok::<_, LoadError>(Value::Number(size))
            })?;

            let mut table = table.select(&["sizeUsedByte"]);
            tag(&mut table, query, inputs.processing_style.display_name(), &cs);
            tables.push(table);
        }
    }

    let per_query = analysis::group_sum(&Table::concat(tables), &FOOTPRINT_KEY)?;
    let mut table = analysis::append_grand_average(&per_query, "query", &["cs", "ps"])?;
    units::convert_column(&mut table, "sizeUsedByte", "footprint [GiB]", units::bytes_to_gib)?;
    Ok(table)
}

/// Directory holding the SSB artifacts below the artifacts root.
pub fn ssb_dir(artifacts: &Path) -> PathBuf {
    artifacts.join("ssb")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn inputs(dir: &Path, queries: &[&str], repetitions: usize) -> SsbInputs {
        SsbInputs {
            dir: dir.to_path_buf(),
            scale_factor: 1,
            processing_style: ProcessingStyle::Vec512,
            repetitions,
            queries: queries.iter().map(|q| q.to_string()).collect(),
            source: TsvSource::default(),
        }
    }

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_strategy_names() {
        assert_eq!(strategy_name("ActualBest{obj}", Objective::Perf), "ActualBestPerf");
        assert_eq!(strategy_name("Uncompr", Objective::Mem), "Uncompr");
    }

    #[test]
    fn test_static_vbp_size() {
        // 1000 values, 512-value blocks: 512 packed at 3 bits, 488 at 8 bytes
        assert_eq!(static_vbp_size(1000, 3, 512), 192.0 + 3904.0);
        assert_eq!(static_vbp_size(1024, 8, 512), 1024.0);
    }

    #[test]
    fn test_load_runtimes_morphstore() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = inputs(dir.path(), &["1.1", "1.2"], 2);

        let mut strategies: Vec<String> = STRATEGY_TEMPLATES
            .iter()
            .map(|t| strategy_name(t, Objective::Perf))
            .collect();
        strategies.push(UNCOMPR_SCALAR.to_string());

        for rep in 1..=2 {
            for (query, base) in [("1.1", 1_000_000.0), ("1.2", 3_000_000.0)] {
                for cs in &strategies {
                    let whole = base * rep as f64;
                    let body = format!(
                        "#\n#\nopIdx\topName\truntime\n0\tquery\t{}\n1\tselect\t5\n",
                        whole
                    );
                    write(&inputs.runtime_path(cs, rep, query), &body);
                }
            }
        }

        let table = load_runtimes_morphstore(&inputs).unwrap();

        // 7 strategies x (2 queries + avg)
        assert_eq!(table.len(), 21);
        let uncompr: Vec<_> = table
            .rows_where("cs", "Uncompr")
            .into_iter()
            .filter(|r| r.text("query").unwrap() == "1.1")
            .collect();
        assert_eq!(uncompr.len(), 1);
        assert_eq!(uncompr[0].number("runtime [s]").unwrap(), 1.5);
        assert_eq!(uncompr[0].text("ps").unwrap(), "AVX-512");

        let scalar_avg: Vec<_> = table
            .rows_where("cs", UNCOMPR_SCALAR)
            .into_iter()
            .filter(|r| r.text("query").unwrap() == "avg")
            .collect();
        assert_eq!(scalar_avg[0].text("ps").unwrap(), "scalar");
        assert_eq!(scalar_avg[0].number("runtime [s]").unwrap(), 3.0);
    }

    #[test]
    fn test_load_runtimes_monetdb() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = inputs(dir.path(), &["1.1"], 1);
        write(
            &inputs.monetdb_path("BIGINT"),
            "query\trepetition\truntime [ms]\n\
             1.1\t1\t9999\n\
             1.1\t2\t9999\n\
             1.1\t3\t100\n\
             1.1\t4\t300\n\
             2.1\t3\t50\n",
        );

        let table = load_runtimes_monetdb(&inputs, "BIGINT").unwrap();

        assert_eq!(table.len(), 2);
        let q = table.rows_where("query", "1.1");
        assert_eq!(q[0].number("runtime [s]").unwrap(), 0.2);
        assert_eq!(q[0].text("cs").unwrap(), "BIGINT");
        assert_eq!(table.rows_where("query", "avg")[0].number("runtime [s]").unwrap(), 0.2);
    }

    #[test]
    fn test_load_footprints() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = inputs(dir.path(), &["1.1"], 1);
        for template in STRATEGY_TEMPLATES {
            let cs = strategy_name(template, Objective::Mem);
            write(
                &inputs.footprint_path(&cs, "1.1"),
                "colName\tformat\tbw\tcountValues\tsizeUsedByte\n\
                 lo_quantity\tstatic_vbp\t8\t1024\t\n\
                 lo_discount\tuncompr\t\t1024\t8192\n",
            );
        }

        let table = load_footprints_morphstore(&inputs).unwrap();

        // 6 strategies x (1 query + avg)
        assert_eq!(table.len(), 12);
        let row = &table.rows_where("cs", "ActualBestMem")[0];
        assert_eq!(row.number("sizeUsedByte").unwrap(), 1024.0 + 8192.0);
        assert_eq!(row.text("ps").unwrap(), "AVX-512");
    }

    #[test]
    fn test_negative_value_count_fails() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = inputs(dir.path(), &["1.1"], 1);
        for template in STRATEGY_TEMPLATES {
            let cs = strategy_name(template, Objective::Mem);
            write(
                &inputs.footprint_path(&cs, "1.1"),
                "colName\tformat\tbw\tcountValues\tsizeUsedByte\n\
                 lo_quantity\tstatic_vbp\t8\t-1024\t\n",
            );
        }

        assert!(matches!(
            load_footprints_morphstore(&inputs),
            Err(LoadError::NotAnIndex { .. })
        ));
    }

    #[test]
    fn test_missing_runtime_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = inputs(dir.path(), &["1.1"], 1);
        assert!(matches!(
            load_runtimes_morphstore(&inputs),
            Err(LoadError::Read { .. })
        ));
    }
}
