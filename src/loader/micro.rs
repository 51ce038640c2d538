//! Loaders for the micro benchmark experiments.
//!
//! Three experiments are covered: the comparison of operator classes, a
//! single on-the-fly de/re-compression operator, and a simple query. Each
//! loader returns repetitions averaged per configuration.

use super::{index_value, load_repetitions, map_category, TsvSource};
use crate::analysis::{self, units};
use crate::error::LoadError;
use crate::models::{Record, Table, Value};
use std::path::{Path, PathBuf};

pub const VARIANT_UNCOMPRESSED: &str = "uncompressed operator\nuncompressed data";
pub const VARIANT_OTF_DRC: &str = "on-the-fly de/re-compression\nStatic BP (3-bit)";
pub const VARIANT_SPECIALIZED: &str = "BW/H (specialized operator)\nStatic BP (4-bit)";
pub const VARIANT_OTF_MORPHING: &str = "on-the-fly morphing + BW/H\nStatic BP (3-bit)";

/// Display order of the operator classes.
pub const VARIANT_ORDER: [&str; 4] = [
    VARIANT_UNCOMPRESSED,
    VARIANT_OTF_DRC,
    VARIANT_SPECIALIZED,
    VARIANT_OTF_MORPHING,
];

const OPERATOR_CLASSES: [(&str, &str); 4] = [
    ("uncompressed", VARIANT_UNCOMPRESSED),
    ("otf de/re-compression", VARIANT_OTF_DRC),
    ("specialized", VARIANT_SPECIALIZED),
    ("otf morphing", VARIANT_OTF_MORPHING),
];

const OPERATOR_CLASS_KEY: [&str; 5] = [
    "vector_extension",
    "operator_class",
    "operator_class_long",
    "in_data_f",
    "sel",
];

const SINGLE_OP_KEY: [&str; 6] = [
    "vector_extension",
    "out_pos_f",
    "in_data_f",
    "datasetIdx",
    "sel",
    "col",
];

const SIMPLE_QUERY_KEY: [&str; 8] = [
    "vector_extension",
    "in_data_x_f",
    "in_data_y_f",
    "mid_pos_xc_f",
    "mid_data_yc_f",
    "settingIdx",
    "case",
    "fmts",
];

/// Input columns of the simple query whose footprints are stacked.
pub const SIMPLE_QUERY_COLUMNS: [&str; 4] = ["inDataX", "inDataY", "midPosXC", "midDataYC"];

/// Operators of the simple query whose runtimes are stacked.
pub const SIMPLE_QUERY_OPERATORS: [&str; 3] = ["select", "project", "agg_sum"];

/// Format combinations of the simple query in display order.
pub const SIMPLE_QUERY_FORMATS: [&str; 5] = [
    "un un un un",
    "st st un un",
    "st st st st",
    "st st de de",
    "st st fo fo",
];

/// Placeholder label of the dataset slot that is not evaluated.
const UNUSED_COLUMN: &str = "(not used)";

const DATASET_COLUMNS: [(&str, &str); 6] = [
    ("0", "C1"),
    ("1", "C2"),
    ("2", "C3"),
    ("3", UNUSED_COLUMN),
    ("4", "C4"),
    ("5", "C5"),
];

const SETTING_CASES: [(&str, &str); 3] = [
    ("2", "case 1\nX=C1\nY=C1"),
    ("3", "case 2\nX=C1\nY=C4"),
    ("4", "case 3\nX=C2\nY=C3"),
];

/// Size in GiB of the 512 Mi input values in the given data format.
pub fn input_size_gib(format: &str) -> Result<f64, LoadError> {
    const COUNT_VALUES: f64 = 512.0 * 1024.0 * 1024.0;

    let bytes = if format == "uncompr_f" {
        COUNT_VALUES * 8.0
    } else if format.starts_with("static_vbp_f<vbp_l<4, ") {
        COUNT_VALUES * 4.0 / 8.0
    } else if format.starts_with("static_vbp_f<vbp_l<3, ") {
        COUNT_VALUES * 3.0 / 8.0
    } else {
        return Err(LoadError::UnknownFormat(format.to_string()));
    };

    Ok(units::bytes_to_gib(bytes))
}

/// Classify a single-operator configuration by which sides are compressed.
pub fn classify(out_pos_f: &str, in_data_f: &str) -> &'static str {
    match (out_pos_f == "uncompr_f", in_data_f == "uncompr_f") {
        (true, true) => "alluncompr",
        (true, false) => "outuncompr",
        _ => "outcompr",
    }
}

/// Short tag of a format combination: first two characters of each format.
pub fn format_combination(formats: &[&str]) -> String {
    formats
        .iter()
        .map(|f| f.chars().take(2).collect::<String>())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Selectivity encoded by the dataset index.
pub fn dataset_selectivity(dataset_idx: i64) -> f64 {
    if dataset_idx <= 6 {
        0.01
    } else {
        0.9
    }
}

/// Input column label encoded by the dataset index.
pub fn dataset_column(dataset_idx: i64) -> Result<Value, LoadError> {
    let slot = (dataset_idx - 1).rem_euclid(6).to_string();
    map_category("datasetIdx", &slot, &DATASET_COLUMNS)
}

/// Directory holding the micro benchmark artifacts below the artifacts root.
pub fn micro_dir(artifacts: &Path) -> PathBuf {
    artifacts.join("microbenchmarks")
}

/// Load the operator-class experiment (`example_{rep}.csv`).
///
/// Scalar runs are excluded. The result holds `runtime [ms]` and
/// `input size [MiB]` per configuration.
pub fn load_operator_classes(
    dir: &Path,
    repetitions: usize,
    source: &TsvSource,
) -> Result<Table, LoadError> {
    let combined = load_repetitions(dir, "example", repetitions, source, |mut table| {
        table.retain(|r| {
            r.text("vector_extension")
                .map(|ext| ext != "ps_scalar")
                .map_err(LoadError::from)
        })?;
        table.derive("operator_class_long", |r| {
            map_category("operator_class", &r.text("operator_class")?, &OPERATOR_CLASSES)
        })?;
        Ok(table)
    })?;

    let mut table = analysis::group_mean(&combined, &OPERATOR_CLASS_KEY)?;
    units::convert_column(&mut table, "runtime:µs", "runtime [ms]", units::micros_to_millis)?;
    table.derive("input size [MiB]", |r: &Record| {
        let gib = input_size_gib(&r.text("in_data_f")?)?;
        Ok::<_, LoadError>(Value::Number(gib * 1024.0))
    })?;

    Ok(table)
}

/// Load the single-operator experiment (`singleop_{rep}.csv`).
///
/// Dataset indices are decoded into selectivity and input column; the slot
/// without an evaluated column is dropped.
pub fn load_single_op(dir: &Path, repetitions: usize, source: &TsvSource) -> Result<Table, LoadError> {
    let combined = load_repetitions(dir, "singleop", repetitions, source, |mut table| {
        table.derive("sel", |r| {
            index_value(r, "datasetIdx").map(|idx| Value::Number(dataset_selectivity(idx)))
        })?;
        table.derive("col", |r| dataset_column(index_value(r, "datasetIdx")?))?;
        table.retain(|r| r.text("col").map(|col| col != UNUSED_COLUMN))?;
        Ok(table)
    })?;

    let mut table = analysis::group_mean(&combined, &SINGLE_OP_KEY)?;
    units::convert_column(
        &mut table,
        "runtime select:µs",
        "runtime [ms]",
        units::micros_to_millis,
    )?;
    table.derive("class", |r| {
        let class = classify(&r.text("out_pos_f")?, &r.text("in_data_f")?);
        Ok::<_, LoadError>(Value::from(class))
    })?;

    Ok(table)
}

/// Load the simple-query experiment (`simplequery_{rep}.csv`).
///
/// The warm-up setting is discarded. Footprints are converted to GiB and
/// operator runtimes to seconds.
pub fn load_simple_query(
    dir: &Path,
    repetitions: usize,
    source: &TsvSource,
) -> Result<Table, LoadError> {
    let combined = load_repetitions(dir, "simplequery", repetitions, source, |mut table| {
        table.retain(|r| r.number("settingIdx").map(|idx| idx > 1.0))?;
        table.derive("case", |r| {
            let setting = index_value(r, "settingIdx")?.to_string();
            map_category("settingIdx", &setting, &SETTING_CASES)
        })?;
        table.derive("fmts", |r| {
            let formats = [
                r.text("in_data_x_f")?,
                r.text("in_data_y_f")?,
                r.text("mid_pos_xc_f")?,
                r.text("mid_data_yc_f")?,
            ];
            let formats: Vec<&str> = formats.iter().map(String::as_str).collect();
            Ok::<_, LoadError>(Value::from(format_combination(&formats)))
        })?;
        Ok(table)
    })?;

    let mut table = analysis::group_mean(&combined, &SIMPLE_QUERY_KEY)?;
    for column in SIMPLE_QUERY_COLUMNS {
        units::convert_column(
            &mut table,
            &format!("{}_sizeUsedByte", column),
            &format!("{} [GiB]", column),
            units::bytes_to_gib,
        )?;
    }
    for operator in SIMPLE_QUERY_OPERATORS {
        units::convert_column(
            &mut table,
            &format!("runtime {}:µs", operator),
            &format!("{} [s]", operator),
            units::micros_to_secs,
        )?;
    }

    Ok(table)
}
