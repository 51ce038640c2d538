//! Figures of the micro benchmarks (figures 4 to 6).

use super::{NamedTable, Palette};
use crate::analysis;
use crate::error::{LoadError, RenderError};
use crate::loader::micro::{
    self, SIMPLE_QUERY_COLUMNS, SIMPLE_QUERY_FORMATS, SIMPLE_QUERY_OPERATORS, VARIANT_ORDER,
    VARIANT_OTF_DRC, VARIANT_OTF_MORPHING, VARIANT_SPECIALIZED, VARIANT_UNCOMPRESSED,
};
use crate::loader::TsvSource;
use crate::models::Table;
use crate::report::{
    levels, BarChart, Chart, Component, Figure, Hatch, Legend, Marker, Panel, Rgb, Series,
    StackedBarChart, SwarmChart,
};
use std::path::Path;
use tracing::info;

pub const FIGURE_OPERATOR_CLASSES: &str = "figure4_example";
pub const FIGURE_SINGLE_OP: &str = "figure5_singleop";
pub const FIGURE_SIMPLE_QUERY: &str = "figure6_simplequery";

/// Selectivity shown in the operator-class figure.
pub const OPERATOR_CLASS_SELECTIVITY: f64 = 1e-4;

/// Selectivities of the two single-operator panels.
pub const SINGLE_OP_SELECTIVITIES: [f64; 2] = [0.01, 0.9];

const RUNTIME_CAP_MS: f64 = 75.0;
const FOOTPRINT_CAP_MIB: f64 = 512.0;

const CLASS_ORDER: [&str; 3] = ["alluncompr", "outuncompr", "outcompr"];
const CLASS_LABELS: [&str; 3] = [
    "uncompressed",
    "only input compressed",
    "input and output compressed",
];

const FORMAT_LABELS: [&str; 5] = [
    "uncompr.\nuncompr.",
    "uncompr.\nstatic BP",
    "static BP\nstatic BP",
    "DELTA + SIMD-BP\nstatic BP",
    "FOR + SIMD-BP\nstatic BP",
];

/// Which micro benchmark experiments to process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MicroSelection {
    pub operator_classes: bool,
    pub single_op: bool,
    pub simple_query: bool,
}

impl Default for MicroSelection {
    fn default() -> Self {
        Self {
            operator_classes: true,
            single_op: true,
            simple_query: true,
        }
    }
}

/// Aggregated tables of the selected micro benchmark experiments.
#[derive(Debug, Clone, Default)]
pub struct MicroTables {
    pub operator_classes: Option<Table>,
    pub single_op: Option<Table>,
    pub simple_query: Option<Table>,
}

impl MicroTables {
    pub fn load(
        dir: &Path,
        repetitions: usize,
        source: &TsvSource,
        selection: MicroSelection,
    ) -> Result<Self, LoadError> {
        let mut tables = Self::default();

        if selection.operator_classes {
            tables.operator_classes = Some(micro::load_operator_classes(dir, repetitions, source)?);
        }
        if selection.single_op {
            tables.single_op = Some(micro::load_single_op(dir, repetitions, source)?);
        }
        if selection.simple_query {
            tables.simple_query = Some(micro::load_simple_query(dir, repetitions, source)?);
        }

        Ok(tables)
    }

    /// Loaded tables under their dump names.
    pub fn named(&self) -> Vec<NamedTable> {
        [
            ("operator_classes", &self.operator_classes),
            ("single_op", &self.single_op),
            ("simple_query", &self.simple_query),
        ]
        .into_iter()
        .filter_map(|(name, table)| table.as_ref().map(|t| NamedTable::new(name, t.clone())))
        .collect()
    }

    /// All figures that can be drawn from the loaded tables.
    pub fn figures(&self, palette: &Palette) -> Result<Vec<Figure>, RenderError> {
        let mut figures = Vec::new();

        if let Some(table) = &self.operator_classes {
            figures.extend(operator_classes(table, palette)?);
        }
        if let Some(table) = &self.single_op {
            figures.extend(single_op(table)?);
        }
        if let Some(table) = &self.simple_query {
            figures.extend(simple_query(table, palette)?);
        }

        Ok(figures)
    }
}

fn letter(index: usize) -> char {
    (b'a' + index as u8) as char
}

fn with_selectivity(table: &Table, selectivity: f64) -> Result<Table, RenderError> {
    let tolerance = selectivity * 1e-6;
    let rows = table.filtered(|r| r.number("sel").map(|s| (s - selectivity).abs() <= tolerance))?;
    Ok(rows)
}

fn sorted_levels(table: &Table, column: &str) -> Vec<String> {
    table.distinct(column).iter().map(|v| v.to_string()).collect()
}

/// Runtime ratios between the operator classes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadlineRatios {
    /// On-the-fly de/re-compression over uncompressed processing.
    pub otf_drc_speedup: f64,
    /// Specialized operator over on-the-fly de/re-compression.
    pub specialized_speedup: f64,
    /// On-the-fly morphing compared to the specialized operator.
    pub morphing_slowdown: f64,
}

/// Compute the ratios from a table with one row per operator class.
pub fn headline_ratios(per_class: &Table) -> Option<HeadlineRatios> {
    let runtime = |variant: &str| {
        per_class
            .rows_where("operator_class_long", variant)
            .first()
            .and_then(|r| r.number("runtime [ms]").ok())
    };

    let uncompressed = runtime(VARIANT_UNCOMPRESSED)?;
    let otf_drc = runtime(VARIANT_OTF_DRC)?;
    let specialized = runtime(VARIANT_SPECIALIZED)?;
    let morphing = runtime(VARIANT_OTF_MORPHING)?;

    Some(HeadlineRatios {
        otf_drc_speedup: uncompressed / otf_drc,
        specialized_speedup: otf_drc / specialized,
        morphing_slowdown: morphing / specialized,
    })
}

/// Figure 4: runtime and input size per operator class.
pub fn operator_classes(table: &Table, palette: &Palette) -> Result<Vec<Figure>, RenderError> {
    let selected = with_selectivity(table, OPERATOR_CLASS_SELECTIVITY)?;
    let per_class = analysis::group_mean(&selected, &["operator_class_long"])?;

    if let Some(ratios) = headline_ratios(&per_class) {
        info!(
            "speedup on-the-fly de/re-compression vs. uncompressed: {:.2}",
            ratios.otf_drc_speedup
        );
        info!(
            "speedup specialized vs. on-the-fly de/re-compression: {:.2}",
            ratios.specialized_speedup
        );
        info!(
            "slowdown on-the-fly morphing vs. specialized: {:.2}",
            ratios.morphing_slowdown
        );
    }

    let colors = [palette.blue, palette.orange, palette.green, palette.red];
    let runtime = BarChart::simple(
        &per_class,
        ("operator_class_long", levels(&VARIANT_ORDER)),
        &colors,
        "runtime [ms]",
    )?
    .horizontal()
    .capped(RUNTIME_CAP_MS, "ms");
    let footprint = BarChart::simple(
        &per_class,
        ("operator_class_long", levels(&VARIANT_ORDER)),
        &colors,
        "input size [MiB]",
    )?
    .horizontal()
    .capped(FOOTPRINT_CAP_MIB, "MiB")
    .without_category_labels();

    let figure = Figure::new(FIGURE_OPERATOR_CLASSES, (1100, 420), (1, 2))
        .panel(Panel::new(Chart::Bars(runtime)).value_label("runtime [ms]"))
        .panel(Panel::new(Chart::Bars(footprint)).value_label("input size [MiB]"));

    Ok(vec![figure])
}

/// Figure 5: runtime of the single operator per input column and class.
pub fn single_op(table: &Table) -> Result<Vec<Figure>, RenderError> {
    let colors = [Rgb::RED, Rgb::BLUE, Rgb::SILVER];
    let hue: Vec<Series> = CLASS_ORDER
        .iter()
        .zip(colors)
        .map(|(class, color)| Series::new(*class, color))
        .collect();

    let mut figure = Figure::new(FIGURE_SINGLE_OP, (1000, 400), (1, 2));
    for (i, selectivity) in SINGLE_OP_SELECTIVITIES.into_iter().enumerate() {
        let rows = with_selectivity(table, selectivity)?;
        let columns = sorted_levels(&rows, "col");

        let swarm = SwarmChart::build(&rows, ("col", levels(&columns)), ("class", &hue), "runtime [ms]")?
            .with_floor(0.0);
        let mut panel = Panel::new(Chart::Swarm(swarm))
            .titled(format!("({}) {:.0}% selectivity", letter(i), selectivity * 100.0))
            .category_label("input column");
        if i == 0 {
            panel = panel.value_label("runtime [ms]");
        }
        figure = figure.panel(panel);
    }

    let legend = Figure::legend(
        FIGURE_SINGLE_OP,
        Legend::swatches(&CLASS_LABELS, &colors, Marker::Circle),
    );
    Ok(vec![figure, legend])
}

fn stacked_panel(
    table: &Table,
    series: &[Series],
    parts: &[(&str, &str)],
    suffix: &str,
    legend_title: &str,
) -> Result<StackedBarChart, RenderError> {
    let cases = sorted_levels(table, "case");
    let components = parts
        .iter()
        .zip(Hatch::STACK)
        .map(|((column, label), hatch)| Component {
            column: format!("{}{}", column, suffix),
            label: label.to_string(),
            hatch,
        })
        .collect();

    StackedBarChart::build(table, ("case", levels(&cases)), ("fmts", series), components, legend_title)
}

/// Figure 6: stacked footprints and runtimes of the simple query.
pub fn simple_query(table: &Table, palette: &Palette) -> Result<Vec<Figure>, RenderError> {
    let per_cell = analysis::group_mean(table, &["case", "fmts"])?;
    let series: Vec<Series> = SIMPLE_QUERY_FORMATS
        .iter()
        .zip(&palette.simple_query)
        .map(|(fmts, color)| Series::new(*fmts, *color))
        .collect();

    let column_labels = ["X", "Y", "X'", "Y'"];
    let columns: Vec<(&str, &str)> = SIMPLE_QUERY_COLUMNS.into_iter().zip(column_labels).collect();
    let operator_labels = ["select", "project", "sum"];
    let operators: Vec<(&str, &str)> = SIMPLE_QUERY_OPERATORS
        .into_iter()
        .zip(operator_labels)
        .collect();

    let footprint = stacked_panel(&per_cell, &series, &columns, " [GiB]", "column")?;
    let runtime = stacked_panel(&per_cell, &series, &operators, " [s]", "operator")?;

    let footprint_legend = Legend::components(&footprint);
    let runtime_legend = Legend::components(&runtime);
    let figure = Figure::new(FIGURE_SIMPLE_QUERY, (1100, 420), (1, 2))
        .panel(
            Panel::new(Chart::StackedBars(footprint))
                .titled("(a) memory footprint [GiB]")
                .with_legend(footprint_legend),
        )
        .panel(
            Panel::new(Chart::StackedBars(runtime))
                .titled("(b) runtime [s]")
                .with_legend(runtime_legend),
        );

    let legend = Figure::legend(
        FIGURE_SIMPLE_QUERY,
        Legend::swatches(&FORMAT_LABELS, &palette.simple_query, Marker::Rect),
    );
    Ok(vec![figure, legend])
}
