//! Figures of the Star Schema Benchmark evaluation (figures 1 and 7 to 10).

use super::{with_rect_legend, NamedTable, Palette};
use crate::analysis::AVERAGE_LABEL;
use crate::error::{LoadError, RenderError};
use crate::loader::ssb::{
    self, strategy_name, Objective, SsbInputs, MONETDB_INT_TYPES, UNCOMPR_SCALAR,
};
use crate::models::{ProcessingStyle, Table, Value};
use crate::report::{levels, BarChart, Chart, Figure, Level, Panel, Rgb, Series};
use tracing::debug;

pub const FIGURE_TEASER: &str = "figure01_teaser";
pub const FIGURE_FORMATS: &str = "figure07_ssb_formats";
pub const FIGURE_BASE_VS_INTERM: &str = "figure08_ssb_base_vs_interm";
pub const FIGURE_VS_MONETDB: &str = "figure09_morphstore_vs_monetdb";
pub const FIGURE_OPT: &str = "figure10_opt";

const TEASER_LABELS: [&str; 3] = [
    "No\ncompression\nat all",
    "Established\nbase data\ncompression",
    "Our novel\ncontinuous\ncompression",
];

/// Column-store strategies compared against the reference DBMS.
const MONETDB_COMPARISON: [&str; 4] = [
    "ActualBestPerf",
    "Uncompr",
    UNCOMPR_SCALAR,
    "ActualBestBasePerf",
];

/// Which systems to include.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SsbSelection {
    pub morphstore: bool,
    pub monetdb: bool,
}

impl Default for SsbSelection {
    fn default() -> Self {
        Self {
            morphstore: true,
            monetdb: true,
        }
    }
}

/// Aggregated SSB tables of the selected systems.
#[derive(Debug, Clone, Default)]
pub struct SsbTables {
    pub footprints: Option<Table>,
    pub runtimes: Option<Table>,
    /// Reference DBMS runtimes per integer type.
    pub monetdb: Vec<(String, Table)>,
}

impl SsbTables {
    pub fn load(inputs: &SsbInputs, selection: SsbSelection) -> Result<Self, LoadError> {
        let mut tables = Self::default();

        if selection.morphstore {
            tables.footprints = Some(ssb::load_footprints_morphstore(inputs)?);
            tables.runtimes = Some(ssb::load_runtimes_morphstore(inputs)?);
        }
        if selection.monetdb {
            for int_type in MONETDB_INT_TYPES {
                let table = ssb::load_runtimes_monetdb(inputs, int_type)?;
                tables.monetdb.push((int_type.to_string(), table));
            }
        }

        Ok(tables)
    }

    /// Loaded tables under their dump names.
    pub fn named(&self) -> Vec<NamedTable> {
        let mut named = Vec::new();
        if let Some(table) = &self.footprints {
            named.push(NamedTable::new("footprints_morphstore", table.clone()));
        }
        if let Some(table) = &self.runtimes {
            named.push(NamedTable::new("runtimes_morphstore", table.clone()));
        }
        for (int_type, table) in &self.monetdb {
            named.push(NamedTable::new(
                format!("runtimes_monetdb_{}", int_type.to_lowercase()),
                table.clone(),
            ));
        }
        named
    }

    /// All figures that can be drawn from the loaded tables.
    pub fn figures(&self, settings: &SsbSettings, palette: &Palette) -> Result<Vec<Figure>, RenderError> {
        let mut figures = Vec::new();

        if let (Some(footprints), Some(runtimes)) = (&self.footprints, &self.runtimes) {
            let rows = [
                StrategyRow::memory(footprints),
                StrategyRow::runtime(runtimes),
            ];

            figures.push(teaser(footprints, runtimes, palette)?);
            figures.extend(strategy_figure(
                FIGURE_FORMATS,
                settings,
                &rows,
                &[
                    ("ActualWorst{obj}", "worst combination", palette.red),
                    ("Uncompr", "uncompressed", palette.gray),
                    ("StaticBP32", "Static-BP-32", palette.blue),
                    ("ActualBest{obj}", "best combination", palette.green),
                ],
            )?);
            figures.extend(strategy_figure(
                FIGURE_BASE_VS_INTERM,
                settings,
                &rows,
                &[
                    ("Uncompr", "uncompressed", palette.gray),
                    ("ActualBestBase{obj}", "+ compressed base columns", palette.cyan),
                    ("ActualBest{obj}", "+ compressed intermediates", palette.yellow),
                ],
            )?);
            figures.extend(strategy_figure(
                FIGURE_OPT,
                settings,
                &rows,
                &[
                    ("ActualWorst{obj}", "worst combination", palette.red),
                    ("Uncompr", "uncompressed", palette.gray),
                    ("CostBasedBest{obj}", "cost-based", palette.yellow),
                    ("ActualBest{obj}", "best combination", palette.green),
                ],
            )?);
        }

        if self.runtimes.is_some() || !self.monetdb.is_empty() {
            figures.extend(morphstore_vs_monetdb(
                self.runtimes.as_ref(),
                &self.monetdb,
                settings,
                palette,
            )?);
        }

        Ok(figures)
    }
}

/// Run parameters shown in titles and labels.
#[derive(Debug, Clone)]
pub struct SsbSettings {
    pub scale_factor: u32,
    pub processing_style: ProcessingStyle,
    pub queries: Vec<String>,
}

impl SsbSettings {
    /// Query axis: the selected queries followed by the average.
    fn query_levels(&self) -> Vec<Level> {
        let mut queries = levels(&self.queries);
        queries.push(Level::new(AVERAGE_LABEL));
        queries
    }
}

/// One row of a strategy comparison: a table, its value column and title.
struct StrategyRow<'a> {
    objective: Objective,
    table: &'a Table,
    column: &'static str,
    title: &'static str,
}

impl<'a> StrategyRow<'a> {
    fn memory(table: &'a Table) -> Self {
        Self {
            objective: Objective::Mem,
            table,
            column: "footprint [GiB]",
            title: "total memory footprint [GiB]",
        }
    }

    fn runtime(table: &'a Table) -> Self {
        Self {
            objective: Objective::Perf,
            table,
            column: "runtime [s]",
            title: "total runtime [s]",
        }
    }
}

fn letter(index: usize) -> char {
    (b'a' + index as u8) as char
}

fn stacked_size(rows: usize, height: u32) -> (u32, u32) {
    (1000, height * rows.max(1) as u32)
}

/// Grouped bars per query, one row per objective, hue by strategy.
fn strategy_figure(
    name: &str,
    settings: &SsbSettings,
    rows: &[StrategyRow<'_>],
    strategies: &[(&str, &str, Rgb)],
) -> Result<Vec<Figure>, RenderError> {
    let mut figure = Figure::new(name, stacked_size(rows.len(), 300), (rows.len(), 1));

    for (i, row) in rows.iter().enumerate() {
        let series: Vec<Series> = strategies
            .iter()
            .map(|(template, _, color)| Series::new(strategy_name(template, row.objective), *color))
            .collect();

        let bars = BarChart::grouped(
            row.table,
            ("query", settings.query_levels()),
            ("cs", &series),
            row.column,
        )?;
        figure = figure.panel(
            Panel::new(Chart::Bars(bars))
                .titled(format!(
                    "({}) {} @sf {}",
                    letter(i),
                    row.title,
                    settings.scale_factor
                ))
                .category_label("SSB query"),
        );
    }

    let labels: Vec<String> = strategies.iter().map(|(_, label, _)| label.to_string()).collect();
    let colors: Vec<Rgb> = strategies.iter().map(|(_, _, color)| *color).collect();
    Ok(with_rect_legend(figure, &labels, &colors))
}

fn averages(table: &Table) -> Result<Table, RenderError> {
    let rows = table.filtered(|r| r.text("query").map(|q| q == AVERAGE_LABEL))?;
    Ok(rows)
}

/// Figure 1: average footprint and runtime of three strategies.
pub fn teaser(footprints: &Table, runtimes: &Table, palette: &Palette) -> Result<Figure, RenderError> {
    let colors = [palette.gray, palette.cyan, palette.yellow];
    let categories = |objective: Objective| -> Vec<Level> {
        ["Uncompr", "ActualBestBase{obj}", "ActualBest{obj}"]
            .iter()
            .zip(TEASER_LABELS)
            .map(|(template, label)| Level::labelled(strategy_name(template, objective), label))
            .collect()
    };

    let memory = BarChart::simple(
        &averages(footprints)?,
        ("cs", categories(Objective::Mem)),
        &colors,
        "footprint [GiB]",
    )?
    .horizontal();
    let runtime = BarChart::simple(
        &averages(runtimes)?,
        ("cs", categories(Objective::Perf)),
        &colors,
        "runtime [s]",
    )?
    .horizontal()
    .without_category_labels();

    Ok(Figure::new(FIGURE_TEASER, (900, 400), (1, 2))
        .panel(Panel::new(Chart::Bars(memory)).value_label("footprint [GiB]"))
        .panel(Panel::new(Chart::Bars(runtime)).value_label("runtime [s]")))
}

/// Figure 9: runtimes of the column store against the reference DBMS.
pub fn morphstore_vs_monetdb(
    runtimes: Option<&Table>,
    monetdb: &[(String, Table)],
    settings: &SsbSettings,
    palette: &Palette,
) -> Result<Vec<Figure>, RenderError> {
    let ps = settings.processing_style.display_name();
    let mut candidates = Table::new();
    let mut strategies: Vec<(String, String, Rgb)> = Vec::new();

    if let Some(runtimes) = runtimes {
        let mut rows = runtimes.filtered(|r| {
            r.text("cs")
                .map(|cs| MONETDB_COMPARISON.contains(&cs.as_str()))
        })?;
        rows.derive("candidate", |r| {
            Ok::<_, RenderError>(Value::from(format!(
                "MorphStore {} {}",
                r.text("ps")?,
                r.text("cs")?
            )))
        })?;
        candidates.extend(rows.select(&["query", "candidate", "runtime [s]"]));

        strategies.extend([
            (
                "MorphStore scalar UncomprScalar".to_string(),
                "MorphStore\nscalar\nuncompr.".to_string(),
                palette.yellow,
            ),
            (
                format!("MorphStore {} Uncompr", ps),
                format!("MorphStore\n{}\nuncompr.", ps),
                palette.orange,
            ),
            (
                format!("MorphStore {} ActualBestPerf", ps),
                format!("MorphStore\n{}\ncontinuous compr.", ps),
                palette.red,
            ),
        ]);
    }

    if !monetdb.is_empty() {
        for (int_type, table) in monetdb {
            let mut rows = table.clone();
            rows.set_all("candidate", format!("MonetDB scalar {}", int_type));
            candidates.extend(rows.select(&["query", "candidate", "runtime [s]"]));
        }

        strategies.insert(
            0,
            (
                "MonetDB scalar BIGINT".to_string(),
                "MonetDB\nscalar\nuncompr.".to_string(),
                palette.cyan,
            ),
        );
        strategies.push((
            "MonetDB scalar tight".to_string(),
            "MonetDB\nscalar\nnarrow types".to_string(),
            palette.blue,
        ));
    }

    debug!("Comparing {} candidates", strategies.len());

    let series: Vec<Series> = strategies
        .iter()
        .map(|(candidate, _, color)| Series::new(candidate.clone(), *color))
        .collect();
    let bars = BarChart::grouped(
        &candidates,
        ("query", settings.query_levels()),
        ("candidate", &series),
        "runtime [s]",
    )?;

    let figure = Figure::new(FIGURE_VS_MONETDB, (1000, 309), (1, 1)).panel(
        Panel::new(Chart::Bars(bars))
            .titled(format!("total runtime [s] @sf {}", settings.scale_factor))
            .category_label("SSB query"),
    );

    let labels: Vec<String> = strategies.iter().map(|(_, label, _)| label.clone()).collect();
    let colors: Vec<Rgb> = strategies.iter().map(|(_, _, color)| *color).collect();
    Ok(with_rect_legend(figure, &labels, &colors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::ssb::STRATEGY_TEMPLATES;
    use crate::models::Record;

    fn settings() -> SsbSettings {
        SsbSettings {
            scale_factor: 1,
            processing_style: ProcessingStyle::Vec512,
            queries: vec!["1.1".to_string()],
        }
    }

    fn strategy_table(objective: Objective, column: &str, ps: &str) -> Table {
        let mut table = Table::new();
        let mut strategies: Vec<String> = STRATEGY_TEMPLATES
            .iter()
            .map(|t| strategy_name(t, objective))
            .collect();
        if objective == Objective::Perf {
            strategies.push(UNCOMPR_SCALAR.to_string());
        }

        for (i, cs) in strategies.iter().enumerate() {
            for query in ["1.1", AVERAGE_LABEL] {
                let ps = if cs == UNCOMPR_SCALAR { "scalar" } else { ps };
                table.push(
                    Record::new()
                        .with("query", query)
                        .with("ps", ps)
                        .with("cs", cs.as_str())
                        .with(column, (i + 1) as f64),
                );
            }
        }
        table
    }

    fn monetdb_table(runtime: f64) -> Table {
        let mut table = Table::new();
        for query in ["1.1", AVERAGE_LABEL] {
            table.push(
                Record::new()
                    .with("query", query)
                    .with("ps", "scalar")
                    .with("cs", "BIGINT")
                    .with("runtime [s]", runtime),
            );
        }
        table
    }

    fn all_tables() -> SsbTables {
        SsbTables {
            footprints: Some(strategy_table(Objective::Mem, "footprint [GiB]", "AVX-512")),
            runtimes: Some(strategy_table(Objective::Perf, "runtime [s]", "AVX-512")),
            monetdb: vec![
                ("BIGINT".to_string(), monetdb_table(2.0)),
                ("tight".to_string(), monetdb_table(1.0)),
            ],
        }
    }

    #[test]
    fn test_all_figures() {
        let figures = all_tables().figures(&settings(), &Palette::default()).unwrap();
        let names: Vec<&str> = figures.iter().map(|f| f.name.as_str()).collect();

        assert_eq!(
            names,
            vec![
                FIGURE_TEASER,
                FIGURE_FORMATS,
                "figure07_ssb_formats_legend",
                FIGURE_BASE_VS_INTERM,
                "figure08_ssb_base_vs_interm_legend",
                FIGURE_OPT,
                "figure10_opt_legend",
                FIGURE_VS_MONETDB,
                "figure09_morphstore_vs_monetdb_legend",
            ]
        );
    }

    #[test]
    fn test_strategy_rows() {
        let tables = all_tables();
        let figures = tables.figures(&settings(), &Palette::default()).unwrap();
        let formats = &figures[1];

        assert_eq!(formats.grid, (2, 1));
        assert_eq!(
            formats.panels[0].title.as_deref(),
            Some("(a) total memory footprint [GiB] @sf 1")
        );
        assert_eq!(formats.panels[1].title.as_deref(), Some("(b) total runtime [s] @sf 1"));

        let Chart::Bars(bars) = &formats.panels[1].chart else {
            panic!("expected bars");
        };
        // query axis ends with the average
        assert_eq!(bars.categories.last().unwrap().value, AVERAGE_LABEL);
        // "ActualWorstPerf" is the third strategy template
        assert_eq!(bars.values[0], vec![Some(3.0), Some(3.0)]);
    }

    #[test]
    fn test_monetdb_comparison_order() {
        let tables = all_tables();
        let figures = morphstore_vs_monetdb(
            tables.runtimes.as_ref(),
            &tables.monetdb,
            &settings(),
            &Palette::default(),
        )
        .unwrap();

        let Chart::Bars(bars) = &figures[0].panels[0].chart else {
            panic!("expected bars");
        };
        let order: Vec<&str> = bars.series.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(
            order,
            vec![
                "MonetDB scalar BIGINT",
                "MorphStore scalar UncomprScalar",
                "MorphStore AVX-512 Uncompr",
                "MorphStore AVX-512 ActualBestPerf",
                "MonetDB scalar tight",
            ]
        );
        assert_eq!(bars.values[4][0], Some(1.0));
        assert_eq!(
            figures[0].panels[0].title.as_deref(),
            Some("total runtime [s] @sf 1")
        );
    }

    #[test]
    fn test_monetdb_only() {
        let tables = SsbTables {
            monetdb: vec![("BIGINT".to_string(), monetdb_table(2.0))],
            ..Default::default()
        };

        let figures = tables.figures(&settings(), &Palette::default()).unwrap();
        assert_eq!(figures.len(), 2);
        assert_eq!(figures[0].name, FIGURE_VS_MONETDB);
    }

    #[test]
    fn test_teaser_uses_averages() {
        let tables = all_tables();
        let figure = teaser(
            tables.footprints.as_ref().unwrap(),
            tables.runtimes.as_ref().unwrap(),
            &Palette::default(),
        )
        .unwrap();

        let Chart::Bars(memory) = &figure.panels[0].chart else {
            panic!("expected bars");
        };
        assert_eq!(memory.categories[2].label, "Our novel\ncontinuous\ncompression");
        // ActualBestMem is the fourth template
        assert_eq!(memory.values[2][2], Some(4.0));
    }

    #[test]
    fn test_named_tables() {
        let names: Vec<String> = all_tables().named().into_iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec![
                "footprints_morphstore",
                "runtimes_morphstore",
                "runtimes_monetdb_bigint",
                "runtimes_monetdb_tight",
            ]
        );
    }
}
