//! Declarative chart model.
//!
//! Figures are described as plain data first and drawn afterwards. The
//! builders in this module map aggregated tables onto bar heights, stacked
//! segments and swarm points; they look values up but never average them,
//! so every (category, hue) cell must correspond to at most one row.

use crate::error::RenderError;
use crate::models::Table;
use tracing::debug;

/// 24-bit color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    pub const WHITE: Rgb = Rgb(255, 255, 255);
    pub const RED: Rgb = Rgb(255, 0, 0);
    pub const BLUE: Rgb = Rgb(0, 0, 255);
    pub const SILVER: Rgb = Rgb(192, 192, 192);

    /// Parse `#rrggbb` or one of a few color names.
    pub fn parse(spec: &str) -> Result<Self, RenderError> {
        let invalid = || RenderError::InvalidColor(spec.to_string());

        match spec.trim().to_lowercase().as_str() {
            "black" => return Ok(Self::BLACK),
            "white" => return Ok(Self::WHITE),
            "red" => return Ok(Self::RED),
            "blue" => return Ok(Self::BLUE),
            "silver" => return Ok(Self::SILVER),
            _ => {}
        }

        let hex = spec.trim().strip_prefix('#').ok_or_else(invalid)?;
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        Ok(Rgb(channel(0)?, channel(2)?, channel(4)?))
    }
}

/// Direction in which bars grow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Vertical,
    Horizontal,
}

/// Fill pattern of a stacked segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hatch {
    None,
    Slash,
    Backslash,
    Dots,
}

impl Hatch {
    /// Patterns assigned to stacked components, base first.
    pub const STACK: [Hatch; 4] = [Hatch::Slash, Hatch::None, Hatch::Dots, Hatch::Backslash];
}

/// A labelled color, i.e. one hue level.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    pub color: Rgb,
}

impl Series {
    pub fn new(label: impl Into<String>, color: Rgb) -> Self {
        Self {
            label: label.into(),
            color,
        }
    }
}

/// A categorical level as it appears in the table and on the axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Level {
    /// Value of the category column.
    pub value: String,
    /// Axis label; lines are separated by `\n`.
    pub label: String,
}

impl Level {
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            label: value.clone(),
            value,
        }
    }

    pub fn labelled(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Build levels whose labels equal their values.
pub fn levels<S: AsRef<str>>(values: &[S]) -> Vec<Level> {
    values.iter().map(|v| Level::new(v.as_ref())).collect()
}

/// Grouped bars: one bar per (category, series) cell.
#[derive(Debug, Clone, PartialEq)]
pub struct BarChart {
    pub orientation: Orientation,
    pub categories: Vec<Level>,
    pub series: Vec<Series>,
    /// `values[series][category]`
    pub values: Vec<Vec<Option<f64>>>,
    /// Place the series of one category side by side (false: on top of each other).
    pub dodge: bool,
    /// Upper bound of the value axis; longer bars are cut and annotated.
    pub value_cap: Option<f64>,
    /// Unit printed in the annotation of cut bars.
    pub overflow_unit: Option<String>,
    pub show_category_labels: bool,
}

impl BarChart {
    /// Bars of `value` per `category` level, colored by the `hue` levels.
    pub fn grouped(
        table: &Table,
        category: (&str, Vec<Level>),
        hue: (&str, &[Series]),
        value: &str,
    ) -> Result<Self, RenderError> {
        let (category_column, categories) = category;
        let (hue_column, series) = hue;

        let values = series
            .iter()
            .map(|s| {
                categories
                    .iter()
                    .map(|c| {
                        lookup(
                            table,
                            value,
                            (category_column, &c.value),
                            Some((hue_column, &s.label)),
                        )
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            orientation: Orientation::Vertical,
            categories,
            series: series.to_vec(),
            values,
            dodge: true,
            value_cap: None,
            overflow_unit: None,
            show_category_labels: true,
        })
    }

    /// One bar per category, each in its own color.
    pub fn simple(
        table: &Table,
        category: (&str, Vec<Level>),
        colors: &[Rgb],
        value: &str,
    ) -> Result<Self, RenderError> {
        let (category_column, categories) = category;
        let mut series = Vec::with_capacity(categories.len());
        let mut values = Vec::with_capacity(categories.len());

        for (i, level) in categories.iter().enumerate() {
            let color = colors.get(i % colors.len().max(1)).copied().unwrap_or(Rgb::SILVER);
            series.push(Series::new(level.value.clone(), color));

            let mut row = vec![None; categories.len()];
            row[i] = lookup(table, value, (category_column, &level.value), None)?;
            values.push(row);
        }

        Ok(Self {
            orientation: Orientation::Vertical,
            categories,
            series,
            values,
            dodge: false,
            value_cap: None,
            overflow_unit: None,
            show_category_labels: true,
        })
    }

    pub fn horizontal(mut self) -> Self {
        self.orientation = Orientation::Horizontal;
        self
    }

    pub fn capped(mut self, cap: f64, unit: impl Into<String>) -> Self {
        self.value_cap = Some(cap);
        self.overflow_unit = Some(unit.into());
        self
    }

    pub fn without_category_labels(mut self) -> Self {
        self.show_category_labels = false;
        self
    }

    /// Largest bar value, ignoring empty cells.
    pub fn max_value(&self) -> Option<f64> {
        self.values
            .iter()
            .flatten()
            .flatten()
            .copied()
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))))
    }
}

/// One component of a stacked bar.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    /// Column holding the component's contribution.
    pub column: String,
    pub label: String,
    pub hatch: Hatch,
}

/// Stacked bars grouped by hue; each bar is split into components.
#[derive(Debug, Clone, PartialEq)]
pub struct StackedBarChart {
    pub categories: Vec<Level>,
    pub series: Vec<Series>,
    pub components: Vec<Component>,
    /// Cumulative tops: `stacked[component][series][category]`.
    pub stacked: Vec<Vec<Vec<Option<f64>>>>,
    /// Title of the component legend.
    pub legend_title: String,
}

/// Running totals of `values`, so that segment `i` spans `[out[i-1], out[i]]`.
pub fn cumulative_sums(values: &[f64]) -> Vec<f64> {
    values
        .iter()
        .scan(0.0, |total, v| {
            *total += v;
            Some(*total)
        })
        .collect()
}

impl StackedBarChart {
    /// Components with their cumulative tops, tallest first.
    ///
    /// Each segment is painted from zero over the taller ones, which leaves
    /// the first component at the base of the bar.
    pub fn paint_order(&self) -> impl Iterator<Item = (&Component, &[Vec<Option<f64>>])> + '_ {
        self.components
            .iter()
            .zip(self.stacked.iter().map(Vec::as_slice))
            .rev()
    }

    /// Stack `components` (base first) for every (category, hue) cell.
    pub fn build(
        table: &Table,
        category: (&str, Vec<Level>),
        hue: (&str, &[Series]),
        components: Vec<Component>,
        legend_title: impl Into<String>,
    ) -> Result<Self, RenderError> {
        let (category_column, categories) = category;
        let (hue_column, series) = hue;

        let mut stacked = vec![vec![vec![None; categories.len()]; series.len()]; components.len()];

        for (s, hue_level) in series.iter().enumerate() {
            for (c, level) in categories.iter().enumerate() {
                let mut parts = Vec::with_capacity(components.len());
                for component in &components {
                    parts.push(lookup(
                        table,
                        &component.column,
                        (category_column, &level.value),
                        Some((hue_column, &hue_level.label)),
                    )?);
                }

                // a cell is drawn only when every component is present
                let Some(parts) = parts.into_iter().collect::<Option<Vec<f64>>>() else {
                    continue;
                };
                for (k, top) in cumulative_sums(&parts).into_iter().enumerate() {
                    stacked[k][s][c] = Some(top);
                }
            }
        }

        Ok(Self {
            categories,
            series: series.to_vec(),
            components,
            stacked,
            legend_title: legend_title.into(),
        })
    }

    /// Total height of the tallest bar.
    pub fn max_value(&self) -> Option<f64> {
        self.stacked
            .last()
            .into_iter()
            .flatten()
            .flatten()
            .flatten()
            .copied()
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))))
    }
}

/// A single point of a swarm chart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwarmPoint {
    pub category: usize,
    pub series: usize,
    pub value: f64,
}

/// Point cloud per category, colored by hue.
#[derive(Debug, Clone, PartialEq)]
pub struct SwarmChart {
    pub categories: Vec<Level>,
    pub series: Vec<Series>,
    pub points: Vec<SwarmPoint>,
    /// Pin the lower end of the value axis.
    pub value_floor: Option<f64>,
}

impl SwarmChart {
    /// One point per row; rows outside the given levels are not drawn.
    pub fn build(
        table: &Table,
        category: (&str, Vec<Level>),
        hue: (&str, &[Series]),
        value: &str,
    ) -> Result<Self, RenderError> {
        let (category_column, categories) = category;
        let (hue_column, series) = hue;

        let mut points = Vec::new();
        for record in table.records() {
            let category_value = record.text(category_column)?;
            let hue_value = record.text(hue_column)?;

            let Some(c) = categories.iter().position(|l| l.value == category_value) else {
                debug!("Skipping point outside category order: {}", category_value);
                continue;
            };
            let Some(s) = series.iter().position(|l| l.label == hue_value) else {
                debug!("Skipping point outside hue order: {}", hue_value);
                continue;
            };

            points.push(SwarmPoint {
                category: c,
                series: s,
                value: record.number(value)?,
            });
        }

        Ok(Self {
            categories,
            series: series.to_vec(),
            points,
            value_floor: None,
        })
    }

    pub fn with_floor(mut self, floor: f64) -> Self {
        self.value_floor = Some(floor);
        self
    }
}

/// Horizontal offsets (in category units) that keep close points apart.
///
/// Points within `bin` of each other share a row and are spread
/// alternately right and left of the category center by `step`, never
/// further than `max_offset`.
pub fn swarm_offsets(values: &[f64], bin: f64, step: f64, max_offset: f64) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut offsets = vec![0.0; values.len()];
    let mut row_start: Option<f64> = None;
    let mut in_row = 0usize;

    for idx in order {
        let value = values[idx];
        match row_start {
            Some(start) if bin > 0.0 && value - start < bin => in_row += 1,
            _ => {
                row_start = Some(value);
                in_row = 0;
            }
        }

        // 0, +1, -1, +2, -2, ...
        let rank = ((in_row + 1) / 2) as f64;
        let sign = if in_row % 2 == 1 { 1.0 } else { -1.0 };
        offsets[idx] = (sign * rank * step).clamp(-max_offset, max_offset);
    }

    offsets
}

/// Marker shape of a legend entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Rect,
    Circle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub label: String,
    pub fill: Rgb,
    pub hatch: Hatch,
}

/// A legend, either stand-alone or attached to a panel.
#[derive(Debug, Clone, PartialEq)]
pub struct Legend {
    pub title: Option<String>,
    pub marker: Marker,
    pub entries: Vec<LegendEntry>,
}

impl Legend {
    /// Colored swatches, one per label.
    pub fn swatches<S: AsRef<str>>(labels: &[S], colors: &[Rgb], marker: Marker) -> Self {
        Self {
            title: None,
            marker,
            entries: labels
                .iter()
                .zip(colors)
                .map(|(label, color)| LegendEntry {
                    label: label.as_ref().to_string(),
                    fill: *color,
                    hatch: Hatch::None,
                })
                .collect(),
        }
    }

    /// White hatched swatches for the components of a stacked chart, top first.
    pub fn components(chart: &StackedBarChart) -> Self {
        Self {
            title: Some(chart.legend_title.clone()),
            marker: Marker::Rect,
            entries: chart
                .components
                .iter()
                .rev()
                .map(|c| LegendEntry {
                    label: c.label.clone(),
                    fill: Rgb::WHITE,
                    hatch: c.hatch,
                })
                .collect(),
        }
    }
}

/// Anything a panel can show.
#[derive(Debug, Clone, PartialEq)]
pub enum Chart {
    Bars(BarChart),
    StackedBars(StackedBarChart),
    Swarm(SwarmChart),
    Legend(Legend),
}

/// One sub-plot of a figure.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub title: Option<String>,
    pub category_label: Option<String>,
    pub value_label: Option<String>,
    pub chart: Chart,
    /// Legend drawn to the right of the plotting area.
    pub legend: Option<Legend>,
}

impl Panel {
    pub fn new(chart: Chart) -> Self {
        Self {
            title: None,
            category_label: None,
            value_label: None,
            chart,
            legend: None,
        }
    }

    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn category_label(mut self, label: impl Into<String>) -> Self {
        self.category_label = Some(label.into());
        self
    }

    pub fn value_label(mut self, label: impl Into<String>) -> Self {
        self.value_label = Some(label.into());
        self
    }

    pub fn with_legend(mut self, legend: Legend) -> Self {
        self.legend = Some(legend);
        self
    }
}

/// A complete image: a grid of panels saved under one name.
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub name: String,
    /// Width and height in pixels.
    pub size: (u32, u32),
    /// Rows and columns of the panel grid.
    pub grid: (usize, usize),
    pub panels: Vec<Panel>,
}

impl Figure {
    pub fn new(name: impl Into<String>, size: (u32, u32), grid: (usize, usize)) -> Self {
        Self {
            name: name.into(),
            size,
            grid,
            panels: Vec::new(),
        }
    }

    pub fn panel(mut self, panel: Panel) -> Self {
        self.panels.push(panel);
        self
    }

    /// A stand-alone legend saved as `{base}_legend`.
    pub fn legend(base: &str, legend: Legend) -> Self {
        let width = 40 + legend
            .entries
            .iter()
            .map(|e| legend_entry_width(&e.label))
            .sum::<u32>();
        let lines = legend
            .entries
            .iter()
            .map(|e| e.label.lines().count().max(1))
            .max()
            .unwrap_or(1) as u32;

        Figure::new(format!("{}_legend", base), (width, 24 + 18 * lines), (1, 1))
            .panel(Panel::new(Chart::Legend(legend)))
    }
}

/// Approximate pixel width of a legend entry (swatch, gap, text, spacing).
pub fn legend_entry_width(label: &str) -> u32 {
    let longest = label.lines().map(|l| l.chars().count()).max().unwrap_or(0) as u32;
    20 + 8 + longest * 8 + 16
}

/// Value of `column` for the single row matching `category` (and `hue`).
fn lookup(
    table: &Table,
    column: &str,
    category: (&str, &str),
    hue: Option<(&str, &str)>,
) -> Result<Option<f64>, RenderError> {
    let mut matching = table.rows_where(category.0, category.1).into_iter();
    let mut selected = None;

    for record in matching.by_ref() {
        if let Some((hue_column, hue_value)) = hue {
            if record.text(hue_column)? != hue_value {
                continue;
            }
        }
        if selected.is_some() {
            return Err(RenderError::AmbiguousCell {
                column: column.to_string(),
                category: category.1.to_string(),
                hue: hue.map(|h| h.1).unwrap_or_default().to_string(),
            });
        }
        selected = Some(record);
    }

    selected.map(|r| r.number(column)).transpose().map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Record;

    fn table() -> Table {
        let mut table = Table::new();
        for (case, fmt, a, b) in [
            ("case 1", "un", 5.0, 7.0),
            ("case 1", "st", 1.0, 2.0),
            ("case 2", "un", 6.0, 1.0),
        ] {
            table.push(
                Record::new()
                    .with("case", case)
                    .with("fmts", fmt)
                    .with("a", a)
                    .with("b", b),
            );
        }
        table
    }

    #[test]
    fn test_cumulative_sums() {
        assert_eq!(cumulative_sums(&[5.0, 7.0, 3.0]), vec![5.0, 12.0, 15.0]);
        assert!(cumulative_sums(&[]).is_empty());
    }

    #[test]
    fn test_parse_color() {
        assert_eq!(Rgb::parse("#f47264").unwrap(), Rgb(0xf4, 0x72, 0x64));
        assert_eq!(Rgb::parse("silver").unwrap(), Rgb::SILVER);
        assert!(matches!(Rgb::parse("f47264"), Err(RenderError::InvalidColor(_))));
        assert!(matches!(Rgb::parse("#zz0000"), Err(RenderError::InvalidColor(_))));
    }

    #[test]
    fn test_grouped_bars() {
        let series = [Series::new("un", Rgb::RED), Series::new("st", Rgb::BLUE)];
        let chart = BarChart::grouped(
            &table(),
            ("case", levels(&["case 1", "case 2"])),
            ("fmts", &series),
            "a",
        )
        .unwrap();

        assert_eq!(chart.values[0], vec![Some(5.0), Some(6.0)]);
        assert_eq!(chart.values[1], vec![Some(1.0), None]);
        assert_eq!(chart.max_value(), Some(6.0));
    }

    #[test]
    fn test_duplicate_cell_is_rejected() {
        let mut data = table();
        data.push(
            Record::new()
                .with("case", "case 2")
                .with("fmts", "un")
                .with("a", 1.0)
                .with("b", 1.0),
        );
        let series = [Series::new("un", Rgb::RED)];

        let result = BarChart::grouped(&data, ("case", levels(&["case 2"])), ("fmts", &series), "a");
        assert!(matches!(result, Err(RenderError::AmbiguousCell { .. })));
    }

    #[test]
    fn test_simple_bars_color_each_category() {
        let mut data = Table::new();
        data.push(Record::new().with("cs", "Uncompr").with("v", 2.0));
        data.push(Record::new().with("cs", "Best").with("v", 1.0));

        let chart = BarChart::simple(
            &data,
            ("cs", levels(&["Uncompr", "Best"])),
            &[Rgb::RED, Rgb::BLUE],
            "v",
        )
        .unwrap();

        assert!(!chart.dodge);
        assert_eq!(chart.series.len(), 2);
        assert_eq!(chart.values[1], vec![None, Some(1.0)]);
        assert_eq!(chart.series[1].color, Rgb::BLUE);
    }

    #[test]
    fn test_stacked_bars() {
        let series = [Series::new("un", Rgb::RED), Series::new("st", Rgb::BLUE)];
        let components = vec![
            Component {
                column: "a".to_string(),
                label: "A".to_string(),
                hatch: Hatch::Slash,
            },
            Component {
                column: "b".to_string(),
                label: "B".to_string(),
                hatch: Hatch::None,
            },
        ];

        let chart = StackedBarChart::build(
            &table(),
            ("case", levels(&["case 1", "case 2"])),
            ("fmts", &series),
            components,
            "column",
        )
        .unwrap();

        // base component
        assert_eq!(chart.stacked[0][0], vec![Some(5.0), Some(6.0)]);
        // cumulative top
        assert_eq!(chart.stacked[1][0], vec![Some(12.0), Some(7.0)]);
        assert_eq!(chart.stacked[1][1], vec![Some(3.0), None]);
        assert_eq!(chart.max_value(), Some(12.0));

        let legend = Legend::components(&chart);
        assert_eq!(legend.entries[0].label, "B");
        assert_eq!(legend.entries[1].hatch, Hatch::Slash);
    }

    #[test]
    fn test_stacked_paint_order_ends_with_base() {
        let series = [Series::new("un", Rgb::RED)];
        let components = ["a", "b"]
            .iter()
            .map(|c| Component {
                column: c.to_string(),
                label: c.to_uppercase(),
                hatch: Hatch::None,
            })
            .collect();

        let chart = StackedBarChart::build(
            &table(),
            ("case", levels(&["case 1"])),
            ("fmts", &series),
            components,
            "column",
        )
        .unwrap();

        let order: Vec<(&str, Option<f64>)> = chart
            .paint_order()
            .map(|(component, tops)| (component.column.as_str(), tops[0][0]))
            .collect();
        assert_eq!(order, vec![("b", Some(12.0)), ("a", Some(5.0))]);
    }

    #[test]
    fn test_swarm_points() {
        let series = [Series::new("un", Rgb::RED)];
        let chart = SwarmChart::build(
            &table(),
            ("case", levels(&["case 1", "case 2"])),
            ("fmts", &series),
            "a",
        )
        .unwrap()
        .with_floor(0.0);

        // the "st" row is outside the hue order
        assert_eq!(chart.points.len(), 2);
        assert_eq!(chart.points[1].category, 1);
        assert_eq!(chart.value_floor, Some(0.0));
    }

    #[test]
    fn test_swarm_offsets_spread_close_points() {
        let offsets = swarm_offsets(&[1.0, 1.01, 1.02, 5.0], 0.1, 0.1, 0.35);

        assert_eq!(offsets[0], 0.0);
        assert!((offsets[1] - 0.1).abs() < 1e-12);
        assert!((offsets[2] + 0.1).abs() < 1e-12);
        assert_eq!(offsets[3], 0.0);
    }

    #[test]
    fn test_legend_figure_name() {
        let legend = Legend::swatches(&["a", "b"], &[Rgb::RED, Rgb::BLUE], Marker::Circle);
        let figure = Figure::legend("figure5_singleop", legend);

        assert_eq!(figure.name, "figure5_singleop_legend");
        assert_eq!(figure.panels.len(), 1);
    }
}
