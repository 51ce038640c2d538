//! Rendering of the chart model with plotters.
//!
//! Category axes are drawn by hand: the mesh gets a blank formatter for the
//! categorical direction and labels are placed at backend coordinates on the
//! root area, which allows multi-line tick labels.

use super::chart::{
    legend_entry_width, swarm_offsets, BarChart, Chart, Figure, Hatch, Legend, Level, Marker,
    Orientation, Panel, Rgb, StackedBarChart, SwarmChart,
};
use crate::error::RenderError;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::fmt;
use std::ops::Range;
use tracing::warn;

const FONT_SIZE: u32 = 13;
const LINE_HEIGHT: i32 = 15;
const SWATCH: i32 = 20;
const HATCH_SPACING: i32 = 6;
/// Share of a category slot covered by its bars.
const BAR_SPAN: f64 = 0.8;

type Plot<'a, DB> = ChartContext<'a, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>;
type PixelRect = ((i32, i32), (i32, i32));

fn failed<E: fmt::Display>(figure: &str) -> impl Fn(E) -> RenderError + '_ {
    move |e| RenderError::Drawing {
        figure: figure.to_string(),
        message: e.to_string(),
    }
}

impl From<Rgb> for RGBColor {
    fn from(color: Rgb) -> Self {
        RGBColor(color.0, color.1, color.2)
    }
}

/// Draw all panels of `figure` onto `root`, row by row.
pub fn draw_figure<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    figure: &Figure,
) -> Result<(), RenderError> {
    if figure.panels.is_empty() {
        return Err(RenderError::EmptyFigure(figure.name.clone()));
    }

    root.fill(&WHITE).map_err(failed(&figure.name))?;

    let (rows, cols) = figure.grid;
    let areas = root.split_evenly((rows.max(1), cols.max(1)));
    if figure.panels.len() > areas.len() {
        warn!(
            "Figure {} has {} panels but only {} grid cells",
            figure.name,
            figure.panels.len(),
            areas.len()
        );
    }

    for (panel, area) in figure.panels.iter().zip(areas.iter()) {
        draw_panel(root, area, panel, &figure.name)?;
    }

    Ok(())
}

fn draw_panel<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    area: &DrawingArea<DB, Shift>,
    panel: &Panel,
    name: &str,
) -> Result<(), RenderError> {
    let plot_area = match &panel.legend {
        Some(legend) => {
            let width = legend_column_width(legend);
            let (plot, side) = area.split_horizontally(area.dim_in_pixel().0 as i32 - width);
            draw_legend(&side, legend, Flow::Column, name)?;
            plot
        }
        None => area.clone(),
    };

    match &panel.chart {
        Chart::Bars(bars) => draw_bars(root, &plot_area, panel, bars, name),
        Chart::StackedBars(stacked) => draw_stacked(root, &plot_area, panel, stacked, name),
        Chart::Swarm(swarm) => draw_swarm(root, &plot_area, panel, swarm, name),
        Chart::Legend(legend) => draw_legend(&plot_area, legend, Flow::Row, name),
    }
}

/// Axis top with some headroom above the largest value.
fn headroom(max: Option<f64>) -> f64 {
    match max {
        Some(v) if v > 0.0 => v * 1.1,
        _ => 1.0,
    }
}

/// Axis coordinate of category `index`; horizontal charts list categories top-down.
fn category_position(orientation: Orientation, index: usize, count: usize) -> f64 {
    match orientation {
        Orientation::Vertical => index as f64,
        Orientation::Horizontal => (count.max(1) - 1 - index.min(count.max(1) - 1)) as f64,
    }
}

/// Span `[from, to)` on the category axis taken by bar `slot` out of `slots`.
fn slot_span(orientation: Orientation, position: f64, slot: usize, slots: usize) -> (f64, f64) {
    let width = BAR_SPAN / slots.max(1) as f64;
    match orientation {
        Orientation::Vertical => {
            let from = position - BAR_SPAN / 2.0 + width * slot as f64;
            (from, from + width)
        }
        Orientation::Horizontal => {
            let to = position + BAR_SPAN / 2.0 - width * slot as f64;
            (to - width, to)
        }
    }
}

fn bar_corners(
    orientation: Orientation,
    span: (f64, f64),
    value: (f64, f64),
) -> [(f64, f64); 2] {
    match orientation {
        Orientation::Vertical => [(span.0, value.0), (span.1, value.1)],
        Orientation::Horizontal => [(value.0, span.0), (value.1, span.1)],
    }
}

/// Build the coordinate system and draw the value mesh and category labels.
#[allow(clippy::too_many_arguments)]
fn build_chart<'a, DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    area: &'a DrawingArea<DB, Shift>,
    panel: &Panel,
    orientation: Orientation,
    categories: &[Level],
    show_labels: bool,
    values: Range<f64>,
    name: &str,
) -> Result<Plot<'a, DB>, RenderError> {
    let count = categories.len().max(1);
    let category_range = -0.5..(count as f64 - 0.5);

    let lines = categories
        .iter()
        .map(|l| l.label.lines().count())
        .max()
        .unwrap_or(1) as i32;
    let widest = categories
        .iter()
        .flat_map(|l| l.label.lines())
        .map(|l| l.chars().count())
        .max()
        .unwrap_or(0) as i32;
    let description = if panel.category_label.is_some() { 18 } else { 0 };

    let mut builder = ChartBuilder::on(area);
    builder.margin(8);
    if let Some(title) = &panel.title {
        builder.caption(title, ("sans-serif", FONT_SIZE + 1));
    }

    let mut chart = match orientation {
        Orientation::Vertical => {
            let label_area = if show_labels { 10 + LINE_HEIGHT * lines } else { 10 };
            builder
                .x_label_area_size(label_area + description)
                .y_label_area_size(56)
                .build_cartesian_2d(category_range, values.clone())
        }
        Orientation::Horizontal => {
            let label_area = if show_labels { 14 + 7 * widest } else { 10 };
            builder
                .x_label_area_size(40)
                .y_label_area_size(label_area + description)
                .build_cartesian_2d(values.clone(), category_range)
        }
    }
    .map_err(failed(name))?;

    let blank = |_: &f64| String::new();
    let mut mesh = chart.configure_mesh();
    mesh.light_line_style(WHITE)
        .label_style(("sans-serif", FONT_SIZE));
    match orientation {
        Orientation::Vertical => {
            mesh.disable_x_mesh().x_label_formatter(&blank);
            if let Some(label) = &panel.value_label {
                mesh.y_desc(label.as_str());
            }
            if let Some(label) = &panel.category_label {
                mesh.x_desc(label.as_str());
            }
        }
        Orientation::Horizontal => {
            mesh.disable_y_mesh().y_label_formatter(&blank);
            if let Some(label) = &panel.value_label {
                mesh.x_desc(label.as_str());
            }
            if let Some(label) = &panel.category_label {
                mesh.y_desc(label.as_str());
            }
        }
    }
    mesh.draw().map_err(failed(name))?;

    if show_labels {
        for (i, level) in categories.iter().enumerate() {
            let position = category_position(orientation, i, categories.len());
            match orientation {
                Orientation::Vertical => {
                    let (x, y) = chart.backend_coord(&(position, values.start));
                    draw_lines(root, &level.label, (x, y + 6), Pos::new(HPos::Center, VPos::Top), name)?;
                }
                Orientation::Horizontal => {
                    let (x, y) = chart.backend_coord(&(values.start, position));
                    let shift = (level.label.lines().count() as i32 - 1) * LINE_HEIGHT / 2;
                    draw_lines(
                        root,
                        &level.label,
                        (x - 6, y - shift),
                        Pos::new(HPos::Right, VPos::Center),
                        name,
                    )?;
                }
            }
        }
    }

    Ok(chart)
}

fn draw_lines<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    text: &str,
    at: (i32, i32),
    pos: Pos,
    name: &str,
) -> Result<(), RenderError> {
    let style = TextStyle::from(("sans-serif", FONT_SIZE).into_font()).pos(pos);
    for (i, line) in text.lines().enumerate() {
        area.draw(&Text::new(
            line.to_string(),
            (at.0, at.1 + i as i32 * LINE_HEIGHT),
            style.clone(),
        ))
        .map_err(failed(name))?;
    }
    Ok(())
}

/// Filled rectangle with a black outline; returns its pixel bounds.
fn fill_bar<DB: DrawingBackend>(
    chart: &Plot<'_, DB>,
    corners: [(f64, f64); 2],
    color: Rgb,
    name: &str,
) -> Result<PixelRect, RenderError> {
    let area = chart.plotting_area();
    area.draw(&Rectangle::new(corners, RGBColor::from(color).filled()))
        .map_err(failed(name))?;
    area.draw(&Rectangle::new(corners, BLACK.stroke_width(1)))
        .map_err(failed(name))?;

    let a = chart.backend_coord(&corners[0]);
    let b = chart.backend_coord(&corners[1]);
    Ok(((a.0.min(b.0), a.1.min(b.1)), (a.0.max(b.0), a.1.max(b.1))))
}

/// Cover a pixel rectangle with a hatch pattern.
fn hatch<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    rect: PixelRect,
    pattern: Hatch,
    name: &str,
) -> Result<(), RenderError> {
    let ((x0, y0), (x1, y1)) = rect;

    match pattern {
        Hatch::None => {}
        Hatch::Slash => {
            // x + y = c runs bottom-left to top-right in pixel space
            let mut c = x0 + y0 + HATCH_SPACING;
            while c < x1 + y1 {
                let from = x0.max(c - y1);
                let to = x1.min(c - y0);
                if from < to {
                    area.draw(&PathElement::new(vec![(from, c - from), (to, c - to)], BLACK))
                        .map_err(failed(name))?;
                }
                c += HATCH_SPACING;
            }
        }
        Hatch::Backslash => {
            let mut c = x0 - y1 + HATCH_SPACING;
            while c < x1 - y0 {
                let from = x0.max(c + y0);
                let to = x1.min(c + y1);
                if from < to {
                    area.draw(&PathElement::new(vec![(from, from - c), (to, to - c)], BLACK))
                        .map_err(failed(name))?;
                }
                c += HATCH_SPACING;
            }
        }
        Hatch::Dots => {
            let mut y = y0 + HATCH_SPACING / 2;
            let mut row = 0;
            while y < y1 {
                let mut x = x0 + HATCH_SPACING / 2 + (row % 2) * HATCH_SPACING / 2;
                while x < x1 {
                    area.draw(&Circle::new((x, y), 1, BLACK.filled()))
                        .map_err(failed(name))?;
                    x += HATCH_SPACING;
                }
                y += HATCH_SPACING;
                row += 1;
            }
        }
    }

    Ok(())
}

fn draw_bars<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    area: &DrawingArea<DB, Shift>,
    panel: &Panel,
    bars: &BarChart,
    name: &str,
) -> Result<(), RenderError> {
    let top = bars.value_cap.unwrap_or_else(|| headroom(bars.max_value()));
    let chart = build_chart(
        root,
        area,
        panel,
        bars.orientation,
        &bars.categories,
        bars.show_category_labels,
        0.0..top,
        name,
    )?;

    let slots = if bars.dodge { bars.series.len() } else { 1 };
    let count = bars.categories.len();

    for (s, (series, values)) in bars.series.iter().zip(&bars.values).enumerate() {
        let slot = if bars.dodge { s } else { 0 };

        for (c, value) in values.iter().enumerate() {
            let Some(value) = *value else {
                continue;
            };
            let position = category_position(bars.orientation, c, count);
            let span = slot_span(bars.orientation, position, slot, slots);
            let corners = bar_corners(bars.orientation, span, (0.0, value.min(top)));
            let rect = fill_bar(&chart, corners, series.color, name)?;

            if value > top {
                let unit = bars.overflow_unit.as_deref().unwrap_or_default();
                let text = format!("{:.0} {}", value, unit);
                let (at, pos) = match bars.orientation {
                    Orientation::Vertical => (
                        ((rect.0 .0 + rect.1 .0) / 2, rect.0 .1 + 4),
                        Pos::new(HPos::Center, VPos::Top),
                    ),
                    Orientation::Horizontal => (
                        (rect.1 .0 - 4, (rect.0 .1 + rect.1 .1) / 2),
                        Pos::new(HPos::Right, VPos::Center),
                    ),
                };
                draw_lines(root, text.trim_end(), at, pos, name)?;
            }
        }
    }

    Ok(())
}

fn draw_stacked<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    area: &DrawingArea<DB, Shift>,
    panel: &Panel,
    stacked: &StackedBarChart,
    name: &str,
) -> Result<(), RenderError> {
    let top = headroom(stacked.max_value());
    let chart = build_chart(
        root,
        area,
        panel,
        Orientation::Vertical,
        &stacked.categories,
        true,
        0.0..top,
        name,
    )?;

    for (component, tops) in stacked.paint_order() {
        for (s, (series, values)) in stacked.series.iter().zip(tops).enumerate() {
            for (c, value) in values.iter().enumerate() {
                let Some(value) = *value else {
                    continue;
                };
                let span = slot_span(Orientation::Vertical, c as f64, s, stacked.series.len());
                let corners = bar_corners(Orientation::Vertical, span, (0.0, value));
                let rect = fill_bar(&chart, corners, series.color, name)?;
                hatch(root, rect, component.hatch, name)?;
            }
        }
    }

    Ok(())
}

fn draw_swarm<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    area: &DrawingArea<DB, Shift>,
    panel: &Panel,
    swarm: &SwarmChart,
    name: &str,
) -> Result<(), RenderError> {
    let max = swarm.points.iter().map(|p| p.value).fold(None, |acc: Option<f64>, v| {
        Some(acc.map_or(v, |a| a.max(v)))
    });
    let floor = swarm.value_floor.unwrap_or_else(|| {
        swarm
            .points
            .iter()
            .map(|p| p.value)
            .fold(0.0, f64::min)
    });
    let top = headroom(max).max(floor + 1.0);

    let chart = build_chart(
        root,
        area,
        panel,
        Orientation::Vertical,
        &swarm.categories,
        true,
        floor..top,
        name,
    )?;

    for c in 0..swarm.categories.len() {
        let points: Vec<_> = swarm.points.iter().filter(|p| p.category == c).collect();
        let values: Vec<f64> = points.iter().map(|p| p.value).collect();
        let offsets = swarm_offsets(&values, (top - floor) / 50.0, 0.07, BAR_SPAN / 2.0);

        for (point, offset) in points.iter().zip(offsets) {
            let color = swarm
                .series
                .get(point.series)
                .map(|s| s.color)
                .unwrap_or(Rgb::BLACK);
            chart
                .plotting_area()
                .draw(&Circle::new(
                    (c as f64 + offset, point.value),
                    3,
                    RGBColor::from(color).filled(),
                ))
                .map_err(failed(name))?;
        }
    }

    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Row,
    Column,
}

fn legend_column_width(legend: &Legend) -> i32 {
    let entries = legend
        .entries
        .iter()
        .map(|e| legend_entry_width(&e.label))
        .max()
        .unwrap_or(0);
    let title = legend
        .title
        .as_deref()
        .map(|t| 16 + 8 * t.chars().count() as u32)
        .unwrap_or(0);
    entries.max(title) as i32
}

fn draw_legend<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    legend: &Legend,
    flow: Flow,
    name: &str,
) -> Result<(), RenderError> {
    let top = Pos::new(HPos::Left, VPos::Top);
    let (mut x, mut y) = (8, 6);

    if let Some(title) = &legend.title {
        draw_lines(area, title, (x, y), top, name)?;
        match flow {
            Flow::Row => x += 16 + 8 * title.chars().count() as i32,
            Flow::Column => y += LINE_HEIGHT + 6,
        }
    }

    for entry in &legend.entries {
        match legend.marker {
            Marker::Rect => {
                let rect = ((x, y), (x + SWATCH, y + SWATCH));
                area.draw(&Rectangle::new(
                    [rect.0, rect.1],
                    RGBColor::from(entry.fill).filled(),
                ))
                .map_err(failed(name))?;
                hatch(area, rect, entry.hatch, name)?;
                area.draw(&Rectangle::new([rect.0, rect.1], BLACK.stroke_width(1)))
                    .map_err(failed(name))?;
            }
            Marker::Circle => {
                area.draw(&Circle::new(
                    (x + SWATCH / 2, y + SWATCH / 2),
                    6,
                    RGBColor::from(entry.fill).filled(),
                ))
                .map_err(failed(name))?;
            }
        }

        draw_lines(area, &entry.label, (x + SWATCH + 8, y + 3), top, name)?;

        match flow {
            Flow::Row => x += legend_entry_width(&entry.label) as i32,
            Flow::Column => {
                let lines = entry.label.lines().count().max(1) as i32;
                y += SWATCH.max(lines * LINE_HEIGHT) + 6;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::chart::{Component, LegendEntry, Series, SwarmPoint};

    fn render(figure: &Figure) -> Result<String, RenderError> {
        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, figure.size).into_drawing_area();
            draw_figure(&root, figure)?;
            root.present().map_err(failed(&figure.name))?;
        }
        Ok(svg)
    }

    fn bars(orientation: Orientation, cap: Option<f64>) -> BarChart {
        BarChart {
            orientation,
            categories: vec![Level::new("a"), Level::labelled("b", "two\nlines")],
            series: vec![Series::new("x", Rgb::RED), Series::new("y", Rgb::BLUE)],
            values: vec![vec![Some(1.0), Some(100.0)], vec![Some(2.0), None]],
            dodge: true,
            value_cap: cap,
            overflow_unit: cap.map(|_| "ms".to_string()),
            show_category_labels: true,
        }
    }

    #[test]
    fn test_category_position() {
        assert_eq!(category_position(Orientation::Vertical, 0, 3), 0.0);
        assert_eq!(category_position(Orientation::Horizontal, 0, 3), 2.0);
        assert_eq!(category_position(Orientation::Horizontal, 2, 3), 0.0);
    }

    #[test]
    fn test_slots_cover_bar_span() {
        let (from, _) = slot_span(Orientation::Vertical, 1.0, 0, 4);
        let (_, to) = slot_span(Orientation::Vertical, 1.0, 3, 4);
        assert!((from - 0.6).abs() < 1e-12);
        assert!((to - 1.4).abs() < 1e-12);

        // first slot on top for horizontal bars
        let (_, top) = slot_span(Orientation::Horizontal, 0.0, 0, 2);
        assert!((top - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_render_bars_with_overflow() {
        let figure = Figure::new("bars", (400, 300), (1, 1)).panel(
            Panel::new(Chart::Bars(bars(Orientation::Horizontal, Some(50.0))))
                .titled("runtime")
                .value_label("runtime [ms]"),
        );

        let svg = render(&figure).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("100 ms"));
        assert!(svg.contains("lines"));
    }

    #[test]
    fn test_render_stacked_and_swarm() {
        let stacked = StackedBarChart {
            categories: vec![Level::new("case 1")],
            series: vec![Series::new("un", Rgb::SILVER)],
            components: vec![
                Component {
                    column: "a".to_string(),
                    label: "A".to_string(),
                    hatch: Hatch::Slash,
                },
                Component {
                    column: "b".to_string(),
                    label: "B".to_string(),
                    hatch: Hatch::Dots,
                },
            ],
            stacked: vec![vec![vec![Some(1.0)]], vec![vec![Some(3.0)]]],
            legend_title: "column".to_string(),
        };
        let swarm = SwarmChart {
            categories: vec![Level::new("C1"), Level::new("C2")],
            series: vec![Series::new("u", Rgb::RED)],
            points: vec![
                SwarmPoint { category: 0, series: 0, value: 1.0 },
                SwarmPoint { category: 0, series: 0, value: 1.0 },
                SwarmPoint { category: 1, series: 0, value: 4.0 },
            ],
            value_floor: Some(0.0),
        };

        let legend = Legend::components(&stacked);
        let figure = Figure::new("mixed", (800, 300), (1, 2))
            .panel(Panel::new(Chart::StackedBars(stacked)).with_legend(legend))
            .panel(Panel::new(Chart::Swarm(swarm)).category_label("case"));

        let svg = render(&figure).unwrap();
        assert!(svg.contains("case 1"));
        assert!(svg.contains("C2"));
    }

    #[test]
    fn test_render_legend() {
        let legend = Legend {
            title: None,
            marker: Marker::Rect,
            entries: vec![LegendEntry {
                label: "uncompr.\nstatic BP".to_string(),
                fill: Rgb::SILVER,
                hatch: Hatch::Backslash,
            }],
        };
        let figure = Figure::legend("figure6_simplequery", legend);

        let svg = render(&figure).unwrap();
        assert!(svg.contains("static BP"));
    }

    #[test]
    fn test_empty_figure_is_rejected() {
        let figure = Figure::new("empty", (100, 100), (1, 1));
        assert!(matches!(render(&figure), Err(RenderError::EmptyFigure(_))));
    }
}
