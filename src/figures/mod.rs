//! Paper figures.
//!
//! Each submodule turns the tables of one benchmark suite into the
//! [`Figure`]s of the paper, together with their stand-alone legends.

pub mod micro;
pub mod ssb;

use crate::config::PaletteConfig;
use crate::error::RenderError;
use crate::models::Table;
use crate::report::{Figure, Legend, Marker, Rgb};

/// Colors used across all figures.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    pub red: Rgb,
    pub gray: Rgb,
    pub blue: Rgb,
    pub green: Rgb,
    pub cyan: Rgb,
    pub yellow: Rgb,
    pub orange: Rgb,
    /// One color per format combination of the simple query.
    pub simple_query: Vec<Rgb>,
}

impl Palette {
    pub fn from_config(config: &PaletteConfig) -> Result<Self, RenderError> {
        Ok(Self {
            red: Rgb::parse(&config.red)?,
            gray: Rgb::parse(&config.gray)?,
            blue: Rgb::parse(&config.blue)?,
            green: Rgb::parse(&config.green)?,
            cyan: Rgb::parse(&config.cyan)?,
            yellow: Rgb::parse(&config.yellow)?,
            orange: Rgb::parse(&config.orange)?,
            simple_query: config
                .simple_query
                .iter()
                .map(|c| Rgb::parse(c))
                .collect::<Result<_, _>>()?,
        })
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            red: Rgb(0xf4, 0x72, 0x64),
            gray: Rgb(0xbf, 0xbf, 0xbf),
            blue: Rgb(0x86, 0x8a, 0xd1),
            green: Rgb(0x84, 0xcb, 0xc5),
            cyan: Rgb(0x7c, 0xc8, 0xec),
            yellow: Rgb(0xf8, 0xd3, 0x5e),
            orange: Rgb(0xff, 0xa3, 0x00),
            simple_query: vec![
                Rgb(0xbf, 0xbf, 0xbf),
                Rgb(0x7c, 0xc8, 0xec),
                Rgb(0x86, 0x8a, 0xd1),
                Rgb(0xf8, 0xd3, 0x5e),
                Rgb(0xf4, 0x72, 0x64),
            ],
        }
    }
}

/// Main figure plus its rectangle legend.
pub(crate) fn with_rect_legend(figure: Figure, labels: &[String], colors: &[Rgb]) -> Vec<Figure> {
    let legend = Figure::legend(&figure.name, Legend::swatches(labels, colors, Marker::Rect));
    vec![figure, legend]
}

/// An aggregated table under the name used for its JSON dump.
#[derive(Debug, Clone)]
pub struct NamedTable {
    pub name: String,
    pub table: Table,
}

impl NamedTable {
    pub fn new(name: impl Into<String>, table: Table) -> Self {
        Self {
            name: name.into(),
            table,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_from_default_config() {
        let palette = Palette::from_config(&PaletteConfig::default()).unwrap();
        assert_eq!(palette, Palette::default());
    }

    #[test]
    fn test_palette_rejects_bad_color() {
        let config = PaletteConfig {
            red: "not-a-color".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            Palette::from_config(&config),
            Err(RenderError::InvalidColor(_))
        ));
    }

    #[test]
    fn test_rect_legend_companion() {
        let figure = Figure::new("figure07_ssb_formats", (1000, 600), (2, 1));
        let figures = with_rect_legend(figure, &["uncompressed".to_string()], &[Rgb::SILVER]);

        assert_eq!(figures.len(), 2);
        assert_eq!(figures[1].name, "figure07_ssb_formats_legend");
    }
}
