//! Writing figures and JSON artifacts to the output directory.
//!
//! Figures are drawn with the plotters SVG backend into memory and
//! converted to PDF before anything touches the disk.

use super::chart::Figure;
use super::draw::draw_figure;
use crate::error::RenderError;
use plotters::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};

/// Destination of all files produced by one run.
///
/// The directory is explicit configuration; every save fails with
/// [`RenderError::OutputDirNotConfigured`] while it is unset.
#[derive(Debug, Default)]
pub struct FigureWriter {
    output_dir: Option<PathBuf>,
    written: Vec<PathBuf>,
}

impl FigureWriter {
    pub fn new(output_dir: Option<PathBuf>) -> Self {
        Self {
            output_dir,
            written: Vec::new(),
        }
    }

    pub fn output_dir(&self) -> Option<&Path> {
        self.output_dir.as_deref()
    }

    /// Files written so far, in order.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    /// Path of `file_name` inside the output directory, creating the directory.
    fn prepare(&self, file_name: &str) -> Result<PathBuf, RenderError> {
        let dir = self
            .output_dir
            .as_ref()
            .ok_or(RenderError::OutputDirNotConfigured)?;

        fs::create_dir_all(dir).map_err(|source| RenderError::CreateDir {
            path: dir.clone(),
            source,
        })?;

        Ok(dir.join(file_name))
    }

    fn write(&mut self, path: PathBuf, content: &[u8]) -> Result<PathBuf, RenderError> {
        fs::write(&path, content).map_err(|source| RenderError::Write {
            path: path.clone(),
            source,
        })?;
        self.written.push(path.clone());
        Ok(path)
    }

    /// Render `figure` and save it as `{name}.pdf`.
    pub fn save(&mut self, figure: &Figure) -> Result<PathBuf, RenderError> {
        let path = self.prepare(&format!("{}.pdf", figure.name))?;

        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, figure.size).into_drawing_area();
            draw_figure(&root, figure)?;
            root.present().map_err(|e| RenderError::Drawing {
                figure: figure.name.clone(),
                message: e.to_string(),
            })?;
        }

        let pdf = svg_to_pdf(&figure.name, &svg)?;
        let path = self.write(path, &pdf)?;
        info!("Saved figure {}", path.display());
        Ok(path)
    }

    /// Serialize `value` as pretty JSON into `{name}.json`.
    pub fn write_json<T: Serialize>(&mut self, name: &str, value: &T) -> Result<PathBuf, RenderError> {
        let path = self.prepare(&format!("{}.json", name))?;
        let content = serde_json::to_string_pretty(value).map_err(|source| RenderError::Serialize {
            name: name.to_string(),
            source,
        })?;

        let path = self.write(path, content.as_bytes())?;
        debug!("Wrote {}", path.display());
        Ok(path)
    }
}

/// System fonts, loaded on first use.
fn fonts() -> Arc<usvg::fontdb::Database> {
    static FONTS: OnceLock<Arc<usvg::fontdb::Database>> = OnceLock::new();
    FONTS
        .get_or_init(|| {
            let mut db = usvg::fontdb::Database::new();
            db.load_system_fonts();
            debug!("Loaded {} font faces", db.len());
            Arc::new(db)
        })
        .clone()
}

/// Convert a rendered SVG document of `figure` into a one-page PDF.
pub fn svg_to_pdf(figure: &str, svg: &str) -> Result<Vec<u8>, RenderError> {
    let failed = |message: String| RenderError::Pdf {
        figure: figure.to_string(),
        message,
    };

    let mut options = usvg::Options::default();
    options.fontdb = fonts();
    let tree = usvg::Tree::from_str(svg, &options).map_err(|e| failed(e.to_string()))?;

    svg2pdf::to_pdf(
        &tree,
        svg2pdf::ConversionOptions::default(),
        svg2pdf::PageOptions::default(),
    )
    .map_err(|e| failed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::chart::{Legend, Marker, Rgb};
    use tempfile::TempDir;

    fn legend_figure() -> Figure {
        Figure::legend(
            "figure4_example",
            Legend::swatches(&["uncompressed"], &[Rgb::SILVER], Marker::Rect),
        )
    }

    #[test]
    fn test_save_without_output_dir_fails() {
        let mut writer = FigureWriter::new(None);
        let result = writer.save(&legend_figure());

        assert!(matches!(result, Err(RenderError::OutputDirNotConfigured)));
        assert!(writer.written().is_empty());
        assert!(writer.output_dir().is_none());
    }

    #[test]
    fn test_save_writes_pdf() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join("nested").join("out");
        let mut writer = FigureWriter::new(Some(out.clone()));

        let path = writer.save(&legend_figure()).unwrap();

        assert_eq!(path, out.join("figure4_example_legend.pdf"));
        let content = fs::read(&path).unwrap();
        assert!(content.starts_with(b"%PDF"));
        assert_eq!(writer.written(), &[path]);
    }

    #[test]
    fn test_svg_to_pdf() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" width="40" height="20"><rect width="40" height="20" fill="red"/></svg>"#;
        let pdf = svg_to_pdf("rect", svg).unwrap();
        assert!(pdf.starts_with(b"%PDF"));

        assert!(matches!(
            svg_to_pdf("broken", "<svg"),
            Err(RenderError::Pdf { .. })
        ));
    }

    #[test]
    fn test_write_json() {
        let temp_dir = TempDir::new().unwrap();
        let mut writer = FigureWriter::new(Some(temp_dir.path().to_path_buf()));

        let path = writer.write_json("table", &vec![1, 2, 3]).unwrap();

        let parsed: Vec<u32> = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(parsed, vec![1, 2, 3]);
    }

    #[test]
    fn test_failed_drawing_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let mut writer = FigureWriter::new(Some(temp_dir.path().to_path_buf()));

        let result = writer.save(&Figure::new("empty", (100, 100), (1, 1)));

        assert!(matches!(result, Err(RenderError::EmptyFigure(_))));
        assert!(!temp_dir.path().join("empty.pdf").exists());
    }
}
