//! Figure model, rendering and output.

pub mod chart;
pub mod draw;
pub mod generator;
pub mod output;

pub use chart::*;
pub use generator::{generate_summary, RunManifest, MANIFEST_NAME};
pub use output::FigureWriter;
