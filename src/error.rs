//! Error types shared by the loader, aggregator and renderer.
//!
//! The orchestration layer in `main.rs` wraps these in `anyhow` with
//! context; everything below it returns one of these typed errors so the
//! caller can tell a bad measurement file from a rendering problem.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading values out of a [`crate::models::Table`].
#[derive(Debug, Error)]
pub enum TableError {
    #[error("column '{column}' is missing")]
    MissingColumn { column: String },

    #[error("column '{column}' holds non-numeric value '{value}'")]
    NotNumeric { column: String, value: String },
}

/// Errors raised while loading measurement files.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read measurement file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed measurement file {}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("measurement file {} has no header after skipping {skip} lines", path.display())]
    MissingHeader { path: PathBuf, skip: usize },

    #[error("at least one repetition is required for experiment '{0}'")]
    NoRepetitions(String),

    #[error("unmapped value '{value}' in column '{column}'")]
    UnmappedCategory { column: String, value: String },

    #[error("unsupported data format '{0}'")]
    UnknownFormat(String),

    #[error("column '{column}' holds {value}, expected a whole number")]
    NotAnIndex { column: String, value: f64 },

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

/// Errors raised by the grouping and reduction routines.
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("grouping key column '{0}' is missing from a row")]
    MissingKey(String),

    #[error("dimension '{0}' cannot be averaged away while it is part of the key")]
    DimensionInKey(String),
}

/// Errors raised while building or writing figures.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("output directory is not configured; set paths.output or pass --output")]
    OutputDirNotConfigured,

    #[error("more than one row for category '{category}' and hue '{hue}' in column '{column}'")]
    AmbiguousCell {
        column: String,
        category: String,
        hue: String,
    },

    #[error("invalid color '{0}', expected #rrggbb or a known name")]
    InvalidColor(String),

    #[error("figure '{0}' has no panels")]
    EmptyFigure(String),

    #[error("failed to draw figure '{figure}': {message}")]
    Drawing { figure: String, message: String },

    #[error("failed to convert figure '{figure}' to PDF: {message}")]
    Pdf { figure: String, message: String },

    #[error("failed to create output directory {}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize '{name}'")]
    Serialize {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}
