//! Command-line interface argument parsing.
//!
//! One binary, one subcommand per benchmark suite. Options shared by both
//! suites are global so they may appear before or after the subcommand.

use crate::figures::micro::MicroSelection;
use crate::figures::ssb::SsbSelection;
use crate::loader::ssb::SSB_QUERIES;
use crate::models::ProcessingStyle;
use clap::builder::PossibleValuesParser;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// benchdias - paper diagrams from DIAS benchmark artifacts
///
/// Reads the tab-separated measurements of the micro benchmarks and the
/// Star Schema Benchmark, averages repetitions and draws the figures.
///
/// Examples:
///   benchdias micro --artifacts ./artifacts
///   benchdias micro --only-single-op -r 3
///   benchdias ssb --scale-factor 10 --query 1.1 2.3
///   benchdias ssb --without-monetdb --dump-tables
///   benchdias --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Root directory holding `microbenchmarks/` and `ssb/`
    ///
    /// Defaults to `paths.artifacts` from the config file.
    #[arg(long, value_name = "DIR", global = true)]
    pub artifacts: Option<PathBuf>,

    /// Directory the figures are written to
    ///
    /// Defaults to the measurement directory of the selected suite.
    #[arg(short, long, value_name = "DIR", global = true)]
    pub output: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .benchdias.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Number of repetitions per measurement
    #[arg(short, long, value_name = "N", global = true)]
    pub repetitions: Option<usize>,

    /// Processing style of the measured engine
    #[arg(long, value_name = "STYLE", global = true)]
    pub processing_style: Option<ProcessingStyle>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Write every aggregated table as JSON next to the figures
    #[arg(long, global = true)]
    pub dump_tables: bool,

    /// Generate a default .benchdias.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Figures 4 to 6 from the micro benchmarks
    Micro(MicroArgs),
    /// Figures 1 and 7 to 10 from the Star Schema Benchmark
    Ssb(SsbArgs),
}

impl Command {
    /// Suite name used in the manifest.
    pub fn suite(&self) -> &'static str {
        match self {
            Command::Micro(_) => "micro",
            Command::Ssb(_) => "ssb",
        }
    }
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct MicroArgs {
    /// Only the operator-class example (figure 4)
    #[arg(long, conflicts_with_all = ["only_single_op", "only_simple_query"])]
    pub only_example: bool,

    /// Only the single-operator experiment (figure 5)
    #[arg(long, conflicts_with_all = ["only_example", "only_simple_query"])]
    pub only_single_op: bool,

    /// Only the simple query (figure 6)
    #[arg(long, conflicts_with_all = ["only_example", "only_single_op"])]
    pub only_simple_query: bool,
}

impl MicroArgs {
    /// Experiments to load; all of them unless one `--only-*` flag is set.
    pub fn selection(&self) -> MicroSelection {
        if !(self.only_example || self.only_single_op || self.only_simple_query) {
            return MicroSelection::default();
        }
        MicroSelection {
            operator_classes: self.only_example,
            single_op: self.only_single_op,
            simple_query: self.only_simple_query,
        }
    }
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct SsbArgs {
    /// Scale factor of the generated SSB data
    ///
    /// Defaults to `run.scale_factor` from the config file.
    #[arg(long, value_name = "N")]
    pub scale_factor: Option<u32>,

    /// Restrict the run to these queries (e.g. --query 1.1 2.3)
    #[arg(
        long = "query",
        value_name = "N.N",
        num_args = 1..,
        value_parser = PossibleValuesParser::new(SSB_QUERIES)
    )]
    pub queries: Vec<String>,

    /// Skip the MorphStore measurements
    #[arg(long)]
    pub without_morphstore: bool,

    /// Skip the MonetDB measurements
    #[arg(long)]
    pub without_monetdb: bool,
}

impl SsbArgs {
    pub fn selection(&self) -> SsbSelection {
        SsbSelection {
            morphstore: !self.without_morphstore,
            monetdb: !self.without_monetdb,
        }
    }

    /// Selected queries in benchmark order, all 13 when none were given.
    pub fn effective_queries(&self) -> Vec<String> {
        SSB_QUERIES
            .iter()
            .filter(|q| self.queries.is_empty() || self.queries.iter().any(|s| s == *q))
            .map(|q| q.to_string())
            .collect()
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        let Some(ref command) = self.command else {
            return Err("A subcommand is required: micro or ssb".to_string());
        };

        if self.repetitions == Some(0) {
            return Err("Repetitions must be at least 1".to_string());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Command::Ssb(ssb) = command {
            if ssb.scale_factor == Some(0) {
                return Err("Scale factor must be at least 1".to_string());
            }
            if ssb.without_morphstore && ssb.without_monetdb {
                return Err(
                    "Cannot use both --without-morphstore and --without-monetdb".to_string(),
                );
            }
        }

        if let Some(ref artifacts) = self.artifacts {
            if !artifacts.is_dir() {
                return Err(format!(
                    "Artifacts directory does not exist: {}",
                    artifacts.display()
                ));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
