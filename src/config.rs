//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.benchdias.toml` files.

use crate::cli::{Args, Command};
use crate::loader::micro::micro_dir;
use crate::loader::ssb::ssb_dir;
use crate::loader::TsvSource;
use crate::models::ProcessingStyle;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".benchdias.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub paths: PathsConfig,

    /// Layout of the measurement files.
    #[serde(default)]
    pub input: InputConfig,

    /// Benchmark run parameters.
    #[serde(default)]
    pub run: RunConfig,

    /// Figure colors as `#rrggbb` or a basic color name.
    #[serde(default)]
    pub palette: PaletteConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Dump aggregated tables as JSON.
    #[serde(default)]
    pub dump_tables: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root holding `microbenchmarks/` and `ssb/`.
    #[serde(default = "default_artifacts")]
    pub artifacts: PathBuf,

    /// Output directory. When unset, figures land next to the measurements.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            artifacts: default_artifacts(),
            output: None,
        }
    }
}

fn default_artifacts() -> PathBuf {
    PathBuf::from("artifacts")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Metadata lines preceding the header of every measurement file.
    #[serde(default = "default_skip_lines")]
    pub skip_lines: usize,

    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            skip_lines: default_skip_lines(),
            delimiter: default_delimiter(),
        }
    }
}

fn default_skip_lines() -> usize {
    2
}

fn default_delimiter() -> char {
    '\t'
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_repetitions")]
    pub repetitions: usize,

    #[serde(default = "default_processing_style")]
    pub processing_style: ProcessingStyle,

    /// SSB scale factor.
    #[serde(default = "default_scale_factor")]
    pub scale_factor: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            repetitions: default_repetitions(),
            processing_style: default_processing_style(),
            scale_factor: default_scale_factor(),
        }
    }
}

fn default_repetitions() -> usize {
    10
}

fn default_processing_style() -> ProcessingStyle {
    ProcessingStyle::Vec512
}

fn default_scale_factor() -> u32 {
    100
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaletteConfig {
    #[serde(default = "default_red")]
    pub red: String,
    #[serde(default = "default_gray")]
    pub gray: String,
    #[serde(default = "default_blue")]
    pub blue: String,
    #[serde(default = "default_green")]
    pub green: String,
    #[serde(default = "default_cyan")]
    pub cyan: String,
    #[serde(default = "default_yellow")]
    pub yellow: String,
    #[serde(default = "default_orange")]
    pub orange: String,

    /// One color per format combination of the simple query.
    #[serde(default = "default_simple_query")]
    pub simple_query: Vec<String>,
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            red: default_red(),
            gray: default_gray(),
            blue: default_blue(),
            green: default_green(),
            cyan: default_cyan(),
            yellow: default_yellow(),
            orange: default_orange(),
            simple_query: default_simple_query(),
        }
    }
}

fn default_red() -> String {
    "#f47264".to_string()
}

fn default_gray() -> String {
    "#bfbfbf".to_string()
}

fn default_blue() -> String {
    "#868ad1".to_string()
}

fn default_green() -> String {
    "#84cbc5".to_string()
}

fn default_cyan() -> String {
    "#7cc8ec".to_string()
}

fn default_yellow() -> String {
    "#f8d35e".to_string()
}

fn default_orange() -> String {
    "#ffa300".to_string()
}

fn default_simple_query() -> Vec<String> {
    vec![default_gray(), default_cyan(), default_blue(), default_yellow(), default_red()]
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// Only values given explicitly on the command line override the file.
    pub fn merge_with_args(&mut self, args: &Args) {
        if let Some(ref artifacts) = args.artifacts {
            self.paths.artifacts = artifacts.clone();
        }
        if let Some(ref output) = args.output {
            self.paths.output = Some(output.clone());
        }
        if let Some(repetitions) = args.repetitions {
            self.run.repetitions = repetitions;
        }
        if let Some(style) = args.processing_style {
            self.run.processing_style = style;
        }
        if let Some(Command::Ssb(ref ssb)) = args.command {
            if let Some(scale_factor) = ssb.scale_factor {
                self.run.scale_factor = scale_factor;
            }
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
        if args.dump_tables {
            self.general.dump_tables = true;
        }
    }

    /// Reader settings for all measurement files.
    pub fn tsv_source(&self) -> Result<TsvSource> {
        if !self.input.delimiter.is_ascii() {
            bail!(
                "Delimiter must be a single ASCII character, got {:?}",
                self.input.delimiter
            );
        }
        Ok(TsvSource::new(self.input.delimiter as u8, self.input.skip_lines))
    }

    /// Where the figures of `command` are written.
    pub fn output_dir(&self, command: &Command) -> PathBuf {
        if let Some(ref output) = self.paths.output {
            return output.clone();
        }
        match command {
            Command::Micro(_) => micro_dir(&self.paths.artifacts),
            Command::Ssb(_) => {
                ssb_dir(&self.paths.artifacts).join(format!("dias_sf{}", self.run.scale_factor))
            }
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
