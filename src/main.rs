//! benchdias - paper diagrams from DIAS benchmark artifacts
//!
//! Loads the repeated measurements of the micro benchmarks or the Star
//! Schema Benchmark, averages them and writes one PDF file per figure.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Invalid arguments, unreadable measurements or a failed figure

mod analysis;
mod cli;
mod config;
mod error;
mod figures;
mod loader;
mod models;
mod report;

use anyhow::{bail, Context, Result};
use cli::{Args, Command};
use config::{Config, DEFAULT_CONFIG_FILE};
use figures::micro::MicroTables;
use figures::ssb::{SsbSettings, SsbTables};
use figures::{NamedTable, Palette};
use indicatif::{ProgressBar, ProgressStyle};
use loader::micro::micro_dir;
use loader::ssb::{ssb_dir, SsbInputs};
use report::{generate_summary, Figure, FigureWriter, RunManifest, MANIFEST_NAME};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    let mut config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    init_logging(&args, &config);

    info!("benchdias v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(&args, &config) {
        error!("Run failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .benchdias.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", DEFAULT_CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to change paths, repetitions and colors.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args, config: &Config) {
    let level = if !args.quiet && config.general.verbose {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Load configuration from the explicit path, the default file or defaults.
fn load_config(args: &Args) -> Result<Config> {
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    Ok(Config::load_default()?.unwrap_or_default())
}

/// Load, draw and save everything for the selected suite.
fn run(args: &Args, config: &Config) -> Result<()> {
    let start_time = Instant::now();

    let Some(ref command) = args.command else {
        bail!("A subcommand is required: micro or ssb");
    };

    let artifacts = &config.paths.artifacts;
    if !artifacts.is_dir() {
        bail!("Artifacts directory does not exist: {}", artifacts.display());
    }
    if config.run.repetitions == 0 {
        bail!("Repetitions must be at least 1");
    }

    let source = config.tsv_source()?;
    let palette = Palette::from_config(&config.palette).context("Invalid [palette] configuration")?;
    let mut writer = FigureWriter::new(Some(config.output_dir(command)));
    let mut manifest = RunManifest::new(command.suite())
        .parameter("artifacts", artifacts.display())
        .parameter("repetitions", config.run.repetitions);

    println!("📥 Loading measurements from {}", artifacts.display());

    let (tables, figures) = match command {
        Command::Micro(micro) => {
            let dir = micro_dir(artifacts);
            let tables =
                MicroTables::load(&dir, config.run.repetitions, &source, micro.selection())
                    .with_context(|| {
                        format!("Failed to load micro benchmark results from {}", dir.display())
                    })?;
            let figures = tables
                .figures(&palette)
                .context("Failed to build micro benchmark figures")?;
            (tables.named(), figures)
        }
        Command::Ssb(ssb) => {
            let settings = SsbSettings {
                scale_factor: config.run.scale_factor,
                processing_style: config.run.processing_style,
                queries: ssb.effective_queries(),
            };
            let inputs = SsbInputs {
                dir: ssb_dir(artifacts),
                scale_factor: settings.scale_factor,
                processing_style: settings.processing_style,
                repetitions: config.run.repetitions,
                queries: settings.queries.clone(),
                source,
            };
            manifest = manifest
                .parameter("scale_factor", settings.scale_factor)
                .parameter("processing_style", settings.processing_style)
                .parameter("queries", settings.queries.join(","));

            println!(
                "   Scale factor {}, {} quer(ies), {}",
                settings.scale_factor,
                settings.queries.len(),
                settings.processing_style.display_name()
            );

            let tables = SsbTables::load(&inputs, ssb.selection()).with_context(|| {
                format!("Failed to load SSB results from {}", inputs.dir.display())
            })?;
            let figures = tables
                .figures(&settings, &palette)
                .context("Failed to build SSB figures")?;
            (tables.named(), figures)
        }
    };

    info!("Loaded {} table(s)", tables.len());

    if config.general.dump_tables {
        dump_tables(&mut writer, &tables)?;
    }

    println!("\n📊 Generating diagrams...");
    save_figures(&mut writer, &figures, args.quiet)?;

    manifest.record_files(writer.written());
    let manifest = manifest.finish(start_time.elapsed().as_secs_f64());
    let manifest_path = writer
        .write_json(MANIFEST_NAME, &manifest)
        .context("Failed to write run manifest")?;

    println!("\n✅ {}", generate_summary(&manifest));
    if let Some(dir) = writer.output_dir() {
        println!("   Output: {}", dir.display());
    }
    debug!("Manifest at {}", manifest_path.display());

    Ok(())
}

fn dump_tables(writer: &mut FigureWriter, tables: &[NamedTable]) -> Result<()> {
    for named in tables {
        writer
            .write_json(&named.name, &named.table)
            .with_context(|| format!("Failed to dump table {}", named.name))?;
    }
    Ok(())
}

/// Draw and save every figure behind a progress bar.
fn save_figures(writer: &mut FigureWriter, figures: &[Figure], quiet: bool) -> Result<()> {
    let pb = if quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(figures.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("#>-"),
        );
        pb
    };

    for figure in figures {
        pb.set_message(figure.name.clone());
        writer
            .save(figure)
            .with_context(|| format!("Failed to save figure {}", figure.name))?;
        pb.inc(1);
    }

    pb.finish_and_clear();
    Ok(())
}
