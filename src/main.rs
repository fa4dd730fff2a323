use clap::Parser;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::PathBuf;

mod cli;
mod commands;
mod config;
mod layout;
mod merge;
mod persona;
mod similarity;

use cli::{Cli, Commands, OutputFormat};
use config::{Config, LogLevel};

fn setup_logging(log_level: &LogLevel, verbose: bool) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("persona-lab")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("persona-lab.log");

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    // RUST_LOG env var takes precedence, then --verbose, then config log_level
    let mut builder = env_logger::Builder::new();
    let from_env = std::env::var("RUST_LOG").is_ok();

    if from_env {
        builder.parse_default_env();
    } else if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    } else {
        builder.filter_level(match log_level {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Off => log::LevelFilter::Off,
        });
    }

    builder.target(env_logger::Target::Pipe(target)).init();

    info!("Logging initialized, writing to: {}", log_file.display());
    info!(
        "Log level: {} (from {})",
        log_level.as_filter(),
        if from_env { "RUST_LOG env" } else { "config" }
    );
    Ok(())
}

fn run(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Persona { action } => commands::persona::run(action, &config),
        Commands::Similarity { min, format } => commands::similarity::run_all(min, OutputFormat::resolve(format), &config),
        Commands::Similar { slug, top, format } => {
            commands::similarity::run_neighbors(&slug, top, OutputFormat::resolve(format), &config)
        }
        Commands::Layout {
            overrides,
            edges,
            format,
        } => commands::layout::run(overrides, edges.as_deref(), OutputFormat::resolve(format), &config),
        Commands::Merge {
            sources,
            strategy,
            weights,
            save,
            name,
            slug,
            description,
            format,
        } => commands::merge::run(
            commands::merge::MergeArgs {
                sources,
                strategy,
                weights,
                save,
                name,
                slug,
                description,
                format: OutputFormat::resolve(format),
                quiet: cli.quiet,
            },
            &config,
        ),
        Commands::Config { action } => commands::config::run(action, &config),
        Commands::Completions { shell } => commands::completions::run(shell),
    }
}

fn main() -> Result<()> {
    // Parse CLI arguments first
    let cli = Cli::parse();

    // Load configuration (before logging, so log messages in Config::load are silent)
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(&config.log_level, cli.verbose).context("Failed to setup logging")?;

    info!("Starting persona-lab with config from: {:?}", cli.config);
    info!("Personas directory: {}", config.personas_dir().display());

    run(cli, config).context("Command failed")?;

    Ok(())
}
