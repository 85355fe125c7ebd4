//! unitest-pool - parallel test scheduler
//!
//! A CLI front end for the scheduler library.
//!
//! ## Usage
//!
//! ```bash
//! # Run the built-in smoke plan on worker threads
//! unitest-pool probe --workers 4
//!
//! # Same plan on the cooperative backend, as JSON
//! unitest-pool probe --backend cooperative --format json
//!
//! # Show the effective configuration
//! unitest-pool --config pool.yaml config
//! ```

use anyhow::{bail, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::sync::Arc;
use tracing::{info, warn};

use unitest_pool::cli::{self, Args};
use unitest_pool::config::{EnvConfig, PoolConfig};
use unitest_pool::executor::{Backend, PoolScheduler};
use unitest_pool::models::RunSummary;
use unitest_pool::output::{OutputFormat, ResultFormatter};
use unitest_pool::probe::{smoke_plan, smoke_registry};
use unitest_pool::utils::{init_logger, LogLevel};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    let level = if args.verbose {
        LogLevel::Debug
    } else {
        config.log_level
    };
    init_logger(level);

    match args.command {
        cli::Command::Probe(probe_args) => {
            run_probe(probe_args, config).await?;
        }
        cli::Command::Config(config_args) => {
            show_config(config_args, &config)?;
        }
    }

    Ok(())
}

/// Config file (flag, then UNITEST_CONFIG), then environment overrides
fn load_config(path: Option<&str>) -> Result<PoolConfig> {
    let env = EnvConfig::load();

    let config = match path.or(env.config_file.as_deref()) {
        Some(path) => PoolConfig::load(path)?,
        None => PoolConfig::default(),
    };

    let config = env.apply(config);
    config.validate()?;
    Ok(config)
}

async fn run_probe(args: cli::ProbeArgs, mut config: PoolConfig) -> Result<()> {
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if let Some(name) = args.backend.as_deref() {
        config.backend =
            Backend::from_str(name).ok_or_else(|| anyhow::anyhow!("Unknown backend: {name}"))?;
    }
    if args.check_results {
        config.check_results = true;
    }

    let format = OutputFormat::from_str(&args.format).unwrap_or_else(|| {
        warn!("Unknown output format '{}', using table", args.format);
        OutputFormat::Table
    });

    let scheduler = PoolScheduler::new(Arc::new(smoke_registry()), config.pool_options());
    let run = scheduler.start(smoke_plan());
    let expected = run.expected();
    info!("Probe started: {} tests", expected);

    let results = run.collect().await?;
    let stats = run.finish().await?;
    let summary = RunSummary::new(&results);

    let formatter = ResultFormatter::new(format).with_color(std::io::stdout().is_terminal());
    println!("{}", formatter.format_run(&results, &summary));
    info!(
        "Probe finished on {} ({} workers spawned, {} crashes, {} batches on fallback)",
        stats.backend, stats.workers_spawned, stats.crashes, stats.fallback_batches
    );

    if summary.total != expected {
        bail!("Probe expected {} results, got {}", expected, summary.total);
    }
    Ok(())
}

fn show_config(args: cli::ConfigArgs, config: &PoolConfig) -> Result<()> {
    match args.output {
        Some(path) => {
            config.save(&path)?;
            println!("Configuration written to {path}");
        }
        None => print!("{}", serde_yaml::to_string(config)?),
    }
    Ok(())
}
