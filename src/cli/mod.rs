//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{Parser, Subcommand};

/// Parallel test scheduler with worker-thread isolation
#[derive(Parser, Debug)]
#[command(name = "unitest-pool")]
#[command(version)]
#[command(about = "Run test batches across isolated worker threads")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (YAML or JSON)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the built-in smoke plan through the scheduler
    Probe(ProbeArgs),

    /// Show or write the effective configuration
    Config(ConfigArgs),
}

/// Arguments for the probe command
#[derive(Parser, Debug)]
pub struct ProbeArgs {
    /// Number of workers
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Backend (auto, worker_threads, cooperative)
    #[arg(short, long)]
    pub backend: Option<String>,

    /// Fail tests that return an error value
    #[arg(long)]
    pub check_results: bool,

    /// Output format (table, json, json-pretty, summary)
    #[arg(short, long, default_value = "table")]
    pub format: String,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Write the effective configuration to this file
    #[arg(short, long)]
    pub output: Option<String>,
}
