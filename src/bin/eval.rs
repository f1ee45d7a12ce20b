// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 PCC Arena Contributors

//! Single-sample evaluator
//!
//! Measures one reconstructed point cloud against its source and prints
//! or writes the evaluation report.

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use pcc_arena::evaluation::{Evaluator, SampleInput, ToolRunner};
use pcc_arena::ArenaConfig;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pcc-arena-eval")]
#[command(about = "Evaluate one reconstructed point cloud against its source", long_about = None)]
struct Cli {
    /// Source point cloud
    reference: PathBuf,

    /// Reconstructed point cloud
    target: PathBuf,

    /// Evaluation resolution; computed from the reference when omitted
    #[arg(long)]
    resolution: Option<f64>,

    /// Encoding time in seconds
    #[arg(long, value_name = "SECONDS")]
    enc_time: Option<f64>,

    /// Decoding time in seconds
    #[arg(long, value_name = "SECONDS")]
    dec_time: Option<f64>,

    /// Compressed binary file(s), repeatable
    #[arg(long = "bin", value_name = "FILE")]
    binaries: Vec<PathBuf>,

    /// Also write the report to this file
    #[arg(long, value_name = "FILE")]
    log: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Configuration file providing the tool paths
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "pcc_arena=debug" } else { "pcc_arena=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&cli) {
        eprintln!("{} {:#}", "✗".red(), e);
        std::process::exit(1);
    }
}

fn seconds(value: Option<f64>) -> Result<Option<Duration>> {
    value
        .map(|s| Duration::try_from_secs_f64(s).context("timings must be non-negative seconds"))
        .transpose()
}

fn run(cli: &Cli) -> Result<()> {
    let config = ArenaConfig::load(cli.config.as_deref())?;
    let evaluator = Evaluator::new(config.tools, ToolRunner::new(config.diagnostics_dir));

    let mut input = SampleInput::new(&cli.reference, &cli.target);
    input.encode_time = seconds(cli.enc_time)?;
    input.decode_time = seconds(cli.dec_time)?;
    input.resolution = cli.resolution;
    if !cli.binaries.is_empty() {
        input = input.with_binaries(cli.binaries.clone());
    }

    let report = evaluator
        .evaluate(&input)
        .with_context(|| format!("Failed to evaluate {}", cli.target.display()))?;

    if cli.json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report.render());
    }
    if let Some(path) = &cli.log {
        report
            .write(path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        eprintln!("{} {}", "✓".green(), path.display().to_string().cyan());
    }
    Ok(())
}
