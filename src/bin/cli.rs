// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 PCC Arena Contributors

//! PCC Arena CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use pcc_arena::evaluation::{collate, summarize_dir, write_global_table, write_summary_outputs, RunReport};
use pcc_arena::{ArenaConfig, ExperimentCoordinator};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pcc-arena")]
#[command(about = "Benchmarking harness for point cloud compression codecs", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./arena.toml when present)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode, decode and evaluate a dataset with one algorithm
    Run {
        /// Algorithm name from the configuration
        #[arg(short, long)]
        algorithm: String,

        /// Dataset name from the configuration
        #[arg(short, long)]
        dataset: String,

        /// Rate points (comma-separated); all configured rates when omitted
        #[arg(short, long, value_delimiter = ',')]
        rates: Vec<String>,

        /// Abort on the first failed sample
        #[arg(long)]
        debug: bool,

        /// Worker count for CPU codecs
        #[arg(short, long)]
        jobs: Option<usize>,
    },

    /// Aggregate a directory of evaluation reports
    Summarize {
        /// Directory holding the per-sample reports
        evl_dir: PathBuf,

        /// Reports carry color metrics
        #[arg(long)]
        color: bool,

        /// Output directory (defaults to the parent of the report directory)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Output file stem
        #[arg(short, long, default_value = "dataset")]
        name: String,
    },

    /// Merge every summary under an experiment root into one table
    Collate {
        /// Experiment root directory
        root: PathBuf,

        /// Output directory (defaults to the root)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Write a starter configuration file
    InitConfig {
        #[arg(short, long, default_value = "arena.toml")]
        output: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = dispatch(&cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "pcc_arena=debug" } else { "pcc_arena=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn dispatch(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Run {
            algorithm,
            dataset,
            rates,
            debug,
            jobs,
        } => run_command(cli.config.as_deref(), algorithm, dataset, rates, *debug, *jobs),
        Commands::Summarize {
            evl_dir,
            color,
            out,
            name,
        } => summarize_command(evl_dir, *color, out.as_deref(), name),
        Commands::Collate { root, out } => collate_command(root, out.as_deref()),
        Commands::InitConfig { output } => init_config_command(output),
    }
}

fn run_command(
    config_path: Option<&Path>,
    algorithm: &str,
    dataset: &str,
    rates: &[String],
    debug: bool,
    jobs: Option<usize>,
) -> Result<()> {
    let mut config = ArenaConfig::load(config_path)?;
    config.debug |= debug;
    if jobs.is_some() {
        config.parallelism = jobs;
    }

    let rates = if rates.is_empty() {
        config.algorithm(algorithm)?.rate_names()
    } else {
        rates.to_vec()
    };
    if rates.is_empty() {
        anyhow::bail!("algorithm `{}` has no rate points configured", algorithm);
    }

    println!(
        "{} {} on {} ({})",
        "Running".bold(),
        algorithm.cyan(),
        dataset.cyan(),
        rates.join(", ")
    );

    let coordinator = ExperimentCoordinator::new(config).with_progress(true);
    let reports = coordinator.run_rates(algorithm, dataset, &rates)?;

    let mut failed = 0;
    for report in &reports {
        print_run_summary(report);
        failed += report.failed;
    }
    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn print_run_summary(report: &RunReport) {
    println!("\n{}", "═".repeat(60).bright_black());
    println!(
        "{} {}/{}/{}",
        "Run".bold(),
        report.algorithm,
        report.dataset,
        report.rate
    );
    println!("{}", "═".repeat(60).bright_black());
    println!("  {} {}", "Samples:".bright_black(), report.total.to_string().cyan());
    println!(
        "  {} {} ({:.1}%)",
        "Succeeded:".bright_black(),
        report.succeeded.to_string().green(),
        report.success_rate()
    );
    println!(
        "  {} {}",
        "Failed:".bright_black(),
        if report.failed > 0 {
            report.failed.to_string().red()
        } else {
            report.failed.to_string().green()
        }
    );
    for failure in &report.failures {
        println!("    {} {}", "✗".red(), failure.sample);
        println!("       {}", failure.error.bright_black());
        if let Some(diagnostic) = &failure.diagnostic {
            println!("       {}", diagnostic.display().to_string().bright_black());
        }
    }
    if let Some(summary) = &report.summary_log {
        println!("  {} {}", "Summary:".bright_black(), summary.display().to_string().cyan());
    }
}

fn summarize_command(evl_dir: &Path, color: bool, out: Option<&Path>, name: &str) -> Result<()> {
    let summary = summarize_dir(evl_dir, color)
        .with_context(|| format!("Failed to summarize {}", evl_dir.display()))?;
    let out_dir = match out {
        Some(dir) => dir.to_path_buf(),
        None => evl_dir.parent().unwrap_or(evl_dir).to_path_buf(),
    };
    let outputs = write_summary_outputs(&summary, &out_dir, name)?;

    println!("{} {} reports", "✓".green(), summary.samples.len());
    println!("  {} {}", "CSV:".bright_black(), outputs.csv.display().to_string().cyan());
    println!("  {} {}", "Log:".bright_black(), outputs.log.display().to_string().cyan());
    println!("  {} {}", "JSON:".bright_black(), outputs.json.display().to_string().cyan());
    Ok(())
}

fn collate_command(root: &Path, out: Option<&Path>) -> Result<()> {
    let table = collate(root).with_context(|| format!("Failed to collate {}", root.display()))?;
    let outputs = write_global_table(&table, out.unwrap_or(root))?;

    println!("{} {} experiments", "✓".green(), table.rows.len());
    println!("  {} {}", "CSV:".bright_black(), outputs.csv.display().to_string().cyan());
    println!("  {} {}", "JSON:".bright_black(), outputs.json.display().to_string().cyan());
    Ok(())
}

fn init_config_command(output: &Path) -> Result<()> {
    if output.exists() {
        anyhow::bail!("{} already exists", output.display());
    }
    ArenaConfig::example().save(output)?;
    println!("{} Wrote {}", "✓".green(), output.display());
    Ok(())
}
