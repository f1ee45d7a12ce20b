// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 PCC Arena Contributors

//! Experiment coordinator - runs one codec over one dataset at one rate

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, warn};

use crate::codecs::{build_codec, Codec, CodecContext};
use crate::config::{ArenaConfig, DatasetConfig};
use crate::evaluation::dataset::{discover_samples, ExperimentLayout};
use crate::evaluation::evaluator::{Evaluator, SampleInput};
use crate::evaluation::reporter::{Reporter, RunReport, SampleFailure};
use crate::evaluation::runner::ToolRunner;
use crate::evaluation::summary::summarize_experiment_leaf;
use crate::gpu::GpuPool;

/// Outcome of one sample in the parallel phase
enum SampleOutcome {
    Done,
    Failed(crate::ArenaError),
    /// Not attempted because a debug-mode run was already aborting
    Skipped,
}

/// Shared state of one run
struct RunContext<'a> {
    codec: &'a dyn Codec,
    dataset: &'a DatasetConfig,
    layout: &'a ExperimentLayout,
    runner: &'a ToolRunner,
    evaluator: &'a Evaluator,
    gpus: Option<&'a GpuPool>,
}

/// Experiment coordinator
pub struct ExperimentCoordinator {
    config: ArenaConfig,
    show_progress: bool,
}

impl ExperimentCoordinator {
    /// Create a new coordinator
    pub fn new(config: ArenaConfig) -> Self {
        Self {
            config,
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    /// Run several rate points one after the other
    pub fn run_rates(&self, algorithm: &str, dataset: &str, rates: &[String]) -> Result<Vec<RunReport>> {
        rates
            .iter()
            .map(|rate| self.run(algorithm, dataset, rate))
            .collect()
    }

    /// Encode, decode and evaluate every sample, then aggregate the reports
    pub fn run(&self, algorithm: &str, dataset: &str, rate: &str) -> Result<RunReport> {
        let alg_config = self.config.algorithm(algorithm)?;
        let ds_config = self.config.dataset(dataset)?;
        let codec = build_codec(algorithm, alg_config, rate)
            .with_context(|| format!("Failed to set up {} at rate {}", algorithm, rate))?;

        let layout = ExperimentLayout::new(&self.config.experiment_dir, algorithm, dataset, rate);
        layout.create()?;
        let samples = discover_samples(ds_config)
            .with_context(|| format!("Failed to discover samples of dataset {}", dataset))?;

        let gpus = if codec.uses_gpu() {
            Some(GpuPool::new(self.config.gpus.iter().copied())?)
        } else {
            None
        };
        let threads = match &gpus {
            Some(pool) => pool.capacity(),
            None => self.config.parallelism.unwrap_or(0),
        };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .context("Failed to build worker pool")?;

        let runner = ToolRunner::new(&self.config.diagnostics_dir);
        let evaluator = Evaluator::new(self.config.tools.clone(), runner.clone());
        let ctx = RunContext {
            codec: codec.as_ref(),
            dataset: ds_config,
            layout: &layout,
            runner: &runner,
            evaluator: &evaluator,
            gpus: gpus.as_ref(),
        };

        info!(
            algorithm,
            dataset,
            rate,
            samples = samples.len(),
            workers = pool.current_num_threads(),
            "starting run"
        );

        let pb = if self.show_progress {
            let p = ProgressBar::new(samples.len() as u64);
            p.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
                    .context("Invalid progress template")?
                    .progress_chars("#>-"),
            );
            Some(p)
        } else {
            None
        };

        let aborting = AtomicBool::new(false);
        let outcomes: Vec<(PathBuf, SampleOutcome)> = pool.install(|| {
            samples
                .par_iter()
                .map(|relative| {
                    if self.config.debug && aborting.load(Ordering::SeqCst) {
                        return (relative.clone(), SampleOutcome::Skipped);
                    }
                    let outcome = match process_sample(&ctx, relative) {
                        Ok(()) => SampleOutcome::Done,
                        Err(e) => {
                            if self.config.debug {
                                aborting.store(true, Ordering::SeqCst);
                            }
                            SampleOutcome::Failed(e)
                        }
                    };
                    if let Some(ref p) = pb {
                        p.inc(1);
                    }
                    (relative.clone(), outcome)
                })
                .collect()
        });

        if let Some(p) = pb {
            p.finish();
        }

        // every worker has finished; aggregation starts here
        let mut report = RunReport::new(algorithm, dataset, rate);
        for (relative, outcome) in outcomes {
            let sample = relative.to_string_lossy().into_owned();
            match outcome {
                SampleOutcome::Done => report.add_success(),
                SampleOutcome::Skipped => {}
                SampleOutcome::Failed(e) if self.config.debug => {
                    error!(sample = %sample, error = %e, "sample failed, aborting run");
                    return Err(anyhow::Error::new(e).context(format!("Sample {} failed", sample)));
                }
                SampleOutcome::Failed(e) => {
                    warn!(sample = %sample, error = %e, "sample failed");
                    report.add_failure(SampleFailure {
                        sample,
                        diagnostic: e.diagnostic().cloned(),
                        error: e.to_string(),
                    });
                }
            }
        }

        let outputs = summarize_experiment_leaf(&layout.evl_dir(), ds_config.color)
            .context("Failed to summarize evaluation logs")?;
        report.summary_log = Some(outputs.log);

        Reporter::write_json(&report, &layout.root.join("run_report.json"))?;
        Reporter::write_markdown(&report, &layout.root.join("run_report.md"))?;

        info!(
            algorithm,
            dataset,
            rate,
            succeeded = report.succeeded,
            failed = report.failed,
            "run finished"
        );
        Ok(report)
    }
}

/// One sample end to end: encode, decode, evaluate, write the report
fn process_sample(ctx: &RunContext<'_>, relative: &Path) -> crate::Result<()> {
    let paths = ctx.codec.sample_paths(ctx.layout, relative);
    paths.create_parents()?;
    // a report left by an earlier run must not outlive a failure in this one
    match std::fs::remove_file(&paths.log) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(e.into()),
        _ => {}
    }
    let input = ctx.dataset.dataset_dir.join(relative);

    // held across encode and decode, returned on every exit path
    let lease = ctx.gpus.map(GpuPool::acquire);
    let codec_ctx = CodecContext {
        color: ctx.dataset.color,
        resolution: ctx.dataset.resolution,
        gpu: lease.as_ref().map(|l| l.id()),
    };
    let encode_time = ctx.codec.encode(ctx.runner, &input, &paths.bin, &codec_ctx)?;
    let decode_time = ctx.codec.decode(ctx.runner, &paths.bin, &paths.output, &codec_ctx)?;
    drop(lease);

    let mut sample = SampleInput::new(ctx.dataset.reference_for(relative), &paths.output)
        .with_timings(encode_time, decode_time)
        .with_binaries(ctx.codec.binary_files(&paths.bin)?);
    sample.resolution = ctx.dataset.resolution;

    let report = ctx.evaluator.evaluate(&sample)?;
    report.write(&paths.log)
}
