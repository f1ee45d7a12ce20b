// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 PCC Arena Contributors

//! Evaluation pipeline: per-sample reports, dataset summaries and
//! cross-experiment collation

pub mod collate;
pub mod dataset;
pub mod evaluator;
pub mod metrics;
pub mod parser;
pub mod reporter;
pub mod runner;
pub mod stats;
pub mod summary;

pub use collate::{collate, write_global_table, CollatedRow, GlobalTable};
pub use dataset::{discover_samples, ExperimentLayout};
pub use evaluator::{Evaluator, SampleInput, SampleReport};
pub use metrics::{Capabilities, MetricField, MetricValue};
pub use parser::{find_value, parse_metrics};
pub use reporter::{Reporter, RunReport, SampleFailure};
pub use runner::{ToolCommand, ToolOutput, ToolRunner};
pub use stats::{StatSummary, Statistic};
pub use summary::{
    summarize_dir, summarize_experiment_leaf, write_summary_outputs, DatasetSummary,
    SummaryOutputs,
};
