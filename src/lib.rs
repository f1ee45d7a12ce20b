// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 PCC Arena Contributors

//! PCC Arena
//!
//! Benchmarking harness for point cloud compression codecs. Drives the
//! codecs' command-line tools over a dataset, measures each reconstruction
//! against its source with `pc_error`, and aggregates the per-sample
//! reports into dataset summaries and one global table.

pub mod arena;
pub mod codecs;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod gpu;
pub mod pointcloud;

pub use arena::ExperimentCoordinator;
pub use codecs::{build_codec, Codec, CodecContext};
pub use config::{AlgorithmConfig, ArenaConfig, CodecKind, DatasetConfig, ToolsConfig};
pub use error::{ArenaError, Result};
pub use evaluation::{Evaluator, MetricValue, SampleInput, SampleReport};
pub use gpu::{GpuLease, GpuPool};
