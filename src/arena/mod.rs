// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 PCC Arena Contributors

//! Experiment orchestration
//!
//! Runs a codec over a dataset on a worker pool, bounding GPU-bound
//! work by the configured device ids, then aggregates the reports.

pub mod coordinator;

pub use coordinator::ExperimentCoordinator;
