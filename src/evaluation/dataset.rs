// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 PCC Arena Contributors

//! Dataset discovery and experiment directory layout

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::DatasetConfig;
use crate::error::{ArenaError, Result};

/// Discover sample point clouds, as paths relative to the dataset root
pub fn discover_samples(dataset: &DatasetConfig) -> Result<Vec<PathBuf>> {
    let root = &dataset.dataset_dir;
    if !root.is_dir() {
        return Err(ArenaError::MissingInput(root.clone()));
    }

    let mut samples: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .is_some_and(|ext| ext == dataset.extension.as_str())
        })
        .filter_map(|e| e.path().strip_prefix(root).ok().map(Path::to_path_buf))
        .filter(|rel| dataset.matches_filter(rel))
        .collect();

    samples.sort();
    Ok(samples)
}

/// `<experiment_dir>/<algorithm>/<dataset>/<rate>` with `bin/`, `dec/` and `evl/`
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentLayout {
    pub root: PathBuf,
}

impl ExperimentLayout {
    pub fn new(experiment_dir: &Path, algorithm: &str, dataset: &str, rate: &str) -> Self {
        Self {
            root: experiment_dir.join(algorithm).join(dataset).join(rate),
        }
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }

    pub fn dec_dir(&self) -> PathBuf {
        self.root.join("dec")
    }

    pub fn evl_dir(&self) -> PathBuf {
        self.root.join("evl")
    }

    /// Create the three output directories
    pub fn create(&self) -> Result<()> {
        for dir in [self.bin_dir(), self.dec_dir(), self.evl_dir()] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

/// Append `.suffix` to the full file name: `a/b.ply` + `bin` → `a/b.ply.bin`
pub fn append_extension(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}
