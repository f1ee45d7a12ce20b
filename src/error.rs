// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 PCC Arena Contributors

//! Error taxonomy shared by the evaluation pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the metric pipeline and the tool wrappers
#[derive(Debug, Error)]
pub enum ArenaError {
    /// An external binary failed to launch, exited non-zero, or printed
    /// nothing the pipeline could use
    #[error("`{command}` {reason}")]
    ToolInvocation {
        command: String,
        reason: String,
        diagnostic: Option<PathBuf>,
    },

    /// A label matched but the token after it is not a value
    #[error("cannot parse {token:?} after label {label:?}")]
    Parse { label: String, token: String },

    #[error("point cloud not found: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("invalid point cloud {}: {reason}", path.display())]
    PointCloud { path: PathBuf, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ArenaError {
    /// Path of the diagnostic file written for a failed tool run
    pub fn diagnostic(&self) -> Option<&PathBuf> {
        match self {
            ArenaError::ToolInvocation { diagnostic, .. } => diagnostic.as_ref(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ArenaError>;
