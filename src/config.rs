// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 PCC Arena Contributors

//! Arena configuration: tools, datasets, algorithms and rate points

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::ArenaError;

/// Default configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "arena.toml";

/// Top-level arena configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Root of `<algorithm>/<dataset>/<rate>` experiment trees
    pub experiment_dir: PathBuf,
    /// Where failed tool invocations leave their diagnostic files
    pub diagnostics_dir: PathBuf,
    /// Maximum parallel workers
    pub parallelism: Option<usize>,
    /// Abort a run on the first failed sample
    pub debug: bool,
    pub tools: ToolsConfig,
    /// GPU device ids available to GPU-bound codecs
    pub gpus: Vec<u32>,
    pub datasets: BTreeMap<String, DatasetConfig>,
    pub algorithms: BTreeMap<String, AlgorithmConfig>,
}

/// Paths of the external metric tools
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Distortion calculator (`pc_error`)
    pub pc_error: PathBuf,
    /// Diameter tool used when no resolution is configured
    pub gdiam: PathBuf,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            pc_error: PathBuf::from("pc_error"),
            gdiam: PathBuf::from("gdiam"),
        }
    }
}

/// A dataset of reference point clouds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub dataset_dir: PathBuf,
    #[serde(default = "default_extension")]
    pub extension: String,
    /// Substrings a relative sample path must contain; empty selects all
    #[serde(default)]
    pub filters: Vec<String>,
    #[serde(default)]
    pub color: bool,
    /// Evaluation resolution; computed per sample when absent
    #[serde(default)]
    pub resolution: Option<f64>,
    /// Mirror of `dataset_dir` holding references with normals
    #[serde(default)]
    pub normal_dir: Option<PathBuf>,
}

fn default_extension() -> String {
    "ply".to_string()
}

impl DatasetConfig {
    pub fn new(dataset_dir: impl Into<PathBuf>) -> Self {
        Self {
            dataset_dir: dataset_dir.into(),
            extension: default_extension(),
            filters: Vec::new(),
            color: false,
            resolution: None,
            normal_dir: None,
        }
    }

    /// Check if a relative sample path matches filters
    pub fn matches_filter(&self, relative: &Path) -> bool {
        if self.filters.is_empty() {
            return true;
        }
        let path_str = relative.to_string_lossy();
        self.filters.iter().any(|filter| path_str.contains(filter.as_str()))
    }

    /// Reference used for evaluation: the normal-carrying copy when configured
    pub fn reference_for(&self, relative: &Path) -> PathBuf {
        match &self.normal_dir {
            Some(dir) => dir.join(relative),
            None => self.dataset_dir.join(relative),
        }
    }
}

/// Codec family an algorithm entry is run with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodecKind {
    Draco,
    Gpcc,
    Vpcc,
    Pcl,
    GeoCnnV1,
    GeoCnnV2,
    PcgcV1,
    PcgcV2,
}

/// An algorithm: codec kind, fixed settings and per-rate parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmConfig {
    pub kind: CodecKind,
    /// Extension of the compressed binary, without the dot
    #[serde(default = "default_bin_suffix")]
    pub bin_suffix: String,
    /// Working directory for codecs that resolve relative paths
    #[serde(default)]
    pub rootdir: Option<PathBuf>,
    #[serde(default)]
    pub settings: BTreeMap<String, toml::Value>,
    #[serde(default)]
    pub rates: BTreeMap<String, BTreeMap<String, toml::Value>>,
}

fn default_bin_suffix() -> String {
    "bin".to_string()
}

/// Render a TOML scalar as a command-line token
pub fn value_to_arg(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        toml::Value::Integer(i) => i.to_string(),
        toml::Value::Float(f) => f.to_string(),
        toml::Value::Boolean(b) => String::from(if *b { "1" } else { "0" }),
        other => other.to_string(),
    }
}

impl AlgorithmConfig {
    pub fn new(kind: CodecKind) -> Self {
        Self {
            kind,
            bin_suffix: default_bin_suffix(),
            rootdir: None,
            settings: BTreeMap::new(),
            rates: BTreeMap::new(),
        }
    }

    /// Fixed setting rendered as an argument
    pub fn setting(&self, key: &str) -> crate::Result<String> {
        self.settings
            .get(key)
            .map(value_to_arg)
            .ok_or_else(|| ArenaError::Config(format!("missing setting `{}`", key)))
    }

    pub fn setting_or(&self, key: &str, default: &str) -> String {
        self.settings
            .get(key)
            .map(value_to_arg)
            .unwrap_or_else(|| default.to_string())
    }

    /// Parameter `key` of rate point `rate`
    pub fn rate_param(&self, rate: &str, key: &str) -> crate::Result<String> {
        let params = self
            .rates
            .get(rate)
            .ok_or_else(|| ArenaError::Config(format!("unknown rate point `{}`", rate)))?;
        params.get(key).map(value_to_arg).ok_or_else(|| {
            ArenaError::Config(format!("rate point `{}` has no parameter `{}`", rate, key))
        })
    }

    pub fn rate_names(&self) -> Vec<String> {
        self.rates.keys().cloned().collect()
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            experiment_dir: PathBuf::from("experiments"),
            diagnostics_dir: PathBuf::from("logs"),
            parallelism: None, // Auto-detect
            debug: false,
            tools: ToolsConfig::default(),
            gpus: Vec::new(),
            datasets: BTreeMap::new(),
            algorithms: BTreeMap::new(),
        }
    }
}

impl ArenaConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config: ArenaConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::from_file(DEFAULT_CONFIG_FILE)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(pc_error) = std::env::var("PCC_ARENA_PC_ERROR") {
            self.tools.pc_error = PathBuf::from(pc_error);
        }

        if let Ok(gdiam) = std::env::var("PCC_ARENA_GDIAM") {
            self.tools.gdiam = PathBuf::from(gdiam);
        }

        if let Ok(dir) = std::env::var("PCC_ARENA_EXPERIMENT_DIR") {
            self.experiment_dir = PathBuf::from(dir);
        }

        if let Ok(parallelism) = std::env::var("PCC_ARENA_PARALLELISM") {
            self.parallelism = parallelism.parse().ok();
        }

        if let Ok(debug) = std::env::var("PCC_ARENA_DEBUG") {
            self.debug = matches!(debug.as_str(), "1" | "true" | "yes");
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config file: {:?}", path.as_ref()))?;
        Ok(())
    }

    pub fn dataset(&self, name: &str) -> crate::Result<&DatasetConfig> {
        self.datasets
            .get(name)
            .ok_or_else(|| ArenaError::Config(format!("unknown dataset `{}`", name)))
    }

    pub fn algorithm(&self, name: &str) -> crate::Result<&AlgorithmConfig> {
        self.algorithms
            .get(name)
            .ok_or_else(|| ArenaError::Config(format!("unknown algorithm `{}`", name)))
    }

    /// Starter configuration written by `init-config`
    pub fn example() -> Self {
        let mut config = Self::default();
        config.gpus = vec![0];

        let mut dataset = DatasetConfig::new("datasets/modelnet40");
        dataset.resolution = Some(1.0);
        config.datasets.insert("modelnet40".to_string(), dataset);

        let mut draco = AlgorithmConfig::new(CodecKind::Draco);
        draco.bin_suffix = "drc".to_string();
        draco
            .settings
            .insert("encoder".to_string(), toml::Value::String("draco_encoder".into()));
        draco
            .settings
            .insert("decoder".to_string(), toml::Value::String("draco_decoder".into()));
        for (rate, qp) in [("r1", 6), ("r2", 8), ("r3", 10), ("r4", 12)] {
            let mut params = BTreeMap::new();
            params.insert("qp".to_string(), toml::Value::Integer(qp));
            params.insert("qt".to_string(), toml::Value::Integer(10));
            params.insert("qn".to_string(), toml::Value::Integer(10));
            params.insert("qg".to_string(), toml::Value::Integer(8));
            params.insert("cl".to_string(), toml::Value::Integer(10));
            draco.rates.insert(rate.to_string(), params);
        }
        config.algorithms.insert("draco".to_string(), draco);
        config
    }
}
