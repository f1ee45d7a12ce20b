// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 PCC Arena Contributors

//! Codec wrappers: each variant builds the encode and decode command
//! lines of one external point cloud codec

mod draco;
mod learned;
mod mpeg;
mod pcl;

pub use draco::Draco;
pub use learned::{GeoCnnV1, GeoCnnV2, PcgcV1, PcgcV2};
pub use mpeg::{Gpcc, Vpcc};
pub use pcl::Pcl;

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::{AlgorithmConfig, CodecKind};
use crate::error::Result;
use crate::evaluation::dataset::ExperimentLayout;
use crate::evaluation::runner::{ToolCommand, ToolRunner};

/// Per-sample facts a codec needs to build its command lines
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CodecContext {
    pub color: bool,
    pub resolution: Option<f64>,
    /// Leased GPU, exported as `CUDA_VISIBLE_DEVICES`
    pub gpu: Option<u32>,
}

/// Output locations of one sample inside an experiment layout
#[derive(Debug, Clone, PartialEq)]
pub struct SamplePaths {
    pub bin: PathBuf,
    pub output: PathBuf,
    pub log: PathBuf,
}

impl SamplePaths {
    /// Create the parent directories of every path
    pub fn create_parents(&self) -> Result<()> {
        for path in [&self.bin, &self.output, &self.log] {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}

/// A point cloud codec driven through its command-line tools
pub trait Codec: Send + Sync {
    fn name(&self) -> &str;

    /// Extension of the compressed binary
    fn bin_suffix(&self) -> &str;

    fn uses_gpu(&self) -> bool {
        false
    }

    fn encode_command(&self, input: &Path, bin: &Path, ctx: &CodecContext) -> Result<ToolCommand>;

    fn decode_command(&self, bin: &Path, output: &Path, ctx: &CodecContext) -> Result<ToolCommand>;

    fn sample_paths(&self, layout: &ExperimentLayout, relative: &Path) -> SamplePaths {
        SamplePaths {
            bin: layout.bin_dir().join(relative).with_extension(self.bin_suffix()),
            output: layout.dec_dir().join(relative),
            log: layout.evl_dir().join(relative).with_extension("log"),
        }
    }

    /// Files whose sizes make up the compressed stream
    fn binary_files(&self, bin: &Path) -> Result<Vec<PathBuf>> {
        Ok(vec![bin.to_path_buf()])
    }

    fn encode(&self, runner: &ToolRunner, input: &Path, bin: &Path, ctx: &CodecContext) -> Result<Duration> {
        let tool = with_gpu(self.encode_command(input, bin, ctx)?, ctx);
        Ok(runner.run(&tool)?.elapsed)
    }

    fn decode(&self, runner: &ToolRunner, bin: &Path, output: &Path, ctx: &CodecContext) -> Result<Duration> {
        let tool = with_gpu(self.decode_command(bin, output, ctx)?, ctx);
        Ok(runner.run(&tool)?.elapsed)
    }
}

fn with_gpu(tool: ToolCommand, ctx: &CodecContext) -> ToolCommand {
    match ctx.gpu {
        Some(id) => tool.env("CUDA_VISIBLE_DEVICES", id.to_string()),
        None => tool,
    }
}

/// Instantiate the codec of `algorithm` at rate point `rate`
pub fn build_codec(name: &str, algorithm: &AlgorithmConfig, rate: &str) -> Result<Box<dyn Codec>> {
    let codec: Box<dyn Codec> = match algorithm.kind {
        CodecKind::Draco => Box::new(Draco::from_config(name, algorithm, rate)?),
        CodecKind::Gpcc => Box::new(Gpcc::from_config(name, algorithm, rate)?),
        CodecKind::Vpcc => Box::new(Vpcc::from_config(name, algorithm, rate)?),
        CodecKind::Pcl => Box::new(Pcl::from_config(name, algorithm, rate)?),
        CodecKind::GeoCnnV1 => Box::new(GeoCnnV1::from_config(name, algorithm, rate)?),
        CodecKind::GeoCnnV2 => Box::new(GeoCnnV2::from_config(name, algorithm, rate)?),
        CodecKind::PcgcV1 => Box::new(PcgcV1::from_config(name, algorithm, rate)?),
        CodecKind::PcgcV2 => Box::new(PcgcV2::from_config(name, algorithm, rate)?),
    };
    Ok(codec)
}

#[cfg(test)]
pub(crate) fn args_of(tool: &ToolCommand) -> Vec<String> {
    tool.arguments()
        .iter()
        .map(|a| a.to_string_lossy().into_owned())
        .collect()
}
