// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 PCC Arena Contributors

use std::path::Path;

use super::{Codec, CodecContext};
use crate::config::AlgorithmConfig;
use crate::error::Result;
use crate::evaluation::runner::ToolCommand;

/// PCL octree compression. One binary, mode `0` encodes and `1` decodes.
#[derive(Debug, Clone)]
pub struct Pcl {
    name: String,
    bin_suffix: String,
    program: String,
    point_res: String,
    octree_res: String,
    do_voxel: String,
    color_res: String,
}

impl Pcl {
    pub fn from_config(name: &str, config: &AlgorithmConfig, rate: &str) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            bin_suffix: config.bin_suffix.clone(),
            program: config.setting("encoder")?,
            point_res: config.rate_param(rate, "point_res")?,
            octree_res: config.rate_param(rate, "octree_res")?,
            do_voxel: config.rate_param(rate, "do_voxel")?,
            color_res: config.rate_param(rate, "color_res")?,
        })
    }

    fn command(&self, from: &Path, to: &Path, mode: &str, ctx: &CodecContext) -> ToolCommand {
        ToolCommand::new(&self.program)
            .arg(from)
            .arg(to)
            .arg(mode)
            .arg(&self.point_res)
            .arg(&self.octree_res)
            .arg(&self.do_voxel)
            .arg(if ctx.color { "1" } else { "0" })
            .arg(&self.color_res)
    }
}

impl Codec for Pcl {
    fn name(&self) -> &str {
        &self.name
    }

    fn bin_suffix(&self) -> &str {
        &self.bin_suffix
    }

    fn encode_command(&self, input: &Path, bin: &Path, ctx: &CodecContext) -> Result<ToolCommand> {
        Ok(self.command(input, bin, "0", ctx))
    }

    fn decode_command(&self, bin: &Path, output: &Path, ctx: &CodecContext) -> Result<ToolCommand> {
        Ok(self.command(bin, output, "1", ctx))
    }
}
