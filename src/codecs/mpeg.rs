// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 PCC Arena Contributors

//! MPEG reference codecs: G-PCC (TMC13) and V-PCC (TMC2)

use std::path::{Path, PathBuf};

use super::{Codec, CodecContext};
use crate::config::AlgorithmConfig;
use crate::error::{ArenaError, Result};
use crate::evaluation::runner::ToolCommand;

/// Geometry-based PCC
#[derive(Debug, Clone)]
pub struct Gpcc {
    name: String,
    bin_suffix: String,
    encoder: String,
    decoder: String,
    position_quantization_scale: String,
}

impl Gpcc {
    pub fn from_config(name: &str, config: &AlgorithmConfig, rate: &str) -> Result<Self> {
        let encoder = config.setting("encoder")?;
        Ok(Self {
            name: name.to_string(),
            bin_suffix: config.bin_suffix.clone(),
            // tmc3 encodes and decodes with one binary
            decoder: config.setting_or("decoder", &encoder),
            encoder,
            position_quantization_scale: config.rate_param(rate, "positionQuantizationScale")?,
        })
    }
}

impl Codec for Gpcc {
    fn name(&self) -> &str {
        &self.name
    }

    fn bin_suffix(&self) -> &str {
        &self.bin_suffix
    }

    fn encode_command(&self, input: &Path, bin: &Path, ctx: &CodecContext) -> Result<ToolCommand> {
        let mut tool = ToolCommand::new(&self.encoder)
            .flag_path("--uncompressedDataPath=", input)
            .flag_path("--compressedStreamPath=", bin)
            .arg(format!(
                "--positionQuantizationScale={}",
                self.position_quantization_scale
            ))
            .arg("--mergeDuplicatedPoints=1")
            .arg("--mode=0");
        if ctx.color {
            tool = tool.arg("--attribute=color");
        }
        Ok(tool)
    }

    fn decode_command(&self, bin: &Path, output: &Path, _ctx: &CodecContext) -> Result<ToolCommand> {
        Ok(ToolCommand::new(&self.decoder)
            .flag_path("--compressedStreamPath=", bin)
            .flag_path("--reconstructedDataPath=", output)
            .arg("--mode=1"))
    }
}

/// Video-based PCC; color point clouds only
#[derive(Debug, Clone)]
pub struct Vpcc {
    name: String,
    bin_suffix: String,
    rootdir: PathBuf,
    encoder: String,
    decoder: String,
    condition_cfg: String,
    rate_cfg: String,
    video_encoder: String,
    video_decoder: String,
    inverse_color_space_cfg: String,
}

impl Vpcc {
    pub fn from_config(name: &str, config: &AlgorithmConfig, rate: &str) -> Result<Self> {
        let rootdir = config
            .rootdir
            .clone()
            .ok_or_else(|| ArenaError::Config(format!("algorithm `{}` needs a rootdir", name)))?;
        Ok(Self {
            name: name.to_string(),
            bin_suffix: config.bin_suffix.clone(),
            rootdir,
            encoder: config.setting("encoder")?,
            decoder: config.setting("decoder")?,
            condition_cfg: config.setting("condition_cfg")?,
            rate_cfg: config.rate_param(rate, "rate_cfg")?,
            video_encoder: config.setting("videoEncoder")?,
            video_decoder: config.setting("videoDecoder")?,
            inverse_color_space_cfg: config.setting("inverseColorSpaceConversionConfig")?,
        })
    }
}

impl Codec for Vpcc {
    fn name(&self) -> &str {
        &self.name
    }

    fn bin_suffix(&self) -> &str {
        &self.bin_suffix
    }

    fn encode_command(&self, input: &Path, bin: &Path, ctx: &CodecContext) -> Result<ToolCommand> {
        if !ctx.color {
            return Err(ArenaError::Config(format!(
                "{} only supports point clouds with color",
                self.name
            )));
        }
        Ok(ToolCommand::new(&self.encoder)
            .flag_path("--uncompressedDataPath=", input)
            .flag_path("--compressedStreamPath=", bin)
            .arg("--configurationFolder=cfg/")
            .arg("--config=cfg/common/ctc-common.cfg")
            .arg(format!("--config={}", self.condition_cfg))
            .arg(format!("--config={}", self.rate_cfg))
            .arg(format!("--videoEncoderOccupancyPath={}", self.video_encoder))
            .arg(format!("--videoEncoderGeometryPath={}", self.video_encoder))
            .arg(format!("--videoEncoderAttributePath={}", self.video_encoder))
            .arg("--frameCount=1")
            .arg("--computeMetrics=0")
            .current_dir(&self.rootdir))
    }

    fn decode_command(&self, bin: &Path, output: &Path, _ctx: &CodecContext) -> Result<ToolCommand> {
        Ok(ToolCommand::new(&self.decoder)
            .flag_path("--compressedStreamPath=", bin)
            .flag_path("--reconstructedDataPath=", output)
            .arg(format!("--videoDecoderOccupancyPath={}", self.video_decoder))
            .arg(format!("--videoDecoderGeometryPath={}", self.video_decoder))
            .arg(format!("--videoDecoderAttributePath={}", self.video_decoder))
            .arg(format!(
                "--inverseColorSpaceConversionConfig={}",
                self.inverse_color_space_cfg
            ))
            .arg("--computeMetrics=0")
            .current_dir(&self.rootdir))
    }
}
