// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 PCC Arena Contributors

//! Learned codecs driven through Python inference scripts. All of them
//! run on a GPU.

use std::fs;
use std::path::{Path, PathBuf};

use super::{Codec, CodecContext, SamplePaths};
use crate::config::AlgorithmConfig;
use crate::error::{ArenaError, Result};
use crate::evaluation::dataset::{append_extension, ExperimentLayout};
use crate::evaluation::runner::ToolCommand;

/// Interpreter and working directory shared by the script-based codecs
#[derive(Debug, Clone)]
struct Interpreter {
    python: String,
    rootdir: Option<PathBuf>,
}

impl Interpreter {
    fn from_config(config: &AlgorithmConfig) -> Self {
        Self {
            python: config.setting_or("python", "python3"),
            rootdir: config.rootdir.clone(),
        }
    }

    fn script(&self, script: &str) -> ToolCommand {
        let tool = ToolCommand::new(&self.python).arg(script);
        match &self.rootdir {
            Some(dir) => tool.current_dir(dir),
            None => tool,
        }
    }
}

fn required_resolution(name: &str, ctx: &CodecContext) -> Result<String> {
    ctx.resolution
        .map(|r| r.to_string())
        .ok_or_else(|| ArenaError::Config(format!("{} needs a dataset resolution", name)))
}

fn parent_of(path: &Path) -> &Path {
    path.parent().unwrap_or_else(|| Path::new("."))
}

macro_rules! codec_basics {
    () => {
        fn name(&self) -> &str {
            &self.name
        }

        fn bin_suffix(&self) -> &str {
            &self.bin_suffix
        }

        fn uses_gpu(&self) -> bool {
            true
        }
    };
}

/// Learned geometry codec v1; its scripts work on directories plus a file pattern
#[derive(Debug, Clone)]
pub struct GeoCnnV1 {
    name: String,
    bin_suffix: String,
    interpreter: Interpreter,
    encoder: String,
    decoder: String,
    checkpoint_dir: String,
}

impl GeoCnnV1 {
    pub fn from_config(name: &str, config: &AlgorithmConfig, rate: &str) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            bin_suffix: config.bin_suffix.clone(),
            interpreter: Interpreter::from_config(config),
            encoder: config.setting("encoder")?,
            decoder: config.setting("decoder")?,
            checkpoint_dir: config.rate_param(rate, "checkpoint_dir")?,
        })
    }

    fn file_name(path: &Path) -> Result<&std::ffi::OsStr> {
        path.file_name()
            .ok_or_else(|| ArenaError::Config(format!("{} has no file name", path.display())))
    }
}

impl Codec for GeoCnnV1 {
    codec_basics!();

    fn sample_paths(&self, layout: &ExperimentLayout, relative: &Path) -> SamplePaths {
        // `<rel>.ply.bin` and `<rel>.ply.bin.ply`
        let bin = append_extension(&layout.bin_dir().join(relative), &self.bin_suffix);
        let mut output = append_extension(&layout.dec_dir().join(relative), &self.bin_suffix);
        if let Some(ext) = relative.extension() {
            output = append_extension(&output, &ext.to_string_lossy());
        }
        SamplePaths {
            bin,
            output,
            log: layout.evl_dir().join(relative).with_extension("log"),
        }
    }

    fn encode_command(&self, input: &Path, bin: &Path, ctx: &CodecContext) -> Result<ToolCommand> {
        Ok(self
            .interpreter
            .script(&self.encoder)
            .arg(parent_of(input))
            .arg(Self::file_name(input)?)
            .arg(parent_of(bin))
            .arg(&self.checkpoint_dir)
            .args(["--resolution".to_string(), required_resolution(&self.name, ctx)?])
            .args(["--preprocess_threads", "1"]))
    }

    fn decode_command(&self, bin: &Path, output: &Path, _ctx: &CodecContext) -> Result<ToolCommand> {
        Ok(self
            .interpreter
            .script(&self.decoder)
            .arg(parent_of(bin))
            .arg(Self::file_name(bin)?)
            .arg(parent_of(output))
            .arg(&self.checkpoint_dir)
            .args(["--preprocess_threads", "1"]))
    }
}

/// Learned geometry codec v2
#[derive(Debug, Clone)]
pub struct GeoCnnV2 {
    name: String,
    bin_suffix: String,
    interpreter: Interpreter,
    encoder: String,
    decoder: String,
    model_config: String,
    opt_metrics: String,
    checkpoint_dir: String,
}

impl GeoCnnV2 {
    pub fn from_config(name: &str, config: &AlgorithmConfig, rate: &str) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            bin_suffix: config.bin_suffix.clone(),
            interpreter: Interpreter::from_config(config),
            encoder: config.setting("encoder")?,
            decoder: config.setting("decoder")?,
            model_config: config.setting("model_config")?,
            opt_metrics: config.setting("opt_metrics")?,
            checkpoint_dir: config.rate_param(rate, "checkpoint_dir")?,
        })
    }
}

impl Codec for GeoCnnV2 {
    codec_basics!();

    fn encode_command(&self, input: &Path, bin: &Path, ctx: &CodecContext) -> Result<ToolCommand> {
        Ok(self
            .interpreter
            .script(&self.encoder)
            .arg("--input_files")
            .arg(input)
            .arg("--output_files")
            .arg(bin)
            .args(["--checkpoint_dir", self.checkpoint_dir.as_str()])
            .args(["--model_config", self.model_config.as_str()])
            .args(["--opt_metrics", self.opt_metrics.as_str()])
            .args(["--resolution".to_string(), required_resolution(&self.name, ctx)?]))
    }

    fn decode_command(&self, bin: &Path, output: &Path, _ctx: &CodecContext) -> Result<ToolCommand> {
        Ok(self
            .interpreter
            .script(&self.decoder)
            .arg("--input_files")
            .arg(bin)
            .arg("--output_files")
            .arg(output)
            .args(["--checkpoint_dir", self.checkpoint_dir.as_str()])
            .args(["--model_config", self.model_config.as_str()]))
    }
}

/// Learned point cloud geometry compression v1; writes several binaries per sample
#[derive(Debug, Clone)]
pub struct PcgcV1 {
    name: String,
    bin_suffix: String,
    interpreter: Interpreter,
    test_script: String,
    ckpt_dir: String,
    scale: String,
    rho: String,
}

impl PcgcV1 {
    pub fn from_config(name: &str, config: &AlgorithmConfig, rate: &str) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            bin_suffix: config.bin_suffix.clone(),
            interpreter: Interpreter::from_config(config),
            test_script: config.setting("test_script")?,
            ckpt_dir: config.rate_param(rate, "ckpt_dir")?,
            scale: config.rate_param(rate, "scale")?,
            rho: config.rate_param(rate, "rho")?,
        })
    }

    fn command(&self, mode: &str, from: &Path, to: &Path) -> ToolCommand {
        self.interpreter
            .script(&self.test_script)
            .arg(mode)
            .arg(from)
            .arg(to)
            .args(["--ckpt_dir", self.ckpt_dir.as_str()])
            .args(["--scale", self.scale.as_str()])
            .args(["--rho", self.rho.as_str()])
    }
}

impl Codec for PcgcV1 {
    codec_basics!();

    fn encode_command(&self, input: &Path, bin: &Path, _ctx: &CodecContext) -> Result<ToolCommand> {
        Ok(self.command("compress", input, bin))
    }

    fn decode_command(&self, bin: &Path, output: &Path, _ctx: &CodecContext) -> Result<ToolCommand> {
        Ok(self.command("decompress", bin, output))
    }

    /// Every file in the bin directory starting with the binary's stem
    fn binary_files(&self, bin: &Path) -> Result<Vec<PathBuf>> {
        let stem = bin
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut files: Vec<PathBuf> = fs::read_dir(parent_of(bin))?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .filter(|p| {
                p.file_name()
                    .is_some_and(|n| n.to_string_lossy().starts_with(stem.as_str()))
            })
            .collect();
        files.sort();
        Ok(files)
    }
}

/// Learned point cloud geometry compression v2
#[derive(Debug, Clone)]
pub struct PcgcV2 {
    name: String,
    bin_suffix: String,
    interpreter: Interpreter,
    test_script: String,
    ckptdir: String,
    voxel_size: String,
    rho: String,
}

impl PcgcV2 {
    pub fn from_config(name: &str, config: &AlgorithmConfig, rate: &str) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            bin_suffix: config.bin_suffix.clone(),
            interpreter: Interpreter::from_config(config),
            test_script: config.setting("test_script")?,
            ckptdir: config.rate_param(rate, "ckptdir")?,
            voxel_size: config.rate_param(rate, "voxel_size")?,
            rho: config.rate_param(rate, "rho")?,
        })
    }
}

impl Codec for PcgcV2 {
    codec_basics!();

    fn encode_command(&self, input: &Path, bin: &Path, _ctx: &CodecContext) -> Result<ToolCommand> {
        Ok(self
            .interpreter
            .script(&self.test_script)
            .arg("compress")
            .arg(input)
            .arg(bin)
            .args(["--ckptdir", self.ckptdir.as_str()])
            .args(["--voxel_size", self.voxel_size.as_str()]))
    }

    fn decode_command(&self, bin: &Path, output: &Path, _ctx: &CodecContext) -> Result<ToolCommand> {
        Ok(self
            .interpreter
            .script(&self.test_script)
            .arg("decompress")
            .arg(bin)
            .arg(output)
            .args(["--ckptdir", self.ckptdir.as_str()])
            .args(["--voxel_size", self.voxel_size.as_str()])
            .args(["--rho", self.rho.as_str()]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codecs::args_of;
    use crate::config::CodecKind;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn config(kind: CodecKind, settings: &[&str], rate: &[(&str, toml::Value)]) -> AlgorithmConfig {
        let mut config = AlgorithmConfig::new(kind);
        for key in settings {
            config
                .settings
                .insert(key.to_string(), toml::Value::String(format!("{}.py", key)));
        }
        let params: BTreeMap<String, toml::Value> =
            rate.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
        config.rates.insert("r1".into(), params);
        config
    }

    #[test]
    fn test_geocnn_v1_layout_and_resolution() {
        let cfg = config(
            CodecKind::GeoCnnV1,
            &["encoder", "decoder"],
            &[("checkpoint_dir", toml::Value::String("ckpt/r1".into()))],
        );
        let codec = GeoCnnV1::from_config("geocnn_v1", &cfg, "r1").unwrap();
        assert!(codec.uses_gpu());

        let layout = ExperimentLayout::new(Path::new("exp"), "geocnn_v1", "ds", "r1");
        let paths = codec.sample_paths(&layout, Path::new("chair/1.ply"));
        assert_eq!(paths.bin, PathBuf::from("exp/geocnn_v1/ds/r1/bin/chair/1.ply.bin"));
        assert_eq!(paths.output, PathBuf::from("exp/geocnn_v1/ds/r1/dec/chair/1.ply.bin.ply"));

        let ctx = CodecContext::default();
        assert!(codec.encode_command(Path::new("d/1.ply"), &paths.bin, &ctx).is_err());

        let ctx = CodecContext {
            resolution: Some(64.0),
            ..CodecContext::default()
        };
        let enc = codec.encode_command(Path::new("d/1.ply"), &paths.bin, &ctx).unwrap();
        assert_eq!(enc.program(), "python3");
        assert_eq!(
            args_of(&enc),
            vec![
                "encoder.py",
                "d",
                "1.ply",
                "exp/geocnn_v1/ds/r1/bin/chair",
                "ckpt/r1",
                "--resolution",
                "64",
                "--preprocess_threads",
                "1"
            ]
        );
    }

    #[test]
    fn test_pcgc_v2_decode_adds_rho() {
        let cfg = config(
            CodecKind::PcgcV2,
            &["test_script"],
            &[
                ("ckptdir", toml::Value::String("ck".into())),
                ("voxel_size", toml::Value::Integer(1)),
                ("rho", toml::Value::Float(1.5)),
            ],
        );
        let codec = PcgcV2::from_config("pcgc_v2", &cfg, "r1").unwrap();
        let ctx = CodecContext::default();
        let enc = codec.encode_command(Path::new("a.ply"), Path::new("a.bin"), &ctx).unwrap();
        assert!(!args_of(&enc).contains(&"--rho".to_string()));
        let dec = codec.decode_command(Path::new("a.bin"), Path::new("b.ply"), &ctx).unwrap();
        assert_eq!(&args_of(&dec)[8..], &["--rho", "1.5"]);
    }

    #[test]
    fn test_pcgc_v1_binary_files() {
        let dir = TempDir::new().unwrap();
        for name in ["1.bin", "1_head.bin", "1_coords.bin", "2.bin"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        let cfg = config(
            CodecKind::PcgcV1,
            &["test_script"],
            &[
                ("ckpt_dir", toml::Value::String("ck".into())),
                ("scale", toml::Value::Float(0.5)),
                ("rho", toml::Value::Float(1.0)),
            ],
        );
        let codec = PcgcV1::from_config("pcgc_v1", &cfg, "r1").unwrap();
        let files = codec.binary_files(&dir.path().join("1.bin")).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["1.bin", "1_coords.bin", "1_head.bin"]);
    }
}
