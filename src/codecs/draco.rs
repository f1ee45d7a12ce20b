// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 PCC Arena Contributors

use std::path::Path;

use super::{Codec, CodecContext};
use crate::config::AlgorithmConfig;
use crate::error::Result;
use crate::evaluation::runner::ToolCommand;

/// Google Draco (`draco_encoder` / `draco_decoder`)
#[derive(Debug, Clone)]
pub struct Draco {
    name: String,
    bin_suffix: String,
    encoder: String,
    decoder: String,
    /// `-qp -qt -qn -qg -cl` values, in order
    quantization: [String; 5],
}

impl Draco {
    pub fn from_config(name: &str, config: &AlgorithmConfig, rate: &str) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            bin_suffix: config.bin_suffix.clone(),
            encoder: config.setting("encoder")?,
            decoder: config.setting("decoder")?,
            quantization: [
                config.rate_param(rate, "qp")?,
                config.rate_param(rate, "qt")?,
                config.rate_param(rate, "qn")?,
                config.rate_param(rate, "qg")?,
                config.rate_param(rate, "cl")?,
            ],
        })
    }
}

impl Codec for Draco {
    fn name(&self) -> &str {
        &self.name
    }

    fn bin_suffix(&self) -> &str {
        &self.bin_suffix
    }

    fn encode_command(&self, input: &Path, bin: &Path, _ctx: &CodecContext) -> Result<ToolCommand> {
        let [qp, qt, qn, qg, cl] = &self.quantization;
        Ok(ToolCommand::new(&self.encoder)
            .arg("-i")
            .arg(input)
            .arg("-o")
            .arg(bin)
            .arg("-point_cloud")
            .args([
                "-qp",
                qp.as_str(),
                "-qt",
                qt.as_str(),
                "-qn",
                qn.as_str(),
                "-qg",
                qg.as_str(),
                "-cl",
                cl.as_str(),
            ]))
    }

    fn decode_command(&self, bin: &Path, output: &Path, _ctx: &CodecContext) -> Result<ToolCommand> {
        Ok(ToolCommand::new(&self.decoder)
            .arg("-i")
            .arg(bin)
            .arg("-o")
            .arg(output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codecs::args_of;
    use crate::config::CodecKind;

    #[test]
    fn test_command_lines() {
        let mut config = AlgorithmConfig::new(CodecKind::Draco);
        config.settings.insert("encoder".into(), toml::Value::String("enc".into()));
        config.settings.insert("decoder".into(), toml::Value::String("dec".into()));
        let mut rate = std::collections::BTreeMap::new();
        for (key, value) in [("qp", 11), ("qt", 10), ("qn", 9), ("qg", 8), ("cl", 7)] {
            rate.insert(key.to_string(), toml::Value::Integer(value));
        }
        config.rates.insert("r3".into(), rate);

        let draco = Draco::from_config("draco", &config, "r3").unwrap();
        let ctx = CodecContext::default();
        let enc = draco.encode_command(Path::new("a.ply"), Path::new("a.drc"), &ctx).unwrap();
        assert_eq!(enc.program(), "enc");
        assert_eq!(
            args_of(&enc),
            vec![
                "-i", "a.ply", "-o", "a.drc", "-point_cloud", "-qp", "11", "-qt", "10", "-qn", "9",
                "-qg", "8", "-cl", "7"
            ]
        );
        let dec = draco.decode_command(Path::new("a.drc"), Path::new("b.ply"), &ctx).unwrap();
        assert_eq!(args_of(&dec), vec!["-i", "a.drc", "-o", "b.ply"]);
    }
}
