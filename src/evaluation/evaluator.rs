// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 PCC Arena Contributors

//! Single-sample evaluation: distortion metrics plus size and timing

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use super::metrics::{
    report_fields, tool_fields, Capabilities, MetricGroup, MetricValue, DIAMETER_FIELD,
};
use super::parser::{find_value, parse_metrics, MetricValues};
use super::runner::{ToolCommand, ToolRunner};
use crate::config::ToolsConfig;
use crate::error::{ArenaError, Result};
use crate::pointcloud;

pub const BANNER_TIME_AND_SIZE: &str = "========== Time & Binary Size ==========";
pub const BANNER_POINT_METRICS: &str = "========== Point-based Metrics =========";
pub const BANNER_SEPARATOR: &str = "----------------------------------------";
pub const BANNER_QOE: &str = "============== QoE Metric ==============";

/// Everything needed to evaluate one reference/target pair
#[derive(Debug, Clone, Default)]
pub struct SampleInput {
    pub reference: PathBuf,
    pub target: PathBuf,
    pub encode_time: Option<Duration>,
    pub decode_time: Option<Duration>,
    /// Compressed files; sizes are summed
    pub binaries: Option<Vec<PathBuf>>,
    /// Evaluation resolution; computed from the reference when absent
    pub resolution: Option<f64>,
}

impl SampleInput {
    pub fn new(reference: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            reference: reference.into(),
            target: target.into(),
            ..Self::default()
        }
    }

    pub fn with_timings(mut self, encode: Duration, decode: Duration) -> Self {
        self.encode_time = Some(encode);
        self.decode_time = Some(decode);
        self
    }

    pub fn with_binaries(mut self, binaries: Vec<PathBuf>) -> Self {
        self.binaries = Some(binaries);
        self
    }

    pub fn with_resolution(mut self, resolution: f64) -> Self {
        self.resolution = Some(resolution);
        self
    }
}

/// Result of evaluating one sample
#[derive(Debug, Clone, Serialize)]
pub struct SampleReport {
    pub reference: PathBuf,
    pub target: PathBuf,
    pub point_count: usize,
    pub capabilities: Capabilities,
    pub resolution: f64,
    pub encode_time: MetricValue,
    pub decode_time: MetricValue,
    pub source_size_kb: MetricValue,
    pub binary_size_kb: MetricValue,
    pub compression_ratio: MetricValue,
    pub bpp: MetricValue,
    /// Distortion metrics applicable to `capabilities`
    pub metrics: MetricValues,
}

fn ratio(numerator: f64, denominator: f64) -> MetricValue {
    if denominator == 0.0 {
        MetricValue::NaN
    } else {
        MetricValue::from_f64(numerator / denominator)
    }
}

fn seconds(value: MetricValue) -> String {
    match value {
        MetricValue::Finite(v) => format!("{:.4}", v),
        other => other.to_string(),
    }
}

impl SampleReport {
    /// Size-derived values of a report
    fn derived(
        point_count: usize,
        source_bytes: u64,
        binary_bytes: Option<u64>,
    ) -> (MetricValue, MetricValue, MetricValue, MetricValue) {
        let source_kb = source_bytes as f64 / 1000.0;
        match binary_bytes {
            Some(bytes) => {
                let binary_kb = bytes as f64 / 1000.0;
                (
                    MetricValue::from_f64(source_kb),
                    MetricValue::from_f64(binary_kb),
                    ratio(binary_kb, source_kb),
                    ratio(bytes as f64 * 8.0, point_count as f64),
                )
            }
            None => (
                MetricValue::from_f64(source_kb),
                MetricValue::NaN,
                MetricValue::NaN,
                MetricValue::NaN,
            ),
        }
    }

    /// Value of a report field by key
    pub fn value(&self, key: &str) -> MetricValue {
        match key {
            "enc_t" => self.encode_time,
            "dec_t" => self.decode_time,
            "src_size" => self.source_size_kb,
            "bin_size" => self.binary_size_kb,
            "ratio" => self.compression_ratio,
            "bpp" => self.bpp,
            other => self.metrics.get(other).copied().unwrap_or(MetricValue::Missing),
        }
    }

    /// Render the per-sample report file
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("PCC-Arena Evaluator {}\n", env!("CARGO_PKG_VERSION")));
        out.push_str(&format!("Reference Point Cloud: {}\n", self.reference.display()));
        out.push_str(&format!("Target Point Cloud: {}\n", self.target.display()));
        out.push('\n');

        let mut group = None;
        for field in report_fields(self.capabilities) {
            if group != Some(field.group) {
                match (group, field.group) {
                    (_, MetricGroup::TimeAndSize) => out.push_str(BANNER_TIME_AND_SIZE),
                    (Some(MetricGroup::TimeAndSize), MetricGroup::PointToPoint) => {
                        out.push('\n');
                        out.push_str(BANNER_POINT_METRICS);
                    }
                    (_, MetricGroup::Qoe) => {
                        out.push('\n');
                        out.push_str(BANNER_QOE);
                    }
                    _ => out.push_str(BANNER_SEPARATOR),
                }
                out.push('\n');
                group = Some(field.group);
            }

            let value = self.value(field.key);
            let token = match field.key {
                "enc_t" | "dec_t" => seconds(value),
                _ => value.to_string(),
            };
            out.push_str(&format!("{}{}\n", field.label, token));
        }
        out
    }

    /// Write the report, creating parent directories
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.render())?;
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Runs the distortion tool and assembles `SampleReport`s
#[derive(Debug, Clone)]
pub struct Evaluator {
    tools: ToolsConfig,
    runner: ToolRunner,
}

impl Evaluator {
    pub fn new(tools: ToolsConfig, runner: ToolRunner) -> Self {
        Self { tools, runner }
    }

    /// Maximum nearest-neighbor distance of `reference`, via the diameter tool
    pub fn compute_resolution(&self, reference: &Path) -> Result<f64> {
        let xyz = pointcloud::export_xyz(reference)?;
        let tool = ToolCommand::new(&self.tools.gdiam).arg(xyz.path());
        let output = self.runner.run(&tool)?;

        match find_value(&output.stdout, DIAMETER_FIELD.label)? {
            MetricValue::Finite(v) => {
                debug!(reference = %reference.display(), resolution = v, "computed resolution");
                Ok(v)
            }
            _ => Err(self.runner.reject(&tool, &output, "reported no diameter")),
        }
    }

    pub fn distortion_command(&self, reference: &Path, target: &Path, color: bool, resolution: f64) -> ToolCommand {
        ToolCommand::new(&self.tools.pc_error)
            .flag_path("--fileA=", reference)
            .flag_path("--fileB=", target)
            .arg(format!("--color={}", u8::from(color)))
            .arg(format!("--resolution={}", resolution))
            .arg("--hausdorff=1")
    }

    /// Evaluate one sample. Fails without a partial report when the
    /// distortion tool cannot run or prints none of the expected fields.
    pub fn evaluate(&self, input: &SampleInput) -> Result<SampleReport> {
        let info = pointcloud::inspect(&input.reference)?;
        if !input.target.is_file() {
            return Err(ArenaError::MissingInput(input.target.clone()));
        }

        let resolution = match input.resolution {
            Some(r) => r,
            None => self.compute_resolution(&input.reference)?,
        };

        let caps = info.capabilities;
        let tool = self.distortion_command(&input.reference, &input.target, caps.color, resolution);
        let output = self.runner.run(&tool)?;

        let fields = tool_fields(caps);
        let mut metrics = parse_metrics(&output.stdout, &fields)?;
        if metrics.values().all(MetricValue::is_missing) {
            return Err(self.runner.reject(&tool, &output, "produced no parseable output"));
        }
        for value in metrics.values_mut() {
            if value.is_missing() {
                *value = MetricValue::NaN;
            }
        }

        let binary_bytes = match &input.binaries {
            Some(paths) => {
                let mut total = 0;
                for path in paths {
                    total += fs::metadata(path)?.len();
                }
                Some(total)
            }
            None => None,
        };
        let (source_size_kb, binary_size_kb, compression_ratio, bpp) =
            SampleReport::derived(info.points, info.file_size, binary_bytes);

        debug!(
            reference = %input.reference.display(),
            target = %input.target.display(),
            "sample evaluated"
        );

        Ok(SampleReport {
            reference: input.reference.clone(),
            target: input.target.clone(),
            point_count: info.points,
            capabilities: caps,
            resolution,
            encode_time: MetricValue::from_option(input.encode_time.map(|d| d.as_secs_f64())),
            decode_time: MetricValue::from_option(input.decode_time.map(|d| d.as_secs_f64())),
            source_size_kb,
            binary_size_kb,
            compression_ratio,
            bpp,
            metrics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::metrics::REPORT_FIELDS;
    use approx::assert_relative_eq;

    #[test]
    fn test_derived_values() {
        let (src, bin, ratio, bpp) = SampleReport::derived(1000, 50_000, Some(2000));
        assert_relative_eq!(src.as_f64(), 50.0);
        assert_relative_eq!(bin.as_f64(), 2.0);
        assert_relative_eq!(ratio.as_f64(), 0.04);
        assert_relative_eq!(bpp.as_f64(), 16.0);
    }

    #[test]
    fn test_zero_points_is_nan() {
        let (_, _, _, bpp) = SampleReport::derived(0, 100, Some(10));
        assert_eq!(bpp, MetricValue::NaN);
        let (_, bin, _, _) = SampleReport::derived(10, 100, None);
        assert_eq!(bin, MetricValue::NaN);
    }

    fn report(caps: Capabilities) -> SampleReport {
        let mut metrics = MetricValues::new();
        for field in tool_fields(caps) {
            metrics.insert(field.key, MetricValue::Finite(1.25));
        }
        metrics.insert("h_p2pt", MetricValue::Inf);
        SampleReport {
            reference: PathBuf::from("ref.ply"),
            target: PathBuf::from("dec.ply"),
            point_count: 1000,
            capabilities: caps,
            resolution: 1.0,
            encode_time: MetricValue::Finite(0.123456),
            decode_time: MetricValue::NaN,
            source_size_kb: MetricValue::Finite(50.0),
            binary_size_kb: MetricValue::Finite(2.0),
            compression_ratio: MetricValue::Finite(0.04),
            bpp: MetricValue::Finite(16.0),
            metrics,
        }
    }

    #[test]
    fn test_render_parses_back() {
        let text = report(Capabilities::new(true, true)).render();
        assert!(text.starts_with("PCC-Arena Evaluator "));
        assert!(text.contains(BANNER_POINT_METRICS));
        assert!(text.contains(BANNER_QOE));
        assert!(text.contains("Encoding time (s)           : 0.1235"));

        let values = parse_metrics(&text, REPORT_FIELDS).unwrap();
        assert_eq!(values["bpp"], MetricValue::Finite(16.0));
        assert_eq!(values["h_p2pt"], MetricValue::Inf);
        assert_eq!(values["dec_t"], MetricValue::NaN);
        assert_eq!(values["hybrid"], MetricValue::Finite(1.25));
    }

    #[test]
    fn test_render_omits_inapplicable_blocks() {
        let text = report(Capabilities::default()).render();
        assert!(!text.contains("p2pl: "));
        assert!(!text.contains("Y-CPSNR"));
        assert!(!text.contains(BANNER_QOE));
        assert_eq!(text.matches(BANNER_SEPARATOR).count(), 0);
    }
}
