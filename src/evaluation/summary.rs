// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 PCC Arena Contributors

//! Dataset-level aggregation of per-sample reports

use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use super::evaluator::{BANNER_QOE, BANNER_SEPARATOR, BANNER_TIME_AND_SIZE};
use super::metrics::{summary_fields, MetricField, MetricGroup, MetricValue, NOT_AVAILABLE};
use super::parser::parse_metrics;
use super::reporter::Reporter;
use super::stats::{StatSummary, Statistic};
use crate::error::{ArenaError, Result};

pub const BANNER_OBJECTIVE_QUALITY: &str = "========== Objective Quality ===========";

/// File name suffix of dataset summaries; such files are never read as reports
pub const SUMMARY_SUFFIX: &str = "_summary";

/// One metric across every report of a dataset
#[derive(Debug, Clone, Serialize)]
pub struct MetricColumn {
    #[serde(skip)]
    pub field: MetricField,
    /// One entry per report, in report order
    pub values: Vec<MetricValue>,
    pub stats: StatSummary,
}

/// Aggregate of all reports under one log directory
#[derive(Debug, Clone)]
pub struct DatasetSummary {
    pub log_dir: PathBuf,
    pub color: bool,
    /// Report paths relative to `log_dir`
    pub samples: Vec<String>,
    pub columns: Vec<MetricColumn>,
}

/// Paths written by `write_summary_outputs`
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryOutputs {
    pub csv: PathBuf,
    pub log: PathBuf,
    pub json: PathBuf,
}

fn is_summary_file(path: &Path) -> bool {
    path.file_stem()
        .and_then(|s| s.to_str())
        .is_some_and(|s| s.ends_with(SUMMARY_SUFFIX))
}

/// Find every report under `log_dir`, sorted by path
pub fn discover_reports(log_dir: &Path) -> Result<Vec<PathBuf>> {
    if !log_dir.is_dir() {
        return Err(ArenaError::MissingInput(log_dir.to_path_buf()));
    }

    let mut reports: Vec<PathBuf> = WalkDir::new(log_dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "log"))
        .filter(|p| !is_summary_file(p))
        .collect();

    reports.sort();
    Ok(reports)
}

/// Format an aggregate value for the summary file
fn format_stat(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.4}", v),
        None => NOT_AVAILABLE.to_string(),
    }
}

impl DatasetSummary {
    /// Aggregate every report under `log_dir`
    pub fn collect(log_dir: &Path, color: bool) -> Result<Self> {
        let fields = summary_fields(color);
        let reports = discover_reports(log_dir)?;
        debug!(dir = %log_dir.display(), reports = reports.len(), "aggregating reports");

        let mut values: Vec<Vec<MetricValue>> = vec![Vec::with_capacity(reports.len()); fields.len()];
        let mut samples = Vec::with_capacity(reports.len());

        for report in &reports {
            let text = fs::read_to_string(report)?;
            let parsed = parse_metrics(&text, &fields)?;
            for (column, field) in values.iter_mut().zip(&fields) {
                column.push(parsed.get(field.key).copied().unwrap_or(MetricValue::Missing));
            }
            let relative = report.strip_prefix(log_dir).unwrap_or(report);
            samples.push(relative.to_string_lossy().replace('\\', "/"));
        }

        let columns = fields
            .into_iter()
            .zip(values)
            .map(|(field, values)| MetricColumn {
                field,
                stats: StatSummary::from_values(&values),
                values,
            })
            .collect();

        Ok(Self {
            log_dir: log_dir.to_path_buf(),
            color,
            samples,
            columns,
        })
    }

    pub fn column(&self, key: &str) -> Option<&MetricColumn> {
        self.columns.iter().find(|c| c.field.key == key)
    }

    /// Header row and one row per sample
    pub fn raw_table(&self) -> (Vec<String>, Vec<Vec<String>>) {
        let mut header = vec!["sample".to_string()];
        header.extend(self.columns.iter().map(|c| c.field.key.to_string()));

        let rows = self
            .samples
            .iter()
            .enumerate()
            .map(|(i, sample)| {
                let mut row = vec![sample.clone()];
                row.extend(self.columns.iter().map(|c| c.values[i].to_string()));
                row
            })
            .collect();
        (header, rows)
    }

    /// Human-readable summary with the four statistic blocks
    pub fn render_log(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("PCC-Arena Evaluator {}\n", env!("CARGO_PKG_VERSION")));
        out.push_str(&format!("Summary of the log directory: {}\n", self.log_dir.display()));
        out.push_str(&format!("Samples: {}\n", self.samples.len()));

        for stat in Statistic::ALL {
            out.push('\n');
            out.push_str(&format!("***** {} *****\n", stat.title()));

            let mut group = None;
            for column in &self.columns {
                let field = &column.field;
                if group != Some(field.group) {
                    match field.group {
                        MetricGroup::TimeAndSize => out.push_str(BANNER_TIME_AND_SIZE),
                        MetricGroup::PointToPoint => {
                            out.push('\n');
                            out.push_str(BANNER_OBJECTIVE_QUALITY);
                        }
                        MetricGroup::Qoe => {
                            out.push('\n');
                            out.push_str(BANNER_QOE);
                        }
                        MetricGroup::PointToPlane | MetricGroup::Color => out.push_str(BANNER_SEPARATOR),
                    }
                    out.push('\n');
                    group = Some(field.group);
                }
                out.push_str(&format!(
                    "{}. {}{}\n",
                    stat.prefix(),
                    field.label,
                    format_stat(column.stats.get(stat))
                ));
            }
        }
        out
    }

    /// Per-metric values and statistics keyed by metric key
    pub fn to_json(&self) -> serde_json::Value {
        let metrics: BTreeMap<&str, &MetricColumn> =
            self.columns.iter().map(|c| (c.field.key, c)).collect();
        serde_json::json!({
            "log_dir": self.log_dir,
            "color": self.color,
            "samples": self.samples,
            "metrics": metrics,
        })
    }
}

/// Aggregate every report under `log_dir`
pub fn summarize_dir(log_dir: &Path, color: bool) -> Result<DatasetSummary> {
    DatasetSummary::collect(log_dir, color)
}

/// Write `<stem>_summary.{csv,log,json}` into `out_dir`
pub fn write_summary_outputs(summary: &DatasetSummary, out_dir: &Path, stem: &str) -> Result<SummaryOutputs> {
    fs::create_dir_all(out_dir)?;
    let outputs = SummaryOutputs {
        csv: out_dir.join(format!("{}{}.csv", stem, SUMMARY_SUFFIX)),
        log: out_dir.join(format!("{}{}.log", stem, SUMMARY_SUFFIX)),
        json: out_dir.join(format!("{}{}.json", stem, SUMMARY_SUFFIX)),
    };

    let (header, rows) = summary.raw_table();
    Reporter::write_csv(&header, &rows, &outputs.csv)?;
    fs::write(&outputs.log, summary.render_log())?;
    Reporter::write_json(&summary.to_json(), &outputs.json)?;

    info!(
        samples = summary.samples.len(),
        summary = %outputs.log.display(),
        "dataset summary written"
    );
    Ok(outputs)
}

/// `(algorithm, dataset, rate)` of an `<algorithm>/<dataset>/<rate>` directory
pub fn experiment_identity(rate_dir: &Path) -> Option<(String, String, String)> {
    let name = |p: &Path| p.file_name().map(|n| n.to_string_lossy().into_owned());
    let rate = name(rate_dir)?;
    let dataset_dir = rate_dir.parent()?;
    let dataset = name(dataset_dir)?;
    let algorithm = name(dataset_dir.parent()?)?;
    Some((algorithm, dataset, rate))
}

/// Summarize the `evl` directory of an experiment leaf next to it
pub fn summarize_experiment_leaf(evl_dir: &Path, color: bool) -> Result<SummaryOutputs> {
    let rate_dir = evl_dir
        .parent()
        .ok_or_else(|| ArenaError::Config(format!("{} has no rate directory", evl_dir.display())))?;
    let (algorithm, dataset, rate) = experiment_identity(rate_dir).ok_or_else(|| {
        ArenaError::Config(format!(
            "{} is not inside an <algorithm>/<dataset>/<rate> tree",
            evl_dir.display()
        ))
    })?;

    let summary = summarize_dir(evl_dir, color)?;
    write_summary_outputs(&summary, rate_dir, &format!("{}_{}_{}", algorithm, dataset, rate))
}
