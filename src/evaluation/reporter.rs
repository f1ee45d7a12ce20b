// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 PCC Arena Contributors

//! Report generation (JSON, CSV and Markdown)

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// A sample that failed during a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleFailure {
    pub sample: String,
    pub error: String,
    pub diagnostic: Option<PathBuf>,
}

/// Outcome of one (algorithm, dataset, rate) run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub timestamp: String,
    pub algorithm: String,
    pub dataset: String,
    pub rate: String,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub failures: Vec<SampleFailure>,
    pub summary_log: Option<PathBuf>,
}

impl RunReport {
    pub fn new(algorithm: &str, dataset: &str, rate: &str) -> Self {
        Self {
            timestamp: Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            algorithm: algorithm.to_string(),
            dataset: dataset.to_string(),
            rate: rate.to_string(),
            total: 0,
            succeeded: 0,
            failed: 0,
            failures: Vec::new(),
            summary_log: None,
        }
    }

    pub fn add_success(&mut self) {
        self.total += 1;
        self.succeeded += 1;
    }

    pub fn add_failure(&mut self, failure: SampleFailure) {
        self.total += 1;
        self.failed += 1;
        self.failures.push(failure);
    }

    pub fn success_rate(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            (self.succeeded as f32 / self.total as f32) * 100.0
        }
    }
}

/// Report writer
pub struct Reporter;

impl Reporter {
    /// Write any serializable value as pretty JSON
    pub fn write_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Write a header row followed by data rows
    pub fn write_csv<H, R>(header: H, rows: R, path: &Path) -> Result<()>
    where
        H: IntoIterator,
        H::Item: AsRef<[u8]>,
        R: IntoIterator,
        R::Item: IntoIterator,
        <R::Item as IntoIterator>::Item: AsRef<[u8]>,
    {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(header)?;
        for row in rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Write Markdown run report
    pub fn write_markdown(report: &RunReport, path: &Path) -> Result<()> {
        let mut md = String::new();

        md.push_str(&format!(
            "# PCC Arena Run: {} / {} / {}\n\n",
            report.algorithm, report.dataset, report.rate
        ));

        md.push_str("## Summary\n\n");
        md.push_str(&format!("- **Total Samples**: {}\n", report.total));
        md.push_str(&format!(
            "- **Succeeded**: {} ({:.1}%)\n",
            report.succeeded,
            report.success_rate()
        ));
        md.push_str(&format!("- **Failed**: {}\n", report.failed));
        if let Some(summary) = &report.summary_log {
            md.push_str(&format!("- **Summary**: `{}`\n", summary.display()));
        }

        if report.failed > 0 {
            md.push_str("\n## Failed Samples\n\n");
            for failure in &report.failures {
                md.push_str(&format!("- **{}**\n", failure.sample));
                md.push_str(&format!("  ```\n  {}\n  ```\n", failure.error));
                if let Some(diagnostic) = &failure.diagnostic {
                    md.push_str(&format!("  - diagnostic: `{}`\n", diagnostic.display()));
                }
            }
        }

        md.push_str(&format!("\n---\n\n*Generated on {}*\n", report.timestamp));

        fs::write(path, md)?;
        Ok(())
    }
}
