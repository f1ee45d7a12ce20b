// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 PCC Arena Contributors

//! Cross-experiment collation of dataset summaries

use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

use super::metrics::{MetricField, MetricValue, REPORT_FIELDS};
use super::parser::find_value;
use super::reporter::Reporter;
use super::stats::Statistic;
use super::summary::{experiment_identity, SUMMARY_SUFFIX};
use crate::error::{ArenaError, Result};

/// One leaf experiment: every statistic of every metric
#[derive(Debug, Clone)]
pub struct CollatedRow {
    pub algorithm: String,
    pub dataset: String,
    pub rate: String,
    pub source: PathBuf,
    /// Indexed like `GlobalTable::columns`
    pub cells: Vec<MetricValue>,
}

/// All leaf experiments under one root
#[derive(Debug, Clone, Default)]
pub struct GlobalTable {
    pub rows: Vec<CollatedRow>,
}

impl GlobalTable {
    /// Statistic × metric column order
    pub fn columns() -> Vec<(Statistic, &'static MetricField)> {
        Statistic::ALL
            .iter()
            .flat_map(|&stat| REPORT_FIELDS.iter().map(move |field| (stat, field)))
            .collect()
    }

    pub fn column_name(stat: Statistic, field: &MetricField) -> String {
        format!("{}_{}", stat.prefix(), field.key)
    }

    pub fn header() -> Vec<String> {
        let mut header = vec!["algorithm".to_string(), "dataset".to_string(), "rate".to_string()];
        header.extend(Self::columns().iter().map(|(s, f)| Self::column_name(*s, f)));
        header
    }

    /// Cell of `row` for the given statistic and metric key
    pub fn cell(&self, row: usize, stat: Statistic, key: &str) -> Option<MetricValue> {
        let index = Self::columns()
            .iter()
            .position(|(s, f)| *s == stat && f.key == key)?;
        self.rows.get(row)?.cells.get(index).copied()
    }

    /// Nested statistic → metric → dataset → algorithm → rate
    pub fn to_nested_json(&self) -> Value {
        let mut root = Map::new();
        for (index, (stat, field)) in Self::columns().into_iter().enumerate() {
            let metric = root
                .entry(stat.prefix())
                .or_insert_with(|| Value::Object(Map::new()));
            let Value::Object(metric) = metric else { continue };
            let datasets = metric
                .entry(field.key)
                .or_insert_with(|| Value::Object(Map::new()));
            let Value::Object(datasets) = datasets else { continue };

            for row in &self.rows {
                let algorithms = datasets
                    .entry(row.dataset.clone())
                    .or_insert_with(|| Value::Object(Map::new()));
                let Value::Object(algorithms) = algorithms else { continue };
                let rates = algorithms
                    .entry(row.algorithm.clone())
                    .or_insert_with(|| Value::Object(Map::new()));
                let Value::Object(rates) = rates else { continue };
                let value = row.cells.get(index).copied().unwrap_or(MetricValue::Missing);
                rates.insert(row.rate.clone(), json_cell(value));
            }
        }
        Value::Object(root)
    }
}

fn json_cell(value: MetricValue) -> Value {
    match value {
        MetricValue::Missing => Value::Null,
        MetricValue::Finite(v) => serde_json::Number::from_f64(v).map_or(Value::Null, Value::Number),
        other => Value::String(other.to_string()),
    }
}

fn csv_cell(value: MetricValue) -> String {
    match value {
        MetricValue::Missing => String::new(),
        other => other.to_string(),
    }
}

/// Find every dataset summary log under `root`, sorted by path
pub fn discover_summaries(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(ArenaError::MissingInput(root.to_path_buf()));
    }

    let suffix = format!("{}.log", SUMMARY_SUFFIX);
    let mut summaries: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.file_name().to_string_lossy().ends_with(&suffix))
        .map(|e| e.into_path())
        .collect();

    summaries.sort();
    Ok(summaries)
}

/// Re-parse the statistic blocks of one summary file
pub fn parse_summary(text: &str) -> Result<Vec<MetricValue>> {
    GlobalTable::columns()
        .into_iter()
        .map(|(stat, field)| find_value(text, &format!("{}. {}", stat.prefix(), field.label)))
        .collect()
}

/// Collate every dataset summary under `root` into one table
pub fn collate(root: &Path) -> Result<GlobalTable> {
    let mut table = GlobalTable::default();

    for source in discover_summaries(root)? {
        // <algorithm>/<dataset>/<rate>/<file> below the root
        let depth = source.strip_prefix(root).map_or(0, |r| r.components().count());
        let identity = (depth >= 4)
            .then(|| source.parent().and_then(experiment_identity))
            .flatten();
        let Some((algorithm, dataset, rate)) = identity else {
            warn!(path = %source.display(), "summary outside an <algorithm>/<dataset>/<rate> tree, skipped");
            continue;
        };

        let text = fs::read_to_string(&source)?;
        let cells = parse_summary(&text)?;
        table.rows.push(CollatedRow {
            algorithm,
            dataset,
            rate,
            source,
            cells,
        });
    }

    info!(root = %root.display(), rows = table.rows.len(), "collated summaries");
    Ok(table)
}

/// Paths written by `write_global_table`
#[derive(Debug, Clone, PartialEq)]
pub struct CollateOutputs {
    pub csv: PathBuf,
    pub json: PathBuf,
}

/// Write `summary_all.csv` and `summary_all.json` into `out_dir`
pub fn write_global_table(table: &GlobalTable, out_dir: &Path) -> Result<CollateOutputs> {
    fs::create_dir_all(out_dir)?;
    let outputs = CollateOutputs {
        csv: out_dir.join("summary_all.csv"),
        json: out_dir.join("summary_all.json"),
    };

    let width = GlobalTable::columns().len();
    let rows = table.rows.iter().map(|row| {
        let mut record = vec![row.algorithm.clone(), row.dataset.clone(), row.rate.clone()];
        record.extend((0..width).map(|i| csv_cell(row.cells.get(i).copied().unwrap_or(MetricValue::Missing))));
        record
    });
    Reporter::write_csv(GlobalTable::header(), rows, &outputs.csv)?;
    Reporter::write_json(&table.to_nested_json(), &outputs.json)?;
    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_summary_blocks() {
        let text = "\
***** Average *****
avg. bpp (bits per point)        : 16.0000
avg. Hausdorff distance         p2pt: N/A
***** Maximum *****
max. bpp (bits per point)        : 20.5000
";
        let cells = parse_summary(text).unwrap();
        let table = GlobalTable {
            rows: vec![CollatedRow {
                algorithm: "A".into(),
                dataset: "D".into(),
                rate: "r1".into(),
                source: PathBuf::from("s"),
                cells,
            }],
        };
        assert_eq!(table.cell(0, Statistic::Average, "bpp"), Some(MetricValue::Finite(16.0)));
        assert_eq!(table.cell(0, Statistic::Maximum, "bpp"), Some(MetricValue::Finite(20.5)));
        assert_eq!(table.cell(0, Statistic::Minimum, "bpp"), Some(MetricValue::Missing));
        assert_eq!(table.cell(0, Statistic::Average, "h_p2pt"), Some(MetricValue::Missing));

        let json = table.to_nested_json();
        assert_eq!(json["avg"]["bpp"]["D"]["A"]["r1"], serde_json::json!(16.0));
        assert!(json["min"]["bpp"]["D"]["A"]["r1"].is_null());
    }

    #[test]
    fn test_short_row_renders_missing() {
        let table = GlobalTable {
            rows: vec![CollatedRow {
                algorithm: "A".into(),
                dataset: "D".into(),
                rate: "r1".into(),
                source: PathBuf::from("s"),
                cells: vec![MetricValue::Finite(1.5)],
            }],
        };
        let json = table.to_nested_json();
        assert_eq!(json["avg"]["enc_t"]["D"]["A"]["r1"], serde_json::json!(1.5));
        assert!(json["avg"]["bpp"]["D"]["A"]["r1"].is_null());
        assert!(json["min"]["hybrid"]["D"]["A"]["r1"].is_null());
        assert_eq!(table.cell(0, Statistic::Average, "bpp"), None);

        let dir = tempfile::TempDir::new().unwrap();
        let outputs = write_global_table(&table, dir.path()).unwrap();
        let csv = fs::read_to_string(outputs.csv).unwrap();
        let row = csv.lines().nth(1).unwrap();
        assert!(row.starts_with("A,D,r1,1.5,,"));
        assert_eq!(row.split(',').count(), GlobalTable::header().len());
    }

    #[test]
    fn test_header_layout() {
        let header = GlobalTable::header();
        assert_eq!(&header[..4], &["algorithm", "dataset", "rate", "avg_enc_t"]);
        assert_eq!(header.len(), 3 + 4 * REPORT_FIELDS.len());
        assert_eq!(header.last().map(String::as_str), Some("min_hybrid"));
    }
}
