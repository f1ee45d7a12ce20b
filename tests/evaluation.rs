// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 PCC Arena Contributors

//! Integration tests for dataset aggregation and collation

use pcc_arena::evaluation::metrics::report_field;
use pcc_arena::evaluation::stats::Statistic;
use pcc_arena::evaluation::{
    collate, summarize_dir, summarize_experiment_leaf, write_global_table, MetricValue,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Report text holding only the given `(key, token)` lines
fn report_text(values: &[(&str, &str)]) -> String {
    let mut out = String::from("PCC-Arena Evaluator\n");
    for (key, token) in values {
        let field = report_field(key).expect("known report field");
        out.push_str(field.label);
        out.push_str(token);
        out.push('\n');
    }
    out
}

fn write_report(dir: &Path, name: &str, values: &[(&str, &str)]) {
    let path = dir.join(name);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, report_text(values)).unwrap();
}

fn three_reports(evl: &Path) {
    write_report(evl, "a.log", &[("bpp", "16"), ("cd_p2pt", "inf"), ("h_p2pt", "2.0")]);
    write_report(evl, "b.log", &[("bpp", "8"), ("cd_p2pt", "1.0")]);
    write_report(evl, "sub/c.log", &[("bpp", "4"), ("cd_p2pt", "3.0"), ("h_p2pt", "4.0")]);
}

#[test]
fn test_infinite_value_excluded_from_statistics() {
    let dir = TempDir::new().unwrap();
    three_reports(dir.path());

    let summary = summarize_dir(dir.path(), false).unwrap();
    assert_eq!(summary.samples, vec!["a.log", "b.log", "sub/c.log"]);

    let cd = summary.column("cd_p2pt").unwrap();
    assert_eq!(cd.values[0], MetricValue::Inf);
    assert_eq!(cd.stats.count, 2);
    assert_eq!(cd.stats.mean, Some(2.0));
    assert_eq!(cd.stats.max, Some(3.0));
    assert_eq!(cd.stats.min, Some(1.0));

    let bpp = summary.column("bpp").unwrap();
    assert_eq!(bpp.stats.count, 3);
    approx::assert_relative_eq!(bpp.stats.mean.unwrap(), 28.0 / 3.0);
}

#[test]
fn test_missing_field_marked_not_available() {
    let dir = TempDir::new().unwrap();
    three_reports(dir.path());

    let summary = summarize_dir(dir.path(), false).unwrap();
    let (header, rows) = summary.raw_table();
    assert_eq!(rows.len(), 3);

    let h = header.iter().position(|c| c == "h_p2pt").unwrap();
    let cd = header.iter().position(|c| c == "cd_p2pt").unwrap();
    assert_eq!(rows[0][h], "2");
    assert_eq!(rows[1][h], "N/A");
    assert_eq!(rows[0][cd], "inf");

    let hausdorff = summary.column("h_p2pt").unwrap();
    assert_eq!(hausdorff.stats.count, 2);
    assert_eq!(hausdorff.stats.mean, Some(3.0));
    assert_eq!(hausdorff.stats.stdev, Some(1.0));
}

#[test]
fn test_summary_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let evl = dir.path().join("draco/modelnet/r1/evl");
    three_reports(&evl);

    let first = summarize_experiment_leaf(&evl, false).unwrap();
    let csv = fs::read_to_string(&first.csv).unwrap();
    let log = fs::read_to_string(&first.log).unwrap();
    assert!(first.log.ends_with("draco/modelnet/r1/draco_modelnet_r1_summary.log"));

    let second = summarize_experiment_leaf(&evl, false).unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read_to_string(&second.csv).unwrap(), csv);
    assert_eq!(fs::read_to_string(&second.log).unwrap(), log);
    assert!(log.contains("avg. Hausdorff distance         p2pt: 3.0000"));
    assert!(log.contains("avg. Hausdorff distance         p2pl: N/A"));
}

#[test]
fn test_collate_keeps_algorithms_apart() {
    let root = TempDir::new().unwrap();
    for (algorithm, bpp) in [("A", "4"), ("B", "12")] {
        let evl = root.path().join(algorithm).join("shapes").join("r1").join("evl");
        write_report(&evl, "s1.log", &[("bpp", bpp), ("cd_p2pt", "0.5")]);
        summarize_experiment_leaf(&evl, false).unwrap();
    }
    // not under an <algorithm>/<dataset>/<rate> directory
    fs::write(root.path().join("stray_summary.log"), "avg. bpp (bits per point)        : 1\n").unwrap();

    let table = collate(root.path()).unwrap();
    assert_eq!(table.rows.len(), 2);
    assert_eq!(table.rows[0].algorithm, "A");
    assert_eq!(table.rows[1].algorithm, "B");
    for row in &table.rows {
        assert_eq!(row.dataset, "shapes");
        assert_eq!(row.rate, "r1");
    }
    assert_eq!(table.cell(0, Statistic::Average, "bpp"), Some(MetricValue::Finite(4.0)));
    assert_eq!(table.cell(1, Statistic::Average, "bpp"), Some(MetricValue::Finite(12.0)));
    assert_eq!(table.cell(0, Statistic::Average, "y_cpsnr"), Some(MetricValue::Missing));

    let out = TempDir::new().unwrap();
    let outputs = write_global_table(&table, out.path()).unwrap();
    let mut reader = csv::Reader::from_path(&outputs.csv).unwrap();
    let header = reader.headers().unwrap().clone();
    let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(records.len(), 2);

    let bpp = header.iter().position(|c| c == "avg_bpp").unwrap();
    let color = header.iter().position(|c| c == "avg_y_cpsnr").unwrap();
    assert_eq!(&records[0][0], "A");
    assert_eq!(&records[1][0], "B");
    assert_eq!(&records[0][bpp], "4");
    assert_eq!(&records[1][bpp], "12");
    assert_eq!(&records[0][color], "");

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&outputs.json).unwrap()).unwrap();
    assert_eq!(json["avg"]["bpp"]["shapes"]["A"]["r1"], serde_json::json!(4.0));
    assert_eq!(json["avg"]["bpp"]["shapes"]["B"]["r1"], serde_json::json!(12.0));
}
