// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 PCC Arena Contributors

//! Single-sample evaluation against stand-in metric tools

#![cfg(unix)]

use pcc_arena::evaluation::{summarize_dir, Evaluator, MetricValue, SampleInput, ToolRunner};
use pcc_arena::{ArenaError, ToolsConfig};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;

// Writing a script while another test forks can fail with ETXTBSY
static TOOLS: Mutex<()> = Mutex::new(());

const PC_ERROR_OUTPUT: &str = "\
3. Final (symmetric).
   ACD1      (p2point): 0.25
   ACD2      (p2point): 0.5
   CD        (p2point): 0.375
   CD,PSNR   (p2point): 64.5
   h.        (p2point): inf
";

fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// ASCII PLY with `points` vertices, padded through a header comment to `size` bytes
fn padded_ply(path: &Path, points: usize, size: usize) {
    let body: String = (0..points).map(|i| format!("{} 0 0\n", i)).collect();
    let header = |pad: usize| {
        format!(
            "ply\nformat ascii 1.0\ncomment {}\nelement vertex {}\nproperty float x\nproperty float y\nproperty float z\nend_header\n",
            "x".repeat(pad),
            points
        )
    };
    let pad = size - header(0).len() - body.len();
    let text = header(pad) + &body;
    assert_eq!(text.len(), size);
    fs::write(path, text).unwrap();
}

struct Fixture {
    dir: TempDir,
    reference: PathBuf,
    target: PathBuf,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let reference = dir.path().join("ref.ply");
    let target = dir.path().join("rec.ply");
    padded_ply(&reference, 1000, 50_000);
    padded_ply(&target, 1000, 20_000);
    Fixture {
        dir,
        reference,
        target,
    }
}

#[test]
fn test_end_to_end_sample() {
    let _guard = TOOLS.lock().unwrap_or_else(|e| e.into_inner());
    let fx = fixture();
    let pc_error = script(fx.dir.path(), "pc_error", &format!("cat <<'EOF'\n{}EOF", PC_ERROR_OUTPUT));
    let binary = fx.dir.path().join("rec.drc");
    fs::write(&binary, vec![0u8; 2000]).unwrap();

    let tools = ToolsConfig {
        pc_error,
        ..ToolsConfig::default()
    };
    let evaluator = Evaluator::new(tools, ToolRunner::without_diagnostics());
    let input = SampleInput::new(&fx.reference, &fx.target)
        .with_timings(Duration::from_millis(1500), Duration::from_millis(250))
        .with_binaries(vec![binary])
        .with_resolution(1.0);

    let report = evaluator.evaluate(&input).unwrap();
    assert_eq!(report.point_count, 1000);
    assert_eq!(report.bpp, MetricValue::Finite(16.0));
    assert_eq!(report.compression_ratio, MetricValue::Finite(0.04));
    assert_eq!(report.source_size_kb, MetricValue::Finite(50.0));
    assert_eq!(report.binary_size_kb, MetricValue::Finite(2.0));
    assert_eq!(report.value("cd_p2pt"), MetricValue::Finite(0.375));
    assert_eq!(report.value("h_p2pt"), MetricValue::Inf);

    // the written report feeds the dataset aggregator
    let evl = fx.dir.path().join("evl");
    report.write(&evl.join("rec.ply.log")).unwrap();
    let summary = summarize_dir(&evl, false).unwrap();
    assert_eq!(summary.column("bpp").unwrap().stats.mean, Some(16.0));
    assert_eq!(summary.column("enc_t").unwrap().stats.mean, Some(1.5));
    assert_eq!(summary.column("h_p2pt").unwrap().stats.count, 0);
    assert_eq!(summary.column("h_p2pt").unwrap().values[0], MetricValue::Inf);
}

#[test]
fn test_resolution_from_diameter_tool() {
    let _guard = TOOLS.lock().unwrap_or_else(|e| e.into_inner());
    let fx = fixture();
    let args = fx.dir.path().join("args.txt");
    let pc_error = script(
        fx.dir.path(),
        "pc_error",
        &format!("echo \"$@\" > {}\ncat <<'EOF'\n{}EOF", args.display(), PC_ERROR_OUTPUT),
    );
    let gdiam = script(fx.dir.path(), "gdiam", "echo 'Diameter distance: 2.5'");

    let evaluator = Evaluator::new(ToolsConfig { pc_error, gdiam }, ToolRunner::without_diagnostics());
    let report = evaluator
        .evaluate(&SampleInput::new(&fx.reference, &fx.target))
        .unwrap();

    assert_eq!(report.resolution, 2.5);
    assert_eq!(report.bpp, MetricValue::NaN);
    assert_eq!(report.encode_time, MetricValue::NaN);
    let line = fs::read_to_string(args).unwrap();
    assert!(line.contains("--resolution=2.5"));
    assert!(line.contains("--color=0"));
}

#[test]
fn test_failing_tool_leaves_diagnostic() {
    let _guard = TOOLS.lock().unwrap_or_else(|e| e.into_inner());
    let fx = fixture();
    let pc_error = script(fx.dir.path(), "pc_error", "echo 'cannot open fileB' >&2\nexit 3");
    let diagnostics = fx.dir.path().join("diagnostics");

    let tools = ToolsConfig {
        pc_error,
        ..ToolsConfig::default()
    };
    let evaluator = Evaluator::new(tools, ToolRunner::new(&diagnostics));
    let err = evaluator
        .evaluate(&SampleInput::new(&fx.reference, &fx.target).with_resolution(1.0))
        .unwrap_err();

    assert!(matches!(err, ArenaError::ToolInvocation { .. }));
    let diagnostic = err.diagnostic().expect("diagnostic file recorded").clone();
    assert!(diagnostic.starts_with(&diagnostics));
    assert!(fs::read_to_string(diagnostic).unwrap().contains("cannot open fileB"));
}

#[test]
fn test_unparseable_output_is_rejected() {
    let _guard = TOOLS.lock().unwrap_or_else(|e| e.into_inner());
    let fx = fixture();
    let pc_error = script(fx.dir.path(), "pc_error", "echo 'Segmentation fault'");

    let tools = ToolsConfig {
        pc_error,
        ..ToolsConfig::default()
    };
    let evaluator = Evaluator::new(tools, ToolRunner::without_diagnostics());
    let err = evaluator
        .evaluate(&SampleInput::new(&fx.reference, &fx.target).with_resolution(1.0))
        .unwrap_err();
    assert!(err.to_string().contains("produced no parseable output"));
}

#[test]
fn test_missing_target() {
    let fx = fixture();
    let evaluator = Evaluator::new(ToolsConfig::default(), ToolRunner::without_diagnostics());
    let missing = fx.dir.path().join("absent.ply");
    let err = evaluator
        .evaluate(&SampleInput::new(&fx.reference, &missing).with_resolution(1.0))
        .unwrap_err();
    assert!(matches!(err, ArenaError::MissingInput(path) if path == missing));
}
