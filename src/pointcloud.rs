// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 PCC Arena Contributors

//! PLY inspection and XYZ export for the metric tools

use ply_rs::parser::Parser;
use ply_rs::ply::{DefaultElement, Property};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::error::{ArenaError, Result};
use crate::evaluation::metrics::Capabilities;

/// Header-level facts about a point cloud file
#[derive(Debug, Clone, PartialEq)]
pub struct PointCloudInfo {
    pub path: PathBuf,
    pub points: usize,
    pub capabilities: Capabilities,
    pub file_size: u64,
}

fn invalid(path: &Path, reason: impl Into<String>) -> ArenaError {
    ArenaError::PointCloud {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

fn open(path: &Path) -> Result<File> {
    if !path.is_file() {
        return Err(ArenaError::MissingInput(path.to_path_buf()));
    }
    Ok(File::open(path)?)
}

/// Read the PLY header of `path`: vertex count, color and normal channels
pub fn inspect(path: &Path) -> Result<PointCloudInfo> {
    let file = open(path)?;
    let file_size = file.metadata()?.len();
    let mut reader = BufReader::new(file);

    let header = Parser::<DefaultElement>::new()
        .read_header(&mut reader)
        .map_err(|e| invalid(path, e.to_string()))?;
    let vertex = header
        .elements
        .get("vertex")
        .ok_or_else(|| invalid(path, "no vertex element"))?;

    let has = |names: [&str; 3]| names.iter().all(|n| vertex.properties.contains_key(*n));
    Ok(PointCloudInfo {
        path: path.to_path_buf(),
        points: vertex.count,
        capabilities: Capabilities::new(has(["red", "green", "blue"]), has(["nx", "ny", "nz"])),
        file_size,
    })
}

fn coordinate(element: &DefaultElement, key: &str) -> Option<f64> {
    match element.get(key)? {
        Property::Float(v) => Some(f64::from(*v)),
        Property::Double(v) => Some(*v),
        Property::Int(v) => Some(f64::from(*v)),
        Property::UInt(v) => Some(f64::from(*v)),
        Property::Short(v) => Some(f64::from(*v)),
        Property::UShort(v) => Some(f64::from(*v)),
        _ => None,
    }
}

/// Load every vertex position of a PLY file
pub fn read_positions(path: &Path) -> Result<Vec<[f64; 3]>> {
    let mut reader = BufReader::new(open(path)?);
    let ply = Parser::<DefaultElement>::new()
        .read_ply(&mut reader)
        .map_err(|e| invalid(path, e.to_string()))?;
    let vertices = ply
        .payload
        .get("vertex")
        .ok_or_else(|| invalid(path, "no vertex element"))?;

    vertices
        .iter()
        .map(|v| match (coordinate(v, "x"), coordinate(v, "y"), coordinate(v, "z")) {
            (Some(x), Some(y), Some(z)) => Ok([x, y, z]),
            _ => Err(invalid(path, "vertex without numeric x/y/z")),
        })
        .collect()
}

/// Write positions as `<count>` followed by one `x y z` line per point
pub fn write_xyz<W: Write>(points: &[[f64; 3]], writer: W) -> Result<()> {
    let mut out = BufWriter::new(writer);
    writeln!(out, "{}", points.len())?;
    for [x, y, z] in points {
        writeln!(out, "{} {} {}", x, y, z)?;
    }
    out.flush()?;
    Ok(())
}

/// Export a PLY file to a temporary `.xyz` file, removed on drop
pub fn export_xyz(path: &Path) -> Result<NamedTempFile> {
    let points = read_positions(path)?;
    let file = tempfile::Builder::new()
        .prefix("pcc-arena-")
        .suffix(".xyz")
        .tempfile()?;
    write_xyz(&points, file.as_file())?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const COLORED: &str = "ply
format ascii 1.0
element vertex 3
property float x
property float y
property float z
property uchar red
property uchar green
property uchar blue
end_header
0 0 0 255 0 0
1 0 0 0 255 0
0 2.5 1 0 0 255
";

    #[test]
    fn test_inspect_capabilities() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.ply");
        fs::write(&path, COLORED).unwrap();

        let info = inspect(&path).unwrap();
        assert_eq!(info.points, 3);
        assert_eq!(info.capabilities, Capabilities::new(true, false));
        assert_eq!(info.file_size, COLORED.len() as u64);
    }

    #[test]
    fn test_missing_file() {
        let err = inspect(Path::new("/nonexistent/cloud.ply")).unwrap_err();
        assert!(matches!(err, ArenaError::MissingInput(_)));
    }

    #[test]
    fn test_xyz_export() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.ply");
        fs::write(&path, COLORED).unwrap();

        let xyz = export_xyz(&path).unwrap();
        let text = fs::read_to_string(xyz.path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["3", "0 0 0", "1 0 0", "0 2.5 1"]);
    }
}
