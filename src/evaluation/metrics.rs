// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 PCC Arena Contributors

//! Metric field tables and metric values

use serde::{Serialize, Serializer};
use std::fmt;

use crate::error::{ArenaError, Result};

/// Marker rendered for a value that was never reported
pub const NOT_AVAILABLE: &str = "N/A";

/// Optional channels carried by a reference point cloud
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub color: bool,
    pub normal: bool,
}

impl Capabilities {
    pub fn new(color: bool, normal: bool) -> Self {
        Self { color, normal }
    }
}

/// Which capabilities a field needs before it is computed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applicability {
    Always,
    Normal,
    Color,
}

impl Applicability {
    pub fn applies(self, caps: Capabilities) -> bool {
        match self {
            Applicability::Always => true,
            Applicability::Normal => caps.normal,
            Applicability::Color => caps.color,
        }
    }
}

/// Block a field is printed under in reports and summaries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricGroup {
    TimeAndSize,
    PointToPoint,
    PointToPlane,
    Color,
    Qoe,
}

/// A named quantity located in free text by a literal label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricField {
    pub key: &'static str,
    pub label: &'static str,
    pub applies: Applicability,
    pub group: MetricGroup,
}

impl MetricField {
    const fn new(
        key: &'static str,
        label: &'static str,
        applies: Applicability,
        group: MetricGroup,
    ) -> Self {
        Self {
            key,
            label,
            applies,
            group,
        }
    }
}

use Applicability::{Always, Color, Normal};
use MetricGroup::{PointToPlane, PointToPoint, Qoe, TimeAndSize};

/// Lines printed by `pc_error` (final symmetric block)
pub const TOOL_FIELDS: &[MetricField] = &[
    MetricField::new("acd12_p2pt", "ACD1      (p2point): ", Always, PointToPoint),
    MetricField::new("acd21_p2pt", "ACD2      (p2point): ", Always, PointToPoint),
    MetricField::new("cd_p2pt", "CD        (p2point): ", Always, PointToPoint),
    MetricField::new("cdpsnr_p2pt", "CD,PSNR   (p2point): ", Always, PointToPoint),
    MetricField::new("h_p2pt", "h.        (p2point): ", Always, PointToPoint),
    MetricField::new("acd12_p2pl", "ACD1      (p2plane): ", Normal, PointToPlane),
    MetricField::new("acd21_p2pl", "ACD2      (p2plane): ", Normal, PointToPlane),
    MetricField::new("cd_p2pl", "CD        (p2plane): ", Normal, PointToPlane),
    MetricField::new("cdpsnr_p2pl", "CD,PSNR   (p2plane): ", Normal, PointToPlane),
    MetricField::new("h_p2pl", "h.        (p2plane): ", Normal, PointToPlane),
    MetricField::new("y_cpsnr", "c[0],PSNRF         : ", Color, MetricGroup::Color),
    MetricField::new("u_cpsnr", "c[1],PSNRF         : ", Color, MetricGroup::Color),
    MetricField::new("v_cpsnr", "c[2],PSNRF         : ", Color, MetricGroup::Color),
    MetricField::new("hybrid", "hybrid geo-color   : ", Color, Qoe),
];

/// Line printed by the diameter tool
pub const DIAMETER_FIELD: MetricField =
    MetricField::new("diameter", "Diameter distance: ", Always, TimeAndSize);

/// Lines of a per-sample report file, in print order
pub const REPORT_FIELDS: &[MetricField] = &[
    MetricField::new("enc_t", "Encoding time (s)           : ", Always, TimeAndSize),
    MetricField::new("dec_t", "Decoding time (s)           : ", Always, TimeAndSize),
    MetricField::new("src_size", "Source point cloud size (kB): ", Always, TimeAndSize),
    MetricField::new("bin_size", "Total binary files size (kB): ", Always, TimeAndSize),
    MetricField::new("ratio", "Compression ratio           : ", Always, TimeAndSize),
    MetricField::new("bpp", "bpp (bits per point)        : ", Always, TimeAndSize),
    MetricField::new("acd12_p2pt", "Asym. Chamfer dist. (1->2) p2pt: ", Always, PointToPoint),
    MetricField::new("acd21_p2pt", "Asym. Chamfer dist. (2->1) p2pt: ", Always, PointToPoint),
    MetricField::new("cd_p2pt", "Chamfer dist.              p2pt: ", Always, PointToPoint),
    MetricField::new("cdpsnr_p2pt", "CD-PSNR (dB)               p2pt: ", Always, PointToPoint),
    MetricField::new("h_p2pt", "Hausdorff distance         p2pt: ", Always, PointToPoint),
    MetricField::new("acd12_p2pl", "Asym. Chamfer dist. (1->2) p2pl: ", Normal, PointToPlane),
    MetricField::new("acd21_p2pl", "Asym. Chamfer dist. (2->1) p2pl: ", Normal, PointToPlane),
    MetricField::new("cd_p2pl", "Chamfer dist.              p2pl: ", Normal, PointToPlane),
    MetricField::new("cdpsnr_p2pl", "CD-PSNR (dB)               p2pl: ", Normal, PointToPlane),
    MetricField::new("h_p2pl", "Hausdorff distance         p2pl: ", Normal, PointToPlane),
    MetricField::new("y_cpsnr", "Y-CPSNR (dB)                   : ", Color, MetricGroup::Color),
    MetricField::new("u_cpsnr", "U-CPSNR (dB)                   : ", Color, MetricGroup::Color),
    MetricField::new("v_cpsnr", "V-CPSNR (dB)                   : ", Color, MetricGroup::Color),
    MetricField::new("hybrid", "Hybrid geo-color               : ", Color, Qoe),
];

/// Tool fields computed for a reference with the given capabilities
pub fn tool_fields(caps: Capabilities) -> Vec<MetricField> {
    TOOL_FIELDS
        .iter()
        .filter(|f| f.applies.applies(caps))
        .copied()
        .collect()
}

/// Report fields present for a sample with the given capabilities
pub fn report_fields(caps: Capabilities) -> Vec<MetricField> {
    REPORT_FIELDS
        .iter()
        .filter(|f| f.applies.applies(caps))
        .copied()
        .collect()
}

/// Fields collected by the dataset aggregator.
///
/// Point-to-plane fields are always collected; samples without normals
/// contribute not-available entries for them.
pub fn summary_fields(color: bool) -> Vec<MetricField> {
    report_fields(Capabilities::new(color, true))
}

pub fn report_field(key: &str) -> Option<&'static MetricField> {
    REPORT_FIELDS.iter().find(|f| f.key == key)
}

/// A parsed metric value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Finite(f64),
    Inf,
    NegInf,
    NaN,
    /// Label never found
    Missing,
}

impl MetricValue {
    pub fn from_f64(value: f64) -> Self {
        if value.is_nan() {
            MetricValue::NaN
        } else if value == f64::INFINITY {
            MetricValue::Inf
        } else if value == f64::NEG_INFINITY {
            MetricValue::NegInf
        } else {
            MetricValue::Finite(value)
        }
    }

    /// `None` maps to NaN: a quantity that was not computed
    pub fn from_option(value: Option<f64>) -> Self {
        value.map_or(MetricValue::NaN, Self::from_f64)
    }

    /// Interpret the token that follows `label`
    pub fn parse_token(label: &str, token: &str) -> Result<Self> {
        let token = token.trim();
        match token.to_ascii_lowercase().as_str() {
            "inf" | "+inf" => return Ok(MetricValue::Inf),
            "-inf" => return Ok(MetricValue::NegInf),
            "nan" | "-nan" | "+nan" => return Ok(MetricValue::NaN),
            _ => {}
        }
        if token == NOT_AVAILABLE {
            return Ok(MetricValue::Missing);
        }
        token
            .parse::<f64>()
            .map(Self::from_f64)
            .map_err(|_| ArenaError::Parse {
                label: label.to_string(),
                token: token.to_string(),
            })
    }

    pub fn finite(&self) -> Option<f64> {
        match self {
            MetricValue::Finite(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, MetricValue::Missing)
    }

    /// Value as f64, with `Missing` collapsed into NaN
    pub fn as_f64(&self) -> f64 {
        match self {
            MetricValue::Finite(v) => *v,
            MetricValue::Inf => f64::INFINITY,
            MetricValue::NegInf => f64::NEG_INFINITY,
            MetricValue::NaN | MetricValue::Missing => f64::NAN,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Finite(v) => write!(f, "{}", v),
            MetricValue::Inf => f.write_str("inf"),
            MetricValue::NegInf => f.write_str("-inf"),
            MetricValue::NaN => f.write_str("NaN"),
            MetricValue::Missing => f.write_str(NOT_AVAILABLE),
        }
    }
}

impl Serialize for MetricValue {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            MetricValue::Finite(v) => serializer.serialize_f64(*v),
            other => serializer.serialize_str(&other.to_string()),
        }
    }
}
