// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 PCC Arena Contributors

//! Label-anchored metric extraction from tool output

use std::collections::BTreeMap;
use tracing::debug;

use super::metrics::{MetricField, MetricValue};
use crate::error::Result;

/// Values keyed by `MetricField::key`
pub type MetricValues = BTreeMap<&'static str, MetricValue>;

/// Find the value following the first occurrence of `label`.
///
/// Labels are matched as literal text. Returns `MetricValue::Missing` when
/// no line contains the label.
pub fn find_value(text: &str, label: &str) -> Result<MetricValue> {
    for line in text.lines() {
        if let Some(pos) = line.find(label) {
            return MetricValue::parse_token(label, &line[pos + label.len()..]);
        }
    }
    Ok(MetricValue::Missing)
}

/// Extract every field in `fields` from `text`
pub fn parse_metrics(text: &str, fields: &[MetricField]) -> Result<MetricValues> {
    let mut values = MetricValues::new();
    for field in fields {
        let value = find_value(text, field.label)?;
        if value.is_missing() {
            debug!(key = field.key, label = field.label, "metric label not found");
        }
        values.insert(field.key, value);
    }
    Ok(values)
}
