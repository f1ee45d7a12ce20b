// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 PCC Arena Contributors

//! Finite-only summary statistics

use serde::Serialize;

use super::metrics::MetricValue;

/// One of the four aggregate statistics, in print order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Statistic {
    #[serde(rename = "avg")]
    Average,
    #[serde(rename = "stdev")]
    StandardDeviation,
    #[serde(rename = "max")]
    Maximum,
    #[serde(rename = "min")]
    Minimum,
}

impl Statistic {
    pub const ALL: [Statistic; 4] = [
        Statistic::Average,
        Statistic::StandardDeviation,
        Statistic::Maximum,
        Statistic::Minimum,
    ];

    /// Line prefix used in summary files and collated column names
    pub fn prefix(self) -> &'static str {
        match self {
            Statistic::Average => "avg",
            Statistic::StandardDeviation => "stdev",
            Statistic::Maximum => "max",
            Statistic::Minimum => "min",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Statistic::Average => "Average",
            Statistic::StandardDeviation => "Standard Deviation",
            Statistic::Maximum => "Maximum",
            Statistic::Minimum => "Minimum",
        }
    }
}

/// Statistics of one metric over the finite entries of a column.
///
/// Every statistic is `None` when the column has no finite entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StatSummary {
    pub count: usize,
    pub mean: Option<f64>,
    pub stdev: Option<f64>,
    pub max: Option<f64>,
    pub min: Option<f64>,
}

impl StatSummary {
    pub fn from_values(values: &[MetricValue]) -> Self {
        let finite: Vec<f64> = values.iter().filter_map(MetricValue::finite).collect();
        if finite.is_empty() {
            return Self::default();
        }

        let n = finite.len() as f64;
        let mean = finite.iter().sum::<f64>() / n;
        let variance = finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = finite.iter().copied().fold(f64::INFINITY, f64::min);

        Self {
            count: finite.len(),
            mean: Some(mean),
            stdev: Some(variance.sqrt()),
            max: Some(max),
            min: Some(min),
        }
    }

    pub fn get(&self, stat: Statistic) -> Option<f64> {
        match stat {
            Statistic::Average => self.mean,
            Statistic::StandardDeviation => self.stdev,
            Statistic::Maximum => self.max,
            Statistic::Minimum => self.min,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_non_finite_excluded() {
        let values = [
            MetricValue::Finite(2.0),
            MetricValue::Inf,
            MetricValue::Finite(4.0),
            MetricValue::NaN,
            MetricValue::Missing,
            MetricValue::NegInf,
        ];
        let stats = StatSummary::from_values(&values);
        assert_eq!(stats.count, 2);
        assert_relative_eq!(stats.mean.unwrap(), 3.0);
        assert_relative_eq!(stats.stdev.unwrap(), 1.0);
        assert_eq!(stats.max, Some(4.0));
        assert_eq!(stats.min, Some(2.0));
    }

    #[test]
    fn test_empty_is_undefined() {
        let stats = StatSummary::from_values(&[MetricValue::Inf, MetricValue::Missing]);
        assert_eq!(stats.count, 0);
        for stat in Statistic::ALL {
            assert_eq!(stats.get(stat), None);
        }
    }

    #[test]
    fn test_single_value() {
        let stats = StatSummary::from_values(&[MetricValue::Finite(-1.5)]);
        assert_eq!(stats.stdev, Some(0.0));
        assert_eq!(stats.get(Statistic::Maximum), Some(-1.5));
    }
}
