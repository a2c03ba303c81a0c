// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime statistics over a task's execution history

use serde::Serialize;

/// Samples needed before an outlier threshold is trusted (exclusive)
pub const MIN_OUTLIER_SAMPLES: usize = 5;

/// Default number of standard deviations above the mean
pub const DEFAULT_STDDEV_MULTIPLIER: f64 = 2.0;

/// Mean and population standard deviation of runtimes in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RuntimeStats {
    pub samples: usize,
    pub mean: f64,
    pub stddev: f64,
}

impl RuntimeStats {
    /// `None` for an empty sample
    pub fn from_runtimes(runtimes: &[f64]) -> Option<Self> {
        if runtimes.is_empty() {
            return None;
        }
        let n = runtimes.len() as f64;
        let mean = runtimes.iter().sum::<f64>() / n;
        let variance = runtimes.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
        Some(Self {
            samples: runtimes.len(),
            mean,
            stddev: variance.sqrt(),
        })
    }

    /// `mean + multiplier * stddev`, or `None` with too little history
    pub fn outlier_threshold(&self, multiplier: f64) -> Option<f64> {
        if self.samples <= MIN_OUTLIER_SAMPLES {
            return None;
        }
        Some(self.mean + multiplier * self.stddev)
    }
}

/// Outlier threshold straight from a list of runtimes
pub fn runtime_outlier_threshold(runtimes: &[f64], multiplier: f64) -> Option<f64> {
    RuntimeStats::from_runtimes(runtimes)?.outlier_threshold(multiplier)
}
