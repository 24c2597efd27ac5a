use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{BackendError, Result};

pub const LATENCY: &str = "latency";
pub const LATENCY_STD: &str = "latency_std";
pub const LATENCY_MIN: &str = "latency_min";
pub const LATENCY_MAX: &str = "latency_max";

/// Metrics a sample-based profiler can derive from per-run timings.
pub const LATENCY_METRICS: [&str; 4] = [LATENCY, LATENCY_STD, LATENCY_MIN, LATENCY_MAX];

/// Metric name to value. Latencies are in milliseconds.
pub type Metrics = BTreeMap<String, f64>;

/// How per-run samples collapse into the `latency` metric.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reduction {
    #[default]
    Mean,
    Median,
    Min,
}

impl Reduction {
    pub fn apply(self, samples: &[f64]) -> Option<f64> {
        if samples.is_empty() {
            return None;
        }
        Some(match self {
            Reduction::Mean => mean(samples),
            Reduction::Median => {
                let sorted = sorted(samples);
                let mid = sorted.len() / 2;
                if sorted.len() % 2 == 0 {
                    (sorted[mid - 1] + sorted[mid]) / 2.0
                } else {
                    sorted[mid]
                }
            }
            Reduction::Min => sorted(samples)[0],
        })
    }
}

fn mean(samples: &[f64]) -> f64 {
    samples.iter().sum::<f64>() / samples.len() as f64
}

fn sorted(samples: &[f64]) -> Vec<f64> {
    let mut v = samples.to_vec();
    v.sort_by(f64::total_cmp);
    v
}

/// Population standard deviation.
pub fn std_dev(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let m = mean(samples);
    let var = samples.iter().map(|s| (s - m).powi(2)).sum::<f64>() / samples.len() as f64;
    Some(var.sqrt())
}

/// Fails on the first requested name outside [`LATENCY_METRICS`].
pub fn ensure_supported(requested: &[&str]) -> Result<()> {
    match requested.iter().find(|m| !LATENCY_METRICS.contains(*m)) {
        Some(name) => Err(BackendError::UnsupportedMetric((*name).to_string())),
        None => Ok(()),
    }
}

/// Reduces `samples` to exactly the requested metrics.
pub fn summarize(requested: &[&str], samples: &[f64], reduction: Reduction) -> Result<Metrics> {
    ensure_supported(requested)?;
    let mut out = Metrics::new();
    for &name in requested {
        let value = match name {
            LATENCY => reduction.apply(samples),
            LATENCY_STD => std_dev(samples),
            LATENCY_MIN => Reduction::Min.apply(samples),
            _ => sorted(samples).last().copied(),
        };
        let value =
            value.ok_or_else(|| BackendError::MalformedOutput("no timing samples".to_string()))?;
        out.insert(name.to_string(), value);
    }
    Ok(out)
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProfileResult {
    pub metrics: Metrics,
    pub artifact: PathBuf,
    pub trials: usize,
}

impl ProfileResult {
    pub fn empty(artifact: impl Into<PathBuf>) -> Self {
        Self {
            metrics: Metrics::new(),
            artifact: artifact.into(),
            trials: 0,
        }
    }

    pub fn get(&self, metric: &str) -> Option<f64> {
        self.metrics.get(metric).copied()
    }
}
