//! Raw p-values and Holm step-down correction.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Add-one smoothed one-sided p-value: `(1 + #{null >= observed}) / (1 + K)`.
pub fn p_raw(exceed: usize, samples: usize) -> f64 {
    (1 + exceed) as f64 / (1 + samples) as f64
}

/// Holm adjustment: the i-th smallest raw value (0-based) is multiplied by
/// `m - i` and clipped to 1. Output is in input order.
///
/// No running maximum is taken over the sorted sequence.
pub fn holm_adjust(raw: &[f64]) -> Vec<f64> {
    let m = raw.len();
    let mut order: Vec<usize> = (0..m).collect();
    // stable: ties keep input order
    order.sort_by(|&a, &b| raw[a].total_cmp(&raw[b]));
    let mut adjusted = vec![0.0; m];
    for (rank, &idx) in order.iter().enumerate() {
        adjusted[idx] = (raw[idx] * (m - rank) as f64).min(1.0);
    }
    adjusted
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricP {
    pub p_raw: f64,
    pub p_holm: f64,
}

/// `holm_report_canonical.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HolmReport {
    #[serde(rename = "K")]
    pub samples: usize,
    pub metrics: BTreeMap<String, MetricP>,
    pub publishable: bool,
}

impl HolmReport {
    /// Adjust `raw` (metric name, p) and decide publishability at `alpha`.
    pub fn from_raw(samples: usize, raw: &[(String, f64)], alpha: f64) -> Self {
        let values: Vec<f64> = raw.iter().map(|(_, p)| *p).collect();
        let adjusted = holm_adjust(&values);
        let metrics: BTreeMap<String, MetricP> = raw
            .iter()
            .zip(&adjusted)
            .map(|((name, p), &h)| {
                (
                    name.clone(),
                    MetricP {
                        p_raw: *p,
                        p_holm: h,
                    },
                )
            })
            .collect();
        let publishable = !metrics.is_empty() && metrics.values().all(|m| m.p_holm < alpha);
        HolmReport {
            samples,
            metrics,
            publishable,
        }
    }
}
