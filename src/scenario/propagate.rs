use std::collections::HashMap;

use serde::Serialize;

use crate::forecast::ImpulseResponse;
use crate::scenario::shock::{BucketShock, BUCKET_PREFIX};

/// Lower-cased bucket name with the family prefix removed.
pub fn normalize_bucket_name(name: &str) -> String {
    let lower = name.trim().to_ascii_lowercase();
    let prefix = BUCKET_PREFIX.to_ascii_lowercase();
    match lower.strip_prefix(&prefix) {
        Some(rest) => rest.to_string(),
        None => lower,
    }
}

/// Result of pushing a set of bucket shocks through an impulse response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioImpact {
    /// Weighted composite response per IRF step, summed over shocks.
    pub per_step: Vec<f64>,
    /// Cumulated response mapped onto forecast steps `1..=H`.
    pub aligned: Vec<f64>,
    /// Shock keys that matched no forecaster column.
    pub unmapped: Vec<String>,
    /// Shock keys actually propagated.
    pub applied: Vec<String>,
}

impl ScenarioImpact {
    pub fn zero(horizon: usize) -> Self {
        Self {
            per_step: Vec::new(),
            aligned: vec![0.0; horizon],
            unmapped: Vec::new(),
            applied: Vec::new(),
        }
    }
}

/// Composite response to a unit shock in each forecaster column, weighted
/// the same way as the index. `result[s][step]`.
pub fn net_impulse_response(irf: &ImpulseResponse, weights: &[(String, f64)]) -> Vec<Vec<f64>> {
    let w = column_weights(irf.columns(), weights);
    (0..irf.columns().len())
        .map(|shocked| weighted_path(irf, shocked, &w, 1.0))
        .collect()
}

fn column_weights(columns: &[String], weights: &[(String, f64)]) -> Vec<f64> {
    let lookup: HashMap<String, f64> = weights
        .iter()
        .map(|(name, w)| (normalize_bucket_name(name), *w))
        .collect();
    columns
        .iter()
        .map(|c| {
            lookup
                .get(&normalize_bucket_name(c))
                .copied()
                .unwrap_or(0.0)
        })
        .collect()
}

fn weighted_path(irf: &ImpulseResponse, shocked: usize, weights: &[f64], magnitude: f64) -> Vec<f64> {
    let responses = irf.shock_column(shocked);
    responses
        .rows()
        .into_iter()
        .map(|row| {
            row.iter()
                .zip(weights)
                .map(|(r, w)| r * magnitude * w)
                .sum::<f64>()
        })
        .collect()
}

/// Propagate `shocks` through `irf` and cumulate.
///
/// Zero-magnitude shocks are skipped. Keys that match no column after
/// normalization are reported in `unmapped` and otherwise ignored. Step 0
/// is the own-period impact; when the response covers more than `horizon`
/// steps, steps `1..=horizon` map onto the forecast.
pub fn propagate(
    irf: &ImpulseResponse,
    shocks: &[BucketShock],
    weights: &[(String, f64)],
    horizon: usize,
) -> ScenarioImpact {
    let columns: HashMap<String, usize> = irf
        .columns()
        .iter()
        .enumerate()
        .map(|(i, c)| (normalize_bucket_name(c), i))
        .collect();
    let w = column_weights(irf.columns(), weights);

    let mut per_step = vec![0.0; irf.steps()];
    let mut unmapped = Vec::new();
    let mut applied = Vec::new();
    for shock in shocks {
        if shock.magnitude == 0.0 {
            continue;
        }
        let Some(&shocked) = columns.get(&normalize_bucket_name(&shock.key)) else {
            tracing::warn!(key = %shock.key, magnitude = shock.magnitude, "Unmapped scenario shock");
            unmapped.push(shock.key.clone());
            continue;
        };
        for (acc, v) in per_step
            .iter_mut()
            .zip(weighted_path(irf, shocked, &w, shock.magnitude))
        {
            *acc += v;
        }
        applied.push(shock.key.clone());
    }

    let cumulative: Vec<f64> = per_step
        .iter()
        .scan(0.0, |total, v| {
            *total += v;
            Some(*total)
        })
        .collect();
    let mut aligned: Vec<f64> = if cumulative.len() > horizon {
        cumulative[1..=horizon].to_vec()
    } else {
        cumulative.iter().copied().take(horizon).collect()
    };
    // Short responses hold their last cumulated level.
    let hold = aligned.last().copied().unwrap_or(0.0);
    aligned.resize(horizon, hold);

    ScenarioImpact {
        per_step,
        aligned,
        unmapped,
        applied,
    }
}
