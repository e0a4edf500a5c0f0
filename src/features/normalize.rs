use serde::{Deserialize, Serialize};

use crate::indicator::{window_stats, Window};
use crate::model::{NormalizedSignal, Signal, TimeSeries};

/// Below this the window is treated as constant and the score is undefined.
const MIN_DISPERSION: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizeMethod {
    #[serde(alias = "standard", alias = "z")]
    Zscore,
    Minmax,
}

/// Scoring applied uniformly to every signal in a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizationPolicy {
    pub method: NormalizeMethod,
    pub window: Window,
    /// Symmetric bound applied to standard scores.
    pub clip: f64,
    /// Warm-up for the expanding window. A rolling window always needs a
    /// full window of defined values.
    pub min_periods: usize,
}

impl Default for NormalizationPolicy {
    fn default() -> Self {
        Self {
            method: NormalizeMethod::Zscore,
            window: Window::Expanding,
            clip: 3.0,
            min_periods: 24,
        }
    }
}

impl NormalizationPolicy {
    pub fn effective_min_periods(&self) -> usize {
        match self.window {
            Window::Expanding => self.min_periods.max(1),
            Window::Rolling(n) => n.max(1),
        }
    }
}

/// Score a raw series with the policy, without any direction adjustment.
pub fn score_series(series: &TimeSeries, policy: &NormalizationPolicy) -> TimeSeries {
    let stats = window_stats(
        series.values(),
        policy.window,
        policy.effective_min_periods(),
    );
    let clip = policy.clip.abs();
    let scored = series
        .values()
        .iter()
        .zip(stats)
        .map(|(value, stats)| {
            let (x, st) = (value.filter(|v| v.is_finite())?, stats?);
            match policy.method {
                NormalizeMethod::Zscore => {
                    if st.std <= MIN_DISPERSION {
                        return None;
                    }
                    Some(((x - st.mean) / st.std).clamp(-clip, clip))
                }
                NormalizeMethod::Minmax => {
                    let range = st.max - st.min;
                    if range <= MIN_DISPERSION {
                        return None;
                    }
                    Some((x - st.min) / range)
                }
            }
        })
        .collect();
    TimeSeries::new(series.dates().to_vec(), scored)
}

/// Score a signal, then flip it when a higher raw value is bad. The flip
/// happens after clipping so the bound applies to the raw z-distribution.
pub fn normalize_signal(signal: &Signal, policy: &NormalizationPolicy) -> NormalizedSignal {
    let sign = signal.direction.sign();
    let scored = score_series(&signal.series, policy);
    NormalizedSignal {
        name: signal.name.clone(),
        series: scored.map_values(|z| z * sign),
    }
}
