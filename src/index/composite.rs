use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, ForecastResult};
use crate::indicator::{window_stats, Window};
use crate::model::{BucketMatrix, TimeSeries};

const MIN_RANGE: f64 = 1e-12;

/// Rolling min-max window used to map the raw composite onto 0-100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RescaleWindow {
    pub window: usize,
    pub min_periods: usize,
}

impl Default for RescaleWindow {
    fn default() -> Self {
        Self {
            window: 120,
            min_periods: 60,
        }
    }
}

/// `100 * (x - rolling_min) / (rolling_max - rolling_min)`.
///
/// Points before `min_periods` observations have accumulated, or inside a
/// flat window, are `None`. Every defined value lies in `[0, 100]`. The same
/// function rescales history alone and history extended with a forecast.
pub fn rescale_0_100(raw: &TimeSeries, rescale: &RescaleWindow) -> TimeSeries {
    let stats = window_stats(
        raw.values(),
        Window::Rolling(rescale.window.max(1)),
        rescale.min_periods.clamp(1, rescale.window.max(1)),
    );
    let scaled = raw
        .values()
        .iter()
        .zip(stats)
        .map(|(value, stats)| {
            let (x, st) = ((*value)?, stats?);
            let range = st.max - st.min;
            if range <= MIN_RANGE {
                return None;
            }
            // Divide first so the window maximum maps to exactly 100.
            Some((100.0 * ((x - st.min) / range)).clamp(0.0, 100.0))
        })
        .collect();
    TimeSeries::new(raw.dates().to_vec(), scaled)
}

/// Input to the composite: an aggregated bucket plus its weight.
#[derive(Debug, Clone)]
pub struct WeightedBucket {
    pub name: String,
    pub weight: f64,
    pub series: TimeSeries,
}

#[derive(Debug, Clone)]
pub struct CompositeIndex {
    /// `sum_b weight_b * bucket_b` on the dates every bucket defines.
    pub raw: TimeSeries,
    /// `raw` rescaled onto 0-100.
    pub scaled: TimeSeries,
    /// `weight_b * bucket_b`, one column per bucket in configuration order.
    pub contributions: BucketMatrix,
    pub weights: Vec<(String, f64)>,
}

impl CompositeIndex {
    /// Index with no rows, used when history is too short to build one.
    pub fn empty(weights: Vec<(String, f64)>) -> ForecastResult<Self> {
        let columns: Vec<String> = weights.iter().map(|(name, _)| name.clone()).collect();
        let contributions =
            BucketMatrix::new(Vec::new(), columns, Array2::zeros((0, weights.len())))?;
        Ok(Self {
            raw: TimeSeries::default(),
            scaled: TimeSeries::default(),
            contributions,
            weights,
        })
    }

    pub fn latest_value(&self) -> Option<f64> {
        self.scaled.last_defined().map(|(_, v)| v)
    }
}

pub fn build_composite(
    buckets: &[WeightedBucket],
    rescale: &RescaleWindow,
) -> ForecastResult<CompositeIndex> {
    let Some(first) = buckets.first() else {
        return Err(ForecastError::Config(
            "composite needs at least one bucket".to_string(),
        ));
    };

    // Inner join: keep dates where every bucket is defined.
    let dates: Vec<_> = first
        .series
        .iter()
        .filter(|(date, value)| {
            value.is_some() && buckets[1..].iter().all(|b| b.series.get(*date).is_some())
        })
        .map(|(date, _)| date)
        .collect();
    if dates.is_empty() {
        return Err(ForecastError::insufficient(
            "composite index (no date defined in every bucket)",
            1,
            0,
        ));
    }

    let mut data = Array2::<f64>::zeros((dates.len(), buckets.len()));
    for (row, date) in dates.iter().enumerate() {
        for (col, bucket) in buckets.iter().enumerate() {
            let v = bucket.series.get(*date).unwrap_or_default();
            data[[row, col]] = bucket.weight * v;
        }
    }
    let columns = buckets.iter().map(|b| b.name.clone()).collect();
    let contributions = BucketMatrix::new(dates.clone(), columns, data)?;
    let raw = TimeSeries::new(
        dates,
        contributions.row_sums().into_iter().map(Some).collect(),
    );
    let scaled = rescale_0_100(&raw, rescale);

    Ok(CompositeIndex {
        raw,
        scaled,
        contributions,
        weights: buckets.iter().map(|b| (b.name.clone(), b.weight)).collect(),
    })
}
