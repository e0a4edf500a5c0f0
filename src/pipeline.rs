use std::sync::{Arc, Mutex, OnceLock};

use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;

use crate::config::Config;
use crate::error::{ForecastError, ForecastResult};
use crate::forecast::{fit_auto, ImpulseResponse, VarModel};
use crate::index::{build_index, rescale_0_100, CompositeIndex, RescaleWindow};
use crate::model::{month_end, month_end_after, TimeSeries};
use crate::scenario::{net_impulse_response, propagate, ScenarioImpact, ShockCoefficients, ShockSpec};
use crate::source::SignalSource;

/// Forecast and scenario knobs, resolved from [`Config`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineSettings {
    pub horizon: usize,
    pub max_order: usize,
    pub fallback_order: usize,
    pub rescale: RescaleWindow,
    pub neutral: f64,
    pub band_base: f64,
    pub band_slope: f64,
    pub fallback_band: f64,
    pub coefficients: ShockCoefficients,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            horizon: 12,
            max_order: 12,
            fallback_order: 4,
            rescale: RescaleWindow::default(),
            neutral: 50.0,
            band_base: 2.0,
            band_slope: 0.5,
            fallback_band: 5.0,
            coefficients: ShockCoefficients::default(),
        }
    }
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            horizon: config.forecast.horizon,
            max_order: config.forecast.max_order,
            fallback_order: config.forecast.fallback_order,
            rescale: config.rescale_window(),
            neutral: config.scale.neutral,
            band_base: config.forecast.band_base,
            band_slope: config.forecast.band_slope,
            fallback_band: config.forecast.fallback_band,
            coefficients: config.scenario,
        }
    }

    /// Half-width of the 80% band at forecast step `step` (1-based).
    ///
    /// Fixed linear heuristic, not derived from the model's forecast-error
    /// covariance.
    pub fn band_half_width(&self, step: usize) -> f64 {
        self.band_base + self.band_slope * step as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub value: f64,
}

fn points(dates: &[NaiveDate], values: &[f64]) -> Vec<ForecastPoint> {
    dates
        .iter()
        .zip(values)
        .map(|(date, value)| ForecastPoint {
            date: *date,
            value: *value,
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    /// Autoregressive order actually fitted; `None` when degraded.
    pub order: Option<usize>,
    pub order_fallback: bool,
    pub aic: Vec<(usize, f64)>,
    pub history_months: usize,
    pub degraded: bool,
    pub degraded_reason: Option<String>,
    pub unmapped_shocks: usize,
    pub unmapped_shock_keys: Vec<String>,
}

/// Everything a scenario request needs: computed once, then shared read-only.
#[derive(Debug, Clone)]
pub struct Baseline {
    pub index: CompositeIndex,
    pub model: Option<VarModel>,
    pub irf: Option<ImpulseResponse>,
    pub dates: Vec<NaiveDate>,
    /// Scaled (0-100) baseline forecast.
    pub forecast: Vec<f64>,
    pub lower80: Vec<f64>,
    pub upper80: Vec<f64>,
    pub diagnostics: Diagnostics,
    pub settings: PipelineSettings,
}

impl Baseline {
    pub fn is_degraded(&self) -> bool {
        self.diagnostics.degraded
    }

    pub fn latest_value(&self) -> Option<f64> {
        self.index.latest_value()
    }
}

struct ForecastStage {
    model: VarModel,
    irf: ImpulseResponse,
    dates: Vec<NaiveDate>,
    scaled: Vec<f64>,
    order_fallback: bool,
    aic: Vec<(usize, f64)>,
}

/// Rescale history and forecast raw composites as one series and return the
/// last `forecast_raw.len()` scaled values.
pub fn scale_forecast_path(
    history_raw: &TimeSeries,
    forecast_dates: &[NaiveDate],
    forecast_raw: &[f64],
    rescale: &RescaleWindow,
) -> ForecastResult<Vec<f64>> {
    if forecast_dates.len() != forecast_raw.len() {
        return Err(ForecastError::Config(format!(
            "forecast path has {} dates but {} values",
            forecast_dates.len(),
            forecast_raw.len()
        )));
    }
    if let (Some(last), Some(first)) = (history_raw.last_date(), forecast_dates.first()) {
        if *first <= last {
            return Err(ForecastError::Config(format!(
                "forecast starts at {} but history ends at {}",
                first, last
            )));
        }
    }
    let tail = TimeSeries::new(
        forecast_dates.to_vec(),
        forecast_raw.iter().copied().map(Some).collect(),
    );
    let combined = rescale_0_100(&history_raw.concat(&tail), rescale);
    let start = combined.len() - tail.len();
    combined.values()[start..]
        .iter()
        .map(|v| {
            v.ok_or_else(|| {
                ForecastError::insufficient(
                    "forecast rescale window",
                    rescale.min_periods,
                    history_raw.defined_count(),
                )
            })
        })
        .collect()
}

fn forecast_stage(index: &CompositeIndex, settings: &PipelineSettings) -> ForecastResult<ForecastStage> {
    let fitted = fit_auto(
        &index.contributions,
        settings.max_order,
        settings.fallback_order,
    )?;
    let forecast = fitted.model.forecast(settings.horizon);
    let scaled = scale_forecast_path(
        &index.raw,
        &forecast.dates,
        &forecast.composite,
        &settings.rescale,
    )?;
    let irf = fitted.model.impulse_response(settings.horizon)?;
    Ok(ForecastStage {
        irf,
        dates: forecast.dates,
        scaled,
        order_fallback: fitted.used_fallback,
        aic: fitted.selection.map(|s| s.aic).unwrap_or_default(),
        model: fitted.model,
    })
}

/// Flat continuation of `level` after `last_date`, flagged as degraded.
fn flat_baseline(
    index: CompositeIndex,
    settings: PipelineSettings,
    last_date: NaiveDate,
    level: f64,
    reason: String,
) -> Baseline {
    let horizon = settings.horizon;
    let dates = (1..=horizon)
        .map(|i| month_end_after(last_date, i as u32))
        .collect();
    Baseline {
        diagnostics: Diagnostics {
            history_months: index.raw.len(),
            degraded: true,
            degraded_reason: Some(reason),
            ..Diagnostics::default()
        },
        model: None,
        irf: None,
        dates,
        forecast: vec![level; horizon],
        lower80: vec![level - settings.fallback_band; horizon],
        upper80: vec![level + settings.fallback_band; horizon],
        index,
        settings,
    }
}

/// Fit, forecast and band the index. Data and fit failures in the forecast
/// stage degrade to a flat continuation of the last scaled value; any other
/// error is returned.
pub fn build_baseline(index: CompositeIndex, settings: PipelineSettings) -> ForecastResult<Baseline> {
    let last_date = index
        .raw
        .last_date()
        .ok_or_else(|| ForecastError::insufficient("baseline forecast", 1, 0))?;
    let horizon = settings.horizon;
    let history_months = index.raw.len();

    match forecast_stage(&index, &settings) {
        Ok(stage) => {
            let (lower80, upper80): (Vec<f64>, Vec<f64>) = stage
                .scaled
                .iter()
                .enumerate()
                .map(|(i, v)| {
                    let half = settings.band_half_width(i + 1);
                    (v - half, v + half)
                })
                .unzip();
            tracing::info!(
                order = stage.model.order(),
                order_fallback = stage.order_fallback,
                horizon,
                end = ?stage.scaled.last(),
                "Baseline forecast ready"
            );
            Ok(Baseline {
                diagnostics: Diagnostics {
                    order: Some(stage.model.order()),
                    order_fallback: stage.order_fallback,
                    aic: stage.aic,
                    history_months,
                    ..Diagnostics::default()
                },
                model: Some(stage.model),
                irf: Some(stage.irf),
                dates: stage.dates,
                forecast: stage.scaled,
                lower80,
                upper80,
                index,
                settings,
            })
        }
        Err(e) if e.is_recoverable() => {
            let level = index.latest_value().unwrap_or(settings.neutral);
            tracing::warn!(
                error = %e,
                flat_value = level,
                "Forecast unavailable; using flat continuation"
            );
            Ok(flat_baseline(index, settings, last_date, level, e.to_string()))
        }
        Err(e) => Err(e),
    }
}

/// Month-end of the latest finite observation across every configured series.
fn latest_observed_month(config: &Config, source: &dyn SignalSource) -> Option<NaiveDate> {
    config
        .buckets
        .iter()
        .flat_map(|bucket| &bucket.series)
        .filter_map(|series| source.fetch(&series.id).ok())
        .flatten()
        .filter(|obs| obs.value.is_finite())
        .map(|obs| month_end(obs.date))
        .max()
}

/// Build the index from `source` and forecast it. When the signals are too
/// short to form an index, the baseline is a flat neutral line after the
/// latest observed month.
pub fn build_baseline_from_source(config: &Config, source: &dyn SignalSource) -> ForecastResult<Baseline> {
    let settings = PipelineSettings::from_config(config);
    match build_index(config, source) {
        Ok(index) => build_baseline(index, settings),
        Err(e) if e.is_recoverable() => {
            let Some(last_date) = latest_observed_month(config, source) else {
                return Err(e);
            };
            tracing::warn!(
                error = %e,
                flat_value = settings.neutral,
                "Index unavailable; using neutral flat forecast"
            );
            let index = CompositeIndex::empty(config.bucket_weights())?;
            let level = settings.neutral;
            Ok(flat_baseline(index, settings, last_date, level, e.to_string()))
        }
        Err(e) => Err(e),
    }
}

/// Composite response of the index to a unit shock in one bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketImpulse {
    pub bucket: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastOutput {
    pub latest_value: Option<f64>,
    pub baseline_forecast: Vec<ForecastPoint>,
    pub scenario_forecast: Vec<ForecastPoint>,
    pub lower80: Vec<ForecastPoint>,
    pub upper80: Vec<ForecastPoint>,
    pub net_impulse_response: Vec<BucketImpulse>,
    pub diagnostics: Diagnostics,
}

/// Apply `shock` to a prepared baseline. Pure: the baseline is not modified.
pub fn run_scenario(baseline: &Baseline, shock: &ShockSpec) -> ForecastOutput {
    let horizon = baseline.forecast.len();
    let weights = &baseline.index.weights;
    let (impact, net) = match &baseline.irf {
        Some(irf) => {
            let impact = if shock.is_neutral() {
                ScenarioImpact::zero(horizon)
            } else {
                propagate(irf, &shock.mapping(), weights, horizon)
            };
            let net = irf
                .columns()
                .iter()
                .cloned()
                .zip(net_impulse_response(irf, weights))
                .map(|(bucket, values)| BucketImpulse { bucket, values })
                .collect();
            (impact, net)
        }
        None => (ScenarioImpact::zero(horizon), Vec::new()),
    };

    let scenario: Vec<f64> = baseline
        .forecast
        .iter()
        .zip(&impact.aligned)
        .map(|(b, d)| b + d)
        .collect();
    if !impact.applied.is_empty() {
        tracing::info!(
            applied = impact.applied.len(),
            unmapped = impact.unmapped.len(),
            end_delta = ?impact.aligned.last(),
            "Scenario propagated"
        );
    }

    let mut diagnostics = baseline.diagnostics.clone();
    diagnostics.unmapped_shocks = impact.unmapped.len();
    diagnostics.unmapped_shock_keys = impact.unmapped;

    ForecastOutput {
        latest_value: baseline.latest_value(),
        baseline_forecast: points(&baseline.dates, &baseline.forecast),
        scenario_forecast: points(&baseline.dates, &scenario),
        lower80: points(&baseline.dates, &baseline.lower80),
        upper80: points(&baseline.dates, &baseline.upper80),
        net_impulse_response: net,
        diagnostics,
    }
}

/// Process-lifetime memo of the baseline.
#[derive(Debug, Default)]
pub struct BaselineCache {
    slot: Mutex<Option<Arc<Baseline>>>,
}

impl BaselineCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> &'static BaselineCache {
        static SHARED: OnceLock<BaselineCache> = OnceLock::new();
        SHARED.get_or_init(BaselineCache::new)
    }

    /// Return the cached baseline, building it on first use. The lock is
    /// held while building so concurrent first callers build once.
    pub fn get_or_build<F>(&self, build: F) -> Result<Arc<Baseline>>
    where
        F: FnOnce() -> ForecastResult<Baseline>,
    {
        let mut guard = self
            .slot
            .lock()
            .map_err(|_| anyhow::anyhow!("baseline cache lock poisoned"))?;
        if let Some(baseline) = guard.as_ref() {
            return Ok(Arc::clone(baseline));
        }
        let baseline = Arc::new(build()?);
        *guard = Some(Arc::clone(&baseline));
        Ok(baseline)
    }

    pub fn get(&self) -> Result<Option<Arc<Baseline>>> {
        let guard = self
            .slot
            .lock()
            .map_err(|_| anyhow::anyhow!("baseline cache lock poisoned"))?;
        Ok(guard.clone())
    }

    pub fn clear(&self) -> Result<()> {
        let mut guard = self
            .slot
            .lock()
            .map_err(|_| anyhow::anyhow!("baseline cache lock poisoned"))?;
        *guard = None;
        Ok(())
    }
}
