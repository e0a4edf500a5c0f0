use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, ForecastResult};

/// Family prefix carried by shock keys; forecaster columns omit it.
pub const BUCKET_PREFIX: &str = "BKT_";

pub const CONFIDENCE_BEAR: f64 = -20.0;
pub const CONFIDENCE_BULL: f64 = 20.0;
pub const VOLATILITY_HIGH: f64 = 10.0;
pub const VOLATILITY_LOW: f64 = -5.0;

/// Index points per unit of each dial, tuned for the 0-100 scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShockCoefficients {
    /// Points per 100bp of rate change.
    #[serde(default = "default_k_rate")]
    pub k_rate: f64,
    /// Points per 20 points of confidence.
    #[serde(default = "default_k_conf")]
    pub k_conf: f64,
    /// Points per 10 points of volatility.
    #[serde(default = "default_k_vol")]
    pub k_vol: f64,
}

fn default_k_rate() -> f64 {
    15.0
}

fn default_k_conf() -> f64 {
    20.0
}

fn default_k_vol() -> f64 {
    15.0
}

impl Default for ShockCoefficients {
    fn default() -> Self {
        Self {
            k_rate: default_k_rate(),
            k_conf: default_k_conf(),
            k_vol: default_k_vol(),
        }
    }
}

/// User-facing macro dials.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ShockDials {
    pub rate_change_bps: f64,
    pub confidence_shock: f64,
    pub volatility_shock: f64,
}

/// Shock magnitude for one bucket, keyed with the family prefix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketShock {
    pub key: String,
    pub magnitude: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ShockSpec {
    pub dials: ShockDials,
    pub coefficients: ShockCoefficients,
}

impl ShockSpec {
    pub fn new(dials: ShockDials, coefficients: ShockCoefficients) -> Self {
        Self {
            dials,
            coefficients,
        }
    }

    /// A rate increase is a negative shock to deal conditions.
    pub fn rate_impact(&self) -> f64 {
        -(self.dials.rate_change_bps / 100.0) * self.coefficients.k_rate
    }

    pub fn confidence_impact(&self) -> f64 {
        (self.dials.confidence_shock / 20.0) * self.coefficients.k_conf
    }

    pub fn volatility_impact(&self) -> f64 {
        -(self.dials.volatility_shock / 10.0) * self.coefficients.k_vol
    }

    /// Per-bucket magnitudes, including the cross-terms.
    pub fn mapping(&self) -> Vec<BucketShock> {
        let rate = self.rate_impact();
        let conf = self.confidence_impact();
        let vol = self.volatility_impact();
        [
            ("Credit", rate + vol * 0.5),
            ("Sentiment", conf + vol * 0.2),
            ("Valuation", rate),
            ("Volatility", vol),
            ("Liquidity", rate + conf * 0.3),
        ]
        .into_iter()
        .map(|(bucket, magnitude)| BucketShock {
            key: format!("{}{}", BUCKET_PREFIX, bucket),
            magnitude,
        })
        .collect()
    }

    pub fn is_neutral(&self) -> bool {
        self.mapping().iter().all(|s| s.magnitude == 0.0)
    }
}

fn parse_dial(kind: &str, raw: &str, presets: &[(&str, f64)]) -> ForecastResult<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(0.0);
    }
    if let Some((_, v)) = presets
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(trimmed))
    {
        return Ok(*v);
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(ForecastError::Config(format!(
            "invalid {} dial '{}': expected a number or one of {}",
            kind,
            raw,
            presets
                .iter()
                .map(|(name, _)| *name)
                .collect::<Vec<_>>()
                .join("/")
        ))),
    }
}

pub fn parse_rate_dial(raw: &str) -> ForecastResult<f64> {
    parse_dial("rate", raw, &[])
}

/// `Bear` / `Neutral` / `Bull` or a number.
pub fn parse_confidence_dial(raw: &str) -> ForecastResult<f64> {
    parse_dial(
        "confidence",
        raw,
        &[
            ("Bear", CONFIDENCE_BEAR),
            ("Neutral", 0.0),
            ("Bull", CONFIDENCE_BULL),
        ],
    )
}

/// `Low` / `Normal` / `High` or a number.
pub fn parse_volatility_dial(raw: &str) -> ForecastResult<f64> {
    parse_dial(
        "volatility",
        raw,
        &[
            ("Low", VOLATILITY_LOW),
            ("Normal", 0.0),
            ("High", VOLATILITY_HIGH),
        ],
    )
}
