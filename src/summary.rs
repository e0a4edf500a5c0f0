use serde::Serialize;

use crate::index::CompositeIndex;
use crate::scenario::BUCKET_PREFIX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Regime {
    #[serde(rename = "Robust Expansion")]
    RobustExpansion,
    #[serde(rename = "Moderate Expansion")]
    ModerateExpansion,
    #[serde(rename = "Cooling / Neutral")]
    Cooling,
    Contraction,
}

impl Regime {
    pub fn classify(value: f64) -> Self {
        if value >= 60.0 {
            Self::RobustExpansion
        } else if value >= 50.0 {
            Self::ModerateExpansion
        } else if value >= 40.0 {
            Self::Cooling
        } else {
            Self::Contraction
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outlook {
    Improving,
    Softening,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Driver {
    pub bucket: String,
    pub contribution: f64,
}

/// Numeric snapshot of the index for narrative layers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexSummary {
    pub latest_value: f64,
    pub regime: Regime,
    pub change_mom: Option<f64>,
    pub change_yoy: f64,
    pub outlook: Option<Outlook>,
    pub forecast_end: Option<f64>,
    pub top_driver: Option<Driver>,
    pub lagging_driver: Option<Driver>,
}

fn display_bucket(name: &str) -> String {
    let trimmed = name.trim();
    let stripped = match trimmed.get(..BUCKET_PREFIX.len()) {
        Some(head) if head.eq_ignore_ascii_case(BUCKET_PREFIX) => &trimmed[BUCKET_PREFIX.len()..],
        _ => trimmed,
    };
    stripped.replace('_', " ")
}

impl IndexSummary {
    /// `None` when the index has no defined scaled value yet.
    pub fn from_index(index: &CompositeIndex, forecast: &[f64]) -> Option<Self> {
        let scaled: Vec<f64> = index
            .scaled
            .defined_points()
            .into_iter()
            .map(|(_, v)| v)
            .collect();
        let latest = *scaled.last()?;
        let n = scaled.len();
        let change_mom = (n >= 2).then(|| latest - scaled[n - 2]);
        let year_ago = if n > 12 { scaled[n - 13] } else { scaled[0] };

        let forecast_end = forecast.last().copied();
        let outlook = forecast_end.map(|end| {
            if end > latest {
                Outlook::Improving
            } else {
                Outlook::Softening
            }
        });

        let (top_driver, lagging_driver) = match index.contributions.nrows() {
            0 => (None, None),
            rows => {
                let last = index.contributions.row(rows - 1);
                let mut drivers: Vec<Driver> = index
                    .contributions
                    .columns()
                    .iter()
                    .zip(last.iter())
                    .map(|(name, v)| Driver {
                        bucket: display_bucket(name),
                        contribution: *v,
                    })
                    .collect();
                drivers.sort_by(|a, b| b.contribution.total_cmp(&a.contribution));
                (drivers.first().cloned(), drivers.last().cloned())
            }
        };

        Some(Self {
            latest_value: latest,
            regime: Regime::classify(latest),
            change_mom,
            change_yoy: latest - year_ago,
            outlook,
            forecast_end,
            top_driver,
            lagging_driver,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regime_thresholds() {
        assert_eq!(Regime::classify(60.0), Regime::RobustExpansion);
        assert_eq!(Regime::classify(59.9), Regime::ModerateExpansion);
        assert_eq!(Regime::classify(50.0), Regime::ModerateExpansion);
        assert_eq!(Regime::classify(40.0), Regime::Cooling);
        assert_eq!(Regime::classify(39.99), Regime::Contraction);
    }

    #[test]
    fn bucket_display_name_drops_prefix() {
        assert_eq!(display_bucket("BKT_Credit"), "Credit");
        assert_eq!(display_bucket("bkt_risk_appetite"), "risk appetite");
        assert_eq!(display_bucket("Valuation"), "Valuation");
    }

    #[test]
    fn summary_from_index() {
        use crate::index::{build_composite, RescaleWindow, WeightedBucket};
        use crate::model::{month_end_after, TimeSeries};
        use chrono::NaiveDate;

        let start = NaiveDate::from_ymd_opt(2020, 1, 31).unwrap();
        let bucket = |name: &str, weight: f64, f: fn(f64) -> f64| WeightedBucket {
            name: name.to_string(),
            weight,
            series: TimeSeries::from_points(
                (0..20).map(|i| (month_end_after(start, i), Some(f(i as f64)))),
            ),
        };
        let index = build_composite(
            &[
                bucket("BKT_Credit", 1.0, |t| t),
                bucket("Valuation", 1.0, |t| -0.5 * t),
            ],
            &RescaleWindow {
                window: 30,
                min_periods: 2,
            },
        )
        .unwrap();
        let summary = IndexSummary::from_index(&index, &[90.0, 80.0]).unwrap();
        // Raw composite rises every month, so each point is the running max.
        assert!((summary.latest_value - 100.0).abs() < 1e-9);
        assert_eq!(summary.regime, Regime::RobustExpansion);
        assert!(summary.change_mom.unwrap().abs() < 1e-9);
        assert_eq!(summary.outlook, Some(Outlook::Softening));
        assert_eq!(summary.forecast_end, Some(80.0));
        assert_eq!(summary.top_driver.unwrap().bucket, "Credit");
        assert_eq!(summary.lagging_driver.unwrap().bucket, "Valuation");
    }

    #[test]
    fn regime_serializes_with_display_label() {
        let json = serde_json::to_string(&Regime::Cooling).unwrap();
        assert_eq!(json, "\"Cooling / Neutral\"");
    }
}
