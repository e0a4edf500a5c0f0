use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::features::{NormalizationPolicy, NormalizeMethod};
use crate::index::RescaleWindow;
use crate::indicator::Window;
use crate::model::Direction;
use crate::scenario::ShockCoefficients;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
pub const CONFIG_PATH_ENV: &str = "MA_HEALTH_CONFIG";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub normalize: NormalizeConfig,
    #[serde(default)]
    pub scale: ScaleConfig,
    #[serde(default)]
    pub forecast: ForecastConfig,
    #[serde(default)]
    pub scenario: ShockCoefficients,
    pub buckets: Vec<BucketConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WindowSetting {
    Periods(usize),
    Named(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct NormalizeConfig {
    pub method: NormalizeMethod,
    pub window: WindowSetting,
    pub clip_z: f64,
    #[serde(default = "default_normalize_min_periods")]
    pub min_periods: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScaleConfig {
    #[serde(default = "default_scale_window")]
    pub window_months: usize,
    #[serde(default = "default_scale_min_periods")]
    pub min_periods: usize,
    #[serde(default = "default_neutral")]
    pub neutral: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastConfig {
    #[serde(default = "default_horizon")]
    pub horizon: usize,
    #[serde(default = "default_max_order")]
    pub max_order: usize,
    #[serde(default = "default_fallback_order")]
    pub fallback_order: usize,
    #[serde(default = "default_band_base")]
    pub band_base: f64,
    #[serde(default = "default_band_slope")]
    pub band_slope: f64,
    #[serde(default = "default_fallback_band")]
    pub fallback_band: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BucketConfig {
    pub name: String,
    pub weight: f64,
    pub series: Vec<SeriesConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeriesConfig {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub direction: Direction,
}

impl SeriesConfig {
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

fn default_normalize_min_periods() -> usize {
    24
}

fn default_scale_window() -> usize {
    120
}

fn default_scale_min_periods() -> usize {
    60
}

fn default_neutral() -> f64 {
    50.0
}

fn default_horizon() -> usize {
    12
}

fn default_max_order() -> usize {
    12
}

fn default_fallback_order() -> usize {
    4
}

fn default_band_base() -> f64 {
    2.0
}

fn default_band_slope() -> f64 {
    0.5
}

fn default_fallback_band() -> f64 {
    5.0
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            window_months: default_scale_window(),
            min_periods: default_scale_min_periods(),
            neutral: default_neutral(),
        }
    }
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon: default_horizon(),
            max_order: default_max_order(),
            fallback_order: default_fallback_order(),
            band_base: default_band_base(),
            band_slope: default_band_slope(),
            fallback_band: default_fallback_band(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Parse a normalization window: `"expanding"` or a positive period count.
pub fn parse_normalize_window(s: &str) -> Result<Window> {
    let trimmed = s.trim();
    if trimmed.eq_ignore_ascii_case("expanding") {
        return Ok(Window::Expanding);
    }
    let n: usize = trimmed.parse().with_context(|| {
        format!(
            "invalid normalize window '{}': expected 'expanding' or a positive integer",
            s
        )
    })?;
    if n == 0 {
        bail!("invalid normalize window '{}': period must be > 0", s);
    }
    Ok(Window::Rolling(n))
}

impl NormalizeConfig {
    pub fn window(&self) -> Result<Window> {
        match &self.window {
            WindowSetting::Periods(0) => bail!("normalize.window must be > 0"),
            WindowSetting::Periods(n) => Ok(Window::Rolling(*n)),
            WindowSetting::Named(s) => parse_normalize_window(s),
        }
    }
}

impl Config {
    /// Load from `MA_HEALTH_CONFIG` or `config/default.toml`.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        let path = std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&config_str)
            .with_context(|| format!("failed to load {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).context("failed to parse config TOML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.buckets.is_empty() {
            bail!("at least one [[buckets]] entry is required");
        }
        let mut seen = HashSet::new();
        for bucket in &self.buckets {
            let key = bucket.name.trim().to_ascii_lowercase();
            if key.is_empty() {
                bail!("bucket name must not be empty");
            }
            if !seen.insert(key) {
                bail!("duplicate bucket '{}'", bucket.name);
            }
            if !bucket.weight.is_finite() {
                bail!("bucket '{}' has a non-finite weight", bucket.name);
            }
            if bucket.series.is_empty() {
                bail!("bucket '{}' has no series", bucket.name);
            }
        }

        self.normalize
            .window()
            .context("normalize.window is invalid")?;
        if !(self.normalize.clip_z.is_finite() && self.normalize.clip_z > 0.0) {
            bail!("normalize.clip_z must be > 0");
        }
        if self.normalize.min_periods == 0 {
            bail!("normalize.min_periods must be > 0");
        }

        if self.scale.window_months == 0 || self.scale.min_periods == 0 {
            bail!("scale.window_months and scale.min_periods must be > 0");
        }
        if self.scale.min_periods > self.scale.window_months {
            bail!(
                "scale.min_periods ({}) exceeds scale.window_months ({})",
                self.scale.min_periods,
                self.scale.window_months
            );
        }

        if self.forecast.horizon == 0 {
            bail!("forecast.horizon must be > 0");
        }
        if self.forecast.max_order == 0 || self.forecast.fallback_order == 0 {
            bail!("forecast.max_order and forecast.fallback_order must be > 0");
        }
        Ok(())
    }

    pub fn normalization_policy(&self) -> Result<NormalizationPolicy> {
        Ok(NormalizationPolicy {
            method: self.normalize.method,
            window: self.normalize.window()?,
            clip: self.normalize.clip_z,
            min_periods: self.normalize.min_periods,
        })
    }

    pub fn rescale_window(&self) -> RescaleWindow {
        RescaleWindow {
            window: self.scale.window_months,
            min_periods: self.scale.min_periods,
        }
    }

    pub fn bucket_weights(&self) -> Vec<(String, f64)> {
        self.buckets
            .iter()
            .map(|b| (b.name.clone(), b.weight))
            .collect()
    }
}
