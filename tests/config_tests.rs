use std::path::Path;

use ma_health_forecast::config::{parse_normalize_window, Config, WindowSetting};
use ma_health_forecast::features::NormalizeMethod;
use ma_health_forecast::indicator::Window;
use ma_health_forecast::model::Direction;
use ma_health_forecast::pipeline::PipelineSettings;

const FULL: &str = r#"
[normalize]
method = "zscore"
window = 60
clip_z = 2.5
min_periods = 12

[scale]
window_months = 96
min_periods = 48
neutral = 50.0

[forecast]
horizon = 6
max_order = 8
fallback_order = 3
band_base = 1.5
band_slope = 0.25
fallback_band = 4.0

[scenario]
k_rate = 10.0
k_vol = 12.0

[logging]
level = "debug"

[[buckets]]
name = "Credit"
weight = 0.6

[[buckets.series]]
id = "BAMLH0A0HYM2"
name = "HY_SPREAD"
direction = "negative"

[[buckets.series]]
id = "BUSLOANS"
direction = "positive"

[[buckets]]
name = "Valuation"
weight = 0.4

[[buckets.series]]
id = "SPASTT01USM661N"
name = "EQUITY_PRICES"
direction = "positive"
"#;

#[test]
fn parse_full_toml() {
    let config = Config::from_toml_str(FULL).unwrap();
    assert_eq!(config.normalize.method, NormalizeMethod::Zscore);
    assert!(matches!(config.normalize.window, WindowSetting::Periods(60)));
    assert!((config.normalize.clip_z - 2.5).abs() < f64::EPSILON);
    assert_eq!(config.normalize.min_periods, 12);
    assert_eq!(config.scale.window_months, 96);
    assert_eq!(config.scale.min_periods, 48);
    assert_eq!(config.forecast.horizon, 6);
    assert_eq!(config.forecast.max_order, 8);
    assert_eq!(config.forecast.fallback_order, 3);
    assert!((config.scenario.k_rate - 10.0).abs() < f64::EPSILON);
    // Omitted coefficient keeps its default.
    assert!((config.scenario.k_conf - 20.0).abs() < f64::EPSILON);
    assert!((config.scenario.k_vol - 12.0).abs() < f64::EPSILON);
    assert_eq!(config.logging.level, "debug");

    assert_eq!(config.buckets.len(), 2);
    let credit = &config.buckets[0];
    assert_eq!(credit.series.len(), 2);
    assert_eq!(credit.series[0].direction, Direction::Negative);
    assert_eq!(credit.series[0].display_name(), "HY_SPREAD");
    assert_eq!(credit.series[1].display_name(), "BUSLOANS");
    assert_eq!(
        config.bucket_weights(),
        vec![("Credit".to_string(), 0.6), ("Valuation".to_string(), 0.4)]
    );
}

#[test]
fn settings_follow_config() {
    let config = Config::from_toml_str(FULL).unwrap();
    let settings = PipelineSettings::from_config(&config);
    assert_eq!(settings.horizon, 6);
    assert_eq!(settings.rescale.window, 96);
    assert_eq!(settings.rescale.min_periods, 48);
    assert!((settings.band_half_width(2) - 2.0).abs() < 1e-12);
    assert!((settings.fallback_band - 4.0).abs() < f64::EPSILON);
    let policy = config.normalization_policy().unwrap();
    assert_eq!(policy.window, Window::Rolling(60));
    assert!((policy.clip - 2.5).abs() < f64::EPSILON);
}

#[test]
fn bundled_default_config_loads() {
    let config = Config::load_from(Path::new("config/default.toml")).unwrap();
    let names: Vec<&str> = config.buckets.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["Credit", "Sentiment", "Valuation", "Volatility", "Liquidity"]
    );
    let total: f64 = config.buckets.iter().map(|b| b.weight).sum();
    assert!((total - 1.0).abs() < 1e-9);
    assert_eq!(config.normalize.window().unwrap(), Window::Expanding);
}

#[test]
fn missing_file_is_an_error() {
    let err = Config::load_from(Path::new("config/does-not-exist.toml")).unwrap_err();
    assert!(format!("{:#}", err).contains("does-not-exist.toml"));
}

fn rejects(from: &str, to: &str) {
    let toml_str = FULL.replacen(from, to, 1);
    assert_ne!(toml_str, FULL, "replacement '{}' not applied", from);
    assert!(
        Config::from_toml_str(&toml_str).is_err(),
        "expected rejection after replacing '{}' with '{}'",
        from,
        to
    );
}

#[test]
fn validation_rejects_bad_values() {
    rejects("clip_z = 2.5", "clip_z = 0.0");
    rejects("window = 60", "window = 0");
    rejects("window = 60", "window = \"weekly\"");
    rejects("horizon = 6", "horizon = 0");
    rejects("max_order = 8", "max_order = 0");
    rejects("fallback_order = 3", "fallback_order = 0");
    rejects("min_periods = 48", "min_periods = 120");
    rejects("name = \"Valuation\"", "name = \"credit\"");
    rejects("method = \"zscore\"", "method = \"rank\"");
    rejects("direction = \"negative\"", "direction = \"sideways\"");
}

#[test]
fn normalize_window_strings() {
    assert_eq!(parse_normalize_window("expanding").unwrap(), Window::Expanding);
    assert_eq!(parse_normalize_window("EXPANDING").unwrap(), Window::Expanding);
    assert_eq!(parse_normalize_window("36").unwrap(), Window::Rolling(36));
    assert!(parse_normalize_window("-1").is_err());
    assert!(parse_normalize_window("3.5").is_err());
}
