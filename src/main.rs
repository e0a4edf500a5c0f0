use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;

use ma_health_forecast::config::Config;
use ma_health_forecast::pipeline::{
    build_baseline_from_source, run_scenario, BaselineCache, ForecastOutput,
};
use ma_health_forecast::scenario::{
    parse_confidence_dial, parse_rate_dial, parse_volatility_dial, ShockDials, ShockSpec,
};
use ma_health_forecast::source::JsonFileSignalSource;
use ma_health_forecast::summary::IndexSummary;

const SIGNALS_PATH_ENV: &str = "MA_HEALTH_SIGNALS";
const RATE_ENV: &str = "MA_HEALTH_RATE_BPS";
const CONFIDENCE_ENV: &str = "MA_HEALTH_CONFIDENCE";
const VOLATILITY_ENV: &str = "MA_HEALTH_VOLATILITY";

#[derive(Serialize)]
struct Report<'a> {
    dials: ShockDials,
    summary: Option<IndexSummary>,
    #[serde(flatten)]
    forecast: &'a ForecastOutput,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn read_dials() -> Result<ShockDials> {
    Ok(ShockDials {
        rate_change_bps: parse_rate_dial(&env_or(RATE_ENV, "0"))?,
        confidence_shock: parse_confidence_dial(&env_or(CONFIDENCE_ENV, "Neutral"))?,
        volatility_shock: parse_volatility_dial(&env_or(VOLATILITY_ENV, "Normal"))?,
    })
}

fn main() -> Result<()> {
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {:#}", e);
            eprintln!("Set MA_HEALTH_CONFIG or create config/default.toml");
            std::process::exit(1);
        }
    };

    // Logs go to stderr; stdout carries the JSON report.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::try_new(&config.logging.level)
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
            }),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .json()
        .init();

    let signals_path = std::env::var(SIGNALS_PATH_ENV)
        .ok()
        .or_else(|| std::env::args().nth(1))
        .map(PathBuf::from)
        .context("no signal file: pass a path or set MA_HEALTH_SIGNALS")?;
    let source = JsonFileSignalSource::open(&signals_path)?;
    tracing::info!(
        signals = %signals_path.display(),
        series = source.series_count(),
        buckets = config.buckets.len(),
        "Starting ma-health-forecast"
    );

    let dials = read_dials().context("invalid scenario dial")?;
    let baseline = BaselineCache::shared()
        .get_or_build(|| build_baseline_from_source(&config, &source))
        .context("failed to build baseline")?;
    let spec = ShockSpec::new(dials, config.scenario);
    let output = run_scenario(&baseline, &spec);
    let summary = IndexSummary::from_index(&baseline.index, &baseline.forecast);

    if baseline.is_degraded() {
        tracing::warn!(
            reason = ?baseline.diagnostics.degraded_reason,
            "Reporting degraded flat forecast"
        );
    }

    let report = Report {
        dials,
        summary,
        forecast: &output,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
