use crate::config::Config;
use crate::error::{ForecastError, ForecastResult};
use crate::features::normalize_signal;
use crate::index::bucket::Bucket;
use crate::index::composite::{build_composite, CompositeIndex, WeightedBucket};
use crate::model::{resample_month_end, Signal};
use crate::source::SignalSource;

/// Fetch every configured series, normalize, aggregate into buckets and
/// combine into the composite index.
pub fn build_index(config: &Config, source: &dyn SignalSource) -> ForecastResult<CompositeIndex> {
    let policy = config
        .normalization_policy()
        .map_err(|e| ForecastError::Config(format!("{:#}", e)))?;

    let mut weighted = Vec::with_capacity(config.buckets.len());
    for bucket_cfg in &config.buckets {
        let mut bucket = Bucket::new(bucket_cfg.name.clone(), bucket_cfg.weight);
        for series_cfg in &bucket_cfg.series {
            let observations =
                source
                    .fetch(&series_cfg.id)
                    .map_err(|e| ForecastError::Source {
                        series: series_cfg.id.clone(),
                        reason: format!("{:#}", e),
                    })?;
            let signal = Signal {
                id: series_cfg.id.clone(),
                name: series_cfg.display_name().to_string(),
                direction: series_cfg.direction,
                series: resample_month_end(&observations),
            };
            tracing::debug!(
                series = %signal.id,
                months = signal.series.len(),
                start = ?signal.series.first_date(),
                end = ?signal.series.last_date(),
                "Loaded signal"
            );
            bucket.push(normalize_signal(&signal, &policy));
        }

        let series = bucket.aggregate();
        tracing::info!(
            bucket = %bucket.name,
            members = bucket.members.len(),
            rows = series.len(),
            "Bucket aggregated"
        );
        weighted.push(WeightedBucket {
            name: bucket.name,
            weight: bucket.weight,
            series,
        });
    }

    let index = build_composite(&weighted, &config.rescale_window())?;
    tracing::info!(
        months = index.raw.len(),
        scaled = index.scaled.defined_count(),
        latest = ?index.latest_value(),
        "Composite index built"
    );
    Ok(index)
}
