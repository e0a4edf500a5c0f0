pub mod normalize;

pub use normalize::{normalize_signal, score_series, NormalizationPolicy, NormalizeMethod};
