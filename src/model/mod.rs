pub mod matrix;
pub mod series;
pub mod signal;

pub use matrix::BucketMatrix;
pub use series::{month_end, month_end_after, resample_month_end, Observation, TimeSeries};
pub use signal::{Direction, NormalizedSignal, Signal};
