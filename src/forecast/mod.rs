pub mod linalg;
pub mod var;

pub use var::{
    fit_auto, select_order, BucketForecast, FittedVar, ImpulseResponse, OrderSelection, VarModel,
    DEFAULT_FALLBACK_ORDER, DEFAULT_MAX_ORDER,
};
