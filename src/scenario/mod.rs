pub mod propagate;
pub mod shock;

pub use propagate::{net_impulse_response, normalize_bucket_name, propagate, ScenarioImpact};
pub use shock::{
    parse_confidence_dial, parse_rate_dial, parse_volatility_dial, BucketShock, ShockCoefficients,
    ShockDials, ShockSpec, BUCKET_PREFIX,
};
