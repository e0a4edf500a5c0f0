pub mod bucket;
pub mod builder;
pub mod composite;

pub use bucket::{aggregate_members, Bucket};
pub use builder::build_index;
pub use composite::{build_composite, rescale_0_100, CompositeIndex, RescaleWindow, WeightedBucket};
