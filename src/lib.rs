pub mod config;
pub mod error;
pub mod features;
pub mod forecast;
pub mod index;
pub mod indicator;
pub mod model;
pub mod pipeline;
pub mod scenario;
pub mod source;
pub mod summary;
