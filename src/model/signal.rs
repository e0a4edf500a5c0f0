use serde::{Deserialize, Serialize};

use crate::model::series::TimeSeries;

/// Whether a higher raw reading is good (`Positive`) or bad (`Negative`)
/// for deal conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Positive,
    Negative,
}

impl Direction {
    pub fn sign(self) -> f64 {
        match self {
            Direction::Positive => 1.0,
            Direction::Negative => -1.0,
        }
    }
}

/// A raw monthly series as fetched from a signal source. Never mutated by
/// the pipeline.
#[derive(Debug, Clone)]
pub struct Signal {
    pub id: String,
    pub name: String,
    pub direction: Direction,
    pub series: TimeSeries,
}

/// A signal after scoring and direction adjustment.
#[derive(Debug, Clone)]
pub struct NormalizedSignal {
    pub name: String,
    pub series: TimeSeries,
}
