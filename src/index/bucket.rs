use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::model::{NormalizedSignal, TimeSeries};

/// Named, weighted group of normalized signals.
#[derive(Debug, Clone)]
pub struct Bucket {
    pub name: String,
    /// Signed; bucket weights are not required to sum to one.
    pub weight: f64,
    pub members: Vec<NormalizedSignal>,
}

impl Bucket {
    pub fn new(name: impl Into<String>, weight: f64) -> Self {
        Self {
            name: name.into(),
            weight,
            members: Vec::new(),
        }
    }

    pub fn push(&mut self, member: NormalizedSignal) {
        self.members.push(member);
    }

    pub fn aggregate(&self) -> TimeSeries {
        aggregate_members(&self.members)
    }
}

/// Row-wise mean of the members over the union of their dates, averaging
/// only the members defined at each date. Dates where no member is defined
/// are dropped.
pub fn aggregate_members(members: &[NormalizedSignal]) -> TimeSeries {
    let mut acc: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    for member in members {
        for (date, value) in member.series.iter() {
            let Some(v) = value.filter(|v| v.is_finite()) else {
                continue;
            };
            let slot = acc.entry(date).or_insert((0.0, 0));
            slot.0 += v;
            slot.1 += 1;
        }
    }
    TimeSeries::from_points(
        acc.into_iter()
            .map(|(date, (sum, n))| (date, Some(sum / n as f64))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(m: u32) -> NaiveDate {
        crate::model::month_end(NaiveDate::from_ymd_opt(2021, m, 1).unwrap())
    }

    fn member(name: &str, points: Vec<(NaiveDate, Option<f64>)>) -> NormalizedSignal {
        NormalizedSignal {
            name: name.to_string(),
            series: TimeSeries::from_points(points),
        }
    }

    #[test]
    fn averages_available_members_only() {
        let mut bucket = Bucket::new("Credit", 0.3);
        bucket.push(member("a", vec![(d(1), Some(1.0)), (d(2), Some(2.0)), (d(3), None)]));
        bucket.push(member("b", vec![(d(2), Some(4.0)), (d(3), None), (d(4), Some(-1.0))]));
        let s = bucket.aggregate();
        assert_eq!(s.dates(), &[d(1), d(2), d(4)]);
        assert_eq!(s.values(), &[Some(1.0), Some(3.0), Some(-1.0)]);
    }

    #[test]
    fn empty_bucket_is_empty_series() {
        assert!(Bucket::new("Liquidity", 1.0).aggregate().is_empty());
    }
}
