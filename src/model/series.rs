use std::collections::BTreeMap;

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// A dated observation as delivered by a signal source, before resampling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub value: f64,
}

/// Monthly series on a strictly increasing date grid. `None` marks an
/// undefined point (warm-up, missing month, zero-variance window).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimeSeries {
    dates: Vec<NaiveDate>,
    values: Vec<Option<f64>>,
}

impl TimeSeries {
    pub fn new(dates: Vec<NaiveDate>, values: Vec<Option<f64>>) -> Self {
        assert_eq!(
            dates.len(),
            values.len(),
            "TimeSeries dates and values must have equal length"
        );
        debug_assert!(dates.windows(2).all(|w| w[0] < w[1]));
        Self { dates, values }
    }

    pub fn from_points(points: impl IntoIterator<Item = (NaiveDate, Option<f64>)>) -> Self {
        let (dates, values) = points.into_iter().unzip();
        Self::new(dates, values)
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (NaiveDate, Option<f64>)> + '_ {
        self.dates.iter().copied().zip(self.values.iter().copied())
    }

    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.dates
            .binary_search(&date)
            .ok()
            .and_then(|idx| self.values[idx])
    }

    pub fn defined_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    pub fn last_defined(&self) -> Option<(NaiveDate, f64)> {
        self.iter()
            .rev()
            .find_map(|(d, v)| v.map(|value| (d, value)))
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    pub fn map_values(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            dates: self.dates.clone(),
            values: self.values.iter().map(|v| v.map(&f)).collect(),
        }
    }

    /// Append `tail` after this series. `tail` must start after the last date.
    pub fn concat(&self, tail: &TimeSeries) -> Self {
        let mut dates = self.dates.clone();
        let mut values = self.values.clone();
        dates.extend_from_slice(&tail.dates);
        values.extend_from_slice(&tail.values);
        Self::new(dates, values)
    }

    /// Dense view of the defined points only.
    pub fn defined_points(&self) -> Vec<(NaiveDate, f64)> {
        self.iter().filter_map(|(d, v)| v.map(|x| (d, x))).collect()
    }
}

/// Last calendar day of the month containing `date`.
pub fn month_end(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first_of_next| first_of_next.pred_opt())
        .unwrap_or(date)
}

/// Month-end date `n` months after the month containing `date`.
pub fn month_end_after(date: NaiveDate, n: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
        .and_then(|first| first.checked_add_months(Months::new(n)))
        .map(month_end)
        .unwrap_or(date)
}

fn month_key(date: NaiveDate) -> i32 {
    date.year() * 12 + date.month0() as i32
}

/// Resample raw observations to a month-end grid keeping the last finite
/// observation of each month. Months without an observation between the
/// first and last month become `None`.
pub fn resample_month_end(observations: &[Observation]) -> TimeSeries {
    let mut by_month: BTreeMap<i32, (NaiveDate, f64)> = BTreeMap::new();
    for obs in observations.iter().filter(|o| o.value.is_finite()) {
        let key = month_key(obs.date);
        match by_month.get(&key) {
            Some((seen, _)) if *seen > obs.date => {}
            _ => {
                by_month.insert(key, (obs.date, obs.value));
            }
        }
    }

    let (Some(&first), Some(&last)) = (by_month.keys().next(), by_month.keys().next_back()) else {
        return TimeSeries::default();
    };
    let Some((first_date, _)) = by_month.get(&first).copied() else {
        return TimeSeries::default();
    };

    let mut dates = Vec::with_capacity((last - first + 1) as usize);
    let mut values = Vec::with_capacity(dates.capacity());
    for (offset, key) in (first..=last).enumerate() {
        dates.push(month_end_after(first_date, offset as u32));
        values.push(by_month.get(&key).map(|(_, v)| *v));
    }
    TimeSeries::new(dates, values)
}
