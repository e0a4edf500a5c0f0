use chrono::NaiveDate;
use ndarray::{Array2, ArrayView1};

use crate::error::{ForecastError, ForecastResult};

/// Dated matrix with one column per bucket. Column order is significant:
/// every later lookup by bucket index depends on it.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketMatrix {
    dates: Vec<NaiveDate>,
    columns: Vec<String>,
    data: Array2<f64>,
}

impl BucketMatrix {
    pub fn new(dates: Vec<NaiveDate>, columns: Vec<String>, data: Array2<f64>) -> ForecastResult<Self> {
        if data.nrows() != dates.len() || data.ncols() != columns.len() {
            return Err(ForecastError::Config(format!(
                "bucket matrix shape {:?} does not match {} dates x {} columns",
                data.shape(),
                dates.len(),
                columns.len()
            )));
        }
        if data.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::Config(
                "bucket matrix contains non-finite values".to_string(),
            ));
        }
        Ok(Self {
            dates,
            columns,
            data,
        })
    }

    pub fn nrows(&self) -> usize {
        self.data.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.data.ncols()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    pub fn row(&self, idx: usize) -> ArrayView1<'_, f64> {
        self.data.row(idx)
    }

    pub fn row_sums(&self) -> Vec<f64> {
        self.data.rows().into_iter().map(|r| r.sum()).collect()
    }
}
