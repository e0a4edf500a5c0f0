use chrono::NaiveDate;
use ndarray::{s, Array1, Array2, Array3, ArrayView2, Axis};
use serde::Serialize;

use crate::error::{ForecastError, ForecastResult};
use crate::forecast::linalg::{cholesky, cholesky_solve, log_det_from_cholesky};
use crate::model::{month_end_after, BucketMatrix};

/// Highest lag tried by order selection on monthly data.
pub const DEFAULT_MAX_ORDER: usize = 12;
/// Order used when AIC selection cannot be evaluated.
pub const DEFAULT_FALLBACK_ORDER: usize = 4;

/// Equation-by-equation least squares result for a VAR(p) with intercept.
#[derive(Debug, Clone)]
struct OlsFit {
    /// `(1 + K p) x K`; row 0 is the intercept, then lag blocks of K rows.
    coef: Array2<f64>,
    /// Residual cross-product / nobs.
    sigma_ml: Array2<f64>,
    /// Residual cross-product / (nobs - 1 - K p).
    sigma_u: Array2<f64>,
    nobs: usize,
}

/// Fit on rows `offset..`, using the first `order` of them as pre-sample.
fn estimate(data: &Array2<f64>, order: usize, offset: usize) -> ForecastResult<OlsFit> {
    let n = data.nrows();
    let k = data.ncols();
    let first = offset + order;
    let n_params = 1 + k * order;
    let nobs = n.saturating_sub(first);
    if k == 0 || nobs <= n_params {
        return Err(ForecastError::insufficient(
            format!("VAR({}) over {} buckets", order, k),
            first + n_params + 1,
            n,
        ));
    }

    let mut z = Array2::<f64>::zeros((nobs, n_params));
    let mut y = Array2::<f64>::zeros((nobs, k));
    for row in 0..nobs {
        let t = first + row;
        z[[row, 0]] = 1.0;
        for lag in 1..=order {
            let base = 1 + (lag - 1) * k;
            z.slice_mut(s![row, base..base + k])
                .assign(&data.row(t - lag));
        }
        y.row_mut(row).assign(&data.row(t));
    }

    let ztz = z.t().dot(&z);
    let zty = z.t().dot(&y);
    let l = cholesky(&ztz).ok_or_else(|| {
        ForecastError::ModelFit(format!(
            "regressor cross-product is singular for order {}",
            order
        ))
    })?;
    let coef = cholesky_solve(&l, &zty);
    let resid = &y - &z.dot(&coef);
    let sse = resid.t().dot(&resid);
    if coef.iter().chain(sse.iter()).any(|v| !v.is_finite()) {
        return Err(ForecastError::ModelFit(format!(
            "non-finite estimates for order {}",
            order
        )));
    }

    Ok(OlsFit {
        sigma_ml: &sse / nobs as f64,
        sigma_u: &sse / (nobs - n_params) as f64,
        coef,
        nobs,
    })
}

/// AIC per candidate order, all evaluated on the same sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderSelection {
    pub max_order: usize,
    pub aic: Vec<(usize, f64)>,
    pub selected: usize,
}

/// Evaluate orders `1..=max_order` and pick the one minimizing
/// `ln det(sigma_ml) + 2 (p K^2 + K) / nobs`. Every candidate drops the
/// first `max_order` rows so the criteria are comparable. Any candidate
/// failing fails the whole selection.
pub fn select_order(matrix: &BucketMatrix, max_order: usize) -> ForecastResult<OrderSelection> {
    if max_order == 0 {
        return Err(ForecastError::Config("max_order must be > 0".to_string()));
    }
    let k = matrix.ncols();
    let mut aic = Vec::with_capacity(max_order);
    for order in 1..=max_order {
        let fit = estimate(matrix.data(), order, max_order - order)?;
        let l = cholesky(&fit.sigma_ml).ok_or_else(|| {
            ForecastError::ModelFit(format!(
                "singular residual covariance at order {}",
                order
            ))
        })?;
        let free_params = (order * k * k + k) as f64;
        let value = log_det_from_cholesky(&l) + 2.0 * free_params / fit.nobs as f64;
        if !value.is_finite() {
            return Err(ForecastError::ModelFit(format!(
                "non-finite AIC at order {}",
                order
            )));
        }
        tracing::debug!(order, aic = value, nobs = fit.nobs, "VAR order candidate");
        aic.push((order, value));
    }

    let mut selected = aic[0];
    for candidate in &aic[1..] {
        if candidate.1 < selected.1 {
            selected = *candidate;
        }
    }
    Ok(OrderSelection {
        max_order,
        aic,
        selected: selected.0,
    })
}

/// Fitted vector autoregression with intercept. Created fresh from a bucket
/// matrix, never updated in place.
#[derive(Debug, Clone, PartialEq)]
pub struct VarModel {
    order: usize,
    columns: Vec<String>,
    intercept: Array1<f64>,
    /// `(order, K, K)`: `coefs[[lag - 1, r, c]]` is the effect of bucket `c`
    /// at `t - lag` on bucket `r` at `t`.
    coefs: Array3<f64>,
    sigma_u: Array2<f64>,
    nobs: usize,
    /// Last `order` observed rows, oldest first.
    seed: Array2<f64>,
    last_date: NaiveDate,
}

impl VarModel {
    pub fn fit(matrix: &BucketMatrix, order: usize) -> ForecastResult<Self> {
        if order == 0 {
            return Err(ForecastError::Config("VAR order must be > 0".to_string()));
        }
        let fit = estimate(matrix.data(), order, 0)?;
        let k = matrix.ncols();
        let n = matrix.nrows();
        let last_date = matrix
            .last_date()
            .ok_or_else(|| ForecastError::insufficient("VAR fit", order + 1, 0))?;

        let mut coefs = Array3::<f64>::zeros((order, k, k));
        for lag in 0..order {
            for r in 0..k {
                for c in 0..k {
                    coefs[[lag, r, c]] = fit.coef[[1 + lag * k + c, r]];
                }
            }
        }

        Ok(Self {
            order,
            columns: matrix.columns().to_vec(),
            intercept: fit.coef.row(0).to_owned(),
            coefs,
            sigma_u: fit.sigma_u,
            nobs: fit.nobs,
            seed: matrix.data().slice(s![n - order.., ..]).to_owned(),
            last_date,
        })
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn nobs(&self) -> usize {
        self.nobs
    }

    pub fn intercept(&self) -> &Array1<f64> {
        &self.intercept
    }

    /// Lag matrix `A_lag` (1-based lag).
    pub fn lag_matrix(&self, lag: usize) -> ArrayView2<'_, f64> {
        self.coefs.index_axis(Axis(0), lag - 1)
    }

    pub fn residual_covariance(&self) -> &Array2<f64> {
        &self.sigma_u
    }

    /// Deterministic projection seeded with the last `order` observations.
    pub fn forecast(&self, steps: usize) -> BucketForecast {
        let k = self.columns.len();
        let mut history: Vec<Array1<f64>> =
            self.seed.rows().into_iter().map(|r| r.to_owned()).collect();
        let mut values = Array2::<f64>::zeros((steps, k));
        for h in 0..steps {
            let mut next = self.intercept.clone();
            for lag in 1..=self.order {
                let prev = &history[history.len() - lag];
                next += &self.lag_matrix(lag).dot(prev);
            }
            values.row_mut(h).assign(&next);
            history.push(next);
        }

        let dates = (1..=steps)
            .map(|i| month_end_after(self.last_date, i as u32))
            .collect();
        let composite = values.rows().into_iter().map(|r| r.sum()).collect();
        BucketForecast {
            dates,
            columns: self.columns.clone(),
            values,
            composite,
        }
    }

    /// Orthogonalized impulse responses for steps `0..=horizon`, using the
    /// lower Cholesky factor of the residual covariance.
    pub fn impulse_response(&self, horizon: usize) -> ForecastResult<ImpulseResponse> {
        let k = self.columns.len();
        let chol = cholesky(&self.sigma_u).ok_or_else(|| {
            ForecastError::ModelFit("residual covariance is not positive definite".to_string())
        })?;

        let mut phis: Vec<Array2<f64>> = Vec::with_capacity(horizon + 1);
        phis.push(Array2::eye(k));
        for i in 1..=horizon {
            let mut phi = Array2::<f64>::zeros((k, k));
            for j in 1..=i.min(self.order) {
                phi += &phis[i - j].dot(&self.lag_matrix(j));
            }
            phis.push(phi);
        }

        let mut values = Array3::<f64>::zeros((horizon + 1, k, k));
        for (step, phi) in phis.iter().enumerate() {
            values
                .index_axis_mut(Axis(0), step)
                .assign(&phi.dot(&chol));
        }
        Ok(ImpulseResponse {
            columns: self.columns.clone(),
            values,
        })
    }
}

/// Forecast of every bucket plus the derived composite (row sum).
#[derive(Debug, Clone, PartialEq)]
pub struct BucketForecast {
    pub dates: Vec<NaiveDate>,
    pub columns: Vec<String>,
    /// `steps x K`.
    pub values: Array2<f64>,
    pub composite: Vec<f64>,
}

/// `(steps, responding, shocked)` response tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct ImpulseResponse {
    columns: Vec<String>,
    values: Array3<f64>,
}

impl ImpulseResponse {
    pub fn steps(&self) -> usize {
        self.values.len_of(Axis(0))
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &Array3<f64> {
        &self.values
    }

    pub fn response(&self, step: usize, responding: usize, shocked: usize) -> f64 {
        self.values[[step, responding, shocked]]
    }

    /// `steps x K` responses of every bucket to a unit shock in `shocked`.
    pub fn shock_column(&self, shocked: usize) -> ArrayView2<'_, f64> {
        self.values.index_axis(Axis(2), shocked)
    }
}

/// Model plus how its order was chosen.
#[derive(Debug, Clone)]
pub struct FittedVar {
    pub model: VarModel,
    pub selection: Option<OrderSelection>,
    pub used_fallback: bool,
}

/// AIC order selection, falling back to `fallback_order` when selection
/// fails. Fails only if the model cannot be fit at the chosen order.
pub fn fit_auto(
    matrix: &BucketMatrix,
    max_order: usize,
    fallback_order: usize,
) -> ForecastResult<FittedVar> {
    match select_order(matrix, max_order) {
        Ok(selection) => {
            tracing::info!(
                order = selection.selected,
                max_order,
                rows = matrix.nrows(),
                "Selected VAR order by AIC"
            );
            let model = VarModel::fit(matrix, selection.selected)?;
            Ok(FittedVar {
                model,
                selection: Some(selection),
                used_fallback: false,
            })
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                fallback_order,
                rows = matrix.nrows(),
                "VAR order selection failed; using fallback order"
            );
            let model = VarModel::fit(matrix, fallback_order)?;
            Ok(FittedVar {
                model,
                selection: None,
                used_fallback: true,
            })
        }
    }
}
