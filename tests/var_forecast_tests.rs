use chrono::NaiveDate;
use ma_health_forecast::error::ForecastError;
use ma_health_forecast::forecast::{fit_auto, select_order, VarModel};
use ma_health_forecast::model::{month_end_after, BucketMatrix};
use ndarray::Array2;

fn noise(seed: u64, n: usize) -> Vec<f64> {
    let mut state = seed;
    (0..n)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            ((state >> 11) as f64 / (1u64 << 53) as f64) - 0.5
        })
        .collect()
}

/// Three buckets: two AR(1) processes and a seasonal AR(2).
fn buckets(n: usize) -> BucketMatrix {
    let (e0, e1, e2) = (noise(1, n), noise(2, n), noise(3, n));
    let mut data = Array2::<f64>::zeros((n, 3));
    for t in 2..n {
        data[[t, 0]] = 0.3 + 0.8 * data[[t - 1, 0]] + e0[t];
        data[[t, 1]] = 0.5 * data[[t - 1, 1]] + 0.1 * data[[t - 1, 0]] + e1[t];
        data[[t, 2]] = 1.2 * data[[t - 1, 2]] - 0.5 * data[[t - 2, 2]] + e2[t];
    }
    let start = NaiveDate::from_ymd_opt(1995, 1, 31).unwrap();
    let dates = (0..n).map(|i| month_end_after(start, i as u32)).collect();
    BucketMatrix::new(
        dates,
        vec!["Credit".into(), "Sentiment".into(), "Valuation".into()],
        data,
    )
    .unwrap()
}

#[test]
fn forecast_has_composite_row_sum() {
    let fitted = fit_auto(&buckets(300), 12, 4).unwrap();
    let fc = fitted.model.forecast(12);
    assert_eq!(fc.values.dim(), (12, 3));
    assert_eq!(fc.dates.len(), 12);
    assert_eq!(fc.columns, vec!["Credit", "Sentiment", "Valuation"]);
    for h in 0..12 {
        let sum: f64 = fc.values.row(h).sum();
        assert!((fc.composite[h] - sum).abs() < 1e-12);
    }
}

#[test]
fn selection_finds_second_order_dynamics() {
    let sel = select_order(&buckets(400), 8).unwrap();
    assert_eq!(sel.max_order, 8);
    assert_eq!(sel.aic.len(), 8);
    // The AR(2) bucket cannot be described with a single lag.
    assert!(sel.selected >= 2);
    let aic1 = sel.aic[0].1;
    let best = sel.aic.iter().find(|(p, _)| *p == sel.selected).unwrap().1;
    assert!(best < aic1);
}

#[test]
fn impulse_response_tensor_shape() {
    let model = VarModel::fit(&buckets(300), 2).unwrap();
    let irf = model.impulse_response(12).unwrap();
    assert_eq!(irf.values().dim(), (13, 3, 3));
    assert_eq!(irf.shock_column(1).dim(), (13, 3));
    // Recursive identification: earlier columns do not react on impact to later shocks.
    assert_eq!(irf.response(0, 0, 1), 0.0);
    assert_eq!(irf.response(0, 0, 2), 0.0);
    assert_eq!(irf.response(0, 1, 2), 0.0);
    assert!(irf.response(0, 2, 2) > 0.0);
    // Stable system: responses die out.
    assert!(irf.response(12, 0, 0).abs() < irf.response(0, 0, 0).abs());
}

#[test]
fn forecasts_are_bit_identical_across_calls() {
    let m = buckets(250);
    let a = fit_auto(&m, 12, 4).unwrap();
    let b = fit_auto(&m, 12, 4).unwrap();
    assert_eq!(a.model.order(), b.model.order());
    assert_eq!(a.model.forecast(24), b.model.forecast(24));
    assert_eq!(
        a.model.impulse_response(24).unwrap(),
        b.model.impulse_response(24).unwrap()
    );
}

#[test]
fn unfittable_matrix_is_an_explicit_error() {
    let err = fit_auto(&buckets(8), 12, 4).unwrap_err();
    assert!(err.is_recoverable());
    assert!(matches!(err, ForecastError::DataInsufficient { .. }));
}
