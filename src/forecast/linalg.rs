use ndarray::Array2;

/// Relative pivot floor; below it the matrix is treated as singular.
const PIVOT_EPS: f64 = 1e-12;

/// Lower Cholesky factor `L` with `a = L L'`. `None` when `a` is not square,
/// not finite, or not numerically positive definite.
pub fn cholesky(a: &Array2<f64>) -> Option<Array2<f64>> {
    let n = a.nrows();
    if n == 0 || a.ncols() != n || a.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let scale = (0..n).map(|i| a[[i, i]].abs()).fold(0.0_f64, f64::max);
    if scale <= 0.0 {
        return None;
    }
    let floor = scale * PIVOT_EPS;

    let mut l = Array2::<f64>::zeros((n, n));
    for j in 0..n {
        let mut d = a[[j, j]];
        for k in 0..j {
            d -= l[[j, k]] * l[[j, k]];
        }
        if d.is_nan() || d <= floor {
            return None;
        }
        let ljj = d.sqrt();
        l[[j, j]] = ljj;
        for i in (j + 1)..n {
            let mut s = a[[i, j]];
            for k in 0..j {
                s -= l[[i, k]] * l[[j, k]];
            }
            l[[i, j]] = s / ljj;
        }
    }
    Some(l)
}

/// Solve `(L L') X = B` for `X` given the lower Cholesky factor `L`.
pub fn cholesky_solve(l: &Array2<f64>, b: &Array2<f64>) -> Array2<f64> {
    let n = l.nrows();
    let mut x = b.clone();
    for col in 0..b.ncols() {
        // Forward: L y = b
        for i in 0..n {
            let mut s = x[[i, col]];
            for k in 0..i {
                s -= l[[i, k]] * x[[k, col]];
            }
            x[[i, col]] = s / l[[i, i]];
        }
        // Backward: L' x = y
        for i in (0..n).rev() {
            let mut s = x[[i, col]];
            for k in (i + 1)..n {
                s -= l[[k, i]] * x[[k, col]];
            }
            x[[i, col]] = s / l[[i, i]];
        }
    }
    x
}

/// `ln det(a)` from its lower Cholesky factor.
pub fn log_det_from_cholesky(l: &Array2<f64>) -> f64 {
    2.0 * l.diag().iter().map(|v| v.ln()).sum::<f64>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn cholesky_reconstructs_matrix() {
        let a = array![[4.0, 2.0, 0.4], [2.0, 5.0, 1.0], [0.4, 1.0, 3.0]];
        let l = cholesky(&a).unwrap();
        let back = l.dot(&l.t());
        for (x, y) in back.iter().zip(a.iter()) {
            assert!((x - y).abs() < 1e-12);
        }
        assert_eq!(l[[0, 1]], 0.0);
        assert_eq!(l[[0, 2]], 0.0);
    }

    #[test]
    fn solve_matches_known_solution() {
        let a = array![[4.0, 2.0], [2.0, 3.0]];
        let x_true = array![[1.0, -2.0], [0.5, 3.0]];
        let b = a.dot(&x_true);
        let l = cholesky(&a).unwrap();
        let x = cholesky_solve(&l, &b);
        for (got, want) in x.iter().zip(x_true.iter()) {
            assert!((got - want).abs() < 1e-12);
        }
    }

    #[test]
    fn singular_and_indefinite_are_rejected() {
        assert!(cholesky(&array![[1.0, 1.0], [1.0, 1.0]]).is_none());
        assert!(cholesky(&array![[1.0, 2.0], [2.0, 1.0]]).is_none());
        assert!(cholesky(&Array2::<f64>::zeros((0, 0))).is_none());
    }

    #[test]
    fn log_det_of_diagonal() {
        let a = array![[2.0, 0.0], [0.0, 8.0]];
        let l = cholesky(&a).unwrap();
        assert!((log_det_from_cholesky(&l) - 16.0f64.ln()).abs() < 1e-12);
    }
}
