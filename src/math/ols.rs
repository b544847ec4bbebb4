//! Least squares helpers.
//!
//! Both model stages reduce to a simple regression `y = a + b x`:
//!
//! - elasticity: `ln(volume)` on `ln(price)`
//! - forecasting: per-period value on year
//!
//! Both go through the SVD solver, which refuses rank-deficient designs:
//! a regressor with (numerically) no spread yields `None` rather than a
//! minimum-norm coefficient.

use nalgebra::{DMatrix, DVector};

/// Relative spread below which a regressor is considered constant.
const FLAT_EPS: f64 = 1e-12;

/// Smallest singular value, relative to the largest, accepted as full rank.
const RANK_TOL: f64 = 1e-10;

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the design is rank deficient (smallest singular value
/// at or below `RANK_TOL` times the largest) or the solution is not finite.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    let singular = &svd.singular_values;
    if singular.is_empty() {
        return None;
    }
    let (smallest, largest) = (singular.min(), singular.max());
    if !(largest.is_finite() && largest > 0.0) || smallest <= RANK_TOL * largest {
        return None;
    }

    let beta = svd.solve(y, RANK_TOL * largest).ok()?;
    beta.iter().all(|v| v.is_finite()).then_some(beta)
}

/// Result of a simple linear regression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineFit {
    pub intercept: f64,
    pub slope: f64,
    /// Coefficient of determination, clamped into `[0, 1]`.
    pub r_squared: f64,
    pub n: usize,
}

impl LineFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// `true` when every value in `x` is (numerically) the same.
pub fn is_flat(x: &[f64]) -> bool {
    let (lo, hi) = x
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if !(lo.is_finite() && hi.is_finite()) {
        return true;
    }
    (hi - lo) <= FLAT_EPS * hi.abs().max(lo.abs()).max(1.0)
}

/// Fit `y = intercept + slope * x` by ordinary least squares.
///
/// Returns `None` when fewer than two points are given, the slices differ in
/// length, or `x` has no variation (the slope is undefined).
pub fn fit_line(x: &[f64], y: &[f64]) -> Option<LineFit> {
    let n = x.len();
    if n < 2 || y.len() != n || is_flat(x) {
        return None;
    }
    if !x.iter().chain(y.iter()).all(|v| v.is_finite()) {
        return None;
    }

    let design = DMatrix::from_fn(n, 2, |i, j| if j == 0 { 1.0 } else { x[i] });
    let response = DVector::from_column_slice(y);
    let beta = solve_least_squares(&design, &response)?;
    let (intercept, slope) = (beta[0], beta[1]);

    let y_mean = y.iter().sum::<f64>() / n as f64;
    let sst: f64 = y.iter().map(|v| (v - y_mean).powi(2)).sum();
    let sse: f64 = x
        .iter()
        .zip(y)
        .map(|(&xi, &yi)| (yi - (intercept + slope * xi)).powi(2))
        .sum();

    // A constant response is fit exactly by a flat line.
    let r_squared = if sst <= FLAT_EPS * y_mean.abs().max(1.0) {
        1.0
    } else {
        (1.0 - sse / sst).clamp(0.0, 1.0)
    };

    Some(LineFit {
        intercept,
        slope,
        r_squared,
        n,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn fit_line_recovers_exact_line() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y: Vec<f64> = x.iter().map(|v| 5.0 - 1.5 * v).collect();
        let fit = fit_line(&x, &y).unwrap();
        assert!((fit.slope + 1.5).abs() < 1e-10);
        assert!((fit.intercept - 5.0).abs() < 1e-10);
        assert!((fit.r_squared - 1.0).abs() < 1e-10);
        assert_eq!(fit.n, 4);
    }

    #[test]
    fn fit_line_rejects_flat_regressor() {
        assert!(fit_line(&[2.0, 2.0, 2.0], &[1.0, 2.0, 3.0]).is_none());
        assert!(fit_line(&[1.0], &[1.0]).is_none());
    }

    #[test]
    fn rank_deficient_design_is_rejected() {
        // Second column is twice the first.
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 2.0, 2.0, 4.0, 3.0, 6.0]);
        let y = DVector::from_row_slice(&[1.0, 2.0, 3.0]);
        assert!(solve_least_squares(&x, &y).is_none());
    }

    #[test]
    fn fit_line_rejects_numerically_flat_regressor() {
        // Spread is above the exact-equality check but far below what the
        // solver can resolve next to the intercept column.
        let x: Vec<f64> = [0.0_f64, 2e-11, 4e-11].iter().map(|d| (100.0 * (1.0 + d)).ln()).collect();
        assert!(!is_flat(&x));
        assert!(fit_line(&x, &[50f64.ln(), 70f64.ln(), 90f64.ln()]).is_none());
    }

    #[test]
    fn fit_line_noisy_r_squared_in_unit_interval() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [2.0, 1.0, 4.0, 3.0, 6.0];
        let fit = fit_line(&x, &y).unwrap();
        assert!(fit.r_squared > 0.0 && fit.r_squared < 1.0);
    }
}
