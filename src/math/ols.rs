//! Weighted least squares solver.
//!
//! Every IRLS iteration solves a small regression problem of the form:
//!
//! ```text
//! minimize Σ w_i (z_i - x_i^T β)^2
//! ```
//!
//! Implementation choices:
//! - We scale rows by `sqrt(w_i)` and solve an ordinary least squares problem.
//! - We use SVD so the tall (many rows, few columns) system is solved robustly.
//!   (Nalgebra's `QR::solve` is intended for square systems and will panic for
//!   non-square matrices.)
//! - Rank and covariance are separate helpers: rank is checked once on the
//!   unweighted design, the covariance is inverted once at the final estimate.

use nalgebra::{DMatrix, DVector};

/// Relative singular-value cutoff below which a column direction counts as lost.
const RANK_TOL: f64 = 1e-10;

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Solve `minimize Σ w_i (z_i - x_i^T β)^2` by row scaling.
pub fn solve_weighted_least_squares(
    x: &DMatrix<f64>,
    z: &DVector<f64>,
    w: &DVector<f64>,
) -> Option<DVector<f64>> {
    if x.nrows() != z.len() || x.nrows() != w.len() {
        return None;
    }
    if w.iter().any(|v| !v.is_finite() || *v < 0.0) {
        return None;
    }

    let sw = w.map(f64::sqrt);
    let mut xw = x.clone();
    for (i, mut row) in xw.row_iter_mut().enumerate() {
        row *= sw[i];
    }
    let zw = z.component_mul(&sw);
    solve_least_squares(&xw, &zw)
}

/// Numerical rank of `x` from its singular values.
pub fn numerical_rank(x: &DMatrix<f64>) -> usize {
    if x.nrows() == 0 || x.ncols() == 0 {
        return 0;
    }
    let sv = x.singular_values();
    let max = sv.iter().copied().fold(0.0_f64, f64::max);
    if !(max.is_finite() && max > 0.0) {
        return 0;
    }
    sv.iter().filter(|&&s| s > max * RANK_TOL).count()
}

/// Weighted cross-product `Xᵀ W X` (the Fisher information for IRLS weights).
pub fn weighted_crossprod(x: &DMatrix<f64>, w: &DVector<f64>) -> DMatrix<f64> {
    let mut xw = x.clone();
    for (i, mut row) in xw.row_iter_mut().enumerate() {
        row *= w[i];
    }
    x.tr_mul(&xw)
}

/// Invert a symmetric positive definite matrix via Cholesky.
///
/// Returns `None` when the matrix is not numerically positive definite.
pub fn invert_spd(a: DMatrix<f64>) -> Option<DMatrix<f64>> {
    let inv = a.cholesky()?.inverse();
    if inv.iter().all(|v| v.is_finite()) {
        Some(inv)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

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
    fn weighted_least_squares_ignores_zero_weight_rows() {
        // The last row is an outlier that carries no weight.
        let x = DMatrix::from_row_slice(4, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0, 1.0, 3.0]);
        let z = DVector::from_row_slice(&[1.0, 3.0, 5.0, 100.0]);
        let w = DVector::from_row_slice(&[1.0, 2.0, 1.0, 0.0]);

        let beta = solve_weighted_least_squares(&x, &z, &w).unwrap();
        assert_relative_eq!(beta[0], 1.0, epsilon = 1e-9);
        assert_relative_eq!(beta[1], 2.0, epsilon = 1e-9);
    }

    #[test]
    fn weighted_least_squares_rejects_negative_weights() {
        let x = DMatrix::from_row_slice(2, 1, &[1.0, 1.0]);
        let z = DVector::from_row_slice(&[1.0, 2.0]);
        let w = DVector::from_row_slice(&[1.0, -1.0]);
        assert!(solve_weighted_least_squares(&x, &z, &w).is_none());
    }

    #[test]
    fn rank_detects_collinear_columns() {
        // Third column is the sum of the first two.
        let x = DMatrix::from_row_slice(
            4,
            3,
            &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0, 1.0, 0.0, 1.0, 1.0, 1.0, 2.0],
        );
        assert_eq!(numerical_rank(&x), 2);

        let full = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        assert_eq!(numerical_rank(&full), 2);
    }

    #[test]
    fn crossprod_and_inverse_round_trip_to_identity() {
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let w = DVector::from_row_slice(&[0.25, 0.5, 0.25]);
        let info = weighted_crossprod(&x, &w);
        assert_relative_eq!(info[(0, 0)], 1.0, epsilon = 1e-12);
        assert_relative_eq!(info[(0, 1)], 1.0, epsilon = 1e-12);
        assert_relative_eq!(info[(1, 1)], 1.5, epsilon = 1e-12);

        let inv = invert_spd(info.clone()).unwrap();
        let eye = info * inv;
        assert_relative_eq!(eye, DMatrix::identity(2, 2), epsilon = 1e-10);
    }

    #[test]
    fn inverse_rejects_singular_matrix() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]);
        assert!(invert_spd(a).is_none());
    }
}
