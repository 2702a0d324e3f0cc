//! Maximum-likelihood fitting of a binomial logit regression via IRLS.
//!
//! Given:
//! - a dataset of records with a binary label
//! - a static predictor list (an intercept is always prepended)
//!
//! each iteration:
//! - forms working weights `w = μ(1-μ)` and working response `z = η + (y-μ)/w`
//! - solves the weighted least squares problem for the next β
//! - halves the step while it increases the deviance
//!
//! and stops once the largest coefficient change drops below the tolerance.
//! Standard errors come from the inverse Fisher information `(XᵀWX)⁻¹` at the
//! final estimate.

use nalgebra::{DMatrix, DVector};

use crate::data::Dataset;
use crate::domain::{FitQuality, FittedModel};
use crate::error::InferenceError;
use crate::math::{
    ETA_LIMIT, clamp_probability, invert_spd, logit, numerical_rank, sigmoid, solve_weighted_least_squares,
    weighted_crossprod,
};
use crate::models::{Predictor, fill_design_row, term_names};

/// Floor on IRLS working weights.
const MIN_WEIGHT: f64 = 1e-6;

/// Maximum number of step halvings per iteration.
const MAX_STEP_HALVINGS: usize = 10;

/// Convergence controls for the fitter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitOptions {
    /// Largest absolute coefficient change accepted as converged.
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            tolerance: 1e-8,
            max_iterations: 25,
        }
    }
}

/// Fit `label ~ predictors` with a logit link.
pub fn fit_logit(
    dataset: &Dataset,
    predictors: &[Predictor],
    opts: &FitOptions,
) -> Result<FittedModel, InferenceError> {
    if !(opts.tolerance.is_finite() && opts.tolerance > 0.0) {
        return Err(InferenceError::InvalidInput(format!(
            "tolerance must be finite and > 0, got {}",
            opts.tolerance
        )));
    }
    if opts.max_iterations == 0 {
        return Err(InferenceError::InvalidInput("max_iterations must be >= 1".to_string()));
    }
    if dataset.is_empty() {
        return Err(InferenceError::InvalidInput("No records to fit.".to_string()));
    }

    let terms = term_names(predictors);
    let n = dataset.len();
    let p = terms.len();
    if n < p {
        return Err(InferenceError::SingularDesign(format!(
            "{n} rows cannot identify {p} coefficients"
        )));
    }

    let x = build_design_matrix(dataset, predictors);
    let y = DVector::from_iterator(n, dataset.records().iter().map(|r| r.label.as_response()));

    let rank = numerical_rank(&x);
    if rank < p {
        return Err(InferenceError::SingularDesign(format!(
            "rank {rank} < {p} columns [{}]",
            terms.join(", ")
        )));
    }

    // Start from the intercept-only fit; this keeps the first step small.
    let y_bar = y.mean();
    let mut beta = DVector::<f64>::zeros(p);
    beta[0] = logit(y_bar);
    let mut eta = &x * &beta;
    let mut deviance = binomial_deviance(&y, &eta);

    let mut converged = false;
    let mut iterations = 0;
    let mut last_change = f64::INFINITY;

    for iter in 1..=opts.max_iterations {
        iterations = iter;
        let (w, z) = working_vectors(&y, &eta);

        let Some(proposal) = solve_weighted_least_squares(&x, &z, &w) else {
            return Err(InferenceError::SingularDesign(format!(
                "weighted least squares step failed at iteration {iter}"
            )));
        };

        let (beta_next, eta_next, deviance_next) = accept_step(&x, &y, &beta, deviance, proposal);
        last_change = beta_next
            .iter()
            .zip(beta.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0_f64, f64::max);

        log::debug!(
            "IRLS iteration #{iter}: deviance {deviance:.8} -> {deviance_next:.8}, max |Δβ| = {last_change:.3e}"
        );

        beta = beta_next;
        eta = eta_next;
        deviance = deviance_next;

        if !last_change.is_finite() {
            break;
        }
        if last_change < opts.tolerance {
            converged = true;
            break;
        }
    }

    if !converged {
        log::warn!(
            "IRLS stopped after {iterations} iterations without converging (last change {last_change:.3e})"
        );
        return Err(InferenceError::NonConvergence {
            max_iterations: opts.max_iterations,
            last_change,
        });
    }

    let (w, _) = working_vectors(&y, &eta);
    let info = weighted_crossprod(&x, &w);
    let covariance = invert_spd(info).ok_or_else(|| {
        InferenceError::SingularDesign("Fisher information is not positive definite".to_string())
    })?;
    let std_errors = covariance
        .diagonal()
        .map(|v| if v >= 0.0 { v.sqrt() } else { f64::NAN });

    let null_eta = DVector::from_element(n, logit(y_bar));
    let null_deviance = binomial_deviance(&y, &null_eta);
    let quality = FitQuality {
        n,
        log_likelihood: -0.5 * deviance,
        deviance,
        null_deviance,
        aic: deviance + 2.0 * p as f64,
    };

    log::debug!("IRLS converged in {iterations} iterations (deviance {deviance:.4})");

    Ok(FittedModel {
        predictors: predictors.to_vec(),
        terms,
        coefficients: beta,
        std_errors,
        covariance,
        converged,
        iterations,
        quality,
    })
}

/// Dense design matrix with the intercept column first.
pub fn build_design_matrix(dataset: &Dataset, predictors: &[Predictor]) -> DMatrix<f64> {
    let n = dataset.len();
    let p = predictors.len() + 1;
    let mut x = DMatrix::<f64>::zeros(n, p);
    let mut row = vec![0.0; p];
    for (i, record) in dataset.records().iter().enumerate() {
        fill_design_row(predictors, record, &mut row);
        for (j, v) in row.iter().enumerate() {
            x[(i, j)] = *v;
        }
    }
    x
}

/// IRLS working weights and working response for the logit link.
fn working_vectors(y: &DVector<f64>, eta: &DVector<f64>) -> (DVector<f64>, DVector<f64>) {
    let n = y.len();
    let mut w = DVector::<f64>::zeros(n);
    let mut z = DVector::<f64>::zeros(n);
    for i in 0..n {
        let eta_i = eta[i].clamp(-ETA_LIMIT, ETA_LIMIT);
        let mu = clamp_probability(sigmoid(eta_i));
        let wi = (mu * (1.0 - mu)).max(MIN_WEIGHT);
        w[i] = wi;
        z[i] = eta_i + (y[i] - mu) / wi;
    }
    (w, z)
}

/// Binomial deviance `-2 Σ [y ln μ + (1-y) ln(1-μ)]` with clamped probabilities.
pub fn binomial_deviance(y: &DVector<f64>, eta: &DVector<f64>) -> f64 {
    let mut total = 0.0;
    for (yi, eta_i) in y.iter().zip(eta.iter()) {
        let mu = clamp_probability(sigmoid(*eta_i));
        total += yi * mu.ln() + (1.0 - yi) * (1.0 - mu).ln();
    }
    -2.0 * total
}

/// Accept `proposal`, halving the step toward `beta` while the deviance rises.
fn accept_step(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    beta: &DVector<f64>,
    deviance: f64,
    proposal: DVector<f64>,
) -> (DVector<f64>, DVector<f64>, f64) {
    let slack = 1e-10 * (1.0 + deviance.abs());
    let mut candidate = proposal;
    let mut eta = x * &candidate;
    let mut dev = binomial_deviance(y, &eta);

    for halving in 1..=MAX_STEP_HALVINGS {
        if dev.is_finite() && dev <= deviance + slack {
            break;
        }
        log::debug!("Step halving #{halving}: deviance {dev:.8} > {deviance:.8}");
        candidate = (&candidate + beta) * 0.5;
        eta = x * &candidate;
        dev = binomial_deviance(y, &eta);
    }

    (candidate, eta, dev)
}
