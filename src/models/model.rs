//! Model evaluation for the binomial logit regression.
//!
//! The fitter and the predictors rely on two primitive operations:
//! - build a design row for a record (for IRLS and the delta method)
//! - evaluate the linear predictor / probability given coefficients
//!
//! Predictors are a static list of (name, extraction function) pairs rather
//! than a formula string, so the set of terms is fixed at compile time.

use crate::domain::{EntityRecord, indicator};
use crate::math::sigmoid;

/// Name of the intercept term; always the first design column.
pub const INTERCEPT: &str = "(Intercept)";

/// One model predictor: a term name and how to read it off a record.
#[derive(Clone, Copy)]
pub struct Predictor {
    pub name: &'static str,
    pub extract: fn(&EntityRecord) -> f64,
}

impl std::fmt::Debug for Predictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Predictor").field(&self.name).finish()
    }
}

impl Predictor {
    pub const fn new(name: &'static str, extract: fn(&EntityRecord) -> f64) -> Self {
        Self { name, extract }
    }
}

fn extract_size(r: &EntityRecord) -> f64 {
    r.size
}

fn extract_shape(r: &EntityRecord) -> f64 {
    indicator(r.shape_indicator)
}

fn extract_coated(r: &EntityRecord) -> f64 {
    indicator(r.coating_indicator)
}

/// `outcome ~ size + shape + coated`.
pub const STANDARD_PREDICTORS: [Predictor; 3] = [
    Predictor::new("size", extract_size),
    Predictor::new("shape", extract_shape),
    Predictor::new("coated", extract_coated),
];

/// Term names for a predictor list, intercept first.
pub fn term_names(predictors: &[Predictor]) -> Vec<String> {
    std::iter::once(INTERCEPT.to_string())
        .chain(predictors.iter().map(|p| p.name.to_string()))
        .collect()
}

/// Fill a design row for the given predictors.
///
/// The row includes the constant term first (intercept).
///
/// # Panics
/// Panics if `out` does not have length `predictors.len() + 1`. Callers should
/// size the row correctly.
pub fn fill_design_row(predictors: &[Predictor], record: &EntityRecord, out: &mut [f64]) {
    assert_eq!(out.len(), predictors.len() + 1, "design row length mismatch");
    out[0] = 1.0;
    for (slot, p) in out[1..].iter_mut().zip(predictors) {
        *slot = (p.extract)(record);
    }
}

/// Linear predictor `x^T β` for a record.
pub fn linear_predictor(predictors: &[Predictor], coefficients: &[f64], record: &EntityRecord) -> f64 {
    let mut eta = coefficients[0];
    for (p, beta) in predictors.iter().zip(&coefficients[1..]) {
        eta += beta * (p.extract)(record);
    }
    eta
}

/// Predicted probability of the positive label for a record.
pub fn predict_probability(predictors: &[Predictor], coefficients: &[f64], record: &EntityRecord) -> f64 {
    sigmoid(linear_predictor(predictors, coefficients, record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Label;

    fn record() -> EntityRecord {
        EntityRecord {
            size: 1.2,
            shape_indicator: true,
            coating_indicator: false,
            latent_probability: 0.5,
            label: Label::Positive,
        }
    }

    #[test]
    fn design_row_puts_intercept_first() {
        let mut row = [0.0; 4];
        fill_design_row(&STANDARD_PREDICTORS, &record(), &mut row);
        assert_eq!(row, [1.0, 1.2, 1.0, 0.0]);
    }

    #[test]
    fn term_names_follow_predictor_order() {
        assert_eq!(term_names(&STANDARD_PREDICTORS), vec!["(Intercept)", "size", "shape", "coated"]);
    }

    #[test]
    fn prediction_matches_manual_sigmoid() {
        let beta = [-1.25, 0.48, 0.67, -0.32];
        let eta = linear_predictor(&STANDARD_PREDICTORS, &beta, &record());
        assert!((eta - (-1.25 + 0.48 * 1.2 + 0.67)).abs() < 1e-12);
        let p = predict_probability(&STANDARD_PREDICTORS, &beta, &record());
        assert!((p - 1.0 / (1.0 + (-eta).exp())).abs() < 1e-12);
    }
}
