//! Wald confidence intervals for fitted coefficients.
//!
//! Intervals are built on the log-odds scale as `estimate ± z·SE` and mapped to
//! other scales through monotone transforms (sigmoid for probabilities, exp
//! for odds ratios), so bound ordering is preserved.

use crate::domain::{CoefficientInterval, FittedModel, ScaledInterval};
use crate::error::InferenceError;
use crate::math::{sigmoid, standard_normal_quantile, two_sided_p_value};
use crate::models::INTERCEPT;

/// Confidence level used when none is requested.
pub const DEFAULT_LEVEL: f64 = 0.95;

/// Two-sided standard-normal critical value for `level`.
pub fn critical_value(level: f64) -> Result<f64, InferenceError> {
    if !(level.is_finite() && level > 0.0 && level < 1.0) {
        return Err(InferenceError::InvalidInput(format!(
            "confidence level must be in (0,1), got {level}"
        )));
    }
    standard_normal_quantile(0.5 + 0.5 * level)
}

/// Wald interval for a single estimate.
pub fn wald_interval(
    term: &str,
    estimate: f64,
    std_error: f64,
    level: f64,
) -> Result<CoefficientInterval, InferenceError> {
    let z = critical_value(level)?;
    if !(std_error.is_finite() && std_error >= 0.0) || !estimate.is_finite() {
        return Err(InferenceError::UndefinedInterval {
            term: term.to_string(),
            std_error,
        });
    }

    // A degenerate interval (SE = 0) has no test statistic.
    let z_value = (std_error > 0.0).then(|| estimate / std_error);
    Ok(CoefficientInterval {
        term: term.to_string(),
        estimate,
        std_error,
        z_value,
        p_value: z_value.map(two_sided_p_value),
        lower: estimate - z * std_error,
        upper: estimate + z * std_error,
    })
}

/// Coefficient table: one Wald interval per term, in term order.
pub fn coefficient_intervals(fit: &FittedModel, level: f64) -> Result<Vec<CoefficientInterval>, InferenceError> {
    fit.terms
        .iter()
        .enumerate()
        .map(|(i, term)| wald_interval(term, fit.coefficients[i], fit.std_errors[i], level))
        .collect()
}

/// Map a log-odds interval to the probability scale.
pub fn to_probability_scale(interval: &CoefficientInterval) -> ScaledInterval {
    ScaledInterval {
        estimate: sigmoid(interval.estimate),
        lower: sigmoid(interval.lower),
        upper: sigmoid(interval.upper),
    }
}

/// Map a log-odds interval to the odds-ratio scale.
pub fn to_odds_ratio_scale(interval: &CoefficientInterval) -> ScaledInterval {
    ScaledInterval {
        estimate: interval.estimate.exp(),
        lower: interval.lower.exp(),
        upper: interval.upper.exp(),
    }
}

/// Probability-scale interval for a log-odds estimate (any linear combination of terms).
pub fn probability_interval(estimate: f64, std_error: f64, level: f64) -> Result<ScaledInterval, InferenceError> {
    let interval = wald_interval("linear combination", estimate, std_error, level)?;
    Ok(to_probability_scale(&interval))
}

/// Predicted probability at all predictors equal to zero, with its interval.
pub fn intercept_probability(fit: &FittedModel, level: f64) -> Result<ScaledInterval, InferenceError> {
    let idx = fit
        .terms
        .iter()
        .position(|t| t == INTERCEPT)
        .ok_or_else(|| InferenceError::InvalidInput("model has no intercept term".to_string()))?;
    let interval = wald_interval(INTERCEPT, fit.coefficients[idx], fit.std_errors[idx], level)?;
    Ok(to_probability_scale(&interval))
}
