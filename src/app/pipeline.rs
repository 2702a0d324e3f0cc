//! Shared "run pipeline" logic used by the `run` command and the integration tests.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! synthesize -> fit -> coefficient intervals -> marginal predictions
//!
//! Front-ends can then focus on presentation (tables, exports).

use crate::data::{Dataset, GeneratorSpec, synthesize_seeded};
use crate::domain::{CoefficientInterval, FittedModel, PredictionRecord, RunConfig, ScaledInterval};
use crate::error::InferenceError;
use crate::fit::{FitOptions, fit_logit};
use crate::inference::{Grouping, coefficient_intervals, intercept_probability, marginal_predictions};
use crate::models::STANDARD_PREDICTORS;

/// All computed outputs of a single `logit run`.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub dataset: Dataset,
    pub fit: FittedModel,
    pub coefficients: Vec<CoefficientInterval>,
    /// Baseline probability (all predictors zero) with its interval.
    pub intercept_probability: ScaledInterval,
    pub grouping: Grouping,
    pub predictions: Vec<PredictionRecord>,
}

/// Execute the full pipeline on a freshly synthesized dataset.
pub fn run_pipeline(config: &RunConfig) -> Result<RunOutput, InferenceError> {
    let dataset = synthesize_seeded(&GeneratorSpec::default(), config.sample_count, config.seed)?;
    log::info!(
        "Synthesized {} records (seed={}, positive rate {:.3})",
        dataset.len(),
        config.seed,
        dataset.positive_rate()
    );

    run_pipeline_with_dataset(config, dataset)
}

/// Execute the pipeline on a pre-built dataset.
///
/// The grouping is resolved before fitting so a bad key fails fast.
pub fn run_pipeline_with_dataset(config: &RunConfig, dataset: Dataset) -> Result<RunOutput, InferenceError> {
    let grouping = Grouping::from_keys(&config.group_by, config.size_bins)?;

    let options = FitOptions {
        tolerance: config.tolerance,
        max_iterations: config.max_iterations,
    };
    let fit = fit_logit(&dataset, &STANDARD_PREDICTORS, &options)?;
    log::info!(
        "Fit converged in {} iterations (deviance {:.3})",
        fit.iterations,
        fit.quality.deviance
    );

    let coefficients = coefficient_intervals(&fit, config.level)?;
    let intercept_probability = intercept_probability(&fit, config.level)?;
    let predictions = marginal_predictions(&fit, &dataset, grouping, config.mode, config.level)?;

    Ok(RunOutput {
        dataset,
        fit,
        coefficients,
        intercept_probability,
        grouping,
        predictions,
    })
}
