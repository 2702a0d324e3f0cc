//! Repeated-sampling check of Wald interval coverage.
//!
//! Each trial synthesizes a dataset from its own seed, fits it, and records
//! whether every coefficient interval contains the target value and whether
//! the estimate lands within `recovery_band` of it. Trials run in
//! parallel but are collected in seed order, so the report does not depend on
//! scheduling.

use rayon::prelude::*;
use serde::Serialize;

use crate::data::{DEFAULT_COUNT, GeneratorSpec, synthesize_seeded};
use crate::domain::{CoefficientInterval, REPORTING_TARGET, TrueCoefficients};
use crate::error::InferenceError;
use crate::fit::{FitOptions, fit_logit};
use crate::inference::{DEFAULT_LEVEL, coefficient_intervals, critical_value};
use crate::models::STANDARD_PREDICTORS;

#[derive(Debug, Clone, Copy)]
pub struct CoverageConfig {
    pub sample_count: usize,
    pub seed_start: u64,
    pub trials: usize,
    pub level: f64,
    pub fit: FitOptions,
    /// Values each interval is checked against.
    pub target: TrueCoefficients,
    /// Largest `|estimate - target|` counted as a recovered coefficient.
    pub recovery_band: f64,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            sample_count: DEFAULT_COUNT,
            seed_start: 1,
            trials: 200,
            level: DEFAULT_LEVEL,
            fit: FitOptions::default(),
            target: REPORTING_TARGET,
            recovery_band: 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermCoverage {
    pub term: String,
    pub target: f64,
    /// Successful trials whose interval contained the target.
    pub covered: usize,
    /// Share of successful trials covering the target (NaN when none succeeded).
    pub coverage: f64,
    /// Successful trials whose estimate fell within the recovery band.
    pub recovered: usize,
    pub recovery_rate: f64,
    pub mean_estimate: f64,
    pub bias: f64,
    pub mean_std_error: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialFailure {
    pub seed: u64,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageReport {
    pub sample_count: usize,
    pub seed_start: u64,
    pub trials: usize,
    pub level: f64,
    pub recovery_band: f64,
    pub successful: usize,
    pub failures: Vec<TrialFailure>,
    pub terms: Vec<TermCoverage>,
}

/// Run the coverage study described by `config`.
///
/// Fit failures of individual trials (non-convergence, singular designs,
/// undefined intervals) are counted and reported. Invalid configuration is an
/// error.
pub fn run_coverage(config: &CoverageConfig) -> Result<CoverageReport, InferenceError> {
    critical_value(config.level)?;
    if config.trials == 0 {
        return Err(InferenceError::InvalidInput("trials must be >= 1".to_string()));
    }
    if config.sample_count == 0 {
        return Err(InferenceError::InvalidInput("sample count must be > 0".to_string()));
    }
    if !(config.recovery_band.is_finite() && config.recovery_band > 0.0) {
        return Err(InferenceError::InvalidInput(format!(
            "recovery band must be finite and > 0, got {}",
            config.recovery_band
        )));
    }

    let terms: Vec<String> = crate::models::term_names(&STANDARD_PREDICTORS);
    let targets = terms
        .iter()
        .map(|t| {
            config
                .target
                .value(t)
                .ok_or_else(|| InferenceError::InvalidInput(format!("no target value for term '{t}'")))
        })
        .collect::<Result<Vec<f64>, _>>()?;

    log::info!(
        "Coverage study: {} trials of n={} from seed {} at level {}",
        config.trials,
        config.sample_count,
        config.seed_start,
        config.level
    );

    let outcomes: Vec<(u64, Result<Vec<CoefficientInterval>, InferenceError>)> = (0..config.trials)
        .into_par_iter()
        .map(|i| {
            let seed = config.seed_start.wrapping_add(i as u64);
            (seed, run_trial(config, seed))
        })
        .collect();

    let p = terms.len();
    let mut covered = vec![0usize; p];
    let mut recovered = vec![0usize; p];
    let mut sum_estimate = vec![0.0; p];
    let mut sum_se = vec![0.0; p];
    let mut successful = 0usize;
    let mut failures = Vec::new();

    for (seed, outcome) in outcomes {
        match outcome {
            Ok(intervals) => {
                successful += 1;
                for (j, ci) in intervals.iter().enumerate() {
                    if ci.lower <= targets[j] && targets[j] <= ci.upper {
                        covered[j] += 1;
                    }
                    if (ci.estimate - targets[j]).abs() <= config.recovery_band {
                        recovered[j] += 1;
                    }
                    sum_estimate[j] += ci.estimate;
                    sum_se[j] += ci.std_error;
                }
            }
            Err(err @ InferenceError::InvalidInput(_)) => return Err(err),
            Err(err) => {
                log::warn!("Trial with seed {seed} failed: {err}");
                failures.push(TrialFailure {
                    seed,
                    reason: err.to_string(),
                });
            }
        }
    }

    let denom = successful as f64;
    let terms = terms
        .into_iter()
        .enumerate()
        .map(|(j, term)| {
            let mean_estimate = sum_estimate[j] / denom;
            TermCoverage {
                term,
                target: targets[j],
                covered: covered[j],
                coverage: covered[j] as f64 / denom,
                recovered: recovered[j],
                recovery_rate: recovered[j] as f64 / denom,
                mean_estimate,
                bias: mean_estimate - targets[j],
                mean_std_error: sum_se[j] / denom,
            }
        })
        .collect();

    Ok(CoverageReport {
        sample_count: config.sample_count,
        seed_start: config.seed_start,
        trials: config.trials,
        level: config.level,
        recovery_band: config.recovery_band,
        successful,
        failures,
        terms,
    })
}

fn run_trial(config: &CoverageConfig, seed: u64) -> Result<Vec<CoefficientInterval>, InferenceError> {
    let dataset = synthesize_seeded(&GeneratorSpec::default(), config.sample_count, seed)?;
    let fit = fit_logit(&dataset, &STANDARD_PREDICTORS, &config.fit)?;
    coefficient_intervals(&fit, config.level)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small(trials: usize) -> CoverageConfig {
        CoverageConfig {
            sample_count: 400,
            trials,
            ..CoverageConfig::default()
        }
    }

    #[test]
    fn report_is_deterministic_and_ordered() {
        let a = run_coverage(&small(12)).unwrap();
        let b = run_coverage(&small(12)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.terms.len(), 4);
        assert_eq!(a.terms[0].term, "(Intercept)");
        assert_eq!(a.successful + a.failures.len(), 12);
    }

    #[test]
    fn coverage_counts_stay_within_successful_trials() {
        let report = run_coverage(&small(20)).unwrap();
        for t in &report.terms {
            assert!(t.covered <= report.successful);
            assert!(t.recovered <= report.successful);
            assert!((0.0..=1.0).contains(&t.coverage));
            assert!((0.0..=1.0).contains(&t.recovery_rate));
            assert!(t.mean_std_error > 0.0);
        }
    }

    #[test]
    fn failing_trials_are_counted_not_raised() {
        let config = CoverageConfig {
            sample_count: 3,
            trials: 5,
            ..CoverageConfig::default()
        };
        let report = run_coverage(&config).unwrap();
        assert_eq!(report.successful, 0);
        assert_eq!(report.failures.len(), 5);
        assert_eq!(report.failures[0].seed, 1);
        assert!(report.terms.iter().all(|t| t.coverage.is_nan()));
    }

    #[test]
    fn invalid_configuration_is_an_error() {
        assert!(matches!(run_coverage(&small(0)), Err(InferenceError::InvalidInput(_))));
        let bad_level = CoverageConfig {
            level: 1.5,
            ..small(3)
        };
        assert!(matches!(run_coverage(&bad_level), Err(InferenceError::InvalidInput(_))));
        let bad_band = CoverageConfig {
            recovery_band: 0.0,
            ..small(3)
        };
        assert!(matches!(run_coverage(&bad_band), Err(InferenceError::InvalidInput(_))));
    }
}
