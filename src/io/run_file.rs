//! Read/write run report JSON files.
//!
//! A run file is the portable record of one `logit run`: the configuration,
//! fit diagnostics, the coefficient table, and the prediction table, stamped
//! with the time it was written. `logit replay` reads one back, reruns its
//! configuration, and reports how far the new tables drift from the recorded
//! ones.
//!
//! Coverage studies are written the same way (`CoverageFile`) but are not read
//! back.

use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::app::coverage::CoverageReport;
use crate::app::pipeline::RunOutput;
use crate::domain::{CoefficientInterval, FitQuality, PredictionMode, PredictionRecord, RunConfig, ScaledInterval};
use crate::error::AppError;
use crate::inference::Grouping;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunFile {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub config: RunFileConfig,
    pub positive_rate: f64,
    pub converged: bool,
    pub iterations: usize,
    pub fit_quality: FitQuality,
    pub coefficients: Vec<CoefficientInterval>,
    pub intercept_probability: ScaledInterval,
    pub grouping: Grouping,
    pub predictions: Vec<PredictionRecord>,
}

/// The parts of [`RunConfig`] that affect results (export paths are omitted).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunFileConfig {
    pub sample_count: usize,
    pub seed: u64,
    pub level: f64,
    pub group_by: Vec<String>,
    pub size_bins: usize,
    pub mode: PredictionMode,
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl RunFile {
    pub fn from_run(run: &RunOutput, config: &RunConfig) -> Self {
        Self {
            tool: "logit".to_string(),
            generated_at: Utc::now(),
            config: RunFileConfig {
                sample_count: config.sample_count,
                seed: config.seed,
                level: config.level,
                group_by: config.group_by.clone(),
                size_bins: config.size_bins,
                mode: config.mode,
                max_iterations: config.max_iterations,
                tolerance: config.tolerance,
            },
            positive_rate: run.dataset.positive_rate(),
            converged: run.fit.converged,
            iterations: run.fit.iterations,
            fit_quality: run.fit.quality.clone(),
            coefficients: run.coefficients.clone(),
            intercept_probability: run.intercept_probability,
            grouping: run.grouping,
            predictions: run.predictions.clone(),
        }
    }

    /// Rebuild a [`RunConfig`] that reproduces this run (without exports).
    pub fn to_run_config(&self) -> RunConfig {
        let c = &self.config;
        RunConfig {
            sample_count: c.sample_count,
            seed: c.seed,
            level: c.level,
            group_by: c.group_by.clone(),
            size_bins: c.size_bins,
            mode: c.mode,
            max_iterations: c.max_iterations,
            tolerance: c.tolerance,
            export_coefficients: None,
            export_predictions: None,
            export_json: None,
        }
    }
}

/// Largest absolute differences between a recorded run and its rerun.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunDrift {
    pub coefficients: f64,
    pub probabilities: f64,
}

impl RunDrift {
    /// Both tables agree to within `tolerance`.
    pub fn within(&self, tolerance: f64) -> bool {
        self.coefficients <= tolerance && self.probabilities <= tolerance
    }
}

/// Compare a recorded run with a rerun of its configuration.
///
/// Terms or groups present in only one of the two tables make the drift
/// infinite.
pub fn run_drift(recorded: &RunFile, rerun: &RunOutput) -> RunDrift {
    let coefficients = if recorded.coefficients.len() == rerun.coefficients.len()
        && recorded.coefficients.iter().zip(&rerun.coefficients).all(|(a, b)| a.term == b.term)
    {
        recorded
            .coefficients
            .iter()
            .zip(&rerun.coefficients)
            .map(|(a, b)| {
                (a.estimate - b.estimate)
                    .abs()
                    .max((a.lower - b.lower).abs())
                    .max((a.upper - b.upper).abs())
            })
            .fold(0.0, f64::max)
    } else {
        f64::INFINITY
    };

    let probabilities = if recorded.predictions.len() == rerun.predictions.len()
        && recorded.predictions.iter().zip(&rerun.predictions).all(|(a, b)| a.group == b.group)
    {
        recorded
            .predictions
            .iter()
            .zip(&rerun.predictions)
            .map(|(a, b)| {
                (a.probability - b.probability)
                    .abs()
                    .max((a.lower - b.lower).abs())
                    .max((a.upper - b.upper).abs())
            })
            .fold(0.0, f64::max)
    } else {
        f64::INFINITY
    };

    RunDrift {
        coefficients,
        probabilities,
    }
}

/// Write a run report JSON file.
pub fn write_run_json(path: &Path, run: &RunOutput, config: &RunConfig) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create run JSON '{}': {e}", path.display())))?;

    serde_json::to_writer_pretty(file, &RunFile::from_run(run, config))
        .map_err(|e| AppError::new(2, format!("Failed to write run JSON: {e}")))?;

    Ok(())
}

/// Read a run report JSON file.
pub fn read_run_json(path: &Path) -> Result<RunFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open run JSON '{}': {e}", path.display())))?;
    let run: RunFile =
        serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid run JSON: {e}")))?;
    Ok(run)
}

/// JSON record of one coverage study.
#[derive(Debug, Clone, Serialize)]
pub struct CoverageFile<'a> {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub report: &'a CoverageReport,
}

/// Write a coverage study JSON file.
pub fn write_coverage_json(path: &Path, report: &CoverageReport) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create coverage JSON '{}': {e}", path.display())))?;

    let record = CoverageFile {
        tool: "logit".to_string(),
        generated_at: Utc::now(),
        report,
    };
    serde_json::to_writer_pretty(file, &record)
        .map_err(|e| AppError::new(2, format!("Failed to write coverage JSON: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipeline::run_pipeline;
    use tempfile::tempdir;

    #[test]
    fn run_file_round_trips_and_reproduces_the_run() {
        let config = RunConfig {
            sample_count: 600,
            seed: 21,
            group_by: vec!["shape".to_string()],
            ..RunConfig::default()
        };
        let run = run_pipeline(&config).unwrap();

        let dir = tempdir().unwrap();
        let path = dir.path().join("run.json");
        write_run_json(&path, &run, &config).unwrap();
        let back = read_run_json(&path).unwrap();

        assert_eq!(back.tool, "logit");
        assert_eq!(back.grouping, Grouping::Shape);
        assert_eq!(back.coefficients.len(), 4);
        assert_eq!(back.predictions.len(), 2);

        let rerun = run_pipeline(&back.to_run_config()).unwrap();
        assert_eq!(rerun.predictions, run.predictions);
        assert_eq!(
            run_drift(&back, &rerun),
            RunDrift {
                coefficients: 0.0,
                probabilities: 0.0
            }
        );
    }

    #[test]
    fn drift_detects_edited_and_mismatched_tables() {
        let config = RunConfig {
            sample_count: 500,
            seed: 4,
            ..RunConfig::default()
        };
        let run = run_pipeline(&config).unwrap();
        let mut recorded = RunFile::from_run(&run, &config);

        recorded.predictions[1].probability += 0.01;
        let drift = run_drift(&recorded, &run);
        assert_eq!(drift.coefficients, 0.0);
        assert!((drift.probabilities - 0.01).abs() < 1e-12);
        assert!(!drift.within(1e-9));

        recorded.predictions.pop();
        assert!(run_drift(&recorded, &run).probabilities.is_infinite());
    }

    #[test]
    fn coverage_json_flattens_the_report() {
        use crate::app::coverage::{CoverageConfig, run_coverage};

        let report = run_coverage(&CoverageConfig {
            sample_count: 300,
            trials: 4,
            ..CoverageConfig::default()
        })
        .unwrap();

        let dir = tempdir().unwrap();
        let path = dir.path().join("coverage.json");
        write_coverage_json(&path, &report).unwrap();

        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["tool"], "logit");
        assert_eq!(value["trials"], 4);
        assert_eq!(value["recovery_band"], 0.3);
        assert_eq!(value["terms"].as_array().unwrap().len(), 4);
        assert_eq!(value["terms"][0]["term"], "(Intercept)");
        assert!(value["generated_at"].is_string());
    }

    #[test]
    fn malformed_json_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{\"tool\": 3}").unwrap();
        assert_eq!(read_run_json(&path).unwrap_err().exit_code(), 2);
    }
}
