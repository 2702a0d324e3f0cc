//! Command-line parsing for the synthetic logit pipeline.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the modeling/math code.
//!
//! Every option can also be supplied through a `LOGIT_*` environment variable
//! (a `.env` file in the working directory is loaded first).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::PredictionMode;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "logit",
    version,
    about = "Synthetic logistic regression with Wald intervals and marginal predictions"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Synthesize, fit, and print coefficient and prediction tables (default).
    Run(RunArgs),
    /// Repeat the fit over consecutive seeds and report interval coverage.
    Coverage(CoverageArgs),
    /// Write a synthesized dataset to CSV.
    Synth(SynthArgs),
    /// Rerun the configuration stored in a run JSON file and compare the results.
    Replay(ReplayArgs),
}

/// Options shared by every command that synthesizes data.
#[derive(Debug, Args, Clone)]
pub struct SampleArgs {
    /// Number of synthetic records.
    #[arg(short = 'n', long = "count", env = "LOGIT_N", default_value_t = 1000)]
    pub sample_count: usize,

    /// Random seed for data synthesis.
    #[arg(long, env = "LOGIT_SEED", default_value_t = 123)]
    pub seed: u64,
}

#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub sample: SampleArgs,

    /// Confidence level for all intervals.
    #[arg(long, env = "LOGIT_LEVEL", default_value_t = 0.95)]
    pub level: f64,

    /// Comma-separated grouping keys: shape, coated, size, overall.
    #[arg(
        long = "group-by",
        env = "LOGIT_GROUP_BY",
        value_delimiter = ',',
        default_values = ["shape", "coated"]
    )]
    pub group_by: Vec<String>,

    /// Quantile bins when grouping by size.
    #[arg(long, env = "LOGIT_SIZE_BINS", default_value_t = 4)]
    pub size_bins: usize,

    /// How group predictions treat the other covariates.
    #[arg(long, env = "LOGIT_MODE", value_enum, default_value_t = PredictionMode::Subgroup)]
    pub mode: PredictionMode,

    /// Maximum IRLS iterations.
    #[arg(long = "max-iter", env = "LOGIT_MAX_ITER", default_value_t = 25)]
    pub max_iterations: usize,

    /// Convergence tolerance on the largest coefficient change.
    #[arg(long = "tol", env = "LOGIT_TOL", default_value_t = 1e-8)]
    pub tolerance: f64,

    /// Export the coefficient table to CSV.
    #[arg(long, env = "LOGIT_EXPORT_COEFFICIENTS")]
    pub export_coefficients: Option<PathBuf>,

    /// Export the prediction table to CSV.
    #[arg(long, env = "LOGIT_EXPORT_PREDICTIONS")]
    pub export_predictions: Option<PathBuf>,

    /// Export the whole run (config, fit, tables) to JSON.
    #[arg(long, env = "LOGIT_EXPORT_JSON")]
    pub export_json: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct CoverageArgs {
    /// Records per trial.
    #[arg(short = 'n', long = "count", env = "LOGIT_N", default_value_t = 1000)]
    pub sample_count: usize,

    /// Seed of the first trial; trial i uses seed-start + i.
    #[arg(long, env = "LOGIT_SEED_START", default_value_t = 1)]
    pub seed_start: u64,

    /// Number of trials.
    #[arg(long, env = "LOGIT_TRIALS", default_value_t = 200)]
    pub trials: usize,

    /// Confidence level of the intervals being checked.
    #[arg(long, env = "LOGIT_LEVEL", default_value_t = 0.95)]
    pub level: f64,

    /// Largest |estimate - target| counted as a recovered coefficient.
    #[arg(long, env = "LOGIT_RECOVERY_BAND", default_value_t = 0.3)]
    pub recovery_band: f64,

    /// Export the coverage report to JSON.
    #[arg(long, env = "LOGIT_COVERAGE_JSON")]
    pub export_json: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct SynthArgs {
    #[command(flatten)]
    pub sample: SampleArgs,

    /// Output CSV path.
    #[arg(long, value_name = "CSV")]
    pub out: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct ReplayArgs {
    /// Run JSON written by `logit run --export-json`.
    #[arg(value_name = "JSON")]
    pub path: PathBuf,

    /// Largest difference from the recorded tables treated as a match.
    #[arg(long, default_value_t = 1e-9)]
    pub tolerance: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_defaults_match_pipeline_defaults() {
        let cli = Cli::parse_from(["logit", "run"]);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.sample.sample_count, 1000);
        assert_eq!(args.sample.seed, 123);
        assert_eq!(args.group_by, vec!["shape".to_string(), "coated".to_string()]);
        assert_eq!(args.mode, PredictionMode::Subgroup);
    }

    #[test]
    fn group_by_splits_on_commas() {
        let cli = Cli::parse_from([
            "logit",
            "run",
            "--group-by",
            "size",
            "--size-bins",
            "5",
            "--mode",
            "counterfactual",
        ]);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.group_by, vec!["size".to_string()]);
        assert_eq!(args.size_bins, 5);
        assert_eq!(args.mode, PredictionMode::Counterfactual);

        let cli = Cli::parse_from(["logit", "run", "--group-by", "coated,shape"]);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.group_by, vec!["coated".to_string(), "shape".to_string()]);
    }

    #[test]
    fn synth_requires_output_path() {
        assert!(Cli::try_parse_from(["logit", "synth", "-n", "10"]).is_err());
        let cli = Cli::try_parse_from(["logit", "synth", "-n", "10", "--out", "data.csv"]).unwrap();
        assert!(matches!(cli.command, Command::Synth(_)));
    }

    #[test]
    fn replay_takes_a_positional_path() {
        assert!(Cli::try_parse_from(["logit", "replay"]).is_err());
        let cli = Cli::parse_from(["logit", "replay", "run.json"]);
        let Command::Replay(args) = cli.command else {
            panic!("expected replay");
        };
        assert_eq!(args.path, PathBuf::from("run.json"));
        assert_eq!(args.tolerance, 1e-9);
    }

    #[test]
    fn coverage_accepts_band_and_export() {
        let cli = Cli::parse_from([
            "logit",
            "coverage",
            "--recovery-band",
            "0.2",
            "--export-json",
            "cov.json",
        ]);
        let Command::Coverage(args) = cli.command else {
            panic!("expected coverage");
        };
        assert_eq!(args.recovery_band, 0.2);
        assert_eq!(args.export_json, Some(PathBuf::from("cov.json")));
        assert_eq!(args.trials, 200);
    }
}
