//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and initializes logging
//! - parses CLI arguments
//! - runs the pipeline, the coverage study, or a replay of a saved run
//! - prints reports
//! - writes optional exports

use clap::Parser;

use crate::cli::{Command, CoverageArgs, ReplayArgs, RunArgs, SynthArgs};
use crate::data::{GeneratorSpec, synthesize_seeded};
use crate::domain::RunConfig;
use crate::error::AppError;

pub mod coverage;
pub mod pipeline;

/// Entry point for the `logit` binary.
pub fn run() -> Result<(), AppError> {
    // Variables already set in the environment win over `.env`.
    dotenvy::dotenv().ok();
    init_logging();

    // We want `logit` and `logit -n 500` to behave like `logit run ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Run(args) => handle_run(&args),
        Command::Coverage(args) => handle_coverage(&args),
        Command::Synth(args) => handle_synth(&args),
        Command::Replay(args) => handle_replay(&args),
    }
}

fn init_logging() {
    let env = env_logger::Env::default().default_filter_or("info");
    // A second init (e.g. from tests) is harmless.
    let _ = env_logger::Builder::from_env(env).format_timestamp(None).try_init();
}

fn handle_run(args: &RunArgs) -> Result<(), AppError> {
    let config = run_config_from_args(args);
    let run = pipeline::run_pipeline(&config)?;

    println!("{}", crate::report::format_run_summary(&run, &config));
    println!("{}", crate::report::format_coefficients(&run.coefficients));
    println!(
        "{}",
        crate::report::format_predictions(&run.predictions, run.grouping, config.mode, config.level)
    );

    if let Some(path) = &config.export_coefficients {
        crate::io::write_coefficients_csv(path, &run.coefficients)?;
        log::info!("Wrote coefficient table to {}", path.display());
    }
    if let Some(path) = &config.export_predictions {
        crate::io::write_predictions_csv(path, &run.predictions)?;
        log::info!("Wrote prediction table to {}", path.display());
    }
    if let Some(path) = &config.export_json {
        crate::io::write_run_json(path, &run, &config)?;
        log::info!("Wrote run report to {}", path.display());
    }

    Ok(())
}

fn handle_coverage(args: &CoverageArgs) -> Result<(), AppError> {
    let config = coverage::CoverageConfig {
        sample_count: args.sample_count,
        seed_start: args.seed_start,
        trials: args.trials,
        level: args.level,
        recovery_band: args.recovery_band,
        ..coverage::CoverageConfig::default()
    };
    let report = coverage::run_coverage(&config)?;
    println!("{}", crate::report::format_coverage(&report));

    if let Some(path) = &args.export_json {
        crate::io::write_coverage_json(path, &report)?;
        log::info!("Wrote coverage report to {}", path.display());
    }
    Ok(())
}

fn handle_replay(args: &ReplayArgs) -> Result<(), AppError> {
    let recorded = crate::io::read_run_json(&args.path)?;
    log::info!(
        "Replaying run recorded at {} (n={}, seed={})",
        recorded.generated_at.to_rfc3339(),
        recorded.config.sample_count,
        recorded.config.seed
    );

    let config = recorded.to_run_config();
    let run = pipeline::run_pipeline(&config)?;

    println!("{}", crate::report::format_coefficients(&run.coefficients));
    println!(
        "{}",
        crate::report::format_predictions(&run.predictions, run.grouping, config.mode, config.level)
    );

    let drift = crate::io::run_drift(&recorded, &run);
    println!(
        "Max difference from recorded run: coefficients {:.3e}, probabilities {:.3e}",
        drift.coefficients, drift.probabilities
    );
    if drift.within(args.tolerance) {
        log::info!("Replay matches the recorded run");
    } else {
        log::warn!(
            "Replay differs from the recorded run by more than {} (recorded by {})",
            args.tolerance,
            recorded.tool
        );
    }
    Ok(())
}

fn handle_synth(args: &SynthArgs) -> Result<(), AppError> {
    let dataset = synthesize_seeded(&GeneratorSpec::default(), args.sample.sample_count, args.sample.seed)?;
    crate::io::write_dataset_csv(&args.out, &dataset)?;
    log::info!(
        "Wrote {} records (seed={}) to {}",
        dataset.len(),
        args.sample.seed,
        args.out.display()
    );
    Ok(())
}

pub fn run_config_from_args(args: &RunArgs) -> RunConfig {
    RunConfig {
        sample_count: args.sample.sample_count,
        seed: args.sample.seed,
        level: args.level,
        group_by: args.group_by.clone(),
        size_bins: args.size_bins,
        mode: args.mode,
        max_iterations: args.max_iterations,
        tolerance: args.tolerance,
        export_coefficients: args.export_coefficients.clone(),
        export_predictions: args.export_predictions.clone(),
        export_json: args.export_json.clone(),
    }
}

/// Rewrite argv so `logit` defaults to `logit run`.
///
/// Rules:
/// - `logit`                      -> `logit run`
/// - `logit -n 500 ...`           -> `logit run -n 500 ...`
/// - `logit --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("run".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "run" | "coverage" | "synth" | "replay");
    if is_subcommand {
        return argv;
    }

    if arg1.starts_with('-') {
        argv.insert(1, "run".to_string());
        return argv;
    }

    argv
}
