//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the math/fitting code stays clean and testable
//! - output changes are localized

use crate::app::coverage::CoverageReport;
use crate::app::pipeline::RunOutput;
use crate::domain::{CoefficientInterval, PredictionMode, PredictionRecord, REPORTING_TARGET, RunConfig};
use crate::inference::{Grouping, to_odds_ratio_scale};

/// Format the run summary (dataset stats + fit diagnostics + baseline probability).
pub fn format_run_summary(run: &RunOutput, config: &RunConfig) -> String {
    let mut out = String::new();
    let q = &run.fit.quality;

    out.push_str("=== logit - Synthetic Logit Inference ===\n");
    out.push_str(&format!(
        "Data: n={} | seed={} | positive rate={:.3}\n",
        run.dataset.len(),
        config.seed,
        run.dataset.positive_rate()
    ));
    out.push_str(&format!(
        "Fit: IRLS converged in {} iterations (tol={:.0e}, max={})\n",
        run.fit.iterations, config.tolerance, config.max_iterations
    ));
    out.push_str(&format!(
        "Deviance={:.3} | Null deviance={:.3} | logLik={:.3} | AIC={:.3}\n",
        q.deviance, q.null_deviance, q.log_likelihood, q.aic
    ));
    out.push_str(&format!("Estimates: {}\n", fmt_vec(run.fit.coefficients.as_slice())));

    let b = &run.intercept_probability;
    out.push_str(&format!(
        "Baseline P(positive | size=0, shape=0, coated=0) = {:.4} [{:.4}, {:.4}] ({} CI)\n",
        b.estimate,
        b.lower,
        b.upper,
        fmt_level(config.level)
    ));

    out
}

/// Format the coefficient table with the reporting target alongside.
pub fn format_coefficients(rows: &[CoefficientInterval]) -> String {
    let mut out = String::new();
    out.push_str("Coefficients (log-odds scale):\n");
    out.push_str(
        format!(
            "{:<12} {:>10} {:>10} {:>8} {:>10} {:>10} {:>10} {:>8} {:>10}\n",
            "term", "estimate", "std_err", "z", "p", "lower", "upper", "target", "odds_ratio"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!(
            "{:-<12} {:-<10} {:-<10} {:-<8} {:-<10} {:-<10} {:-<10} {:-<8} {:-<10}\n",
            "", "", "", "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    for r in rows {
        let target = REPORTING_TARGET
            .value(&r.term)
            .map(|v| format!("{v:.2}"))
            .unwrap_or_default();
        let odds = to_odds_ratio_scale(r);
        out.push_str(
            format!(
                "{:<12} {:>10.4} {:>10.4} {:>8} {:>10} {:>10.4} {:>10.4} {:>8} {:>10.4}\n",
                truncate(&r.term, 12),
                r.estimate,
                r.std_error,
                fmt_z(r.z_value),
                fmt_p(r.p_value),
                r.lower,
                r.upper,
                target,
                odds.estimate,
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

/// Format the marginal prediction table.
pub fn format_predictions(
    rows: &[PredictionRecord],
    grouping: Grouping,
    mode: PredictionMode,
    level: f64,
) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Average predicted probability by {} ({}, {} CI):\n",
        grouping.display_name(),
        mode.display_name(),
        fmt_level(level)
    ));
    out.push_str(
        format!(
            "{:<28} {:>6} {:>10} {:>10} {:>10} {:>10}\n",
            "group", "n", "prob", "std_err", "lower", "upper"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<28} {:-<6} {:-<10} {:-<10} {:-<10} {:-<10}\n", "", "", "", "", "", "").trim_end());
    out.push('\n');

    for r in rows {
        out.push_str(
            format!(
                "{:<28} {:>6} {:>10.4} {:>10.4} {:>10.4} {:>10.4}\n",
                truncate(&r.group, 28),
                r.n_rows,
                r.probability,
                r.std_error,
                r.lower,
                r.upper,
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

/// Format a coverage study report.
pub fn format_coverage(report: &CoverageReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Coverage of {} Wald intervals: n={} | seeds {}..{} | {} of {} trials fitted\n",
        fmt_level(report.level),
        report.sample_count,
        report.seed_start,
        report.seed_start.wrapping_add(report.trials as u64).wrapping_sub(1),
        report.successful,
        report.trials
    ));
    out.push_str(&format!(
        "Recovery counts estimates within {} of the target\n",
        report.recovery_band
    ));
    out.push_str(
        format!(
            "{:<12} {:>8} {:>10} {:>9} {:>10} {:>8} {:>9} {:>9}\n",
            "term", "target", "mean_est", "bias", "mean_se", "covered", "coverage", "recovery"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!(
            "{:-<12} {:-<8} {:-<10} {:-<9} {:-<10} {:-<8} {:-<9} {:-<9}\n",
            "", "", "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    for t in &report.terms {
        out.push_str(
            format!(
                "{:<12} {:>8.2} {:>10.4} {:>9.4} {:>10.4} {:>8} {:>9.3} {:>9.3}\n",
                truncate(&t.term, 12),
                t.target,
                t.mean_estimate,
                t.bias,
                t.mean_std_error,
                t.covered,
                t.coverage,
                t.recovery_rate,
            )
            .trim_end(),
        );
        out.push('\n');
    }

    for f in report.failures.iter().take(10) {
        out.push_str(&format!("  (failed seed {}) {}\n", f.seed, f.reason));
    }
    if report.failures.len() > 10 {
        out.push_str(&format!("  ... and {} more failures\n", report.failures.len() - 10));
    }

    out
}

fn fmt_level(level: f64) -> String {
    format!("{}%", (level * 1000.0).round() / 10.0)
}

fn fmt_z(z: Option<f64>) -> String {
    z.map(|z| format!("{z:.2}")).unwrap_or_else(|| "NA".to_string())
}

fn fmt_p(p: Option<f64>) -> String {
    match p {
        None => "NA".to_string(),
        Some(p) if p < 1e-4 => format!("{p:.2e}"),
        Some(p) => format!("{p:.4}"),
    }
}

fn fmt_vec(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.6}")).collect();
    format!("[{}]", parts.join(", "))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::coverage::{TermCoverage, TrialFailure};

    fn interval(term: &str, estimate: f64) -> CoefficientInterval {
        CoefficientInterval {
            term: term.to_string(),
            estimate,
            std_error: 0.1,
            z_value: Some(estimate / 0.1),
            p_value: Some(0.02),
            lower: estimate - 0.196,
            upper: estimate + 0.196,
        }
    }

    #[test]
    fn coefficient_table_shows_targets() {
        let table = format_coefficients(&[interval("(Intercept)", -1.2), interval("coated", -0.3)]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[3].starts_with("(Intercept)"));
        assert!(lines[3].contains("-1.25"));
        assert!(lines[4].contains("-0.32"));
    }

    #[test]
    fn prediction_table_has_one_line_per_group() {
        let rows = vec![
            PredictionRecord {
                group: "shape=0".to_string(),
                n_rows: 480,
                probability: 0.29,
                std_error: 0.02,
                lower: 0.25,
                upper: 0.33,
            },
            PredictionRecord {
                group: "shape=1".to_string(),
                n_rows: 520,
                probability: 0.44,
                std_error: 0.02,
                lower: 0.40,
                upper: 0.48,
            },
        ];
        let table = format_predictions(&rows, Grouping::Shape, PredictionMode::Subgroup, 0.95);
        assert!(table.starts_with("Average predicted probability by shape (subgroup, 95% CI)"));
        assert_eq!(table.lines().count(), 5);
        assert!(table.contains("shape=1"));
    }

    #[test]
    fn coverage_table_lists_failures() {
        let report = CoverageReport {
            sample_count: 100,
            seed_start: 5,
            trials: 2,
            level: 0.9,
            recovery_band: 0.3,
            successful: 1,
            failures: vec![TrialFailure {
                seed: 6,
                reason: "Design matrix is not full rank".to_string(),
            }],
            terms: vec![TermCoverage {
                term: "size".to_string(),
                target: 0.48,
                covered: 1,
                coverage: 1.0,
                recovered: 1,
                recovery_rate: 1.0,
                mean_estimate: 0.5,
                bias: 0.02,
                mean_std_error: 0.3,
            }],
        };
        let table = format_coverage(&report);
        assert!(table.contains("seeds 5..6"));
        assert!(table.contains("90%"));
        assert!(table.contains("(failed seed 6)"));
        assert!(table.contains("within 0.3 of the target"));
        assert!(table.lines().any(|l| l.starts_with("size") && l.ends_with("1.000")));
    }

    #[test]
    fn level_and_p_formatting() {
        assert_eq!(fmt_level(0.95), "95%");
        assert_eq!(fmt_level(0.975), "97.5%");
        assert_eq!(fmt_p(None), "NA");
        assert_eq!(fmt_p(Some(0.5)), "0.5000");
        assert_eq!(fmt_z(None), "NA");
        assert_eq!(fmt_z(Some(-2.345)), "-2.35");
    }

    #[test]
    fn truncate_marks_cut_strings() {
        assert_eq!(truncate("shape=1, coated=0", 8), "shape=1.");
        assert_eq!(truncate("size", 8), "size");
    }
}
