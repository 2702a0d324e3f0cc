//! CSV exports of the coefficient table, the prediction table, and raw datasets.
//!
//! The exports are meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::path::Path;

use crate::data::Dataset;
use crate::domain::{CoefficientInterval, PredictionRecord, indicator};
use crate::error::AppError;
use crate::inference::to_odds_ratio_scale;

/// Write the coefficient table (log-odds and odds-ratio scales).
///
/// `z_value` and `p_value` are left empty when the standard error is zero.
pub fn write_coefficients_csv(path: &Path, rows: &[CoefficientInterval]) -> Result<(), AppError> {
    let mut wtr = create(path, "coefficient CSV")?;

    wtr.write_record([
        "term",
        "estimate",
        "std_error",
        "z_value",
        "p_value",
        "lower",
        "upper",
        "odds_ratio",
        "odds_ratio_lower",
        "odds_ratio_upper",
    ])
    .map_err(|e| write_error("coefficient CSV header", e))?;

    for r in rows {
        let or = to_odds_ratio_scale(r);
        wtr.write_record([
            r.term.clone(),
            format!("{:.10}", r.estimate),
            format!("{:.10}", r.std_error),
            r.z_value.map(|z| format!("{z:.6}")).unwrap_or_default(),
            r.p_value.map(|p| format!("{p:.6e}")).unwrap_or_default(),
            format!("{:.10}", r.lower),
            format!("{:.10}", r.upper),
            format!("{:.10}", or.estimate),
            format!("{:.10}", or.lower),
            format!("{:.10}", or.upper),
        ])
        .map_err(|e| write_error(&format!("coefficient CSV row '{}'", r.term), e))?;
    }

    flush(wtr, "coefficient CSV")
}

/// Write the marginal prediction table.
pub fn write_predictions_csv(path: &Path, rows: &[PredictionRecord]) -> Result<(), AppError> {
    let mut wtr = create(path, "prediction CSV")?;

    wtr.write_record(["group", "n", "probability", "std_error", "lower", "upper"])
        .map_err(|e| write_error("prediction CSV header", e))?;

    for r in rows {
        wtr.write_record([
            r.group.clone(),
            r.n_rows.to_string(),
            format!("{:.10}", r.probability),
            format!("{:.10}", r.std_error),
            format!("{:.10}", r.lower),
            format!("{:.10}", r.upper),
        ])
        .map_err(|e| write_error(&format!("prediction CSV row '{}'", r.group), e))?;
    }

    flush(wtr, "prediction CSV")
}

/// Write a dataset, one record per row. Indicators and the label are 0/1.
pub fn write_dataset_csv(path: &Path, dataset: &Dataset) -> Result<(), AppError> {
    let mut wtr = create(path, "dataset CSV")?;

    wtr.write_record([
        "size",
        "shape_indicator",
        "coating_indicator",
        "latent_probability",
        "label",
    ])
    .map_err(|e| write_error("dataset CSV header", e))?;

    for (i, r) in dataset.records().iter().enumerate() {
        wtr.write_record([
            format!("{:.10}", r.size),
            indicator(r.shape_indicator).to_string(),
            indicator(r.coating_indicator).to_string(),
            format!("{:.10}", r.latent_probability),
            r.label.as_response().to_string(),
        ])
        .map_err(|e| write_error(&format!("dataset CSV row {i}"), e))?;
    }

    flush(wtr, "dataset CSV")
}

fn create(path: &Path, what: &str) -> Result<csv::Writer<File>, AppError> {
    csv::WriterBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to create {what} '{}': {e}", path.display())))
}

fn write_error(what: &str, e: csv::Error) -> AppError {
    AppError::new(2, format!("Failed to write {what}: {e}"))
}

fn flush(mut wtr: csv::Writer<File>, what: &str) -> Result<(), AppError> {
    wtr.flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush {what}: {e}")))
}
