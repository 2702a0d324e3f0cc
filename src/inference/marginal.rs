//! Average (marginal) predicted probabilities with delta-method uncertainty.
//!
//! For a set of rows `G` the estimate is the mean predicted probability
//!
//! ```text
//! p̄ = (1/|G|) Σ_{i∈G} sigmoid(x_iᵀβ)
//! ```
//!
//! Its gradient with respect to β is `ḡ = (1/|G|) Σ μ_i(1-μ_i) x_i`, so the
//! delta-method variance is `ḡᵀ Σ ḡ` with `Σ` the coefficient covariance.
//! This linearizes the average itself, not the sigmoid at the group's average
//! linear predictor (`μ̄(1-μ̄) x̄` with `μ̄ = sigmoid(x̄ᵀβ)`). The two agree to
//! first order and are identical for single-row groups.
//!
//! Intervals are Wald intervals on the logit scale mapped back through the
//! sigmoid, which keeps both bounds inside `(0, 1)`.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::data::Dataset;
use crate::domain::{EntityRecord, FittedModel, PredictionMode, PredictionRecord};
use crate::error::InferenceError;
use crate::inference::interval::critical_value;
use crate::math::{clamp_probability, logit, sigmoid};
use crate::models::{fill_design_row, predict_probability};

/// How rows are partitioned for the prediction table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grouping {
    /// One group containing every row.
    Overall,
    Shape,
    Coating,
    ShapeByCoating,
    /// Equal-count bins of `size`, ascending.
    SizeQuantile { bins: usize },
}

impl Grouping {
    /// Resolve grouping keys against the dataset schema.
    ///
    /// Accepted keys: `overall`, `shape` (`shape_indicator`), `coated`
    /// (`coating`, `coating_indicator`), `size`. `size` cannot be combined
    /// with the indicators.
    pub fn from_keys<S: AsRef<str>>(keys: &[S], size_bins: usize) -> Result<Self, InferenceError> {
        let mut overall = false;
        let mut shape = false;
        let mut coated = false;
        let mut size = false;

        for key in keys {
            let key = key.as_ref().trim().to_ascii_lowercase();
            match key.as_str() {
                "" => {}
                "overall" | "none" => overall = true,
                "shape" | "shape_indicator" => shape = true,
                "coated" | "coating" | "coating_indicator" => coated = true,
                "size" => size = true,
                other => {
                    return Err(InferenceError::InvalidGrouping(format!(
                        "unknown key '{other}' (expected one of: shape, coated, size, overall)"
                    )));
                }
            }
        }

        match (overall, shape, coated, size) {
            (_, false, false, false) => Ok(Grouping::Overall),
            (false, true, false, false) => Ok(Grouping::Shape),
            (false, false, true, false) => Ok(Grouping::Coating),
            (false, true, true, false) => Ok(Grouping::ShapeByCoating),
            (false, false, false, true) => Ok(Grouping::SizeQuantile { bins: size_bins }),
            _ => {
                let joined: Vec<&str> = keys.iter().map(|k| k.as_ref()).collect();
                Err(InferenceError::InvalidGrouping(format!(
                    "unsupported key combination [{}]",
                    joined.join(", ")
                )))
            }
        }
    }

    pub fn display_name(&self) -> String {
        match self {
            Grouping::Overall => "overall".to_string(),
            Grouping::Shape => "shape".to_string(),
            Grouping::Coating => "coated".to_string(),
            Grouping::ShapeByCoating => "shape x coated".to_string(),
            Grouping::SizeQuantile { bins } => format!("size quantile ({bins} bins)"),
        }
    }
}

/// Attribute values a counterfactual group imposes on every row.
#[derive(Debug, Clone, Copy, Default)]
struct Overrides {
    size: Option<f64>,
    shape: Option<bool>,
    coated: Option<bool>,
}

impl Overrides {
    fn apply(&self, record: &EntityRecord) -> EntityRecord {
        let mut out = *record;
        if let Some(size) = self.size {
            out.size = size;
        }
        if let Some(shape) = self.shape {
            out.shape_indicator = shape;
        }
        if let Some(coated) = self.coated {
            out.coating_indicator = coated;
        }
        out
    }
}

#[derive(Debug, Clone)]
struct Group {
    label: String,
    /// Dataset indices in dataset order.
    members: Vec<usize>,
    overrides: Overrides,
}

#[derive(Debug, Clone)]
struct AveragePrediction {
    probability: f64,
    gradient: DVector<f64>,
}

/// Prediction table for `grouping`, one record per non-empty group.
pub fn marginal_predictions(
    fit: &FittedModel,
    dataset: &Dataset,
    grouping: Grouping,
    mode: PredictionMode,
    level: f64,
) -> Result<Vec<PredictionRecord>, InferenceError> {
    let z = critical_value(level)?;
    if dataset.is_empty() {
        return Err(InferenceError::InvalidInput("No records to predict on.".to_string()));
    }

    let records = dataset.records();
    let groups = partition(dataset, grouping)?;
    let mut out = Vec::with_capacity(groups.len());

    for group in groups {
        if group.members.is_empty() {
            log::warn!("Group '{}' has no rows; omitted from predictions", group.label);
            continue;
        }

        let avg = match mode {
            PredictionMode::Subgroup => average_prediction(fit, group.members.iter().map(|&i| records[i])),
            PredictionMode::Counterfactual => {
                average_prediction(fit, records.iter().map(|r| group.overrides.apply(r)))
            }
        };
        out.push(prediction_record(fit, group.label, group.members.len(), &avg, z)?);
    }

    Ok(out)
}

/// Per-row predicted probabilities, in dataset order.
pub fn row_probabilities(fit: &FittedModel, dataset: &Dataset) -> Vec<f64> {
    let beta = fit.coefficients.as_slice();
    dataset
        .records()
        .iter()
        .map(|r| predict_probability(&fit.predictors, beta, r))
        .collect()
}

/// Per-observation predictions with intervals; groups are labelled `row <i>`.
pub fn observation_predictions(
    fit: &FittedModel,
    dataset: &Dataset,
    level: f64,
) -> Result<Vec<PredictionRecord>, InferenceError> {
    let z = critical_value(level)?;
    dataset
        .records()
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let avg = average_prediction(fit, std::iter::once(*r));
            prediction_record(fit, format!("row {}", i + 1), 1, &avg, z)
        })
        .collect()
}

fn partition(dataset: &Dataset, grouping: Grouping) -> Result<Vec<Group>, InferenceError> {
    let records = dataset.records();
    let n = records.len();

    let indicator_group = |label: String, shape: Option<bool>, coated: Option<bool>| {
        let members = (0..n)
            .filter(|&i| {
                shape.is_none_or(|s| records[i].shape_indicator == s)
                    && coated.is_none_or(|c| records[i].coating_indicator == c)
            })
            .collect();
        Group {
            label,
            members,
            overrides: Overrides {
                size: None,
                shape,
                coated,
            },
        }
    };

    let groups = match grouping {
        Grouping::Overall => vec![Group {
            label: "overall".to_string(),
            members: (0..n).collect(),
            overrides: Overrides::default(),
        }],
        Grouping::Shape => [false, true]
            .into_iter()
            .map(|s| indicator_group(format!("shape={}", u8::from(s)), Some(s), None))
            .collect(),
        Grouping::Coating => [false, true]
            .into_iter()
            .map(|c| indicator_group(format!("coated={}", u8::from(c)), None, Some(c)))
            .collect(),
        Grouping::ShapeByCoating => {
            let mut out = Vec::with_capacity(4);
            for s in [false, true] {
                for c in [false, true] {
                    out.push(indicator_group(
                        format!("shape={}, coated={}", u8::from(s), u8::from(c)),
                        Some(s),
                        Some(c),
                    ));
                }
            }
            out
        }
        Grouping::SizeQuantile { bins } => size_bins(records, bins)?,
    };

    Ok(groups)
}

fn size_bins(records: &[EntityRecord], bins: usize) -> Result<Vec<Group>, InferenceError> {
    let n = records.len();
    if bins < 2 {
        return Err(InferenceError::InvalidGrouping(format!(
            "size grouping needs at least 2 bins, got {bins}"
        )));
    }
    if bins > n {
        return Err(InferenceError::InvalidGrouping(format!(
            "size grouping asks for {bins} bins but only {n} rows exist"
        )));
    }

    // Ties are broken by row index so bins are deterministic.
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| records[a].size.total_cmp(&records[b].size).then(a.cmp(&b)));

    let mut out = Vec::with_capacity(bins);
    for b in 0..bins {
        let start = b * n / bins;
        let end = (b + 1) * n / bins;
        let slice = &order[start..end];

        let lo = records[slice[0]].size;
        let hi = records[slice[slice.len() - 1]].size;
        let mean_size = slice.iter().map(|&i| records[i].size).sum::<f64>() / slice.len() as f64;

        let mut members = slice.to_vec();
        members.sort_unstable();
        out.push(Group {
            label: format!("size Q{} [{lo:.3}, {hi:.3}]", b + 1),
            members,
            overrides: Overrides {
                size: Some(mean_size),
                ..Overrides::default()
            },
        });
    }
    Ok(out)
}

fn average_prediction(fit: &FittedModel, rows: impl Iterator<Item = EntityRecord>) -> AveragePrediction {
    let p = fit.coefficients.len();
    let beta = fit.coefficients.as_slice();
    let mut row = vec![0.0; p];
    let mut gradient = DVector::<f64>::zeros(p);
    let mut total = 0.0;
    let mut count = 0usize;

    for record in rows {
        fill_design_row(&fit.predictors, &record, &mut row);
        let eta: f64 = row.iter().zip(beta).map(|(x, b)| x * b).sum();
        let mu = sigmoid(eta);
        let slope = mu * (1.0 - mu);
        for (g, x) in gradient.iter_mut().zip(&row) {
            *g += slope * x;
        }
        total += mu;
        count += 1;
    }

    let scale = 1.0 / count.max(1) as f64;
    AveragePrediction {
        probability: total * scale,
        gradient: gradient * scale,
    }
}

fn prediction_record(
    fit: &FittedModel,
    group: String,
    n_rows: usize,
    avg: &AveragePrediction,
    z: f64,
) -> Result<PredictionRecord, InferenceError> {
    let variance = avg.gradient.dot(&(&fit.covariance * &avg.gradient));
    if !variance.is_finite() {
        return Err(InferenceError::UndefinedInterval {
            term: group,
            std_error: f64::NAN,
        });
    }
    let std_error = variance.max(0.0).sqrt();

    let p = clamp_probability(avg.probability);
    let se_logit = std_error / (p * (1.0 - p));
    let center = logit(p);

    Ok(PredictionRecord {
        group,
        n_rows,
        probability: avg.probability,
        std_error,
        lower: sigmoid(center - z * se_logit),
        upper: sigmoid(center + z * se_logit),
    })
}
