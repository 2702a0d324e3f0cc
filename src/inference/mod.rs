//! Uncertainty quantification on top of a fitted model.
//!
//! - coefficient Wald intervals on log-odds, odds-ratio and probability scales (`interval`)
//! - group-level average predicted probabilities via the delta method (`marginal`)

pub mod interval;
pub mod marginal;

pub use interval::*;
pub use marginal::*;
