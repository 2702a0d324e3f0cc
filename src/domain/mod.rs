//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - synthetic observations (`EntityRecord`, `Label`)
//! - fit outputs (`FittedModel`, `FitQuality`)
//! - interval and prediction records handed to the presentation layer
//! - run configuration (`RunConfig`, `PredictionMode`)

pub mod types;

pub use types::*;
