//! Binomial logit model terms.
//!
//! Predictors are plain functions over records so that fitting and prediction
//! code can stay generic over the term list.

pub mod model;

pub use model::*;
