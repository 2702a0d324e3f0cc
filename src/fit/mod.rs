//! Model fitting.
//!
//! Responsibilities:
//!
//! - build the design matrix from a static predictor list
//! - run IRLS to the maximum-likelihood estimate
//! - report coefficient covariance and fit quality

pub mod irls;

pub use irls::*;
