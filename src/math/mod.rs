//! Mathematical utilities: logistic link, normal distribution, weighted least squares.

pub mod logistic;
pub mod normal;
pub mod ols;

pub use logistic::*;
pub use normal::*;
pub use ols::*;
