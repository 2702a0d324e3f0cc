//! `logit-pipeline` library crate.
//!
//! The binary (`logit`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the four stages (synthesize, fit, intervals, marginal predictions) are
//!   reusable on their own

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod inference;
pub mod io;
pub mod math;
pub mod models;
pub mod report;
