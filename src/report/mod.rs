//! Reporting utilities: fixed-width terminal tables for runs and coverage studies.

pub mod format;

pub use format::*;
