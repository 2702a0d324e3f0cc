//! Input/output helpers.
//!
//! - table and dataset exports to CSV (`export`)
//! - run report JSON read/write and coverage report JSON (`run_file`)

pub mod export;
pub mod run_file;

pub use export::*;
pub use run_file::*;
