//! Call-tree analysis for cost-centre profiling reports.
//!
//! A report is parsed into a [`CallTree`](model::CallTree); the transforms
//! in [`views`] merge repeated functions, invert the tree around a chosen
//! function, and filter or search it. Every transform that produces a new
//! tree leaves its input untouched.

pub mod config;
pub mod model;
pub mod parsers;
pub mod shared_str;
pub mod views;

pub use shared_str::SharedStr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("parse: {0}")]
    Parse(#[from] parsers::ReportParseError),
    #[error("merge: {0}")]
    Merge(#[from] views::MergeError),
    #[error("filter: {0}")]
    Filter(#[from] views::FilterError),
    #[error("config: {0}")]
    Config(#[from] config::ConfigError),
}
