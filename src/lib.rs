//! Preparation pipeline for the SIMPLE model database.
//!
//! Runs the external FAOSTAT cleaning and aggregation scripts, then converts
//! the per-year CSV files they produce into GEMPACK header-array (HAR)
//! containers. See `pipeline::process` for the entry point and `convert`
//! for the CSV → HAR encoder.

pub mod config;
pub mod convert;
pub mod error;
pub mod har;
pub mod pipeline;
pub mod scripts;

pub use config::{Config, ResolvedConfig};
pub use error::{Error, Result};
pub use pipeline::{process, RunSummary};
