use std::path::PathBuf;
use thiserror::Error;

/// Everything that can go wrong in a preparation run.
///
/// All variants are fatal to the operation that raised them; there is no
/// retry or recovery anywhere in this crate. The pipeline collects per-file
/// `Format` errors into its run summary, everything else propagates.
#[derive(Error, Debug)]
pub enum Error {
    /// Bad or inconsistent run parameters, caught before any processing.
    #[error("configuration error: {0}")]
    Config(String),

    /// A CSV file does not match the expected two-column shape, or a data
    /// value failed numeric parsing. Always names the offending file.
    #[error("format error in {path}: {reason}")]
    Format { path: PathBuf, reason: String },

    /// An external R script exited non-zero. Captured stdout is carried
    /// along as the only diagnostic context the scripts provide.
    #[error("external script {script} failed:\n{stdout}")]
    ExternalProcess { script: String, stdout: String },

    /// A header array violates the container's structural limits, or a file
    /// being read is not a well-formed container.
    #[error("invalid header array: {0}")]
    Har(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
