//! Invocation of the external R scripts that do the actual statistical
//! cleaning and aggregation. This crate owns none of their logic; it only
//! hands them ordered positional arguments and surfaces their stdout when
//! they fail.

use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

use tracing::{debug, info};

use crate::config::ResolvedConfig;
use crate::error::{Error, Result};

/// Runs scripts through a configurable interpreter (`Rscript` in production;
/// tests substitute a shell).
#[derive(Debug, Clone)]
pub struct ScriptRunner {
    program: String,
}

impl ScriptRunner {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Run `script` with ordered positional `args`, capturing stdout.
    ///
    /// A non-zero exit (or a failure to spawn at all) becomes
    /// `Error::ExternalProcess` carrying whatever stdout was captured — the
    /// scripts write their diagnostics there, not to stderr.
    pub fn run(&self, script: &Path, args: &[OsString]) -> Result<String> {
        debug!(script = %script.display(), ?args, "invoking script");
        let output = Command::new(&self.program)
            .arg(script)
            .args(args)
            .output()
            .map_err(|e| Error::ExternalProcess {
                script: script.display().to_string(),
                stdout: format!("failed to launch {}: {e}", self.program),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.status.success() {
            return Err(Error::ExternalProcess {
                script: script.display().to_string(),
                stdout,
            });
        }
        info!(script = %script.display(), "script completed");
        Ok(stdout)
    }
}

/// Run the cleaning script once for the whole year range. It populates
/// `<target>/<year>/` with the CSV files the converter consumes.
pub fn run_data_clean(runner: &ScriptRunner, cfg: &ResolvedConfig) -> Result<String> {
    let args: Vec<OsString> = vec![
        cfg.start_year.to_string().into(),
        cfg.end_year.to_string().into(),
        cfg.target_dir.clone().into(),
        cfg.regmaps_csv.clone().into(),
        cfg.regsets_csv.clone().into(),
        cfg.cropsets_csv.clone().into(),
        cfg.livestocksets_csv.clone().into(),
    ];
    runner.run(&cfg.data_clean_script, &args)
}

/// Run the aggregation script for one year. Sequencing dependency only: it
/// reads the cleaned CSV tree, not the HAR files written in the same run.
pub fn run_data_proc(runner: &ScriptRunner, cfg: &ResolvedConfig, year: i32) -> Result<String> {
    let args: Vec<OsString> = vec![
        year.to_string().into(),
        cfg.region_csv.clone().into(),
        cfg.parameters_csv.clone().into(),
        cfg.target_dir.clone().into(),
    ];
    runner.run(&cfg.data_proc_script, &args)
}
