use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

/// Packaged reference data, used whenever the caller does not override.
const DEFAULT_DATA_DIR: &str = "/usr/local/data";
/// The cleaning and aggregation scripts installed alongside the job.
const DEFAULT_CLEAN_SCRIPT: &str = "/job/executable/01_data_clean.r";
const DEFAULT_PROC_SCRIPT: &str = "/job/executable/02_data_proc.r";
const DEFAULT_INTERPRETER: &str = "Rscript";

/// Run parameters as supplied by the caller (CLI flags or a JSON file).
///
/// `start_year`, `end_year` and `target_dir` are required; every other field
/// falls back to the packaged default when absent. The region-map CSV has no
/// override: it always ships with the installation.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub start_year: i32,
    pub end_year: i32,
    /// Directory the cleaning script populates with per-year CSV
    /// subdirectories, and under which the HAR files are written.
    pub target_dir: PathBuf,

    #[serde(default)]
    pub regsets_csv: Option<PathBuf>,
    #[serde(default)]
    pub cropsets_csv: Option<PathBuf>,
    #[serde(default)]
    pub livestocksets_csv: Option<PathBuf>,
    #[serde(default)]
    pub region_csv: Option<PathBuf>,
    #[serde(default)]
    pub parameters_csv: Option<PathBuf>,

    #[serde(default)]
    pub data_clean_script: Option<PathBuf>,
    #[serde(default)]
    pub data_proc_script: Option<PathBuf>,
    /// Interpreter the scripts are run with, `Rscript` unless overridden.
    #[serde(default)]
    pub interpreter: Option<String>,
}

/// A validated configuration with every path resolved to a concrete value.
///
/// Built once at startup by [`Config::resolve`]; the rest of the crate only
/// ever sees this form.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub start_year: i32,
    pub end_year: i32,
    pub target_dir: PathBuf,

    pub regmaps_csv: PathBuf,
    pub regsets_csv: PathBuf,
    pub cropsets_csv: PathBuf,
    pub livestocksets_csv: PathBuf,
    pub region_csv: PathBuf,
    pub parameters_csv: PathBuf,

    pub data_clean_script: PathBuf,
    pub data_proc_script: PathBuf,
    pub interpreter: String,
}

impl Config {
    /// Validate the year range and resolve every optional path to its
    /// default. Fails before any processing begins.
    pub fn resolve(self) -> Result<ResolvedConfig> {
        if self.start_year > self.end_year {
            return Err(Error::Config(format!(
                "start_year ({}) must not be greater than end_year ({})",
                self.start_year, self.end_year
            )));
        }

        let data = Path::new(DEFAULT_DATA_DIR);
        Ok(ResolvedConfig {
            start_year: self.start_year,
            end_year: self.end_year,
            target_dir: self.target_dir,
            regmaps_csv: data.join("reg_map.csv"),
            regsets_csv: self.regsets_csv.unwrap_or_else(|| data.join("reg_sets.csv")),
            cropsets_csv: self
                .cropsets_csv
                .unwrap_or_else(|| data.join("crop_sets.csv")),
            livestocksets_csv: self
                .livestocksets_csv
                .unwrap_or_else(|| data.join("livestock_sets.csv")),
            region_csv: self.region_csv.unwrap_or_else(|| data.join("region.csv")),
            parameters_csv: self
                .parameters_csv
                .unwrap_or_else(|| data.join("parameters.csv")),
            data_clean_script: self
                .data_clean_script
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CLEAN_SCRIPT)),
            data_proc_script: self
                .data_proc_script
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PROC_SCRIPT)),
            interpreter: self
                .interpreter
                .unwrap_or_else(|| DEFAULT_INTERPRETER.to_string()),
        })
    }

    pub fn years(&self) -> std::ops::RangeInclusive<i32> {
        self.start_year..=self.end_year
    }
}

impl ResolvedConfig {
    pub fn years(&self) -> std::ops::RangeInclusive<i32> {
        self.start_year..=self.end_year
    }
}
