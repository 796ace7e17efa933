//! The full preparation run: clean, convert, aggregate.
//!
//! Script failures abort the run. Per-file conversion failures do not: the
//! cleaning script can leave the odd malformed CSV behind for one year
//! without invalidating the others, so those are collected into the run
//! summary for the caller to report instead of halting everything.

use std::path::PathBuf;

use glob::glob;
use tracing::{error, info, warn};

use crate::config::ResolvedConfig;
use crate::convert::csv_to_har;
use crate::error::{Error, Result};
use crate::scripts::{run_data_clean, run_data_proc, ScriptRunner};

/// One CSV that could not be converted. The rest of the run proceeded.
#[derive(Debug)]
pub struct ConversionFailure {
    pub year: i32,
    pub csv_path: PathBuf,
    pub error: Error,
}

/// Outcome of a completed run.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// HAR containers written.
    pub converted: usize,
    /// CSV files that failed conversion, in encounter order.
    pub failures: Vec<ConversionFailure>,
}

/// Execute a whole preparation run against a resolved configuration.
#[tracing::instrument(level = "info", skip(cfg), fields(start = cfg.start_year, end = cfg.end_year))]
pub fn process(cfg: &ResolvedConfig) -> Result<RunSummary> {
    let runner = ScriptRunner::new(&cfg.interpreter);

    info!(script = %cfg.data_clean_script.display(), "running data clean");
    run_data_clean(&runner, cfg)?;

    let mut summary = RunSummary::default();
    for year in cfg.years() {
        convert_year(cfg, year, &mut summary);
    }

    for year in cfg.years() {
        info!(year, script = %cfg.data_proc_script.display(), "running data proc");
        run_data_proc(&runner, cfg, year)?;
    }

    info!(
        converted = summary.converted,
        failed = summary.failures.len(),
        "run complete"
    );
    Ok(summary)
}

/// Convert every CSV the cleaning script left under `<target>/<year>/`,
/// collecting failures instead of propagating them.
fn convert_year(cfg: &ResolvedConfig, year: i32, summary: &mut RunSummary) {
    let pattern = cfg.target_dir.join(year.to_string()).join("*.csv");
    let pattern = pattern.to_string_lossy().into_owned();
    let paths = match glob(&pattern) {
        Ok(paths) => paths,
        Err(e) => {
            summary.failures.push(ConversionFailure {
                year,
                csv_path: PathBuf::from(&pattern),
                error: Error::Config(format!("invalid glob pattern {pattern:?}: {e}")),
            });
            return;
        }
    };

    let mut seen = 0usize;
    for entry in paths {
        let csv_path = match entry {
            Ok(p) => p,
            Err(e) => {
                summary.failures.push(ConversionFailure {
                    year,
                    csv_path: e.path().to_path_buf(),
                    error: Error::Io(e.into_error()),
                });
                continue;
            }
        };
        seen += 1;
        match csv_to_har(&csv_path, &cfg.target_dir, year) {
            Ok(har_path) => {
                info!(year, har = %har_path.display(), "converted");
                summary.converted += 1;
            }
            Err(err) => {
                error!(year, csv = %csv_path.display(), %err, "conversion failed");
                summary.failures.push(ConversionFailure {
                    year,
                    csv_path,
                    error: err,
                });
            }
        }
    }
    if seen == 0 {
        warn!(year, "no CSV files found for year");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::io::Write;
    use std::path::Path;
    use tempfile::TempDir;

    fn shell_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "{body}").unwrap();
        path
    }

    fn test_config(tmp: &TempDir, clean_body: &str, proc_body: &str, years: (i32, i32)) -> ResolvedConfig {
        let target = tmp.path().join("target");
        std::fs::create_dir_all(&target).unwrap();
        Config {
            start_year: years.0,
            end_year: years.1,
            target_dir: target,
            regsets_csv: None,
            cropsets_csv: None,
            livestocksets_csv: None,
            region_csv: None,
            parameters_csv: None,
            data_clean_script: Some(shell_script(tmp.path(), "clean.sh", clean_body)),
            data_proc_script: Some(shell_script(tmp.path(), "proc.sh", proc_body)),
            interpreter: Some("sh".to_string()),
        }
        .resolve()
        .unwrap()
    }

    // Stand-in for 01_data_clean.r: one CSV per year in the range.
    const CLEAN_OK: &str = r#"
start=$1; end=$2; out=$3
y=$start
while [ "$y" -le "$end" ]; do
    mkdir -p "$out/$y"
    printf 'REG,VAL\nUSA,%s\nCAN,7\n' "$y" > "$out/$y/qcrop.csv"
    y=$((y + 1))
done
"#;

    // Stand-in for 02_data_proc.r: records which years it was called for.
    const PROC_RECORD: &str = r#"echo "$1" >> "$4/proc_years.txt""#;

    #[test]
    fn full_run_converts_every_year_and_aggregates() {
        let tmp = TempDir::new().unwrap();
        let cfg = test_config(&tmp, CLEAN_OK, PROC_RECORD, (2019, 2020));

        let summary = process(&cfg).unwrap();
        assert_eq!(summary.converted, 2);
        assert!(summary.failures.is_empty());

        for year in [2019, 2020] {
            let har = cfg.target_dir.join(year.to_string()).join("qcrop.har");
            assert!(har.exists(), "missing {}", har.display());
        }
        let proc_years = std::fs::read_to_string(cfg.target_dir.join("proc_years.txt")).unwrap();
        assert_eq!(proc_years, "2019\n2020\n");
    }

    #[test]
    fn bad_csv_is_collected_and_other_years_proceed() {
        let tmp = TempDir::new().unwrap();
        // 2019 gets a malformed three-column file, 2020 a good one.
        let clean = r#"
out=$3
mkdir -p "$out/2019" "$out/2020"
printf 'REG,VAL,EXTRA\nUSA,1,2\n' > "$out/2019/qcrop.csv"
printf 'REG,VAL\nUSA,1\n' > "$out/2020/qcrop.csv"
"#;
        let cfg = test_config(&tmp, clean, PROC_RECORD, (2019, 2020));

        let summary = process(&cfg).unwrap();
        assert_eq!(summary.converted, 1);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].year, 2019);
        assert!(matches!(summary.failures[0].error, Error::Format { .. }));

        // aggregation still ran for both years
        let proc_years = std::fs::read_to_string(cfg.target_dir.join("proc_years.txt")).unwrap();
        assert_eq!(proc_years, "2019\n2020\n");
    }

    #[test]
    fn clean_script_failure_aborts_the_run() {
        let tmp = TempDir::new().unwrap();
        let cfg = test_config(&tmp, "echo broken input; exit 1", PROC_RECORD, (2019, 2019));

        let err = process(&cfg).unwrap_err();
        match err {
            Error::ExternalProcess { stdout, .. } => assert!(stdout.contains("broken input")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!cfg.target_dir.join("proc_years.txt").exists());
    }

    #[test]
    fn proc_script_failure_aborts_after_conversion() {
        let tmp = TempDir::new().unwrap();
        let cfg = test_config(&tmp, CLEAN_OK, "exit 2", (2020, 2020));

        let err = process(&cfg).unwrap_err();
        assert!(matches!(err, Error::ExternalProcess { .. }));
        // conversion had already happened; the HAR file is on disk
        assert!(cfg.target_dir.join("2020").join("qcrop.har").exists());
    }

    #[test]
    fn empty_year_directory_is_not_an_error() {
        let tmp = TempDir::new().unwrap();
        // cleaning produces nothing at all
        let cfg = test_config(&tmp, "true", PROC_RECORD, (2020, 2020));
        let summary = process(&cfg).unwrap();
        assert_eq!(summary.converted, 0);
        assert!(summary.failures.is_empty());
    }
}
