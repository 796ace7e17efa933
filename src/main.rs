use anyhow::{Context, Result};
use clap::Parser;
use simpleprep::{pipeline, Config};
use std::fs;
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// Prepare the SIMPLE model database from FAOSTAT data: run the cleaning
/// script, convert its CSV output to HAR containers, run the aggregation
/// script per year.
#[derive(Parser, Debug)]
#[command(name = "simpleprep", version)]
struct Cli {
    /// First year to process (inclusive).
    #[arg(long, required_unless_present = "config")]
    start_year: Option<i32>,

    /// Last year to process (inclusive).
    #[arg(long, required_unless_present = "config")]
    end_year: Option<i32>,

    /// Directory the cleaning script populates and the HAR files land in.
    #[arg(long, required_unless_present = "config")]
    target_dir: Option<PathBuf>,

    /// Read the whole run configuration from a JSON file instead of flags.
    #[arg(long, conflicts_with_all = ["start_year", "end_year", "target_dir"])]
    config: Option<PathBuf>,

    /// Override the packaged region-sets CSV.
    #[arg(long)]
    regsets_csv: Option<PathBuf>,
    /// Override the packaged crop-sets CSV.
    #[arg(long)]
    cropsets_csv: Option<PathBuf>,
    /// Override the packaged livestock-sets CSV.
    #[arg(long)]
    livestocksets_csv: Option<PathBuf>,
    /// Override the packaged region-definitions CSV.
    #[arg(long)]
    region_csv: Option<PathBuf>,
    /// Override the packaged parameters CSV.
    #[arg(long)]
    parameters_csv: Option<PathBuf>,

    /// Override the cleaning script path.
    #[arg(long)]
    data_clean_script: Option<PathBuf>,
    /// Override the aggregation script path.
    #[arg(long)]
    data_proc_script: Option<PathBuf>,
    /// Interpreter the scripts run with.
    #[arg(long)]
    interpreter: Option<String>,
}

impl Cli {
    fn into_config(self) -> Result<Config> {
        if let Some(path) = &self.config {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            let cfg: Config = serde_json::from_str(&text)
                .with_context(|| format!("parsing config file {}", path.display()))?;
            return Ok(cfg);
        }
        Ok(Config {
            // presence enforced by clap when --config is absent
            start_year: self.start_year.expect("clap guarantees start_year"),
            end_year: self.end_year.expect("clap guarantees end_year"),
            target_dir: self.target_dir.expect("clap guarantees target_dir"),
            regsets_csv: self.regsets_csv,
            cropsets_csv: self.cropsets_csv,
            livestocksets_csv: self.livestocksets_csv,
            region_csv: self.region_csv,
            parameters_csv: self.parameters_csv,
            data_clean_script: self.data_clean_script,
            data_proc_script: self.data_proc_script,
            interpreter: self.interpreter,
        })
    }
}

fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let cli = Cli::parse();
    let cfg = cli.into_config()?.resolve()?;
    info!(
        start = cfg.start_year,
        end = cfg.end_year,
        target = %cfg.target_dir.display(),
        "startup"
    );

    let summary = pipeline::process(&cfg)?;

    if summary.failures.is_empty() {
        info!(converted = summary.converted, "all files converted");
    } else {
        warn!(
            converted = summary.converted,
            failed = summary.failures.len(),
            "run finished with conversion failures"
        );
        for failure in &summary.failures {
            error!(
                year = failure.year,
                csv = %failure.csv_path.display(),
                "{}",
                failure.error
            );
        }
    }
    Ok(())
}
