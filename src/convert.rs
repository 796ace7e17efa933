//! CSV → HAR conversion.
//!
//! The cleaning script leaves two-column CSV files behind: a `REG` column of
//! region codes and one data column whose name varies per file. Each file
//! becomes one HAR container with two headers sharing the same row order:
//!
//! * `SET1` — the region set definition, labels right-padded to 12 chars;
//! * `CSV`  — the data vector as `f32`, indexed by the *raw* labels.
//!
//! The padded/raw asymmetry between the two headers is what the downstream
//! SIMPLE tooling expects; do not "fix" it.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use csv::ReaderBuilder;
use tracing::info;

use crate::error::{Error, Result};
use crate::har::{HarData, HarFile, HeaderArray, SetDef};

/// The fixed region-code column every input CSV must carry.
const REGION_COLUMN: &str = "REG";
/// Region labels are right-justified to this width in the set definition.
const REGION_WIDTH: usize = 12;

const SET_LONG_NAME: &str = "Set REG inferred from CSV file";
const CSV_COEFF_NAME: &str = "CSVData";
const CSV_LONG_NAME: &str = "Array extracted from CSV";

/// Convert one two-column CSV into `<output_dir>/<year>/<stem>.har`.
///
/// Fails fast with a `Format` error before anything is written: the header
/// is validated and every data value is parsed up front, so a bad file never
/// leaves a partial container on disk. An existing file at the output path
/// is overwritten.
#[tracing::instrument(level = "debug", skip(output_dir))]
pub fn csv_to_har(csv_path: &Path, output_dir: &Path, year: i32) -> Result<PathBuf> {
    let (regions, values) = read_columns(csv_path)?;

    let stem = csv_path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| format_err(csv_path, "cannot derive an output name from the file name"))?;
    let year_dir = output_dir.join(year.to_string());
    fs::create_dir_all(&year_dir)?;
    let har_path = year_dir.join(format!("{stem}.har"));

    let padded: Vec<String> = regions.iter().map(|r| pad_label(r)).collect();

    let mut har = HarFile::new();
    har.set(
        "SET1",
        HeaderArray {
            coefficient: String::new(),
            long_name: SET_LONG_NAME.to_string(),
            sets: vec![SetDef {
                name: REGION_COLUMN.to_string(),
                elements: padded.clone(),
            }],
            data: HarData::Strings(padded),
        },
    )?;
    har.set(
        "CSV",
        HeaderArray {
            coefficient: CSV_COEFF_NAME.to_string(),
            long_name: CSV_LONG_NAME.to_string(),
            sets: vec![SetDef {
                name: REGION_COLUMN.to_string(),
                elements: regions,
            }],
            data: HarData::Reals(values),
        },
    )?;
    har.write(&har_path)?;

    info!(path = %har_path.display(), "wrote HAR container");
    Ok(har_path)
}

/// Pre-scan the header, then pull the two columns out in file order.
///
/// Row order is semantically significant: it is the implicit join key
/// between the set header and the data header.
fn read_columns(csv_path: &Path) -> Result<(Vec<String>, Vec<f32>)> {
    let file = File::open(csv_path)?;
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(file);

    // Explicit header validation up front, not buried in the row loop.
    let headers = reader
        .headers()
        .map_err(|e| format_err(csv_path, &format!("unreadable header row: {e}")))?;
    if headers.len() != 2 {
        return Err(format_err(
            csv_path,
            &format!("exactly two columns are required, found {}", headers.len()),
        ));
    }
    let reg_idx = headers
        .iter()
        .position(|h| h == REGION_COLUMN)
        .ok_or_else(|| format_err(csv_path, "no REG column present"))?;
    let data_idx = 1 - reg_idx;
    let data_column = headers.get(data_idx).unwrap_or_default().to_string();
    if data_column == REGION_COLUMN {
        return Err(format_err(csv_path, "ambiguous header: both columns are named REG"));
    }

    let mut regions = Vec::new();
    let mut raw_values = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| format_err(csv_path, &format!("bad row: {e}")))?;
        regions.push(record.get(reg_idx).unwrap_or_default().to_string());
        raw_values.push(record.get(data_idx).unwrap_or_default().to_string());
    }

    // Parse everything before the caller writes anything.
    let mut values = Vec::with_capacity(raw_values.len());
    for raw in &raw_values {
        let parsed: f32 = raw.trim().parse().map_err(|_| {
            format_err(
                csv_path,
                &format!("value {raw:?} in column {data_column:?} is not numeric"),
            )
        })?;
        values.push(parsed);
    }
    Ok((regions, values))
}

/// Right-pad a region label with spaces to 12 characters. Longer labels
/// pass through unchanged; truncation would corrupt the set definition.
fn pad_label(label: &str) -> String {
    if label.len() < REGION_WIDTH {
        format!("{label:<width$}", width = REGION_WIDTH)
    } else {
        label.to_string()
    }
}

fn format_err(path: &Path, reason: &str) -> Error {
    Error::Format {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}
