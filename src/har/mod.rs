//! GEMPACK header-array (HAR) containers.
//!
//! A HAR file is a flat sequence of named, typed array entries ("headers")
//! stored as Fortran-style sequential records: every record is its payload
//! framed by the payload's byte length as a little-endian `i32` on both
//! sides. This module holds the logical model; `write` and `read` own the
//! byte layout.
//!
//! Only the shapes the SIMPLE preparation pipeline needs are supported:
//! rank-2 character matrices (type `1C`, used for set definitions) and 1-D
//! real vectors indexed by named sets (type `RE`, storage `FULL`).

pub mod read;
pub mod write;

pub use read::read;

use std::path::Path;

use crate::error::{Error, Result};

/// Header names are at most four characters in the container.
pub const NAME_LEN: usize = 4;
/// Coefficient and set names occupy 12-byte fields.
pub const COEFF_LEN: usize = 12;
/// Long names occupy a 70-byte field.
pub const LONG_NAME_LEN: usize = 70;
/// Character cells are at least 12 bytes wide; longer labels widen the
/// whole column rather than being truncated.
pub const MIN_CHAR_WIDTH: usize = 12;
/// Cap on a single data record's payload; larger arrays span records.
pub const MAX_RECORD_BYTES: usize = 29_996;

/// A set a header array is indexed by, with its element labels in order.
#[derive(Debug, Clone, PartialEq)]
pub struct SetDef {
    pub name: String,
    pub elements: Vec<String>,
}

/// Payload of one header array.
#[derive(Debug, Clone, PartialEq)]
pub enum HarData {
    /// Fixed-width character vector (container type `1C`). Values shorter
    /// than the column width are space-padded on the right when stored.
    Strings(Vec<String>),
    /// 32-bit real vector (container type `RE`, storage `FULL`).
    Reals(Vec<f32>),
}

impl HarData {
    pub fn len(&self) -> usize {
        match self {
            HarData::Strings(v) => v.len(),
            HarData::Reals(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One named array entry: metadata, index sets and payload.
///
/// Character entries (`1C`) carry no set metadata in the container itself;
/// any `sets` on a `Strings` array exist only in the logical model and are
/// dropped on write.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderArray {
    /// Coefficient name, at most 12 characters.
    pub coefficient: String,
    /// Descriptive long name, at most 70 characters.
    pub long_name: String,
    pub sets: Vec<SetDef>,
    pub data: HarData,
}

impl HeaderArray {
    /// Check the invariants the binary layout depends on.
    fn validate(&self, name: &str) -> Result<()> {
        if self.coefficient.len() > COEFF_LEN {
            return Err(Error::Har(format!(
                "header {name}: coefficient name {:?} exceeds {COEFF_LEN} characters",
                self.coefficient
            )));
        }
        if self.long_name.len() > LONG_NAME_LEN {
            return Err(Error::Har(format!(
                "header {name}: long name exceeds {LONG_NAME_LEN} characters"
            )));
        }
        for set in &self.sets {
            if set.name.len() > COEFF_LEN {
                return Err(Error::Har(format!(
                    "header {name}: set name {:?} exceeds {COEFF_LEN} characters",
                    set.name
                )));
            }
        }
        if let HarData::Reals(vals) = &self.data {
            if !self.sets.is_empty() {
                let expected: usize = self.sets.iter().map(|s| s.elements.len()).product();
                if expected != vals.len() {
                    return Err(Error::Har(format!(
                        "header {name}: set elements imply {expected} values, got {}",
                        vals.len()
                    )));
                }
            }
        }
        Ok(())
    }
}

/// An in-memory HAR container: an ordered list of named header arrays.
///
/// The file is only ever produced whole: populate the container, then
/// [`HarFile::write`] serializes everything into one buffer and writes it in
/// a single shot, overwriting any existing file at the path.
#[derive(Debug, Default)]
pub struct HarFile {
    entries: Vec<(String, HeaderArray)>,
}

impl HarFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header array, replacing any existing entry of the same name.
    pub fn set(&mut self, name: &str, array: HeaderArray) -> Result<()> {
        if name.is_empty() || name.len() > NAME_LEN {
            return Err(Error::Har(format!(
                "header name {name:?} must be 1 to {NAME_LEN} characters"
            )));
        }
        array.validate(name)?;
        if let Some(slot) = self.entries.iter_mut().find(|(n, _)| n == name) {
            slot.1 = array;
        } else {
            self.entries.push((name.to_string(), array));
        }
        Ok(())
    }

    pub fn entries(&self) -> &[(String, HeaderArray)] {
        &self.entries
    }

    /// Serialize the whole container and write it to `path` in one shot.
    pub fn write(&self, path: &Path) -> Result<()> {
        let bytes = write::to_bytes(&self.entries)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reals(vals: &[f32], elements: &[&str]) -> HeaderArray {
        HeaderArray {
            coefficient: "COEFF".to_string(),
            long_name: "a real vector".to_string(),
            sets: vec![SetDef {
                name: "REG".to_string(),
                elements: elements.iter().map(|s| s.to_string()).collect(),
            }],
            data: HarData::Reals(vals.to_vec()),
        }
    }

    #[test]
    fn set_replaces_same_name_in_place() {
        let mut file = HarFile::new();
        file.set("CSV", reals(&[1.0], &["A"])).unwrap();
        file.set("XTR", reals(&[2.0], &["B"])).unwrap();
        file.set("CSV", reals(&[3.0], &["C"])).unwrap();
        assert_eq!(file.entries().len(), 2);
        assert_eq!(file.entries()[0].0, "CSV");
        match &file.entries()[0].1.data {
            HarData::Reals(v) => assert_eq!(v, &[3.0]),
            other => panic!("unexpected data: {other:?}"),
        }
    }

    #[test]
    fn overlong_header_name_is_rejected() {
        let mut file = HarFile::new();
        let err = file.set("TOOLONG", reals(&[1.0], &["A"])).unwrap_err();
        assert!(err.to_string().contains("TOOLONG"));
    }

    #[test]
    fn set_element_count_must_match_data_length() {
        let mut file = HarFile::new();
        let err = file.set("CSV", reals(&[1.0, 2.0], &["A"])).unwrap_err();
        assert!(err.to_string().contains("imply 1 values"));
    }
}
