//! Decoding of header-array containers, mirroring `write`.
//!
//! Used to verify produced files and by tests; downstream GEMPACK tooling is
//! the real consumer. Character data cells come back exactly as stored
//! (including pad spaces); set element names and metadata fields are
//! right-trimmed, since their padding is pure storage artifact.

use std::path::Path;

use super::{HarData, HeaderArray, SetDef, LONG_NAME_LEN, NAME_LEN};
use crate::error::{Error, Result};

/// Read a container file into its ordered `(name, array)` entries.
pub fn read(path: &Path) -> Result<Vec<(String, HeaderArray)>> {
    let bytes = std::fs::read(path)?;
    from_bytes(&bytes)
}

pub fn from_bytes(bytes: &[u8]) -> Result<Vec<(String, HeaderArray)>> {
    let mut cursor = Cursor { bytes, pos: 0 };
    let mut entries = Vec::new();
    while !cursor.at_end() {
        entries.push(read_entry(&mut cursor)?);
    }
    Ok(entries)
}

fn read_entry(cur: &mut Cursor) -> Result<(String, HeaderArray)> {
    let name_rec = cur.record()?;
    if name_rec.len() != NAME_LEN {
        return Err(Error::Har(format!(
            "expected {NAME_LEN}-byte header name record, got {} bytes",
            name_rec.len()
        )));
    }
    let name = fixed_str(name_rec).trim_end().to_string();

    let info = cur.record()?;
    let fixed_part = 4 + 2 + 4 + LONG_NAME_LEN + 4;
    if info.len() < fixed_part {
        return Err(Error::Har(format!("header {name}: truncated info record")));
    }
    let type_tag = &info[4..6];
    let long_name = fixed_str(&info[10..10 + LONG_NAME_LEN]).trim_end().to_string();
    let rank = i32_at(info, 10 + LONG_NAME_LEN) as usize;
    if info.len() != fixed_part + 4 * rank {
        return Err(Error::Har(format!(
            "header {name}: rank {rank} does not match info record size"
        )));
    }
    let dims: Vec<usize> = (0..rank)
        .map(|i| i32_at(info, fixed_part + 4 * i) as usize)
        .collect();

    let array = match type_tag {
        b"1C" => {
            if rank != 2 {
                return Err(Error::Har(format!("header {name}: 1C entry with rank {rank}")));
            }
            let values = read_char_block(cur, dims[0], false)
                .map_err(|e| e.in_header(&name))?;
            HeaderArray {
                coefficient: String::new(),
                long_name,
                sets: vec![],
                data: HarData::Strings(values),
            }
        }
        b"RE" => read_real_entry(cur, &name, long_name, &dims)?,
        other => {
            return Err(Error::Har(format!(
                "header {name}: unsupported entry type {:?}",
                String::from_utf8_lossy(other)
            )))
        }
    };
    Ok((name, array))
}

fn read_real_entry(
    cur: &mut Cursor,
    name: &str,
    long_name: String,
    dims: &[usize],
) -> Result<HeaderArray> {
    // set-structure record
    let rec = cur.record()?;
    if rec.len() < 4 + 12 + 4 {
        return Err(Error::Har(format!("header {name}: truncated set record")));
    }
    let coefficient = fixed_str(&rec[4..16]).trim_end().to_string();
    let n_sets = i32_at(rec, 16) as usize;
    let expected_len = 20 + n_sets * 12 + n_sets + n_sets * 4 + 4;
    if rec.len() != expected_len {
        return Err(Error::Har(format!(
            "header {name}: set record length {} does not match {n_sets} sets",
            rec.len()
        )));
    }
    let mut set_names = Vec::with_capacity(n_sets);
    for i in 0..n_sets {
        set_names.push(fixed_str(&rec[20 + 12 * i..32 + 12 * i]).trim_end().to_string());
    }
    let counts_off = 20 + n_sets * 12 + n_sets;
    let counts: Vec<usize> = (0..n_sets)
        .map(|i| i32_at(rec, counts_off + 4 * i) as usize)
        .collect();

    // one element block per distinct set name, in first-occurrence order
    let mut elements: Vec<(String, Vec<String>)> = Vec::new();
    for (set_name, &count) in set_names.iter().zip(&counts) {
        if elements.iter().any(|(n, _)| n == set_name) {
            continue;
        }
        let labels = read_char_block(cur, count, true).map_err(|e| e.in_header(name))?;
        elements.push((set_name.clone(), labels));
    }
    let sets: Vec<SetDef> = set_names
        .iter()
        .map(|n| SetDef {
            name: n.clone(),
            elements: elements
                .iter()
                .find(|(en, _)| en == n)
                .map(|(_, els)| els.clone())
                .unwrap_or_default(),
        })
        .collect();

    let total: usize = dims.iter().product();
    let values = read_real_block(cur, total).map_err(|e| e.in_header(name))?;
    Ok(HeaderArray {
        coefficient,
        long_name,
        sets,
        data: HarData::Reals(values),
    })
}

/// Read one countdown block of fixed-width character cells. The cell width
/// is recovered from the record sizes themselves.
fn read_char_block(cur: &mut Cursor, expected: usize, trim: bool) -> Result<Vec<String>> {
    let mut values = Vec::with_capacity(expected);
    loop {
        let rec = cur.record()?;
        if rec.len() < 16 {
            return Err(Error::Har("truncated character data record".to_string()));
        }
        let recs_left = i32_at(rec, 4);
        let total = i32_at(rec, 8) as usize;
        let in_this = i32_at(rec, 12) as usize;
        if total != expected {
            return Err(Error::Har(format!(
                "character block holds {total} values, expected {expected}"
            )));
        }
        if in_this > 0 {
            let width = (rec.len() - 16) / in_this;
            if 16 + in_this * width != rec.len() {
                return Err(Error::Har("ragged character data record".to_string()));
            }
            for i in 0..in_this {
                let cell = fixed_str(&rec[16 + i * width..16 + (i + 1) * width]);
                values.push(if trim { cell.trim_end().to_string() } else { cell });
            }
        }
        if recs_left <= 1 {
            break;
        }
    }
    if values.len() != expected {
        return Err(Error::Har(format!(
            "character block ended with {} of {expected} values",
            values.len()
        )));
    }
    Ok(values)
}

fn read_real_block(cur: &mut Cursor, expected: usize) -> Result<Vec<f32>> {
    let mut values = Vec::with_capacity(expected);
    loop {
        let rec = cur.record()?;
        if rec.len() < 16 {
            return Err(Error::Har("truncated real data record".to_string()));
        }
        let recs_left = i32_at(rec, 4);
        let total = i32_at(rec, 8) as usize;
        let in_this = i32_at(rec, 12) as usize;
        if total != expected || rec.len() != 16 + in_this * 4 {
            return Err(Error::Har(format!(
                "real block holds {total} values, expected {expected}"
            )));
        }
        for i in 0..in_this {
            let off = 16 + i * 4;
            values.push(f32::from_le_bytes(rec[off..off + 4].try_into().unwrap()));
        }
        if recs_left <= 1 {
            break;
        }
    }
    if values.len() != expected {
        return Err(Error::Har(format!(
            "real block ended with {} of {expected} values",
            values.len()
        )));
    }
    Ok(values)
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    /// Consume one length-framed record and return its payload.
    fn record(&mut self) -> Result<&'a [u8]> {
        if self.pos + 4 > self.bytes.len() {
            return Err(Error::Har("unexpected end of container".to_string()));
        }
        let len = i32_at(self.bytes, self.pos);
        if len < 0 {
            return Err(Error::Har(format!("negative record length {len}")));
        }
        let len = len as usize;
        let start = self.pos + 4;
        let end = start + len;
        if end + 4 > self.bytes.len() {
            return Err(Error::Har("record runs past end of container".to_string()));
        }
        if i32_at(self.bytes, end) as usize != len {
            return Err(Error::Har("mismatched record length framing".to_string()));
        }
        self.pos = end + 4;
        Ok(&self.bytes[start..end])
    }
}

fn i32_at(bytes: &[u8], off: usize) -> i32 {
    i32::from_le_bytes(bytes[off..off + 4].try_into().unwrap())
}

fn fixed_str(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

impl Error {
    fn in_header(self, name: &str) -> Error {
        match self {
            Error::Har(msg) => Error::Har(format!("header {name}: {msg}")),
            other => other,
        }
    }
}
