//! Serialization of header arrays into the on-disk record layout.
//!
//! Every record is `len(i32 LE) ++ payload ++ len(i32 LE)`. One header entry
//! is written as:
//!
//! ```text
//! [name, 4 bytes]
//! ["    " type(2) "FULL" long_name(70) rank(i32) dims(i32 × rank)]
//! ... type-specific payload records ...
//! ```
//!
//! `1C` payload records and set-element blocks share one shape:
//! `"    " recs_left(i32) total(i32) in_this(i32) cells`, where `recs_left`
//! counts down to 1 over the records of the block and each cell is a
//! space-padded fixed-width string. `RE FULL` entries carry a set-structure
//! record (coefficient, set names, a `k` status byte per set, element
//! counts), then one element block per distinct set, then the `f32` payload
//! in records of the same countdown shape.

use super::{
    HarData, HeaderArray, SetDef, COEFF_LEN, LONG_NAME_LEN, MAX_RECORD_BYTES, MIN_CHAR_WIDTH,
    NAME_LEN,
};
use crate::error::Result;

/// Serialize an ordered list of named header arrays into one buffer.
pub fn to_bytes(entries: &[(String, HeaderArray)]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for (name, array) in entries {
        write_entry(&mut out, name, array);
    }
    Ok(out)
}

fn write_entry(out: &mut Vec<u8>, name: &str, array: &HeaderArray) {
    push_record(out, &pad(name, NAME_LEN));

    match &array.data {
        HarData::Strings(values) => {
            let width = char_width(values.iter());
            let mut info = info_record(b"1C", &array.long_name);
            push_i32(&mut info, 2);
            push_i32(&mut info, values.len() as i32);
            push_i32(&mut info, width as i32);
            push_record(out, &info);

            write_char_block(out, values, width);
        }
        HarData::Reals(values) => {
            let mut info = info_record(b"RE", &array.long_name);
            if array.sets.is_empty() {
                push_i32(&mut info, 1);
                push_i32(&mut info, values.len() as i32);
            } else {
                push_i32(&mut info, array.sets.len() as i32);
                for set in &array.sets {
                    push_i32(&mut info, set.elements.len() as i32);
                }
            }
            push_record(out, &info);

            write_set_structure(out, &array.coefficient, &array.sets);
            for set in distinct_sets(&array.sets) {
                let width = char_width(set.elements.iter());
                write_char_block(out, &set.elements, width);
            }
            write_real_block(out, values);
        }
    }
}

/// Common prefix of the second record: filler, type tag, storage, long name.
fn info_record(type_tag: &[u8; 2], long_name: &str) -> Vec<u8> {
    let mut rec = Vec::with_capacity(4 + 2 + 4 + LONG_NAME_LEN + 8);
    rec.extend_from_slice(b"    ");
    rec.extend_from_slice(type_tag);
    rec.extend_from_slice(b"FULL");
    rec.extend_from_slice(&pad(long_name, LONG_NAME_LEN));
    rec
}

/// Set-structure record of an `RE FULL` entry. The trailing zero is the
/// count of per-element descriptions, which this writer never emits.
fn write_set_structure(out: &mut Vec<u8>, coefficient: &str, sets: &[SetDef]) {
    let mut rec = Vec::new();
    rec.extend_from_slice(b"    ");
    rec.extend_from_slice(&pad(coefficient, COEFF_LEN));
    push_i32(&mut rec, sets.len() as i32);
    for set in sets {
        rec.extend_from_slice(&pad(&set.name, COEFF_LEN));
    }
    for _ in sets {
        rec.push(b'k');
    }
    for set in sets {
        push_i32(&mut rec, set.elements.len() as i32);
    }
    push_i32(&mut rec, 0);
    push_record(out, &rec);
}

/// Fixed-width character cells, chunked so no record payload exceeds the
/// cap. An empty vector still produces one record so a reader always finds
/// the block.
fn write_char_block(out: &mut Vec<u8>, values: &[String], width: usize) {
    let per_record = (MAX_RECORD_BYTES / width).max(1);
    let total = values.len();
    let n_records = total.div_ceil(per_record).max(1);

    for (idx, chunk) in chunks_or_one_empty(values, per_record).enumerate() {
        let mut rec = Vec::with_capacity(16 + chunk.len() * width);
        rec.extend_from_slice(b"    ");
        push_i32(&mut rec, (n_records - idx) as i32);
        push_i32(&mut rec, total as i32);
        push_i32(&mut rec, chunk.len() as i32);
        for value in chunk {
            rec.extend_from_slice(&pad(value, width));
        }
        push_record(out, &rec);
    }
}

fn write_real_block(out: &mut Vec<u8>, values: &[f32]) {
    let per_record = MAX_RECORD_BYTES / std::mem::size_of::<f32>();
    let total = values.len();
    let n_records = total.div_ceil(per_record).max(1);

    for (idx, chunk) in chunks_or_one_empty(values, per_record).enumerate() {
        let mut rec = Vec::with_capacity(16 + chunk.len() * 4);
        rec.extend_from_slice(b"    ");
        push_i32(&mut rec, (n_records - idx) as i32);
        push_i32(&mut rec, total as i32);
        push_i32(&mut rec, chunk.len() as i32);
        for value in chunk {
            rec.extend_from_slice(&value.to_le_bytes());
        }
        push_record(out, &rec);
    }
}

/// Like `slice.chunks(n)` but yields a single empty chunk for an empty
/// slice, so every block has at least one record.
fn chunks_or_one_empty<T>(slice: &[T], n: usize) -> impl Iterator<Item = &[T]> {
    let extra = if slice.is_empty() { Some(&[] as &[T]) } else { None };
    slice.chunks(n).chain(extra)
}

/// First occurrence of each set name wins; a vector indexed twice by the
/// same set gets one element block.
fn distinct_sets(sets: &[SetDef]) -> Vec<&SetDef> {
    let mut seen = Vec::new();
    let mut out = Vec::new();
    for set in sets {
        if !seen.contains(&set.name.as_str()) {
            seen.push(set.name.as_str());
            out.push(set);
        }
    }
    out
}

/// Cell width for a character block: at least 12 bytes, widened (never
/// truncated) by the longest value.
fn char_width<'a>(values: impl Iterator<Item = &'a String>) -> usize {
    values
        .map(|v| v.len())
        .max()
        .unwrap_or(0)
        .max(MIN_CHAR_WIDTH)
}

/// Space-pad `s` to exactly `n` bytes; values longer than `n` never reach
/// here (validated or measured beforehand).
fn pad(s: &str, n: usize) -> Vec<u8> {
    let mut bytes = s.as_bytes().to_vec();
    bytes.resize(n, b' ');
    bytes
}

fn push_i32(buf: &mut Vec<u8>, v: i32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn push_record(out: &mut Vec<u8>, payload: &[u8]) {
    let len = payload.len() as i32;
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(payload);
    out.extend_from_slice(&len.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_and_info_records_have_exact_bytes() {
        let entries = vec![(
            "SET1".to_string(),
            HeaderArray {
                coefficient: String::new(),
                long_name: "labels".to_string(),
                sets: vec![],
                data: HarData::Strings(vec!["USA".to_string()]),
            },
        )];
        let bytes = to_bytes(&entries).unwrap();

        // name record: len=4, "SET1", len=4
        assert_eq!(&bytes[0..4], &4i32.to_le_bytes());
        assert_eq!(&bytes[4..8], b"SET1");
        assert_eq!(&bytes[8..12], &4i32.to_le_bytes());

        // info record: filler, type, storage, 70-byte long name, rank, dims
        let info_len = 4 + 2 + 4 + 70 + 4 + 2 * 4;
        assert_eq!(&bytes[12..16], &(info_len as i32).to_le_bytes());
        let info = &bytes[16..16 + info_len];
        assert_eq!(&info[0..4], b"    ");
        assert_eq!(&info[4..6], b"1C");
        assert_eq!(&info[6..10], b"FULL");
        assert_eq!(&info[10..16], b"labels");
        assert!(info[16..80].iter().all(|&b| b == b' '));
        assert_eq!(&info[80..84], &2i32.to_le_bytes());
        assert_eq!(&info[84..88], &1i32.to_le_bytes()); // one value
        assert_eq!(&info[88..92], &12i32.to_le_bytes()); // 12-byte cells
    }

    #[test]
    fn char_cells_are_space_padded_to_width() {
        let entries = vec![(
            "S".to_string(),
            HeaderArray {
                coefficient: String::new(),
                long_name: String::new(),
                sets: vec![],
                data: HarData::Strings(vec!["AB".to_string()]),
            },
        )];
        let bytes = to_bytes(&entries).unwrap();
        let cell = b"AB          "; // 12 wide
        assert!(
            bytes.windows(cell.len()).any(|w| w == cell),
            "padded cell not found in output"
        );
    }

    #[test]
    fn long_labels_widen_the_column() {
        assert_eq!(char_width(["THIRTEEN_CHAR".to_string()].iter()), 13);
        assert_eq!(char_width(["USA".to_string()].iter()), 12);
        assert_eq!(char_width(Vec::<String>::new().iter()), 12);
    }

    #[test]
    fn large_real_vectors_span_multiple_records() {
        let values: Vec<f32> = (0..20_000).map(|i| i as f32).collect();
        let mut out = Vec::new();
        write_real_block(&mut out, &values);

        // 29996 / 4 = 7499 floats per record → 3 records
        let first_len = i32::from_le_bytes(out[0..4].try_into().unwrap()) as usize;
        assert_eq!(first_len, 16 + 7499 * 4);
        let recs_left = i32::from_le_bytes(out[8..12].try_into().unwrap());
        assert_eq!(recs_left, 3);
    }
}
