//! Tab-delimited record codecs.
//!
//! Two line formats are supported:
//! - point / centroid: `clusterId<TAB>c1<TAB>...<TAB>ck`
//! - matrix entry: `row<TAB>col<TAB>value`
//!
//! Decoding is strict: a record that does not match its format is an error,
//! never a skipped line.

mod file;

pub use file::{read_records, write_records, write_records_to};

use crate::kmeans::ClusterId;
use crate::mcl::MatrixEntry;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: &'static str, found: usize },

    #[error("field {field}: invalid integer {value:?}")]
    InvalidInteger { field: usize, value: String },

    #[error("field {field}: invalid real {value:?}")]
    InvalidReal { field: usize, value: String },

    #[error("field {field}: matrix indices start at 1")]
    ZeroIndex { field: usize },
}

/// Line codec for one record family.
pub trait RecordCodec {
    type Key;
    type Value;

    fn decode(&self, line: &str) -> Result<(Self::Key, Self::Value), DecodeError>;

    fn encode(&self, key: &Self::Key, value: &Self::Value) -> String;
}

/// `clusterId<TAB>coords...`
#[derive(Debug, Clone, Copy, Default)]
pub struct PointCodec;

impl RecordCodec for PointCodec {
    type Key = ClusterId;
    type Value = Vec<f64>;

    fn decode(&self, line: &str) -> Result<(ClusterId, Vec<f64>), DecodeError> {
        let fields = split_fields(line);
        if fields.len() < 2 {
            return Err(DecodeError::FieldCount {
                expected: "at least 2",
                found: fields.len(),
            });
        }
        let id = parse_int(fields[0], 1)?;
        let coords = fields[1..]
            .iter()
            .enumerate()
            .map(|(i, raw)| parse_real(raw, i + 2))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((id, coords))
    }

    fn encode(&self, key: &ClusterId, value: &Vec<f64>) -> String {
        let mut line = key.to_string();
        for coord in value {
            line.push('\t');
            line.push_str(&format_real(*coord));
        }
        line
    }
}

/// `row<TAB>col<TAB>value`
#[derive(Debug, Clone, Copy, Default)]
pub struct MatrixCodec;

impl RecordCodec for MatrixCodec {
    type Key = (u32, u32);
    type Value = f64;

    fn decode(&self, line: &str) -> Result<((u32, u32), f64), DecodeError> {
        let fields = split_fields(line);
        if fields.len() != 3 {
            return Err(DecodeError::FieldCount {
                expected: "3",
                found: fields.len(),
            });
        }
        let row = parse_index(fields[0], 1)?;
        let col = parse_index(fields[1], 2)?;
        let value = parse_real(fields[2], 3)?;
        Ok(((row, col), value))
    }

    fn encode(&self, key: &(u32, u32), value: &f64) -> String {
        format!("{}\t{}\t{}", key.0, key.1, format_real(*value))
    }
}

impl MatrixCodec {
    pub fn decode_entry(&self, line: &str) -> Result<MatrixEntry, DecodeError> {
        let ((row, col), value) = self.decode(line)?;
        Ok(MatrixEntry { row, col, value })
    }
}

/// Shortest round-trip form that always reads back as a float literal.
pub fn format_real(value: f64) -> String {
    format!("{value:?}")
}

fn split_fields(line: &str) -> Vec<&str> {
    line.trim_end_matches(['\r', '\n']).split('\t').collect()
}

fn parse_int(raw: &str, field: usize) -> Result<u32, DecodeError> {
    raw.trim()
        .parse::<u32>()
        .map_err(|_| DecodeError::InvalidInteger {
            field,
            value: raw.to_string(),
        })
}

fn parse_index(raw: &str, field: usize) -> Result<u32, DecodeError> {
    match parse_int(raw, field)? {
        0 => Err(DecodeError::ZeroIndex { field }),
        index => Ok(index),
    }
}

fn parse_real(raw: &str, field: usize) -> Result<f64, DecodeError> {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(DecodeError::InvalidReal {
            field,
            value: raw.to_string(),
        }),
    }
}
