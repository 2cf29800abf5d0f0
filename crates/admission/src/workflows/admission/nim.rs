use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of digits reserved for the per-partition sequence.
pub const SEQUENCE_WIDTH: usize = 4;
/// Largest sequence the fixed-width format can represent.
pub const MAX_SEQUENCE: u32 = 9999;

/// A generated admission number: `<year><program code><sequence>`, e.g.
/// `2025TIF0001`. Canonical form lives on the candidate record once assigned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Nim(pub String);

impl Nim {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Nim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raised when a partition's counter passes the capacity of the fixed-width
/// sequence field. Never truncated or wrapped; the partition is exhausted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("sequence {sequence} exceeds the {SEQUENCE_WIDTH}-digit NIM capacity of partition {year}{program_code}")]
pub struct SequenceOverflow {
    pub year: i32,
    pub program_code: String,
    pub sequence: u32,
}

/// Format an admission number. Pure; the program code is used exactly as
/// stored.
pub fn format(year: i32, program_code: &str, sequence: u32) -> Result<Nim, SequenceOverflow> {
    if sequence > MAX_SEQUENCE {
        return Err(SequenceOverflow {
            year,
            program_code: program_code.to_string(),
            sequence,
        });
    }

    Ok(Nim(format!(
        "{year}{program_code}{sequence:0width$}",
        width = SEQUENCE_WIDTH
    )))
}
