use std::fmt;

use serde::{Deserialize, Serialize};

use super::domain::ProgramCode;

/// One NIM counter partition: an (admission year, program code) pair. At most
/// one counter exists per key, created lazily on first allocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CounterKey {
    pub year: i32,
    pub program_code: ProgramCode,
}

impl CounterKey {
    pub fn new(year: i32, program_code: ProgramCode) -> Result<Self, CounterError> {
        if !(2000..=9999).contains(&year) {
            return Err(CounterError::InvalidKey(format!(
                "admission year {year} is not a four-digit year"
            )));
        }
        if program_code.as_str().trim().is_empty() {
            return Err(CounterError::InvalidKey(
                "program code must be non-empty".to_string(),
            ));
        }

        Ok(Self { year, program_code })
    }
}

impl fmt::Display for CounterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.year, self.program_code)
    }
}

/// Storage abstraction for the per-partition counters.
///
/// `next_sequence` is the atomic read-modify-write: locate the counter for
/// the key (creating it at zero if absent), increment by one, persist, and
/// return the new value. Two concurrent calls with the same key never return
/// the same value; different keys never block each other.
pub trait NimCounterStore: Send + Sync {
    fn next_sequence(&self, key: &CounterKey) -> Result<u32, CounterError>;
}

/// Counter-side failures. `Unavailable` is transient and retryable by the
/// caller; the core never retries it internally.
#[derive(Debug, thiserror::Error)]
pub enum CounterError {
    #[error("invalid counter partition: {0}")]
    InvalidKey(String),
    #[error("counter storage unavailable: {0}")]
    Unavailable(String),
}
