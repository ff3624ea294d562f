use std::fmt;

use serde::{Deserialize, Serialize};

/// Byte accounting for a single streamed read or write.
///
/// Created at the start of a transfer with a fixed `total_size`, updated once
/// per chunk with the cumulative byte count, and dropped when the transfer
/// ends. `fraction` is always recomputed from the other two fields.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    total_size: u64,
    processed: u64,
    fraction: f64,
}

impl Progress {
    /// Start tracking a transfer of `total_size` bytes.
    pub fn start(total_size: u64) -> Self {
        Self {
            total_size,
            processed: 0,
            fraction: 0.0,
        }
    }

    /// Record the cumulative number of bytes processed so far.
    pub fn update(&mut self, processed: u64) -> &Self {
        self.processed = processed;
        self.fraction = if self.total_size > 0 {
            processed as f64 / self.total_size as f64
        } else {
            0.0
        };
        self
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    /// Completed share of the transfer, from 0.0 to 1.0.
    pub fn fraction(&self) -> f64 {
        self.fraction
    }

    pub fn is_complete(&self) -> bool {
        self.processed >= self.total_size
    }
}

/// `total_processed_fraction`, e.g. `40842_8192_0.20057783654082`.
impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.total_size, self.processed, self.fraction)
    }
}
