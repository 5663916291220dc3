//! Errors reported at the library boundary.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SplitError {
    #[error("input buffer is empty")]
    EmptyBuffer,

    #[error("range {from}..{to} is invalid for a buffer of {len} characters")]
    InvalidRange { from: usize, to: usize, len: usize },

    #[error("pinned border {pinned} lies outside {from}..={to}")]
    InvalidPinnedBorder { pinned: usize, from: usize, to: usize },

    #[error("invalid feature table: {0}")]
    InvalidTable(String),
}

pub type Result<T, E = SplitError> = std::result::Result<T, E>;
