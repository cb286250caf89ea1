//! QIE-specific error types.

use thiserror::Error;

/// Result type for QIE operations.
pub type Result<T> = std::result::Result<T, Error>;

/// QIE-specific error types.
#[derive(Error, Debug)]
pub enum Error {
    /// The conditions database has no entry for a requested channel.
    #[error("no conditions for channel (ieta {ieta}, iphi {iphi}, depth {depth})")]
    CalibrationNotFound { ieta: i16, iphi: u8, depth: u8 },

    /// A transfer shape was supplied with the wrong number of bin edges.
    #[error("transfer shape needs {expected} bin edges, got {got}")]
    ShapeLength { got: usize, expected: usize },

    /// A transfer shape's bin edges are not strictly increasing.
    #[error("transfer shape bin edges must increase: edge {index} does not")]
    NonMonotonicShape { index: usize },

    /// A coder was supplied with a zero slope, which cannot be inverted.
    #[error("zero slope for capid {capid}, range {range}")]
    ZeroSlope { capid: usize, range: usize },

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parse error.
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),
}
