//! Error types for rusthcal-core.

use thiserror::Error;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types.
#[derive(Error, Debug)]
pub enum Error {
    /// A pulse was constructed with more samples than the readout width.
    #[error("pulse has {got} samples, readout width is {max}")]
    TooManySamples { got: usize, max: usize },
}
