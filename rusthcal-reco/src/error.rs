//! Error types for rusthcal-reco.

use thiserror::Error;

/// Result type for pulse-extraction operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Pulse-extraction error types.
#[derive(Error, Debug)]
pub enum Error {
    /// The event carries no reconstructed-hit collection under the
    /// configured name.
    #[error("event has no reconstructed-hit collection named {name:?}")]
    RecHitCollectionNotFound {
        /// The name that was looked up.
        name: String,
    },

    /// QIE calibration error (including a missing conditions entry).
    #[error("QIE error: {0}")]
    QieError(#[from] rusthcal_qie::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parse error.
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),
}
