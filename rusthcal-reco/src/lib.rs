//! rusthcal-reco: per-event pulse extraction.
//!
//! This crate orchestrates the pipeline core: for each event it indexes the
//! configured reconstructed-hit collection, then walks the raw digis in
//! readout order through calibration lookup, decoding, total-charge
//! thresholding, and accumulation into the reused fixed-capacity row.
//!
#![warn(missing_docs)]

mod collector;
mod config;
mod error;
mod index;
mod pipeline;

pub use collector::{EventContext, PulseCollector};
pub use config::PipelineConfig;
pub use error::{Error, Result};
pub use index::RecHitIndex;
pub use pipeline::{process_events, ProcessingSummary};
