//! rusthcal-core: Core types for HCAL digi processing.
//!
//! This crate provides the foundational data model for per-event pulse
//! extraction: channel identifiers, raw QIE digis, calibrated pulses,
//! event containers, and the fixed-capacity per-event output row.

pub mod channel;
pub mod digi;
pub mod error;
pub mod event;
pub mod geometry;
pub mod pulse;
pub mod row;

pub use channel::{ChannelId, HBHE_CHANNEL_COUNT};
pub use digi::{QieSample, RawPulse, NUM_CAPIDS, SAMPLES_PER_PULSE};
pub use error::{Error, Result};
pub use event::{EventCoordinates, RawEvent, RecHit, RecHitCollection};
pub use geometry::{CaloGeometry, CellPosition};
pub use pulse::{CalibratedPulse, CalibratedSlice};
pub use row::EventRow;
