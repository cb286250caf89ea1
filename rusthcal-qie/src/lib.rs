//! rusthcal-qie: QIE calibration model and conditions database.
//!
//! The QIE front end digitizes charge through a nonlinear, piecewise
//! transfer curve. This crate models that curve ([`QieShape`]), the
//! per-channel linearization constants ([`QieCoder`],
//! [`ChannelCalibrations`]), and the conditions database that serves them
//! per channel ([`ConditionsDb`]). The borrowed [`Calibration`] view it
//! hands out is what decodes a raw pulse into calibrated charge.

pub mod calib;
pub mod coder;
pub mod conditions;
pub mod error;
pub mod shape;

pub use calib::ChannelCalibrations;
pub use coder::QieCoder;
pub use conditions::{Calibration, ChannelConditions, ConditionsDb};
pub use error::{Error, Result};
pub use shape::{QieShape, ADC_CODES, ADC_RANGES};
