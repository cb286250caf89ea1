//! Per-channel QIE linearization.

use rusthcal_core::digi::{QieSample, NUM_CAPIDS};

use crate::error::{Error, Result};
use crate::shape::{QieShape, ADC_RANGES};

/// Linearization constants for one channel: an offset and slope per
/// (capacitor id, input range) pair.
///
/// The calibrated charge of a sample is
/// `(shape.center(adc) - offset[capid][range]) / slope[capid][range]`.
#[derive(Debug, Clone, PartialEq)]
pub struct QieCoder {
    offsets: [[f64; ADC_RANGES]; NUM_CAPIDS],
    slopes: [[f64; ADC_RANGES]; NUM_CAPIDS],
}

impl QieCoder {
    /// The identity coder: zero offsets, unit slopes.
    #[must_use]
    pub fn unit() -> Self {
        Self {
            offsets: [[0.0; ADC_RANGES]; NUM_CAPIDS],
            slopes: [[1.0; ADC_RANGES]; NUM_CAPIDS],
        }
    }

    /// Builds a coder from explicit offset and slope matrices, indexed
    /// `[capid][range]`.
    ///
    /// # Errors
    /// Returns [`Error::ZeroSlope`] if any slope is zero.
    pub fn from_parts(
        offsets: [[f64; ADC_RANGES]; NUM_CAPIDS],
        slopes: [[f64; ADC_RANGES]; NUM_CAPIDS],
    ) -> Result<Self> {
        for (capid, row) in slopes.iter().enumerate() {
            for (range, &slope) in row.iter().enumerate() {
                if slope == 0.0 {
                    return Err(Error::ZeroSlope { capid, range });
                }
            }
        }
        Ok(Self { offsets, slopes })
    }

    /// Calibrated charge of one sample under the given transfer shape.
    ///
    /// The sample's capacitor id selects the constants row; its ADC code
    /// selects the range column. Both are in bounds by construction of the
    /// sample word.
    #[inline]
    #[must_use]
    pub fn charge(&self, shape: &QieShape, sample: QieSample) -> f64 {
        let adc = sample.adc();
        let capid = usize::from(sample.capid());
        let range = QieShape::range(adc);
        (shape.center(adc) - self.offsets[capid][range]) / self.slopes[capid][range]
    }

    /// The offset matrix, indexed `[capid][range]`.
    #[inline]
    #[must_use]
    pub fn offsets(&self) -> [[f64; ADC_RANGES]; NUM_CAPIDS] {
        self.offsets
    }

    /// The slope matrix, indexed `[capid][range]`.
    #[inline]
    #[must_use]
    pub fn slopes(&self) -> [[f64; ADC_RANGES]; NUM_CAPIDS] {
        self.slopes
    }
}

impl Default for QieCoder {
    fn default() -> Self {
        Self::unit()
    }
}
