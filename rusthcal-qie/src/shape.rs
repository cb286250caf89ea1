//! The QIE ADC transfer shape.
//!
//! The transfer curve maps each 7-bit ADC code to an input-charge bin; it
//! is piecewise because the QIE integrates on four sensitivity ranges of 32
//! codes each. The shape is conditions data, represented here as the 129
//! bin low edges over the 128 codes; the calibrated charge of a code is its
//! bin midpoint.

use crate::error::{Error, Result};

/// Number of ADC codes in the transfer curve.
pub const ADC_CODES: usize = 128;

/// Number of input ranges the codes are grouped into.
pub const ADC_RANGES: usize = 4;

/// ADC codes per input range.
const CODES_PER_RANGE: usize = 32;

/// The ADC transfer curve: strictly increasing bin edges, one more edge
/// than there are codes.
#[derive(Debug, Clone, PartialEq)]
pub struct QieShape {
    edges: [f64; ADC_CODES + 1],
}

impl QieShape {
    /// A linear shape whose bin centers equal the ADC code. Used for tests
    /// and synthetic data; real shapes come from conditions.
    #[must_use]
    pub fn linear() -> Self {
        let mut edges = [0.0; ADC_CODES + 1];
        for (i, edge) in edges.iter_mut().enumerate() {
            #[allow(clippy::cast_precision_loss)]
            {
                *edge = i as f64 - 0.5;
            }
        }
        Self { edges }
    }

    /// Builds a shape from explicit bin edges.
    ///
    /// # Errors
    /// Returns [`Error::ShapeLength`] unless exactly `ADC_CODES + 1` edges
    /// are supplied, and [`Error::NonMonotonicShape`] if they are not
    /// strictly increasing.
    pub fn from_edges(edges: &[f64]) -> Result<Self> {
        if edges.len() != ADC_CODES + 1 {
            return Err(Error::ShapeLength {
                got: edges.len(),
                expected: ADC_CODES + 1,
            });
        }
        for i in 1..edges.len() {
            if edges[i] <= edges[i - 1] {
                return Err(Error::NonMonotonicShape { index: i });
            }
        }
        let mut stored = [0.0; ADC_CODES + 1];
        stored.copy_from_slice(edges);
        Ok(Self { edges: stored })
    }

    /// Low edge of a code's charge bin. The code is masked to 7 bits.
    #[inline]
    #[must_use]
    pub fn low_edge(&self, adc: u8) -> f64 {
        self.edges[usize::from(adc & 0x7F)]
    }

    /// High edge of a code's charge bin. The code is masked to 7 bits.
    #[inline]
    #[must_use]
    pub fn high_edge(&self, adc: u8) -> f64 {
        self.edges[usize::from(adc & 0x7F) + 1]
    }

    /// Bin midpoint of a code: the calibrated charge before linearization.
    #[inline]
    #[must_use]
    pub fn center(&self, adc: u8) -> f64 {
        0.5 * (self.low_edge(adc) + self.high_edge(adc))
    }

    /// Input range a code belongs to (0..=3).
    #[inline]
    #[must_use]
    pub fn range(adc: u8) -> usize {
        usize::from(adc & 0x7F) / CODES_PER_RANGE
    }

    /// The raw bin edges.
    #[inline]
    #[must_use]
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }
}

impl Default for QieShape {
    fn default() -> Self {
        Self::linear()
    }
}
