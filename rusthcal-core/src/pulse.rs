//! Calibrated pulses and total-charge aggregation.

use crate::channel::ChannelId;
use crate::digi::SAMPLES_PER_PULSE;

/// One calibrated time slice: the charge from the ADC transfer function and
/// the pedestal for the slice's capacitor id. The charge here is the raw
/// calibrated value; pedestal subtraction happens where the pair is consumed.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CalibratedSlice {
    /// Calibrated charge in fC.
    pub charge: f64,
    /// Pedestal for this slice's capacitor, in fC.
    pub pedestal: f64,
}

/// A decoded pulse: per-slice (charge, pedestal) pairs in slice order.
///
/// Produced by the decoder and consumed within the same event; not
/// retained across events.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibratedPulse {
    id: ChannelId,
    len: usize,
    slices: [CalibratedSlice; SAMPLES_PER_PULSE],
}

impl CalibratedPulse {
    /// Creates an empty pulse for a channel.
    #[must_use]
    pub fn new(id: ChannelId) -> Self {
        Self {
            id,
            len: 0,
            slices: [CalibratedSlice::default(); SAMPLES_PER_PULSE],
        }
    }

    /// Appends one calibrated slice.
    ///
    /// # Panics
    /// Panics if the pulse already holds [`SAMPLES_PER_PULSE`] slices.
    pub fn push(&mut self, charge: f64, pedestal: f64) {
        assert!(self.len < SAMPLES_PER_PULSE, "calibrated pulse is full");
        self.slices[self.len] = CalibratedSlice { charge, pedestal };
        self.len += 1;
    }

    /// Channel this pulse belongs to.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ChannelId {
        self.id
    }

    /// Calibrated slices in time order.
    #[inline]
    #[must_use]
    pub fn slices(&self) -> &[CalibratedSlice] {
        &self.slices[..self.len]
    }

    /// Number of slices.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the pulse holds no slices.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total deposited charge: the sum over slices of charge minus pedestal.
    ///
    /// This is the quantity threshold decisions are made on; it is never
    /// stored itself.
    #[must_use]
    pub fn total_deposited_charge(&self) -> f64 {
        self.slices()
            .iter()
            .map(|s| s.charge - s.pedestal)
            .sum()
    }
}
