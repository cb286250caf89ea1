//! Raw QIE samples and digitized pulses.
//!
//! A digi is the raw record the front end produces for one channel in one
//! event: an ordered run of QIE sample words, one per 25 ns time slice.
//! Sample words are decoded with plain bit-field extraction; nothing here
//! applies calibration.

use crate::channel::ChannelId;
use crate::error::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of time slices read out per pulse.
pub const SAMPLES_PER_PULSE: usize = 10;

/// Number of capacitors the QIE cycles through.
pub const NUM_CAPIDS: usize = 4;

/// One raw QIE sample word.
///
/// Packed 16-bit layout: bits 0-6 ADC code, bits 7-8 capacitor id,
/// bit 9 data-valid, bit 10 error, bits 11-13 fiber, bits 14-15 fiber
/// channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct QieSample(u16);

impl QieSample {
    /// Creates a sample from its raw 16-bit word.
    #[inline]
    #[must_use]
    pub fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    /// Creates a sample from decoded fields. ADC is masked to 7 bits,
    /// capid to 2 bits.
    #[inline]
    #[must_use]
    pub fn new(adc: u8, capid: u8, dv: bool, er: bool) -> Self {
        let mut raw = u16::from(adc & 0x7F);
        raw |= u16::from(capid & 0x3) << 7;
        if dv {
            raw |= 1 << 9;
        }
        if er {
            raw |= 1 << 10;
        }
        Self(raw)
    }

    /// Returns the raw 16-bit word.
    #[inline]
    #[must_use]
    pub fn raw(&self) -> u16 {
        self.0
    }

    /// ADC code (7 bits, 0..=127).
    #[inline]
    #[must_use]
    pub fn adc(&self) -> u8 {
        (self.0 & 0x7F) as u8
    }

    /// Capacitor id for this slice (2 bits, 0..=3).
    #[inline]
    #[must_use]
    pub fn capid(&self) -> u8 {
        ((self.0 >> 7) & 0x3) as u8
    }

    /// Data-valid flag.
    #[inline]
    #[must_use]
    pub fn dv(&self) -> bool {
        (self.0 >> 9) & 0x1 != 0
    }

    /// Error flag.
    #[inline]
    #[must_use]
    pub fn er(&self) -> bool {
        (self.0 >> 10) & 0x1 != 0
    }

    /// Readout fiber (1-based, 1..=8).
    #[inline]
    #[must_use]
    pub fn fiber(&self) -> u8 {
        (((self.0 >> 11) & 0x7) as u8) + 1
    }

    /// Channel within the readout fiber (0..=3).
    #[inline]
    #[must_use]
    pub fn fiber_chan(&self) -> u8 {
        ((self.0 >> 14) & 0x3) as u8
    }
}

/// One digitized pulse: a channel id plus its ordered raw samples.
///
/// Holds at most [`SAMPLES_PER_PULSE`] samples; the nominal readout always
/// fills all slots, but shorter pulses are representable and read as
/// zero-filled downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawPulse {
    id: ChannelId,
    len: usize,
    samples: [QieSample; SAMPLES_PER_PULSE],
}

impl RawPulse {
    /// Creates a pulse from a slice of raw samples.
    ///
    /// # Errors
    /// Returns [`Error::TooManySamples`] if more than [`SAMPLES_PER_PULSE`]
    /// samples are supplied.
    pub fn new(id: ChannelId, samples: &[QieSample]) -> Result<Self> {
        if samples.len() > SAMPLES_PER_PULSE {
            return Err(Error::TooManySamples {
                got: samples.len(),
                max: SAMPLES_PER_PULSE,
            });
        }
        let mut stored = [QieSample::default(); SAMPLES_PER_PULSE];
        stored[..samples.len()].copy_from_slice(samples);
        Ok(Self {
            id,
            len: samples.len(),
            samples: stored,
        })
    }

    /// Channel this pulse was read from.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ChannelId {
        self.id
    }

    /// Returns the samples in slice order.
    #[inline]
    #[must_use]
    pub fn samples(&self) -> &[QieSample] {
        &self.samples[..self.len]
    }

    /// Number of samples in this pulse.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the pulse carries no samples.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
