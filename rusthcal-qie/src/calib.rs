//! Per-channel pedestal and gain constants.

use rusthcal_core::digi::NUM_CAPIDS;

/// Pedestal and gain per capacitor id for one channel.
///
/// Pedestals feed the total-charge aggregation and the output row; gains
/// are carried for charge-to-energy conversion and are not consumed by the
/// pulse-extraction pipeline itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelCalibrations {
    pedestals: [f64; NUM_CAPIDS],
    gains: [f64; NUM_CAPIDS],
}

impl ChannelCalibrations {
    /// Creates calibrations from explicit pedestals and gains.
    #[must_use]
    pub fn new(pedestals: [f64; NUM_CAPIDS], gains: [f64; NUM_CAPIDS]) -> Self {
        Self { pedestals, gains }
    }

    /// Creates calibrations with the given pedestals and unit gains.
    #[must_use]
    pub fn with_pedestals(pedestals: [f64; NUM_CAPIDS]) -> Self {
        Self::new(pedestals, [1.0; NUM_CAPIDS])
    }

    /// Pedestal for a capacitor id, in fC. The id is masked to 2 bits.
    #[inline]
    #[must_use]
    pub fn pedestal(&self, capid: u8) -> f64 {
        self.pedestals[usize::from(capid & 0x3)]
    }

    /// Gain for a capacitor id. The id is masked to 2 bits.
    #[inline]
    #[must_use]
    pub fn gain(&self, capid: u8) -> f64 {
        self.gains[usize::from(capid & 0x3)]
    }

    /// All four pedestals, indexed by capacitor id.
    #[inline]
    #[must_use]
    pub fn pedestals(&self) -> [f64; NUM_CAPIDS] {
        self.pedestals
    }

    /// All four gains, indexed by capacitor id.
    #[inline]
    #[must_use]
    pub fn gains(&self) -> [f64; NUM_CAPIDS] {
        self.gains
    }
}

impl Default for ChannelCalibrations {
    fn default() -> Self {
        Self::with_pedestals([0.0; NUM_CAPIDS])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_pedestal_per_capid() {
        let calib = ChannelCalibrations::with_pedestals([1.0, 2.0, 3.0, 4.0]);
        assert_relative_eq!(calib.pedestal(0), 1.0);
        assert_relative_eq!(calib.pedestal(3), 4.0);
        assert_relative_eq!(calib.gain(3), 1.0);
    }

    #[test]
    fn test_capid_masked() {
        let calib = ChannelCalibrations::with_pedestals([1.0, 2.0, 3.0, 4.0]);
        // 5 & 0x3 == 1
        assert_relative_eq!(calib.pedestal(5), 2.0);
    }
}
