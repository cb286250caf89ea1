//! Channel identifiers for the HCAL barrel and endcap readout.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of readout channels in the HB+HE sub-systems combined.
pub const HBHE_CHANNEL_COUNT: usize = 5184;

/// Identifier for a single readout channel.
///
/// A channel is addressed by its pseudorapidity index `ieta` (signed, the
/// sign selects the detector side), azimuthal index `iphi`, and longitudinal
/// segmentation `depth`. No two channels share the same triple within one
/// sub-system, so the id is usable as a map key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChannelId {
    /// Pseudorapidity index (signed).
    pub ieta: i16,
    /// Azimuthal index.
    pub iphi: u8,
    /// Longitudinal depth index.
    pub depth: u8,
}

impl ChannelId {
    /// Creates a new channel identifier.
    #[inline]
    #[must_use]
    pub fn new(ieta: i16, iphi: u8, depth: u8) -> Self {
        Self { ieta, iphi, depth }
    }

    /// Returns true if the channel sits on the negative-eta side.
    #[inline]
    #[must_use]
    pub fn is_minus_side(&self) -> bool {
        self.ieta < 0
    }

    /// Absolute value of the pseudorapidity index.
    #[inline]
    #[must_use]
    pub fn abs_ieta(&self) -> u16 {
        self.ieta.unsigned_abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_id_equality() {
        let a = ChannelId::new(5, 10, 1);
        let b = ChannelId::new(5, 10, 1);
        let c = ChannelId::new(-5, 10, 1);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_channel_id_sides() {
        assert!(ChannelId::new(-16, 1, 2).is_minus_side());
        assert!(!ChannelId::new(16, 1, 2).is_minus_side());
        assert_eq!(ChannelId::new(-16, 1, 2).abs_ieta(), 16);
    }

    #[test]
    fn test_channel_id_as_map_key() {
        use std::collections::HashMap;

        let mut map = HashMap::new();
        map.insert(ChannelId::new(1, 2, 1), 42_usize);
        map.insert(ChannelId::new(1, 2, 2), 43_usize);
        assert_eq!(map.get(&ChannelId::new(1, 2, 1)), Some(&42));
        assert_eq!(map.len(), 2);
    }
}
