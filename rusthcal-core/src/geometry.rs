//! Detector geometry handle.

use std::collections::HashMap;

use crate::channel::ChannelId;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Position of a calorimeter cell in (eta, phi) space.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CellPosition {
    pub eta: f64,
    pub phi: f64,
}

/// Channel-to-cell-position lookup.
///
/// The pipeline carries a geometry handle per event but never consumes it;
/// it is reserved for position-dependent extensions.
#[derive(Debug, Clone, Default)]
pub struct CaloGeometry {
    positions: HashMap<ChannelId, CellPosition>,
}

impl CaloGeometry {
    /// Creates an empty geometry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the cell position for a channel.
    pub fn insert(&mut self, id: ChannelId, position: CellPosition) {
        self.positions.insert(id, position);
    }

    /// Looks up the cell position for a channel.
    #[must_use]
    pub fn position(&self, id: ChannelId) -> Option<&CellPosition> {
        self.positions.get(&id)
    }

    /// Number of registered cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Returns true if no cells are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_lookup() {
        let mut geometry = CaloGeometry::new();
        assert!(geometry.is_empty());

        let id = ChannelId::new(5, 10, 1);
        geometry.insert(id, CellPosition { eta: 0.261, phi: 0.829 });
        assert_eq!(geometry.len(), 1);
        assert!(geometry.position(id).is_some());
        assert!(geometry.position(ChannelId::new(5, 10, 2)).is_none());
    }
}
