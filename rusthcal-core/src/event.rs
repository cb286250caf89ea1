//! Event containers: coordinates, reconstructed hits, raw events.

use crate::channel::ChannelId;
use crate::digi::RawPulse;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Identifying metadata for one event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EventCoordinates {
    /// Run number.
    pub run: i64,
    /// Event number within the run.
    pub event: i64,
    /// Luminosity section.
    pub lumi: i64,
    /// Bunch-crossing id.
    pub bunch: i64,
    /// Orbit id.
    pub orbit: i64,
    /// Event timestamp.
    pub time: i64,
}

/// A previously reconstructed hit for one channel.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RecHit {
    /// Channel the hit was reconstructed on.
    pub id: ChannelId,
    /// Reconstructed energy.
    pub energy: f64,
    /// Reconstructed time.
    pub time: f64,
}

impl RecHit {
    /// Creates a new reconstructed hit.
    #[inline]
    #[must_use]
    pub fn new(id: ChannelId, energy: f64, time: f64) -> Self {
        Self { id, energy, time }
    }
}

/// A named collection of reconstructed hits.
///
/// Events may carry several collections (different reconstruction passes);
/// consumers select one by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecHitCollection {
    /// Collection label, e.g. "hbhereco".
    pub name: String,
    /// Hits in collection order.
    pub hits: Vec<RecHit>,
}

impl RecHitCollection {
    /// Creates an empty collection with the given label.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hits: Vec::new(),
        }
    }

    /// Number of hits in the collection.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Returns true if the collection holds no hits.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

/// One event as delivered by the event source: coordinates, reconstructed
/// hit collections, and the raw digi records for the sub-system.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawEvent {
    /// Event coordinates.
    pub coordinates: EventCoordinates,
    /// Reconstructed-hit collections keyed by label.
    pub rec_hits: Vec<RecHitCollection>,
    /// Raw digitized pulses in readout order.
    pub digis: Vec<RawPulse>,
}

impl RawEvent {
    /// Creates an empty event with the given coordinates.
    #[must_use]
    pub fn new(coordinates: EventCoordinates) -> Self {
        Self {
            coordinates,
            rec_hits: Vec::new(),
            digis: Vec::new(),
        }
    }

    /// Finds a reconstructed-hit collection by label.
    #[must_use]
    pub fn rec_hit_collection(&self, name: &str) -> Option<&RecHitCollection> {
        self.rec_hits.iter().find(|c| c.name == name)
    }
}
