//! Fixed-capacity per-event output row.
//!
//! This module defines the `EventRow` arena: columnar storage for the pulses
//! that survive filtering in one event, sized once at a hard channel-count
//! ceiling and reused across events with an explicit reset rather than
//! reallocated. Per-pulse data lives in parallel arrays (`SoA` layout), with
//! the charge and pedestal columns holding [`SAMPLES_PER_PULSE`] slots per
//! pulse.

use crate::channel::HBHE_CHANNEL_COUNT;
use crate::channel::ChannelId;
use crate::digi::SAMPLES_PER_PULSE;
use crate::event::EventCoordinates;
use crate::pulse::CalibratedPulse;

/// One event's accumulated result: coordinates plus a bounded set of pulses.
///
/// The logical pulse count may exceed the storage capacity: pulses pushed
/// past the ceiling are dropped but still counted, so
/// `pulse_count - capacity` is observable as the number of dropped pulses.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRow {
    /// Event coordinates, set by [`EventRow::begin`].
    pub coordinates: EventCoordinates,
    /// Logical pulse count; may exceed [`EventRow::capacity`].
    pub pulse_count: usize,
    /// Pedestal-subtracted charge, [`SAMPLES_PER_PULSE`] slots per pulse.
    pub charge: Vec<f64>,
    /// Pedestal, [`SAMPLES_PER_PULSE`] slots per pulse.
    pub pedestal: Vec<f64>,
    /// Per-pulse pseudorapidity index.
    pub ieta: Vec<i16>,
    /// Per-pulse azimuthal index.
    pub iphi: Vec<u8>,
    /// Per-pulse depth index.
    pub depth: Vec<u8>,
}

impl EventRow {
    /// Creates a row with the default HB+HE capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(HBHE_CHANNEL_COUNT)
    }

    /// Creates a row holding up to `capacity` pulses.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            coordinates: EventCoordinates::default(),
            pulse_count: 0,
            charge: vec![0.0; capacity * SAMPLES_PER_PULSE],
            pedestal: vec![0.0; capacity * SAMPLES_PER_PULSE],
            ieta: vec![0; capacity],
            iphi: vec![0; capacity],
            depth: vec![0; capacity],
        }
    }

    /// Maximum number of pulses the row can store.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.ieta.len()
    }

    /// Number of pulses actually stored (bounded by capacity).
    #[inline]
    #[must_use]
    pub fn stored_count(&self) -> usize {
        self.pulse_count.min(self.capacity())
    }

    /// Number of pulses counted but dropped past capacity.
    #[inline]
    #[must_use]
    pub fn dropped_count(&self) -> usize {
        self.pulse_count.saturating_sub(self.capacity())
    }

    /// Zeroes all storage and coordinates in place.
    pub fn reset(&mut self) {
        self.coordinates = EventCoordinates::default();
        self.pulse_count = 0;
        self.charge.fill(0.0);
        self.pedestal.fill(0.0);
        self.ieta.fill(0);
        self.iphi.fill(0);
        self.depth.fill(0);
    }

    /// Starts a new event: resets the row and records its coordinates.
    pub fn begin(&mut self, coordinates: EventCoordinates) {
        self.reset();
        self.coordinates = coordinates;
    }

    /// Appends one calibrated pulse.
    ///
    /// Stores the pedestal-subtracted charge and the pedestal separately for
    /// each slice, plus the channel triple, at the current count's index.
    /// Slices the pulse does not supply stay zero. If the row is already at
    /// capacity the pulse is dropped but the logical count still grows.
    pub fn push(&mut self, pulse: &CalibratedPulse) {
        let capacity = self.capacity();
        if self.pulse_count >= capacity {
            self.pulse_count += 1;
            return;
        }

        let index = self.pulse_count;
        let base = index * SAMPLES_PER_PULSE;
        for (i, slice) in pulse.slices().iter().enumerate() {
            self.charge[base + i] = slice.charge - slice.pedestal;
            self.pedestal[base + i] = slice.pedestal;
        }

        let id = pulse.id();
        self.ieta[index] = id.ieta;
        self.iphi[index] = id.iphi;
        self.depth[index] = id.depth;
        self.pulse_count += 1;
    }

    /// Charge slices of one stored pulse.
    ///
    /// # Panics
    /// Panics if `pulse` is not below [`EventRow::stored_count`].
    #[must_use]
    pub fn charge_samples(&self, pulse: usize) -> &[f64] {
        assert!(pulse < self.stored_count());
        &self.charge[pulse * SAMPLES_PER_PULSE..(pulse + 1) * SAMPLES_PER_PULSE]
    }

    /// Pedestal slices of one stored pulse.
    ///
    /// # Panics
    /// Panics if `pulse` is not below [`EventRow::stored_count`].
    #[must_use]
    pub fn pedestal_samples(&self, pulse: usize) -> &[f64] {
        assert!(pulse < self.stored_count());
        &self.pedestal[pulse * SAMPLES_PER_PULSE..(pulse + 1) * SAMPLES_PER_PULSE]
    }

    /// Channel triple of one stored pulse.
    ///
    /// # Panics
    /// Panics if `pulse` is not below [`EventRow::stored_count`].
    #[must_use]
    pub fn channel(&self, pulse: usize) -> ChannelId {
        assert!(pulse < self.stored_count());
        ChannelId::new(self.ieta[pulse], self.iphi[pulse], self.depth[pulse])
    }
}

impl Default for EventRow {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn flat_pulse(id: ChannelId, charge: f64, pedestal: f64, slices: usize) -> CalibratedPulse {
        let mut pulse = CalibratedPulse::new(id);
        for _ in 0..slices {
            pulse.push(charge, pedestal);
        }
        pulse
    }

    #[test]
    fn test_push_stores_subtracted_charge_and_pedestal() {
        let mut row = EventRow::with_capacity(4);
        row.begin(EventCoordinates {
            run: 7,
            event: 11,
            ..EventCoordinates::default()
        });

        row.push(&flat_pulse(ChannelId::new(5, 10, 1), 2.0, 1.0, 10));

        assert_eq!(row.pulse_count, 1);
        assert_eq!(row.stored_count(), 1);
        assert_eq!(row.channel(0), ChannelId::new(5, 10, 1));
        for i in 0..SAMPLES_PER_PULSE {
            assert_relative_eq!(row.charge_samples(0)[i], 1.0);
            assert_relative_eq!(row.pedestal_samples(0)[i], 1.0);
        }
    }

    #[test]
    fn test_overflow_counts_without_storing() {
        let mut row = EventRow::with_capacity(2);
        row.begin(EventCoordinates::default());

        for i in 0..3 {
            row.push(&flat_pulse(ChannelId::new(i + 1, 1, 1), 3.0, 0.0, 10));
        }

        assert_eq!(row.pulse_count, 3);
        assert_eq!(row.stored_count(), 2);
        assert_eq!(row.dropped_count(), 1);
        // Only the first two pulses, in push order, made it into storage.
        assert_eq!(row.channel(0), ChannelId::new(1, 1, 1));
        assert_eq!(row.channel(1), ChannelId::new(2, 1, 1));
    }

    #[test]
    fn test_begin_clears_previous_event() {
        let mut row = EventRow::with_capacity(2);
        row.begin(EventCoordinates {
            run: 1,
            ..EventCoordinates::default()
        });
        row.push(&flat_pulse(ChannelId::new(9, 9, 2), 5.0, 2.0, 10));
        assert_eq!(row.stored_count(), 1);

        row.begin(EventCoordinates {
            run: 2,
            ..EventCoordinates::default()
        });
        assert_eq!(row.coordinates.run, 2);
        assert_eq!(row.pulse_count, 0);
        assert!(row.charge.iter().all(|&c| c == 0.0));
        assert!(row.ieta.iter().all(|&e| e == 0));
    }

    #[test]
    fn test_short_pulse_leaves_tail_zeroed() {
        let mut row = EventRow::with_capacity(1);
        row.begin(EventCoordinates::default());
        row.push(&flat_pulse(ChannelId::new(3, 4, 1), 6.0, 1.0, 4));

        let charge = row.charge_samples(0);
        let pedestal = row.pedestal_samples(0);
        for i in 0..4 {
            assert_relative_eq!(charge[i], 5.0);
            assert_relative_eq!(pedestal[i], 1.0);
        }
        for i in 4..SAMPLES_PER_PULSE {
            assert_relative_eq!(charge[i], 0.0);
            assert_relative_eq!(pedestal[i], 0.0);
        }
    }

    #[test]
    fn test_default_capacity_is_hbhe() {
        let row = EventRow::new();
        assert_eq!(row.capacity(), HBHE_CHANNEL_COUNT);
        assert_eq!(row.charge.len(), HBHE_CHANNEL_COUNT * SAMPLES_PER_PULSE);
    }
}
