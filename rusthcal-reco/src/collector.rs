//! Per-event orchestration: decode, filter, accumulate.

use rusthcal_core::channel::HBHE_CHANNEL_COUNT;
use rusthcal_core::event::RawEvent;
use rusthcal_core::geometry::CaloGeometry;
use rusthcal_core::row::EventRow;
use rusthcal_qie::ConditionsDb;

use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::index::RecHitIndex;

/// External handles valid for one event's processing window.
///
/// Handles are passed per call rather than stored, so their validity is
/// scoped to exactly one event; the caller may swap them between events
/// (run boundaries). The geometry handle is carried but not consumed by
/// any stage.
#[derive(Clone, Copy, Debug)]
pub struct EventContext<'a> {
    /// Conditions database serving calibration lookups.
    pub conditions: &'a ConditionsDb,
    /// Opaque detector geometry (reserved).
    pub geometry: &'a CaloGeometry,
}

/// Drives pulse extraction for one event at a time.
///
/// The collector owns the fixed-capacity [`EventRow`] and reuses it across
/// events: each call to [`PulseCollector::process_event`] resets the row,
/// accumulates into it, and returns it borrowed for handoff. One event is
/// fully processed before the next begins; there is no overlap and no
/// retry.
#[derive(Debug)]
pub struct PulseCollector {
    config: PipelineConfig,
    row: EventRow,
    rec_hit_index: RecHitIndex,
}

impl PulseCollector {
    /// Creates a collector with the default HB+HE row capacity.
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_row_capacity(config, HBHE_CHANNEL_COUNT)
    }

    /// Creates a collector whose row stores up to `capacity` pulses.
    #[must_use]
    pub fn with_row_capacity(config: PipelineConfig, capacity: usize) -> Self {
        Self {
            config,
            row: EventRow::with_capacity(capacity),
            rec_hit_index: RecHitIndex::default(),
        }
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The row as left by the most recent event.
    #[must_use]
    pub fn row(&self) -> &EventRow {
        &self.row
    }

    /// The rec-hit index built for the most recent event.
    #[must_use]
    pub fn rec_hit_index(&self) -> &RecHitIndex {
        &self.rec_hit_index
    }

    /// Processes one event into the reused row and returns the completed
    /// row for handoff.
    ///
    /// Walks the digis in input order. Per digi: look up calibration,
    /// decode, aggregate total deposited charge, and keep the pulse only if
    /// the total is at least the configured threshold (`<` rejects). Kept
    /// pulses past the row capacity are counted but not stored. Duplicate
    /// channel ids within one event's digis are an unchecked precondition.
    ///
    /// # Errors
    /// Fails the event on a missing rec-hit collection or a channel with no
    /// conditions entry. The row is then left partially accumulated and is
    /// wiped by the next call.
    pub fn process_event(&mut self, event: &RawEvent, context: &EventContext<'_>) -> Result<&EventRow> {
        self.row.begin(event.coordinates);
        self.rec_hit_index = RecHitIndex::default();

        let hits = event
            .rec_hit_collection(&self.config.rec_hit_collection)
            .ok_or_else(|| Error::RecHitCollectionNotFound {
                name: self.config.rec_hit_collection.clone(),
            })?;
        self.rec_hit_index = RecHitIndex::build(&hits.hits);

        for digi in &event.digis {
            let calibration = context.conditions.calibration(digi.id())?;
            let pulse = calibration.decode(digi);
            if pulse.total_deposited_charge() < self.config.total_charge_threshold {
                continue;
            }
            self.row.push(&pulse);
        }

        Ok(&self.row)
    }
}
