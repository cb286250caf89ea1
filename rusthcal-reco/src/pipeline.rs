//! Multi-event driver over the collector.

use rusthcal_core::event::RawEvent;
use rusthcal_core::row::EventRow;

use crate::collector::{EventContext, PulseCollector};
use crate::config::PipelineConfig;
use crate::error::Error;

/// Counters accumulated over a processing run.
///
/// Threshold rejections are deliberately absent: rejected pulses leave no
/// trace anywhere, matching the per-pulse filter contract.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessingSummary {
    /// Events processed.
    pub events: usize,
    /// Raw digis seen across all events.
    pub digis: usize,
    /// Pulses stored into rows.
    pub pulses_stored: usize,
    /// Qualifying pulses dropped past row capacity.
    pub pulses_dropped: usize,
}

/// Drives the collector over a sequence of events, handing each completed
/// row to `on_row`, and returns run counters.
///
/// Events are processed strictly one at a time; the first failing event
/// (or sink callback) aborts the run.
///
/// # Errors
/// Propagates collector errors (converted into `E`) and `on_row` errors.
pub fn process_events<I, F, E>(
    events: I,
    context: &EventContext<'_>,
    config: PipelineConfig,
    mut on_row: F,
) -> std::result::Result<ProcessingSummary, E>
where
    I: IntoIterator<Item = RawEvent>,
    F: FnMut(&EventRow) -> std::result::Result<(), E>,
    E: From<Error>,
{
    let mut collector = PulseCollector::new(config);
    let mut summary = ProcessingSummary::default();

    for event in events {
        summary.digis += event.digis.len();
        let row = collector.process_event(&event, context).map_err(E::from)?;
        summary.events += 1;
        summary.pulses_stored += row.stored_count();
        summary.pulses_dropped += row.dropped_count();
        on_row(row)?;
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use rusthcal_core::channel::ChannelId;
    use rusthcal_core::digi::{QieSample, RawPulse};
    use rusthcal_core::event::{EventCoordinates, RecHitCollection};
    use rusthcal_core::geometry::CaloGeometry;
    use rusthcal_qie::{ChannelConditions, ConditionsDb};

    fn make_event(event_number: i64, ids: &[ChannelId]) -> RawEvent {
        let mut event = RawEvent::new(EventCoordinates {
            run: 1,
            event: event_number,
            ..EventCoordinates::default()
        });
        event.rec_hits.push(RecHitCollection::new("hbhereco"));
        for &id in ids {
            let samples = [QieSample::new(10, 0, true, false); 10];
            event.digis.push(RawPulse::new(id, &samples).unwrap());
        }
        event
    }

    #[test]
    fn test_driver_counts_and_callback() {
        let ids = [ChannelId::new(1, 1, 1), ChannelId::new(2, 1, 1)];
        let mut conditions = ConditionsDb::default();
        for &id in &ids {
            conditions.insert(id, ChannelConditions::with_pedestals([0.0; 4]));
        }
        let geometry = CaloGeometry::new();
        let context = EventContext {
            conditions: &conditions,
            geometry: &geometry,
        };

        let events = vec![make_event(1, &ids), make_event(2, &ids[..1])];
        let mut rows_seen = 0_usize;
        let summary: ProcessingSummary = process_events(
            events,
            &context,
            PipelineConfig::default(),
            |row| -> Result<()> {
                rows_seen += 1;
                assert_eq!(row.coordinates.run, 1);
                Ok(())
            },
        )
        .unwrap();

        assert_eq!(rows_seen, 2);
        assert_eq!(summary.events, 2);
        assert_eq!(summary.digis, 3);
        assert_eq!(summary.pulses_stored, 3);
        assert_eq!(summary.pulses_dropped, 0);
    }

    #[test]
    fn test_driver_aborts_on_missing_calibration() {
        let conditions = ConditionsDb::default();
        let geometry = CaloGeometry::new();
        let context = EventContext {
            conditions: &conditions,
            geometry: &geometry,
        };

        let events = vec![make_event(1, &[ChannelId::new(1, 1, 1)])];
        let result: std::result::Result<ProcessingSummary, Error> =
            process_events(events, &context, PipelineConfig::default(), |_row| Ok(()));
        assert!(matches!(result, Err(Error::QieError(_))));
    }

    #[test]
    fn test_driver_propagates_sink_error() {
        let id = ChannelId::new(3, 3, 1);
        let mut conditions = ConditionsDb::default();
        conditions.insert(id, ChannelConditions::with_pedestals([0.0; 4]));
        let geometry = CaloGeometry::new();
        let context = EventContext {
            conditions: &conditions,
            geometry: &geometry,
        };

        let events = vec![make_event(1, &[id])];
        let result: std::result::Result<ProcessingSummary, Error> =
            process_events(events, &context, PipelineConfig::default(), |_row| {
                Err(Error::RecHitCollectionNotFound {
                    name: "sink failure stand-in".to_string(),
                })
            });
        assert!(result.is_err());
    }
}
