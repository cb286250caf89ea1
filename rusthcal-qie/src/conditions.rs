//! The conditions database: per-channel calibration served by channel id.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use rusthcal_core::channel::ChannelId;
use rusthcal_core::digi::{QieSample, RawPulse, NUM_CAPIDS};
use rusthcal_core::pulse::CalibratedPulse;

use crate::calib::ChannelCalibrations;
use crate::coder::QieCoder;
use crate::error::{Error, Result};
use crate::shape::{QieShape, ADC_RANGES};

/// Everything the database stores for one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelConditions {
    /// Pedestal/gain constants.
    pub calibrations: ChannelCalibrations,
    /// Linearization constants.
    pub coder: QieCoder,
}

impl ChannelConditions {
    /// Pairs explicit calibrations with a coder.
    #[must_use]
    pub fn new(calibrations: ChannelCalibrations, coder: QieCoder) -> Self {
        Self {
            calibrations,
            coder,
        }
    }

    /// Conditions with the given pedestals, unit gains, and the identity
    /// coder. The common starting point for tests and synthetic data.
    #[must_use]
    pub fn with_pedestals(pedestals: [f64; NUM_CAPIDS]) -> Self {
        Self::new(ChannelCalibrations::with_pedestals(pedestals), QieCoder::unit())
    }
}

/// Borrowed calibration view for one channel: pedestals, coder, and the
/// shared transfer shape, bundled for the duration of one event.
///
/// This is what the lookup hands out; it is immutable and must not outlive
/// the database that produced it.
#[derive(Debug, Clone, Copy)]
pub struct Calibration<'a> {
    calibrations: &'a ChannelCalibrations,
    coder: &'a QieCoder,
    shape: &'a QieShape,
}

impl Calibration<'_> {
    /// Pedestal for a capacitor id, in fC.
    #[inline]
    #[must_use]
    pub fn pedestal(&self, capid: u8) -> f64 {
        self.calibrations.pedestal(capid)
    }

    /// Gain for a capacitor id.
    #[inline]
    #[must_use]
    pub fn gain(&self, capid: u8) -> f64 {
        self.calibrations.gain(capid)
    }

    /// Calibrated charge of one raw sample.
    #[inline]
    #[must_use]
    pub fn charge(&self, sample: QieSample) -> f64 {
        self.coder.charge(self.shape, sample)
    }

    /// Decodes a raw pulse into per-slice (charge, pedestal) pairs.
    ///
    /// Slice order and count are preserved: the output holds exactly one
    /// calibrated slice per raw sample, each pairing the transfer-function
    /// charge with the pedestal of that slice's capacitor id.
    #[must_use]
    pub fn decode(&self, raw: &RawPulse) -> CalibratedPulse {
        let mut pulse = CalibratedPulse::new(raw.id());
        for sample in raw.samples() {
            pulse.push(self.charge(*sample), self.pedestal(sample.capid()));
        }
        pulse
    }
}

/// Per-run conditions: one transfer shape plus per-channel constants.
///
/// Lookups return a borrowed [`Calibration`] view; a channel without an
/// entry is an error, never a silent default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConditionsDb {
    shape: QieShape,
    channels: HashMap<ChannelId, ChannelConditions>,
}

// JSON schema intermediates. Partial files parse: the shape defaults to
// linear, gains to unity, offsets to zero, slopes to unity.
#[derive(Serialize, Deserialize, Default)]
#[serde(default)]
struct JsonConditions {
    shape: Option<JsonShape>,
    channels: Vec<JsonChannel>,
}

#[derive(Serialize, Deserialize)]
struct JsonShape {
    bin_edges: Vec<f64>,
}

#[derive(Serialize, Deserialize)]
#[serde(default)]
struct JsonChannel {
    ieta: i16,
    iphi: u8,
    depth: u8,
    pedestals: [f64; NUM_CAPIDS],
    gains: [f64; NUM_CAPIDS],
    offsets: [[f64; ADC_RANGES]; NUM_CAPIDS],
    slopes: [[f64; ADC_RANGES]; NUM_CAPIDS],
}

impl Default for JsonChannel {
    fn default() -> Self {
        Self {
            ieta: 0,
            iphi: 0,
            depth: 0,
            pedestals: [0.0; NUM_CAPIDS],
            gains: [1.0; NUM_CAPIDS],
            offsets: [[0.0; ADC_RANGES]; NUM_CAPIDS],
            slopes: [[1.0; ADC_RANGES]; NUM_CAPIDS],
        }
    }
}

impl ConditionsDb {
    /// Creates an empty database with the given transfer shape.
    #[must_use]
    pub fn new(shape: QieShape) -> Self {
        Self {
            shape,
            channels: HashMap::new(),
        }
    }

    /// The transfer shape shared by all channels.
    #[inline]
    #[must_use]
    pub fn shape(&self) -> &QieShape {
        &self.shape
    }

    /// Registers (or replaces) the conditions for a channel.
    pub fn insert(&mut self, id: ChannelId, conditions: ChannelConditions) {
        self.channels.insert(id, conditions);
    }

    /// Number of channels with conditions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Returns true if no channels are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Looks up the calibration view for a channel.
    ///
    /// # Errors
    /// Returns [`Error::CalibrationNotFound`] if the channel has no entry.
    pub fn calibration(&self, id: ChannelId) -> Result<Calibration<'_>> {
        let conditions = self
            .channels
            .get(&id)
            .ok_or(Error::CalibrationNotFound {
                ieta: id.ieta,
                iphi: id.iphi,
                depth: id.depth,
            })?;
        Ok(Calibration {
            calibrations: &conditions.calibrations,
            coder: &conditions.coder,
            shape: &self.shape,
        })
    }

    /// Loads conditions from a JSON string.
    ///
    /// Later duplicate channel entries override earlier ones.
    ///
    /// # Errors
    /// Returns an error on malformed JSON, an invalid shape, or zero
    /// slopes.
    pub fn from_json(json: &str) -> Result<Self> {
        let parsed: JsonConditions = serde_json::from_str(json)?;
        Self::from_json_conditions(parsed)
    }

    /// Loads conditions from a JSON file.
    ///
    /// # Errors
    /// Same conditions as [`ConditionsDb::from_json`], plus I/O failures.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let parsed: JsonConditions = serde_json::from_reader(reader)?;
        Self::from_json_conditions(parsed)
    }

    fn from_json_conditions(parsed: JsonConditions) -> Result<Self> {
        let shape = match parsed.shape {
            Some(s) => QieShape::from_edges(&s.bin_edges)?,
            None => QieShape::linear(),
        };

        let mut db = Self::new(shape);
        for channel in parsed.channels {
            let id = ChannelId::new(channel.ieta, channel.iphi, channel.depth);
            let calibrations = ChannelCalibrations::new(channel.pedestals, channel.gains);
            let coder = QieCoder::from_parts(channel.offsets, channel.slopes)?;
            db.insert(id, ChannelConditions::new(calibrations, coder));
        }
        Ok(db)
    }

    /// Serializes the database to pretty JSON, channels sorted by id so the
    /// output is deterministic.
    ///
    /// # Errors
    /// Returns an error if JSON serialization fails.
    pub fn to_json(&self) -> Result<String> {
        let mut ids: Vec<ChannelId> = self.channels.keys().copied().collect();
        ids.sort_by_key(|id| (id.ieta, id.iphi, id.depth));

        let channels = ids
            .into_iter()
            .map(|id| {
                let conditions = &self.channels[&id];
                JsonChannel {
                    ieta: id.ieta,
                    iphi: id.iphi,
                    depth: id.depth,
                    pedestals: conditions.calibrations.pedestals(),
                    gains: conditions.calibrations.gains(),
                    offsets: conditions.coder.offsets(),
                    slopes: conditions.coder.slopes(),
                }
            })
            .collect();

        let json = JsonConditions {
            shape: Some(JsonShape {
                bin_edges: self.shape.edges().to_vec(),
            }),
            channels,
        };
        Ok(serde_json::to_string_pretty(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_pulse(id: ChannelId) -> RawPulse {
        let samples: Vec<QieSample> = (0..10)
            .map(|i| QieSample::new(2, i % 4, true, false))
            .collect();
        RawPulse::new(id, &samples).unwrap()
    }

    #[test]
    fn test_lookup_unknown_channel_fails() {
        let db = ConditionsDb::default();
        let err = db.calibration(ChannelId::new(5, 10, 1)).unwrap_err();
        assert!(matches!(
            err,
            Error::CalibrationNotFound {
                ieta: 5,
                iphi: 10,
                depth: 1
            }
        ));
    }

    #[test]
    fn test_decode_preserves_order_and_count() {
        let id = ChannelId::new(5, 10, 1);
        let mut db = ConditionsDb::default();
        db.insert(id, ChannelConditions::with_pedestals([1.0, 1.5, 2.0, 2.5]));

        let calibration = db.calibration(id).unwrap();
        let decoded = calibration.decode(&sample_pulse(id));

        assert_eq!(decoded.len(), 10);
        assert_eq!(decoded.id(), id);
        for (i, slice) in decoded.slices().iter().enumerate() {
            // Linear shape + unit coder: charge equals the ADC code.
            assert_relative_eq!(slice.charge, 2.0);
            let expected_pedestal = [1.0, 1.5, 2.0, 2.5][i % 4];
            assert_relative_eq!(slice.pedestal, expected_pedestal);
        }
    }

    #[test]
    fn test_decode_short_pulse() {
        let id = ChannelId::new(-3, 7, 2);
        let mut db = ConditionsDb::default();
        db.insert(id, ChannelConditions::with_pedestals([0.5; 4]));

        let raw = RawPulse::new(id, &[QieSample::new(9, 0, true, false); 3]).unwrap();
        let decoded = db.calibration(id).unwrap().decode(&raw);
        assert_eq!(decoded.len(), 3);
        assert_relative_eq!(decoded.total_deposited_charge(), 3.0 * (9.0 - 0.5));
    }

    #[test]
    fn test_from_json_minimal_defaults() {
        let json = r#"{
            "channels": [
                { "ieta": 5, "iphi": 10, "depth": 1, "pedestals": [1.0, 1.0, 1.0, 1.0] }
            ]
        }"#;
        let db = ConditionsDb::from_json(json).unwrap();
        assert_eq!(db.len(), 1);

        let calibration = db.calibration(ChannelId::new(5, 10, 1)).unwrap();
        // Defaults: linear shape, identity coder, unit gains.
        assert_relative_eq!(calibration.charge(QieSample::new(42, 0, true, false)), 42.0);
        assert_relative_eq!(calibration.pedestal(2), 1.0);
        assert_relative_eq!(calibration.gain(0), 1.0);
    }

    #[test]
    fn test_from_json_rejects_zero_slope() {
        let json = r#"{
            "channels": [
                { "ieta": 1, "iphi": 1, "depth": 1,
                  "slopes": [[1,1,1,1],[1,1,0,1],[1,1,1,1],[1,1,1,1]] }
            ]
        }"#;
        assert!(matches!(
            ConditionsDb::from_json(json),
            Err(Error::ZeroSlope { capid: 1, range: 2 })
        ));
    }

    #[test]
    fn test_from_json_duplicate_channel_last_wins() {
        let json = r#"{
            "channels": [
                { "ieta": 1, "iphi": 1, "depth": 1, "pedestals": [9.0, 9.0, 9.0, 9.0] },
                { "ieta": 1, "iphi": 1, "depth": 1, "pedestals": [3.0, 3.0, 3.0, 3.0] }
            ]
        }"#;
        let db = ConditionsDb::from_json(json).unwrap();
        assert_eq!(db.len(), 1);
        let calibration = db.calibration(ChannelId::new(1, 1, 1)).unwrap();
        assert_relative_eq!(calibration.pedestal(0), 3.0);
    }

    #[test]
    fn test_json_roundtrip() {
        let mut db = ConditionsDb::new(QieShape::linear());
        db.insert(
            ChannelId::new(-2, 30, 1),
            ChannelConditions::with_pedestals([0.2, 0.4, 0.6, 0.8]),
        );
        db.insert(
            ChannelId::new(14, 3, 2),
            ChannelConditions::new(
                ChannelCalibrations::new([1.0; 4], [0.92; 4]),
                QieCoder::unit(),
            ),
        );

        let json = db.to_json().unwrap();
        let restored = ConditionsDb::from_json(&json).unwrap();
        assert_eq!(db, restored);
    }
}
