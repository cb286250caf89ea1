//! Pipeline configuration.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;

use crate::error::Result;

/// Options recognized by the pulse-extraction pipeline.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    /// Whether sinks emit per-pulse arrays at all. Accumulation always
    /// runs; this gates emission only.
    pub fill_pulses: bool,
    /// Minimum total deposited charge (fC) for a pulse to be kept. Applied
    /// uniformly to all channels; exactly-equal totals are kept.
    pub total_charge_threshold: f64,
    /// Label of the reconstructed-hit collection to index.
    pub rec_hit_collection: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fill_pulses: true,
            total_charge_threshold: 0.0,
            rec_hit_collection: "hbhereco".to_string(),
        }
    }
}

// Intermediate struct so partial JSON files parse with defaults.
#[derive(Deserialize)]
#[serde(default)]
struct JsonPipelineConfig {
    fill_pulses: bool,
    total_charge_threshold: f64,
    rec_hit_collection: String,
}

impl Default for JsonPipelineConfig {
    fn default() -> Self {
        let config = PipelineConfig::default();
        Self {
            fill_pulses: config.fill_pulses,
            total_charge_threshold: config.total_charge_threshold,
            rec_hit_collection: config.rec_hit_collection,
        }
    }
}

impl From<JsonPipelineConfig> for PipelineConfig {
    fn from(json: JsonPipelineConfig) -> Self {
        Self {
            fill_pulses: json.fill_pulses,
            total_charge_threshold: json.total_charge_threshold,
            rec_hit_collection: json.rec_hit_collection,
        }
    }
}

impl PipelineConfig {
    /// Loads configuration from a JSON string; absent fields keep their
    /// defaults.
    ///
    /// # Errors
    /// Returns an error on malformed JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let parsed: JsonPipelineConfig = serde_json::from_str(json)?;
        Ok(parsed.into())
    }

    /// Loads configuration from a JSON file.
    ///
    /// # Errors
    /// Returns an error on I/O failure or malformed JSON.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let parsed: JsonPipelineConfig = serde_json::from_reader(reader)?;
        Ok(parsed.into())
    }
}
