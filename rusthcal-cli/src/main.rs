//! Command-line driver for HCAL digi pulse extraction and calibration.
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::cast_possible_wrap,
    clippy::too_many_lines
)]

use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rusthcal_core::channel::ChannelId;
use rusthcal_core::digi::{QieSample, RawPulse, NUM_CAPIDS, SAMPLES_PER_PULSE};
use rusthcal_core::event::{EventCoordinates, RawEvent, RecHit, RecHitCollection};
use rusthcal_core::geometry::CaloGeometry;
use rusthcal_core::EventRow;
use rusthcal_io::{DigiFileReader, DigiFileWriter, RowFileWriter};
use rusthcal_qie::{ChannelConditions, ConditionsDb};
use rusthcal_reco::{process_events, EventContext, PipelineConfig, ProcessingSummary};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error: {0}")]
    HcalIo(#[from] rusthcal_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] rusthcal_core::Error),

    #[error("Conditions error: {0}")]
    Conditions(#[from] rusthcal_qie::Error),

    #[error("Processing error: {0}")]
    Processing(#[from] rusthcal_reco::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// HCAL digi pulse extraction and calibration.
#[derive(Parser)]
#[command(name = "rusthcal")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract calibrated pulses from digi files into event rows
    Process {
        /// Input digi file(s)
        #[arg(required = true)]
        input: Vec<PathBuf>,

        /// Conditions database (JSON)
        #[arg(short, long)]
        conditions: PathBuf,

        /// Pipeline configuration (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the total-charge threshold (fC)
        #[arg(short, long)]
        threshold: Option<f64>,

        /// Override the rec-hit collection name
        #[arg(long)]
        rechits: Option<String>,

        /// Emit per-event counters only, no per-pulse data
        #[arg(long)]
        no_pulses: bool,

        /// Output file path (.csv, .bin, .h5)
        #[arg(short, long)]
        output: PathBuf,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show information about digi files
    Info {
        /// Input digi file(s)
        #[arg(required = true)]
        input: Vec<PathBuf>,
    },

    /// Generate a synthetic digi file with matching conditions
    Synth {
        /// Output digi file path
        #[arg(short, long)]
        output: PathBuf,

        /// Where to write the matching conditions JSON
        #[arg(long)]
        conditions_out: Option<PathBuf>,

        /// Number of events to generate
        #[arg(short, long, default_value = "100")]
        events: usize,

        /// Number of instrumented channels
        #[arg(long, default_value = "64")]
        channels: usize,

        /// Per-channel probability of a digi in each event
        #[arg(long, default_value = "0.3")]
        occupancy: f64,

        /// RNG seed
        #[arg(long, default_value = "7")]
        seed: u64,
    },
}

/// Per-event output sink, selected by the output file extension.
enum RowSink {
    PulseCsv(RowFileWriter),
    SummaryCsv(RowFileWriter),
    Binary(RowFileWriter, bool),
    #[cfg(feature = "hdf5")]
    Hdf5(rusthcal_io::Hdf5RowSink),
}

impl RowSink {
    fn create(output: &Path, fill_pulses: bool, verbose: bool) -> Result<Self> {
        let format = output
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or_else(|| "bin".to_string(), str::to_lowercase);

        if format == "h5" || format == "hdf5" {
            #[cfg(feature = "hdf5")]
            {
                let options = rusthcal_io::RowWriteOptions {
                    include_pulses: fill_pulses,
                    ..rusthcal_io::RowWriteOptions::default()
                };
                return Ok(Self::Hdf5(rusthcal_io::Hdf5RowSink::create(
                    output, &options,
                )?));
            }
            #[cfg(not(feature = "hdf5"))]
            return Err(CliError::InvalidArgument(
                "HDF5 output requires building with the hdf5 feature".to_string(),
            ));
        }

        let writer = RowFileWriter::create(output)?;
        match format.as_str() {
            "csv" => Ok(if fill_pulses {
                Self::PulseCsv(writer)
            } else {
                Self::SummaryCsv(writer)
            }),
            "bin" | "dat" => Ok(Self::Binary(writer, fill_pulses)),
            other => {
                if verbose {
                    eprintln!("Unknown extension '{other}', defaulting to binary");
                }
                Ok(Self::Binary(writer, fill_pulses))
            }
        }
    }

    fn write(&mut self, row: &EventRow) -> Result<()> {
        match self {
            Self::PulseCsv(writer) => writer.write_pulses_csv(row)?,
            Self::SummaryCsv(writer) => writer.write_summary_csv(row)?,
            Self::Binary(writer, include_pulses) => writer.write_row_binary(row, *include_pulses)?,
            #[cfg(feature = "hdf5")]
            Self::Hdf5(sink) => sink.write_row(row)?,
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Process {
            input,
            conditions,
            config,
            threshold,
            rechits,
            no_pulses,
            output,
            verbose,
        } => {
            // Processing pipeline:
            // 1. Read digi file(s) with record discovery
            // 2. Parse events in parallel
            // 3. Decode digis against the conditions database
            // 4. Keep pulses at or above the total-charge threshold
            // 5. Write one row per event

            let conditions = ConditionsDb::from_file(&conditions)?;
            let mut pipeline_config = match &config {
                Some(path) => PipelineConfig::from_file(path)?,
                None => PipelineConfig::default(),
            };
            if let Some(threshold) = threshold {
                pipeline_config.total_charge_threshold = threshold;
            }
            if let Some(name) = rechits {
                pipeline_config.rec_hit_collection = name;
            }
            if no_pulses {
                pipeline_config.fill_pulses = false;
            }

            if verbose {
                eprintln!("Processing {} file(s)...", input.len());
                eprintln!("Conditions channels: {}", conditions.len());
                eprintln!("Rec-hit collection: {}", pipeline_config.rec_hit_collection);
                eprintln!(
                    "Total charge threshold: {} fC",
                    pipeline_config.total_charge_threshold
                );
            }

            let geometry = CaloGeometry::new();
            let context = EventContext {
                conditions: &conditions,
                geometry: &geometry,
            };

            let mut sink = RowSink::create(&output, pipeline_config.fill_pulses, verbose)?;
            if verbose {
                eprintln!("Writing output to: {}", output.display());
            }

            let start = Instant::now();
            let mut totals = ProcessingSummary::default();

            for path in &input {
                if verbose {
                    eprintln!("Reading: {}", path.display());
                }

                let reader = DigiFileReader::open(path)?;
                let events = reader.read_all()?;
                let summary =
                    process_events(events, &context, pipeline_config.clone(), |row| {
                        sink.write(row)
                    })?;

                if verbose {
                    eprintln!("  {} events, {} digis", summary.events, summary.digis);
                    eprintln!(
                        "  {} pulses stored, {} dropped past capacity",
                        summary.pulses_stored, summary.pulses_dropped
                    );
                }

                totals.events = totals.events.saturating_add(summary.events);
                totals.digis = totals.digis.saturating_add(summary.digis);
                totals.pulses_stored = totals.pulses_stored.saturating_add(summary.pulses_stored);
                totals.pulses_dropped =
                    totals.pulses_dropped.saturating_add(summary.pulses_dropped);
            }

            let elapsed = start.elapsed();

            println!(
                "Processed {} events from {} file(s) in {:.2}s",
                totals.events,
                input.len(),
                elapsed.as_secs_f64()
            );
            println!("Digis decoded: {}", totals.digis);
            println!("Pulses stored: {}", totals.pulses_stored);
            println!("Pulses dropped past capacity: {}", totals.pulses_dropped);
        }

        Commands::Info { input } => {
            for (i, path) in input.iter().enumerate() {
                if i > 0 {
                    println!();
                }

                let reader = DigiFileReader::open(path)?;
                let file_size = reader.file_size();

                println!("File: {}", path.display());
                println!(
                    "Size: {file_size} bytes ({:.2} MB)",
                    file_size as f64 / 1_000_000.0
                );
                println!("Events: {}", reader.event_count());

                let events = reader.read_all()?;
                let digis: usize = events.iter().map(|e| e.digis.len()).sum();
                let hits: usize = events
                    .iter()
                    .flat_map(|e| e.rec_hits.iter())
                    .map(|c| c.hits.len())
                    .sum();
                println!("Digis: {digis}");
                println!("Rec hits: {hits}");

                if !events.is_empty() {
                    let min_event = events.iter().map(|e| e.coordinates.event).min().unwrap();
                    let max_event = events.iter().map(|e| e.coordinates.event).max().unwrap();
                    println!("Event range: {min_event} - {max_event}");

                    let runs: BTreeSet<i64> = events.iter().map(|e| e.coordinates.run).collect();
                    let runs: Vec<String> = runs.iter().map(ToString::to_string).collect();
                    println!("Runs: {}", runs.join(", "));

                    let collections: BTreeSet<&str> = events
                        .iter()
                        .flat_map(|e| e.rec_hits.iter())
                        .map(|c| c.name.as_str())
                        .collect();
                    let collections: Vec<&str> = collections.into_iter().collect();
                    println!("Collections: {}", collections.join(", "));
                }
            }
        }

        Commands::Synth {
            output,
            conditions_out,
            events,
            channels,
            occupancy,
            seed,
        } => {
            if !(0.0..=1.0).contains(&occupancy) {
                return Err(CliError::InvalidArgument(format!(
                    "occupancy {occupancy} must be within 0..=1"
                )));
            }

            let mut rng = StdRng::seed_from_u64(seed);
            let channel_list = synth_channels(channels);
            let conditions = synth_conditions(&mut rng, &channel_list);

            let mut writer = DigiFileWriter::create(&output)?;
            let mut total_digis = 0usize;
            for n in 0..events {
                let coordinates = EventCoordinates {
                    run: 1,
                    event: n as i64 + 1,
                    lumi: n as i64 / 50 + 1,
                    bunch: rng.random_range(1..=3564),
                    orbit: n as i64 * 11_223,
                    time: 1_700_000_000 + n as i64,
                };
                let event = synth_event(&mut rng, coordinates, &channel_list, occupancy)?;
                total_digis += event.digis.len();
                writer.write_event(&event)?;
            }
            writer.flush()?;

            let conditions_path =
                conditions_out.unwrap_or_else(|| output.with_extension("conditions.json"));
            std::fs::write(&conditions_path, conditions.to_json()?)?;

            println!(
                "Wrote {events} events ({total_digis} digis) to {}",
                output.display()
            );
            println!(
                "Wrote conditions for {} channels to {}",
                conditions.len(),
                conditions_path.display()
            );
        }
    }

    Ok(())
}

/// Walks channel triples over both detector sides: depth 1-2, iphi 1-72,
/// ieta alternating +1, -1, +2, -2, ...
fn synth_channels(count: usize) -> Vec<ChannelId> {
    let mut list = Vec::with_capacity(count);
    let mut ieta: i16 = 1;
    let mut iphi: u8 = 1;
    let mut depth: u8 = 1;
    for _ in 0..count {
        list.push(ChannelId::new(ieta, iphi, depth));
        depth += 1;
        if depth > 2 {
            depth = 1;
            iphi += 1;
            if iphi > 72 {
                iphi = 1;
                ieta = if ieta > 0 { -ieta } else { -ieta + 1 };
                if ieta > 16 {
                    ieta = 1;
                }
            }
        }
    }
    list
}

fn synth_conditions(rng: &mut StdRng, channels: &[ChannelId]) -> ConditionsDb {
    let mut db = ConditionsDb::default();
    for &id in channels {
        let mut pedestals = [0.0; NUM_CAPIDS];
        for pedestal in &mut pedestals {
            *pedestal = rng.random_range(1.5..2.5);
        }
        db.insert(id, ChannelConditions::with_pedestals(pedestals));
    }
    db
}

fn synth_digi(rng: &mut StdRng, id: ChannelId) -> Result<RawPulse> {
    // Fraction of the signal landing in each time slice.
    const SHAPE: [f64; SAMPLES_PER_PULSE] = [
        0.0, 0.0, 0.05, 0.25, 0.4, 0.2, 0.07, 0.03, 0.0, 0.0,
    ];

    let phase: u8 = rng.random_range(0..4);
    let amplitude: f64 = rng.random_range(5.0..90.0);

    let mut samples = [QieSample::default(); SAMPLES_PER_PULSE];
    for (i, sample) in samples.iter_mut().enumerate() {
        let noise: u8 = rng.random_range(0..=3);
        let adc = (f64::from(noise) + amplitude * SHAPE[i]).min(127.0) as u8;
        *sample = QieSample::new(adc, (phase + i as u8) % 4, true, false);
    }
    Ok(RawPulse::new(id, &samples)?)
}

fn synth_event(
    rng: &mut StdRng,
    coordinates: EventCoordinates,
    channels: &[ChannelId],
    occupancy: f64,
) -> Result<RawEvent> {
    let mut event = RawEvent::new(coordinates);
    let mut reco = RecHitCollection::new("hbhereco");
    for &id in channels {
        if !rng.random_bool(occupancy) {
            continue;
        }
        let digi = synth_digi(rng, id)?;
        reco.hits.push(RecHit::new(
            id,
            rng.random_range(0.5..60.0),
            rng.random_range(-12.5..12.5),
        ));
        event.digis.push(digi);
    }
    event.rec_hits.push(reco);
    Ok(event)
}
