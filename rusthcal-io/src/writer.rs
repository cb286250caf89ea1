//! File writers for digi input and event-row output.

use crate::format::encode_event;
use crate::{Error, Result};
use rusthcal_core::digi::SAMPLES_PER_PULSE;
use rusthcal_core::{EventRow, RawEvent};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Appends framed event records to a digi file.
pub struct DigiFileWriter {
    writer: BufWriter<File>,
    scratch: Vec<u8>,
}

impl DigiFileWriter {
    /// Creates a new digi file, truncating any existing one.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            scratch: Vec::new(),
        })
    }

    /// Appends one event record.
    ///
    /// # Errors
    /// Returns an error if encoding or writing fails.
    pub fn write_event(&mut self, event: &RawEvent) -> Result<()> {
        self.scratch.clear();
        encode_event(event, &mut self.scratch)?;
        self.writer.write_all(&self.scratch)?;
        Ok(())
    }

    /// Flushes buffered records to disk.
    ///
    /// # Errors
    /// Returns an error if the flush fails.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Writer for extracted event rows.
///
/// One writer instance produces one output schema; do not mix the CSV
/// and binary methods, or the summary and per-pulse CSV layouts, on the
/// same file.
pub struct RowFileWriter {
    writer: BufWriter<File>,
    header_written: bool,
}

impl RowFileWriter {
    /// Creates a new output file, truncating any existing one.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            header_written: false,
        })
    }

    /// Writes one event as a single summary CSV line.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_summary_csv(&mut self, row: &EventRow) -> Result<()> {
        if !self.header_written {
            writeln!(
                self.writer,
                "run,event,lumi,bunch,orbit,time,pulse_count,stored,dropped"
            )?;
            self.header_written = true;
        }

        let c = &row.coordinates;
        writeln!(
            self.writer,
            "{},{},{},{},{},{},{},{},{}",
            c.run,
            c.event,
            c.lumi,
            c.bunch,
            c.orbit,
            c.time,
            row.pulse_count,
            row.stored_count(),
            row.dropped_count()
        )?;
        self.writer.flush()?;
        Ok(())
    }

    /// Writes one event as one CSV line per stored pulse.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_pulses_csv(&mut self, row: &EventRow) -> Result<()> {
        if !self.header_written {
            write!(self.writer, "run,event,lumi,bunch,orbit,time,pulse,ieta,iphi,depth")?;
            for i in 0..SAMPLES_PER_PULSE {
                write!(self.writer, ",charge_{i}")?;
            }
            for i in 0..SAMPLES_PER_PULSE {
                write!(self.writer, ",pedestal_{i}")?;
            }
            writeln!(self.writer)?;
            self.header_written = true;
        }

        let c = &row.coordinates;
        for pulse in 0..row.stored_count() {
            let id = row.channel(pulse);
            write!(
                self.writer,
                "{},{},{},{},{},{},{},{},{},{}",
                c.run, c.event, c.lumi, c.bunch, c.orbit, c.time, pulse, id.ieta, id.iphi, id.depth
            )?;
            for value in row.charge_samples(pulse) {
                write!(self.writer, ",{value}")?;
            }
            for value in row.pedestal_samples(pulse) {
                write!(self.writer, ",{value}")?;
            }
            writeln!(self.writer)?;
        }
        self.writer.flush()?;
        Ok(())
    }

    /// Writes one event as binary data.
    ///
    /// Format, little-endian: a 60-byte event header of six i64
    /// coordinates, u64 logical pulse count, and u32 stored count; then
    /// per stored pulse i16 ieta + u8 iphi + u8 depth + 10 x f64 charge
    /// + 10 x f64 pedestal (164 bytes). With `include_pulses` false the
    /// stored count is written as zero and no pulse blocks follow.
    ///
    /// # Errors
    /// Returns an error if writing fails or a count exceeds its field
    /// width.
    pub fn write_row_binary(&mut self, row: &EventRow, include_pulses: bool) -> Result<()> {
        let c = &row.coordinates;
        for value in [c.run, c.event, c.lumi, c.bunch, c.orbit, c.time] {
            self.writer.write_all(&value.to_le_bytes())?;
        }
        self.writer
            .write_all(&(row.pulse_count as u64).to_le_bytes())?;
        let stored = if include_pulses { row.stored_count() } else { 0 };
        let stored_u32 = u32::try_from(stored)
            .map_err(|_| Error::InvalidFormat("stored pulse count exceeds u32".to_string()))?;
        self.writer.write_all(&stored_u32.to_le_bytes())?;

        for pulse in 0..stored {
            let id = row.channel(pulse);
            self.writer.write_all(&id.ieta.to_le_bytes())?;
            self.writer.write_all(&[id.iphi, id.depth])?;
            for value in row.charge_samples(pulse) {
                self.writer.write_all(&value.to_le_bytes())?;
            }
            for value in row.pedestal_samples(pulse) {
                self.writer.write_all(&value.to_le_bytes())?;
            }
        }
        self.writer.flush()?;
        Ok(())
    }

    /// Flushes the writer.
    ///
    /// # Errors
    /// Returns an error if the flush fails.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
