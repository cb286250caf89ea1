//! HDF5 event-row I/O.
//!
//! Rows are stored columnar: an `events` group with one 1-D dataset per
//! event quantity, and a `pulses` group with one 1-D dataset per pulse
//! quantity. `pulse_index` holds, for each event, the offset of its
//! first pulse in the `pulses` datasets; the charge and pedestal
//! datasets are flattened pulse-major with
//! [`SAMPLES_PER_PULSE`](rusthcal_core::digi::SAMPLES_PER_PULSE) values
//! per pulse.

use crate::{Error, Result};
use hdf5::types::{H5Type, VarLenUnicode};
use hdf5::{Dataset, File, Group};
use ndarray::{s, ArrayView1};
use rusthcal_core::digi::SAMPLES_PER_PULSE;
use rusthcal_core::EventRow;
use std::path::Path;
use std::str::FromStr;

/// Row write configuration.
#[derive(Clone, Debug)]
pub struct RowWriteOptions {
    /// Chunk size of the extendable datasets, in events.
    pub chunk_events: usize,
    /// Deflate level, or `None` for no compression.
    pub compression: Option<u8>,
    /// Whether to apply the shuffle filter before compression.
    pub shuffle: bool,
    /// Whether to write the per-pulse datasets at all.
    pub include_pulses: bool,
}

impl Default for RowWriteOptions {
    fn default() -> Self {
        Self {
            chunk_events: 4096,
            compression: Some(1),
            shuffle: true,
            include_pulses: true,
        }
    }
}

/// Streaming writer for extracted event rows.
pub struct Hdf5RowSink {
    _file: File,
    writer: RowWriter,
}

impl Hdf5RowSink {
    /// Create a new streaming row sink.
    ///
    /// # Errors
    /// Returns an error if the HDF5 file or datasets cannot be created.
    pub fn create<P: AsRef<Path>>(path: P, options: &RowWriteOptions) -> Result<Self> {
        let file = File::create(path)?;
        set_attr_str_file(&file, "rusthcal_format_version", "0.1")?;

        let events = file.create_group("events")?;
        let pulses = if options.include_pulses {
            let group = file.create_group("pulses")?;
            let samples = u32::try_from(SAMPLES_PER_PULSE)
                .map_err(|_| Error::InvalidFormat("samples per pulse exceeds u32".to_string()))?;
            group
                .new_attr::<u32>()
                .create("samples_per_pulse")?
                .write_scalar(&samples)?;
            Some(group)
        } else {
            None
        };

        let writer = RowWriter::new(&events, pulses.as_ref(), options)?;
        Ok(Self {
            _file: file,
            writer,
        })
    }

    /// Append one event row.
    ///
    /// # Errors
    /// Returns an error if HDF5 I/O fails or a count overflows i64.
    pub fn write_row(&mut self, row: &EventRow) -> Result<()> {
        self.writer.append_row(row)
    }
}

/// Writes event rows to an HDF5 file.
///
/// # Errors
/// Returns an error if HDF5 I/O fails.
pub fn write_rows_hdf5<P, I>(path: P, rows: I, options: &RowWriteOptions) -> Result<()>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = EventRow>,
{
    let mut sink = Hdf5RowSink::create(path, options)?;
    for row in rows {
        sink.write_row(&row)?;
    }
    Ok(())
}

/// Row data loaded from an HDF5 file.
#[derive(Clone, Debug, Default)]
pub struct RowData {
    pub run: Vec<i64>,
    pub event_number: Vec<i64>,
    pub lumi_section: Vec<i64>,
    pub bunch_crossing: Vec<i64>,
    pub orbit: Vec<i64>,
    pub time: Vec<i64>,
    /// Logical pulse count per event (may exceed the stored count).
    pub pulse_count: Vec<i64>,
    /// Offset of each event's first pulse in the pulse datasets.
    pub pulse_index: Vec<i64>,
    pub ieta: Option<Vec<i16>>,
    pub iphi: Option<Vec<u8>>,
    pub depth: Option<Vec<u8>>,
    /// Pedestal-subtracted charge, flattened pulse-major.
    pub charge: Option<Vec<f64>>,
    /// Pedestal, flattened pulse-major.
    pub pedestal: Option<Vec<f64>>,
    pub samples_per_pulse: Option<u32>,
}

impl RowData {
    /// Number of events in the file.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.run.len()
    }
}

/// Reads event rows from an HDF5 file.
///
/// # Errors
/// Returns an error if HDF5 I/O fails or a required dataset is missing.
pub fn read_rows_hdf5<P: AsRef<Path>>(path: P) -> Result<RowData> {
    let file = File::open(path)?;
    let events = file.group("events")?;

    let mut data = RowData {
        run: read_dataset_vec::<i64>(&events, "run")?,
        event_number: read_dataset_vec::<i64>(&events, "event_number")?,
        lumi_section: read_dataset_vec::<i64>(&events, "lumi_section")?,
        bunch_crossing: read_dataset_vec::<i64>(&events, "bunch_crossing")?,
        orbit: read_dataset_vec::<i64>(&events, "orbit")?,
        time: read_dataset_vec::<i64>(&events, "time")?,
        pulse_count: read_dataset_vec::<i64>(&events, "pulse_count")?,
        pulse_index: read_dataset_vec::<i64>(&events, "pulse_index")?,
        ..RowData::default()
    };

    if let Ok(pulses) = file.group("pulses") {
        data.ieta = read_dataset_vec_opt::<i16>(&pulses, "ieta")?;
        data.iphi = read_dataset_vec_opt::<u8>(&pulses, "iphi")?;
        data.depth = read_dataset_vec_opt::<u8>(&pulses, "depth")?;
        data.charge = read_dataset_vec_opt::<f64>(&pulses, "charge")?;
        data.pedestal = read_dataset_vec_opt::<f64>(&pulses, "pedestal")?;
        data.samples_per_pulse = read_attr_opt::<u32>(&pulses, "samples_per_pulse")?;
    }

    Ok(data)
}

struct RowWriter {
    run: Dataset,
    event_number: Dataset,
    lumi_section: Dataset,
    bunch_crossing: Dataset,
    orbit: Dataset,
    time: Dataset,
    pulse_count: Dataset,
    pulse_index: Dataset,
    ieta: Option<Dataset>,
    iphi: Option<Dataset>,
    depth: Option<Dataset>,
    charge: Option<Dataset>,
    pedestal: Option<Dataset>,
    event_count: usize,
    stored_count: usize,
}

impl RowWriter {
    fn new(events: &Group, pulses: Option<&Group>, options: &RowWriteOptions) -> Result<Self> {
        let run = create_extendable_dataset::<i64>(events, "run", options)?;
        let event_number = create_extendable_dataset::<i64>(events, "event_number", options)?;
        let lumi_section = create_extendable_dataset::<i64>(events, "lumi_section", options)?;
        let bunch_crossing = create_extendable_dataset::<i64>(events, "bunch_crossing", options)?;
        let orbit = create_extendable_dataset::<i64>(events, "orbit", options)?;
        let time = create_extendable_dataset::<i64>(events, "time", options)?;
        let pulse_count = create_extendable_dataset::<i64>(events, "pulse_count", options)?;
        let pulse_index = create_extendable_dataset::<i64>(events, "pulse_index", options)?;

        set_dataset_units(&time, "s")?;
        set_dataset_units(&pulse_count, "count")?;

        let (ieta, iphi, depth, charge, pedestal) = if let Some(group) = pulses {
            let ieta = create_extendable_dataset::<i16>(group, "ieta", options)?;
            let iphi = create_extendable_dataset::<u8>(group, "iphi", options)?;
            let depth = create_extendable_dataset::<u8>(group, "depth", options)?;
            let charge = create_extendable_dataset::<f64>(group, "charge", options)?;
            let pedestal = create_extendable_dataset::<f64>(group, "pedestal", options)?;
            set_dataset_units(&charge, "fC")?;
            set_dataset_units(&pedestal, "fC")?;
            (Some(ieta), Some(iphi), Some(depth), Some(charge), Some(pedestal))
        } else {
            (None, None, None, None, None)
        };

        Ok(Self {
            run,
            event_number,
            lumi_section,
            bunch_crossing,
            orbit,
            time,
            pulse_count,
            pulse_index,
            ieta,
            iphi,
            depth,
            charge,
            pedestal,
            event_count: 0,
            stored_count: 0,
        })
    }

    fn append_row(&mut self, row: &EventRow) -> Result<()> {
        let offset = self.event_count;
        let c = &row.coordinates;

        append_slice(&self.run, offset, &[c.run])?;
        append_slice(&self.event_number, offset, &[c.event])?;
        append_slice(&self.lumi_section, offset, &[c.lumi])?;
        append_slice(&self.bunch_crossing, offset, &[c.bunch])?;
        append_slice(&self.orbit, offset, &[c.orbit])?;
        append_slice(&self.time, offset, &[c.time])?;

        let logical = i64::try_from(row.pulse_count)
            .map_err(|_| Error::InvalidFormat("pulse count exceeds i64 range".to_string()))?;
        append_slice(&self.pulse_count, offset, &[logical])?;

        let index = i64::try_from(self.stored_count)
            .map_err(|_| Error::InvalidFormat("pulse index exceeds i64 range".to_string()))?;
        append_slice(&self.pulse_index, offset, &[index])?;

        let stored = row.stored_count();
        if let Some(ds) = &self.ieta {
            append_slice(ds, self.stored_count, &row.ieta[..stored])?;
        }
        if let Some(ds) = &self.iphi {
            append_slice(ds, self.stored_count, &row.iphi[..stored])?;
        }
        if let Some(ds) = &self.depth {
            append_slice(ds, self.stored_count, &row.depth[..stored])?;
        }

        let sample_offset = self.stored_count * SAMPLES_PER_PULSE;
        let sample_len = stored * SAMPLES_PER_PULSE;
        if let Some(ds) = &self.charge {
            append_slice(ds, sample_offset, &row.charge[..sample_len])?;
        }
        if let Some(ds) = &self.pedestal {
            append_slice(ds, sample_offset, &row.pedestal[..sample_len])?;
        }

        self.event_count += 1;
        self.stored_count += stored;
        Ok(())
    }
}

fn create_extendable_dataset<T: H5Type>(
    group: &Group,
    name: &str,
    options: &RowWriteOptions,
) -> Result<Dataset> {
    let mut builder = group
        .new_dataset::<T>()
        .shape((0..,))
        .chunk((options.chunk_events,));

    if let Some(level) = options.compression {
        builder = builder.deflate(level);
    }

    if options.shuffle {
        builder = builder.shuffle();
    }

    Ok(builder.create(name)?)
}

fn append_slice<T: H5Type>(dataset: &Dataset, offset: usize, data: &[T]) -> Result<()> {
    if data.is_empty() {
        return Ok(());
    }
    let new_len = offset + data.len();
    dataset.resize((new_len,))?;
    let view = ArrayView1::from(data);
    dataset.write_slice(view, s![offset..new_len])?;
    Ok(())
}

fn set_dataset_units(dataset: &Dataset, units: &str) -> Result<()> {
    let value = to_var_len_unicode(units)?;
    dataset
        .new_attr::<VarLenUnicode>()
        .create("units")?
        .write_scalar(&value)?;
    Ok(())
}

fn set_attr_str_file(file: &File, name: &str, value: &str) -> Result<()> {
    let value = to_var_len_unicode(value)?;
    file.new_attr::<VarLenUnicode>()
        .create(name)?
        .write_scalar(&value)?;
    Ok(())
}

fn read_dataset_vec<T: H5Type>(group: &Group, name: &str) -> Result<Vec<T>> {
    let dataset = group.dataset(name)?;
    Ok(dataset.read_raw::<T>()?)
}

fn read_dataset_vec_opt<T: H5Type>(group: &Group, name: &str) -> Result<Option<Vec<T>>> {
    match group.dataset(name) {
        Ok(dataset) => Ok(Some(dataset.read_raw::<T>()?)),
        Err(_) => Ok(None),
    }
}

fn read_attr_opt<T: H5Type + Clone>(group: &Group, name: &str) -> Result<Option<T>> {
    match group.attr(name) {
        Ok(attr) => Ok(Some(attr.read_scalar::<T>()?)),
        Err(_) => Ok(None),
    }
}

fn to_var_len_unicode(value: &str) -> Result<VarLenUnicode> {
    VarLenUnicode::from_str(value)
        .map_err(|e| Error::InvalidFormat(format!("invalid utf-8 attribute: {e}")))
}
