//! rusthcal-io: digi file I/O and event-row export for rusthcal.
//!
//! Digi files are read through memory mapping via memmap2 and parsed in
//! parallel per event record. Extracted rows can be exported as CSV,
//! packed binary, or HDF5 (behind the `hdf5` feature).

mod error;
pub mod format;
#[cfg(feature = "hdf5")]
pub mod hdf5;
mod reader;
mod writer;

pub use error::{Error, Result};
#[cfg(feature = "hdf5")]
pub use self::hdf5::{read_rows_hdf5, write_rows_hdf5, Hdf5RowSink, RowData, RowWriteOptions};
pub use reader::{DigiFileReader, MappedFileReader};
pub use writer::{DigiFileWriter, RowFileWriter};
