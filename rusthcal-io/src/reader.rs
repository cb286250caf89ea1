//! Memory-mapped digi file readers.

use crate::format::{discover_spans, parse_event, EventSpan};
use crate::{Error, Result};
use memmap2::Mmap;
use rayon::prelude::*;
use rusthcal_core::RawEvent;
use std::fs::File;
use std::path::{Path, PathBuf};

/// A memory-mapped file reader.
///
/// Uses memmap2 to access file contents without loading the entire
/// file into memory.
#[derive(Debug)]
pub struct MappedFileReader {
    mmap: Mmap,
    path: PathBuf,
}

impl MappedFileReader {
    /// Opens a file for memory-mapped reading.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or memory-mapped.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)?;
        // SAFETY: The file is opened read-only and we assume it is not modified concurrently.
        // This is the standard safety contract for memory mapping.
        #[allow(unsafe_code)]
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self {
            mmap,
            path: path.as_ref().to_path_buf(),
        })
    }

    /// Returns the file contents as a byte slice.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.mmap[..]
    }

    /// Returns the file size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    /// Returns true if the file is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    /// Path this reader was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A digi file reader with memory-mapped I/O.
///
/// Opening validates the record framing of the whole file, so every
/// [`EventSpan`] held by the reader points at a complete payload.
#[derive(Debug)]
pub struct DigiFileReader {
    reader: MappedFileReader,
    spans: Vec<EventSpan>,
}

impl DigiFileReader {
    /// Opens a digi file and indexes its event records.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or memory-mapped,
    /// or if the record framing is corrupt.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = MappedFileReader::open(path)?;
        let spans = discover_spans(reader.as_bytes()).map_err(|e| match e {
            Error::InvalidFormat(msg) => {
                Error::InvalidFormat(format!("{msg} (file: {})", reader.path().display()))
            }
            other => other,
        })?;
        Ok(Self { reader, spans })
    }

    /// Returns the file size in bytes.
    #[must_use]
    pub fn file_size(&self) -> usize {
        self.reader.len()
    }

    /// Number of event records in the file.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.spans.len()
    }

    /// Parses every event in the file, in file order.
    ///
    /// Payloads are parsed in parallel; the returned vector preserves
    /// record order.
    ///
    /// # Errors
    /// Returns the first parse error encountered.
    pub fn read_all(&self) -> Result<Vec<RawEvent>> {
        let data = self.reader.as_bytes();
        self.spans
            .par_iter()
            .map(|span| parse_event(&data[span.range()]))
            .collect()
    }

    /// Returns a sequential iterator over the events in file order.
    pub fn events(&self) -> impl Iterator<Item = Result<RawEvent>> + '_ {
        let data = self.reader.as_bytes();
        self.spans
            .iter()
            .map(move |span| parse_event(&data[span.range()]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DigiFileWriter;
    use rusthcal_core::event::EventCoordinates;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_mapped_file_reader_matches_written_bytes() {
        let file = NamedTempFile::new().unwrap();
        let mut writer = DigiFileWriter::create(file.path()).unwrap();
        for event in 1..=3 {
            writer
                .write_event(&RawEvent::new(EventCoordinates {
                    run: 360_100,
                    event,
                    ..EventCoordinates::default()
                }))
                .unwrap();
        }
        writer.flush().unwrap();

        let written = std::fs::read(file.path()).unwrap();
        let reader = MappedFileReader::open(file.path()).unwrap();
        assert_eq!(reader.len(), written.len());
        assert!(!reader.is_empty());
        assert_eq!(reader.as_bytes(), &written[..]);
        assert_eq!(reader.path(), file.path());
    }

    #[test]
    fn test_digi_file_reader_empty() {
        let file = NamedTempFile::new().unwrap();

        let reader = DigiFileReader::open(file.path()).unwrap();
        assert_eq!(reader.file_size(), 0);
        assert_eq!(reader.event_count(), 0);
        assert!(reader.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_digi_file_reader_rejects_garbage() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[0xAB; 32]).unwrap();
        file.flush().unwrap();

        let err = DigiFileReader::open(file.path()).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)));
    }
}
