//! Binary digi file format.
//!
//! A digi file is a flat sequence of framed event records, all fields
//! little-endian:
//!
//! ```text
//! record  := magic:u32 payload_len:u32 payload
//! payload := coordinates (6 x i64: run, event, lumi, bunch, orbit, time)
//!            n_collections:u16 collection*
//!            n_digis:u32 digi*
//! collection := name_len:u16 name:utf8
//!               n_hits:u32 hit*
//! hit     := ieta:i16 iphi:u8 depth:u8 energy:f64 time:f64
//! digi    := ieta:i16 iphi:u8 depth:u8 n_samples:u8 sample_word:u16*
//! ```
//!
//! Records are self-delimiting, so a file can be split into per-event
//! byte spans without parsing the payloads.

use crate::{Error, Result};
use rusthcal_core::channel::ChannelId;
use rusthcal_core::digi::{QieSample, RawPulse};
use rusthcal_core::event::{EventCoordinates, RawEvent, RecHit, RecHitCollection};

/// Magic word at the start of every event record.
pub const MAGIC: u32 = u32::from_le_bytes(*b"HDG1");

/// Size of the record frame (magic word plus payload length).
pub const FRAME_SIZE: usize = 8;

/// Wire size of one hit record.
const HIT_SIZE: usize = 20;

/// Wire size of a digi record with no samples.
const DIGI_MIN_SIZE: usize = 5;

/// Byte range of one event payload within a digi file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EventSpan {
    /// Byte offset of the payload start.
    pub offset: usize,
    /// Payload length in bytes.
    pub len: usize,
}

impl EventSpan {
    /// Byte range of the payload within the file.
    #[must_use]
    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.len
    }
}

/// Locates every event payload in a digi file.
///
/// Walks the record frames without parsing payloads, so a multi-gigabyte
/// file is indexed with a single pass over its headers.
///
/// # Errors
/// Returns an error if a frame is truncated, a payload runs past the end
/// of the file, or a record does not start with the magic word.
pub fn discover_spans(data: &[u8]) -> Result<Vec<EventSpan>> {
    let mut spans = Vec::new();
    let mut cursor = Cursor::new(data);
    while !cursor.is_empty() {
        let magic = cursor.take_u32()?;
        if magic != MAGIC {
            return Err(Error::InvalidFormat(format!(
                "bad magic word {magic:#010x} at byte {}",
                cursor.pos - 4
            )));
        }
        let len = cursor.take_u32()? as usize;
        let offset = cursor.pos;
        cursor.skip(len)?;
        spans.push(EventSpan { offset, len });
    }
    Ok(spans)
}

/// Appends one framed event record to `out`.
///
/// # Errors
/// Returns an error if a collection count, hit count, digi count, or
/// name length exceeds its field width.
pub fn encode_event(event: &RawEvent, out: &mut Vec<u8>) -> Result<()> {
    out.extend_from_slice(&MAGIC.to_le_bytes());
    let len_at = out.len();
    out.extend_from_slice(&[0u8; 4]);
    let payload_start = out.len();

    let c = &event.coordinates;
    for value in [c.run, c.event, c.lumi, c.bunch, c.orbit, c.time] {
        out.extend_from_slice(&value.to_le_bytes());
    }

    let n_collections = u16::try_from(event.rec_hits.len())
        .map_err(|_| Error::InvalidFormat("too many rec-hit collections for u16".to_string()))?;
    out.extend_from_slice(&n_collections.to_le_bytes());
    for collection in &event.rec_hits {
        let name = collection.name.as_bytes();
        let name_len = u16::try_from(name.len()).map_err(|_| {
            Error::InvalidFormat(format!("collection name exceeds u16 length: {}", name.len()))
        })?;
        out.extend_from_slice(&name_len.to_le_bytes());
        out.extend_from_slice(name);

        let n_hits = u32::try_from(collection.hits.len())
            .map_err(|_| Error::InvalidFormat("too many rec hits for u32".to_string()))?;
        out.extend_from_slice(&n_hits.to_le_bytes());
        for hit in &collection.hits {
            encode_channel(hit.id, out);
            out.extend_from_slice(&hit.energy.to_le_bytes());
            out.extend_from_slice(&hit.time.to_le_bytes());
        }
    }

    let n_digis = u32::try_from(event.digis.len())
        .map_err(|_| Error::InvalidFormat("too many digis for u32".to_string()))?;
    out.extend_from_slice(&n_digis.to_le_bytes());
    for digi in &event.digis {
        encode_channel(digi.id(), out);
        let n_samples = u8::try_from(digi.len())
            .map_err(|_| Error::InvalidFormat("too many samples for u8".to_string()))?;
        out.push(n_samples);
        for sample in digi.samples() {
            out.extend_from_slice(&sample.raw().to_le_bytes());
        }
    }

    let payload_len = u32::try_from(out.len() - payload_start)
        .map_err(|_| Error::InvalidFormat("event payload exceeds u32 length".to_string()))?;
    out[len_at..len_at + 4].copy_from_slice(&payload_len.to_le_bytes());
    Ok(())
}

/// Parses one event payload.
///
/// # Errors
/// Returns an error if the payload is truncated, carries trailing bytes,
/// claims more hits or digis than its remaining bytes could hold, a
/// collection name is not UTF-8, or a digi has more samples than a
/// pulse can hold.
pub fn parse_event(payload: &[u8]) -> Result<RawEvent> {
    let mut cursor = Cursor::new(payload);

    let coordinates = EventCoordinates {
        run: cursor.take_i64()?,
        event: cursor.take_i64()?,
        lumi: cursor.take_i64()?,
        bunch: cursor.take_i64()?,
        orbit: cursor.take_i64()?,
        time: cursor.take_i64()?,
    };
    let mut event = RawEvent::new(coordinates);

    let n_collections = cursor.take_u16()?;
    event.rec_hits.reserve(usize::from(n_collections));
    for _ in 0..n_collections {
        let name_len = usize::from(cursor.take_u16()?);
        let name = std::str::from_utf8(cursor.take_bytes(name_len)?).map_err(|e| {
            Error::InvalidFormat(format!("collection name is not valid UTF-8: {e}"))
        })?;
        let mut collection = RecHitCollection::new(name);

        let n_hits = cursor.take_u32()? as usize;
        if n_hits > cursor.remaining() / HIT_SIZE {
            return Err(Error::InvalidFormat(format!(
                "hit count {n_hits} overruns {} remaining bytes",
                cursor.remaining()
            )));
        }
        collection.hits.reserve(n_hits);
        for _ in 0..n_hits {
            let id = parse_channel(&mut cursor)?;
            let energy = cursor.take_f64()?;
            let time = cursor.take_f64()?;
            collection.hits.push(RecHit::new(id, energy, time));
        }
        event.rec_hits.push(collection);
    }

    let n_digis = cursor.take_u32()? as usize;
    if n_digis > cursor.remaining() / DIGI_MIN_SIZE {
        return Err(Error::InvalidFormat(format!(
            "digi count {n_digis} overruns {} remaining bytes",
            cursor.remaining()
        )));
    }
    event.digis.reserve(n_digis);
    for _ in 0..n_digis {
        let id = parse_channel(&mut cursor)?;
        let n_samples = usize::from(cursor.take_u8()?);
        let mut samples = Vec::with_capacity(n_samples);
        for _ in 0..n_samples {
            samples.push(QieSample::from_raw(cursor.take_u16()?));
        }
        event.digis.push(RawPulse::new(id, &samples)?);
    }

    if !cursor.is_empty() {
        return Err(Error::InvalidFormat(format!(
            "{} trailing bytes after event payload",
            cursor.remaining()
        )));
    }
    Ok(event)
}

fn encode_channel(id: ChannelId, out: &mut Vec<u8>) {
    out.extend_from_slice(&id.ieta.to_le_bytes());
    out.push(id.iphi);
    out.push(id.depth);
}

fn parse_channel(cursor: &mut Cursor<'_>) -> Result<ChannelId> {
    let ieta = cursor.take_i16()?;
    let iphi = cursor.take_u8()?;
    let depth = cursor.take_u8()?;
    Ok(ChannelId::new(ieta, iphi, depth))
}

/// Little-endian read cursor over a byte slice.
struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn remaining(&self) -> usize {
        self.data.len()
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        let Some((head, rest)) = self.data.split_first_chunk::<N>() else {
            return Err(Error::InvalidFormat(format!(
                "truncated record at byte {}",
                self.pos
            )));
        };
        self.data = rest;
        self.pos += N;
        Ok(*head)
    }

    fn take_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.data.len() < len {
            return Err(Error::InvalidFormat(format!(
                "truncated record at byte {}",
                self.pos
            )));
        }
        let (head, rest) = self.data.split_at(len);
        self.data = rest;
        self.pos += len;
        Ok(head)
    }

    fn skip(&mut self, len: usize) -> Result<()> {
        self.take_bytes(len).map(|_| ())
    }

    fn take_u8(&mut self) -> Result<u8> {
        Ok(u8::from_le_bytes(self.take()?))
    }

    fn take_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.take()?))
    }

    fn take_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.take()?))
    }

    fn take_i16(&mut self) -> Result<i16> {
        Ok(i16::from_le_bytes(self.take()?))
    }

    fn take_i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.take()?))
    }

    fn take_f64(&mut self) -> Result<f64> {
        Ok(f64::from_le_bytes(self.take()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event() -> RawEvent {
        let mut event = RawEvent::new(EventCoordinates {
            run: 1,
            event: 2,
            lumi: 3,
            bunch: 4,
            orbit: 5,
            time: 6,
        });
        let mut reco = RecHitCollection::new("hbhereco");
        reco.hits.push(RecHit::new(ChannelId::new(-5, 3, 1), 7.5, 0.25));
        event.rec_hits.push(reco);
        let samples = [QieSample::new(12, 0, true, false); 10];
        event
            .digis
            .push(RawPulse::new(ChannelId::new(-5, 3, 1), &samples).unwrap());
        event
    }

    #[test]
    fn test_encode_parse_roundtrip() {
        let event = sample_event();
        let mut bytes = Vec::new();
        encode_event(&event, &mut bytes).unwrap();

        let spans = discover_spans(&bytes).unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].offset, FRAME_SIZE);

        let parsed = parse_event(&bytes[spans[0].range()]).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn test_discover_spans_walks_multiple_records() {
        let mut bytes = Vec::new();
        encode_event(&sample_event(), &mut bytes).unwrap();
        let first_len = bytes.len();
        encode_event(&sample_event(), &mut bytes).unwrap();

        let spans = discover_spans(&bytes).unwrap();
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[1].offset, first_len + FRAME_SIZE);
        assert_eq!(spans[0].len, spans[1].len);
    }

    #[test]
    fn test_discover_spans_empty_input() {
        assert!(discover_spans(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_discover_spans_rejects_bad_magic() {
        let mut bytes = Vec::new();
        encode_event(&sample_event(), &mut bytes).unwrap();
        bytes[0] ^= 0xFF;
        let err = discover_spans(&bytes).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)));
    }

    #[test]
    fn test_discover_spans_rejects_truncated_payload() {
        let mut bytes = Vec::new();
        encode_event(&sample_event(), &mut bytes).unwrap();
        bytes.truncate(bytes.len() - 3);
        let err = discover_spans(&bytes).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)));
    }

    #[test]
    fn test_parse_rejects_trailing_bytes() {
        let event = sample_event();
        let mut bytes = Vec::new();
        encode_event(&event, &mut bytes).unwrap();
        let spans = discover_spans(&bytes).unwrap();

        let mut payload = bytes[spans[0].range()].to_vec();
        payload.push(0);
        let err = parse_event(&payload).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)));
    }

    #[test]
    fn test_parse_rejects_truncated_digi() {
        let event = sample_event();
        let mut bytes = Vec::new();
        encode_event(&event, &mut bytes).unwrap();
        let spans = discover_spans(&bytes).unwrap();

        let payload = &bytes[spans[0].range()];
        let err = parse_event(&payload[..payload.len() - 5]).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)));
    }

    #[test]
    fn test_parse_rejects_oversized_hit_count() {
        let mut payload = Vec::new();
        for value in [1i64, 2, 3, 4, 5, 6] {
            payload.extend_from_slice(&value.to_le_bytes());
        }
        payload.extend_from_slice(&1u16.to_le_bytes()); // one collection
        payload.extend_from_slice(&0u16.to_le_bytes()); // empty name
        payload.extend_from_slice(&u32::MAX.to_le_bytes());

        let err = parse_event(&payload).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)));
    }

    #[test]
    fn test_parse_rejects_oversized_digi_count() {
        let mut payload = Vec::new();
        for value in [1i64, 2, 3, 4, 5, 6] {
            payload.extend_from_slice(&value.to_le_bytes());
        }
        payload.extend_from_slice(&0u16.to_le_bytes()); // no collections
        payload.extend_from_slice(&u32::MAX.to_le_bytes());

        let err = parse_event(&payload).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)));
    }

    #[test]
    fn test_empty_event_roundtrip() {
        let event = RawEvent::new(EventCoordinates::default());
        let mut bytes = Vec::new();
        encode_event(&event, &mut bytes).unwrap();
        let spans = discover_spans(&bytes).unwrap();
        let parsed = parse_event(&bytes[spans[0].range()]).unwrap();
        assert!(parsed.rec_hits.is_empty());
        assert!(parsed.digis.is_empty());
    }
}
