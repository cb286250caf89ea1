//! Channel-to-position index over a reconstructed-hit collection.

use std::collections::HashMap;

use rusthcal_core::channel::ChannelId;
use rusthcal_core::event::RecHit;

/// Maps a channel id to a hit's position in the collection the index was
/// built from.
///
/// Built fresh once per event and replaced at the next. If a channel id
/// occurs more than once in the input, the later occurrence's position wins
/// (last-write-wins); the input's uniqueness is not verified. No pipeline
/// stage consumes the index today; it is kept as a query facility.
#[derive(Debug, Clone, Default)]
pub struct RecHitIndex {
    positions: HashMap<ChannelId, usize>,
}

impl RecHitIndex {
    /// Builds the index over a hit collection.
    #[must_use]
    pub fn build(hits: &[RecHit]) -> Self {
        let mut positions = HashMap::with_capacity(hits.len());
        for (position, hit) in hits.iter().enumerate() {
            positions.insert(hit.id, position);
        }
        Self { positions }
    }

    /// Position of a channel's hit, if present.
    #[must_use]
    pub fn position(&self, id: ChannelId) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    /// Returns true if the channel has an indexed hit.
    #[must_use]
    pub fn contains(&self, id: ChannelId) -> bool {
        self.positions.contains_key(&id)
    }

    /// Number of indexed channels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Returns true if the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(ieta: i16, iphi: u8, depth: u8) -> RecHit {
        RecHit::new(ChannelId::new(ieta, iphi, depth), 1.0, 0.0)
    }

    #[test]
    fn test_build_and_lookup() {
        let hits = vec![hit(1, 1, 1), hit(2, 1, 1), hit(-3, 40, 2)];
        let index = RecHitIndex::build(&hits);

        assert_eq!(index.len(), 3);
        assert_eq!(index.position(ChannelId::new(2, 1, 1)), Some(1));
        assert_eq!(index.position(ChannelId::new(-3, 40, 2)), Some(2));
        assert!(index.position(ChannelId::new(9, 9, 1)).is_none());
        assert!(index.contains(ChannelId::new(1, 1, 1)));
    }

    #[test]
    fn test_duplicate_id_last_write_wins() {
        let hits = vec![hit(5, 5, 1), hit(6, 6, 1), hit(5, 5, 1)];
        let index = RecHitIndex::build(&hits);

        assert_eq!(index.len(), 2);
        assert_eq!(index.position(ChannelId::new(5, 5, 1)), Some(2));
    }

    #[test]
    fn test_empty_collection() {
        let index = RecHitIndex::build(&[]);
        assert!(index.is_empty());
        assert_eq!(index.len(), 0);
    }
}
