//! Partitioned queue storage
//!
//! [`BucketIndex`] owns every live queue entry, partitioned by
//! [`BucketKey`]. The party-id lookup holds only keys, never a second copy
//! of an entry. Within a bucket, entries are kept in non-decreasing
//! `enqueued_at` order so callers can iterate oldest first without sorting.

use crate::error::{MatchmakingError, Result};
use crate::types::{BucketKey, PartyId, QueueEntry};
use std::collections::HashMap;

/// In-memory index of all queued parties
#[derive(Debug, Default)]
pub struct BucketIndex {
    /// Bucket storage; buckets are dropped as soon as they empty
    buckets: HashMap<BucketKey, Vec<QueueEntry>>,
    /// Fast lookup: party id -> bucket key
    party_to_bucket: HashMap<PartyId, BucketKey>,
}

impl BucketIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry into the bucket selected by its key.
    ///
    /// Fails with `DuplicateParty` if the party is already present anywhere
    /// in the index.
    pub fn insert(&mut self, entry: QueueEntry) -> Result<()> {
        if self.party_to_bucket.contains_key(&entry.party_id) {
            return Err(MatchmakingError::DuplicateParty {
                party_id: entry.party_id,
            }
            .into());
        }

        let key = entry.bucket_key();
        self.party_to_bucket.insert(entry.party_id.clone(), key.clone());

        let entries = self.buckets.entry(key).or_default();
        // Entries usually arrive in time order; a backdated enqueue still
        // lands at its sorted position.
        let pos = entries.partition_point(|e| {
            (e.enqueued_at, e.party_id.as_str()) <= (entry.enqueued_at, entry.party_id.as_str())
        });
        entries.insert(pos, entry);
        Ok(())
    }

    /// Remove the entry with this party id, if present
    pub fn remove(&mut self, party_id: &str) -> Option<QueueEntry> {
        let key = self.party_to_bucket.remove(party_id)?;
        let entries = self.buckets.get_mut(&key)?;

        let pos = entries.iter().position(|e| e.party_id == party_id)?;
        let removed = entries.remove(pos);

        if entries.is_empty() {
            self.buckets.remove(&key);
        }
        Some(removed)
    }

    /// Remove several parties at once; used when a match is committed.
    ///
    /// Parties not present are silently skipped.
    pub fn remove_many(&mut self, party_ids: &[PartyId]) -> Vec<QueueEntry> {
        party_ids
            .iter()
            .filter_map(|id| self.remove(id))
            .collect()
    }

    /// Whether a party is live anywhere in the index
    pub fn contains(&self, party_id: &str) -> bool {
        self.party_to_bucket.contains_key(party_id)
    }

    /// Borrow the live entry for a party, if present
    pub fn get(&self, party_id: &str) -> Option<&QueueEntry> {
        let key = self.party_to_bucket.get(party_id)?;
        self.buckets
            .get(key)?
            .iter()
            .find(|e| e.party_id == party_id)
    }

    /// Entries of one bucket, oldest first. Empty slice if the bucket
    /// does not exist.
    pub fn bucket_view(&self, key: &BucketKey) -> &[QueueEntry] {
        self.buckets.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Iterate every non-empty bucket with its oldest-first view
    pub fn all_buckets(&self) -> impl Iterator<Item = (&BucketKey, &[QueueEntry])> {
        self.buckets.iter().map(|(key, entries)| (key, entries.as_slice()))
    }

    /// Keys of every non-empty bucket
    pub fn keys(&self) -> Vec<BucketKey> {
        self.buckets.keys().cloned().collect()
    }

    /// Total number of live entries
    pub fn len(&self) -> usize {
        self.party_to_bucket.len()
    }

    pub fn is_empty(&self) -> bool {
        self.party_to_bucket.is_empty()
    }

    /// Number of entries in one bucket
    pub fn size_of(&self, key: &BucketKey) -> usize {
        self.buckets.get(key).map_or(0, Vec::len)
    }

    /// Depth of every non-empty bucket, keyed by its display form
    pub fn sizes_by_key(&self) -> HashMap<String, usize> {
        self.buckets
            .iter()
            .map(|(key, entries)| (key.to_string(), entries.len()))
            .collect()
    }
}
