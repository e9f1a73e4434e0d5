use indexmap::IndexMap;

use crate::handler::Handler;

/// A single in-flight request awaiting a response.
pub(crate) struct PendingEntry {
    pub handler_key: u64,
    pub ack_sequence: u64,
    pub handler: Box<dyn Handler>,
}

/// Dual-indexed registry of in-flight requests, per `spec.md` §3/§9: keyed by
/// `handler_key` for cancellation and duplicate detection, with the map's own
/// insertion order giving the FIFO tie-break required when two entries share an
/// `ack_sequence`. `IndexMap` (already part of the teacher's dependency graph, used in
/// both `t51core` and `neutronium` for similar insertion-order-preserving lookups)
/// gives O(1) keyed access and stable iteration order in a single structure, so this
/// doesn't need to be two parallel maps.
pub(crate) struct PendingTable {
    entries: IndexMap<u64, PendingEntry>,
}

impl PendingTable {
    pub(crate) fn new() -> PendingTable {
        PendingTable { entries: IndexMap::new() }
    }

    pub(crate) fn contains_key(&self, handler_key: u64) -> bool {
        self.entries.contains_key(&handler_key)
    }

    /// Returns `false` without storing anything if `handler_key` is already present,
    /// per `spec.md` §4.E.
    pub(crate) fn insert(&mut self, handler_key: u64, ack_sequence: u64, handler: Box<dyn Handler>) -> bool {
        if self.entries.contains_key(&handler_key) {
            return false;
        }
        self.entries.insert(handler_key, PendingEntry { handler_key, ack_sequence, handler });
        true
    }

    /// Returns `true` iff the key was present and is now removed.
    pub(crate) fn remove(&mut self, handler_key: u64) -> bool {
        self.entries.shift_remove(&handler_key).is_some()
    }

    /// Remove and return the oldest (FIFO) entry whose `ack_sequence` matches.
    pub(crate) fn take_by_ack_sequence(&mut self, ack_sequence: u64) -> Option<PendingEntry> {
        let key = self
            .entries
            .iter()
            .find(|(_, entry)| entry.ack_sequence == ack_sequence)
            .map(|(key, _)| *key)?;
        self.entries.shift_remove(&key)
    }

    /// Remove and return the oldest pending entry overall (FIFO head). Used for the
    /// no-`ack_sequence` dispatch fallback (`spec.md` §4.E / §9 Open Question, resolved
    /// to "oldest pending handler").
    pub(crate) fn take_oldest(&mut self) -> Option<PendingEntry> {
        self.entries.shift_remove_index(0).map(|(_, entry)| entry)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drain every still-pending entry, oldest first, for fatal-error/shutdown dispatch.
    pub(crate) fn drain(&mut self) -> Vec<PendingEntry> {
        self.entries.drain(..).map(|(_, entry)| entry).collect()
    }
}
