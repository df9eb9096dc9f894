//! Generation-tagged projection memo.
//!
//! # Invariants
//! - An entry is served only when its generation equals the caller's.
//! - Change events evict every entry the change can affect; whole-table
//!   entries are always evicted.
//! - Entries current before an event that the event does not affect are
//!   re-tagged with its sequence and stay servable.

use crate::events::{Change, ChangeEvent, ChangeSubscriber};
use crate::model::{EntityKind, OutlineId};
use crate::projection::{Projection, SortField};
use log::trace;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Request shape a projection is memoized under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProjectionKey {
    pub kind: EntityKind,
    pub field: SortField,
    pub ascending: bool,
    /// Set for notes-in-outline tables.
    pub outline_id: Option<OutlineId>,
}

#[derive(Default)]
pub struct ProjectionCache {
    entries: Mutex<HashMap<ProjectionKey, (u64, Arc<Projection>)>>,
}

impl ProjectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &ProjectionKey, generation: u64) -> Option<Arc<Projection>> {
        let entries = self.entries.lock();
        match entries.get(key) {
            Some((tagged, projection)) if *tagged == generation => Some(Arc::clone(projection)),
            _ => None,
        }
    }

    pub fn insert(&self, key: ProjectionKey, generation: u64, projection: Arc<Projection>) {
        let mut entries = self.entries.lock();
        // Never replace a newer entry with an older one.
        if let Some((tagged, _)) = entries.get(&key) {
            if *tagged > generation {
                return;
            }
        }
        entries.insert(key, (generation, projection));
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Drops what `event` can affect and advances the survivors to its
    /// sequence. Returns the number of dropped entries.
    fn evict(&self, event: &ChangeEvent) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        if matches!(event.change, Change::IndexRebuilt) {
            entries.clear();
            return before;
        }
        let affected = event.change.affected_outlines();
        let sequence = event.sequence;
        entries.retain(|key, (generation, _)| {
            let unaffected = match key.outline_id {
                Some(outline_id) => !affected.contains(&outline_id),
                None => false,
            };
            // Entries older than the previous generation missed an event.
            if !unaffected || *generation + 1 < sequence {
                return false;
            }
            *generation = (*generation).max(sequence);
            true
        });
        before - entries.len()
    }
}

impl ChangeSubscriber for ProjectionCache {
    fn on_change(&self, event: &ChangeEvent) {
        let evicted = self.evict(event);
        trace!(
            "event=projection_evict module=projection status=ok sequence={} evicted={}",
            event.sequence,
            evicted
        );
    }
}
