//! Identity & metadata store.
//!
//! # Responsibility
//! - Own the canonical outline and note records.
//! - Answer identity lookups for both kinds.
//!
//! # Invariants
//! - A UUID is used by at most one record, across both kinds.
//! - A removed record's UUID is retired and never accepted again.
//! - The store never decides ordering; positions are written by the
//!   repository state after the hierarchy index changes.

use crate::model::{EntityId, Note, NoteId, Outline, OutlineId, Record};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Canonical record storage.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    outlines: HashMap<OutlineId, Outline>,
    notes: HashMap<NoteId, Note>,
    retired: HashSet<Uuid>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outline(&self, id: OutlineId) -> Option<&Outline> {
        self.outlines.get(&id)
    }

    pub fn note(&self, id: NoteId) -> Option<&Note> {
        self.notes.get(&id)
    }

    /// Loads a snapshot of either kind.
    pub fn record(&self, id: EntityId) -> Option<Record> {
        match id {
            EntityId::Outline(id) => self.outline(id).cloned().map(Record::Outline),
            EntityId::Note(id) => self.note(id).cloned().map(Record::Note),
        }
    }

    pub fn contains(&self, id: EntityId) -> bool {
        match id {
            EntityId::Outline(id) => self.outlines.contains_key(&id),
            EntityId::Note(id) => self.notes.contains_key(&id),
        }
    }

    /// Returns whether the raw UUID is held by a record of either kind or
    /// belonged to a removed one.
    pub fn is_taken(&self, id: EntityId) -> bool {
        let uuid = id.as_uuid();
        self.outlines.contains_key(&OutlineId::from_uuid(uuid))
            || self.notes.contains_key(&NoteId::from_uuid(uuid))
            || self.retired.contains(&uuid)
    }

    pub fn outlines(&self) -> impl Iterator<Item = &Outline> {
        self.outlines.values()
    }

    pub fn notes(&self) -> impl Iterator<Item = &Note> {
        self.notes.values()
    }

    pub fn outline_count(&self) -> usize {
        self.outlines.len()
    }

    pub fn note_count(&self) -> usize {
        self.notes.len()
    }

    pub(crate) fn outline_mut(&mut self, id: OutlineId) -> Option<&mut Outline> {
        self.outlines.get_mut(&id)
    }

    pub(crate) fn note_mut(&mut self, id: NoteId) -> Option<&mut Note> {
        self.notes.get_mut(&id)
    }

    pub(crate) fn insert_outline(&mut self, outline: Outline) {
        self.outlines.insert(outline.id, outline);
    }

    pub(crate) fn insert_note(&mut self, note: Note) {
        self.notes.insert(note.id, note);
    }

    pub(crate) fn remove_outline(&mut self, id: OutlineId) -> Option<Outline> {
        let removed = self.outlines.remove(&id)?;
        self.retired.insert(id.as_uuid());
        Some(removed)
    }

    pub(crate) fn remove_note(&mut self, id: NoteId) -> Option<Note> {
        let removed = self.notes.remove(&id)?;
        self.retired.insert(id.as_uuid());
        Some(removed)
    }

    /// Writes dense positions `start..` for `ids` in order.
    pub(crate) fn resequence(&mut self, ids: &[NoteId], start: usize) {
        for (offset, id) in ids.iter().enumerate() {
            if let Some(note) = self.notes.get_mut(id) {
                note.position = start + offset;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::RecordStore;
    use crate::model::{EntityId, NoteDraft, NoteId, OutlineDraft, OutlineId, ValidationLimits};

    #[test]
    fn removed_ids_stay_taken_across_kinds() {
        let mut store = RecordStore::new();
        let outline = OutlineDraft::new("Doc")
            .into_record(OutlineId::generate(), 1, &ValidationLimits::default())
            .expect("outline");
        let note = NoteDraft::new(outline.id, "a")
            .into_record(NoteId::generate(), 0, 1)
            .expect("note");
        let (outline_id, note_id) = (outline.id, note.id);
        store.insert_outline(outline);
        store.insert_note(note);

        assert!(store.remove_note(note_id).is_some());
        assert!(store.remove_outline(outline_id).is_some());
        assert!(store.remove_note(note_id).is_none());

        assert!(!store.contains(EntityId::Note(note_id)));
        assert!(store.is_taken(EntityId::Note(note_id)));
        assert!(store.is_taken(EntityId::Outline(outline_id)));
        // Same UUID, other kind.
        assert!(store.is_taken(EntityId::Note(NoteId::from_uuid(outline_id.as_uuid()))));
    }
}
