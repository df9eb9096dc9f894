//! Hierarchy index: ordered note ids per outline.
//!
//! # Responsibility
//! - Keep each outline's ordered child list and an O(1) note -> location map.
//! - Walk the section tree that note depths encode over that order.
//! - Detect divergence from the record store and rebuild from it on demand.
//!
//! # Invariants
//! - Child lists hold each note id at most once, in display order.
//! - `locations[note] == (outline, i)` iff `children[outline][i] == note`.
//! - Child enumeration is O(children); position lookup is O(1).

use crate::model::{Note, NoteId, OutlineId};
use crate::repo::store::RecordStore;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Where one note sits inside its outline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location {
    pub outline_id: OutlineId,
    pub position: usize,
}

/// Inconsistency between the index and the record store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityIssue {
    #[error("outline {0} has no child list")]
    MissingOutline(OutlineId),
    #[error("child list for unknown outline {0}")]
    UnknownOutline(OutlineId),
    #[error("outline {outline_id} lists missing note {note_id}")]
    DanglingChild {
        outline_id: OutlineId,
        note_id: NoteId,
    },
    #[error("outline {outline_id} lists note {note_id} more than once")]
    DuplicateChild {
        outline_id: OutlineId,
        note_id: NoteId,
    },
    #[error("note {note_id} indexed under {indexed} but owned by {recorded}")]
    OwnerMismatch {
        note_id: NoteId,
        indexed: OutlineId,
        recorded: OutlineId,
    },
    #[error("note {note_id} indexed at {indexed} but recorded at {recorded}")]
    PositionMismatch {
        note_id: NoteId,
        indexed: usize,
        recorded: usize,
    },
    #[error("note {0} has a stale location entry")]
    StaleLocation(NoteId),
    #[error("note {0} is not indexed")]
    UnindexedNote(NoteId),
}

/// Parent/child ordering structure for notes within outlines.
#[derive(Debug, Clone, Default)]
pub struct HierarchyIndex {
    children: HashMap<OutlineId, Vec<NoteId>>,
    locations: HashMap<NoteId, Location>,
}

impl HierarchyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the index from note records, ordered by stored position then id.
    ///
    /// Notes whose outline is missing are left out; the caller decides what
    /// to do with them.
    pub fn rebuild(store: &RecordStore) -> Self {
        let mut index = Self::new();
        for outline in store.outlines() {
            index.add_outline(outline.id);
        }

        let mut notes: Vec<&Note> = store.notes().collect();
        notes.sort_by(|a, b| {
            a.outline_id
                .cmp(&b.outline_id)
                .then(a.position.cmp(&b.position))
                .then(a.id.cmp(&b.id))
        });
        for note in notes {
            if let Some(children) = index.children.get_mut(&note.outline_id) {
                children.push(note.id);
            }
        }

        let outline_ids: Vec<OutlineId> = index.children.keys().copied().collect();
        for outline_id in outline_ids {
            index.refresh_locations(outline_id, 0);
        }
        index
    }

    pub fn contains_outline(&self, outline_id: OutlineId) -> bool {
        self.children.contains_key(&outline_id)
    }

    pub fn children_of(&self, outline_id: OutlineId) -> Option<&[NoteId]> {
        self.children.get(&outline_id).map(Vec::as_slice)
    }

    pub fn child_count(&self, outline_id: OutlineId) -> usize {
        self.children.get(&outline_id).map_or(0, Vec::len)
    }

    pub fn position_of(&self, note_id: NoteId) -> Option<usize> {
        self.locations.get(&note_id).map(|location| location.position)
    }

    pub fn location_of(&self, note_id: NoteId) -> Option<Location> {
        self.locations.get(&note_id).copied()
    }

    /// Children of `outline_id` from index `start` on.
    pub(crate) fn tail(&self, outline_id: OutlineId, start: usize) -> &[NoteId] {
        match self.children.get(&outline_id) {
            Some(children) => &children[start.min(children.len())..],
            None => &[],
        }
    }

    /// `note_id` followed by its descendants: the run of deeper notes
    /// directly after it.
    pub fn subtree(&self, store: &RecordStore, note_id: NoteId) -> Option<&[NoteId]> {
        let location = self.locations.get(&note_id)?;
        let children = self.children.get(&location.outline_id)?;
        let start = location.position;
        let depth = depth_of(store, note_id);
        let end = children
            .get(start + 1..)?
            .iter()
            .position(|id| depth_of(store, *id) <= depth)
            .map_or(children.len(), |offset| start + 1 + offset);
        Some(&children[start..end])
    }

    /// Nearest preceding note that is shallower than `note_id`.
    pub fn parent_of(&self, store: &RecordStore, note_id: NoteId) -> Option<NoteId> {
        let location = self.locations.get(&note_id)?;
        let children = self.children.get(&location.outline_id)?;
        let depth = depth_of(store, note_id);
        children
            .get(..location.position)?
            .iter()
            .rev()
            .copied()
            .find(|id| depth_of(store, *id) < depth)
    }

    /// Position of the closest same-depth note above `position`, unless a
    /// shallower note comes first.
    pub(crate) fn sibling_above(
        &self,
        store: &RecordStore,
        outline_id: OutlineId,
        position: usize,
    ) -> Option<usize> {
        let children = self.children.get(&outline_id)?;
        let depth = depth_of(store, *children.get(position)?);
        (0..position)
            .rev()
            .map(|index| (index, depth_of(store, children[index])))
            .find(|(_, current)| *current <= depth)
            .filter(|(_, current)| *current == depth)
            .map(|(index, _)| index)
    }

    /// Position of the closest same-depth note below `position`, unless a
    /// shallower note comes first.
    pub(crate) fn sibling_below(
        &self,
        store: &RecordStore,
        outline_id: OutlineId,
        position: usize,
    ) -> Option<usize> {
        let children = self.children.get(&outline_id)?;
        let depth = depth_of(store, *children.get(position)?);
        (position + 1..children.len())
            .map(|index| (index, depth_of(store, children[index])))
            .find(|(_, current)| *current <= depth)
            .filter(|(_, current)| *current == depth)
            .map(|(index, _)| index)
    }

    pub(crate) fn add_outline(&mut self, outline_id: OutlineId) {
        self.children.entry(outline_id).or_default();
    }

    /// Drops the outline and returns its former children in order.
    pub(crate) fn remove_outline(&mut self, outline_id: OutlineId) -> Vec<NoteId> {
        let removed = self.children.remove(&outline_id).unwrap_or_default();
        for note_id in &removed {
            self.locations.remove(note_id);
        }
        removed
    }

    /// Inserts `note_id` at `position` (clamped to the end) and shifts the tail.
    pub(crate) fn insert(&mut self, outline_id: OutlineId, note_id: NoteId, position: usize) {
        let children = self.children.entry(outline_id).or_default();
        let position = position.min(children.len());
        children.insert(position, note_id);
        self.refresh_locations(outline_id, position);
    }

    /// Removes `note_id` and re-compacts the remaining children.
    pub(crate) fn remove(&mut self, note_id: NoteId) -> Option<Location> {
        let location = self.locations.remove(&note_id)?;
        let children = self.children.get_mut(&location.outline_id)?;
        let position = if children.get(location.position) == Some(&note_id) {
            location.position
        } else {
            children.iter().position(|id| *id == note_id)?
        };
        children.remove(position);
        self.refresh_locations(location.outline_id, position);
        Some(Location {
            outline_id: location.outline_id,
            position,
        })
    }

    /// Replaces the child order; `new_order` must be a permutation of it.
    pub(crate) fn reorder(
        &mut self,
        outline_id: OutlineId,
        new_order: &[NoteId],
    ) -> Result<(), String> {
        let current = self
            .children
            .get(&outline_id)
            .ok_or_else(|| "outline is not indexed".to_string())?;
        if new_order.len() != current.len() {
            return Err(format!(
                "expected {} note ids, got {}",
                current.len(),
                new_order.len()
            ));
        }

        let expected: HashSet<&NoteId> = current.iter().collect();
        let mut seen = HashSet::with_capacity(new_order.len());
        for note_id in new_order {
            if !expected.contains(note_id) {
                return Err(format!("note {note_id} is not a child of this outline"));
            }
            if !seen.insert(note_id) {
                return Err(format!("note {note_id} appears more than once"));
            }
        }

        self.children.insert(outline_id, new_order.to_vec());
        self.refresh_locations(outline_id, 0);
        Ok(())
    }

    /// Compares the index with the store and lists every divergence.
    pub fn verify(&self, store: &RecordStore) -> Vec<IntegrityIssue> {
        let mut issues = Vec::new();

        for outline in store.outlines() {
            if !self.children.contains_key(&outline.id) {
                issues.push(IntegrityIssue::MissingOutline(outline.id));
            }
        }

        for (outline_id, children) in &self.children {
            if store.outline(*outline_id).is_none() {
                issues.push(IntegrityIssue::UnknownOutline(*outline_id));
            }

            let mut seen = HashSet::with_capacity(children.len());
            for (position, note_id) in children.iter().enumerate() {
                if !seen.insert(*note_id) {
                    issues.push(IntegrityIssue::DuplicateChild {
                        outline_id: *outline_id,
                        note_id: *note_id,
                    });
                    continue;
                }

                match store.note(*note_id) {
                    None => issues.push(IntegrityIssue::DanglingChild {
                        outline_id: *outline_id,
                        note_id: *note_id,
                    }),
                    Some(note) => {
                        if note.outline_id != *outline_id {
                            issues.push(IntegrityIssue::OwnerMismatch {
                                note_id: *note_id,
                                indexed: *outline_id,
                                recorded: note.outline_id,
                            });
                        }
                        if note.position != position {
                            issues.push(IntegrityIssue::PositionMismatch {
                                note_id: *note_id,
                                indexed: position,
                                recorded: note.position,
                            });
                        }
                    }
                }

                let expected = Location {
                    outline_id: *outline_id,
                    position,
                };
                if self.locations.get(note_id) != Some(&expected) {
                    issues.push(IntegrityIssue::StaleLocation(*note_id));
                }
            }
        }

        for note in store.notes() {
            if !self.locations.contains_key(&note.id) {
                issues.push(IntegrityIssue::UnindexedNote(note.id));
            }
        }

        issues
    }

    fn refresh_locations(&mut self, outline_id: OutlineId, start: usize) {
        if let Some(children) = self.children.get(&outline_id) {
            for (position, note_id) in children.iter().enumerate().skip(start) {
                self.locations.insert(
                    *note_id,
                    Location {
                        outline_id,
                        position,
                    },
                );
            }
        }
    }
}

fn depth_of(store: &RecordStore, note_id: NoteId) -> u16 {
    store.note(note_id).map_or(0, |note| note.depth)
}

#[cfg(test)]
mod tests {
    use super::{HierarchyIndex, IntegrityIssue, Location};
    use crate::model::{NoteDraft, NoteId, OutlineDraft, OutlineId, ValidationLimits};
    use crate::repo::store::RecordStore;

    fn ids(count: usize) -> Vec<NoteId> {
        (0..count).map(|_| NoteId::generate()).collect()
    }

    fn positions(index: &HierarchyIndex, outline_id: OutlineId) -> Vec<usize> {
        index
            .children_of(outline_id)
            .expect("outline should be indexed")
            .iter()
            .map(|id| index.position_of(*id).expect("child should be located"))
            .collect()
    }

    #[test]
    fn insert_and_remove_keep_positions_dense() {
        let outline_id = OutlineId::generate();
        let notes = ids(4);
        let mut index = HierarchyIndex::new();
        index.add_outline(outline_id);
        for note_id in &notes[..3] {
            index.insert(outline_id, *note_id, usize::MAX);
        }
        index.insert(outline_id, notes[3], 1);

        assert_eq!(
            index.children_of(outline_id).expect("children"),
            &[notes[0], notes[3], notes[1], notes[2]]
        );
        assert_eq!(positions(&index, outline_id), vec![0, 1, 2, 3]);

        let removed = index.remove(notes[3]).expect("note should be removed");
        assert_eq!(
            removed,
            Location {
                outline_id,
                position: 1
            }
        );
        assert_eq!(positions(&index, outline_id), vec![0, 1, 2]);
        assert_eq!(index.position_of(notes[3]), None);
    }

    #[test]
    fn reorder_rejects_non_permutations() {
        let outline_id = OutlineId::generate();
        let notes = ids(3);
        let mut index = HierarchyIndex::new();
        index.add_outline(outline_id);
        for note_id in &notes {
            index.insert(outline_id, *note_id, usize::MAX);
        }

        assert!(index.reorder(outline_id, &notes[..2]).is_err());
        assert!(index
            .reorder(outline_id, &[notes[0], notes[0], notes[1]])
            .is_err());
        assert!(index
            .reorder(outline_id, &[notes[0], notes[1], NoteId::generate()])
            .is_err());
        assert_eq!(index.children_of(outline_id).expect("children"), &notes[..]);

        index
            .reorder(outline_id, &[notes[2], notes[0], notes[1]])
            .expect("permutation should be accepted");
        assert_eq!(index.position_of(notes[2]), Some(0));
        assert_eq!(index.position_of(notes[1]), Some(2));
    }

    #[test]
    fn remove_outline_drops_child_locations() {
        let outline_id = OutlineId::generate();
        let notes = ids(2);
        let mut index = HierarchyIndex::new();
        index.add_outline(outline_id);
        for note_id in &notes {
            index.insert(outline_id, *note_id, usize::MAX);
        }

        assert_eq!(index.remove_outline(outline_id), notes);
        assert!(!index.contains_outline(outline_id));
        assert_eq!(index.location_of(notes[0]), None);
    }

    #[test]
    fn verify_detects_divergence_and_rebuild_repairs_it() {
        let limits = ValidationLimits::default();
        let mut store = RecordStore::new();
        let outline = OutlineDraft::new("Doc")
            .into_record(OutlineId::generate(), 1, &limits)
            .expect("outline");
        let outline_id = outline.id;
        store.insert_outline(outline);
        let first = NoteDraft::new(outline_id, "a")
            .into_record(NoteId::generate(), 0, 1)
            .expect("note");
        let second = NoteDraft::new(outline_id, "b")
            .into_record(NoteId::generate(), 1, 1)
            .expect("note");
        let (first_id, second_id) = (first.id, second.id);
        store.insert_note(first);
        store.insert_note(second);

        let mut index = HierarchyIndex::new();
        index.add_outline(outline_id);
        index.insert(outline_id, second_id, 0);
        assert!(index
            .verify(&store)
            .contains(&IntegrityIssue::UnindexedNote(first_id)));

        let rebuilt = HierarchyIndex::rebuild(&store);
        assert!(rebuilt.verify(&store).is_empty());
        assert_eq!(
            rebuilt.children_of(outline_id).expect("children"),
            &[first_id, second_id]
        );
    }

    fn nested(depths: &[u16]) -> (RecordStore, HierarchyIndex, OutlineId, Vec<NoteId>) {
        let mut store = RecordStore::new();
        let outline = OutlineDraft::new("Doc")
            .into_record(OutlineId::generate(), 1, &ValidationLimits::default())
            .expect("outline");
        let outline_id = outline.id;
        store.insert_outline(outline);
        let mut notes = Vec::new();
        for (position, depth) in depths.iter().enumerate() {
            let note = NoteDraft::new(outline_id, "n")
                .with_depth(*depth)
                .into_record(NoteId::generate(), position, 1)
                .expect("note");
            notes.push(note.id);
            store.insert_note(note);
        }
        let index = HierarchyIndex::rebuild(&store);
        (store, index, outline_id, notes)
    }

    #[test]
    fn subtree_is_the_run_of_deeper_notes() {
        let (store, index, _, n) = nested(&[0, 1, 2, 1, 0, 1]);
        assert_eq!(index.subtree(&store, n[0]).expect("subtree"), &n[0..4]);
        assert_eq!(index.subtree(&store, n[1]).expect("subtree"), &n[1..3]);
        assert_eq!(index.subtree(&store, n[3]).expect("subtree"), &n[3..4]);
        assert_eq!(index.subtree(&store, n[5]).expect("subtree"), &n[5..]);

        assert_eq!(index.parent_of(&store, n[2]), Some(n[1]));
        assert_eq!(index.parent_of(&store, n[3]), Some(n[0]));
        assert_eq!(index.parent_of(&store, n[4]), None);
    }

    #[test]
    fn siblings_stop_at_a_shallower_note() {
        let (store, index, outline_id, _) = nested(&[0, 1, 2, 1, 0, 1]);
        assert_eq!(index.sibling_above(&store, outline_id, 3), Some(1));
        assert_eq!(index.sibling_below(&store, outline_id, 1), Some(3));
        assert_eq!(index.sibling_below(&store, outline_id, 3), None);
        assert_eq!(index.sibling_above(&store, outline_id, 5), None);
        assert_eq!(index.sibling_below(&store, outline_id, 0), Some(4));
        assert_eq!(index.sibling_above(&store, outline_id, 0), None);
    }
}
