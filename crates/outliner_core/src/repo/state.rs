//! Repository state and the single-writer mutation protocol.
//!
//! # Responsibility
//! - Apply create/update/delete/move/reorder commands to the record store
//!   and hierarchy index together.
//! - Apply the outline editor's subtree moves and depth changes.
//! - Describe every applied command as one [`Change`].
//!
//! # Invariants
//! - Every command validates fully before touching state (all-or-nothing).
//! - Note positions in the store always equal their index positions.
//! - Modification stamps issued by this state strictly increase.
//! - `generation` increments once per applied command.

use crate::error::{RepositoryError, RepositoryResult};
use crate::events::Change;
use crate::model::{
    EntityId, Note, NoteDraft, NoteId, NotePatch, OutlineDraft, OutlineId, OutlinePatch,
    UpdatedField, ValidationLimits, MAX_NOTE_DEPTH,
};
use crate::repo::hierarchy::{HierarchyIndex, IntegrityIssue, Location};
use crate::repo::store::RecordStore;

/// Relative targets for the outline editor's move commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shift {
    Up,
    Down,
    First,
    Last,
}

/// Depth change applied to a note and its descendants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nesting {
    /// One level shallower.
    Promote,
    /// One level deeper.
    Demote,
}

/// Records, index and bookkeeping guarded by the repository lock.
#[derive(Debug, Clone, Default)]
pub struct RepositoryState {
    store: RecordStore,
    index: HierarchyIndex,
    generation: u64,
    last_stamp: i64,
}

impl RepositoryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn index(&self) -> &HierarchyIndex {
        &self.index
    }

    /// Number of applied commands so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn check_integrity(&self) -> Vec<IntegrityIssue> {
        self.index.verify(&self.store)
    }

    pub(crate) fn create_outline(
        &mut self,
        draft: OutlineDraft,
        limits: &ValidationLimits,
        now: i64,
    ) -> RepositoryResult<(OutlineId, Change)> {
        let id = match draft.restore {
            Some(restore) => {
                self.ensure_free(EntityId::Outline(restore.id))?;
                restore.id
            }
            None => self.fresh_outline_id(),
        };
        let stamp = self.peek_stamp(now);
        let outline = draft.into_record(id, stamp, limits)?;

        self.commit_stamp(outline.modified_at);
        self.store.insert_outline(outline);
        self.index.add_outline(id);
        Ok((
            id,
            self.applied(Change::Created {
                entity: EntityId::Outline(id),
                outline_id: id,
            }),
        ))
    }

    pub(crate) fn create_note(
        &mut self,
        draft: NoteDraft,
        now: i64,
    ) -> RepositoryResult<(NoteId, Change)> {
        let outline_id = draft.outline_id;
        self.require_outline(outline_id)?;
        let len = self.index.child_count(outline_id);
        let position = match draft.position {
            Some(position) if position > len => {
                return Err(RepositoryError::InvalidPosition {
                    outline_id,
                    position,
                    max: len,
                });
            }
            Some(position) => position,
            None => len,
        };
        let restored = draft.restore.is_some();
        let id = match draft.restore {
            Some(restore) => {
                self.ensure_free(EntityId::Note(restore.id))?;
                restore.id
            }
            None => self.fresh_note_id(),
        };
        let stamp = self.peek_stamp(now);
        let note = draft.into_record(id, position, stamp)?;

        self.commit_stamp(note.modified_at);
        self.store.insert_note(note);
        self.index.insert(outline_id, id, position);
        self.resequence(outline_id, position);
        if !restored {
            self.touch_outline(outline_id, stamp);
        }
        Ok((
            id,
            self.applied(Change::Created {
                entity: EntityId::Note(id),
                outline_id,
            }),
        ))
    }

    pub(crate) fn update_outline(
        &mut self,
        id: OutlineId,
        patch: OutlinePatch,
        limits: &ValidationLimits,
        now: i64,
    ) -> RepositoryResult<Change> {
        self.require_outline(id)?;
        let patch = patch.normalized(limits)?;
        let stamp = self.next_stamp(now);
        let outline = self
            .store
            .outline_mut(id)
            .ok_or(RepositoryError::NotFound(EntityId::Outline(id)))?;
        let fields = patch.apply_to(outline);
        outline.touch(stamp);
        Ok(self.applied(Change::Updated {
            entity: EntityId::Outline(id),
            outline_id: id,
            fields,
        }))
    }

    pub(crate) fn update_note(
        &mut self,
        id: NoteId,
        patch: NotePatch,
        now: i64,
    ) -> RepositoryResult<Change> {
        let outline_id = self.require_note(id)?.outline_id;
        let patch = patch.normalized()?;
        let stamp = self.next_stamp(now);
        let note = self
            .store
            .note_mut(id)
            .ok_or(RepositoryError::NotFound(EntityId::Note(id)))?;
        let fields = patch.apply_to(note);
        note.touch(stamp);
        Ok(self.applied(Change::Updated {
            entity: EntityId::Note(id),
            outline_id,
            fields,
        }))
    }

    /// Deletes an outline together with every note it owns.
    pub(crate) fn delete_outline(&mut self, id: OutlineId) -> RepositoryResult<Change> {
        self.require_outline(id)?;
        let cascaded = self.index.remove_outline(id);
        for note_id in &cascaded {
            self.store.remove_note(*note_id);
        }
        self.store.remove_outline(id);
        Ok(self.applied(Change::Deleted {
            entity: EntityId::Outline(id),
            outline_id: id,
            cascaded,
        }))
    }

    pub(crate) fn delete_note(&mut self, id: NoteId, now: i64) -> RepositoryResult<Change> {
        self.require_note(id)?;
        let location = self
            .index
            .remove(id)
            .ok_or(RepositoryError::NotFound(EntityId::Note(id)))?;
        self.store.remove_note(id);
        self.resequence(location.outline_id, location.position);
        let stamp = self.next_stamp(now);
        self.touch_outline(location.outline_id, stamp);
        Ok(self.applied(Change::Deleted {
            entity: EntityId::Note(id),
            outline_id: location.outline_id,
            cascaded: Vec::new(),
        }))
    }

    /// Moves a note to `position` within `target`, possibly across outlines.
    ///
    /// Within the same outline the valid range is `0..len`; into another
    /// outline it is `0..=len`.
    pub(crate) fn move_note(
        &mut self,
        id: NoteId,
        target: OutlineId,
        position: usize,
        now: i64,
    ) -> RepositoryResult<Change> {
        self.require_note(id)?;
        self.require_outline(target)?;
        let from = self
            .index
            .location_of(id)
            .ok_or(RepositoryError::NotFound(EntityId::Note(id)))?;
        let target_len = self.index.child_count(target);
        let max = if from.outline_id == target {
            target_len.saturating_sub(1)
        } else {
            target_len
        };
        if position > max {
            return Err(RepositoryError::InvalidPosition {
                outline_id: target,
                position,
                max,
            });
        }

        self.index.remove(id);
        self.index.insert(target, id, position);
        if from.outline_id == target {
            self.resequence(target, from.position.min(position));
        } else {
            self.resequence(from.outline_id, from.position);
            self.resequence(target, position);
        }

        let stamp = self.next_stamp(now);
        if let Some(note) = self.store.note_mut(id) {
            note.outline_id = target;
            note.touch(stamp);
        }
        self.touch_outline(from.outline_id, stamp);
        if from.outline_id != target {
            self.touch_outline(target, stamp);
        }
        Ok(self.applied(Change::Moved {
            note_id: id,
            from,
            to: Location {
                outline_id: target,
                position,
            },
            carried: Vec::new(),
        }))
    }

    /// Moves a note together with its descendants past the adjacent sibling,
    /// or past every sibling for `First`/`Last`.
    ///
    /// Siblings are same-depth notes under the same parent. Returns `None`
    /// without applying anything when there is no sibling in that direction.
    pub(crate) fn shift_note(
        &mut self,
        id: NoteId,
        shift: Shift,
        now: i64,
    ) -> RepositoryResult<Option<Change>> {
        self.require_note(id)?;
        let from = self
            .index
            .location_of(id)
            .ok_or(RepositoryError::NotFound(EntityId::Note(id)))?;
        let outline_id = from.outline_id;
        let upward = matches!(shift, Shift::Up | Shift::First);

        let mut sibling = None;
        let mut cursor = from.position;
        loop {
            let next = if upward {
                self.index.sibling_above(&self.store, outline_id, cursor)
            } else {
                self.index.sibling_below(&self.store, outline_id, cursor)
            };
            let Some(next) = next else { break };
            sibling = Some(next);
            cursor = next;
            if matches!(shift, Shift::Up | Shift::Down) {
                break;
            }
        }
        let Some(sibling) = sibling else {
            return Ok(None);
        };

        let block = self.subtree_ids(id)?;
        let mut order = self
            .index
            .children_of(outline_id)
            .map(<[NoteId]>::to_vec)
            .unwrap_or_default();
        let insert_at = if upward {
            sibling
        } else {
            // The sibling's subtree ends after the block; drop the block's
            // width once it is cut out.
            let sibling_id = order
                .get(sibling)
                .copied()
                .ok_or(RepositoryError::NotFound(EntityId::Note(id)))?;
            let sibling_len = self.subtree_ids(sibling_id)?.len();
            sibling + sibling_len - block.len()
        };
        order.drain(from.position..from.position + block.len());
        let tail = order.split_off(insert_at);
        order.extend_from_slice(&block);
        order.extend(tail);
        self.index
            .reorder(outline_id, &order)
            .map_err(|reason| RepositoryError::InvalidPermutation { outline_id, reason })?;
        self.resequence(outline_id, from.position.min(insert_at));

        let stamp = self.next_stamp(now);
        if let Some(note) = self.store.note_mut(id) {
            note.touch(stamp);
        }
        self.touch_outline(outline_id, stamp);
        Ok(Some(self.applied(Change::Moved {
            note_id: id,
            from,
            to: Location {
                outline_id,
                position: insert_at,
            },
            carried: block[1..].to_vec(),
        })))
    }

    /// Promotes or demotes a note together with its descendants.
    ///
    /// Returns `None` when a promote hits depth 0 or a demote would push any
    /// note of the subtree past [`MAX_NOTE_DEPTH`].
    pub(crate) fn nest_note(
        &mut self,
        id: NoteId,
        nesting: Nesting,
        now: i64,
    ) -> RepositoryResult<Option<Change>> {
        let outline_id = self.require_note(id)?.outline_id;
        let subtree = self.subtree_ids(id)?;
        let depths: Vec<u16> = subtree
            .iter()
            .filter_map(|note_id| self.store.note(*note_id))
            .map(|note| note.depth)
            .collect();
        let allowed = match nesting {
            Nesting::Promote => depths.first().is_some_and(|depth| *depth > 0),
            Nesting::Demote => depths.iter().all(|depth| *depth < MAX_NOTE_DEPTH),
        };
        if !allowed {
            return Ok(None);
        }

        let stamp = self.next_stamp(now);
        for note_id in &subtree {
            if let Some(note) = self.store.note_mut(*note_id) {
                note.depth = match nesting {
                    Nesting::Promote => note.depth.saturating_sub(1),
                    Nesting::Demote => note.depth.saturating_add(1),
                };
            }
        }
        if let Some(note) = self.store.note_mut(id) {
            note.touch(stamp);
        }
        self.touch_outline(outline_id, stamp);
        Ok(Some(self.applied(Change::Updated {
            entity: EntityId::Note(id),
            outline_id,
            fields: vec![UpdatedField::Depth],
        })))
    }

    /// `id` followed by its descendants.
    pub(crate) fn subtree_ids(&self, id: NoteId) -> RepositoryResult<Vec<NoteId>> {
        self.index
            .subtree(&self.store, id)
            .map(<[NoteId]>::to_vec)
            .ok_or(RepositoryError::NotFound(EntityId::Note(id)))
    }

    pub(crate) fn reorder(
        &mut self,
        outline_id: OutlineId,
        new_order: &[NoteId],
        now: i64,
    ) -> RepositoryResult<Change> {
        self.require_outline(outline_id)?;
        self.index
            .reorder(outline_id, new_order)
            .map_err(|reason| RepositoryError::InvalidPermutation { outline_id, reason })?;
        self.resequence(outline_id, 0);
        let stamp = self.next_stamp(now);
        self.touch_outline(outline_id, stamp);
        Ok(self.applied(Change::Reordered { outline_id }))
    }

    /// Rebuilds the index from the store and re-sequences positions densely.
    ///
    /// Notes whose owning outline no longer exists are dropped; their ids
    /// are returned.
    pub(crate) fn rebuild_index(&mut self) -> (Vec<NoteId>, Change) {
        let orphans = self.repair();
        (orphans, self.applied(Change::IndexRebuilt))
    }

    /// Same as [`Self::rebuild_index`] but as part of the command that
    /// detected divergence, so no generation is consumed.
    pub(crate) fn repair(&mut self) -> Vec<NoteId> {
        let index = HierarchyIndex::rebuild(&self.store);
        let orphans: Vec<NoteId> = self
            .store
            .notes()
            .filter(|note| !index.contains_outline(note.outline_id))
            .map(|note| note.id)
            .collect();
        for note_id in &orphans {
            self.store.remove_note(*note_id);
        }

        self.index = index;
        let outline_ids: Vec<OutlineId> = self.store.outlines().map(|outline| outline.id).collect();
        for outline_id in outline_ids {
            self.resequence(outline_id, 0);
        }
        orphans
    }

    fn applied(&mut self, change: Change) -> Change {
        self.generation += 1;
        change
    }

    fn require_outline(&self, id: OutlineId) -> RepositoryResult<()> {
        if self.store.outline(id).is_none() {
            return Err(RepositoryError::NotFound(EntityId::Outline(id)));
        }
        Ok(())
    }

    fn require_note(&self, id: NoteId) -> RepositoryResult<&Note> {
        self.store
            .note(id)
            .ok_or(RepositoryError::NotFound(EntityId::Note(id)))
    }

    fn ensure_free(&self, id: EntityId) -> RepositoryResult<()> {
        if self.store.is_taken(id) {
            return Err(RepositoryError::DuplicateId(id));
        }
        Ok(())
    }

    fn fresh_outline_id(&self) -> OutlineId {
        loop {
            let id = OutlineId::generate();
            if !self.store.is_taken(EntityId::Outline(id)) {
                return id;
            }
        }
    }

    fn fresh_note_id(&self) -> NoteId {
        loop {
            let id = NoteId::generate();
            if !self.store.is_taken(EntityId::Note(id)) {
                return id;
            }
        }
    }

    fn peek_stamp(&self, now: i64) -> i64 {
        if now > self.last_stamp {
            now
        } else {
            self.last_stamp + 1
        }
    }

    fn commit_stamp(&mut self, stamp: i64) {
        self.last_stamp = self.last_stamp.max(stamp);
    }

    fn next_stamp(&mut self, now: i64) -> i64 {
        let stamp = self.peek_stamp(now);
        self.commit_stamp(stamp);
        stamp
    }

    fn touch_outline(&mut self, id: OutlineId, stamp: i64) {
        if let Some(outline) = self.store.outline_mut(id) {
            outline.touch(stamp);
        }
    }

    fn resequence(&mut self, outline_id: OutlineId, start: usize) {
        let tail = self.index.tail(outline_id, start);
        self.store.resequence(tail, start);
    }
}

#[cfg(test)]
mod tests {
    use super::{Nesting, RepositoryState, Shift};
    use crate::error::RepositoryError;
    use crate::events::Change;
    use crate::model::{
        EntityId, NoteDraft, NoteId, OutlineDraft, OutlineId, OutlinePatch, UpdatedField,
        ValidationLimits, MAX_NOTE_DEPTH,
    };

    fn outline(state: &mut RepositoryState, title: &str, now: i64) -> OutlineId {
        state
            .create_outline(OutlineDraft::new(title), &ValidationLimits::default(), now)
            .expect("outline should be created")
            .0
    }

    fn note(state: &mut RepositoryState, outline_id: OutlineId, title: &str) -> NoteId {
        state
            .create_note(NoteDraft::new(outline_id, title), 0)
            .expect("note should be created")
            .0
    }

    fn nested(state: &mut RepositoryState, outline_id: OutlineId, depth: u16) -> NoteId {
        state
            .create_note(NoteDraft::new(outline_id, "n").with_depth(depth), 0)
            .expect("note should be created")
            .0
    }

    fn depths(state: &RepositoryState, outline_id: OutlineId) -> Vec<u16> {
        state
            .index()
            .children_of(outline_id)
            .expect("outline should be indexed")
            .iter()
            .map(|id| state.store().note(*id).expect("note").depth)
            .collect()
    }

    fn positions(state: &RepositoryState, outline_id: OutlineId) -> Vec<usize> {
        state
            .index()
            .children_of(outline_id)
            .expect("outline should be indexed")
            .iter()
            .map(|id| state.store().note(*id).expect("note").position)
            .collect()
    }

    #[test]
    fn stamps_strictly_increase_even_with_a_stalled_clock() {
        let mut state = RepositoryState::new();
        let a = outline(&mut state, "a", 100);
        let b = outline(&mut state, "b", 100);
        let c = outline(&mut state, "c", 50);

        let stamp = |id| state.store().outline(id).expect("outline").modified_at;
        assert_eq!(stamp(a), 100);
        assert_eq!(stamp(b), 101);
        assert_eq!(stamp(c), 102);
    }

    #[test]
    fn failed_update_leaves_record_untouched() {
        let mut state = RepositoryState::new();
        let id = outline(&mut state, "Plan", 10);
        let before = state.store().outline(id).cloned();
        let generation = state.generation();

        let err = state
            .update_outline(
                id,
                OutlinePatch::default().title("New").importance(42),
                &ValidationLimits::default(),
                20,
            )
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Validation(_)));
        assert_eq!(state.store().outline(id).cloned(), before);
        assert_eq!(state.generation(), generation);
    }

    #[test]
    fn note_insert_at_position_resequences_tail() {
        let mut state = RepositoryState::new();
        let doc = outline(&mut state, "Doc", 1);
        let first = note(&mut state, doc, "first");
        let second = note(&mut state, doc, "second");
        let (inserted, _) = state
            .create_note(NoteDraft::new(doc, "inserted").at_position(1), 5)
            .expect("insert should succeed");

        assert_eq!(
            state.index().children_of(doc).expect("children"),
            &[first, inserted, second]
        );
        assert_eq!(positions(&state, doc), vec![0, 1, 2]);
        assert!(state.check_integrity().is_empty());
    }

    #[test]
    fn insert_past_end_is_invalid_position() {
        let mut state = RepositoryState::new();
        let doc = outline(&mut state, "Doc", 1);
        let err = state
            .create_note(NoteDraft::new(doc, "x").at_position(1), 2)
            .unwrap_err();
        assert_eq!(
            err,
            RepositoryError::InvalidPosition {
                outline_id: doc,
                position: 1,
                max: 0
            }
        );
        assert_eq!(state.store().note_count(), 0);
    }

    #[test]
    fn move_within_outline_bounds_excludes_len() {
        let mut state = RepositoryState::new();
        let doc = outline(&mut state, "Doc", 1);
        let a = note(&mut state, doc, "a");
        let b = note(&mut state, doc, "b");

        let err = state.move_note(a, doc, 2, 3).unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidPosition { max: 1, .. }));

        state.move_note(a, doc, 1, 3).expect("move should succeed");
        assert_eq!(state.index().children_of(doc).expect("children"), &[b, a]);
        assert_eq!(positions(&state, doc), vec![0, 1]);
    }

    #[test]
    fn shift_at_boundary_is_a_no_op() {
        let mut state = RepositoryState::new();
        let doc = outline(&mut state, "Doc", 1);
        let a = note(&mut state, doc, "a");
        let b = note(&mut state, doc, "b");
        let generation = state.generation();

        assert_eq!(state.shift_note(a, Shift::Up, 9).expect("shift"), None);
        assert_eq!(state.shift_note(b, Shift::Last, 9).expect("shift"), None);
        assert_eq!(state.generation(), generation);

        let change = state.shift_note(b, Shift::First, 9).expect("shift");
        assert!(matches!(change, Some(Change::Moved { .. })));
        assert_eq!(state.index().children_of(doc).expect("children"), &[b, a]);
    }

    #[test]
    fn deleting_outline_cascades_to_notes() {
        let mut state = RepositoryState::new();
        let doc = outline(&mut state, "Doc", 1);
        let a = note(&mut state, doc, "a");
        let b = note(&mut state, doc, "b");

        let change = state.delete_outline(doc).expect("delete should succeed");
        assert_eq!(
            change,
            Change::Deleted {
                entity: EntityId::Outline(doc),
                outline_id: doc,
                cascaded: vec![a, b],
            }
        );
        assert_eq!(state.store().note_count(), 0);
        assert!(state.index().children_of(doc).is_none());
        assert!(state.check_integrity().is_empty());
    }

    #[test]
    fn rebuild_restores_dense_positions() {
        let mut state = RepositoryState::new();
        let doc = outline(&mut state, "Doc", 1);
        for title in ["a", "b", "c"] {
            note(&mut state, doc, title);
        }
        let before = state.index().children_of(doc).expect("children").to_vec();

        let (orphans, change) = state.rebuild_index();
        assert!(orphans.is_empty());
        assert_eq!(change, Change::IndexRebuilt);
        assert_eq!(state.index().children_of(doc).expect("children"), &before[..]);
        assert_eq!(positions(&state, doc), vec![0, 1, 2]);
    }

    #[test]
    fn repair_fixes_divergence_and_drops_orphans() {
        let mut state = RepositoryState::new();
        let doc = outline(&mut state, "Doc", 1);
        let a = note(&mut state, doc, "a");
        let b = note(&mut state, doc, "b");
        let generation = state.generation();

        state.store.note_mut(a).expect("note").position = 5;
        let stray = NoteDraft::new(OutlineId::generate(), "stray")
            .into_record(NoteId::generate(), 0, 3)
            .expect("note");
        let stray_id = stray.id;
        state.store.insert_note(stray);
        assert!(!state.check_integrity().is_empty());

        assert_eq!(state.repair(), vec![stray_id]);
        assert!(state.check_integrity().is_empty());
        assert_eq!(state.index().children_of(doc).expect("children"), &[b, a]);
        assert_eq!(state.generation(), generation);
    }

    #[test]
    fn shift_carries_descendants_past_whole_sibling_subtrees() {
        let mut state = RepositoryState::new();
        let doc = outline(&mut state, "Doc", 1);
        let a = nested(&mut state, doc, 0);
        let a1 = nested(&mut state, doc, 1);
        let b = nested(&mut state, doc, 0);
        let b1 = nested(&mut state, doc, 1);
        let b2 = nested(&mut state, doc, 2);

        let change = state.shift_note(b, Shift::Up, 5).expect("shift");
        assert_eq!(
            state.index().children_of(doc).expect("children"),
            &[b, b1, b2, a, a1]
        );
        match change {
            Some(Change::Moved { to, carried, .. }) => {
                assert_eq!(to.position, 0);
                assert_eq!(carried, vec![b1, b2]);
            }
            other => panic!("unexpected change {other:?}"),
        }

        state.shift_note(b, Shift::Down, 6).expect("shift");
        assert_eq!(
            state.index().children_of(doc).expect("children"),
            &[a, a1, b, b1, b2]
        );
        assert_eq!(positions(&state, doc), vec![0, 1, 2, 3, 4]);
        assert!(state.check_integrity().is_empty());
    }

    #[test]
    fn shift_stays_among_siblings_under_one_parent() {
        let mut state = RepositoryState::new();
        let doc = outline(&mut state, "Doc", 1);
        let a = nested(&mut state, doc, 0);
        let x = nested(&mut state, doc, 1);
        let y = nested(&mut state, doc, 1);
        let z = nested(&mut state, doc, 1);
        let b = nested(&mut state, doc, 0);
        let generation = state.generation();

        assert_eq!(state.shift_note(x, Shift::Up, 5).expect("shift"), None);
        assert_eq!(state.shift_note(z, Shift::Down, 5).expect("shift"), None);
        assert_eq!(state.generation(), generation);

        state.shift_note(x, Shift::Last, 5).expect("shift");
        assert_eq!(
            state.index().children_of(doc).expect("children"),
            &[a, y, z, x, b]
        );
        state.shift_note(x, Shift::First, 6).expect("shift");
        assert_eq!(
            state.index().children_of(doc).expect("children"),
            &[a, x, y, z, b]
        );
    }

    #[test]
    fn promote_and_demote_move_the_whole_subtree() {
        let mut state = RepositoryState::new();
        let doc = outline(&mut state, "Doc", 1);
        let a = nested(&mut state, doc, 0);
        let child = nested(&mut state, doc, 1);
        nested(&mut state, doc, 2);
        nested(&mut state, doc, 1);

        assert_eq!(state.nest_note(a, Nesting::Promote, 5).expect("nest"), None);

        let change = state.nest_note(child, Nesting::Demote, 5).expect("nest");
        assert_eq!(depths(&state, doc), vec![0, 2, 3, 1]);
        assert_eq!(
            change,
            Some(Change::Updated {
                entity: EntityId::Note(child),
                outline_id: doc,
                fields: vec![UpdatedField::Depth],
            })
        );

        state.nest_note(child, Nesting::Promote, 6).expect("nest");
        state.nest_note(child, Nesting::Promote, 7).expect("nest");
        assert_eq!(depths(&state, doc), vec![0, 0, 1, 1]);
        assert_eq!(state.store().note(a).expect("note").revision, 0);
    }

    #[test]
    fn demote_stops_at_the_depth_limit() {
        let mut state = RepositoryState::new();
        let doc = outline(&mut state, "Doc", 1);
        let top = nested(&mut state, doc, MAX_NOTE_DEPTH - 1);
        nested(&mut state, doc, MAX_NOTE_DEPTH);

        assert_eq!(state.nest_note(top, Nesting::Demote, 5).expect("nest"), None);
        assert_eq!(depths(&state, doc), vec![MAX_NOTE_DEPTH - 1, MAX_NOTE_DEPTH]);
    }
}
