//! Repository handle: the single entry point for commands and queries.
//!
//! # Responsibility
//! - Serialize every mutation through one gate and apply it atomically.
//! - Publish exactly one change event per applied mutation before the
//!   command returns.
//! - Serve reads (get/project/search) from a consistent snapshot.
//!
//! # Invariants
//! - Readers never observe a half-applied command: state changes happen
//!   under the write lock, fan-out after it is released.
//! - The next mutation is not accepted until every subscriber has handled
//!   the previous event.
//! - Subscribers may read the repository from a handler. A mutation from a
//!   handler fails with `ReentrantMutation` instead of waiting on the gate
//!   its own thread holds.

use crate::clock::{Clock, SystemClock};
use crate::config::{ConfigError, RepositoryConfig};
use crate::error::{RepositoryError, RepositoryResult, ValidationError};
use crate::events::{Change, ChangeBus, ChangeEvent, ChangeSubscriber, SubscriptionId};
use crate::model::{
    Draft, EntityId, EntityKind, Note, NoteDraft, NoteId, NotePatch, Outline, OutlineDraft,
    OutlineId, OutlinePatch, Patch, Record,
};
use crate::projection::{
    self, EisenhowerMatrix, MatrixSort, Projection, ProjectionCache, ProjectionKey, SortField,
};
use crate::repo::{IntegrityIssue, Nesting, RepositoryState, Shift};
use crate::search::{self, Predicate, SearchHit, SearchQuery, SearchScope};
use log::{debug, warn};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::Arc;
use std::thread::{self, ThreadId};

/// Cheaply cloneable handle to one in-memory outline/note repository.
///
/// Clones share the same state; construct one per process and pass it to
/// every collaborator.
#[derive(Clone)]
pub struct Repository {
    inner: Arc<Inner>,
}

struct Inner {
    state: RwLock<RepositoryState>,
    gate: Mutex<()>,
    /// Thread currently holding `gate`.
    writer: Mutex<Option<ThreadId>>,
    bus: ChangeBus,
    cache: Arc<ProjectionCache>,
    config: RepositoryConfig,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.read();
        f.debug_struct("Repository")
            .field("generation", &state.generation())
            .field("outlines", &state.store().outline_count())
            .field("notes", &state.store().note_count())
            .field("subscribers", &self.inner.bus.len())
            .finish()
    }
}

impl Default for Repository {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl Repository {
    /// Creates an empty repository with default configuration.
    pub fn in_memory() -> Self {
        Self::build(RepositoryConfig::default(), Arc::new(SystemClock))
    }

    /// Creates an empty repository after validating `config`.
    pub fn new(config: RepositoryConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates an empty repository that stamps records with `clock`.
    pub fn with_clock(
        config: RepositoryConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config, clock))
    }

    fn build(config: RepositoryConfig, clock: Arc<dyn Clock>) -> Self {
        let bus = ChangeBus::new();
        let cache = Arc::new(ProjectionCache::new());
        bus.subscribe(Arc::clone(&cache) as Arc<dyn ChangeSubscriber>);
        debug!(
            "event=repository_open module=service status=ok verify_after_mutation={}",
            config.verify_after_mutation
        );
        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(RepositoryState::new()),
                gate: Mutex::new(()),
                writer: Mutex::new(None),
                bus,
                cache,
                config,
                clock,
            }),
        }
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.inner.config
    }

    // ---- commands ----

    /// Creates an outline or a note from `draft`.
    ///
    /// # Contract
    /// - Fresh drafts get a new id and both timestamps set to now.
    /// - Restored drafts keep their id, timestamps and revision.
    /// - Emits `Created`.
    pub fn create(&self, draft: impl Into<Draft>) -> RepositoryResult<EntityId> {
        match draft.into() {
            Draft::Outline(draft) => self.create_outline(draft).map(EntityId::Outline),
            Draft::Note(draft) => self.create_note(draft).map(EntityId::Note),
        }
    }

    pub fn create_outline(&self, draft: OutlineDraft) -> RepositoryResult<OutlineId> {
        let limits = self.inner.config.limits();
        self.mutate("create_outline", |state, now| {
            let (id, change) = state.create_outline(draft, &limits, now)?;
            Ok((id, Some(change)))
        })
    }

    /// Creates a note inside an existing outline.
    ///
    /// # Errors
    /// - `NotFound` when the owning outline is missing.
    /// - `InvalidPosition` when the insert position exceeds the child count.
    pub fn create_note(&self, draft: NoteDraft) -> RepositoryResult<NoteId> {
        self.mutate("create_note", |state, now| {
            let (id, change) = state.create_note(draft, now)?;
            Ok((id, Some(change)))
        })
    }

    /// Applies `patch` to the entity `id`.
    ///
    /// # Errors
    /// - `Validation(PatchKindMismatch)` when the patch kind differs from `id`.
    /// - `NotFound` when `id` is missing.
    pub fn update(&self, id: EntityId, patch: impl Into<Patch>) -> RepositoryResult<()> {
        match (id, patch.into()) {
            (EntityId::Outline(id), Patch::Outline(patch)) => self.update_outline(id, patch),
            (EntityId::Note(id), Patch::Note(patch)) => self.update_note(id, patch),
            (id, patch) => Err(ValidationError::PatchKindMismatch {
                entity: id.kind(),
                patch: patch.kind(),
            }
            .into()),
        }
    }

    pub fn update_outline(&self, id: OutlineId, patch: OutlinePatch) -> RepositoryResult<()> {
        let limits = self.inner.config.limits();
        self.mutate("update_outline", |state, now| {
            let change = state.update_outline(id, patch, &limits, now)?;
            Ok(((), Some(change)))
        })
    }

    pub fn update_note(&self, id: NoteId, patch: NotePatch) -> RepositoryResult<()> {
        self.mutate("update_note", |state, now| {
            let change = state.update_note(id, patch, now)?;
            Ok(((), Some(change)))
        })
    }

    /// Deletes an entity. Deleting an outline deletes all of its notes in the
    /// same command; deleting a note re-compacts its siblings.
    pub fn delete(&self, id: EntityId) -> RepositoryResult<()> {
        self.mutate("delete", |state, now| {
            let change = match id {
                EntityId::Outline(id) => state.delete_outline(id)?,
                EntityId::Note(id) => state.delete_note(id, now)?,
            };
            Ok(((), Some(change)))
        })
    }

    /// Moves `note_id` to `position` within `target`.
    ///
    /// # Contract
    /// - Same outline: `position` in `0..len`. Other outline: `0..=len`.
    /// - Afterwards `position_of(note_id) == position`.
    /// - Emits `Moved`.
    pub fn move_note(
        &self,
        note_id: NoteId,
        target: OutlineId,
        position: usize,
    ) -> RepositoryResult<()> {
        self.mutate("move_note", |state, now| {
            let change = state.move_note(note_id, target, position, now)?;
            Ok(((), Some(change)))
        })
    }

    /// Replaces the order of an outline's notes.
    ///
    /// # Errors
    /// - `InvalidPermutation` unless `new_order` is exactly the current
    ///   children in some order.
    pub fn reorder(&self, outline_id: OutlineId, new_order: &[NoteId]) -> RepositoryResult<()> {
        self.mutate("reorder", |state, now| {
            let change = state.reorder(outline_id, new_order, now)?;
            Ok(((), Some(change)))
        })
    }

    /// Moves the note and its descendants above the previous sibling.
    ///
    /// Returns `Ok(false)` without emitting anything when there is none.
    pub fn move_note_up(&self, note_id: NoteId) -> RepositoryResult<bool> {
        self.shift(note_id, Shift::Up)
    }

    pub fn move_note_down(&self, note_id: NoteId) -> RepositoryResult<bool> {
        self.shift(note_id, Shift::Down)
    }

    pub fn move_note_to_first(&self, note_id: NoteId) -> RepositoryResult<bool> {
        self.shift(note_id, Shift::First)
    }

    pub fn move_note_to_last(&self, note_id: NoteId) -> RepositoryResult<bool> {
        self.shift(note_id, Shift::Last)
    }

    fn shift(&self, note_id: NoteId, shift: Shift) -> RepositoryResult<bool> {
        self.mutate("shift_note", |state, now| {
            let change = state.shift_note(note_id, shift, now)?;
            Ok((change.is_some(), change))
        })
    }

    /// Makes the note and its descendants one level shallower.
    ///
    /// # Contract
    /// - Returns `Ok(false)` and emits nothing for a top-level note.
    /// - Emits `Updated` with the `Depth` field for the note.
    pub fn promote_note(&self, note_id: NoteId) -> RepositoryResult<bool> {
        self.nest(note_id, Nesting::Promote)
    }

    /// Makes the note and its descendants one level deeper; `Ok(false)` when
    /// that would exceed the depth limit.
    pub fn demote_note(&self, note_id: NoteId) -> RepositoryResult<bool> {
        self.nest(note_id, Nesting::Demote)
    }

    fn nest(&self, note_id: NoteId, nesting: Nesting) -> RepositoryResult<bool> {
        self.mutate("nest_note", |state, now| {
            let change = state.nest_note(note_id, nesting, now)?;
            Ok((change.is_some(), change))
        })
    }

    /// Rebuilds the hierarchy index from note records.
    ///
    /// Returns the ids of notes dropped because their outline was missing.
    pub fn rebuild_index(&self) -> RepositoryResult<Vec<NoteId>> {
        self.mutate("rebuild_index", |state, _| {
            let (orphans, change) = state.rebuild_index();
            Ok((orphans, Some(change)))
        })
    }

    // ---- queries ----

    pub fn get(&self, id: EntityId) -> RepositoryResult<Record> {
        self.inner
            .state
            .read()
            .store()
            .record(id)
            .ok_or(RepositoryError::NotFound(id))
    }

    pub fn outline(&self, id: OutlineId) -> RepositoryResult<Outline> {
        self.inner
            .state
            .read()
            .store()
            .outline(id)
            .cloned()
            .ok_or(RepositoryError::NotFound(EntityId::Outline(id)))
    }

    pub fn note(&self, id: NoteId) -> RepositoryResult<Note> {
        self.inner
            .state
            .read()
            .store()
            .note(id)
            .cloned()
            .ok_or(RepositoryError::NotFound(EntityId::Note(id)))
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.inner.state.read().store().contains(id)
    }

    /// Ordered note ids of `outline_id`.
    pub fn children_of(&self, outline_id: OutlineId) -> RepositoryResult<Vec<NoteId>> {
        self.inner
            .state
            .read()
            .index()
            .children_of(outline_id)
            .map(<[NoteId]>::to_vec)
            .ok_or(RepositoryError::NotFound(EntityId::Outline(outline_id)))
    }

    pub fn position_of(&self, note_id: NoteId) -> RepositoryResult<usize> {
        self.inner
            .state
            .read()
            .index()
            .position_of(note_id)
            .ok_or(RepositoryError::NotFound(EntityId::Note(note_id)))
    }

    /// Descendants of `note_id` in outline order, excluding the note itself.
    pub fn subtree_of(&self, note_id: NoteId) -> RepositoryResult<Vec<NoteId>> {
        let subtree = self.inner.state.read().subtree_ids(note_id)?;
        Ok(subtree.into_iter().skip(1).collect())
    }

    /// Closest preceding shallower note, `None` for a top-level note.
    pub fn parent_of(&self, note_id: NoteId) -> RepositoryResult<Option<NoteId>> {
        let state = self.inner.state.read();
        if state.store().note(note_id).is_none() {
            return Err(RepositoryError::NotFound(EntityId::Note(note_id)));
        }
        Ok(state.index().parent_of(state.store(), note_id))
    }

    pub fn outline_count(&self) -> usize {
        self.inner.state.read().store().outline_count()
    }

    pub fn note_count(&self) -> usize {
        self.inner.state.read().store().note_count()
    }

    /// Number of mutations applied so far; equals the last event sequence.
    pub fn generation(&self) -> u64 {
        self.inner.state.read().generation()
    }

    /// Sorted snapshot of every outline or every note.
    pub fn project(&self, kind: EntityKind, field: SortField, ascending: bool) -> Arc<Projection> {
        let key = ProjectionKey {
            kind,
            field,
            ascending,
            outline_id: None,
        };
        let state = self.inner.state.read();
        let tie_break = self.inner.config.projection_tie_break;
        self.cached(&state, key, || {
            projection::project(&state, kind, field, ascending, tie_break)
        })
    }

    /// Sorted snapshot of the notes of one outline.
    pub fn project_notes_in(
        &self,
        outline_id: OutlineId,
        field: SortField,
        ascending: bool,
    ) -> RepositoryResult<Arc<Projection>> {
        let key = ProjectionKey {
            kind: EntityKind::Note,
            field,
            ascending,
            outline_id: Some(outline_id),
        };
        let state = self.inner.state.read();
        let tie_break = self.inner.config.projection_tie_break;
        self.try_cached(&state, key, || {
            projection::project_notes(&state, Some(outline_id), field, ascending, tie_break)
                .map(Projection::Notes)
        })
    }

    /// Outlines grouped into Eisenhower quadrants by importance and urgency.
    pub fn eisenhower_matrix(&self, sort_by: MatrixSort) -> EisenhowerMatrix {
        let state = self.inner.state.read();
        projection::eisenhower(
            &state,
            sort_by,
            &self.inner.config.limits(),
            self.inner.config.projection_tie_break,
        )
    }

    fn cached(
        &self,
        state: &RepositoryState,
        key: ProjectionKey,
        build: impl FnOnce() -> Projection,
    ) -> Arc<Projection> {
        let generation = state.generation();
        if let Some(hit) = self.inner.cache.get(&key, generation) {
            return hit;
        }
        let projection = Arc::new(build());
        self.inner
            .cache
            .insert(key, generation, Arc::clone(&projection));
        projection
    }

    /// Like [`Self::cached`] for builds that can fail; failures are not cached.
    fn try_cached(
        &self,
        state: &RepositoryState,
        key: ProjectionKey,
        build: impl FnOnce() -> RepositoryResult<Projection>,
    ) -> RepositoryResult<Arc<Projection>> {
        if let Some(hit) = self.inner.cache.get(&key, state.generation()) {
            return Ok(hit);
        }
        let projection = build()?;
        Ok(self.cached(state, key, || projection))
    }

    /// Ids of matching entities, best match first.
    pub fn search(
        &self,
        scope: SearchScope,
        predicate: &Predicate,
        query: impl Into<SearchQuery>,
    ) -> RepositoryResult<Vec<EntityId>> {
        let hits = self.search_hits(scope, predicate, &query.into())?;
        Ok(hits.into_iter().map(|hit| hit.id).collect())
    }

    /// Like [`Self::search`] but keeps relevance and stamps.
    pub fn search_hits(
        &self,
        scope: SearchScope,
        predicate: &Predicate,
        query: &SearchQuery,
    ) -> RepositoryResult<Vec<SearchHit>> {
        let state = self.inner.state.read();
        let result = search::search(&state, scope, predicate, query, &self.inner.config);
        match &result {
            Ok(hits) => debug!(
                "event=search module=service status=ok scope={} hits={} generation={}",
                scope_name(scope),
                hits.len(),
                state.generation()
            ),
            Err(err) => debug!(
                "event=search module=service status=error scope={} error={}",
                scope_name(scope),
                err_name(err)
            ),
        }
        result
    }

    /// Compares the index with the records without changing anything.
    pub fn check_integrity(&self) -> Vec<IntegrityIssue> {
        self.inner.state.read().check_integrity()
    }

    // ---- subscriptions ----

    /// Registers `subscriber` after every existing one.
    pub fn subscribe(&self, subscriber: Arc<dyn ChangeSubscriber>) -> SubscriptionId {
        self.inner.bus.subscribe(subscriber)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.bus.unsubscribe(id)
    }

    /// Runs one command under the gate and publishes its change.
    ///
    /// `apply` returns `None` for an accepted no-op: nothing is published.
    ///
    /// # Errors
    /// - `ReentrantMutation` when called on the thread that holds the gate,
    ///   i.e. from a change handler.
    fn mutate<T>(
        &self,
        command: &'static str,
        apply: impl FnOnce(&mut RepositoryState, i64) -> RepositoryResult<(T, Option<Change>)>,
    ) -> RepositoryResult<T> {
        let current = thread::current().id();
        if *self.inner.writer.lock() == Some(current) {
            warn!(
                "event=mutation module=service status=error command={} error={}",
                command,
                err_name(&RepositoryError::ReentrantMutation)
            );
            return Err(RepositoryError::ReentrantMutation);
        }
        let _gate = self.inner.gate.lock();
        let _writer = WriterMark::claim(&self.inner.writer, current);
        let now = self.inner.clock.now_ms();

        let (value, event) = {
            let mut state = self.inner.state.write();
            let (value, change) = match apply(&mut state, now) {
                Ok(applied) => applied,
                Err(err) => {
                    debug!(
                        "event=mutation module=service status=error command={} error={}",
                        command,
                        err_name(&err)
                    );
                    return Err(err);
                }
            };
            let event = change.map(|change| {
                if self.inner.config.verify_after_mutation && change.is_structural() {
                    self.verify_and_repair(&mut state, command);
                }
                ChangeEvent {
                    sequence: state.generation(),
                    change,
                }
            });
            (value, event)
        };

        match event {
            Some(event) => {
                debug!(
                    "event=mutation module=service status=ok command={} sequence={} kind={:?}",
                    command,
                    event.sequence,
                    event.change.kind()
                );
                self.inner.bus.publish(&event);
            }
            None => debug!(
                "event=mutation module=service status=ok command={} noop=true",
                command
            ),
        }
        Ok(value)
    }

    fn verify_and_repair(&self, state: &mut RepositoryState, command: &'static str) {
        let issues = state.check_integrity();
        if issues.is_empty() {
            return;
        }
        warn!(
            "event=index_divergence module=service status=error command={} issues={}",
            command,
            issues.len()
        );
        let dropped = state.repair();
        self.inner.cache.clear();
        warn!(
            "event=index_rebuild module=service status=ok command={} dropped_notes={}",
            command,
            dropped.len()
        );
    }
}

fn scope_name(scope: SearchScope) -> &'static str {
    match scope {
        SearchScope::AllOutlines => "all_outlines",
        SearchScope::AllNotes => "all_notes",
        SearchScope::NotesInOutline(_) => "notes_in_outline",
    }
}

/// Stable error label; never includes user content.
fn err_name(err: &RepositoryError) -> &'static str {
    match err {
        RepositoryError::NotFound(_) => "not_found",
        RepositoryError::Validation(_) => "validation",
        RepositoryError::InvalidPermutation { .. } => "invalid_permutation",
        RepositoryError::InvalidPosition { .. } => "invalid_position",
        RepositoryError::InvalidScope(_) => "invalid_scope",
        RepositoryError::DuplicateId(_) => "duplicate_id",
        RepositoryError::Cancelled => "cancelled",
        RepositoryError::ReentrantMutation => "reentrant_mutation",
    }
}

/// Records the gate holder; cleared on drop, before the gate is released.
struct WriterMark<'a> {
    slot: &'a Mutex<Option<ThreadId>>,
}

impl<'a> WriterMark<'a> {
    fn claim(slot: &'a Mutex<Option<ThreadId>>, thread: ThreadId) -> Self {
        *slot.lock() = Some(thread);
        Self { slot }
    }
}

impl Drop for WriterMark<'_> {
    fn drop(&mut self) {
        *self.slot.lock() = None;
    }
}
