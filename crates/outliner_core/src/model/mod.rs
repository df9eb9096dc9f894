//! Outline/note domain model.
//!
//! # Responsibility
//! - Define canonical records, typed identifiers and mutation inputs.
//! - Keep field validation next to the data it guards.
//!
//! # Invariants
//! - Every entity is identified by a stable id that is never reused.
//! - Notes reference their outline by id only; there are no shared pointers
//!   between records.

pub mod ids;
pub mod note;
pub mod outline;
pub mod validate;

pub use ids::{EntityId, EntityKind, NoteId, OutlineId, Restored};
pub use note::{Note, NoteDraft, NotePatch, MAX_NOTE_DEPTH};
pub use outline::{Outline, OutlineDraft, OutlinePatch, UpdatedField};
pub use validate::{ValidationLimits, DEFAULT_MAX_SCALE, MAX_PROGRESS};

/// Creation input for either entity kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Draft {
    Outline(OutlineDraft),
    Note(NoteDraft),
}

impl Draft {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Outline(_) => EntityKind::Outline,
            Self::Note(_) => EntityKind::Note,
        }
    }
}

impl From<OutlineDraft> for Draft {
    fn from(value: OutlineDraft) -> Self {
        Self::Outline(value)
    }
}

impl From<NoteDraft> for Draft {
    fn from(value: NoteDraft) -> Self {
        Self::Note(value)
    }
}

/// Field changes for either entity kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch {
    Outline(OutlinePatch),
    Note(NotePatch),
}

impl Patch {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Outline(_) => EntityKind::Outline,
            Self::Note(_) => EntityKind::Note,
        }
    }
}

impl From<OutlinePatch> for Patch {
    fn from(value: OutlinePatch) -> Self {
        Self::Outline(value)
    }
}

impl From<NotePatch> for Patch {
    fn from(value: NotePatch) -> Self {
        Self::Note(value)
    }
}

/// Snapshot returned by `get`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Outline(Outline),
    Note(Note),
}

impl Record {
    pub fn id(&self) -> EntityId {
        match self {
            Self::Outline(outline) => EntityId::Outline(outline.id),
            Self::Note(note) => EntityId::Note(note.id),
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Outline(outline) => &outline.title,
            Self::Note(note) => &note.title,
        }
    }

    pub fn modified_at(&self) -> i64 {
        match self {
            Self::Outline(outline) => outline.modified_at,
            Self::Note(note) => note.modified_at,
        }
    }
}
