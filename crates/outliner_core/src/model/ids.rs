//! Typed identifiers for outlines and notes.
//!
//! # Invariants
//! - Identifiers are random UUID v4 values and are never reused.
//! - An `OutlineId` can never stand in for a `NoteId` (and vice versa).

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generates a fresh random identifier.
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wraps an identifier that already exists externally (import/replay).
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }
    };
}

entity_id!(
    /// Stable identifier of one outline (document).
    OutlineId
);
entity_id!(
    /// Stable identifier of one note (section).
    NoteId
);

/// Entity category used by projections, events and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Outline,
    Note,
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Outline => write!(f, "outline"),
            Self::Note => write!(f, "note"),
        }
    }
}

/// Identifier of either entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityId {
    Outline(OutlineId),
    Note(NoteId),
}

impl EntityId {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Outline(_) => EntityKind::Outline,
            Self::Note(_) => EntityKind::Note,
        }
    }

    pub fn as_uuid(&self) -> Uuid {
        match self {
            Self::Outline(id) => id.as_uuid(),
            Self::Note(id) => id.as_uuid(),
        }
    }

    /// Returns the outline id when this is an outline reference.
    pub fn as_outline(&self) -> Option<OutlineId> {
        match self {
            Self::Outline(id) => Some(*id),
            Self::Note(_) => None,
        }
    }

    /// Returns the note id when this is a note reference.
    pub fn as_note(&self) -> Option<NoteId> {
        match self {
            Self::Outline(_) => None,
            Self::Note(id) => Some(*id),
        }
    }
}

impl Display for EntityId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind(), self.as_uuid())
    }
}

impl From<OutlineId> for EntityId {
    fn from(value: OutlineId) -> Self {
        Self::Outline(value)
    }
}

impl From<NoteId> for EntityId {
    fn from(value: NoteId) -> Self {
        Self::Note(value)
    }
}

/// Identity and timestamps supplied by persistence replay instead of being
/// generated by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Restored<I> {
    pub id: I,
    pub created_at: i64,
    pub modified_at: i64,
    pub revision: u32,
}

#[cfg(test)]
mod tests {
    use super::{EntityId, EntityKind, NoteId, OutlineId};

    #[test]
    fn generated_ids_are_distinct() {
        assert_ne!(OutlineId::generate(), OutlineId::generate());
    }

    #[test]
    fn entity_id_display_names_kind() {
        let id = NoteId::generate();
        let entity = EntityId::from(id);
        assert_eq!(entity.kind(), EntityKind::Note);
        assert_eq!(entity.to_string(), format!("note {id}"));
        assert_eq!(entity.as_note(), Some(id));
        assert_eq!(entity.as_outline(), None);
    }
}
