//! Change notifications fanned out after every applied mutation.
//!
//! # Invariants
//! - One applied mutation produces exactly one `ChangeEvent`.
//! - `sequence` strictly increases in delivery order.

pub mod bus;

pub use bus::{ChangeBus, ChangeSubscriber, SubscriptionId};

use crate::model::{EntityId, EntityKind, NoteId, OutlineId, UpdatedField};
use crate::repo::hierarchy::Location;

/// Coarse event category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Created,
    Updated,
    Moved,
    Reordered,
    Deleted,
    IndexRebuilt,
}

/// Description of one applied mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Created {
        entity: EntityId,
        /// The created outline itself, or the note's owner.
        outline_id: OutlineId,
    },
    Updated {
        entity: EntityId,
        outline_id: OutlineId,
        fields: Vec<UpdatedField>,
    },
    Moved {
        note_id: NoteId,
        from: Location,
        to: Location,
        /// Descendants that moved along with the note, in order.
        carried: Vec<NoteId>,
    },
    Reordered {
        outline_id: OutlineId,
    },
    Deleted {
        entity: EntityId,
        outline_id: OutlineId,
        /// Notes removed together with a deleted outline, in former order.
        cascaded: Vec<NoteId>,
    },
    /// The hierarchy index was rebuilt; every derived view is stale.
    IndexRebuilt,
}

impl Change {
    pub fn kind(&self) -> ChangeKind {
        match self {
            Self::Created { .. } => ChangeKind::Created,
            Self::Updated { .. } => ChangeKind::Updated,
            Self::Moved { .. } => ChangeKind::Moved,
            Self::Reordered { .. } => ChangeKind::Reordered,
            Self::Deleted { .. } => ChangeKind::Deleted,
            Self::IndexRebuilt => ChangeKind::IndexRebuilt,
        }
    }

    /// The entity the mutation was addressed to.
    pub fn entity(&self) -> Option<EntityId> {
        match self {
            Self::Created { entity, .. }
            | Self::Updated { entity, .. }
            | Self::Deleted { entity, .. } => Some(*entity),
            Self::Moved { note_id, .. } => Some(EntityId::Note(*note_id)),
            Self::Reordered { outline_id } => Some(EntityId::Outline(*outline_id)),
            Self::IndexRebuilt => None,
        }
    }

    pub fn entity_kind(&self) -> Option<EntityKind> {
        self.entity().map(|entity| entity.kind())
    }

    /// Outlines whose note sequence or metadata changed.
    pub fn affected_outlines(&self) -> Vec<OutlineId> {
        match self {
            Self::Created { outline_id, .. }
            | Self::Updated { outline_id, .. }
            | Self::Deleted { outline_id, .. }
            | Self::Reordered { outline_id } => vec![*outline_id],
            Self::Moved { from, to, .. } if from.outline_id == to.outline_id => {
                vec![from.outline_id]
            }
            Self::Moved { from, to, .. } => vec![from.outline_id, to.outline_id],
            Self::IndexRebuilt => Vec::new(),
        }
    }

    /// Whether the mutation touched the hierarchy index.
    pub fn is_structural(&self) -> bool {
        !matches!(self, Self::Updated { .. })
    }
}

/// Envelope delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub sequence: u64,
    pub change: Change,
}

#[cfg(test)]
mod tests {
    use super::{Change, ChangeKind};
    use crate::model::{EntityKind, NoteId, OutlineId};
    use crate::repo::hierarchy::Location;

    #[test]
    fn cross_outline_move_affects_both_outlines() {
        let source = OutlineId::generate();
        let target = OutlineId::generate();
        let change = Change::Moved {
            note_id: NoteId::generate(),
            from: Location {
                outline_id: source,
                position: 0,
            },
            to: Location {
                outline_id: target,
                position: 2,
            },
            carried: Vec::new(),
        };
        assert_eq!(change.kind(), ChangeKind::Moved);
        assert_eq!(change.entity_kind(), Some(EntityKind::Note));
        assert_eq!(change.affected_outlines(), vec![source, target]);
        assert!(change.is_structural());
    }

    #[test]
    fn rebuild_has_no_entity() {
        assert_eq!(Change::IndexRebuilt.entity(), None);
        assert!(Change::IndexRebuilt.affected_outlines().is_empty());
    }
}
