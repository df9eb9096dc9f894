//! Tabular projections over outlines and notes.
//!
//! # Responsibility
//! - Build immutable, sorted row snapshots for table views.
//! - Group outlines into Eisenhower quadrants.
//! - Memoize projections per request shape until a change event stales them.
//!
//! # Invariants
//! - Rows are copies; nothing in a projection aliases repository state.
//! - Identical requests against the same generation return identical order.

pub mod cache;
pub mod matrix;
pub mod table;

pub use cache::{ProjectionCache, ProjectionKey};
pub use matrix::{eisenhower, EisenhowerMatrix, MatrixSort, Quadrant};
pub use table::{project, project_all_notes, project_notes, project_outlines};

use crate::model::{EntityKind, NoteId, OutlineId};
use serde::{Deserialize, Serialize};

/// Column a projection is sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Title,
    Importance,
    Urgency,
    Progress,
    Modified,
}

/// One row of the outlines table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineRow {
    pub id: OutlineId,
    pub title: String,
    pub tags: Vec<String>,
    pub importance: u8,
    pub urgency: u8,
    pub progress: u8,
    pub notes_count: usize,
    pub revision: u32,
    pub created_at: i64,
    pub modified_at: i64,
}

/// One row of a notes table.
///
/// `importance`, `urgency` and `progress` come from the owning outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRow {
    pub id: NoteId,
    pub outline_id: OutlineId,
    pub outline_title: String,
    pub title: String,
    pub tags: Vec<String>,
    pub position: usize,
    pub depth: u16,
    pub importance: u8,
    pub urgency: u8,
    pub progress: u8,
    pub revision: u32,
    pub created_at: i64,
    pub modified_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Projection {
    Outlines(Vec<OutlineRow>),
    Notes(Vec<NoteRow>),
}

impl Projection {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Outlines(_) => EntityKind::Outline,
            Self::Notes(_) => EntityKind::Note,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Outlines(rows) => rows.len(),
            Self::Notes(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn outline_rows(&self) -> Option<&[OutlineRow]> {
        match self {
            Self::Outlines(rows) => Some(rows),
            Self::Notes(_) => None,
        }
    }

    pub fn note_rows(&self) -> Option<&[NoteRow]> {
        match self {
            Self::Notes(rows) => Some(rows),
            Self::Outlines(_) => None,
        }
    }
}
