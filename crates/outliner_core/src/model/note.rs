//! Note domain model.
//!
//! # Invariants
//! - Every note has exactly one owning outline (`outline_id`).
//! - `position` is dense and zero-based within the owning outline; the store
//!   re-sequences it on every structural edit.
//! - `depth` never exceeds [`MAX_NOTE_DEPTH`]. A note's descendants are the
//!   run of deeper notes directly after it.

use crate::error::ValidationError;
use crate::model::ids::{NoteId, OutlineId, Restored};
use crate::model::outline::UpdatedField;
use crate::model::validate::{normalize_tags, normalize_title};
use serde::{Deserialize, Serialize};

/// Deepest nesting level a note may have (0 is top level).
pub const MAX_NOTE_DEPTH: u16 = 100;

/// Canonical note (section) record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    /// Non-owning back reference to the owning outline.
    pub outline_id: OutlineId,
    pub title: String,
    pub body: String,
    pub tags: Vec<String>,
    pub position: usize,
    /// Nesting level within the outline, 0 for top-level sections.
    pub depth: u16,
    pub revision: u32,
    pub created_at: i64,
    pub modified_at: i64,
}

impl Note {
    pub(crate) fn touch(&mut self, stamp: i64) {
        self.modified_at = stamp;
        self.revision = self.revision.saturating_add(1);
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.binary_search_by(|held| held.as_str().cmp(tag)).is_ok()
    }
}

/// Input for creating one note inside an existing outline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteDraft {
    pub outline_id: OutlineId,
    pub title: String,
    pub body: String,
    pub tags: Vec<String>,
    /// Insert index within the outline; `None` appends.
    pub position: Option<usize>,
    pub depth: u16,
    pub restore: Option<Restored<NoteId>>,
}

impl NoteDraft {
    pub fn new(outline_id: OutlineId, title: impl Into<String>) -> Self {
        Self {
            outline_id,
            title: title.into(),
            body: String::new(),
            tags: Vec::new(),
            position: None,
            depth: 0,
            restore: None,
        }
    }

    /// Rebuilds a draft that reproduces `note` exactly, appended to its outline.
    ///
    /// Replaying notes in `childrenOf` order reproduces the original positions.
    pub fn restored(note: &Note) -> Self {
        Self {
            outline_id: note.outline_id,
            title: note.title.clone(),
            body: note.body.clone(),
            tags: note.tags.clone(),
            position: None,
            depth: note.depth,
            restore: Some(Restored {
                id: note.id,
                created_at: note.created_at,
                modified_at: note.modified_at,
                revision: note.revision,
            }),
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn at_position(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_depth(mut self, depth: u16) -> Self {
        self.depth = depth;
        self
    }

    /// Validates text fields and materializes the record at `position`.
    pub(crate) fn into_record(
        self,
        id: NoteId,
        position: usize,
        stamp: i64,
    ) -> Result<Note, ValidationError> {
        let title = normalize_title(&self.title)?;
        let tags = normalize_tags(&self.tags)?;
        if self.depth > MAX_NOTE_DEPTH {
            return Err(ValidationError::DepthOutOfRange {
                value: self.depth,
                max: MAX_NOTE_DEPTH,
            });
        }
        let (created_at, modified_at, revision) = match self.restore {
            Some(restore) => (restore.created_at, restore.modified_at, restore.revision),
            None => (stamp, stamp, 0),
        };

        Ok(Note {
            id,
            outline_id: self.outline_id,
            title,
            body: self.body,
            tags,
            position,
            depth: self.depth,
            revision,
            created_at,
            modified_at,
        })
    }
}

/// Partial update for one note; only `Some` fields change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotePatch {
    pub title: Option<String>,
    pub body: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl NotePatch {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub(crate) fn normalized(self) -> Result<Self, ValidationError> {
        Ok(Self {
            title: self.title.as_deref().map(normalize_title).transpose()?,
            body: self.body,
            tags: self.tags.as_deref().map(normalize_tags).transpose()?,
        })
    }

    pub(crate) fn apply_to(self, note: &mut Note) -> Vec<UpdatedField> {
        let mut fields = Vec::new();
        if let Some(title) = self.title {
            note.title = title;
            fields.push(UpdatedField::Title);
        }
        if let Some(body) = self.body {
            note.body = body;
            fields.push(UpdatedField::Body);
        }
        if let Some(tags) = self.tags {
            note.tags = tags;
            fields.push(UpdatedField::Tags);
        }
        fields
    }
}
