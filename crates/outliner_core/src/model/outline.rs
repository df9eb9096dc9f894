//! Outline domain model.
//!
//! # Responsibility
//! - Define the canonical outline record and its create/update inputs.
//! - Validate scheduling metadata before it reaches the store.
//!
//! # Invariants
//! - `importance`/`urgency` stay within the configured scale, `progress`
//!   within `0..=100`.
//! - `title` is trimmed and never blank.
//! - The ordered note sequence lives in the hierarchy index, not here.

use crate::error::ValidationError;
use crate::model::ids::{OutlineId, Restored};
use crate::model::validate::{check_progress, normalize_tags, normalize_title, ValidationLimits};
use serde::{Deserialize, Serialize};

/// Field names reported by `Updated` change events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdatedField {
    Title,
    Body,
    Tags,
    Importance,
    Urgency,
    Progress,
    /// Nesting level of a note and its descendants.
    Depth,
}

/// Canonical outline (document) record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outline {
    pub id: OutlineId,
    pub title: String,
    /// Free-text description shown above the notes.
    pub body: String,
    /// Normalized tag set, sorted ascending.
    pub tags: Vec<String>,
    pub importance: u8,
    pub urgency: u8,
    /// Percentage done.
    pub progress: u8,
    /// Incremented on every modification of this outline.
    pub revision: u32,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds.
    pub modified_at: i64,
}

impl Outline {
    pub(crate) fn touch(&mut self, stamp: i64) {
        self.modified_at = stamp;
        self.revision = self.revision.saturating_add(1);
    }

    /// Returns whether the outline carries the given normalized tag.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.binary_search_by(|held| held.as_str().cmp(tag)).is_ok()
    }
}

/// Input for creating one outline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutlineDraft {
    pub title: String,
    pub body: String,
    pub tags: Vec<String>,
    pub importance: u8,
    pub urgency: u8,
    pub progress: u8,
    /// Set by persistence replay to keep identity and timestamps.
    pub restore: Option<Restored<OutlineId>>,
}

impl OutlineDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Rebuilds a draft that reproduces `outline` exactly, identity included.
    pub fn restored(outline: &Outline) -> Self {
        Self {
            title: outline.title.clone(),
            body: outline.body.clone(),
            tags: outline.tags.clone(),
            importance: outline.importance,
            urgency: outline.urgency,
            progress: outline.progress,
            restore: Some(Restored {
                id: outline.id,
                created_at: outline.created_at,
                modified_at: outline.modified_at,
                revision: outline.revision,
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

    pub fn with_importance(mut self, importance: u8) -> Self {
        self.importance = importance;
        self
    }

    pub fn with_urgency(mut self, urgency: u8) -> Self {
        self.urgency = urgency;
        self
    }

    pub fn with_progress(mut self, progress: u8) -> Self {
        self.progress = progress;
        self
    }

    /// Validates the draft and materializes the record.
    ///
    /// Restored drafts keep their stamps and revision; fresh drafts start at
    /// revision 0 with both timestamps set to `stamp`.
    pub(crate) fn into_record(
        self,
        id: OutlineId,
        stamp: i64,
        limits: &ValidationLimits,
    ) -> Result<Outline, ValidationError> {
        let title = normalize_title(&self.title)?;
        let tags = normalize_tags(&self.tags)?;
        let importance = limits.check_importance(self.importance)?;
        let urgency = limits.check_urgency(self.urgency)?;
        let progress = check_progress(self.progress)?;
        let (created_at, modified_at, revision) = match self.restore {
            Some(restore) => (restore.created_at, restore.modified_at, restore.revision),
            None => (stamp, stamp, 0),
        };

        Ok(Outline {
            id,
            title,
            body: self.body,
            tags,
            importance,
            urgency,
            progress,
            revision,
            created_at,
            modified_at,
        })
    }
}

/// Partial update for one outline; only `Some` fields change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutlinePatch {
    pub title: Option<String>,
    pub body: Option<String>,
    pub tags: Option<Vec<String>>,
    pub importance: Option<u8>,
    pub urgency: Option<u8>,
    pub progress: Option<u8>,
}

impl OutlinePatch {
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

    pub fn importance(mut self, importance: u8) -> Self {
        self.importance = Some(importance);
        self
    }

    pub fn urgency(mut self, urgency: u8) -> Self {
        self.urgency = Some(urgency);
        self
    }

    pub fn progress(mut self, progress: u8) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Validates every present field and returns the normalized patch.
    pub(crate) fn normalized(self, limits: &ValidationLimits) -> Result<Self, ValidationError> {
        Ok(Self {
            title: self.title.as_deref().map(normalize_title).transpose()?,
            body: self.body,
            tags: self.tags.as_deref().map(normalize_tags).transpose()?,
            importance: self
                .importance
                .map(|value| limits.check_importance(value))
                .transpose()?,
            urgency: self
                .urgency
                .map(|value| limits.check_urgency(value))
                .transpose()?,
            progress: self.progress.map(check_progress).transpose()?,
        })
    }

    /// Applies an already normalized patch and reports the touched fields.
    pub(crate) fn apply_to(self, outline: &mut Outline) -> Vec<UpdatedField> {
        let mut fields = Vec::new();
        if let Some(title) = self.title {
            outline.title = title;
            fields.push(UpdatedField::Title);
        }
        if let Some(body) = self.body {
            outline.body = body;
            fields.push(UpdatedField::Body);
        }
        if let Some(tags) = self.tags {
            outline.tags = tags;
            fields.push(UpdatedField::Tags);
        }
        if let Some(importance) = self.importance {
            outline.importance = importance;
            fields.push(UpdatedField::Importance);
        }
        if let Some(urgency) = self.urgency {
            outline.urgency = urgency;
            fields.push(UpdatedField::Urgency);
        }
        if let Some(progress) = self.progress {
            outline.progress = progress;
            fields.push(UpdatedField::Progress);
        }
        fields
    }
}
