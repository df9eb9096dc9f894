//! Field predicates for search.
//!
//! Notes are evaluated with their outline's scheduling metadata and with
//! the union of outline and note tags.

use crate::model::validate::normalize_tag;
use crate::model::{Note, Outline};
use serde::{Deserialize, Serialize};
use std::ops::Not;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericField {
    Importance,
    Urgency,
    Progress,
    Revision,
    CreatedAt,
    ModifiedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    fn holds(self, left: i64, right: i64) -> bool {
        match self {
            Self::Eq => left == right,
            Self::Ne => left != right,
            Self::Lt => left < right,
            Self::Le => left <= right,
            Self::Gt => left > right,
            Self::Ge => left >= right,
        }
    }
}

/// Boolean filter over entity fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    #[default]
    Always,
    Compare {
        field: NumericField,
        op: CompareOp,
        value: i64,
    },
    HasTag(String),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn compare(field: NumericField, op: CompareOp, value: i64) -> Self {
        Self::Compare { field, op, value }
    }

    pub fn has_tag(tag: impl Into<String>) -> Self {
        Self::HasTag(tag.into())
    }

    pub fn and(self, other: Predicate) -> Self {
        match self {
            Self::Always => other,
            Self::And(mut all) => {
                all.push(other);
                Self::And(all)
            }
            first => Self::And(vec![first, other]),
        }
    }

    pub fn or(self, other: Predicate) -> Self {
        match self {
            Self::Or(mut any) => {
                any.push(other);
                Self::Or(any)
            }
            first => Self::Or(vec![first, other]),
        }
    }

    pub fn is_always(&self) -> bool {
        matches!(self, Self::Always)
    }

    /// Normalizes tag operands the same way stored tags are normalized.
    pub(crate) fn normalized(&self) -> Self {
        match self {
            Self::HasTag(tag) => Self::HasTag(normalize_tag(tag).unwrap_or_default()),
            Self::And(all) => Self::And(all.iter().map(Self::normalized).collect()),
            Self::Or(any) => Self::Or(any.iter().map(Self::normalized).collect()),
            Self::Not(inner) => Self::Not(Box::new(inner.normalized())),
            other => other.clone(),
        }
    }

    pub(crate) fn matches(&self, subject: &Subject<'_>) -> bool {
        match self {
            Self::Always => true,
            Self::Compare { field, op, value } => op.holds(subject.numeric(*field), *value),
            Self::HasTag(tag) => subject.has_tag(tag),
            Self::And(all) => all.iter().all(|predicate| predicate.matches(subject)),
            Self::Or(any) => any.iter().any(|predicate| predicate.matches(subject)),
            Self::Not(inner) => !inner.matches(subject),
        }
    }
}

impl Not for Predicate {
    type Output = Predicate;

    fn not(self) -> Self::Output {
        match self {
            Self::Not(inner) => *inner,
            other => Self::Not(Box::new(other)),
        }
    }
}

/// Read-only view of one entity as seen by predicates.
pub(crate) struct Subject<'a> {
    importance: u8,
    urgency: u8,
    progress: u8,
    revision: u32,
    created_at: i64,
    modified_at: i64,
    tags: &'a [String],
    inherited_tags: &'a [String],
}

impl<'a> Subject<'a> {
    pub(crate) fn outline(outline: &'a Outline) -> Self {
        Self {
            importance: outline.importance,
            urgency: outline.urgency,
            progress: outline.progress,
            revision: outline.revision,
            created_at: outline.created_at,
            modified_at: outline.modified_at,
            tags: &outline.tags,
            inherited_tags: &[],
        }
    }

    pub(crate) fn note(note: &'a Note, outline: &'a Outline) -> Self {
        Self {
            importance: outline.importance,
            urgency: outline.urgency,
            progress: outline.progress,
            revision: note.revision,
            created_at: note.created_at,
            modified_at: note.modified_at,
            tags: &note.tags,
            inherited_tags: &outline.tags,
        }
    }

    fn numeric(&self, field: NumericField) -> i64 {
        match field {
            NumericField::Importance => i64::from(self.importance),
            NumericField::Urgency => i64::from(self.urgency),
            NumericField::Progress => i64::from(self.progress),
            NumericField::Revision => i64::from(self.revision),
            NumericField::CreatedAt => self.created_at,
            NumericField::ModifiedAt => self.modified_at,
        }
    }

    fn has_tag(&self, tag: &str) -> bool {
        let found = |tags: &[String]| tags.binary_search_by(|held| held.as_str().cmp(tag)).is_ok();
        found(self.tags) || found(self.inherited_tags)
    }
}

#[cfg(test)]
mod tests {
    use super::{CompareOp, NumericField, Predicate, Subject};
    use crate::model::{NoteDraft, NoteId, OutlineDraft, OutlineId, ValidationLimits};

    #[test]
    fn note_inherits_outline_metadata_and_tags() {
        let outline = OutlineDraft::new("Plan")
            .with_importance(4)
            .with_tags(["work"])
            .into_record(OutlineId::generate(), 1, &ValidationLimits::default())
            .expect("outline");
        let note = NoteDraft::new(outline.id, "Step")
            .with_tags(["todo"])
            .into_record(NoteId::generate(), 0, 2)
            .expect("note");
        let subject = Subject::note(&note, &outline);

        let predicate = Predicate::compare(NumericField::Importance, CompareOp::Ge, 4)
            .and(Predicate::has_tag(" Work "))
            .and(Predicate::has_tag("todo"))
            .normalized();
        assert!(predicate.matches(&subject));
        assert!(!(!predicate).matches(&subject));
    }

    #[test]
    fn or_and_not_combine() {
        let outline = OutlineDraft::new("Plan")
            .with_progress(50)
            .into_record(OutlineId::generate(), 1, &ValidationLimits::default())
            .expect("outline");
        let subject = Subject::outline(&outline);

        let done = Predicate::compare(NumericField::Progress, CompareOp::Eq, 100);
        let started = Predicate::compare(NumericField::Progress, CompareOp::Gt, 0);
        assert!(done.clone().or(started.clone()).matches(&subject));
        assert!(!done.clone().and(started).matches(&subject));
        assert!((!done).matches(&subject));
        assert!(Predicate::Always.matches(&subject));
    }
}
