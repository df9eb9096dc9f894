//! Row building and sorting for table projections.

use crate::config::TieBreak;
use crate::error::{RepositoryError, RepositoryResult};
use crate::model::{EntityId, EntityKind, Note, Outline, OutlineId};
use crate::projection::{NoteRow, OutlineRow, Projection, SortField};
use crate::repo::RepositoryState;
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum SortKey {
    Text(String),
    Number(i64),
}

/// Projects every entity of `kind`.
pub fn project(
    state: &RepositoryState,
    kind: EntityKind,
    field: SortField,
    ascending: bool,
    tie_break: TieBreak,
) -> Projection {
    match kind {
        EntityKind::Outline => {
            Projection::Outlines(project_outlines(state, field, ascending, tie_break))
        }
        EntityKind::Note => {
            Projection::Notes(project_all_notes(state, field, ascending, tie_break))
        }
    }
}

pub fn project_outlines(
    state: &RepositoryState,
    field: SortField,
    ascending: bool,
    tie_break: TieBreak,
) -> Vec<OutlineRow> {
    let rows = state
        .store()
        .outlines()
        .map(|outline| outline_row(state, outline))
        .collect();
    sort_rows(rows, field, ascending, tie_break, outline_key, |row| {
        row.id.as_uuid()
    })
}

/// Projects notes across all outlines, or inside `scope` only.
///
/// # Errors
/// - `NotFound` when `scope` names a missing outline.
pub fn project_notes(
    state: &RepositoryState,
    scope: Option<OutlineId>,
    field: SortField,
    ascending: bool,
    tie_break: TieBreak,
) -> RepositoryResult<Vec<NoteRow>> {
    let Some(outline_id) = scope else {
        return Ok(project_all_notes(state, field, ascending, tie_break));
    };
    let outline = state
        .store()
        .outline(outline_id)
        .ok_or(RepositoryError::NotFound(EntityId::Outline(outline_id)))?;
    let rows = state
        .index()
        .children_of(outline_id)
        .unwrap_or_default()
        .iter()
        .filter_map(|note_id| state.store().note(*note_id))
        .map(|note| note_row(note, outline))
        .collect();
    Ok(sort_rows(rows, field, ascending, tie_break, note_key, |row| {
        row.id.as_uuid()
    }))
}

/// Projects the notes of every outline.
pub fn project_all_notes(
    state: &RepositoryState,
    field: SortField,
    ascending: bool,
    tie_break: TieBreak,
) -> Vec<NoteRow> {
    let rows = state
        .store()
        .notes()
        .filter_map(|note| {
            let outline = state.store().outline(note.outline_id)?;
            Some(note_row(note, outline))
        })
        .collect();
    sort_rows(rows, field, ascending, tie_break, note_key, |row| {
        row.id.as_uuid()
    })
}

fn outline_row(state: &RepositoryState, outline: &Outline) -> OutlineRow {
    OutlineRow {
        id: outline.id,
        title: outline.title.clone(),
        tags: outline.tags.clone(),
        importance: outline.importance,
        urgency: outline.urgency,
        progress: outline.progress,
        notes_count: state.index().child_count(outline.id),
        revision: outline.revision,
        created_at: outline.created_at,
        modified_at: outline.modified_at,
    }
}

fn note_row(note: &Note, outline: &Outline) -> NoteRow {
    NoteRow {
        id: note.id,
        outline_id: note.outline_id,
        outline_title: outline.title.clone(),
        title: note.title.clone(),
        tags: note.tags.clone(),
        position: note.position,
        depth: note.depth,
        importance: outline.importance,
        urgency: outline.urgency,
        progress: outline.progress,
        revision: note.revision,
        created_at: note.created_at,
        modified_at: note.modified_at,
    }
}

fn outline_key(row: &OutlineRow, field: SortField) -> SortKey {
    match field {
        SortField::Title => SortKey::Text(row.title.to_lowercase()),
        SortField::Importance => SortKey::Number(i64::from(row.importance)),
        SortField::Urgency => SortKey::Number(i64::from(row.urgency)),
        SortField::Progress => SortKey::Number(i64::from(row.progress)),
        SortField::Modified => SortKey::Number(row.modified_at),
    }
}

fn note_key(row: &NoteRow, field: SortField) -> SortKey {
    match field {
        SortField::Title => SortKey::Text(row.title.to_lowercase()),
        SortField::Importance => SortKey::Number(i64::from(row.importance)),
        SortField::Urgency => SortKey::Number(i64::from(row.urgency)),
        SortField::Progress => SortKey::Number(i64::from(row.progress)),
        SortField::Modified => SortKey::Number(row.modified_at),
    }
}

/// Sorts by the primary key in the requested direction, then by id per
/// `tie_break`. The tie-break does not flip with `ascending`.
fn sort_rows<R, I, K, F>(
    rows: Vec<R>,
    field: SortField,
    ascending: bool,
    tie_break: TieBreak,
    key: K,
    id: F,
) -> Vec<R>
where
    I: Ord,
    K: Fn(&R, SortField) -> SortKey,
    F: Fn(&R) -> I,
{
    let mut keyed: Vec<(SortKey, R)> = rows
        .into_iter()
        .map(|row| (key(&row, field), row))
        .collect();
    keyed.sort_by(|(left_key, left), (right_key, right)| {
        let primary = if ascending {
            left_key.cmp(right_key)
        } else {
            right_key.cmp(left_key)
        };
        primary.then_with(|| tie(id(left), id(right), tie_break))
    });
    keyed.into_iter().map(|(_, row)| row).collect()
}

fn tie<I: Ord>(left: I, right: I, tie_break: TieBreak) -> Ordering {
    match tie_break {
        TieBreak::IdAscending => left.cmp(&right),
        TieBreak::IdDescending => right.cmp(&left),
    }
}
