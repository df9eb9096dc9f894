//! Query/filter engine.
//!
//! # Responsibility
//! - Select outlines or notes by predicate and/or text match.
//! - Rank text hits and order them deterministically.
//!
//! # Invariants
//! - Search is read-only; abandoning or cancelling it never touches state.
//! - Hits are ordered by relevance, then modification stamp, then id.

pub mod predicate;
pub mod query;

pub use predicate::{CompareOp, NumericField, Predicate};
pub use query::search;

use crate::model::{EntityId, OutlineId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Which entities a search visits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchScope {
    AllOutlines,
    AllNotes,
    NotesInOutline(OutlineId),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MatchMode {
    #[default]
    Substring,
    /// Text is a regular expression.
    Regex,
}

/// How well an entity matched the text query, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Relevance {
    /// Empty text query; selected by predicate alone.
    Unranked,
    BodyMatch,
    TitleSubstring,
    ExactTitle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub id: EntityId,
    pub relevance: Relevance,
    pub modified_at: i64,
}

/// Text half of a search request.
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    pub text: String,
    /// `None` uses the repository default.
    pub case_sensitive: Option<bool>,
    pub mode: MatchMode,
    pub limit: Option<usize>,
    pub cancel: Option<Arc<AtomicBool>>,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = Some(case_sensitive);
        self
    }

    pub fn regex(mut self) -> Self {
        self.mode = MatchMode::Regex;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Aborts the scan with `Cancelled` once `flag` is set.
    pub fn cancel_with(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

impl From<&str> for SearchQuery {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}
