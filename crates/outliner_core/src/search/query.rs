//! Search execution over a repository snapshot.

use crate::config::{RecencyOrder, RepositoryConfig};
use crate::error::{RepositoryError, RepositoryResult, ValidationError};
use crate::model::EntityId;
use crate::repo::RepositoryState;
use crate::search::predicate::{Predicate, Subject};
use crate::search::{MatchMode, Relevance, SearchHit, SearchQuery, SearchScope};
use regex::{Regex, RegexBuilder};
use std::borrow::Cow;
use std::cmp::Ordering;

enum Matcher {
    Substring { needle: String, fold_case: bool },
    Pattern(Regex),
}

impl Matcher {
    /// Returns `None` for a blank query, which selects by predicate only.
    fn build(
        query: &SearchQuery,
        default_case_sensitive: bool,
    ) -> Result<Option<Self>, ValidationError> {
        let text = query.text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        let case_sensitive = query.case_sensitive.unwrap_or(default_case_sensitive);
        let matcher = match query.mode {
            MatchMode::Substring => Self::Substring {
                needle: if case_sensitive {
                    text.to_string()
                } else {
                    text.to_lowercase()
                },
                fold_case: !case_sensitive,
            },
            MatchMode::Regex => Self::Pattern(
                RegexBuilder::new(text)
                    .case_insensitive(!case_sensitive)
                    .build()
                    .map_err(|err| ValidationError::InvalidPattern {
                        pattern: text.to_string(),
                        message: err.to_string(),
                    })?,
            ),
        };
        Ok(Some(matcher))
    }

    fn rank(&self, title: &str, body: &str) -> Option<Relevance> {
        match self {
            Self::Substring { needle, fold_case } => {
                let title = fold(title, *fold_case);
                if title.as_ref() == needle {
                    Some(Relevance::ExactTitle)
                } else if title.contains(needle.as_str()) {
                    Some(Relevance::TitleSubstring)
                } else if fold(body, *fold_case).contains(needle.as_str()) {
                    Some(Relevance::BodyMatch)
                } else {
                    None
                }
            }
            Self::Pattern(regex) => match regex.find(title) {
                Some(found) if found.start() == 0 && found.end() == title.len() => {
                    Some(Relevance::ExactTitle)
                }
                Some(_) => Some(Relevance::TitleSubstring),
                None if regex.is_match(body) => Some(Relevance::BodyMatch),
                None => None,
            },
        }
    }
}

fn fold(value: &str, fold_case: bool) -> Cow<'_, str> {
    if fold_case {
        Cow::Owned(value.to_lowercase())
    } else {
        Cow::Borrowed(value)
    }
}

/// Runs one search against `state`.
///
/// # Errors
/// - `InvalidScope` when the scope names a missing outline.
/// - `Validation(InvalidPattern)` for a malformed regex.
/// - `Cancelled` when the query's cancel flag is observed set.
pub fn search(
    state: &RepositoryState,
    scope: SearchScope,
    predicate: &Predicate,
    query: &SearchQuery,
    config: &RepositoryConfig,
) -> RepositoryResult<Vec<SearchHit>> {
    let matcher = Matcher::build(query, config.search_case_sensitive)?;
    let predicate = predicate.normalized();
    let store = state.store();
    let mut hits = Vec::new();

    let mut consider = |id: EntityId,
                        subject: Subject<'_>,
                        title: &str,
                        body: &str,
                        modified_at: i64| {
        if !predicate.matches(&subject) {
            return;
        }
        let relevance = match &matcher {
            None => Relevance::Unranked,
            Some(matcher) => match matcher.rank(title, body) {
                Some(relevance) => relevance,
                None => return,
            },
        };
        hits.push(SearchHit {
            id,
            relevance,
            modified_at,
        });
    };

    match scope {
        SearchScope::AllOutlines => {
            for outline in store.outlines() {
                if query.is_cancelled() {
                    return Err(RepositoryError::Cancelled);
                }
                consider(
                    EntityId::Outline(outline.id),
                    Subject::outline(outline),
                    &outline.title,
                    &outline.body,
                    outline.modified_at,
                );
            }
        }
        SearchScope::AllNotes => {
            for note in store.notes() {
                if query.is_cancelled() {
                    return Err(RepositoryError::Cancelled);
                }
                if let Some(outline) = store.outline(note.outline_id) {
                    consider(
                        EntityId::Note(note.id),
                        Subject::note(note, outline),
                        &note.title,
                        &note.body,
                        note.modified_at,
                    );
                }
            }
        }
        SearchScope::NotesInOutline(outline_id) => {
            let outline = store
                .outline(outline_id)
                .ok_or(RepositoryError::InvalidScope(outline_id))?;
            let children = state.index().children_of(outline_id).unwrap_or_default();
            for note in children.iter().filter_map(|note_id| store.note(*note_id)) {
                if query.is_cancelled() {
                    return Err(RepositoryError::Cancelled);
                }
                consider(
                    EntityId::Note(note.id),
                    Subject::note(note, outline),
                    &note.title,
                    &note.body,
                    note.modified_at,
                );
            }
        }
    }

    if matcher.is_some() {
        let recency = config.search_recency;
        hits.sort_by(|left, right| {
            right
                .relevance
                .cmp(&left.relevance)
                .then_with(|| by_recency(left.modified_at, right.modified_at, recency))
                .then_with(|| left.id.cmp(&right.id))
        });
    } else {
        hits.sort_by(|left, right| left.id.cmp(&right.id));
    }
    if let Some(limit) = query.limit {
        hits.truncate(limit);
    }
    Ok(hits)
}

fn by_recency(left: i64, right: i64, recency: RecencyOrder) -> Ordering {
    match recency {
        RecencyOrder::NewestFirst => right.cmp(&left),
        RecencyOrder::OldestFirst => left.cmp(&right),
    }
}

#[cfg(test)]
mod tests {
    use super::{fold, search};
    use crate::config::RepositoryConfig;
    use crate::error::{RepositoryError, ValidationError};
    use crate::model::{EntityId, NoteDraft, NoteId, OutlineDraft, OutlineId, ValidationLimits};
    use crate::repo::RepositoryState;
    use crate::search::{CompareOp, NumericField, Predicate, Relevance, SearchQuery, SearchScope};
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    struct Fixture {
        state: RepositoryState,
        doc: OutlineId,
        clock: i64,
    }

    impl Fixture {
        fn new() -> Self {
            let mut state = RepositoryState::new();
            let (doc, _) = state
                .create_outline(OutlineDraft::new("Doc"), &ValidationLimits::default(), 1)
                .expect("outline should be created");
            Self {
                state,
                doc,
                clock: 1,
            }
        }

        fn note(&mut self, title: &str, body: &str) -> NoteId {
            self.clock += 10;
            self.state
                .create_note(NoteDraft::new(self.doc, title).with_body(body), self.clock)
                .expect("note should be created")
                .0
        }

        fn run(&self, scope: SearchScope, query: SearchQuery) -> Vec<EntityId> {
            search(
                &self.state,
                scope,
                &Predicate::Always,
                &query,
                &RepositoryConfig::default(),
            )
            .expect("search should succeed")
            .into_iter()
            .map(|hit| hit.id)
            .collect()
        }
    }

    #[test]
    fn title_match_outranks_body_match() {
        let mut fixture = Fixture::new();
        let title = fixture.note("Urgent Review", "");
        let body = fixture.note("Chores", "an urgent task");
        let exact = fixture.note("urgent", "");

        let hits = fixture.run(SearchScope::AllNotes, SearchQuery::new("urgent"));
        assert_eq!(
            hits,
            vec![EntityId::Note(exact), EntityId::Note(title), EntityId::Note(body)]
        );
    }

    #[test]
    fn equal_relevance_orders_newest_first() {
        let mut fixture = Fixture::new();
        let older = fixture.note("plan a", "");
        let newer = fixture.note("plan b", "");

        let hits = fixture.run(SearchScope::NotesInOutline(fixture.doc), SearchQuery::new("plan"));
        assert_eq!(hits, vec![EntityId::Note(newer), EntityId::Note(older)]);
    }

    #[test]
    fn case_sensitive_query_skips_other_case() {
        let mut fixture = Fixture::new();
        fixture.note("Alpha", "");
        let lower = fixture.note("alpha", "");

        let hits = fixture.run(SearchScope::AllNotes, SearchQuery::new("alpha").case_sensitive(true));
        assert_eq!(hits, vec![EntityId::Note(lower)]);
    }

    #[test]
    fn blank_text_returns_predicate_matches_in_id_order() {
        let mut fixture = Fixture::new();
        let mut ids: Vec<NoteId> = (0..4).map(|i| fixture.note(&format!("n{i}"), "")).collect();
        ids.sort();

        let hits = search(
            &fixture.state,
            SearchScope::AllNotes,
            &Predicate::compare(NumericField::Importance, CompareOp::Eq, 0),
            &SearchQuery::new("   "),
            &RepositoryConfig::default(),
        )
        .expect("search should succeed");
        assert!(hits.iter().all(|hit| hit.relevance == Relevance::Unranked));
        let found: Vec<EntityId> = hits.into_iter().map(|hit| hit.id).collect();
        let expected: Vec<EntityId> = ids.into_iter().map(EntityId::Note).collect();
        assert_eq!(found, expected);
    }

    #[test]
    fn regex_mode_ranks_full_title_match_as_exact() {
        let mut fixture = Fixture::new();
        let exact = fixture.note("v1.2", "");
        let partial = fixture.note("release v3.4 notes", "");

        let hits = fixture.run(SearchScope::AllNotes, SearchQuery::new(r"v\d\.\d").regex());
        assert_eq!(hits, vec![EntityId::Note(exact), EntityId::Note(partial)]);
    }

    #[test]
    fn malformed_regex_is_a_validation_error() {
        let fixture = Fixture::new();
        let err = search(
            &fixture.state,
            SearchScope::AllOutlines,
            &Predicate::Always,
            &SearchQuery::new("(unclosed").regex(),
            &RepositoryConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::Validation(ValidationError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn missing_scope_outline_is_invalid_scope() {
        let fixture = Fixture::new();
        let missing = OutlineId::generate();
        let err = search(
            &fixture.state,
            SearchScope::NotesInOutline(missing),
            &Predicate::Always,
            &SearchQuery::default(),
            &RepositoryConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err, RepositoryError::InvalidScope(missing));
    }

    #[test]
    fn cancelled_search_returns_cancelled() {
        let mut fixture = Fixture::new();
        fixture.note("a", "");
        let flag = Arc::new(AtomicBool::new(true));
        let err = search(
            &fixture.state,
            SearchScope::AllNotes,
            &Predicate::Always,
            &SearchQuery::new("a").cancel_with(flag),
            &RepositoryConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err, RepositoryError::Cancelled);
    }

    #[test]
    fn limit_truncates_after_ranking() {
        let mut fixture = Fixture::new();
        fixture.note("x body", "");
        let exact = fixture.note("x", "");
        let hits = fixture.run(SearchScope::AllNotes, SearchQuery::new("x").limit(1));
        assert_eq!(hits, vec![EntityId::Note(exact)]);
    }

    #[test]
    fn fold_borrows_unless_case_is_folded() {
        use std::borrow::Cow;

        assert!(matches!(fold("MiXed", false), Cow::Borrowed("MiXed")));
        let folded = fold("MiXed", true);
        assert!(matches!(folded, Cow::Owned(_)));
        assert_eq!(folded, "mixed");
    }
}
