//! Core outline/note repository.
//! This crate is the single source of truth for outline and note invariants.

pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod model;
pub mod projection;
pub mod repo;
pub mod search;
pub mod service;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, RecencyOrder, RepositoryConfig, TieBreak};
pub use error::{RepositoryError, RepositoryResult, ValidationError};
pub use events::{Change, ChangeEvent, ChangeKind, ChangeSubscriber, SubscriptionId};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::{
    Draft, EntityId, EntityKind, Note, NoteDraft, NoteId, NotePatch, Outline, OutlineDraft,
    OutlineId, OutlinePatch, Patch, Record, UpdatedField, MAX_NOTE_DEPTH,
};
pub use projection::{
    EisenhowerMatrix, MatrixSort, NoteRow, OutlineRow, Projection, Quadrant, SortField,
};
pub use repo::{IntegrityIssue, Location};
pub use search::{
    CompareOp, MatchMode, NumericField, Predicate, Relevance, SearchHit, SearchQuery, SearchScope,
};
pub use service::Repository;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
