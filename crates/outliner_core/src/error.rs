//! Error taxonomy for repository commands and queries.
//!
//! # Invariants
//! - Errors are raised before any state change, so a failed command leaves
//!   the repository exactly as it was.
//! - There is no fatal variant; index divergence is repaired, not reported.

use crate::model::{EntityId, EntityKind, OutlineId};
use thiserror::Error;

/// Result type used by repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Field-level validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("title must not be blank")]
    BlankTitle,
    #[error("tag must not be blank")]
    BlankTag,
    #[error("importance {value} is outside 0..={max}")]
    ImportanceOutOfRange { value: u8, max: u8 },
    #[error("urgency {value} is outside 0..={max}")]
    UrgencyOutOfRange { value: u8, max: u8 },
    #[error("progress {value} is outside 0..=100")]
    ProgressOutOfRange { value: u8 },
    #[error("note depth {value} is outside 0..={max}")]
    DepthOutOfRange { value: u16, max: u16 },
    #[error("{patch} patch cannot be applied to {entity}")]
    PatchKindMismatch { entity: EntityKind, patch: EntityKind },
    #[error("invalid search pattern `{pattern}`: {message}")]
    InvalidPattern { pattern: String, message: String },
}

/// Errors returned by repository commands and queries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    /// Referenced id is absent.
    #[error("{0} not found")]
    NotFound(EntityId),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Reorder input is not a permutation of the current children.
    #[error("invalid permutation for outline {outline_id}: {reason}")]
    InvalidPermutation { outline_id: OutlineId, reason: String },
    /// Move/insert target index is out of bounds.
    #[error("invalid position {position} in outline {outline_id}: expected 0..={max}")]
    InvalidPosition {
        outline_id: OutlineId,
        position: usize,
        max: usize,
    },
    /// Search scope names an outline that does not exist.
    #[error("invalid search scope: outline {0} does not exist")]
    InvalidScope(OutlineId),
    /// Replay supplied an id that is already taken.
    #[error("identifier already in use: {0}")]
    DuplicateId(EntityId),
    #[error("search cancelled by caller")]
    Cancelled,
    /// A change handler tried to mutate the repository that is notifying it.
    #[error("mutation issued from inside a change handler")]
    ReentrantMutation,
}
