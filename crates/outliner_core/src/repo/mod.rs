//! Canonical storage and structure.
//!
//! # Responsibility
//! - `store`: identity and metadata records for outlines and notes.
//! - `hierarchy`: ordered note ids per outline and the section tree over them.
//! - `state`: both of the above plus the mutation protocol that keeps them
//!   consistent.
//!
//! # Invariants
//! - Only `state` mutates the store and index; everything else reads.

pub mod hierarchy;
pub mod state;
pub mod store;

pub use hierarchy::{HierarchyIndex, IntegrityIssue, Location};
pub use state::{Nesting, RepositoryState, Shift};
pub use store::RecordStore;
