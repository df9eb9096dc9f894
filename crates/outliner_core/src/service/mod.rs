//! Repository service layer.
//!
//! # Responsibility
//! - Own the shared state, the mutation gate and the change bus.
//! - Keep editor/menu/persistence collaborators decoupled from the store
//!   and index internals.

pub mod repository;

pub use repository::Repository;
