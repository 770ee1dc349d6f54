//! Error types for Prism collections.

use thiserror::Error;

/// Errors raised by the selection surface.
///
/// Only configuration conflicts are errors. An item that cannot be resolved
/// to a tracked view is a no-op reported as `Ok(false)` by the selection
/// operations, distinguishing "nothing to do" from "rejected by policy".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// Explicit `select`/`unselect`/`clear_selection` was called while a
    /// selection predicate is configured. Under a predicate the predicate is
    /// the sole source of truth for membership.
    #[error("explicit selection cannot be combined with a selection predicate")]
    PredicateConfigured,
}
