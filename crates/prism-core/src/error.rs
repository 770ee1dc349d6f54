//! Error types for prism-core.

use thiserror::Error;

/// Errors from the owning-thread dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The operation must run on the dispatcher's owning thread.
    #[error("operation must be called from the dispatcher's owning thread")]
    WrongThread,
}
