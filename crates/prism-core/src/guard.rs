//! Reentrancy guard for non-reentrant critical sections.
//!
//! Selection handling in Prism can trigger itself: updating an item's
//! selected flag fires the item's change signal, whose listener routes back
//! into the same handler. [`ReentranceGuard`] breaks that cycle. It is a
//! cooperative flag, not a lock: it detects nested entry on the same call
//! stack so the inner call can bail out, and gives no mutual-exclusion
//! guarantees across threads.
//!
//! # Example
//!
//! ```
//! use prism_core::ReentranceGuard;
//!
//! struct Engine {
//!     guard: ReentranceGuard,
//! }
//!
//! impl Engine {
//!     fn handle(&self) -> bool {
//!         let scope = self.guard.raise();
//!         if scope.is_reentrant() {
//!             return false; // already inside, refuse the nested call
//!         }
//!         // ... non-reentrant work; may indirectly call handle() again ...
//!         true
//!     }
//! }
//!
//! let engine = Engine { guard: ReentranceGuard::new() };
//! assert!(engine.handle());
//! ```

use std::sync::atomic::{AtomicU32, Ordering};

/// Detects nested entry into a guarded section.
///
/// Call [`raise`](Self::raise) on entry and keep the returned scope alive
/// for the duration of the section. The flag is lowered when the scope
/// drops, on every exit path (early return, `?`, panic unwinding).
#[derive(Debug, Default)]
pub struct ReentranceGuard {
    depth: AtomicU32,
}

impl ReentranceGuard {
    /// Creates a guard with the flag lowered.
    pub fn new() -> Self {
        Self {
            depth: AtomicU32::new(0),
        }
    }

    /// Raises the guard, returning a scope that lowers it on drop.
    ///
    /// Check [`RaiseScope::is_reentrant`] immediately after raising: `true`
    /// means the guard was already raised when this scope was entered.
    pub fn raise(&self) -> RaiseScope<'_> {
        let previous = self.depth.fetch_add(1, Ordering::SeqCst);
        RaiseScope {
            guard: self,
            reentrant: previous > 0,
        }
    }

    /// Returns `true` while any scope is alive.
    pub fn is_raised(&self) -> bool {
        self.depth.load(Ordering::SeqCst) > 0
    }
}

/// Scope handle returned by [`ReentranceGuard::raise`].
#[must_use = "the guard is lowered as soon as the scope is dropped"]
pub struct RaiseScope<'a> {
    guard: &'a ReentranceGuard,
    reentrant: bool,
}

impl RaiseScope<'_> {
    /// Whether the guard was already raised when this scope was entered.
    pub fn is_reentrant(&self) -> bool {
        self.reentrant
    }
}

impl Drop for RaiseScope<'_> {
    fn drop(&mut self) {
        self.guard.depth.fetch_sub(1, Ordering::SeqCst);
    }
}
