//! Live projection of mutable source sequences into view collections.
//!
//! Prism keeps a sequence of derived "view" items bidirectionally
//! consistent with one or more mutable source sequences:
//!
//! - [`SourceList<T>`]: an observable source sequence emitting qualified
//!   add/remove/replace deltas and unqualified resets
//! - [`WrappingCollection<S, V>`]: the ordered, change-notifying projection
//!   of any number of sources through a view factory
//! - [`WithSelection<S, V>`]: a wrapping collection plus a selection
//!   subsystem with cardinality modes, predicate-driven selection, a
//!   cancelable changing event, and reentrancy protection
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use prism::{ModelWrapper, SelectionMode, SourceList, ViewModel, WithSelection};
//!
//! let tasks = Arc::new(SourceList::from_items(vec!["write docs".to_string()]));
//!
//! let collection = WithSelection::new(
//!     |task: &String| Arc::new(ViewModel::new(task.clone())),
//!     SelectionMode::One,
//!     false,
//! );
//! collection.add_source(&tasks);
//!
//! // Mode `One` keeps exactly one item selected.
//! assert_eq!(collection.selection_count(), 1);
//! assert_eq!(collection.selected_item().unwrap().model(), "write docs");
//!
//! // Source mutations flow through live.
//! tasks.push("review docs".to_string());
//! assert_eq!(collection.len(), 2);
//! ```
//!
//! # Threading
//!
//! A collection has one logical thread of control: all mutation must be
//! serialized onto the thread that created it. Per-item selected-flag
//! notifications arriving from other threads are marshaled through that
//! thread's [`Dispatcher`](prism_core::Dispatcher). The reentrance guard
//! inside the selection engine breaks same-thread notification cycles; it
//! is not a cross-thread lock.

mod collection;
mod error;
mod item;
mod manager;
mod selection;
mod source;

pub use collection::WrappingCollection;
pub use error::SelectionError;
pub use item::{ModelWrapper, Selectable, ViewModel};
pub use manager::{CollectionDelta, CollectionManager, ViewFactory};
pub use selection::{
    SelectionChanging, SelectionMode, SelectionPredicate, SelectionProperty, WithSelection,
};
pub use source::{SourceList, SourceSignals};
