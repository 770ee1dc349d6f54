//! The public wrapping-collection surface.
//!
//! A [`WrappingCollection`] is a live, ordered, change-notifying projection
//! of one or more [`SourceList`]s into view items produced by a factory.
//! It owns one [`CollectionManager`] and forwards its outward deltas
//! verbatim through [`collection_changed`](WrappingCollection::collection_changed).
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use prism::{SourceList, ViewModel, WrappingCollection};
//!
//! let names = Arc::new(SourceList::from_items(vec!["ada".to_string()]));
//!
//! let collection = WrappingCollection::new(
//!     |name: &String| Arc::new(ViewModel::new(name.to_uppercase())),
//!     false,
//! );
//! collection.add_source(&names);
//! names.push("grace".to_string());
//!
//! let shouted: Vec<String> = collection
//!     .items()
//!     .iter()
//!     .map(|vm| vm.model().clone())
//!     .collect();
//! assert_eq!(shouted, vec!["ADA", "GRACE"]);
//! # use prism::ModelWrapper;
//! ```

use std::sync::Arc;

use prism_core::Signal;

use crate::manager::{ChangeHook, CollectionDelta, CollectionManager};
use crate::source::SourceList;

/// An ordered, enumerable, change-notifying sequence of view items
/// projected from any number of sources.
///
/// The `bulk` flag is fixed at construction: when set, multi-item range
/// operations on a source propagate as one coalesced delta (and an
/// unqualified source clear as [`CollectionDelta::Reset`]); when unset they
/// are decomposed into per-item deltas.
pub struct WrappingCollection<S, V> {
    manager: CollectionManager<S, V>,
}

impl<S, V> WrappingCollection<S, V>
where
    S: Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    /// Creates a collection with the given view factory.
    pub fn new<F>(factory: F, bulk: bool) -> Self
    where
        F: Fn(&S) -> Arc<V> + Send + Sync + 'static,
    {
        Self {
            manager: CollectionManager::new(Arc::new(factory), bulk),
        }
    }

    /// Whether multi-item range operations are coalesced.
    pub fn is_bulk(&self) -> bool {
        self.manager.is_bulk()
    }

    /// Registers a source; its current items are materialized immediately
    /// and appended in one delta.
    pub fn add_source(&self, source: &Arc<SourceList<S>>) {
        self.manager.add_source(source);
    }

    /// Unregisters a source, removing its view items in one delta.
    pub fn remove_source(&self, source: &Arc<SourceList<S>>) -> bool {
        self.manager.remove_source(source)
    }

    /// Drops every source with one outward `Reset`.
    pub fn clear_sources(&self) {
        self.manager.clear_sources();
    }

    /// Number of view items.
    pub fn len(&self) -> usize {
        self.manager.len()
    }

    /// Returns `true` when the collection holds no view items.
    pub fn is_empty(&self) -> bool {
        self.manager.is_empty()
    }

    /// First view item of the output sequence.
    pub fn first(&self) -> Option<Arc<V>> {
        self.manager.first()
    }

    /// Snapshot of the current view items, in output order.
    pub fn items(&self) -> Vec<Arc<V>> {
        self.manager.items()
    }

    /// Resolves a tracked view item by identity.
    pub fn find_view(&self, view: &Arc<V>) -> Option<Arc<V>> {
        self.manager.find_view(view)
    }

    /// Outward change notifications, emitted after the internal hook runs.
    pub fn collection_changed(&self) -> &Signal<CollectionDelta<V>> {
        self.manager.changed()
    }

    /// Installs the pre-notification hook.
    ///
    /// The hook runs before external observers for every delta, and always
    /// receives removals in qualified form: a `Removed` delta listing the
    /// exact items precedes every outward `Reset`. The selection engine uses
    /// this as its override point; installing a new hook replaces the
    /// previous one. External observers get the same deltas through
    /// [`collection_changed`](Self::collection_changed).
    pub(crate) fn set_change_hook(&self, hook: ChangeHook<V>) {
        self.manager.notifier().set_hook(hook);
    }

    pub(crate) fn manager(&self) -> &CollectionManager<S, V> {
        &self.manager
    }
}

impl<S, V> WrappingCollection<S, V>
where
    S: Clone + PartialEq + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    /// Resolves a source item to the view item produced for it.
    pub fn find(&self, source_item: &S) -> Option<Arc<V>> {
        self.manager.find(source_item)
    }
}

impl<S> WrappingCollection<S, S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Creates a collection whose view items are the source items
    /// themselves (identity factory).
    pub fn identity(bulk: bool) -> Self {
        Self::new(|s: &S| Arc::new(s.clone()), bulk)
    }
}
