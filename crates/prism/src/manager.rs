//! Source aggregation and delta merging.
//!
//! A [`CollectionManager`] owns one adapter per registered source. Each
//! adapter subscribes to its source's change signals, materializes source
//! items into view items through the factory, and keeps the (source item →
//! view item) pairs in source order. The manager merges the per-source
//! deltas into single outward [`CollectionDelta`]s over the concatenated
//! output sequence.
//!
//! Output order invariant: the output sequence is the concatenation, in
//! source-addition order, of each source's view items in intra-source
//! order.
//!
//! Delta policy:
//!
//! - single-unit source deltas propagate as incremental
//!   `Inserted`/`Removed`/`Replaced`, including a range operation or
//!   source clear that happens to affect exactly one item;
//! - with the `bulk` flag, a multi-item range add propagates as one
//!   coalesced `Inserted` carrying all produced views, while a multi-item
//!   atomic removal (range remove or clear) propagates as one `Reset`;
//!   the internal hook still receives the removal in qualified form first
//!   (see [`ChangeNotifier`]);
//! - without `bulk`, range operations are decomposed into per-item
//!   incremental deltas whose indices are valid when applied sequentially.

use std::sync::Arc;

use parking_lot::Mutex;

use prism_core::{ConnectionId, PerfSpan, Signal};

use crate::source::SourceList;

/// Produces the view item for a source item.
///
/// The factory returns a shared handle so callers can wire observation onto
/// the item before the collection starts tracking it.
pub type ViewFactory<S, V> = Arc<dyn Fn(&S) -> Arc<V> + Send + Sync>;

/// A change to the output sequence of a wrapping collection.
///
/// Indices address the output sequence (across all sources). Deltas are
/// sequentially patchable: applying them in emission order to a copy of the
/// previous output yields the current output.
pub enum CollectionDelta<V> {
    /// Items entered the output at `index`.
    Inserted {
        /// Output-sequence position of the first inserted item.
        index: usize,
        /// The inserted view items, in order.
        items: Vec<Arc<V>>,
    },
    /// Items left the output at `index`.
    Removed {
        /// Output-sequence position the items occupied.
        index: usize,
        /// The removed view items, in order.
        items: Vec<Arc<V>>,
    },
    /// One item was replaced in place.
    Replaced {
        /// Output-sequence position of the replaced item.
        index: usize,
        /// The view item that left.
        old: Arc<V>,
        /// The view item that took its place.
        new: Arc<V>,
    },
    /// The output changed structurally; observers should re-enumerate.
    Reset,
}

impl<V> Clone for CollectionDelta<V> {
    fn clone(&self) -> Self {
        match self {
            Self::Inserted { index, items } => Self::Inserted {
                index: *index,
                items: items.clone(),
            },
            Self::Removed { index, items } => Self::Removed {
                index: *index,
                items: items.clone(),
            },
            Self::Replaced { index, old, new } => Self::Replaced {
                index: *index,
                old: old.clone(),
                new: new.clone(),
            },
            Self::Reset => Self::Reset,
        }
    }
}

impl<V> std::fmt::Debug for CollectionDelta<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inserted { index, items } => f
                .debug_struct("Inserted")
                .field("index", index)
                .field("count", &items.len())
                .finish(),
            Self::Removed { index, items } => f
                .debug_struct("Removed")
                .field("index", index)
                .field("count", &items.len())
                .finish(),
            Self::Replaced { index, .. } => {
                f.debug_struct("Replaced").field("index", index).finish()
            }
            Self::Reset => f.write_str("Reset"),
        }
    }
}

/// Pre-notification callback installed by a layering component.
pub type ChangeHook<V> = Arc<dyn Fn(&CollectionDelta<V>) + Send + Sync>;

/// Routes a delta to the internal hook first, then to external observers.
///
/// The hook is the layering point for the selection engine: it runs before
/// any external observer sees the change. Resets are special-cased so the
/// hook always receives removals in qualified form: for every outward
/// `Reset`, the hook first receives a `Removed` delta listing the exact
/// items that left.
pub(crate) struct ChangeNotifier<V> {
    hook: Mutex<Option<ChangeHook<V>>>,
    signal: Signal<CollectionDelta<V>>,
}

impl<V: Send + Sync + 'static> ChangeNotifier<V> {
    fn new() -> Self {
        Self {
            hook: Mutex::new(None),
            signal: Signal::new(),
        }
    }

    pub(crate) fn set_hook(&self, hook: ChangeHook<V>) {
        *self.hook.lock() = Some(hook);
    }

    pub(crate) fn signal(&self) -> &Signal<CollectionDelta<V>> {
        &self.signal
    }

    fn current_hook(&self) -> Option<ChangeHook<V>> {
        self.hook.lock().clone()
    }

    fn dispatch(&self, delta: CollectionDelta<V>) {
        if let Some(hook) = self.current_hook() {
            hook(&delta);
        }
        self.signal.emit(delta);
    }

    /// Outward `Reset`, preceded by a qualified removal for the hook.
    fn dispatch_reset(&self, index: usize, removed: Vec<Arc<V>>) {
        if !removed.is_empty() {
            if let Some(hook) = self.current_hook() {
                hook(&CollectionDelta::Removed {
                    index,
                    items: removed,
                });
            }
        }
        self.signal.emit(CollectionDelta::Reset);
    }
}

/// Connection handles for one source subscription.
struct SourceConnections {
    inserted: ConnectionId,
    removed: ConnectionId,
    replaced: ConnectionId,
    reset: ConnectionId,
}

/// Per-source adapter: the subscription plus the ordered item pairs it
/// produced.
struct SourceAdapter<S, V> {
    source: Arc<SourceList<S>>,
    pairs: Vec<(S, Arc<V>)>,
    connections: SourceConnections,
}

impl<S: Clone + Send + Sync + 'static, V> SourceAdapter<S, V> {
    fn disconnect(&self) {
        let signals = self.source.signals();
        signals.items_inserted.disconnect(self.connections.inserted);
        signals.items_removed.disconnect(self.connections.removed);
        signals.item_replaced.disconnect(self.connections.replaced);
        signals.source_reset.disconnect(self.connections.reset);
    }

    fn views(&self) -> Vec<Arc<V>> {
        self.pairs.iter().map(|(_, v)| v.clone()).collect()
    }
}

struct ManagerInner<S, V> {
    adapters: Mutex<Vec<SourceAdapter<S, V>>>,
    factory: ViewFactory<S, V>,
    bulk: bool,
    notifier: ChangeNotifier<V>,
}

/// Aggregates any number of sources into one ordered output sequence.
pub struct CollectionManager<S, V> {
    inner: Arc<ManagerInner<S, V>>,
}

impl<S, V> Clone for CollectionManager<S, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S, V> CollectionManager<S, V>
where
    S: Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    /// Creates a manager producing views through `factory`.
    pub fn new(factory: ViewFactory<S, V>, bulk: bool) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                adapters: Mutex::new(Vec::new()),
                factory,
                bulk,
                notifier: ChangeNotifier::new(),
            }),
        }
    }

    /// Outward change notifications over the merged output sequence.
    pub fn changed(&self) -> &Signal<CollectionDelta<V>> {
        self.inner.notifier.signal()
    }

    pub(crate) fn notifier(&self) -> &ChangeNotifier<V> {
        &self.inner.notifier
    }

    /// Whether multi-item range operations are coalesced.
    pub fn is_bulk(&self) -> bool {
        self.inner.bulk
    }

    /// Registers a source: subscribes to its deltas, materializes its
    /// current items, and appends them to the output in one delta.
    ///
    /// Registering the same source instance twice is a caller-contract
    /// violation; it is debug-asserted and otherwise ignored.
    pub fn add_source(&self, source: &Arc<SourceList<S>>) {
        let _perf = PerfSpan::new("add_source");

        {
            let adapters = self.inner.adapters.lock();
            if adapters.iter().any(|a| Arc::ptr_eq(&a.source, source)) {
                debug_assert!(false, "source registered twice");
                tracing::warn!(
                    target: "prism::collection",
                    "ignoring duplicate source registration"
                );
                return;
            }
        }

        let connections = ManagerInner::subscribe(&self.inner, source);

        let items = source.items();
        let views: Vec<Arc<V>> = items.iter().map(|s| (self.inner.factory)(s)).collect();
        let pairs: Vec<(S, Arc<V>)> = items.into_iter().zip(views.iter().cloned()).collect();

        let index = {
            let mut adapters = self.inner.adapters.lock();
            let offset: usize = adapters.iter().map(|a| a.pairs.len()).sum();
            adapters.push(SourceAdapter {
                source: source.clone(),
                pairs,
                connections,
            });
            offset
        };

        tracing::debug!(
            target: "prism::collection",
            count = views.len(),
            index,
            "source registered"
        );

        if !views.is_empty() {
            self.inner
                .notifier
                .dispatch(CollectionDelta::Inserted { index, items: views });
        }
    }

    /// Unregisters a source, removing its view items in one delta.
    ///
    /// Returns `false` when the source was not registered. No delta is
    /// emitted when the source contributed no items.
    pub fn remove_source(&self, source: &Arc<SourceList<S>>) -> bool {
        let removed = {
            let mut adapters = self.inner.adapters.lock();
            let Some(pos) = adapters.iter().position(|a| Arc::ptr_eq(&a.source, source)) else {
                return false;
            };
            let offset: usize = adapters[..pos].iter().map(|a| a.pairs.len()).sum();
            (offset, adapters.remove(pos))
        };
        let (index, adapter) = removed;
        adapter.disconnect();

        let views = adapter.views();
        tracing::debug!(
            target: "prism::collection",
            count = views.len(),
            "source unregistered"
        );
        if !views.is_empty() {
            self.inner
                .notifier
                .dispatch(CollectionDelta::Removed { index, items: views });
        }
        true
    }

    /// Drops every source. External observers receive one `Reset`; the
    /// internal hook receives the qualified removal first.
    pub fn clear_sources(&self) {
        let adapters: Vec<SourceAdapter<S, V>> = {
            let mut guard = self.inner.adapters.lock();
            guard.drain(..).collect()
        };
        for adapter in &adapters {
            adapter.disconnect();
        }
        let views: Vec<Arc<V>> = adapters.iter().flat_map(|a| a.views()).collect();
        tracing::debug!(
            target: "prism::collection",
            count = views.len(),
            "all sources cleared"
        );
        self.inner.notifier.dispatch_reset(0, views);
    }

    /// Total number of view items across all sources.
    pub fn len(&self) -> usize {
        self.inner
            .adapters
            .lock()
            .iter()
            .map(|a| a.pairs.len())
            .sum()
    }

    /// Returns `true` when no source contributes any item.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of registered sources.
    pub fn source_count(&self) -> usize {
        self.inner.adapters.lock().len()
    }

    /// First view item of the output sequence.
    pub fn first(&self) -> Option<Arc<V>> {
        self.inner
            .adapters
            .lock()
            .iter()
            .find_map(|a| a.pairs.first().map(|(_, v)| v.clone()))
    }

    /// Snapshot of the output sequence.
    pub fn items(&self) -> Vec<Arc<V>> {
        self.inner
            .adapters
            .lock()
            .iter()
            .flat_map(|a| a.views())
            .collect()
    }

    /// Resolves a tracked view item by identity.
    pub fn find_view(&self, view: &Arc<V>) -> Option<Arc<V>> {
        self.inner.adapters.lock().iter().find_map(|a| {
            a.pairs
                .iter()
                .find(|(_, v)| Arc::ptr_eq(v, view))
                .map(|(_, v)| v.clone())
        })
    }
}

impl<S, V> CollectionManager<S, V>
where
    S: Clone + PartialEq + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    /// Resolves a source item to the view item produced for it.
    pub fn find(&self, source_item: &S) -> Option<Arc<V>> {
        self.inner.adapters.lock().iter().find_map(|a| {
            a.pairs
                .iter()
                .find(|(s, _)| s == source_item)
                .map(|(_, v)| v.clone())
        })
    }
}

impl<S, V> ManagerInner<S, V>
where
    S: Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    fn subscribe(this: &Arc<Self>, source: &Arc<SourceList<S>>) -> SourceConnections {
        let key = Arc::as_ptr(source) as usize;
        let signals = source.signals();

        let weak = Arc::downgrade(this);
        let inserted = signals.items_inserted.connect(move |(index, items)| {
            if let Some(inner) = weak.upgrade() {
                inner.on_source_inserted(key, *index, items);
            }
        });

        let weak = Arc::downgrade(this);
        let removed = signals.items_removed.connect(move |(index, items)| {
            if let Some(inner) = weak.upgrade() {
                inner.on_source_removed(key, *index, items.len());
            }
        });

        let weak = Arc::downgrade(this);
        let replaced = signals.item_replaced.connect(move |(index, _, new)| {
            if let Some(inner) = weak.upgrade() {
                inner.on_source_replaced(key, *index, new);
            }
        });

        let weak = Arc::downgrade(this);
        let reset = signals.source_reset.connect(move |_| {
            if let Some(inner) = weak.upgrade() {
                inner.on_source_reset(key);
            }
        });

        SourceConnections {
            inserted,
            removed,
            replaced,
            reset,
        }
    }

    /// Position and output offset of the adapter for `key`, under the lock.
    fn locate(adapters: &[SourceAdapter<S, V>], key: usize) -> Option<(usize, usize)> {
        let pos = adapters
            .iter()
            .position(|a| Arc::as_ptr(&a.source) as usize == key)?;
        let offset = adapters[..pos].iter().map(|a| a.pairs.len()).sum();
        Some((pos, offset))
    }

    fn on_source_inserted(&self, key: usize, index: usize, items: &[S]) {
        let views: Vec<Arc<V>> = items.iter().map(|s| (self.factory)(s)).collect();

        let output_index = {
            let mut adapters = self.adapters.lock();
            let Some((pos, offset)) = Self::locate(&adapters, key) else {
                tracing::warn!(target: "prism::collection", "delta from unregistered source");
                return;
            };
            let adapter = &mut adapters[pos];
            debug_assert!(index <= adapter.pairs.len(), "insertion index out of range");
            let index = index.min(adapter.pairs.len());
            adapter
                .pairs
                .splice(index..index, items.iter().cloned().zip(views.iter().cloned()));
            offset + index
        };

        if views.len() == 1 || self.bulk {
            self.notifier.dispatch(CollectionDelta::Inserted {
                index: output_index,
                items: views,
            });
        } else {
            for (k, view) in views.into_iter().enumerate() {
                self.notifier.dispatch(CollectionDelta::Inserted {
                    index: output_index + k,
                    items: vec![view],
                });
            }
        }
    }

    fn on_source_removed(&self, key: usize, index: usize, count: usize) {
        let (output_index, views) = {
            let mut adapters = self.adapters.lock();
            let Some((pos, offset)) = Self::locate(&adapters, key) else {
                tracing::warn!(target: "prism::collection", "delta from unregistered source");
                return;
            };
            let adapter = &mut adapters[pos];
            debug_assert!(
                index + count <= adapter.pairs.len(),
                "removal range out of bounds"
            );
            let end = (index + count).min(adapter.pairs.len());
            let index = index.min(end);
            let views: Vec<Arc<V>> = adapter
                .pairs
                .drain(index..end)
                .map(|(_, v)| v)
                .collect();
            (offset + index, views)
        };

        self.dispatch_removal(output_index, views);
    }

    /// Removal delta policy, shared by qualified range removals and resets.
    ///
    /// A single departing item is always an incremental `Removed`. A
    /// multi-item atomic removal reads as a structural `Reset` downstream
    /// (bulk), or is decomposed into per-item removals (non-bulk); either
    /// way the internal hook receives the items in qualified form.
    fn dispatch_removal(&self, output_index: usize, views: Vec<Arc<V>>) {
        match views.len() {
            0 => {}
            1 => self.notifier.dispatch(CollectionDelta::Removed {
                index: output_index,
                items: views,
            }),
            _ if self.bulk => self.notifier.dispatch_reset(output_index, views),
            _ => {
                // Sequentially patchable: each removal happens at the same slot.
                for view in views {
                    self.notifier.dispatch(CollectionDelta::Removed {
                        index: output_index,
                        items: vec![view],
                    });
                }
            }
        }
    }

    fn on_source_replaced(&self, key: usize, index: usize, new_item: &S) {
        let new_view = (self.factory)(new_item);

        let replaced = {
            let mut adapters = self.adapters.lock();
            let Some((pos, offset)) = Self::locate(&adapters, key) else {
                tracing::warn!(target: "prism::collection", "delta from unregistered source");
                return;
            };
            let adapter = &mut adapters[pos];
            if index >= adapter.pairs.len() {
                debug_assert!(false, "replacement index out of bounds");
                return;
            }
            let old_view = std::mem::replace(
                &mut adapter.pairs[index],
                (new_item.clone(), new_view.clone()),
            )
            .1;
            (offset + index, old_view)
        };

        let (output_index, old_view) = replaced;
        self.notifier.dispatch(CollectionDelta::Replaced {
            index: output_index,
            old: old_view,
            new: new_view,
        });
    }

    fn on_source_reset(&self, key: usize) {
        let (output_index, views) = {
            let mut adapters = self.adapters.lock();
            let Some((pos, offset)) = Self::locate(&adapters, key) else {
                tracing::warn!(target: "prism::collection", "delta from unregistered source");
                return;
            };
            let views: Vec<Arc<V>> = adapters[pos].pairs.drain(..).map(|(_, v)| v).collect();
            (offset, views)
        };

        // The adapter's own pair table qualifies the source's unqualified
        // reset, so the shared removal policy applies.
        self.dispatch_removal(output_index, views);
    }
}
