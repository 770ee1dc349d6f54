//! Selection on top of a wrapping collection.
//!
//! [`WithSelection`] layers a selection subsystem over
//! [`WrappingCollection`]: it owns the set of currently selected view
//! items, enforces a cardinality mode or a predicate policy, and reacts to
//! per-item selected-flag changes and to membership changes in the
//! underlying collection.
//!
//! Three event sources funnel into one non-reentrant state-transition
//! function:
//!
//! 1. collection membership changes (wire/unwire per-item listeners, apply
//!    auto-selection policy);
//! 2. explicit [`select`](WithSelection::select) /
//!    [`unselect`](WithSelection::unselect) calls;
//! 3. an item's own selected flag toggled by an external actor, marshaled
//!    onto the owning thread.
//!
//! A [`SelectionMode`] and a selection predicate are mutually exclusive:
//! under a predicate, membership is exactly the set of items matching it,
//! and explicit selection calls fail with
//! [`SelectionError::PredicateConfigured`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use prism::{SelectionMode, SourceList, ViewModel, WithSelection};
//!
//! let numbers = Arc::new(SourceList::from_items(vec![1, 2, 3]));
//!
//! let collection = WithSelection::new(
//!     |n: &i32| Arc::new(ViewModel::new(*n)),
//!     SelectionMode::One,
//!     false,
//! );
//! collection.add_source(&numbers);
//!
//! // `One` auto-selects the first item.
//! assert_eq!(collection.selection_count(), 1);
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use prism_core::{ConnectionId, Dispatcher, ReentranceGuard, Signal};

use crate::collection::WrappingCollection;
use crate::error::SelectionError;
use crate::item::Selectable;
use crate::manager::{CollectionDelta, CollectionManager};

/// How many items the selection may hold.
///
/// `One` and `OneOrMore` require a non-empty selection whenever the
/// collection is non-empty; `One` and `ZeroOrOne` allow at most one member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionMode {
    /// Exactly one item is selected whenever the collection is non-empty.
    One,
    /// At most one item is selected.
    ZeroOrOne,
    /// At least one item is selected whenever the collection is non-empty.
    OneOrMore,
    /// Any number of items may be selected (default).
    #[default]
    ZeroOrMore,
}

impl SelectionMode {
    /// Modes allowing at most one selected item.
    pub fn is_single(self) -> bool {
        matches!(self, Self::One | Self::ZeroOrOne)
    }

    /// Modes requiring a non-empty selection while the collection has items.
    pub fn requires_selection(self) -> bool {
        matches!(self, Self::One | Self::OneOrMore)
    }
}

/// Selection-derived properties announced through
/// [`WithSelection::selection_properties_changed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionProperty {
    /// The first selected item changed.
    SelectedItem,
    /// The selected-items sequence changed.
    SelectedItems,
    /// The number of selected items changed.
    SelectionCount,
}

/// Membership test for predicate-driven selection.
pub type SelectionPredicate<V> = Arc<dyn Fn(&V) -> bool + Send + Sync>;

/// Cancelable notification emitted before a selection state change.
///
/// Any observer may [`cancel`](Self::cancel) the change; the in-flight
/// mutation is then rolled back (the item's selected flag reverts to its
/// pre-change value) and the operation reports failure.
pub struct SelectionChanging<V> {
    item: Arc<V>,
    selecting: bool,
    cancelled: Arc<AtomicBool>,
}

impl<V> Clone for SelectionChanging<V> {
    fn clone(&self) -> Self {
        Self {
            item: self.item.clone(),
            selecting: self.selecting,
            cancelled: self.cancelled.clone(),
        }
    }
}

impl<V> SelectionChanging<V> {
    fn new(item: Arc<V>, selecting: bool) -> Self {
        Self {
            item,
            selecting,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The item whose selection state is about to change.
    pub fn item(&self) -> &Arc<V> {
        &self.item
    }

    /// `true` for a selection, `false` for a deselection.
    pub fn is_selecting(&self) -> bool {
        self.selecting
    }

    /// Vetoes the change.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether any observer vetoed the change.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Listener bookkeeping for one tracked item. Removal disconnects both
/// listeners synchronously, so a removed item retains no live subscription.
struct ItemWiring {
    selected_conn: ConnectionId,
    model_conn: Option<ConnectionId>,
}

struct SelectionState<V> {
    selected: Vec<Arc<V>>,
    predicate: Option<SelectionPredicate<V>>,
    wiring: HashMap<usize, ItemWiring>,
}

struct SelectionInner<S, V> {
    manager: CollectionManager<S, V>,
    mode: SelectionMode,
    guard: ReentranceGuard,
    dispatcher: Arc<Dispatcher>,
    state: Mutex<SelectionState<V>>,
    selection_changing: Signal<SelectionChanging<V>>,
    selection_changed: Signal<()>,
    selection_properties_changed: Signal<SelectionProperty>,
}

/// A wrapping collection with a selection subsystem.
///
/// Exposes the full [`WrappingCollection`] surface through `Deref`, plus
/// the selection surface described in the module documentation.
pub struct WithSelection<S, V: Selectable + 'static> {
    collection: WrappingCollection<S, V>,
    inner: Arc<SelectionInner<S, V>>,
}

impl<S, V> WithSelection<S, V>
where
    S: Clone + Send + Sync + 'static,
    V: Selectable + 'static,
{
    /// Creates a collection with the given factory and selection mode.
    pub fn new<F>(factory: F, mode: SelectionMode, bulk: bool) -> Self
    where
        F: Fn(&S) -> Arc<V> + Send + Sync + 'static,
    {
        Self::build(WrappingCollection::new(factory, bulk), mode, None)
    }

    /// Creates a collection whose selection is driven entirely by
    /// `predicate`: membership always equals the set of items matching it,
    /// and explicit selection calls are rejected.
    pub fn with_predicate<F, P>(factory: F, predicate: P, bulk: bool) -> Self
    where
        F: Fn(&S) -> Arc<V> + Send + Sync + 'static,
        P: Fn(&V) -> bool + Send + Sync + 'static,
    {
        Self::build(
            WrappingCollection::new(factory, bulk),
            SelectionMode::default(),
            Some(Arc::new(predicate)),
        )
    }

    fn build(
        collection: WrappingCollection<S, V>,
        mode: SelectionMode,
        predicate: Option<SelectionPredicate<V>>,
    ) -> Self {
        let inner = Arc::new(SelectionInner {
            manager: collection.manager().clone(),
            mode,
            guard: ReentranceGuard::new(),
            dispatcher: Dispatcher::current(),
            state: Mutex::new(SelectionState {
                selected: Vec::new(),
                predicate,
                wiring: HashMap::new(),
            }),
            selection_changing: Signal::new(),
            selection_changed: Signal::new(),
            selection_properties_changed: Signal::new(),
        });

        let weak = Arc::downgrade(&inner);
        collection.set_change_hook(Arc::new(move |delta| {
            if let Some(inner) = weak.upgrade() {
                SelectionInner::on_collection_changed(&inner, delta);
            }
        }));

        Self { collection, inner }
    }

    // =========================================================================
    // Explicit selection
    // =========================================================================

    /// Selects a tracked view item.
    ///
    /// Returns `Ok(false)` when the item is not tracked by the collection
    /// or the change was refused (cancelled, or a reentrant call), and
    /// `Err` when a selection predicate is configured.
    pub fn select(&self, item: &Arc<V>) -> Result<bool, SelectionError> {
        self.ensure_no_predicate()?;
        Ok(match self.inner.manager.find_view(item) {
            Some(resolved) => SelectionInner::handle_selection_change(&self.inner, &resolved, true),
            None => false,
        })
    }

    /// Unselects a tracked view item. Same contract as
    /// [`select`](Self::select).
    pub fn unselect(&self, item: &Arc<V>) -> Result<bool, SelectionError> {
        self.ensure_no_predicate()?;
        Ok(match self.inner.manager.find_view(item) {
            Some(resolved) => {
                SelectionInner::handle_selection_change(&self.inner, &resolved, false)
            }
            None => false,
        })
    }

    /// Unselects every selected item, one at a time, preserving the
    /// per-item transition guarantees (a mode requiring a non-empty
    /// selection re-establishes one auto-selected item).
    pub fn clear_selection(&self) -> Result<(), SelectionError> {
        self.ensure_no_predicate()?;
        SelectionInner::clear_selection_impl(&self.inner);
        Ok(())
    }

    // =========================================================================
    // Predicate
    // =========================================================================

    /// Whether a selection predicate is configured.
    pub fn has_selection_predicate(&self) -> bool {
        self.inner.state.lock().predicate.is_some()
    }

    /// Replaces the selection predicate.
    ///
    /// The current selection is cleared first; a non-`None` predicate is
    /// then evaluated over every tracked item, selecting the matches. This
    /// is the only way membership is established in predicate mode, and it
    /// is idempotent: installing an equivalent predicate twice yields the
    /// same selection.
    pub fn set_selection_predicate(&self, predicate: Option<SelectionPredicate<V>>) {
        self.inner.state.lock().predicate = predicate.clone();
        SelectionInner::clear_selection_impl(&self.inner);

        let Some(predicate) = predicate else { return };
        for item in self.inner.manager.items() {
            let key = Arc::as_ptr(&item) as usize;
            let needs_wiring = {
                let state = self.inner.state.lock();
                state
                    .wiring
                    .get(&key)
                    .is_some_and(|wiring| wiring.model_conn.is_none())
            };
            if needs_wiring {
                if let Some(conn) = SelectionInner::wire_model_listener(&self.inner, &item) {
                    if let Some(wiring) = self.inner.state.lock().wiring.get_mut(&key) {
                        wiring.model_conn = Some(conn);
                    }
                }
            }
            if predicate(&item) {
                SelectionInner::handle_selection_change(&self.inner, &item, true);
            }
        }
    }

    // =========================================================================
    // Selection queries
    // =========================================================================

    /// The first selected item, if any.
    pub fn selected_item(&self) -> Option<Arc<V>> {
        self.inner.state.lock().selected.first().cloned()
    }

    /// The selected items, in selection order.
    pub fn selected_items(&self) -> Vec<Arc<V>> {
        self.inner.state.lock().selected.clone()
    }

    /// Number of selected items.
    pub fn selection_count(&self) -> usize {
        self.inner.state.lock().selected.len()
    }

    /// The configured cardinality mode. Inert while a predicate is set.
    pub fn selection_mode(&self) -> SelectionMode {
        self.inner.mode
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Cancelable notification raised before each selection state change.
    pub fn selection_changing(&self) -> &Signal<SelectionChanging<V>> {
        &self.inner.selection_changing
    }

    /// Raised after each completed selection state change.
    pub fn selection_changed(&self) -> &Signal<()> {
        &self.inner.selection_changed
    }

    /// Property-change notifications for the selection-derived properties.
    pub fn selection_properties_changed(&self) -> &Signal<SelectionProperty> {
        &self.inner.selection_properties_changed
    }

    fn ensure_no_predicate(&self) -> Result<(), SelectionError> {
        if self.inner.state.lock().predicate.is_some() {
            Err(SelectionError::PredicateConfigured)
        } else {
            Ok(())
        }
    }
}

impl<S, V> WithSelection<S, V>
where
    S: Clone + PartialEq + Send + Sync + 'static,
    V: Selectable + 'static,
{
    /// Selects the view item produced for a source item. `Ok(false)` when
    /// the source item is not tracked.
    pub fn select_source(&self, source_item: &S) -> Result<bool, SelectionError> {
        self.ensure_no_predicate()?;
        Ok(match self.inner.manager.find(source_item) {
            Some(view) => SelectionInner::handle_selection_change(&self.inner, &view, true),
            None => false,
        })
    }

    /// Unselects the view item produced for a source item.
    pub fn unselect_source(&self, source_item: &S) -> Result<bool, SelectionError> {
        self.ensure_no_predicate()?;
        Ok(match self.inner.manager.find(source_item) {
            Some(view) => SelectionInner::handle_selection_change(&self.inner, &view, false),
            None => false,
        })
    }
}

impl<S, V: Selectable + 'static> std::ops::Deref for WithSelection<S, V> {
    type Target = WrappingCollection<S, V>;

    fn deref(&self) -> &Self::Target {
        &self.collection
    }
}

impl<S, V> SelectionInner<S, V>
where
    S: Clone + Send + Sync + 'static,
    V: Selectable + 'static,
{
    fn on_collection_changed(this: &Arc<Self>, delta: &CollectionDelta<V>) {
        match delta {
            CollectionDelta::Inserted { items, .. } => {
                for item in items {
                    Self::attach_item(this, item);
                }
            }
            CollectionDelta::Removed { items, .. } => {
                for item in items {
                    Self::detach_item(this, item);
                }
            }
            CollectionDelta::Replaced { old, new, .. } => {
                Self::detach_item(this, old);
                Self::attach_item(this, new);
            }
            CollectionDelta::Reset => {
                // The merge layer delivers qualified removals ahead of every
                // outward reset; reaching this arm means that contract broke.
                debug_assert!(false, "unqualified reset reached the selection hook");
                tracing::error!(
                    target: "prism::selection",
                    "unqualified reset reached the selection hook"
                );
            }
        }
    }

    /// Wires listeners for an item entering the collection and applies the
    /// auto-selection policy. Capabilities are resolved here, once.
    fn attach_item(this: &Arc<Self>, item: &Arc<V>) {
        let key = Arc::as_ptr(item) as usize;

        let selected_conn = item.is_selected_changed().connect({
            let weak = Arc::downgrade(this);
            let item = item.clone();
            move |&selecting| {
                let Some(inner) = weak.upgrade() else { return };
                // Stale toggle from an item that already left the collection.
                if inner.manager.find_view(&item).is_none() {
                    return;
                }
                let engine = inner.clone();
                let toggled = item.clone();
                inner.dispatcher.run_on_owning_thread(move || {
                    SelectionInner::handle_selection_change(&engine, &toggled, selecting);
                });
            }
        });

        let predicate = this.state.lock().predicate.clone();
        let model_conn = match &predicate {
            Some(_) => Self::wire_model_listener(this, item),
            None => None,
        };

        this.state.lock().wiring.insert(
            key,
            ItemWiring {
                selected_conn,
                model_conn,
            },
        );

        match predicate {
            Some(predicate) => {
                if predicate(item) {
                    Self::handle_selection_change(this, item, true);
                }
            }
            None => {
                let auto_select =
                    this.mode.requires_selection() && this.state.lock().selected.is_empty();
                if auto_select {
                    Self::handle_selection_change(this, item, true);
                }
            }
        }
    }

    /// Unwires an item leaving the collection and force-unselects it.
    fn detach_item(this: &Arc<Self>, item: &Arc<V>) {
        let key = Arc::as_ptr(item) as usize;
        let wiring = this.state.lock().wiring.remove(&key);
        if let Some(wiring) = wiring {
            item.is_selected_changed().disconnect(wiring.selected_conn);
            if let (Some(conn), Some(signal)) = (wiring.model_conn, item.model_changed()) {
                signal.disconnect(conn);
            }
        }

        let was_selected = this
            .state
            .lock()
            .selected
            .iter()
            .any(|s| Arc::ptr_eq(s, item));
        if was_selected {
            Self::handle_selection_change(this, item, false);
        }
    }

    /// Connects the item's model-observation hook, when it advertises one.
    fn wire_model_listener(this: &Arc<Self>, item: &Arc<V>) -> Option<ConnectionId> {
        let signal = item.model_changed()?;
        let weak = Arc::downgrade(this);
        let observed = item.clone();
        Some(signal.connect(move |_| {
            let Some(inner) = weak.upgrade() else { return };
            let Some(predicate) = inner.state.lock().predicate.clone() else {
                return;
            };
            let matches = predicate(&observed);
            SelectionInner::handle_selection_change(&inner, &observed, matches);
        }))
    }

    fn clear_selection_impl(this: &Arc<Self>) {
        let snapshot: Vec<Arc<V>> = this.state.lock().selected.clone();
        for item in snapshot {
            Self::handle_selection_change(this, &item, false);
        }
    }

    /// The single selection state-transition function.
    ///
    /// All three event sources end up here, under the reentrance guard:
    /// updating an item's flag below re-fires the item's change signal,
    /// whose listener routes back into this function and is refused by the
    /// guard.
    fn handle_selection_change(this: &Arc<Self>, item: &Arc<V>, selecting: bool) -> bool {
        let scope = this.guard.raise();
        if scope.is_reentrant() {
            return false;
        }

        {
            let state = this.state.lock();
            let already = state.selected.iter().any(|s| Arc::ptr_eq(s, item));
            if selecting == already {
                // Redundant transition, nothing to do.
                return true;
            }
        }

        let changing = SelectionChanging::new(item.clone(), selecting);
        this.selection_changing.emit(changing.clone());
        if changing.is_cancelled() {
            // Revert the item's flag to its pre-change value. The resulting
            // flag notification re-enters this function and is refused by
            // the guard.
            item.set_is_selected(!selecting);
            tracing::debug!(
                target: "prism::selection",
                selecting,
                "selection change cancelled by observer"
            );
            return false;
        }

        if selecting {
            let evict = this.state.lock().predicate.is_none() && this.mode.is_single();
            if evict {
                let prior: Vec<Arc<V>> = {
                    let mut state = this.state.lock();
                    state.selected.drain(..).collect()
                };
                for previous in &prior {
                    previous.set_is_selected(false);
                }
            }
            this.state.lock().selected.push(item.clone());
            item.set_is_selected(true);
        } else {
            {
                let mut state = this.state.lock();
                state.selected.retain(|s| !Arc::ptr_eq(s, item));
            }
            item.set_is_selected(false);

            let reselect = {
                let state = this.state.lock();
                state.predicate.is_none()
                    && this.mode.requires_selection()
                    && state.selected.is_empty()
            };
            if reselect {
                // Re-establish the non-empty invariant with the first item
                // of the output sequence.
                if let Some(first) = this.manager.first() {
                    this.state.lock().selected.push(first.clone());
                    first.set_is_selected(true);
                }
            }
        }

        this.selection_changed.emit(());
        this.selection_properties_changed
            .emit(SelectionProperty::SelectedItem);
        this.selection_properties_changed
            .emit(SelectionProperty::SelectedItems);
        this.selection_properties_changed
            .emit(SelectionProperty::SelectionCount);
        true
    }
}
