//! Capability traits for view items.
//!
//! A wrapping collection treats its view items as opaque. The selection
//! layer needs two optional capabilities, expressed as traits rather than
//! runtime type probing:
//!
//! - [`Selectable`]: the item carries a mutable is-selected flag with change
//!   notification. Required by
//!   [`WithSelection`](crate::selection::WithSelection).
//! - [`ModelWrapper`]: the item exposes the source-domain value it wraps.
//!   Selection predicates typically inspect the model through this.
//!
//! [`ViewModel<M>`] is a ready-made item type implementing both.

use prism_core::{Property, Signal};

/// A view item that carries a selected flag with change notification.
///
/// The flag is the item's own observable state (a check mark, a highlight);
/// the selection engine keeps it in sync with the central selection set. An
/// external actor may also toggle the flag directly, in which case the
/// change signal routes the toggle back into the engine.
pub trait Selectable: Send + Sync {
    /// Current value of the selected flag.
    fn is_selected(&self) -> bool;

    /// Updates the flag, returning `true` when the value actually changed.
    ///
    /// Implementations must emit [`is_selected_changed`](Self::is_selected_changed)
    /// exactly when this returns `true`.
    fn set_is_selected(&self, selected: bool) -> bool;

    /// Change notification for the selected flag.
    fn is_selected_changed(&self) -> &Signal<bool>;

    /// Change notification for the wrapped model, when the item wraps an
    /// observable one.
    ///
    /// Predicate-driven selection re-evaluates its predicate against the
    /// item on each emission. The capability is resolved once, when the
    /// item enters the collection; `None` means no re-evaluation hook.
    fn model_changed(&self) -> Option<&Signal<()>> {
        None
    }
}

/// A view item that exposes the source-domain value it was produced from.
pub trait ModelWrapper {
    /// The wrapped source type.
    type Model;

    /// The wrapped value.
    fn model(&self) -> &Self::Model;
}

/// A generic selectable wrapper around a model value.
///
/// Covers the common case where view items only add a selected flag (and
/// optionally model observation) on top of the source value. Richer view
/// items implement [`Selectable`] themselves.
///
/// # Example
///
/// ```
/// use prism::{ModelWrapper, Selectable, ViewModel};
///
/// let item = ViewModel::new("hello".to_string());
/// assert!(!item.is_selected());
/// assert_eq!(item.model(), "hello");
///
/// item.set_is_selected(true);
/// assert!(item.is_selected());
/// ```
pub struct ViewModel<M> {
    model: M,
    is_selected: Property<bool>,
    is_selected_changed: Signal<bool>,
    model_changed: Signal<()>,
    observes_model: bool,
}

impl<M: Send + Sync> ViewModel<M> {
    /// Wraps `model` without a model-observation hook.
    pub fn new(model: M) -> Self {
        Self {
            model,
            is_selected: Property::new(false),
            is_selected_changed: Signal::new(),
            model_changed: Signal::new(),
            observes_model: false,
        }
    }

    /// Wraps `model` and advertises a model-observation hook.
    ///
    /// The wrapper cannot watch an arbitrary `M` by itself; the code that
    /// owns the model forwards its change notifications by calling
    /// [`notify_model_changed`](Self::notify_model_changed), typically from
    /// a connection made in the view factory.
    pub fn observing(model: M) -> Self {
        Self {
            observes_model: true,
            ..Self::new(model)
        }
    }

    /// Reports that the wrapped model changed in a way observers may care
    /// about.
    pub fn notify_model_changed(&self) {
        self.model_changed.emit(());
    }
}

impl<M: Send + Sync> ModelWrapper for ViewModel<M> {
    type Model = M;

    fn model(&self) -> &M {
        &self.model
    }
}

impl<M: Send + Sync> Selectable for ViewModel<M> {
    fn is_selected(&self) -> bool {
        self.is_selected.get()
    }

    fn set_is_selected(&self, selected: bool) -> bool {
        if self.is_selected.set(selected) {
            self.is_selected_changed.emit(selected);
            true
        } else {
            false
        }
    }

    fn is_selected_changed(&self) -> &Signal<bool> {
        &self.is_selected_changed
    }

    fn model_changed(&self) -> Option<&Signal<()>> {
        self.observes_model.then_some(&self.model_changed)
    }
}
