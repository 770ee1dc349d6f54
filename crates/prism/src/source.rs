//! Observable source sequences.
//!
//! A [`SourceList<T>`] is the mutable, ordered sequence a wrapping
//! collection projects from. Every mutation emits a delta through
//! [`SourceSignals`], carrying the affected items so observers never have
//! to diff the sequence themselves.
//!
//! Two kinds of removal exist and observers must distinguish them:
//!
//! - **Qualified**: [`remove_at`](SourceList::remove_at),
//!   [`remove`](SourceList::remove), [`remove_all`](SourceList::remove_all)
//!   report exactly which items left and where.
//! - **Unqualified**: [`clear`](SourceList::clear) and
//!   [`set_items`](SourceList::set_items) emit
//!   [`source_reset`](SourceSignals::source_reset) with no payload; the
//!   prior contents are not enumerated.
//!
//! # Example
//!
//! ```
//! use prism::SourceList;
//!
//! let list = SourceList::from_items(vec![1, 2, 3]);
//! list.signals().items_inserted.connect(|(index, items)| {
//!     println!("{} item(s) inserted at {}", items.len(), index);
//! });
//! list.push(4);
//! assert_eq!(list.len(), 4);
//! ```

use parking_lot::RwLock;

use prism_core::Signal;

/// Deltas emitted by a [`SourceList`].
///
/// Signals fire after the mutation is applied, so a handler reading the
/// list observes the post-change state.
pub struct SourceSignals<T> {
    /// Items entered the sequence. Args: (first index, inserted items).
    pub items_inserted: Signal<(usize, Vec<T>)>,

    /// Items left the sequence, qualified with the exact removed items.
    /// Args: (first index, removed items in sequence order).
    pub items_removed: Signal<(usize, Vec<T>)>,

    /// One item was replaced in place. Args: (index, old, new).
    pub item_replaced: Signal<(usize, T, T)>,

    /// The sequence was cleared or wholly replaced; prior contents are not
    /// enumerated.
    pub source_reset: Signal<()>,
}

impl<T: Clone + Send + 'static> SourceSignals<T> {
    fn new() -> Self {
        Self {
            items_inserted: Signal::new(),
            items_removed: Signal::new(),
            item_replaced: Signal::new(),
            source_reset: Signal::new(),
        }
    }
}

/// A mutable, ordered, change-notifying sequence of source items.
pub struct SourceList<T> {
    items: RwLock<Vec<T>>,
    signals: SourceSignals<T>,
}

impl<T: Clone + Send + Sync + 'static> Default for SourceList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + Sync + 'static> SourceList<T> {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::from_items(Vec::new())
    }

    /// Creates a list seeded with `items`. No signal is emitted.
    pub fn from_items(items: Vec<T>) -> Self {
        Self {
            items: RwLock::new(items),
            signals: SourceSignals::new(),
        }
    }

    /// The change signals for this list.
    pub fn signals(&self) -> &SourceSignals<T> {
        &self.signals
    }

    /// Number of items in the list.
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    /// Returns `true` if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    /// Clone of the item at `index`, if present.
    pub fn get(&self, index: usize) -> Option<T> {
        self.items.read().get(index).cloned()
    }

    /// Snapshot of the current contents.
    pub fn items(&self) -> Vec<T> {
        self.items.read().clone()
    }

    /// Appends one item.
    pub fn push(&self, item: T) {
        let index = {
            let mut items = self.items.write();
            items.push(item.clone());
            items.len() - 1
        };
        self.signals.items_inserted.emit((index, vec![item]));
    }

    /// Inserts one item at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index > len()`.
    pub fn insert(&self, index: usize, item: T) {
        self.items.write().insert(index, item.clone());
        self.signals.items_inserted.emit((index, vec![item]));
    }

    /// Appends `items` as one range operation, emitting a single
    /// `items_inserted` delta.
    pub fn append(&self, items: Vec<T>) {
        if items.is_empty() {
            return;
        }
        let index = {
            let mut current = self.items.write();
            let index = current.len();
            current.extend(items.iter().cloned());
            index
        };
        self.signals.items_inserted.emit((index, items));
    }

    /// Removes and returns the item at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn remove_at(&self, index: usize) -> T {
        let removed = self.items.write().remove(index);
        self.signals
            .items_removed
            .emit((index, vec![removed.clone()]));
        removed
    }

    /// Replaces the item at `index`, returning the previous value.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn replace(&self, index: usize, item: T) -> T {
        let old = {
            let mut items = self.items.write();
            std::mem::replace(&mut items[index], item.clone())
        };
        self.signals.item_replaced.emit((index, old.clone(), item));
        old
    }

    /// Applies `f` to the item at `index` and reports the edit as a
    /// replacement delta. Returns `None` when the index is out of bounds.
    pub fn modify<F, R>(&self, index: usize, f: F) -> Option<R>
    where
        F: FnOnce(&mut T) -> R,
    {
        let (old, new, result) = {
            let mut items = self.items.write();
            let slot = items.get_mut(index)?;
            let old = slot.clone();
            let result = f(slot);
            (old, slot.clone(), result)
        };
        self.signals.item_replaced.emit((index, old, new));
        Some(result)
    }

    /// Removes all items from the list with one unqualified reset.
    pub fn clear(&self) {
        self.items.write().clear();
        self.signals.source_reset.emit(());
    }

    /// Replaces the whole contents with one unqualified reset.
    pub fn set_items(&self, items: Vec<T>) {
        *self.items.write() = items;
        self.signals.source_reset.emit(());
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> SourceList<T> {
    /// Removes the first item equal to `item`. Returns `true` if found.
    pub fn remove(&self, item: &T) -> bool {
        let removed = {
            let mut items = self.items.write();
            match items.iter().position(|i| i == item) {
                Some(index) => {
                    let removed = items.remove(index);
                    Some((index, removed))
                }
                None => None,
            }
        };
        match removed {
            Some((index, removed)) => {
                self.signals.items_removed.emit((index, vec![removed]));
                true
            }
            None => false,
        }
    }

    /// Removes every listed item found in the list, as one range operation.
    ///
    /// Emits one qualified `items_removed` delta per maximal contiguous run
    /// of removed positions. Runs are reported highest-first so each delta's
    /// index is valid at the moment it is applied. Returns the number of
    /// items removed.
    pub fn remove_all(&self, items: &[T]) -> usize {
        let runs = {
            let mut current = self.items.write();

            // Resolve each requested item to a distinct position.
            let mut positions: Vec<usize> = Vec::new();
            for needle in items {
                let found = current
                    .iter()
                    .enumerate()
                    .find(|(i, candidate)| *candidate == needle && !positions.contains(i))
                    .map(|(i, _)| i);
                if let Some(pos) = found {
                    positions.push(pos);
                }
            }
            positions.sort_unstable();

            // Group into contiguous runs, capturing the removed items.
            let mut runs: Vec<(usize, Vec<T>)> = Vec::new();
            for &pos in &positions {
                match runs.last_mut() {
                    Some((start, run)) if *start + run.len() == pos => {
                        run.push(current[pos].clone());
                    }
                    _ => runs.push((pos, vec![current[pos].clone()])),
                }
            }

            for &pos in positions.iter().rev() {
                current.remove(pos);
            }
            runs
        };

        let removed = runs.iter().map(|(_, run)| run.len()).sum();
        for (start, run) in runs.into_iter().rev() {
            self.signals.items_removed.emit((start, run));
        }
        removed
    }
}
