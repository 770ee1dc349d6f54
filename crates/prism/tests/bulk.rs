//! Bulk-mode coalescing of range operations.

mod common;

use std::sync::Arc;

use parking_lot::Mutex;
use prism::{
    CollectionDelta, Selectable, SelectionMode, SourceList, WithSelection, WrappingCollection,
};

use common::{TestModel, TestViewModel, model_ids, models, view_model_factory};

type Delta = CollectionDelta<TestViewModel>;

fn record_deltas(
    collection: &WrappingCollection<Arc<TestModel>, TestViewModel>,
) -> Arc<Mutex<Vec<Delta>>> {
    let deltas = Arc::new(Mutex::new(Vec::new()));
    let recv = deltas.clone();
    collection.collection_changed().connect(move |delta| {
        recv.lock().push(delta.clone());
    });
    deltas
}

#[test]
fn range_add_then_single_remove_leaves_one_item() {
    let source = Arc::new(SourceList::new());
    let model_one = TestModel::new(4);
    let model_two = TestModel::new(5);

    let collection = WithSelection::new(view_model_factory, SelectionMode::ZeroOrOne, true);
    collection.add_source(&source);
    source.append(vec![model_one, model_two.clone()]);
    source.remove(&model_two);

    assert_eq!(model_ids(&collection.items()), vec![4]);
}

#[test]
fn range_add_then_range_remove_empties_collection() {
    let source = Arc::new(SourceList::new());
    let batch = models(&[4, 5]);

    let collection = WithSelection::new(view_model_factory, SelectionMode::ZeroOrOne, true);
    collection.add_source(&source);
    source.append(batch.clone());
    source.remove_all(&batch);

    assert!(collection.is_empty());
}

#[test]
fn range_add_raises_single_notification_with_all_wrappers() {
    let source = Arc::new(SourceList::new());
    let collection = WrappingCollection::new(view_model_factory, true);
    collection.add_source(&source);

    let deltas = record_deltas(&collection);
    source.append(models(&[1, 2, 3]));

    let deltas = deltas.lock();
    assert_eq!(deltas.len(), 1);
    match &deltas[0] {
        CollectionDelta::Inserted { index, items } => {
            assert_eq!(*index, 0);
            assert_eq!(model_ids(items), vec![1, 2, 3]);
        }
        other => panic!("unexpected delta {:?}", other),
    }
}

#[test]
fn single_item_range_remove_raises_incremental_notification() {
    let source = Arc::new(SourceList::new());
    let batch = models(&[1]);
    let collection = WrappingCollection::new(view_model_factory, true);
    collection.add_source(&source);
    source.append(batch.clone());

    let deltas = record_deltas(&collection);
    source.remove_all(&batch);

    let deltas = deltas.lock();
    assert_eq!(deltas.len(), 1);
    match &deltas[0] {
        CollectionDelta::Removed { index, items } => {
            assert_eq!(*index, 0);
            assert_eq!(model_ids(items), vec![1]);
        }
        other => panic!("unexpected delta {:?}", other),
    }
}

#[test]
fn multi_item_range_remove_raises_single_reset() {
    let source = Arc::new(SourceList::new());
    let batch = models(&[1, 2, 3]);
    let collection = WrappingCollection::new(view_model_factory, true);
    collection.add_source(&source);
    source.append(batch.clone());

    let deltas = record_deltas(&collection);
    source.remove_all(&batch);

    let deltas = deltas.lock();
    assert_eq!(deltas.len(), 1);
    assert!(matches!(&deltas[0], CollectionDelta::Reset));
}

#[test]
fn single_item_clear_raises_incremental_notification() {
    let source = Arc::new(SourceList::new());
    let collection = WrappingCollection::new(view_model_factory, true);
    collection.add_source(&source);
    source.append(models(&[1]));

    let deltas = record_deltas(&collection);
    source.clear();

    let deltas = deltas.lock();
    assert_eq!(deltas.len(), 1);
    assert!(matches!(
        &deltas[0],
        CollectionDelta::Removed { index: 0, items } if items.len() == 1
    ));
}

#[test]
fn multi_item_clear_raises_single_reset() {
    let source = Arc::new(SourceList::new());
    let collection = WrappingCollection::new(view_model_factory, true);
    collection.add_source(&source);
    source.append(models(&[1, 2, 3]));

    let deltas = record_deltas(&collection);
    source.clear();

    let deltas = deltas.lock();
    assert_eq!(deltas.len(), 1);
    assert!(matches!(&deltas[0], CollectionDelta::Reset));
    assert!(collection.is_empty());
}

#[test]
fn selection_survives_reset_consistently() {
    // A multi-item clear reaches external observers as a reset, but the
    // selection layer still unwires and unselects every removed item.
    let source = Arc::new(SourceList::new());
    let collection = WithSelection::new(view_model_factory, SelectionMode::ZeroOrMore, true);
    collection.add_source(&source);
    source.append(models(&[1, 2, 3]));

    let items = collection.items();
    collection.select(&items[0]).unwrap();
    collection.select(&items[1]).unwrap();
    assert_eq!(collection.selection_count(), 2);

    source.clear();

    assert_eq!(collection.selection_count(), 0);
    assert!(collection.selected_item().is_none());
    assert!(!items[0].is_selected());
}
