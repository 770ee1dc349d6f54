//! Selection behavior over a live collection.

mod common;

use std::sync::Arc;

use prism::{
    ModelWrapper, Selectable, SelectionError, SelectionMode, SourceList, WithSelection,
};

use common::{TestModel, TestViewModel, model_ids, models, view_model_factory};

type Selection = WithSelection<Arc<TestModel>, TestViewModel>;

fn selection_over(
    mode: SelectionMode,
    source: &Arc<SourceList<Arc<TestModel>>>,
) -> Selection {
    let collection = WithSelection::new(view_model_factory, mode, false);
    collection.add_source(source);
    collection
}

fn assert_empty_selection(collection: &Selection) {
    assert!(collection.selected_item().is_none());
    assert!(collection.selected_items().is_empty());
    assert_eq!(collection.selection_count(), 0);
}

#[test]
fn item_selected_then_unselected_leaves_empty_selection() {
    let source = Arc::new(SourceList::from_items(models(&[1, 2, 3])));
    let collection = selection_over(SelectionMode::ZeroOrMore, &source);
    let first = collection.items().first().cloned().unwrap();

    assert_eq!(collection.select(&first), Ok(true));
    assert_eq!(collection.unselect(&first), Ok(true));

    assert_empty_selection(&collection);
}

#[test]
fn multiple_mode_keeps_both_items_selected() {
    let source = Arc::new(SourceList::from_items(models(&[1, 2, 3])));
    let collection = selection_over(SelectionMode::ZeroOrMore, &source);
    let items = collection.items();

    collection.select(&items[0]).unwrap();
    collection.select(&items[1]).unwrap();

    let selected = collection.selected_item().unwrap();
    assert!(Arc::ptr_eq(&selected, &items[0]));
    assert_eq!(model_ids(&collection.selected_items()), vec![1, 2]);
    assert_eq!(collection.selection_count(), 2);
}

#[test]
fn single_mode_keeps_only_latest_selection() {
    let source = Arc::new(SourceList::from_items(models(&[1, 2, 3])));
    let collection = selection_over(SelectionMode::One, &source);
    let items = collection.items();

    collection.select(&items[0]).unwrap();
    collection.select(&items[1]).unwrap();

    let selected = collection.selected_item().unwrap();
    assert!(Arc::ptr_eq(&selected, &items[1]));
    assert_eq!(collection.selection_count(), 1);
    assert!(!items[0].is_selected());
}

#[test]
fn removing_selected_items_model_empties_selection() {
    let source = Arc::new(SourceList::from_items(models(&[1, 2, 3])));
    let collection = selection_over(SelectionMode::ZeroOrMore, &source);
    let first = collection.items().first().cloned().unwrap();

    collection.select(&first).unwrap();
    source.remove_at(0);

    assert_empty_selection(&collection);
    assert!(!first.is_selected());
}

#[test]
fn select_by_source_item_resolves_view_model() {
    let items = models(&[1, 2, 3]);
    let source = Arc::new(SourceList::from_items(items.clone()));
    let collection = selection_over(SelectionMode::ZeroOrMore, &source);

    assert_eq!(collection.select_source(&items[1]), Ok(true));

    assert_eq!(collection.selected_item().unwrap().model().id, 2);
    assert_eq!(collection.select_source(&TestModel::new(42)), Ok(false));

    assert_eq!(collection.unselect_source(&items[1]), Ok(true));
    assert_empty_selection(&collection);
}

#[test]
fn clear_selection_empties_two_selected_items() {
    let source = Arc::new(SourceList::from_items(models(&[1, 2, 3])));
    let collection = selection_over(SelectionMode::ZeroOrMore, &source);
    let items = collection.items();

    collection.select(&items[0]).unwrap();
    collection.select(&items[1]).unwrap();
    collection.clear_selection().unwrap();

    assert_empty_selection(&collection);
}

#[test]
fn clear_selection_under_required_mode_reselects_one_item() {
    let source = Arc::new(SourceList::from_items(models(&[1, 2, 3])));
    let collection = selection_over(SelectionMode::One, &source);

    collection.clear_selection().unwrap();

    // The non-empty invariant wins over the clear: exactly one auto-selected
    // item remains.
    assert_eq!(collection.selection_count(), 1);
    let reselected = collection.selected_item().unwrap();
    let first = collection.items().first().cloned().unwrap();
    assert!(Arc::ptr_eq(&reselected, &first));
}

#[test]
fn predicate_selects_matching_items_on_add_source() {
    let source = Arc::new(SourceList::from_items(models(&[1, 2, 3])));

    let collection: Selection =
        WithSelection::with_predicate(view_model_factory, |vm: &TestViewModel| vm.model().id >= 2, false);
    collection.add_source(&source);

    let items = collection.items();
    let selected = collection.selected_item().unwrap();
    assert!(Arc::ptr_eq(&selected, &items[1]));
    assert_eq!(model_ids(&collection.selected_items()), vec![2, 3]);
    assert_eq!(collection.selection_count(), 2);
}

#[test]
fn predicate_tracks_items_added_later() {
    let source = Arc::new(SourceList::new());
    let collection: Selection =
        WithSelection::with_predicate(view_model_factory, |vm: &TestViewModel| vm.model().id >= 2, false);
    collection.add_source(&source);

    source.push(TestModel::new(1));
    source.push(TestModel::new(5));

    assert_eq!(model_ids(&collection.selected_items()), vec![5]);
}

#[test]
fn explicit_select_with_predicate_fails() {
    let source = Arc::new(SourceList::from_items(models(&[1, 2, 3])));
    let collection: Selection =
        WithSelection::with_predicate(view_model_factory, |vm: &TestViewModel| vm.model().id >= 2, false);
    collection.add_source(&source);

    let selected = collection.selected_item().unwrap();
    assert_eq!(
        collection.select(&selected),
        Err(SelectionError::PredicateConfigured)
    );
}

#[test]
fn explicit_unselect_with_predicate_fails() {
    let source = Arc::new(SourceList::from_items(models(&[1, 2, 3])));
    let collection: Selection =
        WithSelection::with_predicate(view_model_factory, |vm: &TestViewModel| vm.model().id >= 2, false);
    collection.add_source(&source);

    let selected = collection.selected_item().unwrap();
    assert_eq!(
        collection.unselect(&selected),
        Err(SelectionError::PredicateConfigured)
    );
    assert_eq!(
        collection.clear_selection(),
        Err(SelectionError::PredicateConfigured)
    );
}

#[test]
fn model_change_flipping_predicate_unselects_item() {
    let source = Arc::new(SourceList::from_items(vec![
        TestModel::with_name(1, "First"),
        TestModel::with_name(2, "Second"),
        TestModel::with_name(3, "Third"),
    ]));

    let collection: Selection = WithSelection::with_predicate(
        view_model_factory,
        |vm: &TestViewModel| vm.model().name().len() <= 5,
        false,
    );
    collection.add_source(&source);

    // "First" and "Third" match initially.
    assert_eq!(collection.selection_count(), 2);

    let first = collection.items().first().cloned().unwrap();
    first.model().set_name("FirstOne");

    let last = collection.items().last().cloned().unwrap();
    let selected = collection.selected_item().unwrap();
    assert!(Arc::ptr_eq(&selected, &last));
    assert_eq!(model_ids(&collection.selected_items()), vec![3]);
    assert_eq!(collection.selection_count(), 1);
}

#[test]
fn model_change_flipping_predicate_selects_item() {
    let source = Arc::new(SourceList::from_items(vec![
        TestModel::with_name(1, "too long to match"),
    ]));

    let collection: Selection = WithSelection::with_predicate(
        view_model_factory,
        |vm: &TestViewModel| vm.model().name().len() <= 5,
        false,
    );
    collection.add_source(&source);
    assert_empty_selection(&collection);

    collection.items()[0].model().set_name("ok");

    assert_eq!(collection.selection_count(), 1);
}

#[test]
fn external_flag_toggle_flows_into_selection() {
    let source = Arc::new(SourceList::from_items(models(&[1, 2])));
    let collection = selection_over(SelectionMode::ZeroOrMore, &source);
    let items = collection.items();

    items[0].set_is_selected(true);
    assert_eq!(collection.selection_count(), 1);

    items[0].set_is_selected(false);
    assert_empty_selection(&collection);
}

#[test]
fn removed_item_toggles_are_ignored() {
    let source = Arc::new(SourceList::from_items(models(&[1, 2])));
    let collection = selection_over(SelectionMode::ZeroOrMore, &source);
    let first = collection.items().first().cloned().unwrap();

    source.remove_at(0);
    // The listener was unwired on removal; this flips only the local flag.
    first.set_is_selected(true);

    assert_empty_selection(&collection);
}
