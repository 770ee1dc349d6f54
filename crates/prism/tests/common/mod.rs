//! Shared fixtures: an observable model and the view-model factory used
//! across the integration suite.
#![allow(dead_code)]

use std::sync::Arc;

use prism::ViewModel;
use prism_core::{Property, Signal};

/// A model with an identity and one observable property.
pub struct TestModel {
    pub id: i32,
    name: Property<String>,
    name_changed: Signal<()>,
}

impl TestModel {
    pub fn new(id: i32) -> Arc<Self> {
        Self::with_name(id, "")
    }

    pub fn with_name(id: i32, name: &str) -> Arc<Self> {
        Arc::new(Self {
            id,
            name: Property::new(name.to_string()),
            name_changed: Signal::new(),
        })
    }

    pub fn name(&self) -> String {
        self.name.get()
    }

    pub fn set_name(&self, name: &str) {
        if self.name.set(name.to_string()) {
            self.name_changed.emit(());
        }
    }

    pub fn name_changed(&self) -> &Signal<()> {
        &self.name_changed
    }
}

impl PartialEq for TestModel {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

pub type TestViewModel = ViewModel<Arc<TestModel>>;

/// Builds view models that observe their model's property changes.
pub fn view_model_factory(model: &Arc<TestModel>) -> Arc<TestViewModel> {
    let view_model = Arc::new(ViewModel::observing(model.clone()));
    let weak = Arc::downgrade(&view_model);
    model.name_changed().connect(move |_| {
        if let Some(view_model) = weak.upgrade() {
            view_model.notify_model_changed();
        }
    });
    view_model
}

pub fn models(ids: &[i32]) -> Vec<Arc<TestModel>> {
    ids.iter().map(|&id| TestModel::new(id)).collect()
}

pub fn model_ids(views: &[Arc<TestViewModel>]) -> Vec<i32> {
    use prism::ModelWrapper;
    views.iter().map(|v| v.model().id).collect()
}
