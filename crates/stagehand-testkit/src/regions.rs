//! Recording implementations of the region capabilities.

use std::sync::Arc;

use parking_lot::Mutex;
use stagehand_core::{ContentRegion, DataContext, ItemsRegion, ViewInstance};
use tokio::time::Instant;

use crate::views::ViewTag;

/// One `set` call as observed by a [`RecordingRegion`].
#[derive(Clone)]
pub struct Shown {
    /// Content handed to the region
    pub content: Option<ViewInstance>,
    /// Data context handed alongside it
    pub data_context: Option<DataContext>,
    /// When it arrived, on tokio's clock
    pub at: Instant,
}

impl Shown {
    /// Label of the content, if it is a [`ViewTag`].
    pub fn label(&self) -> Option<String> {
        self.content
            .as_ref()
            .and_then(|content| content.downcast_ref::<ViewTag>())
            .map(|tag| tag.0.clone())
    }
}

impl std::fmt::Debug for Shown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shown")
            .field("label", &self.label())
            .field("data_context", &self.data_context.is_some())
            .field("at", &self.at)
            .finish()
    }
}

/// Content region that records every `set`.
#[derive(Default)]
pub struct RecordingRegion {
    shown: Mutex<Vec<Shown>>,
}

impl RecordingRegion {
    /// Empty region.
    pub fn new() -> Self {
        Self::default()
    }

    /// New region behind an `Arc`, ready for `RegionHandle::from_content`.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Every `set` so far, oldest first.
    pub fn history(&self) -> Vec<Shown> {
        self.shown.lock().clone()
    }

    /// Non-empty contents, oldest first.
    pub fn contents(&self) -> Vec<ViewInstance> {
        self.shown
            .lock()
            .iter()
            .filter_map(|shown| shown.content.clone())
            .collect()
    }

    /// Labels of [`ViewTag`] contents, oldest first.
    pub fn labels(&self) -> Vec<String> {
        self.shown.lock().iter().filter_map(Shown::label).collect()
    }

    /// Label of the latest content.
    pub fn current_label(&self) -> Option<String> {
        self.shown.lock().last().and_then(Shown::label)
    }

    /// When `label` was first shown.
    pub fn shown_at(&self, label: &str) -> Option<Instant> {
        self.shown
            .lock()
            .iter()
            .find(|shown| shown.label().as_deref() == Some(label))
            .map(|shown| shown.at)
    }

    /// Data context of the latest `set`.
    pub fn last_data_context(&self) -> Option<DataContext> {
        self.shown.lock().last().and_then(|shown| shown.data_context.clone())
    }

    /// Number of `set` calls.
    pub fn set_count(&self) -> usize {
        self.shown.lock().len()
    }
}

impl ContentRegion for RecordingRegion {
    fn set(&self, content: Option<ViewInstance>, data_context: Option<DataContext>) {
        self.shown.lock().push(Shown {
            content,
            data_context,
            at: Instant::now(),
        });
    }
}

impl std::fmt::Debug for RecordingRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingRegion")
            .field("labels", &self.labels())
            .finish()
    }
}

#[derive(Default)]
struct ItemsState {
    items: Vec<(String, ViewInstance)>,
    selected: Option<usize>,
    mutations: usize,
}

/// Items region backed by a vector, counting every mutation.
#[derive(Default)]
pub struct RecordingItemsRegion {
    state: Mutex<ItemsState>,
}

impl RecordingItemsRegion {
    /// Region with no items.
    pub fn new() -> Self {
        Self::default()
    }

    /// New region behind an `Arc`, ready for `RegionHandle::from_items`.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// View keys of the current items, in order.
    pub fn keys(&self) -> Vec<String> {
        self.state.lock().items.iter().map(|(key, _)| key.clone()).collect()
    }

    /// Number of mutating calls received.
    pub fn mutations(&self) -> usize {
        self.state.lock().mutations
    }
}

fn same_instance(a: &ViewInstance, b: &ViewInstance) -> bool {
    std::ptr::eq(Arc::as_ptr(a).cast::<()>(), Arc::as_ptr(b).cast::<()>())
}

impl ItemsRegion for RecordingItemsRegion {
    fn add_item(&self, view_key: &str, item: ViewInstance) {
        let mut state = self.state.lock();
        state.items.push((view_key.to_string(), item));
        state.mutations += 1;
    }

    fn remove_item(&self, view_key: &str, item: &ViewInstance) {
        let mut state = self.state.lock();
        if let Some(index) = state
            .items
            .iter()
            .position(|(key, existing)| key == view_key && same_instance(existing, item))
        {
            state.items.remove(index);
        }
        state.mutations += 1;
    }

    fn clear_items(&self) {
        let mut state = self.state.lock();
        state.items.clear();
        state.selected = None;
        state.mutations += 1;
    }

    fn insert_item(&self, index: usize, view_key: &str, item: ViewInstance) {
        let mut state = self.state.lock();
        let index = index.min(state.items.len());
        state.items.insert(index, (view_key.to_string(), item));
        state.mutations += 1;
    }

    fn items(&self) -> Vec<ViewInstance> {
        self.state.lock().items.iter().map(|(_, item)| item.clone()).collect()
    }

    fn selected_index(&self) -> Option<usize> {
        self.state.lock().selected
    }

    fn set_selected_index(&self, index: Option<usize>) {
        self.state.lock().selected = index;
    }
}

impl std::fmt::Debug for RecordingItemsRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingItemsRegion")
            .field("keys", &self.keys())
            .field("selected", &self.selected_index())
            .finish()
    }
}
