//! View factories producing labelled instances.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use stagehand_core::{ServiceResolver, ViewInstance};

/// A view instance that only carries its label.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewTag(pub String);

impl ViewTag {
    /// The label.
    pub fn label(&self) -> &str {
        &self.0
    }
}

/// Factory producing a fresh [`ViewTag`] with `label` on every call.
pub fn view_tag(label: &str) -> impl Fn(&dyn ServiceResolver) -> ViewInstance + Send + Sync + 'static {
    let label = label.to_string();
    move |_| Arc::new(ViewTag(label.clone())) as ViewInstance
}

/// Like [`view_tag`], also counting factory invocations in `calls`.
pub fn counting_view_tag(
    label: &str,
    calls: Arc<AtomicUsize>,
) -> impl Fn(&dyn ServiceResolver) -> ViewInstance + Send + Sync + 'static {
    let label = label.to_string();
    move |_| {
        calls.fetch_add(1, Ordering::SeqCst);
        Arc::new(ViewTag(label.clone())) as ViewInstance
    }
}
