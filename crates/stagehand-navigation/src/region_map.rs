//! Current view per region, kept for introspection.

use std::collections::HashMap;

use parking_lot::RwLock;
use stagehand_core::ViewInstance;

/// The view last shown in a region.
#[derive(Clone)]
pub struct CurrentView {
    /// Key the view was resolved from
    pub view_key: String,
    /// The instance handed to the region
    pub view: ViewInstance,
}

impl std::fmt::Debug for CurrentView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrentView")
            .field("view_key", &self.view_key)
            .finish_non_exhaustive()
    }
}

/// Region name to current view.
#[derive(Debug, Default)]
pub struct RegionMap {
    views: RwLock<HashMap<String, CurrentView>>,
}

impl RegionMap {
    /// Empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `view` as shown in `region`, returning what it replaced.
    pub fn register(
        &self,
        region: impl Into<String>,
        view_key: impl Into<String>,
        view: ViewInstance,
    ) -> Option<CurrentView> {
        let current = CurrentView {
            view_key: view_key.into(),
            view,
        };
        self.views.write().insert(region.into(), current)
    }

    /// View currently shown in `region`.
    pub fn current_view(&self, region: &str) -> Option<CurrentView> {
        self.views.read().get(region).cloned()
    }

    /// Key of the view currently shown in `region`.
    pub fn current_view_key(&self, region: &str) -> Option<String> {
        self.views.read().get(region).map(|c| c.view_key.clone())
    }

    /// True if a view has been shown in `region`.
    pub fn has_view(&self, region: &str) -> bool {
        self.views.read().contains_key(region)
    }

    /// Drop the record for `region`.
    pub fn forget(&self, region: &str) -> Option<CurrentView> {
        self.views.write().remove(region)
    }

    /// Drop every record.
    pub fn clear(&self) {
        self.views.write().clear();
    }

    /// Number of regions with a recorded view.
    pub fn len(&self) -> usize {
        self.views.read().len()
    }

    /// True when nothing has been shown yet.
    pub fn is_empty(&self) -> bool {
        self.views.read().is_empty()
    }

    /// Regions with a recorded view, sorted.
    pub fn region_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.views.read().keys().cloned().collect();
        names.sort();
        names
    }
}
