//! Region capabilities implemented by UI controls.
//!
//! A region is a named placeholder that receives swapped-in content. The
//! navigation layer only talks to regions through the two traits here:
//!
//! - [`ContentRegion`]: accepts a single piece of content (plus an optional
//!   data context) and performs whatever transition the control wants.
//! - [`ItemsRegion`]: manages an ordered list of items.
//!
//! Capabilities are declared when a control registers, by building a
//! [`RegionHandle`] with the matching constructor. Item operations against a
//! handle without the items capability are no-ops.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A view instance produced by a view factory.
pub type ViewInstance = Arc<dyn Any + Send + Sync>;

/// Binding context handed to a region alongside its content.
pub type DataContext = Arc<dyn Any + Send + Sync>;

/// Single-content region capability.
pub trait ContentRegion: Send + Sync {
    /// Replace the region's content.
    ///
    /// Implementations start any transition animation and return without
    /// waiting for it to finish.
    fn set(&self, content: Option<ViewInstance>, data_context: Option<DataContext>);
}

/// Item-list region capability.
pub trait ItemsRegion: Send + Sync {
    /// Append an item.
    fn add_item(&self, view_key: &str, item: ViewInstance);

    /// Remove an item previously added under `view_key`.
    fn remove_item(&self, view_key: &str, item: &ViewInstance);

    /// Remove every item.
    fn clear_items(&self);

    /// Insert an item at `index`.
    fn insert_item(&self, index: usize, view_key: &str, item: ViewInstance);

    /// Snapshot of the current items, in display order.
    fn items(&self) -> Vec<ViewInstance>;

    /// Index of the selected item, if any.
    fn selected_index(&self) -> Option<usize>;

    /// Change the selection.
    fn set_selected_index(&self, index: Option<usize>);

    /// The selected item, if any.
    fn selected_item(&self) -> Option<ViewInstance> {
        let index = self.selected_index()?;
        self.items().get(index).cloned()
    }
}

/// Which capabilities a registered region carries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RegionCapabilities {
    /// Region accepts single content via [`ContentRegion::set`]
    pub content: bool,
    /// Region manages an item list via [`ItemsRegion`]
    pub items: bool,
}

/// A registered region together with its capability tags.
#[derive(Clone)]
pub struct RegionHandle {
    content: Option<Arc<dyn ContentRegion>>,
    items: Option<Arc<dyn ItemsRegion>>,
}

impl RegionHandle {
    /// Handle for a control that only accepts single content.
    pub fn from_content(region: Arc<dyn ContentRegion>) -> Self {
        Self {
            content: Some(region),
            items: None,
        }
    }

    /// Handle for a control that only manages an item list.
    pub fn from_items(region: Arc<dyn ItemsRegion>) -> Self {
        Self {
            content: None,
            items: Some(region),
        }
    }

    /// Handle for a control that supports both capabilities.
    pub fn from_both<R>(region: Arc<R>) -> Self
    where
        R: ContentRegion + ItemsRegion + 'static,
    {
        Self {
            content: Some(region.clone()),
            items: Some(region),
        }
    }

    /// Capability tags carried by this handle.
    pub fn capabilities(&self) -> RegionCapabilities {
        RegionCapabilities {
            content: self.content.is_some(),
            items: self.items.is_some(),
        }
    }

    /// The single-content capability, if declared.
    pub fn as_content(&self) -> Option<&Arc<dyn ContentRegion>> {
        self.content.as_ref()
    }

    /// The item-list capability, if declared.
    pub fn as_items(&self) -> Option<&Arc<dyn ItemsRegion>> {
        self.items.as_ref()
    }

    /// True when both handles point at the same control.
    pub fn same_region(&self, other: &RegionHandle) -> bool {
        self.identity() == other.identity()
    }

    fn identity(&self) -> *const () {
        match (&self.content, &self.items) {
            (Some(content), _) => Arc::as_ptr(content) as *const (),
            (None, Some(items)) => Arc::as_ptr(items) as *const (),
            (None, None) => std::ptr::null(),
        }
    }
}

impl fmt::Debug for RegionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegionHandle")
            .field("capabilities", &self.capabilities())
            .field("identity", &self.identity())
            .finish()
    }
}
