//! Navigation manager: the operation surface the application talks to.
//!
//! Every operation first waits for its target region through the
//! [`RegionDirectory`], so callers may navigate before the UI has created
//! the region. Views are resolved through the manager's [`ViewRegistry`].
//! Item operations only touch regions that carry the items capability and
//! are silent no-ops elsewhere.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use stagehand_core::{
    ensure_name, DataContext, ItemsRegion, Lifetime, NavigationError, RegionHandle, ResolveExt,
    Result, Scheduler, ServiceResolver, ViewInstance, ViewRegistry,
};

use crate::directory::{Navigator, RegionDirectory};
use crate::region_map::RegionMap;

/// Default wait for a target region.
pub const DEFAULT_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Default delay between items added by [`NavigationManager::add_items`].
pub const DEFAULT_ITEM_STAGGER: Duration = Duration::from_millis(150);

/// Resolves views and routes them into regions.
pub struct NavigationManager {
    views: ViewRegistry,
    directory: Arc<RegionDirectory>,
    resolver: Arc<dyn ServiceResolver>,
    scheduler: Arc<dyn Scheduler>,
    region_map: RegionMap,
    default_timeout: Duration,
    item_stagger: Duration,
}

impl NavigationManager {
    pub(crate) fn new(
        views: ViewRegistry,
        directory: Arc<RegionDirectory>,
        resolver: Arc<dyn ServiceResolver>,
        scheduler: Arc<dyn Scheduler>,
        default_timeout: Duration,
        item_stagger: Duration,
    ) -> Self {
        Self {
            views,
            directory,
            resolver,
            scheduler,
            region_map: RegionMap::new(),
            default_timeout,
            item_stagger,
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Views
    // ─────────────────────────────────────────────────────────────────────

    /// Register (or replace) a view key.
    pub fn register_view<F>(&self, view_key: impl Into<String>, lifetime: Lifetime, factory: F)
    where
        F: Fn(&dyn ServiceResolver) -> ViewInstance + Send + Sync + 'static,
    {
        self.views.register(view_key, lifetime, factory);
    }

    /// Register a typed view resolved from services or `T::default()`.
    pub fn register_type<T>(&self, view_key: impl Into<String>, lifetime: Lifetime)
    where
        T: Any + Default + Send + Sync,
    {
        self.views.register_type::<T>(view_key, lifetime);
    }

    /// Register a pre-built singleton view.
    pub fn register_instance(&self, view_key: impl Into<String>, instance: ViewInstance) {
        self.views.register_instance(view_key, instance);
    }

    /// Resolve `view_key` against the manager's services.
    pub fn resolve_view(&self, view_key: &str) -> Result<ViewInstance> {
        self.views.resolve(view_key, self.resolver.as_ref())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Navigation
    // ─────────────────────────────────────────────────────────────────────

    /// Show `view_key` in `region`, waiting up to `timeout` (or the
    /// manager's default) for the region to register.
    pub async fn navigate(
        &self,
        region: &str,
        view_key: &str,
        timeout: Option<Duration>,
    ) -> Result<()> {
        self.navigate_with_context(region, view_key, None, timeout)
            .await
    }

    /// Like [`NavigationManager::navigate`], also resolving a `VM` view
    /// model and handing it to the region as the data context.
    pub async fn navigate_with_model<VM>(
        &self,
        region: &str,
        view_key: &str,
        timeout: Option<Duration>,
    ) -> Result<()>
    where
        VM: Any + Send + Sync,
    {
        let model: DataContext = self
            .resolver
            .resolve::<VM>()
            .ok_or_else(NavigationError::view_model_not_found::<VM>)?;
        self.navigate_with_context(region, view_key, Some(model), timeout)
            .await
    }

    async fn navigate_with_context(
        &self,
        region: &str,
        view_key: &str,
        data_context: Option<DataContext>,
        timeout: Option<Duration>,
    ) -> Result<()> {
        ensure_name(view_key, "view key")?;
        let handle = self.wait_for(region, timeout).await?;
        let view = self.resolve_view(view_key)?;

        self.directory.admit_content(region, view_key).await;
        // The region may have been replaced while content was held back.
        let handle = self.directory.get_region(region).unwrap_or(handle);

        self.show(region, &handle, view_key, view, data_context);
        self.directory.notify_navigation_completed(region, view_key);
        tracing::debug!(region, view_key, "navigation completed");
        Ok(())
    }

    fn show(
        &self,
        region: &str,
        handle: &RegionHandle,
        view_key: &str,
        view: ViewInstance,
        data_context: Option<DataContext>,
    ) {
        match handle.as_content() {
            Some(content) => {
                content.set(Some(view.clone()), data_context);
                self.region_map.register(region, view_key, view);
            }
            None => {
                tracing::debug!(region, view_key, "region has no content capability; view not shown");
            }
        }
    }

    async fn wait_for(&self, region: &str, timeout: Option<Duration>) -> Result<RegionHandle> {
        let timeout = timeout.unwrap_or(self.default_timeout);
        self.directory.wait_for_region(region, Some(timeout)).await
    }

    // ─────────────────────────────────────────────────────────────────────
    // Items
    // ─────────────────────────────────────────────────────────────────────

    async fn items_region(
        &self,
        region: &str,
        operation: &'static str,
    ) -> Result<Option<Arc<dyn ItemsRegion>>> {
        let handle = self.wait_for(region, None).await?;
        let items = handle.as_items().cloned();
        if items.is_none() {
            tracing::debug!(region, operation, "region has no items capability; ignoring");
        }
        Ok(items)
    }

    /// Append the view for `view_key` to an items region.
    pub async fn add_item(&self, region: &str, view_key: &str) -> Result<()> {
        let Some(items) = self.items_region(region, "add_item").await? else {
            return Ok(());
        };
        let item = self.resolve_view(view_key)?;
        items.add_item(view_key, item);
        tracing::debug!(region, view_key, "item added");
        Ok(())
    }

    /// Append several views, pausing for the stagger delay between items.
    ///
    /// Every key is resolved before the first item is added.
    pub async fn add_items<I, K>(&self, region: &str, view_keys: I) -> Result<()>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let Some(items) = self.items_region(region, "add_items").await? else {
            return Ok(());
        };
        let resolved = view_keys
            .into_iter()
            .map(|key| {
                let key = key.as_ref().to_string();
                self.resolve_view(&key).map(|view| (key, view))
            })
            .collect::<Result<Vec<_>>>()?;

        for (index, (key, view)) in resolved.into_iter().enumerate() {
            if index > 0 && !self.item_stagger.is_zero() {
                tokio::time::sleep(self.item_stagger).await;
            }
            items.add_item(&key, view);
        }
        tracing::debug!(region, "items added");
        Ok(())
    }

    /// Remove `item`, previously added under `view_key`.
    pub async fn remove_item(&self, region: &str, view_key: &str, item: &ViewInstance) -> Result<()> {
        if let Some(items) = self.items_region(region, "remove_item").await? {
            items.remove_item(view_key, item);
            tracing::debug!(region, view_key, "item removed");
        }
        Ok(())
    }

    /// Remove every item.
    pub async fn clear_items(&self, region: &str) -> Result<()> {
        if let Some(items) = self.items_region(region, "clear_items").await? {
            items.clear_items();
            tracing::debug!(region, "items cleared");
        }
        Ok(())
    }

    /// Insert the view for `view_key` at `index`.
    pub async fn insert_item(&self, region: &str, index: usize, view_key: &str) -> Result<()> {
        let Some(items) = self.items_region(region, "insert_item").await? else {
            return Ok(());
        };
        let item = self.resolve_view(view_key)?;
        items.insert_item(index, view_key, item);
        tracing::debug!(region, view_key, index, "item inserted");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────

    /// The view registry.
    pub fn views(&self) -> &ViewRegistry {
        &self.views
    }

    /// The region directory.
    pub fn directory(&self) -> &Arc<RegionDirectory> {
        &self.directory
    }

    /// Current view per region.
    pub fn region_map(&self) -> &RegionMap {
        &self.region_map
    }

    /// Scheduler used for background and owner-affine work.
    pub fn scheduler(&self) -> &Arc<dyn Scheduler> {
        &self.scheduler
    }

    /// Default wait for a target region.
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Delay between staggered items.
    pub fn item_stagger(&self) -> Duration {
        self.item_stagger
    }
}

#[async_trait]
impl Navigator for NavigationManager {
    async fn navigate(&self, region: &str, view_key: &str, timeout: Option<Duration>) -> Result<()> {
        NavigationManager::navigate(self, region, view_key, timeout).await
    }

    fn present(&self, region: &str, handle: &RegionHandle, view_key: &str) -> Result<()> {
        let view = self.resolve_view(view_key)?;
        self.show(region, handle, view_key, view, None);
        Ok(())
    }
}

impl std::fmt::Debug for NavigationManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationManager")
            .field("views", &self.views)
            .field("directory", &self.directory)
            .field("default_timeout", &self.default_timeout)
            .field("item_stagger", &self.item_stagger)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::NavigationBuilder;
    use stagehand_core::ServiceMap;
    use stagehand_testkit::{view_tag, RecordingItemsRegion, RecordingRegion, ViewTag};

    struct ProfileModel {
        name: &'static str,
    }

    #[tokio::test]
    async fn navigate_sets_content_and_records_it() {
        let manager = NavigationBuilder::new()
            .register_view("Home", Lifetime::Singleton, view_tag("Home"))
            .build();
        let region = RecordingRegion::shared();
        manager
            .directory()
            .register_region("Main", RegionHandle::from_content(region.clone()))
            .unwrap();

        manager.navigate("Main", "Home", None).await.unwrap();
        assert_eq!(region.labels(), vec!["Home"]);
        assert_eq!(manager.region_map().current_view_key("Main").as_deref(), Some("Home"));
    }

    #[tokio::test]
    async fn unknown_view_fails_fast() {
        let manager = NavigationBuilder::new().build();
        let region = RecordingRegion::shared();
        manager
            .directory()
            .register_region("Main", RegionHandle::from_content(region.clone()))
            .unwrap();

        let err = manager.navigate("Main", "Nowhere", None).await.unwrap_err();
        assert_eq!(err, NavigationError::view_not_registered("Nowhere"));
        assert!(region.labels().is_empty());
    }

    #[tokio::test]
    async fn view_model_is_passed_as_data_context() {
        let services = ServiceMap::new().with(ProfileModel { name: "ada" });
        let manager = NavigationBuilder::new()
            .with_resolver(Arc::new(services))
            .register_view("Profile", Lifetime::Transient, view_tag("Profile"))
            .build();
        let region = RecordingRegion::shared();
        manager
            .directory()
            .register_region("Main", RegionHandle::from_content(region.clone()))
            .unwrap();

        manager
            .navigate_with_model::<ProfileModel>("Main", "Profile", None)
            .await
            .unwrap();
        let context = region.last_data_context().unwrap();
        let model = context.downcast_ref::<ProfileModel>().unwrap();
        assert_eq!(model.name, "ada");
    }

    #[tokio::test]
    async fn missing_view_model_is_reported() {
        let manager = NavigationBuilder::new()
            .register_view("Profile", Lifetime::Transient, view_tag("Profile"))
            .build();
        let err = manager
            .navigate_with_model::<ProfileModel>("Main", "Profile", None)
            .await
            .unwrap_err();
        assert!(matches!(err, NavigationError::ViewModelNotFound { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn item_operations_reach_items_region() {
        let manager = NavigationBuilder::new()
            .register_view("Card", Lifetime::Transient, view_tag("Card"))
            .register_view("Header", Lifetime::Transient, view_tag("Header"))
            .build();
        let items = RecordingItemsRegion::shared();
        manager
            .directory()
            .register_region("Board", RegionHandle::from_items(items.clone()))
            .unwrap();

        manager.add_item("Board", "Card").await.unwrap();
        manager.insert_item("Board", 0, "Header").await.unwrap();
        assert_eq!(items.keys(), vec!["Header", "Card"]);

        let header = items.items()[0].clone();
        manager.remove_item("Board", "Header", &header).await.unwrap();
        assert_eq!(items.keys(), vec!["Card"]);

        manager.clear_items("Board").await.unwrap();
        assert!(items.keys().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn add_items_resolves_every_key_first() {
        let manager = NavigationBuilder::new()
            .register_view("Card", Lifetime::Transient, view_tag("Card"))
            .build();
        let items = RecordingItemsRegion::shared();
        manager
            .directory()
            .register_region("Board", RegionHandle::from_items(items.clone()))
            .unwrap();

        let err = manager.add_items("Board", ["Card", "Ghost"]).await.unwrap_err();
        assert_eq!(err, NavigationError::view_not_registered("Ghost"));
        assert!(items.keys().is_empty());
    }

    #[tokio::test]
    async fn present_shows_without_waiting() {
        let manager = NavigationBuilder::new()
            .register_view("Loading", Lifetime::Singleton, view_tag("Loading"))
            .build();
        let region = RecordingRegion::shared();
        let handle = RegionHandle::from_content(region.clone());

        Navigator::present(&*manager, "Main", &handle, "Loading").unwrap();
        assert_eq!(region.labels(), vec!["Loading"]);
        let shown = region.contents();
        assert!(shown[0].downcast_ref::<ViewTag>().is_some());
    }
}
