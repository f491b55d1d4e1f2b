//! Region directory: live regions, pending waiters, loading behaviors and
//! one-shot initial flows.
//!
//! Regions are created lazily by the UI layer, so navigation frequently
//! targets a region that does not exist yet. Callers suspend in
//! [`RegionDirectory::wait_for_region`] until the control registers. One
//! registration fans out to every waiter for that name.
//!
//! All tables sit behind a single lock, which is the point of serialization
//! between registrations and new waiters. The lock is never held while
//! calling into a region or the navigator.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use parking_lot::Mutex;
use stagehand_core::config::{InitialRegionFlow, RegionLoadingConfig, RegionLoadingOptions};
use stagehand_core::{ensure_name, NavigationError, RegionHandle, Result, Scheduler, ServiceResolver};
use tokio::sync::watch;

use crate::behavior::{BehaviorPhase, LoadingRegionBehavior};

/// The navigation surface background work calls back into.
#[async_trait]
pub trait Navigator: Send + Sync {
    /// Wait for `region`, then show `view_key` in it.
    async fn navigate(&self, region: &str, view_key: &str, timeout: Option<Duration>) -> Result<()>;

    /// Show `view_key` in an already known region, synchronously.
    fn present(&self, region: &str, handle: &RegionHandle, view_key: &str) -> Result<()>;
}

/// Navigate from a detached task; failures are logged, never raised.
pub(crate) async fn navigate_detached(
    navigator: &Weak<dyn Navigator>,
    region: &str,
    view_key: &str,
    purpose: &'static str,
) {
    let Some(navigator) = navigator.upgrade() else {
        tracing::warn!(region, view_key, purpose, "navigator dropped; skipping navigation");
        return;
    };
    if let Err(error) = navigator.navigate(region, view_key, None).await {
        tracing::warn!(region, view_key, purpose, %error, "background navigation failed");
    }
}

#[derive(Default)]
struct DirectoryState {
    regions: HashMap<String, RegionHandle>,
    waiters: HashMap<String, watch::Sender<Option<RegionHandle>>>,
    behaviors: HashMap<String, Arc<LoadingRegionBehavior>>,
    initial_flows_executed: HashSet<String>,
}

/// Registry of live regions and everything waiting on them.
pub struct RegionDirectory {
    state: Mutex<DirectoryState>,
    options: RegionLoadingOptions,
    scheduler: Arc<dyn Scheduler>,
    resolver: Arc<dyn ServiceResolver>,
    navigator: OnceLock<Weak<dyn Navigator>>,
}

impl RegionDirectory {
    /// Directory applying `options` to regions as they register.
    pub fn new(
        options: RegionLoadingOptions,
        scheduler: Arc<dyn Scheduler>,
        resolver: Arc<dyn ServiceResolver>,
    ) -> Self {
        Self {
            state: Mutex::new(DirectoryState::default()),
            options,
            scheduler,
            resolver,
            navigator: OnceLock::new(),
        }
    }

    /// Bind the navigator used by behaviors and initial flows.
    ///
    /// Only the first binding takes effect.
    pub fn bind_navigator(&self, navigator: Weak<dyn Navigator>) {
        if self.navigator.set(navigator).is_err() {
            tracing::warn!("region directory already has a navigator; ignoring rebind");
        }
    }

    fn navigator(&self) -> Weak<dyn Navigator> {
        match self.navigator.get() {
            Some(navigator) => navigator.clone(),
            None => {
                let unbound: Weak<dyn Navigator> = Weak::<Unbound>::new();
                unbound
            }
        }
    }

    /// Region policy this directory applies.
    pub fn options(&self) -> &RegionLoadingOptions {
        &self.options
    }

    /// Register (or replace) the region called `name`.
    ///
    /// On first registration a configured loading behavior is attached and
    /// shows its loading view before any waiter resumes. A configured
    /// initial flow is scheduled on the owner executor, at most once per
    /// name for the directory's lifetime, even across re-registration.
    pub fn register_region(&self, name: impl Into<String>, region: RegionHandle) -> Result<()> {
        let name = name.into();
        ensure_name(&name, "region name")?;
        let config = self.options.get(&name);

        let (behavior, flow) = {
            let mut state = self.state.lock();
            let behavior = match config {
                Some(config)
                    if config.has_loading_policy() && !state.behaviors.contains_key(&name) =>
                {
                    let behavior = Arc::new(LoadingRegionBehavior::new(
                        name.clone(),
                        config.clone(),
                        self.navigator(),
                        self.scheduler.clone(),
                    ));
                    state.behaviors.insert(name.clone(), behavior.clone());
                    Some(behavior)
                }
                _ => None,
            };
            let flow = config
                .and_then(|config| config.initial_flow.as_ref())
                .filter(|flow| !flow.is_empty())
                .filter(|_| state.initial_flows_executed.insert(name.clone()))
                .cloned();
            (behavior, flow)
        };

        if let Some(behavior) = behavior {
            behavior.attach(&region);
        }

        let (replaced, waiting) = {
            let mut state = self.state.lock();
            let replaced = state.regions.insert(name.clone(), region.clone()).is_some();
            let waiting = state.waiters.remove(&name).map(|waiter| {
                let waiting = waiter.receiver_count();
                waiter.send_replace(Some(region));
                waiting
            });
            (replaced, waiting.unwrap_or(0))
        };
        tracing::debug!(region = %name, replaced, waiting, "region registered");

        if let Some(flow) = flow {
            self.schedule_initial_flow(name, flow);
        }
        Ok(())
    }

    /// Remove a region. Its behavior and flow guard are kept.
    pub fn unregister_region(&self, name: &str) -> Option<RegionHandle> {
        let removed = self.state.lock().regions.remove(name);
        if removed.is_some() {
            tracing::debug!(region = name, "region unregistered");
        }
        removed
    }

    /// The live region called `name`, if registered.
    pub fn get_region(&self, name: &str) -> Option<RegionHandle> {
        self.state.lock().regions.get(name).cloned()
    }

    /// True if `name` is registered.
    pub fn is_registered(&self, name: &str) -> bool {
        self.state.lock().regions.contains_key(name)
    }

    /// Registered region names, sorted.
    pub fn registered_regions(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.lock().regions.keys().cloned().collect();
        names.sort();
        names
    }

    /// Region names with callers currently waiting, sorted.
    pub fn pending_waiters(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.lock().waiters.keys().cloned().collect();
        names.sort();
        names
    }

    /// Wait until `name` is registered.
    ///
    /// Returns immediately for a live region. `None` waits without bound.
    /// A timeout fails only this caller; other callers waiting on the same
    /// name keep their own deadline.
    pub async fn wait_for_region(
        &self,
        name: &str,
        timeout: Option<Duration>,
    ) -> Result<RegionHandle> {
        ensure_name(name, "region name")?;
        let mut waiter = {
            let mut state = self.state.lock();
            if let Some(region) = state.regions.get(name) {
                return Ok(region.clone());
            }
            match state.waiters.get(name) {
                Some(sender) => sender.subscribe(),
                None => {
                    let (sender, receiver) = watch::channel(None);
                    state.waiters.insert(name.to_string(), sender);
                    receiver
                }
            }
        };
        tracing::trace!(region = name, ?timeout, "waiting for region");

        let registered = async move {
            match waiter.wait_for(Option::is_some).await {
                Ok(region) => region.clone(),
                Err(_) => None,
            }
        };
        let outcome = match timeout {
            Some(limit) => tokio::time::timeout(limit, registered).await.ok(),
            None => Some(registered.await),
        };

        match outcome {
            Some(Some(region)) => Ok(region),
            Some(None) => Err(NavigationError::NavigatorUnavailable),
            None => {
                self.release_idle_waiter(name);
                let limit = timeout.unwrap_or_default();
                tracing::debug!(region = name, ?limit, "region wait timed out");
                Err(NavigationError::region_timeout(name, limit))
            }
        }
    }

    fn release_idle_waiter(&self, name: &str) {
        let mut state = self.state.lock();
        if state
            .waiters
            .get(name)
            .is_some_and(|sender| sender.receiver_count() == 0)
        {
            state.waiters.remove(name);
        }
    }

    fn behavior(&self, name: &str) -> Option<Arc<LoadingRegionBehavior>> {
        self.state.lock().behaviors.get(name).cloned()
    }

    /// Hold real content back until the loading view has been visible for
    /// its minimum display time. Returns at once for unmanaged regions.
    pub async fn admit_content(&self, name: &str, view_key: &str) {
        if let Some(behavior) = self.behavior(name) {
            behavior.admit_content(view_key).await;
        }
    }

    /// Tell the region's loading behavior that `view_key` is now shown.
    pub fn notify_navigation_completed(&self, name: &str, view_key: &str) {
        if let Some(behavior) = self.behavior(name) {
            behavior.on_navigation_completed(view_key);
        }
    }

    /// Phase of the loading behavior attached to `name`.
    pub fn behavior_phase(&self, name: &str) -> Option<BehaviorPhase> {
        self.behavior(name).map(|behavior| behavior.phase())
    }

    /// Policy configured for `name`.
    pub fn region_config(&self, name: &str) -> Option<&RegionLoadingConfig> {
        self.options.get(name)
    }

    fn schedule_initial_flow(&self, region: String, flow: InitialRegionFlow) {
        let navigator = self.navigator();
        let resolver = self.resolver.clone();
        self.scheduler
            .post(run_initial_flow(navigator, resolver, region, flow).boxed());
    }
}

impl std::fmt::Debug for RegionDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("RegionDirectory")
            .field("regions", &state.regions.len())
            .field("waiters", &state.waiters.len())
            .field("behaviors", &state.behaviors.len())
            .field("initial_flows_executed", &state.initial_flows_executed)
            .finish_non_exhaustive()
    }
}

/// Show the initial view, yield once so it renders, then navigate to the
/// first satisfied step.
async fn run_initial_flow(
    navigator: Weak<dyn Navigator>,
    resolver: Arc<dyn ServiceResolver>,
    region: String,
    flow: InitialRegionFlow,
) {
    if let Some(initial) = flow.initial_view_key() {
        navigate_detached(&navigator, &region, initial, "initial view").await;
        tokio::task::yield_now().await;
    }
    match flow.select_step(resolver).await {
        Some(step) => {
            tracing::info!(region = %region, view_key = step.view_key(), "initial flow step selected");
            navigate_detached(&navigator, &region, step.view_key(), "initial flow").await;
        }
        None if !flow.steps().is_empty() => {
            tracing::debug!(region = %region, "no initial flow step matched");
        }
        None => {}
    }
}

/// Stand-in target for the navigator before one is bound.
enum Unbound {}

#[async_trait]
impl Navigator for Unbound {
    async fn navigate(&self, _: &str, _: &str, _: Option<Duration>) -> Result<()> {
        match *self {}
    }

    fn present(&self, _: &str, _: &RegionHandle, _: &str) -> Result<()> {
        match *self {}
    }
}
