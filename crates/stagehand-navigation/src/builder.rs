//! Two-phase construction of the navigation stack.
//!
//! Views, region policy, collaborators and startup actions are collected
//! into a [`NavigationBuilder`] first; [`NavigationBuilder::build`] then
//! materializes the [`RegionDirectory`] and [`NavigationManager`] in one
//! step and runs the startup actions.
//!
//! The default [`TokioScheduler`] binds to the runtime current at `build`.
//! Hosts that build off the runtime pass
//! [`TokioScheduler::with_handle`] through
//! [`NavigationBuilder::with_scheduler`]. After that, registrations and
//! navigations may come from any thread.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures::FutureExt;
use stagehand_core::config::RegionConfigurationBuilder;
use stagehand_core::{
    Lifetime, NoServices, RegionLoadingOptions, RegionPolicyFile, Scheduler, ServiceResolver,
    ViewInstance, ViewRegistry,
};

use crate::directory::{navigate_detached, Navigator, RegionDirectory};
use crate::manager::{NavigationManager, DEFAULT_ITEM_STAGGER, DEFAULT_NAVIGATION_TIMEOUT};
use crate::runtime::TokioScheduler;

type StartupHook = Box<dyn FnOnce(&Arc<NavigationManager>) + Send>;

/// Work run once, right after the manager is built.
pub enum StartupAction {
    /// Navigate `region` to `view_key` once it registers
    Navigate {
        /// Target region
        region: String,
        /// View to show
        view_key: String,
    },
    /// Arbitrary setup against the built manager
    Custom(StartupHook),
}

impl fmt::Debug for StartupAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Navigate { region, view_key } => f
                .debug_struct("Navigate")
                .field("region", region)
                .field("view_key", view_key)
                .finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Collects everything the navigation stack needs before it exists.
pub struct NavigationBuilder {
    views: ViewRegistry,
    options: RegionLoadingOptions,
    resolver: Option<Arc<dyn ServiceResolver>>,
    scheduler: Option<Arc<dyn Scheduler>>,
    default_timeout: Duration,
    item_stagger: Duration,
    startup: Vec<StartupAction>,
}

impl NavigationBuilder {
    /// Builder with no views, no region policy and default tunables.
    pub fn new() -> Self {
        Self {
            views: ViewRegistry::new(),
            options: RegionLoadingOptions::new(),
            resolver: None,
            scheduler: None,
            default_timeout: DEFAULT_NAVIGATION_TIMEOUT,
            item_stagger: DEFAULT_ITEM_STAGGER,
            startup: Vec::new(),
        }
    }

    /// Register a view key with an explicit factory.
    pub fn register_view<F>(self, view_key: impl Into<String>, lifetime: Lifetime, factory: F) -> Self
    where
        F: Fn(&dyn ServiceResolver) -> ViewInstance + Send + Sync + 'static,
    {
        self.views.register(view_key, lifetime, factory);
        self
    }

    /// Register a typed view resolved from services or `T::default()`.
    pub fn register_type<T>(self, view_key: impl Into<String>, lifetime: Lifetime) -> Self
    where
        T: Any + Default + Send + Sync,
    {
        self.views.register_type::<T>(view_key, lifetime);
        self
    }

    /// Register a pre-built singleton view.
    pub fn register_instance(self, view_key: impl Into<String>, instance: ViewInstance) -> Self {
        self.views.register_instance(view_key, instance);
        self
    }

    /// Declare per-region loading policy and initial flows.
    pub fn configure_regions(
        mut self,
        configure: impl FnOnce(&mut RegionConfigurationBuilder<'_>),
    ) -> Self {
        self.options.configure(configure);
        self
    }

    /// Merge a policy document; its values win over earlier configuration.
    pub fn with_policy_file(mut self, file: &RegionPolicyFile) -> Self {
        file.apply_to(&mut self.options);
        self
    }

    /// Service resolver for typed views, view models and flow conditions.
    pub fn with_resolver(mut self, resolver: Arc<dyn ServiceResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Scheduler for timers and owner-affine work.
    pub fn with_scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Default wait for a target region.
    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Delay between items added together.
    pub fn item_stagger(mut self, stagger: Duration) -> Self {
        self.item_stagger = stagger;
        self
    }

    /// Navigate `region` to `view_key` once it registers.
    pub fn navigate_on_start(mut self, region: impl Into<String>, view_key: impl Into<String>) -> Self {
        self.startup.push(StartupAction::Navigate {
            region: region.into(),
            view_key: view_key.into(),
        });
        self
    }

    /// Run `hook` against the built manager.
    pub fn on_start(mut self, hook: impl FnOnce(&Arc<NavigationManager>) + Send + 'static) -> Self {
        self.startup.push(StartupAction::Custom(Box::new(hook)));
        self
    }

    /// Queued startup actions.
    pub fn startup_actions(&self) -> &[StartupAction] {
        &self.startup
    }

    /// Materialize the directory and manager, then run startup actions in
    /// declaration order.
    pub fn build(self) -> Arc<NavigationManager> {
        let scheduler: Arc<dyn Scheduler> = match self.scheduler {
            Some(scheduler) => scheduler,
            None => Arc::new(TokioScheduler::new()),
        };
        let resolver: Arc<dyn ServiceResolver> = match self.resolver {
            Some(resolver) => resolver,
            None => Arc::new(NoServices),
        };

        let directory = Arc::new(RegionDirectory::new(
            self.options,
            scheduler.clone(),
            resolver.clone(),
        ));
        let manager = Arc::new(NavigationManager::new(
            self.views,
            directory.clone(),
            resolver,
            scheduler.clone(),
            self.default_timeout,
            self.item_stagger,
        ));
        let navigator: Weak<dyn Navigator> = Arc::downgrade(&manager) as Weak<dyn Navigator>;
        directory.bind_navigator(navigator.clone());

        for action in self.startup {
            match action {
                StartupAction::Navigate { region, view_key } => {
                    tracing::info!(region = %region, view_key = %view_key, "queueing startup navigation");
                    let navigator = navigator.clone();
                    scheduler.post(
                        async move {
                            navigate_detached(&navigator, &region, &view_key, "startup").await;
                        }
                        .boxed(),
                    );
                }
                StartupAction::Custom(hook) => hook(&manager),
            }
        }
        manager
    }
}

impl Default for NavigationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NavigationBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigationBuilder")
            .field("views", &self.views)
            .field("regions", &self.options.region_names())
            .field("default_timeout", &self.default_timeout)
            .field("item_stagger", &self.item_stagger)
            .field("startup", &self.startup)
            .finish_non_exhaustive()
    }
}
