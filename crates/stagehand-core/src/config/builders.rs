//! Fluent configuration builders.
//!
//! ```
//! use std::time::Duration;
//! use stagehand_core::config::RegionLoadingOptions;
//!
//! let mut options = RegionLoadingOptions::new();
//! options.configure(|regions| {
//!     regions
//!         .for_region("Root")
//!         .with_loading_behavior(|loading| {
//!             loading
//!                 .loading("Loading")
//!                 .min_display_time(Duration::from_millis(500))
//!                 .error("Error")
//!                 .timeout(Duration::from_secs(10));
//!         })
//!         .with_initial_flow(|flow| {
//!             flow.show("Splash").then_if("Main", || false).then("Login");
//!         });
//! });
//! assert!(options.get("Root").is_some());
//! ```

use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::flow::{FlowCondition, FlowStep, InitialRegionFlow};
use super::{RegionLoadingConfig, RegionLoadingOptions};
use crate::resolver::{ResolveExt, ServiceResolver};

/// Entry point: select a region to configure.
pub struct RegionConfigurationBuilder<'a> {
    options: &'a mut RegionLoadingOptions,
}

impl<'a> RegionConfigurationBuilder<'a> {
    /// Builder writing into `options`.
    pub fn new(options: &'a mut RegionLoadingOptions) -> Self {
        Self { options }
    }

    /// Configure `region`, creating default policy on first use.
    pub fn for_region(&mut self, region: impl Into<String>) -> RegionBehaviorBuilder<'_> {
        RegionBehaviorBuilder {
            config: self.options.entry(region),
        }
    }
}

/// Attaches loading and flow policy to one region.
pub struct RegionBehaviorBuilder<'a> {
    config: &'a mut RegionLoadingConfig,
}

impl RegionBehaviorBuilder<'_> {
    /// Declare loading/error/timeout policy.
    pub fn with_loading_behavior(
        self,
        configure: impl FnOnce(&mut LoadingBehaviorBuilder<'_>),
    ) -> Self {
        let mut builder = LoadingBehaviorBuilder {
            config: &mut *self.config,
        };
        configure(&mut builder);
        self
    }

    /// Declare the initial flow, replacing any earlier one.
    pub fn with_initial_flow(self, configure: impl FnOnce(&mut InitialFlowBuilder)) -> Self {
        let mut builder = InitialFlowBuilder::new();
        configure(&mut builder);
        self.config.initial_flow = Some(builder.build());
        self
    }
}

/// Loading view, minimum display time and error view.
pub struct LoadingBehaviorBuilder<'a> {
    config: &'a mut RegionLoadingConfig,
}

impl LoadingBehaviorBuilder<'_> {
    /// View shown while the region waits for real content.
    pub fn loading(&mut self, view_key: impl Into<String>) -> &mut Self {
        self.config.loading_view_key = Some(view_key.into());
        self
    }

    /// Keep the loading view visible for at least `time`.
    pub fn min_display_time(&mut self, time: Duration) -> &mut Self {
        self.config.min_display_time = time;
        self
    }

    /// Content timeout, for regions without an error view.
    pub fn timeout(&mut self, time: Duration) -> &mut Self {
        self.config.timeout = time;
        self
    }

    /// View shown when content does not arrive in time.
    pub fn error(&mut self, view_key: impl Into<String>) -> ErrorBehaviorBuilder<'_> {
        self.config.error_view_key = Some(view_key.into());
        ErrorBehaviorBuilder {
            config: &mut *self.config,
        }
    }
}

/// Error fail-over timing.
pub struct ErrorBehaviorBuilder<'a> {
    config: &'a mut RegionLoadingConfig,
}

impl ErrorBehaviorBuilder<'_> {
    /// Switch to the error view after `time` without real content.
    pub fn timeout(&mut self, time: Duration) -> &mut Self {
        self.config.timeout = time;
        self
    }
}

/// Builds an [`InitialRegionFlow`].
#[derive(Default)]
pub struct InitialFlowBuilder {
    flow: InitialRegionFlow,
}

impl InitialFlowBuilder {
    /// Empty flow builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// View shown first, before any step is evaluated.
    pub fn show(&mut self, view_key: impl Into<String>) -> &mut Self {
        self.flow.set_initial(view_key.into());
        self
    }

    /// Unconditional step.
    pub fn then(&mut self, view_key: impl Into<String>) -> &mut Self {
        self.flow.push(FlowStep::new(view_key));
        self
    }

    /// Step guarded by a plain predicate.
    pub fn then_if<F>(&mut self, view_key: impl Into<String>, when: F) -> &mut Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.step(view_key, FlowCondition::from_fn(move |_| Ok(when())))
    }

    /// Step guarded by a predicate over the resolver.
    pub fn then_when<F>(&mut self, view_key: impl Into<String>, when: F) -> &mut Self
    where
        F: Fn(&dyn ServiceResolver) -> bool + Send + Sync + 'static,
    {
        self.step(view_key, FlowCondition::from_fn(move |resolver| Ok(when(resolver))))
    }

    /// Step guarded by a predicate over a resolved service.
    ///
    /// A missing service is a condition failure, so the step is skipped.
    pub fn then_with<S, F>(&mut self, view_key: impl Into<String>, when: F) -> &mut Self
    where
        S: Any + Send + Sync,
        F: Fn(&S) -> bool + Send + Sync + 'static,
    {
        self.step(
            view_key,
            FlowCondition::from_fn(move |resolver| {
                let service = resolver.resolve::<S>().ok_or_else(|| {
                    anyhow::anyhow!("service {} is not registered", std::any::type_name::<S>())
                })?;
                Ok(when(&service))
            }),
        )
    }

    /// Step guarded by an async predicate.
    pub fn then_async<F, Fut>(&mut self, view_key: impl Into<String>, when: F) -> &mut Self
    where
        F: Fn(Arc<dyn ServiceResolver>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<bool>> + Send + 'static,
    {
        self.step(view_key, FlowCondition::new(when))
    }

    /// Step with a prebuilt condition.
    pub fn step(&mut self, view_key: impl Into<String>, condition: FlowCondition) -> &mut Self {
        self.flow.push(FlowStep::when(view_key, condition));
        self
    }

    /// Finish the flow.
    pub fn build(self) -> InitialRegionFlow {
        self.flow
    }
}
