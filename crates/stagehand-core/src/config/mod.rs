//! Per-region policy: loading/error views, timing, and initial flow.
//!
//! Policy is declared once before navigation starts, either through the
//! fluent builders in [`builders`] or a TOML document ([`file`]), and is
//! read-only afterwards.

pub mod builders;
pub mod file;
pub mod flow;

use std::collections::HashMap;
use std::time::Duration;

pub use builders::{
    ErrorBehaviorBuilder, InitialFlowBuilder, LoadingBehaviorBuilder, RegionBehaviorBuilder,
    RegionConfigurationBuilder,
};
pub use file::{RegionPolicy, RegionPolicyFile};
pub use flow::{ConditionOutcome, FlowCondition, FlowStep, InitialRegionFlow};

/// Default loading timeout.
pub const DEFAULT_LOADING_TIMEOUT: Duration = Duration::from_secs(30);

/// Loading, error and initial-flow policy for one region.
#[derive(Clone, Debug)]
pub struct RegionLoadingConfig {
    /// View shown as soon as the region registers
    pub loading_view_key: Option<String>,
    /// View shown when real content does not arrive within `timeout`
    pub error_view_key: Option<String>,
    /// Minimum time the loading view stays visible
    pub min_display_time: Duration,
    /// How long to wait for real content before failing over
    pub timeout: Duration,
    /// One-shot flow run the first time the region registers
    pub initial_flow: Option<InitialRegionFlow>,
}

impl Default for RegionLoadingConfig {
    fn default() -> Self {
        Self {
            loading_view_key: None,
            error_view_key: None,
            min_display_time: Duration::ZERO,
            timeout: DEFAULT_LOADING_TIMEOUT,
            initial_flow: None,
        }
    }
}

impl RegionLoadingConfig {
    /// True when a loading behavior should be attached to the region.
    ///
    /// Regions configured only with an initial flow get no behavior.
    pub fn has_loading_policy(&self) -> bool {
        self.loading_view_key.is_some() || self.error_view_key.is_some()
    }

    /// True if `view_key` is this region's loading or error view.
    pub fn is_placeholder(&self, view_key: &str) -> bool {
        self.loading_view_key.as_deref() == Some(view_key)
            || self.error_view_key.as_deref() == Some(view_key)
    }
}

/// Policy for every configured region, keyed by region name.
#[derive(Clone, Debug, Default)]
pub struct RegionLoadingOptions {
    regions: HashMap<String, RegionLoadingConfig>,
}

impl RegionLoadingOptions {
    /// Empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Policy for `region`, if configured.
    pub fn get(&self, region: &str) -> Option<&RegionLoadingConfig> {
        self.regions.get(region)
    }

    /// Policy for `region`, created with defaults on first access.
    pub fn entry(&mut self, region: impl Into<String>) -> &mut RegionLoadingConfig {
        self.regions.entry(region.into()).or_default()
    }

    /// Configure through the fluent builder.
    pub fn configure(&mut self, configure: impl FnOnce(&mut RegionConfigurationBuilder<'_>)) {
        let mut builder = RegionConfigurationBuilder::new(self);
        configure(&mut builder);
    }

    /// Configured region names, sorted.
    pub fn region_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.regions.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of configured regions.
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// True when no region is configured.
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}
