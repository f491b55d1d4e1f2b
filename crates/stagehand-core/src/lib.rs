//! Stagehand core: the pure model behind region navigation.
//!
//! This crate holds everything that does not need a runtime:
//! - region capabilities ([`ContentRegion`], [`ItemsRegion`], [`RegionHandle`])
//! - the view registry with per-lifetime caching ([`ViewRegistry`])
//! - per-region loading policy and initial flows ([`config`])
//! - the error taxonomy ([`NavigationError`], [`ConfigError`])
//! - the scheduling seam ([`Scheduler`])
//!
//! The directory, loading behavior and navigation manager live in
//! `stagehand-navigation`, which supplies the tokio runtime.

pub mod config;
pub mod errors;
pub mod region;
pub mod resolver;
pub mod task;
pub mod view;

pub use config::{
    FlowCondition, FlowStep, InitialRegionFlow, RegionLoadingConfig, RegionLoadingOptions,
    RegionPolicyFile,
};
pub use errors::{ensure_name, ConfigError, NavigationError, Result};
pub use region::{
    ContentRegion, DataContext, ItemsRegion, RegionCapabilities, RegionHandle, ViewInstance,
};
pub use resolver::{NoServices, ResolveExt, ServiceMap, ServiceResolver};
pub use task::Scheduler;
pub use view::{Lifetime, ViewFactory, ViewRegistration, ViewRegistry};
