//! Stagehand navigation: the runtime half of region navigation.
//!
//! - [`RegionDirectory`]: live regions, waiters, loading behaviors and
//!   one-shot initial flows
//! - [`LoadingRegionBehavior`]: loading view, minimum display time and
//!   error fail-over for a managed region
//! - [`NavigationManager`]: resolves views and routes them into regions
//! - [`NavigationBuilder`]: collects configuration, then builds the stack
//! - [`TokioScheduler`], [`OwnerDispatcher`]: where background and
//!   owner-affine work runs
//!
//! ```no_run
//! use std::sync::Arc;
//! use stagehand_core::{Lifetime, RegionHandle};
//! use stagehand_navigation::NavigationBuilder;
//! # fn region() -> RegionHandle { unimplemented!() }
//!
//! # async fn run() -> stagehand_core::Result<()> {
//! let manager = NavigationBuilder::new()
//!     .register_view("Home", Lifetime::Singleton, |_| Arc::new("home"))
//!     .build();
//! manager.directory().register_region("Main", region())?;
//! manager.navigate("Main", "Home", None).await?;
//! # Ok(())
//! # }
//! ```

pub mod behavior;
pub mod builder;
pub mod directory;
pub mod manager;
pub mod region_map;
pub mod runtime;

pub use behavior::{BehaviorPhase, LoadingRegionBehavior};
pub use builder::{NavigationBuilder, StartupAction};
pub use directory::{Navigator, RegionDirectory};
pub use manager::{NavigationManager, DEFAULT_ITEM_STAGGER, DEFAULT_NAVIGATION_TIMEOUT};
pub use region_map::{CurrentView, RegionMap};
pub use runtime::{OwnerDispatcher, OwnerLoop, TaskRegistry, TokioScheduler};
