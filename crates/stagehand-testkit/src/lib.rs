//! Stagehand testing infrastructure.
//!
//! Test doubles for the region capabilities, view factories that produce
//! recognizable instances, a toggleable service for flow conditions, and
//! tracing setup for tests.
//!
//! ```toml
//! [dev-dependencies]
//! stagehand-testkit = { workspace = true }
//! ```

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

pub mod logging;
pub mod regions;
pub mod services;
pub mod views;

pub use logging::init_test_tracing;
pub use regions::{RecordingItemsRegion, RecordingRegion, Shown};
pub use services::FlagService;
pub use views::{counting_view_tag, view_tag, ViewTag};
