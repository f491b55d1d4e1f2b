//! Loading/error state machine wrapped around a managed region.
//!
//! ```text
//! Loading ──content admitted──▶ ContentShown ──min display elapsed──▶ Completed
//!    │
//!    └──timeout──▶ TimedOut ──content admitted──▶ Completed
//! ```
//!
//! The loading view is shown synchronously when the behavior attaches. A
//! timer armed at attach switches the region to the error view if no real
//! content has been admitted within the configured timeout. Real content is
//! held back until the loading view has been visible for the minimum
//! display time.

use std::sync::{Arc, Weak};
use std::time::Duration;

use futures::FutureExt;
use parking_lot::Mutex;
use stagehand_core::{RegionHandle, RegionLoadingConfig, Scheduler};
use tokio::sync::watch;
use tokio::time::Instant;

use crate::directory::{navigate_detached, Navigator};

/// Where a loading behavior is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BehaviorPhase {
    /// Waiting for real content; the loading view (if any) is shown
    Loading,
    /// Real content admitted, minimum display time not yet confirmed
    ContentShown,
    /// Timer cancelled; the behavior is inert
    Completed,
    /// Timeout elapsed before real content arrived
    TimedOut,
}

/// Per-region loading behavior. Created at most once per region name.
pub struct LoadingRegionBehavior {
    region: String,
    config: RegionLoadingConfig,
    navigator: Weak<dyn Navigator>,
    scheduler: Arc<dyn Scheduler>,
    created_at: Instant,
    phase: Mutex<BehaviorPhase>,
    cancel: watch::Sender<bool>,
}

impl LoadingRegionBehavior {
    /// Create a behavior for `region`. The clock starts here.
    pub fn new(
        region: impl Into<String>,
        config: RegionLoadingConfig,
        navigator: Weak<dyn Navigator>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        let (cancel, _) = watch::channel(false);
        Self {
            region: region.into(),
            config,
            navigator,
            scheduler,
            created_at: Instant::now(),
            phase: Mutex::new(BehaviorPhase::Loading),
            cancel,
        }
    }

    /// Region this behavior manages.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> BehaviorPhase {
        *self.phase.lock()
    }

    /// Time since the behavior was created.
    pub fn elapsed(&self) -> Duration {
        self.created_at.elapsed()
    }

    fn mark_content_shown(&self) {
        let mut phase = self.phase.lock();
        if *phase == BehaviorPhase::Loading {
            *phase = BehaviorPhase::ContentShown;
        }
    }

    fn remaining_display_time(&self) -> Duration {
        self.config.min_display_time.saturating_sub(self.elapsed())
    }

    /// Show the loading view in `region` and arm the timeout timer.
    pub fn attach(self: &Arc<Self>, region: &RegionHandle) {
        if let Some(loading) = self.config.loading_view_key.as_deref() {
            match self.navigator.upgrade() {
                Some(navigator) => {
                    if let Err(error) = navigator.present(&self.region, region, loading) {
                        tracing::warn!(region = %self.region, view_key = loading, %error, "failed to show loading view");
                    }
                }
                None => {
                    tracing::warn!(region = %self.region, "navigator dropped; loading view not shown");
                }
            }
        }

        let behavior = self.clone();
        let mut cancelled = self.cancel.subscribe();
        let timeout = self.config.timeout;
        self.scheduler.spawn(
            async move {
                tokio::select! {
                    _ = tokio::time::sleep(timeout) => behavior.on_timeout(),
                    _ = cancelled.wait_for(|done| *done) => {}
                }
            }
            .boxed(),
        );
        tracing::debug!(region = %self.region, ?timeout, "loading behavior attached");
    }

    fn on_timeout(&self) {
        {
            let mut phase = self.phase.lock();
            if *phase != BehaviorPhase::Loading {
                return;
            }
            *phase = BehaviorPhase::TimedOut;
        }

        let Some(error) = self.config.error_view_key.clone() else {
            tracing::warn!(
                region = %self.region,
                timeout = ?self.config.timeout,
                "loading timed out with no error view configured; region stays on loading view"
            );
            return;
        };
        tracing::debug!(region = %self.region, view_key = %error, "loading timed out; showing error view");
        let navigator = self.navigator.clone();
        let region = self.region.clone();
        self.scheduler.post(
            async move {
                navigate_detached(&navigator, &region, &error, "error view").await;
            }
            .boxed(),
        );
    }

    /// Admit `view_key` into the region.
    ///
    /// Real content stops the error timer from firing and waits until the
    /// loading view has been visible for the minimum display time.
    /// Placeholder views pass straight through.
    pub async fn admit_content(&self, view_key: &str) {
        if self.config.is_placeholder(view_key) {
            return;
        }
        self.mark_content_shown();
        let remaining = self.remaining_display_time();
        if !remaining.is_zero() {
            tracing::trace!(region = %self.region, view_key, ?remaining, "holding content for minimum display time");
            tokio::time::sleep(remaining).await;
        }
    }

    /// React to `view_key` having been shown in the region.
    ///
    /// Safe to call repeatedly and concurrently.
    pub fn on_navigation_completed(self: &Arc<Self>, view_key: &str) {
        if self.config.is_placeholder(view_key) {
            return;
        }
        self.mark_content_shown();
        let remaining = self.remaining_display_time();
        if remaining.is_zero() {
            self.complete();
            return;
        }
        let behavior = self.clone();
        self.scheduler.spawn(
            async move {
                tokio::time::sleep(remaining).await;
                behavior.complete();
            }
            .boxed(),
        );
    }

    /// Cancel the timer and go inert. Later calls are no-ops.
    pub fn complete(&self) {
        {
            let mut phase = self.phase.lock();
            if *phase == BehaviorPhase::Completed {
                return;
            }
            *phase = BehaviorPhase::Completed;
        }
        self.cancel.send_replace(true);
        tracing::debug!(region = %self.region, elapsed = ?self.elapsed(), "loading behavior completed");
    }
}

impl std::fmt::Debug for LoadingRegionBehavior {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadingRegionBehavior")
            .field("region", &self.region)
            .field("phase", &self.phase())
            .field("elapsed", &self.elapsed())
            .finish_non_exhaustive()
    }
}
