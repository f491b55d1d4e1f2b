//! Loading view, minimum display time and error fail-over.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use stagehand_core::{Lifetime, RegionHandle};
use stagehand_navigation::{BehaviorPhase, NavigationBuilder, NavigationManager, OwnerDispatcher};
use stagehand_testkit::{init_test_tracing, view_tag, RecordingRegion};
use tokio::time::Instant;

fn builder() -> NavigationBuilder {
    init_test_tracing();
    ["Loading", "Error", "Home", "Login"]
        .into_iter()
        .fold(NavigationBuilder::new(), |builder, key| {
            builder.register_view(key, Lifetime::Singleton, view_tag(key))
        })
}

fn with_loading(error: Option<&'static str>, min_display: Duration, timeout: Duration) -> Arc<NavigationManager> {
    builder()
        .configure_regions(move |regions| {
            regions.for_region("Root").with_loading_behavior(|loading| {
                loading.loading("Loading").min_display_time(min_display);
                match error {
                    Some(error) => {
                        loading.error(error).timeout(timeout);
                    }
                    None => {
                        loading.timeout(timeout);
                    }
                }
            });
        })
        .build()
}

fn register(manager: &NavigationManager) -> Arc<RecordingRegion> {
    let region = RecordingRegion::shared();
    manager
        .directory()
        .register_region("Root", RegionHandle::from_content(region.clone()))
        .unwrap();
    region
}

#[tokio::test(start_paused = true)]
async fn loading_view_is_shown_at_registration() {
    let manager = with_loading(Some("Error"), Duration::ZERO, Duration::from_secs(30));
    let region = register(&manager);

    assert_eq!(region.labels(), vec!["Loading"]);
    assert_eq!(
        manager.directory().behavior_phase("Root"),
        Some(BehaviorPhase::Loading)
    );
}

#[tokio::test(start_paused = true)]
async fn content_waits_for_minimum_display_time() {
    let manager = with_loading(Some("Error"), Duration::from_secs(2), Duration::from_secs(30));
    let start = Instant::now();
    let region = register(&manager);

    tokio::time::sleep(Duration::from_millis(500)).await;
    manager.navigate("Root", "Home", None).await.unwrap();

    assert_eq!(region.labels(), vec!["Loading", "Home"]);
    let shown = region.shown_at("Home").unwrap();
    assert!(shown - start >= Duration::from_secs(2));
    assert_eq!(
        manager.directory().behavior_phase("Root"),
        Some(BehaviorPhase::Completed)
    );
}

#[tokio::test(start_paused = true)]
async fn late_content_is_not_delayed() {
    let manager = with_loading(Some("Error"), Duration::from_secs(1), Duration::from_secs(30));
    let region = register(&manager);

    tokio::time::sleep(Duration::from_secs(3)).await;
    let before = Instant::now();
    manager.navigate("Root", "Home", None).await.unwrap();

    assert_eq!(region.shown_at("Home").unwrap(), before);
}

#[tokio::test(start_paused = true)]
async fn timeout_switches_to_error_view_once() {
    let manager = with_loading(Some("Error"), Duration::ZERO, Duration::from_secs(1));
    let start = Instant::now();
    let region = register(&manager);

    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(region.labels(), vec!["Loading", "Error"]);
    assert!(region.shown_at("Error").unwrap() - start >= Duration::from_secs(1));
    assert_eq!(
        manager.directory().behavior_phase("Root"),
        Some(BehaviorPhase::TimedOut)
    );
}

#[tokio::test(start_paused = true)]
async fn timeout_without_error_view_stays_on_loading() {
    let manager = with_loading(None, Duration::ZERO, Duration::from_secs(1));
    let region = register(&manager);

    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(region.labels(), vec!["Loading"]);
    assert_eq!(
        manager.directory().behavior_phase("Root"),
        Some(BehaviorPhase::TimedOut)
    );
}

#[tokio::test(start_paused = true)]
async fn content_before_timeout_prevents_error_view() {
    let manager = with_loading(Some("Error"), Duration::ZERO, Duration::from_secs(1));
    let region = register(&manager);

    tokio::time::sleep(Duration::from_millis(500)).await;
    manager.navigate("Root", "Home", None).await.unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(region.labels(), vec!["Loading", "Home"]);
}

#[tokio::test(start_paused = true)]
async fn content_admitted_during_hold_prevents_error_view() {
    // Timeout fires while the real content is still being held back.
    let manager = with_loading(Some("Error"), Duration::from_secs(3), Duration::from_secs(1));
    let region = register(&manager);

    manager.navigate("Root", "Home", None).await.unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(region.labels(), vec!["Loading", "Home"]);
}

#[tokio::test(start_paused = true)]
async fn recovers_from_error_view_when_content_arrives() {
    let manager = with_loading(Some("Error"), Duration::ZERO, Duration::from_secs(1));
    let region = register(&manager);

    tokio::time::sleep(Duration::from_secs(2)).await;
    manager.navigate("Root", "Home", None).await.unwrap();

    assert_eq!(region.labels(), vec!["Loading", "Error", "Home"]);
    assert_eq!(
        manager.directory().behavior_phase("Root"),
        Some(BehaviorPhase::Completed)
    );
}

#[tokio::test(start_paused = true)]
async fn behavior_is_attached_once_per_region() {
    let manager = with_loading(Some("Error"), Duration::ZERO, Duration::from_secs(30));
    let first = register(&manager);
    manager.navigate("Root", "Home", None).await.unwrap();

    let second = register(&manager);
    assert_eq!(first.labels(), vec!["Loading", "Home"]);
    assert!(second.labels().is_empty());
}

#[tokio::test(start_paused = true)]
async fn initial_flow_content_respects_loading_policy() {
    let manager = builder()
        .configure_regions(|regions| {
            regions
                .for_region("Root")
                .with_loading_behavior(|loading| {
                    loading
                        .loading("Loading")
                        .min_display_time(Duration::from_secs(1));
                })
                .with_initial_flow(|flow| {
                    flow.then("Login");
                });
        })
        .build();
    let start = Instant::now();
    let region = register(&manager);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(region.labels(), vec!["Loading", "Login"]);
    assert!(region.shown_at("Login").unwrap() - start >= Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn error_view_is_posted_to_owner() {
    let (dispatcher, mut owner) = OwnerDispatcher::new();
    let manager = builder()
        .with_scheduler(Arc::new(dispatcher))
        .configure_regions(|regions| {
            regions.for_region("Root").with_loading_behavior(|loading| {
                loading.loading("Loading").error("Error").timeout(Duration::from_secs(1));
            });
        })
        .build();
    let region = register(&manager);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(region.labels(), vec!["Loading"]);
    assert_eq!(owner.pending(), 1);

    owner.run_until_idle().await;
    assert_eq!(region.labels(), vec!["Loading", "Error"]);
}
