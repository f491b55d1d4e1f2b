//! Scheduler implementations on tokio.
//!
//! - [`TaskRegistry`]: tracks background tasks and aborts them on shutdown.
//!   It remembers the runtime it was created on, so hosts may call in from
//!   threads that are not tokio workers.
//! - [`TokioScheduler`]: `spawn` lands on tokio; `post` feeds one owner task
//!   on the runtime.
//! - [`OwnerDispatcher`] + [`OwnerLoop`]: `post` enqueues onto a loop the
//!   host drives from its UI thread, so region capabilities are only ever
//!   touched there.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use parking_lot::Mutex;
use stagehand_core::Scheduler;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

// ─────────────────────────────────────────────────────────────────────────────
// Task registry
// ─────────────────────────────────────────────────────────────────────────────

/// Shared registry for background navigation work.
#[derive(Debug)]
pub struct TaskRegistry {
    runtime: Option<Handle>,
    shutdown_tx: watch::Sender<bool>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl TaskRegistry {
    /// Create an empty registry bound to the current runtime, if any.
    pub fn new() -> Self {
        Self::bound_to(Handle::try_current().ok())
    }

    /// Create an empty registry that spawns onto `runtime`.
    pub fn with_handle(runtime: Handle) -> Self {
        Self::bound_to(Some(runtime))
    }

    fn bound_to(runtime: Option<Handle>) -> Self {
        let (shutdown_tx, _shutdown_rx) = watch::channel(false);
        Self {
            runtime,
            shutdown_tx,
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Spawn a task that ends early when the registry shuts down.
    ///
    /// Without a bound runtime the caller's runtime is used; with neither
    /// the task is dropped and a warning is logged.
    pub fn spawn_cancellable<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        if *shutdown_rx.borrow() {
            return;
        }
        let Some(runtime) = self
            .runtime
            .clone()
            .or_else(|| Handle::try_current().ok())
        else {
            tracing::warn!("no tokio runtime available; dropping background task");
            return;
        };
        let handle = runtime.spawn(async move {
            tokio::select! {
                _ = shutdown_rx.changed() => {}
                _ = fut => {}
            }
        });
        let mut handles = self.handles.lock();
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
    }

    /// Number of tasks that have not finished yet.
    pub fn active(&self) -> usize {
        self.handles.lock().iter().filter(|h| !h.is_finished()).count()
    }

    /// True once [`TaskRegistry::shutdown`] ran.
    pub fn is_shut_down(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    /// Stop every tracked task.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send_replace(true);
        for handle in self.handles.lock().drain(..) {
            handle.abort();
        }
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TaskRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tokio scheduler
// ─────────────────────────────────────────────────────────────────────────────

/// Scheduler that treats the tokio runtime as the owner executor.
///
/// Posted work is handed to a single [`OwnerLoop`] task, so it is first
/// polled in submission order even on a multi-threaded runtime.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    tasks: Arc<TaskRegistry>,
    owner: OwnerDispatcher,
}

impl TokioScheduler {
    /// Scheduler with its own task registry on the current runtime.
    pub fn new() -> Self {
        Self::with_registry(Arc::new(TaskRegistry::new()))
    }

    /// Scheduler whose tasks run on `runtime`.
    pub fn with_handle(runtime: Handle) -> Self {
        Self::with_registry(Arc::new(TaskRegistry::with_handle(runtime)))
    }

    /// Scheduler sharing `tasks`.
    pub fn with_registry(tasks: Arc<TaskRegistry>) -> Self {
        let (owner, owner_loop) = OwnerDispatcher::with_registry(tasks.clone());
        tasks.spawn_cancellable(owner_loop.run());
        Self { tasks, owner }
    }

    /// The underlying registry.
    pub fn tasks(&self) -> &Arc<TaskRegistry> {
        &self.tasks
    }
}

impl Default for TokioScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for TokioScheduler {
    fn spawn(&self, fut: BoxFuture<'static, ()>) {
        self.tasks.spawn_cancellable(fut);
    }

    fn post(&self, fut: BoxFuture<'static, ()>) {
        self.owner.post(fut);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Owner dispatcher
// ─────────────────────────────────────────────────────────────────────────────

/// Scheduler whose `post` targets an [`OwnerLoop`].
#[derive(Debug, Clone)]
pub struct OwnerDispatcher {
    owner_tx: mpsc::UnboundedSender<BoxFuture<'static, ()>>,
    background: Arc<TaskRegistry>,
}

impl OwnerDispatcher {
    /// Create a dispatcher and the loop that drains it.
    ///
    /// Background work goes to the runtime current at this call.
    pub fn new() -> (Self, OwnerLoop) {
        Self::with_registry(Arc::new(TaskRegistry::new()))
    }

    /// Create a dispatcher whose background work goes to `background`.
    pub fn with_registry(background: Arc<TaskRegistry>) -> (Self, OwnerLoop) {
        let (owner_tx, owner_rx) = mpsc::unbounded_channel();
        let dispatcher = Self {
            owner_tx,
            background,
        };
        let owner_loop = OwnerLoop {
            owner_rx,
            in_flight: FuturesUnordered::new(),
        };
        (dispatcher, owner_loop)
    }

    /// Registry holding this dispatcher's background tasks.
    pub fn background(&self) -> &Arc<TaskRegistry> {
        &self.background
    }
}

impl Scheduler for OwnerDispatcher {
    fn spawn(&self, fut: BoxFuture<'static, ()>) {
        self.background.spawn_cancellable(fut);
    }

    fn post(&self, fut: BoxFuture<'static, ()>) {
        if self.owner_tx.send(fut).is_err() {
            tracing::warn!("owner loop is gone; dropping posted task");
        }
    }
}

/// Single-task executor for work posted to the owner.
///
/// Posted futures run concurrently with each other but are all polled from
/// the task that drives the loop.
pub struct OwnerLoop {
    owner_rx: mpsc::UnboundedReceiver<BoxFuture<'static, ()>>,
    in_flight: FuturesUnordered<BoxFuture<'static, ()>>,
}

impl OwnerLoop {
    /// Drive posted work until every dispatcher is dropped and all
    /// in-flight work has finished.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                next = self.owner_rx.recv() => match next {
                    Some(fut) => self.in_flight.push(fut),
                    None => break,
                },
                Some(()) = self.in_flight.next(), if !self.in_flight.is_empty() => {}
            }
        }
        while self.in_flight.next().await.is_some() {}
    }

    /// Run queued work, including work it posts, until nothing is left.
    pub async fn run_until_idle(&mut self) {
        loop {
            while let Ok(fut) = self.owner_rx.try_recv() {
                self.in_flight.push(fut);
            }
            if self.in_flight.next().await.is_none() {
                break;
            }
        }
    }

    /// Posted work not yet finished, including queued work.
    pub fn pending(&self) -> usize {
        self.in_flight.len() + self.owner_rx.len()
    }
}

impl std::fmt::Debug for OwnerLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnerLoop")
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::time::Duration;

    #[tokio::test]
    async fn shutdown_aborts_tracked_tasks() {
        let registry = TaskRegistry::new();
        let (done_tx, mut done_rx) = watch::channel(false);
        registry.spawn_cancellable(async move {
            tokio::time::sleep(Duration::from_secs(60)).await;
            let _ = done_tx.send(true);
        });
        assert_eq!(registry.active(), 1);

        registry.shutdown();
        assert!(registry.is_shut_down());
        // Sender dropped without ever sending.
        assert!(done_rx.changed().await.is_err());
        assert!(!*done_rx.borrow());
    }

    #[tokio::test]
    async fn spawn_after_shutdown_is_ignored() {
        let registry = TaskRegistry::new();
        registry.shutdown();
        registry.spawn_cancellable(async {});
        assert_eq!(registry.active(), 0);
    }

    #[test]
    fn registry_without_runtime_drops_work() {
        let registry = TaskRegistry::new();
        registry.spawn_cancellable(async {});
        assert_eq!(registry.active(), 0);
    }

    #[test]
    fn bound_registry_spawns_from_plain_thread() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let registry = Arc::new(TaskRegistry::with_handle(runtime.handle().clone()));
        let (ran_tx, ran_rx) = std::sync::mpsc::channel();

        let spawner = registry.clone();
        std::thread::spawn(move || {
            spawner.spawn_cancellable(async move {
                let _ = ran_tx.send(());
            });
        })
        .join()
        .unwrap();

        assert!(ran_rx.recv_timeout(Duration::from_secs(5)).is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn tokio_scheduler_posts_in_submission_order() {
        let scheduler = TokioScheduler::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        let (done_tx, mut done_rx) = mpsc::unbounded_channel();

        for index in 0..32 {
            let order = order.clone();
            let done_tx = done_tx.clone();
            scheduler.post(
                async move {
                    order.lock().push(index);
                    let _ = done_tx.send(());
                }
                .boxed(),
            );
        }
        for _ in 0..32 {
            done_rx.recv().await.unwrap();
        }
        assert_eq!(*order.lock(), (0..32).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn owner_loop_runs_posted_work_in_place() {
        let (dispatcher, mut owner) = OwnerDispatcher::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for label in ["first", "second"] {
            let order = order.clone();
            dispatcher.post(async move { order.lock().push(label) }.boxed());
        }
        assert_eq!(owner.pending(), 2);
        assert!(order.lock().is_empty());

        owner.run_until_idle().await;
        assert_eq!(*order.lock(), vec!["first", "second"]);
        assert_eq!(owner.pending(), 0);
    }

    #[tokio::test]
    async fn owner_loop_picks_up_work_posted_by_work() {
        let (dispatcher, mut owner) = OwnerDispatcher::new();
        let hits = Arc::new(Mutex::new(0));

        let inner_dispatcher = dispatcher.clone();
        let inner_hits = hits.clone();
        dispatcher.post(
            async move {
                *inner_hits.lock() += 1;
                let hits = inner_hits.clone();
                inner_dispatcher.post(async move { *hits.lock() += 1 }.boxed());
            }
            .boxed(),
        );

        owner.run_until_idle().await;
        assert_eq!(*hits.lock(), 2);
    }

    #[tokio::test]
    async fn run_returns_once_dispatchers_are_dropped() {
        let (dispatcher, owner) = OwnerDispatcher::new();
        let ran = Arc::new(Mutex::new(false));
        let flag = ran.clone();
        dispatcher.post(async move { *flag.lock() = true }.boxed());
        drop(dispatcher);

        owner.run().await;
        assert!(*ran.lock());
    }
}
