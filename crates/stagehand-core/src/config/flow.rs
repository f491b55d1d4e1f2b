//! Initial flows: ordered, one-shot conditional navigation.
//!
//! A flow optionally shows an initial view, then walks its steps in
//! declaration order. The first step whose condition is absent or holds is
//! selected and the walk stops. A condition that errors or panics counts as
//! "not met".

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::resolver::ServiceResolver;

/// Boxed future returned by a flow condition.
pub type ConditionFuture = BoxFuture<'static, anyhow::Result<bool>>;

type ConditionFn = dyn Fn(Arc<dyn ServiceResolver>) -> ConditionFuture + Send + Sync;

/// Async predicate over a resolution context.
#[derive(Clone)]
pub struct FlowCondition(Arc<ConditionFn>);

impl FlowCondition {
    /// Wrap an async predicate.
    pub fn new<F, Fut>(predicate: F) -> Self
    where
        F: Fn(Arc<dyn ServiceResolver>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<bool>> + Send + 'static,
    {
        Self(Arc::new(move |resolver: Arc<dyn ServiceResolver>| {
            predicate(resolver).boxed()
        }))
    }

    /// Wrap a synchronous, fallible predicate.
    pub fn from_fn<F>(predicate: F) -> Self
    where
        F: Fn(&dyn ServiceResolver) -> anyhow::Result<bool> + Send + Sync + 'static,
    {
        Self(Arc::new(move |resolver: Arc<dyn ServiceResolver>| {
            let outcome = predicate(resolver.as_ref());
            futures::future::ready(outcome).boxed()
        }))
    }

    /// A condition with a fixed answer.
    pub fn constant(value: bool) -> Self {
        Self::from_fn(move |_| Ok(value))
    }

    /// Evaluate, folding errors and panics into [`ConditionOutcome::Failed`].
    pub async fn check(&self, resolver: Arc<dyn ServiceResolver>) -> ConditionOutcome {
        let future = match std::panic::catch_unwind(AssertUnwindSafe(|| (self.0)(resolver))) {
            Ok(future) => future,
            Err(panic) => return ConditionOutcome::Failed(panic_message(panic.as_ref())),
        };
        match AssertUnwindSafe(future).catch_unwind().await {
            Ok(Ok(true)) => ConditionOutcome::Met,
            Ok(Ok(false)) => ConditionOutcome::NotMet,
            Ok(Err(error)) => ConditionOutcome::Failed(format!("{error:#}")),
            Err(panic) => ConditionOutcome::Failed(panic_message(panic.as_ref())),
        }
    }
}

impl fmt::Debug for FlowCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FlowCondition(..)")
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked".to_string()
    }
}

/// Result of evaluating a single condition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConditionOutcome {
    /// The predicate returned `true`
    Met,
    /// The predicate returned `false`
    NotMet,
    /// The predicate errored or panicked
    Failed(String),
}

/// One candidate navigation in an initial flow.
#[derive(Clone, Debug)]
pub struct FlowStep {
    view_key: String,
    condition: Option<FlowCondition>,
}

impl FlowStep {
    /// An unconditional step.
    pub fn new(view_key: impl Into<String>) -> Self {
        Self {
            view_key: view_key.into(),
            condition: None,
        }
    }

    /// A step guarded by `condition`.
    pub fn when(view_key: impl Into<String>, condition: FlowCondition) -> Self {
        Self {
            view_key: view_key.into(),
            condition: Some(condition),
        }
    }

    /// View to navigate to when selected.
    pub fn view_key(&self) -> &str {
        &self.view_key
    }

    /// Guard, if any.
    pub fn condition(&self) -> Option<&FlowCondition> {
        self.condition.as_ref()
    }
}

/// Initial view plus ordered conditional steps.
#[derive(Clone, Debug, Default)]
pub struct InitialRegionFlow {
    initial_view_key: Option<String>,
    steps: Vec<FlowStep>,
}

impl InitialRegionFlow {
    /// Empty flow.
    pub fn new() -> Self {
        Self::default()
    }

    /// View shown before any step is evaluated.
    pub fn initial_view_key(&self) -> Option<&str> {
        self.initial_view_key.as_deref()
    }

    /// Steps in declaration order.
    pub fn steps(&self) -> &[FlowStep] {
        &self.steps
    }

    /// True when the flow would never navigate.
    pub fn is_empty(&self) -> bool {
        self.initial_view_key.is_none() && self.steps.is_empty()
    }

    pub(crate) fn set_initial(&mut self, view_key: String) {
        self.initial_view_key = Some(view_key);
    }

    pub(crate) fn push(&mut self, step: FlowStep) {
        self.steps.push(step);
    }

    /// Pick the first step whose condition is absent or met.
    ///
    /// Steps after the selected one are never evaluated.
    pub async fn select_step(&self, resolver: Arc<dyn ServiceResolver>) -> Option<&FlowStep> {
        for (index, step) in self.steps.iter().enumerate() {
            let Some(condition) = step.condition() else {
                return Some(step);
            };
            match condition.check(resolver.clone()).await {
                ConditionOutcome::Met => return Some(step),
                ConditionOutcome::NotMet => {
                    tracing::trace!(index, view_key = %step.view_key, "flow condition not met");
                }
                ConditionOutcome::Failed(reason) => {
                    tracing::warn!(
                        index,
                        view_key = %step.view_key,
                        %reason,
                        "flow condition failed; skipping step"
                    );
                }
            }
        }
        None
    }
}
