//! Runtime-agnostic scheduling contract.
//!
//! Background continuations (loading timers, delayed completions, initial
//! flows) are handed to a [`Scheduler`] instead of capturing an ambient
//! synchronization context. Work that touches a region capability goes
//! through [`Scheduler::post`], which must resume on the owner executor
//! (the UI thread of the host toolkit).

use futures::future::BoxFuture;

/// Task scheduling with an explicit owner executor.
pub trait Scheduler: Send + Sync {
    /// Run a background task. It must not touch region capabilities.
    fn spawn(&self, fut: BoxFuture<'static, ()>);

    /// Run a task on the owner executor.
    ///
    /// Posted tasks are first polled in submission order. Once a task
    /// awaits, later tasks may interleave with it.
    fn post(&self, fut: BoxFuture<'static, ()>);
}
