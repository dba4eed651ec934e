//! Tokio-backed scheduler
//!
//! Defers by spawning onto the current [`tokio::task::LocalSet`], so engine
//! values (which are `!Send`) never leave the thread.

use super::{Scheduler, Task};

/// Scheduler built on `tokio::task::spawn_local`
///
/// Deferring outside of a `LocalSet` panics, as `spawn_local` does. A task
/// that panics is caught by the `LocalSet` and the set keeps running, which
/// includes the `panic` unhandled policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalScheduler;

impl LocalScheduler {
    pub fn new() -> Self {
        Self
    }
}

impl Scheduler for LocalScheduler {
    fn defer(&self, task: Task) {
        tokio::task::spawn_local(async move { task() });
    }
}
