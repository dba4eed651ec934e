//! Deferral primitives
//!
//! The engine never runs a completion on the stack that produced it when the
//! result must be observable from outside: final completions, deferred start
//! failures, empty aggregates and unhandled errors all go through
//! [`Scheduler::defer`], which runs a task after the current synchronous
//! execution unwinds.

pub mod event_loop;
pub mod local;

pub use event_loop::EventLoop;
pub use local::LocalScheduler;

use std::rc::Rc;

/// Unit of deferred work
pub type Task = Box<dyn FnOnce()>;

/// Runs tasks after the current synchronous execution completes
pub trait Scheduler {
    fn defer(&self, task: Task);
}

impl<S: Scheduler + ?Sized> Scheduler for Rc<S> {
    fn defer(&self, task: Task) {
        (**self).defer(task)
    }
}
