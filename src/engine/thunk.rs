//! Thunks: single-use asynchronous units
//!
//! A thunk is started exactly once with a context value and a [`Completion`].
//! Returning `Err` from the body means it failed synchronously while starting;
//! the caller decides how that failure is delivered.

use super::completion::Completion;
use crate::errors::{self, ErrorInfo};
use crate::scheduler::Scheduler;
use crate::types::Val;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

type Body = Box<dyn FnOnce(&Val, Completion) -> Result<(), ErrorInfo>>;

/// Callback-style asynchronous operation
#[derive(Clone)]
pub struct Thunk {
    body: Rc<RefCell<Option<Body>>>,
}

impl Thunk {
    /// Thunk that ignores the context it is started with
    pub fn new(body: impl FnOnce(Completion) -> Result<(), ErrorInfo> + 'static) -> Self {
        Self::with_context(move |_, done| body(done))
    }

    /// Thunk that receives the context of whoever starts it
    pub fn with_context(
        body: impl FnOnce(&Val, Completion) -> Result<(), ErrorInfo> + 'static,
    ) -> Self {
        Self {
            body: Rc::new(RefCell::new(Some(Box::new(body)))),
        }
    }

    /// Thunk that completes synchronously with the given outcome
    pub fn ready(outcome: Result<Val, ErrorInfo>) -> Self {
        Self::new(move |done| {
            done.complete(outcome);
            Ok(())
        })
    }

    /// Thunk that completes with the given outcome on a later scheduler turn
    pub fn deferred(scheduler: Rc<dyn Scheduler>, outcome: Result<Val, ErrorInfo>) -> Self {
        Self::new(move |done| {
            done.defer_complete(scheduler.as_ref(), outcome);
            Ok(())
        })
    }

    /// Start the thunk
    ///
    /// Fails with `THUNK_REUSED` if it was already started.
    pub fn start(&self, context: &Val, done: Completion) -> Result<(), ErrorInfo> {
        let body = self.body.borrow_mut().take().ok_or_else(|| {
            ErrorInfo::new(errors::THUNK_REUSED, "Thunk was already started")
        })?;
        body(context, done)
    }

    pub fn is_started(&self) -> bool {
        self.body.borrow().is_none()
    }
}

impl PartialEq for Thunk {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.body, &other.body)
    }
}

impl fmt::Debug for Thunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thunk")
            .field("started", &self.is_started())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thunk_runs_only_once() {
        let thunk = Thunk::ready(Ok(Val::Num(7.0)));
        let seen = Rc::new(RefCell::new(None));

        let sink = seen.clone();
        thunk
            .start(&Val::Null, Completion::new(move |outcome| *sink.borrow_mut() = Some(outcome)))
            .unwrap();
        assert_eq!(*seen.borrow(), Some(Ok(Val::Num(7.0))));
        assert!(thunk.is_started());

        let err = thunk
            .clone()
            .start(&Val::Null, Completion::new(|_| {}))
            .unwrap_err();
        assert_eq!(err.code, errors::THUNK_REUSED);
    }

    #[test]
    fn test_thunk_sees_context() {
        let thunk = Thunk::with_context(|context, done| {
            done.ok(context.clone());
            Ok(())
        });
        let seen = Rc::new(RefCell::new(None));

        let sink = seen.clone();
        thunk
            .start(
                &Val::from("this"),
                Completion::new(move |outcome| *sink.borrow_mut() = Some(outcome)),
            )
            .unwrap();
        assert_eq!(*seen.borrow(), Some(Ok(Val::from("this"))));
    }

    #[test]
    fn test_start_failure_is_returned() {
        let thunk = Thunk::new(|_| Err(ErrorInfo::new("Sync", "failed while starting")));

        let err = thunk.start(&Val::Null, Completion::new(|_| {})).unwrap_err();
        assert_eq!(err.code, "Sync");
    }
}
