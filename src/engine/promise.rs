//! Promise-like values
//!
//! The engine only needs one capability from a promise: registering a
//! fulfilment and a rejection handler, exactly one of which fires. That is
//! [`PromiseLike`]. [`Promise`] is a concrete single-threaded implementation,
//! and [`adapt`] turns any promise-like value into a thunk.

use super::completion::Completion;
use super::thunk::Thunk;
use crate::errors::{self, ErrorInfo};
use crate::types::Val;
use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

pub type OnFulfilled = Box<dyn FnOnce(Val)>;
pub type OnRejected = Box<dyn FnOnce(ErrorInfo)>;

/// Chainable completion registration
pub trait PromiseLike {
    fn then(&self, on_fulfilled: OnFulfilled, on_rejected: OnRejected);
}

/// Shared handle to any promise-like value
#[derive(Clone)]
pub struct Thenable {
    inner: Rc<dyn PromiseLike>,
}

impl Thenable {
    pub fn new(promise: impl PromiseLike + 'static) -> Self {
        Self {
            inner: Rc::new(promise),
        }
    }

    pub fn then(&self, on_fulfilled: OnFulfilled, on_rejected: OnRejected) {
        self.inner.then(on_fulfilled, on_rejected)
    }
}

impl PartialEq for Thenable {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(
            Rc::as_ptr(&self.inner) as *const (),
            Rc::as_ptr(&other.inner) as *const (),
        )
    }
}

impl fmt::Debug for Thenable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Thenable")
    }
}

/* ===================== Adapter ===================== */

/// Convert a promise-like value into a thunk
pub fn adapt(promise: Thenable) -> Thunk {
    Thunk::new(move |done: Completion| {
        let rejected = done.clone();
        promise.then(
            Box::new(move |value: Val| done.ok(value)),
            Box::new(move |reason: ErrorInfo| rejected.err(reason)),
        );
        Ok(())
    })
}

/* ===================== Promise ===================== */

/// Snapshot of a promise's state
#[derive(Debug, Clone, PartialEq)]
pub enum PromiseState {
    Pending,
    Fulfilled(Val),
    Rejected(ErrorInfo),
}

enum State {
    Pending(Vec<(OnFulfilled, OnRejected)>),
    Settled(Result<Val, ErrorInfo>),
}

/// Single-threaded promise
///
/// Settles once; later settle attempts are ignored. Handlers registered while
/// pending run at settlement in registration order. Handlers registered after
/// settlement run immediately.
#[derive(Clone)]
pub struct Promise {
    state: Rc<RefCell<State>>,
}

impl Promise {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(State::Pending(Vec::new()))),
        }
    }

    pub fn resolved(value: impl Into<Val>) -> Self {
        let promise = Self::new();
        promise.resolve(value);
        promise
    }

    pub fn rejected(reason: ErrorInfo) -> Self {
        let promise = Self::new();
        promise.reject(reason);
        promise
    }

    /// Drive a future on the current `LocalSet` and settle with its output
    ///
    /// A future that panics or is cancelled rejects with `FUTURE_FAILED`.
    pub fn from_future<F>(future: F) -> Self
    where
        F: Future<Output = Result<Val, ErrorInfo>> + 'static,
    {
        let promise = Self::new();
        let settle = promise.clone();
        let handle = tokio::task::spawn_local(future);
        tokio::task::spawn_local(async move {
            let outcome = handle.await.unwrap_or_else(|join_error| {
                Err(ErrorInfo::new(
                    errors::FUTURE_FAILED,
                    format!("Future did not complete: {}", join_error),
                ))
            });
            settle.settle(outcome);
        });
        promise
    }

    /// Returns false if the promise was already settled
    pub fn resolve(&self, value: impl Into<Val>) -> bool {
        self.settle(Ok(value.into()))
    }

    /// Returns false if the promise was already settled
    pub fn reject(&self, reason: ErrorInfo) -> bool {
        self.settle(Err(reason))
    }

    pub fn state(&self) -> PromiseState {
        match &*self.state.borrow() {
            State::Pending(_) => PromiseState::Pending,
            State::Settled(Ok(value)) => PromiseState::Fulfilled(value.clone()),
            State::Settled(Err(reason)) => PromiseState::Rejected(reason.clone()),
        }
    }

    fn settle(&self, outcome: Result<Val, ErrorInfo>) -> bool {
        let waiters = {
            let mut state = self.state.borrow_mut();
            let State::Pending(waiters) = &mut *state else {
                return false;
            };
            let waiters = std::mem::take(waiters);
            *state = State::Settled(outcome.clone());
            waiters
        };

        for (on_fulfilled, on_rejected) in waiters {
            match &outcome {
                Ok(value) => on_fulfilled(value.clone()),
                Err(reason) => on_rejected(reason.clone()),
            }
        }
        true
    }
}

impl Default for Promise {
    fn default() -> Self {
        Self::new()
    }
}

impl PromiseLike for Promise {
    fn then(&self, on_fulfilled: OnFulfilled, on_rejected: OnRejected) {
        let settled = {
            let mut state = self.state.borrow_mut();
            match &mut *state {
                State::Pending(waiters) => {
                    waiters.push((on_fulfilled, on_rejected));
                    return;
                }
                State::Settled(outcome) => outcome.clone(),
            }
        };

        match settled {
            Ok(value) => on_fulfilled(value),
            Err(reason) => on_rejected(reason),
        }
    }
}

impl fmt::Debug for Promise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("state", &self.state())
            .finish()
    }
}

impl From<Promise> for Thenable {
    fn from(promise: Promise) -> Self {
        Thenable::new(promise)
    }
}

impl From<Promise> for Val {
    fn from(promise: Promise) -> Self {
        Val::Promise(Thenable::new(promise))
    }
}
