//! Test helpers for engine tests
//!
//! Scripted computations, thunks that settle now or later, and outcome sinks

use crate::engine::{Runtime, Thunk};
use crate::errors::ErrorInfo;
use crate::scheduler::EventLoop;
use crate::types::{from_fn, Computation, Coroutine, Factory, Step, Val};
use std::cell::RefCell;
use std::rc::Rc;

pub type Outcomes = Rc<RefCell<Vec<Result<Val, ErrorInfo>>>>;

/// Event loop plus a default runtime on top of it
pub fn runtime() -> (EventLoop, Runtime) {
    let event_loop = EventLoop::new();
    let runtime = Runtime::new(event_loop.clone());
    (event_loop, runtime)
}

/// Completion closure that records every outcome it sees
pub fn recorder() -> (Outcomes, impl FnOnce(Result<Val, ErrorInfo>) + 'static) {
    let outcomes: Outcomes = Rc::new(RefCell::new(Vec::new()));
    let sink = outcomes.clone();
    (outcomes, move |outcome| sink.borrow_mut().push(outcome))
}

/// Computation that yields each value in turn
///
/// Finishes with the list of values it was resumed with. Errors raised into
/// it are not caught.
pub fn yielding(values: Vec<Val>) -> Coroutine {
    let mut pending = values.into_iter();
    let mut received = Vec::new();
    let mut started = false;
    from_fn(move |input| {
        let value = input?;
        if started {
            received.push(value);
        }
        started = true;
        match pending.next() {
            Some(next) => Ok(Step::Yield(next)),
            None => Ok(Step::Done(Val::List(std::mem::take(&mut received)))),
        }
    })
    .into()
}

/// Computation that yields one value and reports how it was resumed
///
/// Finishes with the resumed value, or with `"caught <code>"` if an error was
/// raised into it.
pub fn catching(value: Val) -> Coroutine {
    let mut value = Some(value);
    from_fn(move |input| {
        if let Some(value) = value.take() {
            return Ok(Step::Yield(value));
        }
        match input {
            Ok(resumed) => Ok(Step::Done(resumed)),
            Err(error) => Ok(Step::Done(Val::from(format!("caught {}", error.code)))),
        }
    })
    .into()
}

/// Callback-style function that calls back synchronously
pub fn now(outcome: Result<Val, ErrorInfo>) -> Val {
    Val::Thunk(Thunk::ready(outcome))
}

/// Callback-style function that calls back on a later turn
pub fn later(event_loop: &EventLoop, outcome: Result<Val, ErrorInfo>) -> Val {
    Val::Thunk(Thunk::deferred(Rc::new(event_loop.clone()), outcome))
}

pub fn boom(code: &str) -> ErrorInfo {
    ErrorInfo::new(code, format!("{} failed", code))
}

struct NeverBuilt;

impl Computation for NeverBuilt {
    fn resume(&mut self, _: Val) -> Result<Step, ErrorInfo> {
        unreachable!("NeverBuilt is never constructed")
    }
}

/// Factory whose construction always fails
pub fn failing_factory(code: &'static str) -> Factory {
    Factory::new(move |_, _| -> Result<NeverBuilt, ErrorInfo> { Err(boom(code)) })
}
