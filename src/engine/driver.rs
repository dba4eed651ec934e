//! Driver
//!
//! Advances one computation through its suspension points. Each yielded value
//! is normalized into a thunk; the thunk's completion feeds the next step.
//! Values that cannot be waited on are raised back into the computation.
//! Only one step is in flight per drive, and the final outcome is always
//! delivered on a later scheduler turn.
//!
//! Steps run in a loop rather than by recursion: an outcome that arrives while
//! a thunk is still starting (a settled promise, a synchronous callback) is
//! parked and picked up by the loop once `start` returns, so the stack stays
//! flat however many yields settle synchronously.

use super::completion::Completion;
use super::normalize::{normalize, Normalized};
use super::runtime::Runtime;
use super::thunk::Thunk;
use crate::errors::{self, ErrorInfo};
use crate::types::{Coroutine, Step, Val};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::{debug, trace};
use uuid::Uuid;

/// Receives the final outcome of a drive
pub(crate) type Done = Box<dyn FnOnce(Result<Val, ErrorInfo>)>;

struct Drive {
    id: Uuid,
    computation: Coroutine,
    context: Val,
    runtime: Runtime,
    steps: Cell<usize>,
    /// Set while the step loop is on the stack
    running: Cell<bool>,
    /// Outcome delivered while the step loop was running
    parked: RefCell<Option<Result<Val, ErrorInfo>>>,
    done: RefCell<Option<Done>>,
}

/// Drive a computation to completion
pub(crate) fn drive(computation: Coroutine, context: Val, runtime: Runtime, done: Done) {
    let drive = Rc::new(Drive {
        id: Uuid::new_v4(),
        computation,
        context,
        runtime,
        steps: Cell::new(0),
        running: Cell::new(false),
        parked: RefCell::new(None),
        done: RefCell::new(Some(done)),
    });
    debug!(drive = %drive.id, "starting drive");
    drive.advance(Ok(Val::Null));
}

/// Thunk that drives a computation with the context it is started with
///
/// The nested drive reports to the thunk's completion, never to the
/// unhandled-error policy.
pub(crate) fn drive_thunk(computation: Coroutine, runtime: Runtime) -> Thunk {
    Thunk::with_context(move |context, completion| {
        drive(
            computation,
            context.clone(),
            runtime,
            Box::new(move |outcome| completion.complete(outcome)),
        );
        Ok(())
    })
}

impl Drive {
    /// Feed an outcome to the computation and keep stepping while outcomes
    /// arrive synchronously
    fn advance(self: &Rc<Self>, input: Result<Val, ErrorInfo>) {
        if self.running.get() {
            // At most one thunk is outstanding, so at most one outcome parks.
            *self.parked.borrow_mut() = Some(input);
            return;
        }

        self.running.set(true);
        let mut next = Some(input);
        while let Some(input) = next {
            next = self
                .step(input)
                .or_else(|| self.parked.borrow_mut().take());
        }
        self.running.set(false);
    }

    /// Run one step; returns the next input if it is already known
    fn step(self: &Rc<Self>, input: Result<Val, ErrorInfo>) -> Option<Result<Val, ErrorInfo>> {
        let step = self.steps.get() + 1;
        self.steps.set(step);

        let advanced = match input {
            Ok(value) => self.computation.resume(value),
            Err(error) => {
                trace!(drive = %self.id, step, code = %error.code, "raising into computation");
                self.computation.raise(error)
            }
        };

        match advanced {
            Ok(Step::Yield(value)) => self.wait_on(value),
            Ok(Step::Done(value)) => {
                self.exit(Ok(value));
                None
            }
            Err(error) => {
                self.exit(Err(error));
                None
            }
        }
    }

    fn wait_on(self: &Rc<Self>, value: Val) -> Option<Result<Val, ErrorInfo>> {
        let thunk = match normalize(value, &self.context, &self.runtime) {
            Ok(Normalized::Thunk(thunk)) => thunk,
            Ok(Normalized::Inert(value)) => return Some(Err(not_yieldable(&value))),
            Err(error) => return Some(Err(error)),
        };
        debug!(drive = %self.id, step = self.steps.get(), "waiting on thunk");

        let drive = self.clone();
        let completion = Completion::new(move |outcome| drive.advance(outcome));
        if let Err(error) = thunk.start(&self.context, completion.clone()) {
            // Same token: if the thunk already called back, this is a no-op.
            completion.defer_complete(self.runtime.scheduler().as_ref(), Err(error));
        }
        None
    }

    fn exit(&self, outcome: Result<Val, ErrorInfo>) {
        let Some(done) = self.done.borrow_mut().take() else {
            trace!(drive = %self.id, "drive already finished");
            return;
        };

        match &outcome {
            Ok(_) => debug!(drive = %self.id, steps = self.steps.get(), "drive finished"),
            Err(error) => debug!(
                drive = %self.id,
                steps = self.steps.get(),
                code = %error.code,
                "drive failed"
            ),
        }
        self.runtime.defer(Box::new(move || done(outcome)));
    }
}

fn not_yieldable(value: &Val) -> ErrorInfo {
    ErrorInfo::new(
        errors::NOT_YIELDABLE,
        format!(
            "You may only yield a computation, computation factory, promise, callback function, list, or map, but the following was passed: {}",
            value.kind()
        ),
    )
}
