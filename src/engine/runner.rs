//! Runner: a computation source bound to a runtime and a context

use super::driver::{drive, Done};
use super::runtime::Runtime;
use super::thunk::Thunk;
use crate::errors::{self, ErrorInfo};
use crate::scheduler::Scheduler;
use crate::types::{Coroutine, Factory, FnComputation, Step, Val};
use std::future::Future;
use tokio::sync::oneshot;
use tracing::debug;

/// What a runner drives
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    /// Instantiated on every call with the bound context and the call's arguments
    Factory(Factory),
    /// An existing instance; call arguments other than a completion are ignored
    Computation(Coroutine),
}

impl From<Factory> for Source {
    fn from(factory: Factory) -> Self {
        Source::Factory(factory)
    }
}

impl From<Coroutine> for Source {
    fn from(computation: Coroutine) -> Self {
        Source::Computation(computation)
    }
}

impl<F> From<FnComputation<F>> for Source
where
    F: FnMut(Result<Val, ErrorInfo>) -> Result<Step, ErrorInfo> + 'static,
{
    fn from(computation: FnComputation<F>) -> Self {
        Source::Computation(computation.into())
    }
}

/// Wrap a computation source with a fresh default runtime
pub fn co(source: impl Into<Source>, scheduler: impl Scheduler + 'static) -> Runner {
    Runtime::new(scheduler).co(source)
}

/// Callable wrapper around a computation source
#[derive(Debug, Clone)]
pub struct Runner {
    source: Source,
    context: Val,
    runtime: Runtime,
}

impl Runner {
    pub(crate) fn new(source: Source, runtime: Runtime) -> Self {
        Self {
            source,
            context: Val::Null,
            runtime,
        }
    }

    /// Bind the context handed to factories and thunks
    pub fn with_context(mut self, context: impl Into<Val>) -> Self {
        self.context = context.into();
        self
    }

    pub fn context(&self) -> &Val {
        &self.context
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Call with positional arguments
    ///
    /// A trailing [`Val::Callback`] is taken as the completion. Without one,
    /// an error escalates through the runtime's unhandled policy.
    pub fn invoke(&self, mut args: Vec<Val>) {
        let done = match args.pop() {
            Some(Val::Callback(callback)) => {
                Box::new(move |outcome: Result<Val, ErrorInfo>| callback.complete(outcome)) as Done
            }
            Some(other) => {
                args.push(other);
                self.unhandled()
            }
            None => self.unhandled(),
        };
        self.launch(args, done);
    }

    /// Call with an explicit completion
    ///
    /// `done` always runs on a later scheduler turn, never before `call` returns.
    pub fn call(&self, args: Vec<Val>, done: impl FnOnce(Result<Val, ErrorInfo>) + 'static) {
        self.launch(args, Box::new(done));
    }

    /// Call without a completion
    pub fn start(&self, args: Vec<Val>) {
        self.launch(args, self.unhandled());
    }

    /// Call and wait for the outcome
    ///
    /// The drive starts immediately; the returned future only waits. It
    /// resolves with `DRIVE_ABANDONED` if the scheduler drops the completion.
    pub fn call_async(&self, args: Vec<Val>) -> impl Future<Output = Result<Val, ErrorInfo>> {
        let (tx, rx) = oneshot::channel();
        self.call(args, move |outcome| {
            let _ = tx.send(outcome);
        });

        async move {
            rx.await.unwrap_or_else(|_| {
                Err(ErrorInfo::new(
                    errors::DRIVE_ABANDONED,
                    "Drive was dropped before it completed",
                ))
            })
        }
    }

    /// Expose one call (with no arguments) as a thunk
    pub fn into_thunk(self) -> Thunk {
        Thunk::new(move |completion| {
            let done: Done = Box::new(move |outcome| completion.complete(outcome));
            self.launch(Vec::new(), done);
            Ok(())
        })
    }

    fn launch(&self, args: Vec<Val>, done: Done) {
        let computation = match &self.source {
            Source::Computation(computation) => computation.clone(),
            Source::Factory(factory) => match factory.instantiate(&self.context, args) {
                Ok(computation) => computation,
                Err(error) => {
                    debug!(code = %error.code, "factory failed to create a computation");
                    self.runtime.defer(Box::new(move || done(Err(error))));
                    return;
                }
            },
        };
        drive(computation, self.context.clone(), self.runtime.clone(), done);
    }

    fn unhandled(&self) -> Done {
        let runtime = self.runtime.clone();
        Box::new(move |outcome: Result<Val, ErrorInfo>| {
            if let Err(error) = outcome {
                runtime.escalate(error);
            }
        })
    }
}
