//! Runtime: the scheduler and settings shared by every drive it starts

use super::runner::{Runner, Source};
use crate::config::{Config, UnhandledPolicy};
use crate::errors::ErrorInfo;
use crate::scheduler::{Scheduler, Task};
use std::fmt;
use std::rc::Rc;

/// Receives errors from drives started without a completion
pub type UnhandledHook = Rc<dyn Fn(ErrorInfo)>;

struct RuntimeInner {
    scheduler: Rc<dyn Scheduler>,
    config: Config,
    on_unhandled: Option<UnhandledHook>,
}

/// Cloneable handle to a scheduler plus engine settings
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    /// Runtime with default configuration
    pub fn new(scheduler: impl Scheduler + 'static) -> Self {
        RuntimeBuilder::new(scheduler).build()
    }

    pub fn builder(scheduler: impl Scheduler + 'static) -> RuntimeBuilder {
        RuntimeBuilder::new(scheduler)
    }

    /// Wrap a computation source into a callable runner
    pub fn co(&self, source: impl Into<Source>) -> Runner {
        Runner::new(source.into(), self.clone())
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn scheduler(&self) -> Rc<dyn Scheduler> {
        self.inner.scheduler.clone()
    }

    pub fn defer(&self, task: Task) {
        self.inner.scheduler.defer(task)
    }

    /// Escalate an error nobody is waiting for
    ///
    /// A hook, if set, wins over the configured policy.
    pub(crate) fn escalate(&self, error: ErrorInfo) {
        if let Some(hook) = &self.inner.on_unhandled {
            let hook = hook.clone();
            self.defer(Box::new(move || hook(error)));
            return;
        }

        match self.inner.config.unhandled {
            UnhandledPolicy::Panic => {
                // Contained by a LocalSet; fatal on an EventLoop.
                self.defer(Box::new(move || {
                    panic!("unhandled error in driven computation: {}", error)
                }));
            }
            UnhandledPolicy::Log => {
                tracing::error!(
                    code = %error.code,
                    message = %error.message,
                    "unhandled error in driven computation"
                );
            }
            UnhandledPolicy::Ignore => {
                tracing::debug!(code = %error.code, "ignoring unhandled error");
            }
        }
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.inner.config)
            .field("on_unhandled", &self.inner.on_unhandled.is_some())
            .finish()
    }
}

/* ===================== Builder ===================== */

/// Builder for constructing a [`Runtime`]
pub struct RuntimeBuilder {
    scheduler: Rc<dyn Scheduler>,
    config: Config,
    on_unhandled: Option<UnhandledHook>,
}

impl RuntimeBuilder {
    pub fn new(scheduler: impl Scheduler + 'static) -> Self {
        Self {
            scheduler: Rc::new(scheduler),
            config: Config::default(),
            on_unhandled: None,
        }
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Set the unhandled-error policy
    pub fn unhandled(mut self, policy: UnhandledPolicy) -> Self {
        self.config.unhandled = policy;
        self
    }

    /// Route unhandled errors to a hook instead of the policy
    pub fn on_unhandled(mut self, hook: impl Fn(ErrorInfo) + 'static) -> Self {
        self.on_unhandled = Some(Rc::new(hook));
        self
    }

    pub fn build(self) -> Runtime {
        Runtime {
            inner: Rc::new(RuntimeInner {
                scheduler: self.scheduler,
                config: self.config,
                on_unhandled: self.on_unhandled,
            }),
        }
    }
}
