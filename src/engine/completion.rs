//! Single-use completion callbacks
//!
//! A [`Completion`] is the `(error, result)` callback handed to a thunk. It
//! moves from pending to settled on its first invocation; every later
//! invocation is ignored, so a misbehaving thunk that calls back twice cannot
//! advance a driver or an aggregate twice.

use crate::errors::ErrorInfo;
use crate::scheduler::Scheduler;
use crate::types::Val;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

type Callback = Box<dyn FnOnce(Result<Val, ErrorInfo>)>;

/// Cloneable handle to a consume-once callback
///
/// Clones share the settled state.
#[derive(Clone)]
pub struct Completion {
    slot: Rc<RefCell<Option<Callback>>>,
}

impl Completion {
    pub fn new(callback: impl FnOnce(Result<Val, ErrorInfo>) + 'static) -> Self {
        Self {
            slot: Rc::new(RefCell::new(Some(Box::new(callback)))),
        }
    }

    /// Settle with an outcome. No-op if already settled.
    pub fn complete(&self, outcome: Result<Val, ErrorInfo>) {
        let callback = self.slot.borrow_mut().take();
        match callback {
            Some(callback) => callback(outcome),
            None => tracing::trace!("ignoring repeated completion"),
        }
    }

    pub fn ok(&self, value: impl Into<Val>) {
        self.complete(Ok(value.into()))
    }

    pub fn err(&self, error: ErrorInfo) {
        self.complete(Err(error))
    }

    /// Settle with several results
    ///
    /// One result is delivered as itself, none as `Null`, and more than one
    /// collected into a list in the order given.
    pub fn ok_many(&self, mut values: Vec<Val>) {
        let value = match values.len() {
            0 => Val::Null,
            1 => values.remove(0),
            _ => Val::List(values),
        };
        self.complete(Ok(value))
    }

    /// Settle on a later turn of the scheduler
    pub fn defer_complete(&self, scheduler: &dyn Scheduler, outcome: Result<Val, ErrorInfo>) {
        let completion = self.clone();
        scheduler.defer(Box::new(move || completion.complete(outcome)));
    }

    pub fn is_settled(&self) -> bool {
        self.slot.borrow().is_none()
    }
}

impl PartialEq for Completion {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.slot, &other.slot)
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("settled", &self.is_settled())
            .finish()
    }
}
