//! Aggregator
//!
//! Fans a list or map out into its members, starts every member eagerly in
//! key order, and fans the results back in under the same keys. The first
//! member error wins; later outcomes are dropped.

use super::completion::Completion;
use super::normalize::{normalize, Collection, Normalized};
use super::runtime::Runtime;
use super::thunk::Thunk;
use crate::errors::ErrorInfo;
use crate::types::Val;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;
use tracing::trace;

enum Shape {
    List,
    Map(Vec<String>),
}

/// Fan-in state shared by every member completion
struct Gather {
    shape: Shape,
    results: RefCell<Vec<Val>>,
    pending: Cell<usize>,
    finished: Cell<bool>,
    done: Completion,
}

/// Build a thunk that waits on every member of a collection
///
/// An empty collection completes on a later scheduler turn with an empty
/// collection of the same shape.
pub fn aggregate(collection: Collection, context: Val, runtime: Runtime) -> Thunk {
    Thunk::new(move |done| {
        let (shape, members) = match collection {
            Collection::List(items) => (Shape::List, items),
            Collection::Map(entries) => {
                let (keys, members): (Vec<String>, Vec<Val>) = entries.into_iter().unzip();
                (Shape::Map(keys), members)
            }
        };

        if members.is_empty() {
            let empty = match shape {
                Shape::List => Val::List(Vec::new()),
                Shape::Map(_) => Val::Map(BTreeMap::new()),
            };
            done.defer_complete(runtime.scheduler().as_ref(), Ok(empty));
            return Ok(());
        }

        trace!(members = members.len(), "starting aggregate");
        let gather = Rc::new(Gather {
            shape,
            results: RefCell::new(vec![Val::Null; members.len()]),
            pending: Cell::new(members.len()),
            finished: Cell::new(false),
            done,
        });

        for (index, member) in members.into_iter().enumerate() {
            if gather.finished.get() {
                break;
            }
            gather.run_member(index, member, &context, &runtime);
        }
        Ok(())
    })
}

impl Gather {
    fn run_member(self: &Rc<Self>, index: usize, member: Val, context: &Val, runtime: &Runtime) {
        let thunk = match normalize(member, context, runtime) {
            Ok(Normalized::Thunk(thunk)) => thunk,
            Ok(Normalized::Inert(value)) => return self.store(index, value),
            Err(error) => return self.fail(error),
        };

        let gather = self.clone();
        let completion = Completion::new(move |outcome| match outcome {
            Ok(value) => gather.store(index, value),
            Err(error) => gather.fail(error),
        });
        if let Err(error) = thunk.start(context, completion) {
            self.fail(error);
        }
    }

    fn store(&self, index: usize, value: Val) {
        if self.finished.get() {
            return;
        }
        self.results.borrow_mut()[index] = value;

        let pending = self.pending.get() - 1;
        self.pending.set(pending);
        if pending == 0 {
            self.finished.set(true);
            let results = self.collect();
            self.done.ok(results);
        }
    }

    fn fail(&self, error: ErrorInfo) {
        if self.finished.replace(true) {
            trace!(code = %error.code, "dropping error from finished aggregate");
            return;
        }
        self.done.err(error);
    }

    fn collect(&self) -> Val {
        let values = std::mem::take(&mut *self.results.borrow_mut());
        match &self.shape {
            Shape::List => Val::List(values),
            Shape::Map(keys) => Val::Map(keys.iter().cloned().zip(values).collect()),
        }
    }
}
