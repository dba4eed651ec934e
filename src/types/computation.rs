//! Suspended computations
//!
//! A computation is a state machine the driver advances one suspension point
//! at a time. Each `resume` or `raise` either yields the next value to wait on,
//! returns a final value, or fails.

use crate::errors::{self, ErrorInfo};
use super::values::Val;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/* ===================== Step ===================== */

/// Result of advancing a computation by one step
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Suspended on a value that must be normalized and awaited
    Yield(Val),
    /// Finished with a final value
    Done(Val),
}

/* ===================== Computation ===================== */

/// A stepwise process that can be resumed with a value or an error
///
/// Once a step returns [`Step::Done`] the computation must not be advanced
/// again. Returning `Err` terminates the computation with that failure.
pub trait Computation {
    /// Resume with the result of the previous suspension point
    fn resume(&mut self, value: Val) -> Result<Step, ErrorInfo>;

    /// Resume by raising an error at the suspension point
    ///
    /// The default does not handle the error and rethrows it.
    fn raise(&mut self, error: ErrorInfo) -> Result<Step, ErrorInfo> {
        Err(error)
    }
}

/// Computation backed by a closure
///
/// The closure receives `Ok(value)` on resume and `Err(error)` on raise, so a
/// body that does not want to handle errors can simply apply `?` to its input.
pub struct FnComputation<F> {
    body: F,
    done: bool,
}

/// Build a computation from a closure
pub fn from_fn<F>(body: F) -> FnComputation<F>
where
    F: FnMut(Result<Val, ErrorInfo>) -> Result<Step, ErrorInfo>,
{
    FnComputation { body, done: false }
}

impl<F> FnComputation<F>
where
    F: FnMut(Result<Val, ErrorInfo>) -> Result<Step, ErrorInfo>,
{
    fn advance(&mut self, input: Result<Val, ErrorInfo>) -> Result<Step, ErrorInfo> {
        if self.done {
            return Err(ErrorInfo::new(
                errors::RESUMED_AFTER_DONE,
                "Computation was advanced after it finished",
            ));
        }
        let step = (self.body)(input);
        self.done = !matches!(step, Ok(Step::Yield(_)));
        step
    }
}

impl<F> Computation for FnComputation<F>
where
    F: FnMut(Result<Val, ErrorInfo>) -> Result<Step, ErrorInfo>,
{
    fn resume(&mut self, value: Val) -> Result<Step, ErrorInfo> {
        self.advance(Ok(value))
    }

    fn raise(&mut self, error: ErrorInfo) -> Result<Step, ErrorInfo> {
        self.advance(Err(error))
    }
}

/* ===================== Coroutine ===================== */

/// Shared handle to a suspended computation instance
///
/// Cloning shares the instance. Advancing it while another step of the same
/// instance is running fails with `COMPUTATION_BUSY`.
#[derive(Clone)]
pub struct Coroutine {
    inner: Rc<RefCell<Box<dyn Computation>>>,
}

impl Coroutine {
    pub fn new(computation: impl Computation + 'static) -> Self {
        Self::from_box(Box::new(computation))
    }

    pub fn from_box(computation: Box<dyn Computation>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(computation)),
        }
    }

    pub fn resume(&self, value: Val) -> Result<Step, ErrorInfo> {
        self.inner
            .try_borrow_mut()
            .map_err(|_| busy())?
            .resume(value)
    }

    pub fn raise(&self, error: ErrorInfo) -> Result<Step, ErrorInfo> {
        self.inner
            .try_borrow_mut()
            .map_err(|_| busy())?
            .raise(error)
    }
}

fn busy() -> ErrorInfo {
    ErrorInfo::new(
        errors::COMPUTATION_BUSY,
        "Computation is already being advanced",
    )
}

impl PartialEq for Coroutine {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Coroutine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coroutine")
            .field("busy", &self.inner.try_borrow().is_err())
            .finish()
    }
}

impl<F> From<FnComputation<F>> for Coroutine
where
    F: FnMut(Result<Val, ErrorInfo>) -> Result<Step, ErrorInfo> + 'static,
{
    fn from(computation: FnComputation<F>) -> Self {
        Coroutine::new(computation)
    }
}

/* ===================== Factory ===================== */

type Construct = dyn Fn(&Val, Vec<Val>) -> Result<Coroutine, ErrorInfo>;

/// Function that produces a fresh computation from a context and arguments
#[derive(Clone)]
pub struct Factory {
    construct: Rc<Construct>,
}

impl Factory {
    pub fn new<F, C>(construct: F) -> Self
    where
        F: Fn(&Val, Vec<Val>) -> Result<C, ErrorInfo> + 'static,
        C: Computation + 'static,
    {
        Self {
            construct: Rc::new(move |context: &Val, args: Vec<Val>| {
                construct(context, args).map(Coroutine::new)
            }),
        }
    }

    /// Create a computation
    pub fn instantiate(&self, context: &Val, args: Vec<Val>) -> Result<Coroutine, ErrorInfo> {
        (self.construct)(context, args)
    }
}

impl PartialEq for Factory {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(
            Rc::as_ptr(&self.construct) as *const (),
            Rc::as_ptr(&other.construct) as *const (),
        )
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Factory")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fn_computation_refuses_to_resume_after_done() {
        let mut computation = from_fn(|input| Ok(Step::Done(input?)));

        assert_eq!(computation.resume(Val::Num(1.0)), Ok(Step::Done(Val::Num(1.0))));

        let err = computation.resume(Val::Null).unwrap_err();
        assert_eq!(err.code, errors::RESUMED_AFTER_DONE);
    }

    #[test]
    fn test_fn_computation_is_done_after_failing() {
        let mut computation = from_fn(|input| Ok(Step::Yield(input?)));

        let err = computation.raise(ErrorInfo::new("Boom", "raised")).unwrap_err();
        assert_eq!(err.code, "Boom");
        assert!(computation.resume(Val::Null).is_err());
    }

    #[test]
    fn test_default_raise_rethrows() {
        struct Forever;
        impl Computation for Forever {
            fn resume(&mut self, value: Val) -> Result<Step, ErrorInfo> {
                Ok(Step::Yield(value))
            }
        }

        let coroutine = Coroutine::new(Forever);
        let err = coroutine.raise(ErrorInfo::new("Boom", "raised")).unwrap_err();
        assert_eq!(err.code, "Boom");
        assert_eq!(coroutine.resume(Val::Null), Ok(Step::Yield(Val::Null)));
    }

    #[test]
    fn test_advancing_from_inside_a_step_is_busy() {
        /// Advances its own handle on the first step and yields the outcome
        struct Reentrant {
            this: Rc<RefCell<Option<Coroutine>>>,
        }
        impl Computation for Reentrant {
            fn resume(&mut self, value: Val) -> Result<Step, ErrorInfo> {
                let this = self.this.borrow_mut().take();
                let Some(this) = this else {
                    return Ok(Step::Done(value));
                };
                match this.resume(Val::Null) {
                    Err(error) => Ok(Step::Yield(Val::from(error.code))),
                    Ok(step) => unreachable!("Nested step should not run: {:?}", step),
                }
            }
        }

        let this = Rc::new(RefCell::new(None));
        let coroutine = Coroutine::new(Reentrant { this: this.clone() });
        *this.borrow_mut() = Some(coroutine.clone());

        assert_eq!(
            coroutine.resume(Val::Null),
            Ok(Step::Yield(Val::from(errors::COMPUTATION_BUSY)))
        );
        // The outer step released its borrow
        assert_eq!(coroutine.resume(Val::Num(2.0)), Ok(Step::Done(Val::Num(2.0))));
    }

    #[test]
    fn test_factory_forwards_context_and_args() {
        let factory = Factory::new(|context: &Val, args: Vec<Val>| {
            let context = context.clone();
            Ok(from_fn(move |_| {
                Ok(Step::Done(Val::List(vec![
                    context.clone(),
                    Val::List(args.clone()),
                ])))
            }))
        });

        let coroutine = factory
            .instantiate(&Val::from("ctx"), vec![Val::Num(1.0)])
            .unwrap();
        assert_eq!(
            coroutine.resume(Val::Null),
            Ok(Step::Done(Val::List(vec![
                Val::from("ctx"),
                Val::List(vec![Val::Num(1.0)])
            ])))
        );
    }
}
