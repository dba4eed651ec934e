//! Type definitions for the engine
//!
//! - Runtime values (Val, Record)
//! - Suspended computations (Computation, Step, Coroutine, Factory)

pub mod computation;
pub mod values;

pub use computation::{from_fn, Computation, Coroutine, Factory, FnComputation, Step};
pub use values::{Record, Val};
