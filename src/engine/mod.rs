//! Cooperative step engine
//!
//! Drives suspended computations one step at a time. Whatever a computation
//! yields is normalized into a [`Thunk`] (nested computations, promises,
//! callback-style functions, and collections that fan out and back in), and
//! the thunk's outcome resumes the computation.

pub mod aggregate;
pub mod completion;
mod driver;
pub mod normalize;
pub mod promise;
pub mod runner;
pub mod runtime;
pub mod thunk;

#[cfg(test)]
mod tests;

pub use aggregate::aggregate;
pub use completion::Completion;
pub use normalize::{normalize, Collection, Normalized, Yieldable};
pub use promise::{adapt, OnFulfilled, OnRejected, Promise, PromiseLike, PromiseState, Thenable};
pub use runner::{co, Runner, Source};
pub use runtime::{Runtime, RuntimeBuilder, UnhandledHook};
pub use thunk::Thunk;
