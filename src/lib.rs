pub mod benchmark;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod scheduler;
pub mod types;

// Re-export the driving API
pub use engine::{
    co, Completion, Promise, PromiseLike, Runner, Runtime, RuntimeBuilder, Source, Thenable, Thunk,
};
pub use types::{from_fn, Computation, Coroutine, Factory, Record, Step, Val};

// Re-export ambient types for convenience
pub use config::{Config, UnhandledPolicy};
pub use errors::ErrorInfo;
pub use scheduler::{EventLoop, LocalScheduler, Scheduler};
