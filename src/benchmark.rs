use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};
use tokio::task::LocalSet;

use crate::engine::{Runtime, Thunk};
use crate::scheduler::{EventLoop, LocalScheduler, Scheduler};
use crate::types::{from_fn, Coroutine, Step, Val};

/// Which scheduler drives the benchmark
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SchedulerKind {
    /// In-process FIFO queue, drained synchronously
    #[default]
    EventLoop,
    /// `spawn_local` on a tokio `LocalSet`
    Tokio,
}

pub struct BenchmarkParams {
    pub steps: usize,
    pub width: usize,
    pub scheduler: SchedulerKind,
}

#[derive(Debug, Clone)]
pub struct BenchReport {
    pub steps: usize,
    pub width: usize,
    pub scheduler: SchedulerKind,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    /// Scheduler tasks run (event loop only)
    pub tasks: Option<usize>,
}

impl BenchReport {
    pub fn steps_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return f64::INFINITY;
        }
        self.steps as f64 / secs
    }

    pub fn print(&self) {
        println!("⏱  Cadenza step benchmark");
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        println!("   Scheduler: {:?}", self.scheduler);
        println!("   Steps: {}", self.steps);
        println!("   Aggregate width: {}", self.width);
        if let Some(tasks) = self.tasks {
            println!("   Scheduler tasks: {}", tasks);
        }
        println!("   Started: {}", self.started_at.to_rfc3339());
        println!("   Elapsed: {:.2?}", self.elapsed);
        println!("   Throughput: {:.0} steps/s", self.steps_per_sec());
    }
}

pub async fn run_benchmark(params: BenchmarkParams) -> Result<BenchReport> {
    validate_params(&params)?;

    match params.scheduler {
        SchedulerKind::EventLoop => run_event_loop(params.steps, params.width),
        SchedulerKind::Tokio => run_tokio(params.steps, params.width).await,
    }
}

fn validate_params(params: &BenchmarkParams) -> Result<()> {
    if params.steps == 0 {
        bail!("--steps must be greater than zero");
    }
    Ok(())
}

/// Drive the synthetic computation on an [`EventLoop`]
pub fn run_event_loop(steps: usize, width: usize) -> Result<BenchReport> {
    let event_loop = EventLoop::new();
    let runtime = Runtime::new(event_loop.clone());
    let computation = synthetic(runtime.scheduler(), steps, width);

    let outcome = Rc::new(RefCell::new(None));
    let sink = outcome.clone();
    let started_at = Utc::now();
    let start = Instant::now();
    runtime
        .co(computation)
        .call(vec![], move |result| *sink.borrow_mut() = Some(result));
    let tasks = event_loop.run();
    let elapsed = start.elapsed();

    let result = outcome
        .borrow_mut()
        .take()
        .ok_or_else(|| anyhow!("Benchmark computation never completed"))?;
    result.context("Benchmark computation failed")?;

    Ok(BenchReport {
        steps,
        width,
        scheduler: SchedulerKind::EventLoop,
        started_at,
        elapsed,
        tasks: Some(tasks),
    })
}

/// Drive the synthetic computation on a tokio `LocalSet`
pub async fn run_tokio(steps: usize, width: usize) -> Result<BenchReport> {
    let local = LocalSet::new();
    local
        .run_until(async move {
            let runtime = Runtime::new(LocalScheduler::new());
            let computation = synthetic(runtime.scheduler(), steps, width);

            let started_at = Utc::now();
            let start = Instant::now();
            runtime
                .co(computation)
                .call_async(vec![])
                .await
                .context("Benchmark computation failed")?;

            Ok::<_, anyhow::Error>(BenchReport {
                steps,
                width,
                scheduler: SchedulerKind::Tokio,
                started_at,
                elapsed: start.elapsed(),
                tasks: None,
            })
        })
        .await
}

/// Computation that yields `steps` times
///
/// Odd steps wait on a single deferred thunk, even steps on a list of `width`
/// deferred thunks. Finishes with the number of steps taken.
fn synthetic(scheduler: Rc<dyn Scheduler>, steps: usize, width: usize) -> Coroutine {
    let mut taken = 0;
    from_fn(move |input| {
        input?;
        if taken == steps {
            return Ok(Step::Done(Val::from(taken)));
        }
        taken += 1;

        let next = if taken % 2 == 1 || width == 0 {
            Val::Thunk(Thunk::deferred(scheduler.clone(), Ok(Val::from(taken))))
        } else {
            Val::List(
                (0..width)
                    .map(|i| Val::Thunk(Thunk::deferred(scheduler.clone(), Ok(Val::from(i)))))
                    .collect(),
            )
        };
        Ok(Step::Yield(next))
    })
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_loop_benchmark_runs_every_step() {
        let report = run_event_loop(10, 3).unwrap();

        assert_eq!(report.steps, 10);
        // 5 single thunks + 5 aggregates of 3, plus the final completion
        assert_eq!(report.tasks, Some(5 + 5 * 3 + 1));
        assert!(report.steps_per_sec() > 0.0);
    }

    #[test]
    fn test_zero_steps_is_rejected() {
        let params = BenchmarkParams {
            steps: 0,
            width: 1,
            scheduler: SchedulerKind::EventLoop,
        };
        let err = tokio_test::block_on(run_benchmark(params)).unwrap_err();
        assert!(err.to_string().contains("--steps"));
    }

    #[tokio::test]
    async fn test_tokio_benchmark_completes() {
        let params = BenchmarkParams {
            steps: 6,
            width: 2,
            scheduler: SchedulerKind::Tokio,
        };
        let report = run_benchmark(params).await.unwrap();

        assert_eq!(report.scheduler, SchedulerKind::Tokio);
        assert_eq!(report.tasks, None);
    }
}
