//! Parallel execution of independent solve jobs
//!
//! A job is anything that can be rebuilt from its index and returns a
//! `Result` with a displayable error: a scenario, a point of a parameter
//! sweep. Each job runs its own single-threaded Newton solve; only whole
//! jobs are spread over threads.
//!
//! # Example
//!
//! ```rust
//! use foresight::parallel::ParallelRunner;
//! use foresight::SolveResult;
//!
//! let doubled = ParallelRunner::new(8, |job| -> SolveResult<usize> { Ok(job * 2) })
//!     .num_threads(2)
//!     .run();
//!
//! assert_eq!(doubled.len(), 8);
//! assert_eq!(doubled[3], Ok(6));
//! ```
//!
//! # Failures
//!
//! A job's error and a job's panic both end up as `Err(String)` in that
//! job's slot. The remaining jobs still run.

use rayon::prelude::*;
use std::any::Any;
use std::fmt::Display;
use std::marker::PhantomData;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{info, warn};

type ProgressFn = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Runs `num_jobs` independent jobs on a rayon pool, results in job order
///
/// The job closure is called once per index and must be safe to call from
/// several threads at once.
pub struct ParallelRunner<T, E, F>
where
    F: Fn(usize) -> Result<T, E> + Send + Sync,
    T: Send,
    E: Display,
{
    num_jobs: usize,
    job: F,
    threads: Option<usize>,
    on_progress: Option<ProgressFn>,
    _error: PhantomData<fn() -> E>,
}

impl<T, E, F> ParallelRunner<T, E, F>
where
    F: Fn(usize) -> Result<T, E> + Send + Sync,
    T: Send,
    E: Display,
{
    pub fn new(num_jobs: usize, job: F) -> Self {
        ParallelRunner {
            num_jobs,
            job,
            threads: None,
            on_progress: None,
            _error: PhantomData,
        }
    }

    /// Use a dedicated pool of `n` threads instead of the global one
    pub fn num_threads(mut self, n: usize) -> Self {
        self.threads = Some(n);
        self
    }

    /// Called with `(finished, total)` each time a job finishes
    pub fn progress<P>(mut self, callback: P) -> Self
    where
        P: Fn(usize, usize) + Send + Sync + 'static,
    {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    pub fn run(self) -> Vec<Result<T, String>> {
        let finished = AtomicUsize::new(0);

        let run_one = |job: usize| -> Result<T, String> {
            let outcome = catch_unwind(AssertUnwindSafe(|| (self.job)(job)));

            let done = finished.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(report) = &self.on_progress {
                report(done, self.num_jobs);
            }

            match outcome {
                Ok(result) => result.map_err(|err| err.to_string()),
                Err(payload) => Err(panic_message(payload)),
            }
        };
        let run_all = || -> Vec<Result<T, String>> {
            (0..self.num_jobs).into_par_iter().map(run_one).collect()
        };

        let pool = self.threads.and_then(|n| {
            rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .build()
                .map_err(|e| warn!("falling back to global thread pool: {e}"))
                .ok()
        });
        match pool {
            Some(pool) => pool.install(run_all),
            None => run_all(),
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(message) => *message,
        Err(payload) => payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "job panicked".to_string()),
    }
}

/// Run jobs on the global pool
pub fn run_parallel<T, E, F>(num_jobs: usize, job: F) -> Vec<Result<T, String>>
where
    F: Fn(usize) -> Result<T, E> + Send + Sync,
    T: Send,
    E: Display,
{
    ParallelRunner::new(num_jobs, job).run()
}

/// Progress callback that logs every `every` finished jobs, and the last one
pub fn simple_progress_reporter(every: usize) -> impl Fn(usize, usize) + Send + Sync {
    let every = every.max(1);
    move |done, total| {
        if done % every == 0 || done == total {
            info!("finished {}/{} jobs", done, total);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{SolveError, SolveResult};
    use std::sync::Mutex;

    fn echo(job: usize) -> SolveResult<usize> {
        Ok(job)
    }

    #[test]
    fn results_come_back_in_job_order() {
        let squares = run_parallel(10, |job| echo(job * job));
        let expected: Vec<Result<usize, String>> = (0..10).map(|j| Ok(j * j)).collect();
        assert_eq!(squares, expected);
    }

    #[test]
    fn solver_errors_stay_in_their_slot() {
        let results = run_parallel(4, |job| {
            if job == 2 {
                Err(SolveError::NotConverged {
                    iterations: 3,
                    residual: 1.0,
                })
            } else {
                Ok(job)
            }
        });

        assert!(results[2].as_ref().unwrap_err().contains("did not converge"));
        assert_eq!(results[3], Ok(3));
    }

    #[test]
    fn panics_are_isolated() {
        let results = run_parallel(6, |job| {
            if job == 4 {
                panic!("bad job {job}");
            }
            if job == 5 {
                std::panic::panic_any(17_u8);
            }
            echo(job)
        });

        assert_eq!(results[4], Err("bad job 4".to_string()));
        assert_eq!(results[5], Err("job panicked".to_string()));
        assert!(results[..4].iter().all(|r| r.is_ok()));
    }

    #[test]
    fn progress_sees_every_job() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();

        ParallelRunner::new(5, echo)
            .progress(move |done, total| {
                assert_eq!(total, 5);
                sink.lock().unwrap().push(done);
            })
            .run();

        let mut seen = seen.lock().unwrap().clone();
        seen.sort_unstable();
        assert_eq!(seen, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn dedicated_pool() {
        let results = ParallelRunner::new(8, echo).num_threads(2).run();
        assert_eq!(results.len(), 8);
        assert!(results.iter().all(|r| r.is_ok()));
    }

    #[test]
    fn no_jobs() {
        assert!(run_parallel(0, echo).is_empty());
    }

    #[test]
    fn reporter_accepts_any_interval() {
        let reporter = simple_progress_reporter(0);
        reporter(3, 7);
        reporter(7, 7);
    }
}
