//! Bounded worker pool for independent per-file tasks.
//!
//! Backed by a dedicated rayon thread pool, so at most `workers` tasks run at
//! once regardless of the global pool. Tasks run to completion: there is no
//! cancellation or timeout, and a task that never returns blocks `run`. A
//! task that panics counts as a failure and does not disturb the others.

use crate::util::{PrepError, PrepResult};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Counts of task outcomes after a pool run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl PoolSummary {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// Fixed-size pool that runs one task per item and waits for all of them.
pub struct WorkerPool {
    pool: ThreadPool,
    workers: usize,
}

impl WorkerPool {
    /// Builds a pool with exactly `workers` threads.
    pub fn new(workers: usize) -> PrepResult<Self> {
        if workers == 0 {
            return Err(PrepError::InvalidInput("worker count must be at least 1"));
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|idx| format!("mask-worker-{idx}"))
            .build()
            .map_err(|_| PrepError::InvalidInput("failed to start worker threads"))?;
        Ok(Self { pool, workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Runs `task` once per item, blocking until every task has finished.
    ///
    /// Each task reports success as `true`; a panicking task is a failure.
    /// Completion order is unspecified.
    pub fn run<T, F>(&self, items: &[T], task: F) -> PoolSummary
    where
        T: Sync,
        F: Fn(&T) -> bool + Sync,
    {
        let succeeded = self.pool.install(|| {
            items
                .par_iter()
                .with_max_len(1)
                .filter(|item| catch_unwind(AssertUnwindSafe(|| task(*item))).unwrap_or(false))
                .count()
        });
        PoolSummary {
            succeeded,
            failed: items.len() - succeeded,
        }
    }
}
