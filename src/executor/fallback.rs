//! Cooperative fallback backend
//!
//! Runs batches on the calling task under two nested limits: how many batches
//! are in flight, and how many tests of one batch are in flight. There is no
//! isolation between tests, so anything a test raises is turned into an
//! outcome before it reaches the scheduler.

use futures::future;
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::thread;
use tracing::{debug, info};

use super::channel::ResultChannel;
use super::runner::TestExecutor;
use crate::failure::{crash_error, panic_message};
use crate::models::{Batch, PoolResult, Test};
use crate::utils::Timer;

/// Default number of tests of one batch run at once
pub fn default_test_concurrency() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .max(1)
}

/// Concurrency-limited executor without isolation
#[derive(Clone)]
pub struct CooperativeBackend {
    executor: TestExecutor,
    batch_limit: usize,
    test_limit: usize,
}

impl CooperativeBackend {
    pub fn new(executor: TestExecutor, workers: usize) -> Self {
        Self {
            executor,
            batch_limit: workers.max(1),
            test_limit: default_test_concurrency(),
        }
    }

    /// Override the within-batch limit
    pub fn with_test_limit(mut self, limit: usize) -> Self {
        self.test_limit = limit.max(1);
        self
    }

    pub fn batch_limit(&self) -> usize {
        self.batch_limit
    }

    pub fn test_limit(&self) -> usize {
        self.test_limit
    }

    /// Run every batch, delivering one result per test
    pub async fn run(&self, batches: Vec<Batch>, channel: &ResultChannel) {
        info!(
            "Running {} batches cooperatively (batches: {}, tests per batch: {})",
            batches.len(),
            self.batch_limit,
            self.test_limit
        );

        stream::iter(batches)
            .map(|batch| self.run_batch(batch, channel))
            .buffer_unordered(self.batch_limit)
            .for_each(|()| future::ready(()))
            .await;
    }

    async fn run_batch(&self, batch: Batch, channel: &ResultChannel) {
        debug!(
            "Starting batch {} ({} tests)",
            batch.module().unwrap_or_default(),
            batch.len()
        );

        stream::iter(batch.tests)
            .map(|test| self.run_test(test))
            .buffer_unordered(self.test_limit)
            .for_each(|result| {
                channel.deliver(result);
                future::ready(())
            })
            .await;
    }

    async fn run_test(&self, test: Test) -> PoolResult {
        let timer = Timer::start(test.to_string());
        let execution = AssertUnwindSafe(self.executor.execute(&test)).catch_unwind();

        let outcome = match execution.await {
            Ok(outcome) => outcome,
            Err(payload) => crash_error(format!(
                "Test execution failed: {}",
                panic_message(payload.as_ref())
            )),
        };

        PoolResult::new(test, outcome, timer.stop())
    }
}
