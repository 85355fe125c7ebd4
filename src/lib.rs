//! Parallel test scheduler
//!
//! Runs a plan of test batches across isolated worker threads, each with its
//! own runtime and loaded modules. Results stream back one at a time as tests
//! finish. A worker that crashes takes only its pending tests down with it;
//! once crashes pile up, the remaining work moves to a cooperative,
//! concurrency-limited backend on the calling runtime.
//!
//! ```no_run
//! use std::sync::Arc;
//! use unitest_pool::executor::{PoolOptions, PoolScheduler};
//! use unitest_pool::models::{partition, Test};
//! use unitest_pool::probe::smoke_registry;
//!
//! # async fn demo() {
//! let scheduler = PoolScheduler::new(Arc::new(smoke_registry()), PoolOptions::default());
//! let run = scheduler.start(partition(vec![Test::new("smoke", "passes")]));
//! for result in run.collect().await.unwrap() {
//!     println!("{result}");
//! }
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod executor;
pub mod failure;
pub mod loader;
pub mod models;
pub mod output;
pub mod probe;
pub mod utils;

pub use config::{EnvConfig, PoolConfig};
pub use executor::{PoolOptions, PoolRun, PoolScheduler, ResultChannel};
pub use models::{Batch, Outcome, PoolResult, RunSummary, Test};
