//! Test execution engine
//!
//! Single test execution, the result channel, and the two pool backends:
//! isolated worker threads and a cooperative fallback.

mod channel;
mod fallback;
mod pool;
pub mod protocol;
mod runner;
mod worker;

pub use channel::{ChannelError, ResultChannel};
pub use fallback::{default_test_concurrency, CooperativeBackend};
pub use pool::{
    worker_threads_available, Backend, FallbackPolicy, PoolOptions, PoolRun, PoolScheduler,
    PoolStats, DEFAULT_CRASH_THRESHOLD,
};
pub use runner::TestExecutor;
pub use worker::{WorkerEvent, WorkerId, WorkerSignal};
