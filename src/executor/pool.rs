//! Pool scheduler
//!
//! Partitions the plan into batches and runs them on worker threads, falling
//! back to the cooperative backend when worker threads are unavailable or keep
//! crashing. All scheduler state lives in one driver task and is only touched
//! between its awaits.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, warn};

use super::channel::{ChannelError, ResultChannel};
use super::fallback::CooperativeBackend;
use super::protocol::{Command, RunRequest, WorkerMessage};
use super::runner::TestExecutor;
use super::worker::{self, WorkerEvent, WorkerId, WorkerSignal};
use crate::failure::{crash_error, decode_outcome, FailureClassifier};
use crate::loader::ModuleLoader;
use crate::models::{flatten, Batch, PoolResult, Test};

/// Crashes tolerated before the worker backend is abandoned
pub const DEFAULT_CRASH_THRESHOLD: usize = 3;

/// Execution backend selection
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Worker threads when the host supports them
    #[default]
    Auto,
    WorkerThreads,
    Cooperative,
}

impl Backend {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "auto" => Some(Backend::Auto),
            "worker_threads" | "workers" | "threads" => Some(Backend::WorkerThreads),
            "cooperative" | "fallback" => Some(Backend::Cooperative),
            _ => None,
        }
    }

    /// Backend actually used on this host
    pub fn resolve(self) -> Backend {
        match self {
            Backend::Auto if worker_threads_available() => Backend::WorkerThreads,
            Backend::Auto => Backend::Cooperative,
            other => other,
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Auto => write!(f, "auto"),
            Backend::WorkerThreads => write!(f, "worker threads"),
            Backend::Cooperative => write!(f, "cooperative"),
        }
    }
}

/// Whether the host can run isolated worker threads
pub fn worker_threads_available() -> bool {
    !cfg!(target_family = "wasm")
}

/// What the fallback backend takes over once the crash threshold is reached
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Every undispatched batch moves to the fallback backend at once
    #[default]
    RemainingBatches,
    /// Surviving workers keep draining the queue; the fallback backend only
    /// takes what is left when no worker is alive
    CrashedShare,
}

/// Scheduler options
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolOptions {
    pub workers: usize,
    pub test_concurrency: Option<usize>,
    pub check_results: bool,
    pub package: String,
    pub backend: Backend,
    pub crash_threshold: usize,
    pub fallback_policy: FallbackPolicy,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            workers: super::default_test_concurrency(),
            test_concurrency: None,
            check_results: false,
            package: String::new(),
            backend: Backend::Auto,
            crash_threshold: DEFAULT_CRASH_THRESHOLD,
            fallback_policy: FallbackPolicy::RemainingBatches,
        }
    }
}

impl PoolOptions {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_check_results(mut self, check_results: bool) -> Self {
        self.check_results = check_results;
        self
    }

    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = package.into();
        self
    }

    pub fn with_test_concurrency(mut self, limit: usize) -> Self {
        self.test_concurrency = Some(limit);
        self
    }

    pub fn with_crash_threshold(mut self, threshold: usize) -> Self {
        self.crash_threshold = threshold;
        self
    }

    pub fn with_fallback_policy(mut self, policy: FallbackPolicy) -> Self {
        self.fallback_policy = policy;
        self
    }
}

/// What happened during a pool run
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub backend: Backend,
    pub workers_spawned: usize,
    pub crashes: usize,
    pub fallback_batches: usize,
}

impl PoolStats {
    pub fn fell_back(&self) -> bool {
        self.backend == Backend::WorkerThreads && self.fallback_batches > 0
    }
}

/// Starts pool runs
pub struct PoolScheduler {
    loader: Arc<dyn ModuleLoader>,
    classifier: FailureClassifier,
    options: PoolOptions,
}

impl PoolScheduler {
    pub fn new(loader: Arc<dyn ModuleLoader>, options: PoolOptions) -> Self {
        Self {
            loader,
            classifier: FailureClassifier::default(),
            options,
        }
    }

    pub fn with_classifier(mut self, classifier: FailureClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn options(&self) -> &PoolOptions {
        &self.options
    }

    fn executor(&self) -> TestExecutor {
        TestExecutor::new(self.loader.clone())
            .with_package(self.options.package.clone())
            .with_check_results(self.options.check_results)
            .with_classifier(self.classifier.clone())
    }

    fn fallback(&self) -> CooperativeBackend {
        let backend = CooperativeBackend::new(self.executor(), self.options.workers);
        match self.options.test_concurrency {
            Some(limit) => backend.with_test_limit(limit),
            None => backend,
        }
    }

    /// Start running `batches`; must be called inside a tokio runtime.
    ///
    /// Returns immediately. Results stream out of [`PoolRun::channel`].
    pub fn start(&self, batches: Vec<Batch>) -> PoolRun {
        let channel = ResultChannel::new();
        let expected: usize = batches.iter().map(Batch::len).sum();
        let backend = self.options.backend.resolve();

        info!(
            "Starting pool: {} tests in {} batches ({}, {} workers)",
            expected,
            batches.len(),
            backend,
            self.options.workers
        );

        let driver = match backend {
            Backend::WorkerThreads => {
                let pool = ThreadPool::new(
                    batches,
                    self.executor(),
                    self.fallback(),
                    channel.clone(),
                    &self.options,
                );
                tokio::spawn(pool.run())
            }
            _ => {
                let fallback = self.fallback();
                let results = channel.clone();
                tokio::spawn(async move {
                    let fallback_batches = batches.len();
                    fallback.run(batches, &results).await;
                    PoolStats {
                        backend: Backend::Cooperative,
                        fallback_batches,
                        ..PoolStats::default()
                    }
                })
            }
        };

        PoolRun {
            channel,
            expected,
            driver,
        }
    }

    /// Run `batches` to completion
    pub async fn run(&self, batches: Vec<Batch>) -> Result<Vec<PoolResult>, ChannelError> {
        self.start(batches).collect().await
    }
}

/// A started pool run
pub struct PoolRun {
    channel: ResultChannel,
    expected: usize,
    driver: JoinHandle<PoolStats>,
}

impl PoolRun {
    pub fn channel(&self) -> &ResultChannel {
        &self.channel
    }

    /// Number of results this run will deliver
    pub fn expected(&self) -> usize {
        self.expected
    }

    /// Await every expected result, in completion order
    pub async fn collect(&self) -> Result<Vec<PoolResult>, ChannelError> {
        self.channel.take(self.expected).await
    }

    /// Wait for the scheduler to wind down
    pub async fn finish(self) -> Result<PoolStats, JoinError> {
        self.driver.await
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum WorkerState {
    Spawning,
    Ready,
    Dispatched,
    Crashed,
    Terminated,
}

struct WorkerHandle {
    state: WorkerState,
    commands: Option<UnboundedSender<Command>>,
    pending: HashSet<usize>,
}

impl WorkerHandle {
    fn is_dead(&self) -> bool {
        matches!(self.state, WorkerState::Crashed | WorkerState::Terminated)
    }
}

/// Worker-thread backend driver
struct ThreadPool {
    batches: VecDeque<Batch>,
    tests: Vec<Test>,
    workers: HashMap<WorkerId, WorkerHandle>,
    next_worker: WorkerId,
    executor: TestExecutor,
    fallback: CooperativeBackend,
    fallback_runs: Vec<JoinHandle<()>>,
    channel: ResultChannel,
    events: UnboundedSender<WorkerEvent>,
    inbox: UnboundedReceiver<WorkerEvent>,
    worker_limit: usize,
    crash_threshold: usize,
    policy: FallbackPolicy,
    check_results: bool,
    stats: PoolStats,
}

impl ThreadPool {
    fn new(
        batches: Vec<Batch>,
        executor: TestExecutor,
        fallback: CooperativeBackend,
        channel: ResultChannel,
        options: &PoolOptions,
    ) -> Self {
        let (events, inbox) = mpsc::unbounded_channel();
        Self {
            tests: flatten(&batches),
            batches: batches.into(),
            workers: HashMap::new(),
            next_worker: 0,
            executor,
            fallback,
            fallback_runs: Vec::new(),
            channel,
            events,
            inbox,
            worker_limit: options.workers.max(1),
            crash_threshold: options.crash_threshold.max(1),
            policy: options.fallback_policy,
            check_results: options.check_results,
            stats: PoolStats {
                backend: Backend::WorkerThreads,
                ..PoolStats::default()
            },
        }
    }

    async fn run(mut self) -> PoolStats {
        let initial = self.worker_limit.min(self.batches.len());
        for _ in 0..initial {
            // spawn failures count as crashes and may already have tripped the threshold
            if self.batches.is_empty() || self.stats.crashes >= self.crash_threshold {
                break;
            }
            self.spawn_worker();
        }

        while self.live_workers() > 0 {
            let Some(event) = self.inbox.recv().await else {
                break;
            };
            self.handle_event(event);
        }

        // anything still queued here has no worker left to take it
        self.start_fallback();

        for run in std::mem::take(&mut self.fallback_runs) {
            if let Err(e) = run.await {
                warn!("Fallback backend task failed: {}", e);
            }
        }

        info!(
            "Pool finished: {} workers spawned, {} crashes, {} batches on fallback",
            self.stats.workers_spawned, self.stats.crashes, self.stats.fallback_batches
        );
        self.stats
    }

    fn live_workers(&self) -> usize {
        self.workers.values().filter(|w| !w.is_dead()).count()
    }

    fn spawn_worker(&mut self) {
        let id = self.next_worker;
        self.next_worker += 1;

        let spawned = worker::spawn(id, self.executor.clone(), self.events.clone());
        self.workers.insert(
            id,
            WorkerHandle {
                state: WorkerState::Spawning,
                commands: None,
                pending: HashSet::new(),
            },
        );

        match spawned {
            Ok(commands) => {
                debug!("Spawned worker {}", id);
                self.stats.workers_spawned += 1;
                if let Some(handle) = self.workers.get_mut(&id) {
                    handle.commands = Some(commands);
                }
            }
            Err(e) => self.handle_death(id, format!("Worker failed to spawn: {e}")),
        }
    }

    fn handle_event(&mut self, event: WorkerEvent) {
        let WorkerEvent { worker, signal } = event;
        match signal {
            WorkerSignal::Message(WorkerMessage::Ready) => {
                if let Some(handle) = self.workers.get_mut(&worker) {
                    if handle.state == WorkerState::Spawning {
                        handle.state = WorkerState::Ready;
                        self.dispatch(worker);
                    }
                }
            }
            WorkerSignal::Message(WorkerMessage::Result {
                test_index,
                duration_ms,
                result,
            }) => self.handle_result(worker, test_index, duration_ms, &result),
            WorkerSignal::Error(message) => {
                self.handle_death(worker, format!("Worker crashed: {message}"));
            }
            WorkerSignal::Exit(code) => {
                let has_pending = self
                    .workers
                    .get(&worker)
                    .is_some_and(|w| !w.pending.is_empty());
                if code != 0 || has_pending {
                    self.handle_death(
                        worker,
                        format!("Worker exited unexpectedly with code {code}"),
                    );
                }
            }
        }
    }

    /// Give the next batch to a ready worker, or shut it down
    fn dispatch(&mut self, id: WorkerId) {
        let Some(handle) = self.workers.get_mut(&id) else {
            return;
        };

        while let Some(batch) = self.batches.pop_front() {
            if batch.is_empty() {
                continue;
            }

            debug!(
                "Dispatching {} ({} tests) to worker {}",
                batch.module().unwrap_or_default(),
                batch.len(),
                id
            );

            handle.state = WorkerState::Dispatched;
            handle.pending = batch.indexed().map(|(index, _)| index).collect();

            if let Some(commands) = &handle.commands {
                for (index, test) in batch.indexed() {
                    let request = RunRequest {
                        test_index: index,
                        unit_locator: self.executor.locator().locate(&test.module),
                        module: test.module.clone(),
                        function_name: test.name.clone(),
                        check_results: self.check_results,
                    };
                    // a closed inbox means the thread died; its exit signal
                    // settles the pending tests
                    if commands.send(Command::Run(request)).is_err() {
                        debug!("Worker {} inbox closed during dispatch", id);
                        break;
                    }
                }
            }
            return;
        }

        debug!("No batches left, terminating worker {}", id);
        handle.state = WorkerState::Terminated;
        handle.commands = None;
    }

    fn handle_result(
        &mut self,
        id: WorkerId,
        test_index: usize,
        duration_ms: u64,
        result: &serde_json::Value,
    ) {
        let Some(handle) = self.workers.get_mut(&id) else {
            return;
        };

        let known = handle.pending.remove(&test_index);
        let test = self.tests.get(test_index);
        let (true, Some(test)) = (known, test) else {
            warn!(
                "Dropping result for test {} not pending on worker {}",
                test_index, id
            );
            return;
        };

        self.channel.deliver(PoolResult::new(
            test.clone(),
            decode_outcome(result),
            duration_ms,
        ));

        if handle.pending.is_empty() && handle.state == WorkerState::Dispatched {
            handle.state = WorkerState::Ready;
            self.dispatch(id);
        }
    }

    fn handle_death(&mut self, id: WorkerId, reason: String) {
        let Some(handle) = self.workers.get_mut(&id) else {
            return;
        };
        if handle.is_dead() {
            return;
        }

        handle.state = WorkerState::Crashed;
        handle.commands = None;

        let mut pending: Vec<usize> = handle.pending.drain().collect();
        pending.sort_unstable();

        warn!(
            "Worker {} died with {} pending tests: {}",
            id,
            pending.len(),
            reason
        );

        for index in pending {
            if let Some(test) = self.tests.get(index) {
                self.channel
                    .deliver(PoolResult::new(test.clone(), crash_error(reason.clone()), 0));
            }
        }

        self.stats.crashes += 1;

        if self.stats.crashes >= self.crash_threshold {
            match self.policy {
                FallbackPolicy::RemainingBatches => self.start_fallback(),
                FallbackPolicy::CrashedShare if self.live_workers() == 0 => self.start_fallback(),
                FallbackPolicy::CrashedShare => {}
            }
        } else if !self.batches.is_empty() {
            self.spawn_worker();
        }
    }

    /// Hand every undispatched batch to the cooperative backend
    fn start_fallback(&mut self) {
        if self.batches.is_empty() {
            return;
        }

        let remaining: Vec<Batch> = self.batches.drain(..).collect();
        warn!(
            "Worker threads crashed {} times, running {} remaining batches cooperatively",
            self.stats.crashes,
            remaining.len()
        );
        self.stats.fallback_batches += remaining.len();

        let fallback = self.fallback.clone();
        let channel = self.channel.clone();
        self.fallback_runs.push(tokio::spawn(async move {
            fallback.run(remaining, &channel).await;
        }));
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use crate::failure::panic_with;
    use crate::loader::{LoadError, Registry, TestModule, TestReturn};
    use crate::models::{batches_from_groups, partition, Outcome, PanicKind, TestFailure};
    use futures::future::BoxFuture;
    use futures::FutureExt;

    fn ok() -> BoxFuture<'static, TestReturn> {
        async { Ok(()) }.boxed()
    }

    fn boom() -> BoxFuture<'static, TestReturn> {
        async {
            let ready = false;
            if !ready {
                panic_with("boom");
            }
            Ok(())
        }
        .boxed()
    }

    /// Registry wrapper whose loader panics for chosen modules
    struct FaultyLoader {
        registry: Registry,
        faulty: Vec<&'static str>,
    }

    impl ModuleLoader for FaultyLoader {
        fn load(&self, locator: &str) -> Result<Arc<dyn TestModule>, LoadError> {
            if self.faulty.contains(&locator) {
                panic!("loader fault in {locator}");
            }
            self.registry.load(locator)
        }
    }

    fn registry() -> Registry {
        Registry::builder()
            .module("m", |m| m.test("ok", ok).test("boom", boom))
            .module("m3", |m| m.test("ok", ok))
            .module("m4", |m| m.test("ok", ok).test("ok2", ok))
            .build()
    }

    fn plan(groups: &[(&str, &[&str])]) -> Vec<Batch> {
        batches_from_groups(
            groups
                .iter()
                .map(|(module, names)| names.iter().map(|n| Test::new(*module, *n)).collect())
                .collect(),
        )
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_scenario_on_worker_threads() {
        let options = PoolOptions::default()
            .with_workers(2)
            .with_backend(Backend::WorkerThreads);
        let scheduler = PoolScheduler::new(Arc::new(registry()), options);

        let run = scheduler.start(partition(vec![Test::new("m", "ok"), Test::new("m", "boom")]));
        assert_eq!(run.expected(), 2);

        let mut results = run.collect().await.unwrap();
        results.sort_by(|a, b| a.test.name.cmp(&b.test.name));

        assert_eq!(
            results[0].outcome.failure().map(|f| f.panic_kind.clone()),
            Some(PanicKind::Panic)
        );
        assert_eq!(results[1].outcome, Outcome::Ran);

        let stats = run.finish().await.unwrap();
        assert_eq!(stats.backend, Backend::WorkerThreads);
        assert_eq!(stats.workers_spawned, 1);
        assert_eq!(stats.crashes, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_missing_function_message() {
        let scheduler = PoolScheduler::new(
            Arc::new(registry()),
            PoolOptions::default().with_backend(Backend::WorkerThreads),
        );

        let results = scheduler
            .run(partition(vec![Test::new("m", "missing")]))
            .await
            .unwrap();

        assert_eq!(
            results[0].outcome,
            Outcome::Errored(TestFailure::generic("Function missing not found in module m"))
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_missing_function_message_matches_across_backends() {
        let packaged = || {
            Arc::new(
                Registry::builder()
                    .module("pkg/m", |m| m.test("ok", ok))
                    .build(),
            )
        };
        let expected =
            Outcome::Errored(TestFailure::generic("Function missing not found in module m"));

        for backend in [Backend::WorkerThreads, Backend::Cooperative] {
            let options = PoolOptions::default()
                .with_backend(backend)
                .with_package("pkg");
            let results = PoolScheduler::new(packaged(), options)
                .run(partition(vec![Test::new("m", "ok"), Test::new("m", "missing")]))
                .await
                .unwrap();

            let missing = results.iter().find(|r| r.test.name == "missing").unwrap();
            assert_eq!(missing.outcome, expected, "backend {backend}");
            let found = results.iter().find(|r| r.test.name == "ok").unwrap();
            assert_eq!(found.outcome, Outcome::Ran, "backend {backend}");
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_crash_settles_pending_tests() {
        let loader = FaultyLoader {
            registry: registry(),
            faulty: vec!["broken"],
        };
        let options = PoolOptions::default()
            .with_workers(1)
            .with_backend(Backend::WorkerThreads);
        let scheduler = PoolScheduler::new(Arc::new(loader), options);

        let run = scheduler.start(plan(&[("broken", &["a", "b"]), ("m", &["ok"])]));
        let results = run.collect().await.unwrap();
        assert_eq!(results.len(), 3);

        let crashed: Vec<_> = results.iter().filter(|r| r.test.module == "broken").collect();
        assert_eq!(crashed.len(), 2);
        for result in crashed {
            let failure = result.outcome.failure().unwrap();
            assert_eq!(failure.panic_kind, PanicKind::Generic);
            assert_eq!(failure.message, "Worker crashed: loader fault in broken");
            assert_eq!(result.duration_ms, 0);
        }

        let survivor = results.iter().find(|r| r.test.module == "m").unwrap();
        assert_eq!(survivor.outcome, Outcome::Ran);

        let stats = run.finish().await.unwrap();
        assert_eq!(stats.crashes, 1);
        assert_eq!(stats.workers_spawned, 2);
        assert_eq!(stats.fallback_batches, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_threshold_moves_remaining_batches_to_fallback() {
        let loader = FaultyLoader {
            registry: registry(),
            faulty: vec!["m0", "m1", "m2"],
        };
        let options = PoolOptions::default()
            .with_workers(1)
            .with_backend(Backend::WorkerThreads);
        let scheduler = PoolScheduler::new(Arc::new(loader), options);

        let run = scheduler.start(plan(&[
            ("m0", &["t"]),
            ("m1", &["t"]),
            ("m2", &["t"]),
            ("m3", &["ok"]),
            ("m4", &["ok", "ok2"]),
        ]));

        let results = run.collect().await.unwrap();
        assert_eq!(results.len(), 6);

        let passed: Vec<_> = results
            .iter()
            .filter(|r| r.outcome == Outcome::Ran)
            .map(|r| r.test.module.as_str())
            .collect();
        assert_eq!(passed.len(), 3);
        assert!(passed.iter().all(|m| *m == "m3" || *m == "m4"));

        let stats = run.finish().await.unwrap();
        assert_eq!(stats.crashes, 3);
        assert_eq!(stats.workers_spawned, 3);
        assert_eq!(stats.fallback_batches, 2);
        assert!(stats.fell_back());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_crashed_share_policy_keeps_survivors_busy() {
        let loader = FaultyLoader {
            registry: registry(),
            faulty: vec!["m0"],
        };
        let options = PoolOptions::default()
            .with_workers(2)
            .with_backend(Backend::WorkerThreads)
            .with_crash_threshold(1)
            .with_fallback_policy(FallbackPolicy::CrashedShare);
        let scheduler = PoolScheduler::new(Arc::new(loader), options);

        let run = scheduler.start(plan(&[
            ("m0", &["t"]),
            ("m3", &["ok"]),
            ("m4", &["ok", "ok2"]),
            ("m", &["ok"]),
        ]));

        let results = run.collect().await.unwrap();
        assert_eq!(results.len(), 5);
        assert_eq!(
            results.iter().filter(|r| r.outcome == Outcome::Ran).count(),
            4
        );

        let stats = run.finish().await.unwrap();
        assert_eq!(stats.crashes, 1);
        assert_eq!(stats.workers_spawned, 2);
    }

    #[tokio::test]
    async fn test_cooperative_backend() {
        let options = PoolOptions::default()
            .with_workers(2)
            .with_backend(Backend::Cooperative)
            .with_test_concurrency(1);
        let scheduler = PoolScheduler::new(Arc::new(registry()), options);

        let run = scheduler.start(plan(&[("m", &["ok", "boom"]), ("m3", &["ok"])]));
        let results = run.collect().await.unwrap();
        assert_eq!(results.len(), 3);

        let stats = run.finish().await.unwrap();
        assert_eq!(stats.backend, Backend::Cooperative);
        assert_eq!(stats.workers_spawned, 0);
        assert_eq!(stats.fallback_batches, 2);
        assert!(!stats.fell_back());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_empty_plan() {
        let scheduler = PoolScheduler::new(
            Arc::new(registry()),
            PoolOptions::default().with_backend(Backend::WorkerThreads),
        );

        let run = scheduler.start(Vec::new());
        assert_eq!(run.expected(), 0);
        assert!(run.collect().await.unwrap().is_empty());

        let stats = run.finish().await.unwrap();
        assert_eq!(stats.workers_spawned, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_many_batches_complete_exactly_once() {
        let groups: Vec<Vec<Test>> = (0..12)
            .map(|i| {
                let module = if i % 2 == 0 { "m3" } else { "m4" };
                vec![Test::new(module, "ok"); 3]
            })
            .collect();
        let scheduler = PoolScheduler::new(
            Arc::new(registry()),
            PoolOptions::default()
                .with_workers(4)
                .with_backend(Backend::WorkerThreads),
        );

        let run = scheduler.start(batches_from_groups(groups));
        let results = run.collect().await.unwrap();
        assert_eq!(results.len(), 36);
        assert!(results.iter().all(|r| r.outcome == Outcome::Ran));

        let stats = run.finish().await.unwrap();
        assert_eq!(stats.workers_spawned, 4);
        assert_eq!(stats.crashes, 0);
    }

    #[test]
    fn test_backend_parsing() {
        assert_eq!(Backend::from_str("auto"), Some(Backend::Auto));
        assert_eq!(Backend::from_str("worker-threads"), Some(Backend::WorkerThreads));
        assert_eq!(Backend::from_str("Cooperative"), Some(Backend::Cooperative));
        assert_eq!(Backend::from_str("processes"), None);
        assert_eq!(Backend::Cooperative.resolve(), Backend::Cooperative);
    }
}
