//! Worker threads
//!
//! Each worker is an OS thread running its own single-threaded runtime and
//! its own [`TestExecutor`]. It announces `ready`, runs every `run` request it
//! receives, and replies with encoded outcomes. Besides messages, the thread
//! reports how it ended: an escaped panic as an error signal, and its exit
//! code once it stops.

use futures::stream::{FuturesUnordered, StreamExt};
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

use super::protocol::{Command, RunRequest, WorkerMessage};
use super::runner::TestExecutor;
use crate::failure::{encode_outcome, panic_message};
use crate::utils::Timer;

pub type WorkerId = usize;

/// What a worker thread can report to the scheduler
#[derive(Clone, Debug, PartialEq)]
pub enum WorkerSignal {
    Message(WorkerMessage),
    /// A panic escaped the worker
    Error(String),
    /// The thread finished; `0` means a clean shutdown
    Exit(i32),
}

#[derive(Clone, Debug, PartialEq)]
pub struct WorkerEvent {
    pub worker: WorkerId,
    pub signal: WorkerSignal,
}

/// Sending side of a worker's reports
#[derive(Clone)]
struct Outbox {
    worker: WorkerId,
    events: UnboundedSender<WorkerEvent>,
}

impl Outbox {
    fn signal(&self, signal: WorkerSignal) {
        // the scheduler may already be gone
        let _ = self.events.send(WorkerEvent {
            worker: self.worker,
            signal,
        });
    }

    fn post(&self, message: WorkerMessage) {
        self.signal(WorkerSignal::Message(message));
    }
}

/// Start a worker thread; dropping the returned sender shuts it down
pub fn spawn(
    worker: WorkerId,
    executor: TestExecutor,
    events: UnboundedSender<WorkerEvent>,
) -> io::Result<UnboundedSender<Command>> {
    let (commands, inbox) = mpsc::unbounded_channel();
    let outbox = Outbox { worker, events };

    thread::Builder::new()
        .name(format!("unitest-worker-{worker}"))
        .spawn(move || {
            let served =
                panic::catch_unwind(AssertUnwindSafe(|| serve(inbox, &outbox, executor)));

            let code = match served {
                Ok(Ok(())) => 0,
                Ok(Err(e)) => {
                    warn!("Worker {} failed to start its runtime: {}", worker, e);
                    1
                }
                Err(payload) => {
                    outbox.signal(WorkerSignal::Error(panic_message(payload.as_ref())));
                    1
                }
            };
            outbox.signal(WorkerSignal::Exit(code));
        })?;

    Ok(commands)
}

fn serve(
    mut inbox: UnboundedReceiver<Command>,
    outbox: &Outbox,
    executor: TestExecutor,
) -> io::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        outbox.post(WorkerMessage::Ready);

        let mut running = FuturesUnordered::new();
        loop {
            tokio::select! {
                command = inbox.recv() => match command {
                    Some(Command::Run(request)) => running.push(run_request(&executor, request)),
                    None => break,
                },
                Some(reply) = running.next(), if !running.is_empty() => outbox.post(reply),
            }
        }

        debug!("Worker {} shutting down", outbox.worker);
    });

    Ok(())
}

async fn run_request(executor: &TestExecutor, request: RunRequest) -> WorkerMessage {
    let timer = Timer::start(format!("{}.{}", request.unit_locator, request.function_name));
    let outcome = executor
        .execute_at(
            &request.unit_locator,
            &request.module,
            &request.function_name,
            request.check_results,
        )
        .await;

    WorkerMessage::Result {
        test_index: request.test_index,
        duration_ms: timer.stop(),
        result: encode_outcome(&outcome),
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use crate::failure::decode_outcome;
    use crate::loader::{LoadError, ModuleLoader, Registry, TestModule, TestReturn};
    use crate::models::Outcome;
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use std::sync::Arc;

    fn ok() -> BoxFuture<'static, TestReturn> {
        async { Ok(()) }.boxed()
    }

    struct PanickingLoader;

    impl ModuleLoader for PanickingLoader {
        fn load(&self, _locator: &str) -> Result<Arc<dyn TestModule>, LoadError> {
            panic!("import machinery failed")
        }
    }

    fn request(index: usize, name: &str) -> Command {
        Command::Run(RunRequest {
            test_index: index,
            unit_locator: "m".to_string(),
            module: "m".to_string(),
            function_name: name.to_string(),
            check_results: false,
        })
    }

    #[tokio::test]
    async fn test_worker_round_trip() {
        let registry = Registry::builder().module("m", |m| m.test("ok", ok)).build();
        let (events, mut rx) = mpsc::unbounded_channel();
        let commands = spawn(7, TestExecutor::new(Arc::new(registry)), events).unwrap();

        let ready = rx.recv().await.unwrap();
        assert_eq!(ready.worker, 7);
        assert_eq!(ready.signal, WorkerSignal::Message(WorkerMessage::Ready));

        commands.send(request(3, "ok")).unwrap();
        match rx.recv().await.unwrap().signal {
            WorkerSignal::Message(WorkerMessage::Result {
                test_index, result, ..
            }) => {
                assert_eq!(test_index, 3);
                assert_eq!(decode_outcome(&result), Outcome::Ran);
            }
            other => panic!("unexpected signal {other:?}"),
        }

        drop(commands);
        assert_eq!(rx.recv().await.unwrap().signal, WorkerSignal::Exit(0));
    }

    #[tokio::test]
    async fn test_escaped_panic_reports_error_then_exit() {
        let (events, mut rx) = mpsc::unbounded_channel();
        let commands = spawn(1, TestExecutor::new(Arc::new(PanickingLoader)), events).unwrap();

        assert_eq!(
            rx.recv().await.unwrap().signal,
            WorkerSignal::Message(WorkerMessage::Ready)
        );
        commands.send(request(0, "anything")).unwrap();

        assert_eq!(
            rx.recv().await.unwrap().signal,
            WorkerSignal::Error("import machinery failed".to_string())
        );
        assert_eq!(rx.recv().await.unwrap().signal, WorkerSignal::Exit(1));
    }
}
