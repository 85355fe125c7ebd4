//! Built-in smoke plan
//!
//! A small registry covering every outcome shape, used by `unitest-pool probe`
//! to check a backend end to end.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::time::Duration;

use crate::failure::{assert_failed, panic_with, skip, todo_with};
use crate::loader::{Registry, TestReturn};
use crate::models::{batches_from_groups, AssertKind, AssertedExpr, Batch, ExprKind, Test};

const SMOKE: &str = "smoke";
const SLOW: &str = "smoke_slow";

fn passes() -> BoxFuture<'static, TestReturn> {
    async { Ok(()) }.boxed()
}

fn sleeps() -> BoxFuture<'static, TestReturn> {
    async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(())
    }
    .boxed()
}

fn panics() -> BoxFuture<'static, TestReturn> {
    async {
        let reached = true;
        if reached {
            panic_with("probe panic");
        }
        Ok(())
    }
    .boxed()
}

fn asserts() -> BoxFuture<'static, TestReturn> {
    async {
        let (left, right) = (1 + 1, 3);
        if left != right {
            assert_failed(
                "Assertion failed",
                AssertKind::BinaryOperator {
                    operator: "==".to_string(),
                    left: AssertedExpr::new(7, 12, ExprKind::Expression(left.to_string())),
                    right: AssertedExpr::new(16, 17, ExprKind::Literal(right.to_string())),
                },
            );
        }
        Ok(())
    }
    .boxed()
}

fn unfinished() -> BoxFuture<'static, TestReturn> {
    async {
        let done = false;
        if !done {
            todo_with("probe not written yet");
        }
        Ok(())
    }
    .boxed()
}

fn skips() -> BoxFuture<'static, TestReturn> {
    async {
        let supported = false;
        if !supported {
            skip();
        }
        Ok(())
    }
    .boxed()
}

fn returns_error() -> BoxFuture<'static, TestReturn> {
    async { Err("probe failure value".to_string()) }.boxed()
}

/// Registry backing the smoke plan
pub fn smoke_registry() -> Registry {
    Registry::builder()
        .module(SMOKE, |m| {
            m.test("passes", passes)
                .test("panics", panics)
                .test("asserts", asserts)
                .test("unfinished", unfinished)
                .test("skips", skips)
                .test("returns_error", returns_error)
        })
        .module(SLOW, |m| m.test("sleeps", sleeps))
        .build()
}

/// Smoke plan; includes one missing function and one missing module
pub fn smoke_plan() -> Vec<Batch> {
    let smoke = [
        "passes",
        "panics",
        "asserts",
        "unfinished",
        "skips",
        "returns_error",
        "missing",
    ]
    .into_iter()
    .map(|name| Test::new(SMOKE, name))
    .collect();

    let slow = (0..4).map(|_| Test::new(SLOW, "sleeps")).collect();

    batches_from_groups(vec![smoke, slow, vec![Test::new("absent", "anything")]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{Backend, PoolOptions, PoolScheduler};
    use crate::models::{Outcome, PanicKind, PoolResult, RunSummary};
    use std::sync::Arc;

    async fn run(backend: Backend, check_results: bool) -> Vec<PoolResult> {
        let options = PoolOptions::default()
            .with_workers(2)
            .with_backend(backend)
            .with_check_results(check_results);
        let scheduler = PoolScheduler::new(Arc::new(smoke_registry()), options);
        scheduler.run(smoke_plan()).await.unwrap()
    }

    fn outcome_of<'a>(results: &'a [PoolResult], name: &str) -> &'a Outcome {
        &results
            .iter()
            .find(|r| r.test.module == SMOKE && r.test.name == name)
            .unwrap()
            .outcome
    }

    #[test]
    fn test_smoke_plan_shape() {
        let plan = smoke_plan();
        assert_eq!(plan.len(), 3);
        assert_eq!(plan[1].global_start_index, 7);
        assert_eq!(plan[2].global_start_index, 11);
    }

    #[tokio::test]
    async fn test_smoke_on_worker_threads() {
        let results = run(Backend::WorkerThreads, true).await;
        let summary = RunSummary::new(&results);

        assert_eq!(summary.total, 12);
        assert_eq!(summary.passed, 5);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 6);

        assert_eq!(outcome_of(&results, "passes"), &Outcome::Ran);
        assert_eq!(outcome_of(&results, "skips"), &Outcome::Skipped);
        let todo = outcome_of(&results, "unfinished").failure().unwrap();
        assert_eq!(todo.panic_kind, PanicKind::Todo);
        let returned = outcome_of(&results, "returns_error").failure().unwrap();
        assert_eq!(
            returned.message,
            "Test returned Error: \"probe failure value\""
        );
    }

    #[tokio::test]
    async fn test_smoke_on_cooperative_without_result_checks() {
        let results = run(Backend::Cooperative, false).await;

        assert_eq!(results.len(), 12);
        assert_eq!(outcome_of(&results, "returns_error"), &Outcome::Ran);
        let assertion = outcome_of(&results, "asserts").failure().unwrap();
        assert!(matches!(assertion.panic_kind, PanicKind::Assert { .. }));
    }
}
