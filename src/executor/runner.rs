//! Single test execution
//!
//! Resolves a test's module, invokes the test function and reduces whatever
//! it raises to an [`Outcome`].

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::debug;

use crate::failure::{install_quiet_hook, render, FailureClassifier};
use crate::loader::{ModuleLoader, UnitLocator};
use crate::models::{Outcome, Test, TestFailure};

/// Runs one test at a time against a module loader
#[derive(Clone)]
pub struct TestExecutor {
    loader: Arc<dyn ModuleLoader>,
    locator: UnitLocator,
    classifier: FailureClassifier,
    check_results: bool,
}

impl TestExecutor {
    /// Create a new executor
    pub fn new(loader: Arc<dyn ModuleLoader>) -> Self {
        install_quiet_hook();
        Self {
            loader,
            locator: UnitLocator::default(),
            classifier: FailureClassifier::default(),
            check_results: false,
        }
    }

    /// Set the package root tests are located in
    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.locator = UnitLocator::new(package);
        self
    }

    /// Treat a returned `Err` as a failure
    pub fn with_check_results(mut self, check_results: bool) -> Self {
        self.check_results = check_results;
        self
    }

    pub fn with_classifier(mut self, classifier: FailureClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn locator(&self) -> &UnitLocator {
        &self.locator
    }

    pub fn check_results(&self) -> bool {
        self.check_results
    }

    /// Run a single test
    pub async fn execute(&self, test: &Test) -> Outcome {
        let locator = self.locator.locate(&test.module);
        self.run(&locator, &test.module, &test.name, self.check_results)
            .await
    }

    /// Run the function `name` of the unit at `locator`.
    ///
    /// Used on the worker side, where the locator is already resolved;
    /// `module` is the plan's module identifier.
    pub async fn execute_at(
        &self,
        locator: &str,
        module: &str,
        name: &str,
        check_results: bool,
    ) -> Outcome {
        self.run(locator, module, name, check_results).await
    }

    async fn run(&self, locator: &str, module: &str, name: &str, check_results: bool) -> Outcome {
        debug!("Running {}.{}", module, name);

        // A panicking loader is a host fault and is left to the caller
        let unit = match self.loader.load(locator) {
            Ok(unit) => unit,
            Err(e) => return Outcome::Errored(self.classifier.classify_error(&e)),
        };

        let Some(function) = unit.function(name) else {
            return Outcome::Errored(TestFailure::generic(format!(
                "Function {name} not found in module {module}"
            )));
        };

        let invocation = AssertUnwindSafe(async move { function().await }).catch_unwind();

        match invocation.await {
            Ok(Ok(())) => Outcome::Ran,
            Ok(Err(reason)) if check_results => Outcome::Errored(TestFailure::generic(format!(
                "Test returned Error: {}",
                render(&reason)
            ))),
            Ok(Err(_)) => Outcome::Ran,
            Err(payload) => self.classifier.classify_panic(payload),
        }
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use crate::failure::{panic_with, skip, StructuredPanic};
    use crate::loader::{Registry, TestReturn};
    use crate::models::PanicKind;
    use futures::future::BoxFuture;

    fn ok() -> BoxFuture<'static, TestReturn> {
        async { Ok(()) }.boxed()
    }

    fn boom() -> BoxFuture<'static, TestReturn> {
        async {
            let total = 1 + 1;
            if total != 3 {
                panic_with("boom");
            }
            Ok(())
        }
        .boxed()
    }

    fn skipped() -> BoxFuture<'static, TestReturn> {
        async {
            let supported = std::env::var("UNITEST_NEVER_SET_FLAG").is_ok();
            if !supported {
                skip();
            }
            Ok(())
        }
        .boxed()
    }

    fn returns_error() -> BoxFuture<'static, TestReturn> {
        async { Err("bad input".to_string()) }.boxed()
    }

    fn panics_before_future() -> BoxFuture<'static, TestReturn> {
        StructuredPanic::new("todo").message("not yet").raise()
    }

    fn plain_panic() -> BoxFuture<'static, TestReturn> {
        async {
            let values: Vec<u8> = Vec::new();
            if values.is_empty() {
                panic!("values is not defined");
            }
            Ok(())
        }
        .boxed()
    }

    fn executor() -> TestExecutor {
        let registry = Registry::builder()
            .module("m", |m| {
                m.test("ok", ok)
                    .test("boom", boom)
                    .test("skipped", skipped)
                    .test("returns_error", returns_error)
                    .test("panics_before_future", panics_before_future)
                    .test("plain_panic", plain_panic)
            })
            .module("pkg/m", |m| m.test("ok", ok))
            .build();
        TestExecutor::new(Arc::new(registry))
    }

    #[tokio::test]
    async fn test_passing_test() {
        assert_eq!(executor().execute(&Test::new("m", "ok")).await, Outcome::Ran);
    }

    #[tokio::test]
    async fn test_structured_panic() {
        let outcome = executor().execute(&Test::new("m", "boom")).await;
        let failure = outcome.failure().unwrap();
        assert_eq!(failure.panic_kind, PanicKind::Panic);
        assert_eq!(failure.message, "boom");
    }

    #[tokio::test]
    async fn test_skip() {
        let outcome = executor().execute(&Test::new("m", "skipped")).await;
        assert_eq!(outcome, Outcome::Skipped);
    }

    #[tokio::test]
    async fn test_missing_function() {
        let outcome = executor().execute(&Test::new("m", "missing")).await;
        assert_eq!(
            outcome,
            Outcome::Errored(TestFailure::generic("Function missing not found in module m"))
        );
    }

    #[tokio::test]
    async fn test_missing_module() {
        let outcome = executor().execute(&Test::new("gone", "ok")).await;
        assert_eq!(
            outcome.failure().map(|f| f.message.as_str()),
            Some("Module not found: gone")
        );
    }

    #[tokio::test]
    async fn test_result_checking() {
        let test = Test::new("m", "returns_error");
        assert_eq!(executor().execute(&test).await, Outcome::Ran);

        let outcome = executor().with_check_results(true).execute(&test).await;
        assert_eq!(
            outcome,
            Outcome::Errored(TestFailure::generic("Test returned Error: \"bad input\""))
        );
    }

    #[tokio::test]
    async fn test_panic_while_building_future() {
        let outcome = executor()
            .execute(&Test::new("m", "panics_before_future"))
            .await;
        assert_eq!(outcome.failure().map(|f| f.panic_kind.clone()), Some(PanicKind::Todo));
    }

    #[tokio::test]
    async fn test_plain_panic_is_classified() {
        let outcome = executor().execute(&Test::new("m", "plain_panic")).await;
        assert_eq!(
            outcome,
            Outcome::Errored(TestFailure::generic("Undefined: values"))
        );
    }

    #[tokio::test]
    async fn test_package_locator() {
        let executor = executor().with_package("pkg");
        assert_eq!(executor.execute(&Test::new("m", "ok")).await, Outcome::Ran);
        assert_eq!(
            executor.execute_at("pkg/m", "m", "ok", false).await,
            Outcome::Ran
        );
    }

    #[tokio::test]
    async fn test_missing_function_names_plan_module() {
        let executor = executor().with_package("pkg");
        let expected =
            Outcome::Errored(TestFailure::generic("Function missing not found in module m"));

        assert_eq!(executor.execute(&Test::new("m", "missing")).await, expected);
        assert_eq!(
            executor.execute_at("pkg/m", "m", "missing", false).await,
            expected
        );
    }
}
