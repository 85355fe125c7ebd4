//! Outcome models for executed tests
//!
//! Defines outcomes, the structured failure taxonomy, pool results and run
//! summaries.

use serde::Serialize;
use std::fmt;

use super::Test;

/// How a sub-expression of a failed assertion was evaluated
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExprKind {
    /// A literal, with its rendered representation
    Literal(String),
    /// An evaluated expression, with the rendered value
    Expression(String),
    /// Not evaluated (or data was missing)
    Unevaluated,
}

/// A sub-expression of a failed assertion with its source span
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssertedExpr {
    pub start: u32,
    pub end: u32,
    pub kind: ExprKind,
}

impl AssertedExpr {
    pub fn new(start: u32, end: u32, kind: ExprKind) -> Self {
        Self { start, end, kind }
    }

    /// Degenerate expression used whenever data is absent or malformed
    pub fn unevaluated() -> Self {
        Self {
            start: 0,
            end: 0,
            kind: ExprKind::Unevaluated,
        }
    }
}

impl Default for AssertedExpr {
    fn default() -> Self {
        Self::unevaluated()
    }
}

/// Shape of the asserted expression
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssertKind {
    BinaryOperator {
        operator: String,
        left: AssertedExpr,
        right: AssertedExpr,
    },
    FunctionCall {
        arguments: Vec<AssertedExpr>,
    },
    OtherExpression {
        expression: AssertedExpr,
    },
}

impl Default for AssertKind {
    fn default() -> Self {
        AssertKind::OtherExpression {
            expression: AssertedExpr::unevaluated(),
        }
    }
}

/// Why a test failed
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PanicKind {
    Assert {
        start: u32,
        end: u32,
        expression_start: u32,
        assert_kind: AssertKind,
    },
    Panic,
    Todo,
    LetAssert {
        start: u32,
        end: u32,
        value: String,
    },
    Generic,
}

impl PanicKind {
    pub fn label(&self) -> &'static str {
        match self {
            PanicKind::Assert { .. } => "assert",
            PanicKind::Panic => "panic",
            PanicKind::Todo => "todo",
            PanicKind::LetAssert { .. } => "let assert",
            PanicKind::Generic => "error",
        }
    }
}

/// Structured description of a failed test
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestFailure {
    pub message: String,
    pub file: String,
    pub module: String,
    pub function: String,
    pub line: u32,
    pub panic_kind: PanicKind,
}

impl TestFailure {
    /// Failure without source location, classified `Generic`
    pub fn generic(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            file: String::new(),
            module: String::new(),
            function: String::new(),
            line: 0,
            panic_kind: PanicKind::Generic,
        }
    }

    pub fn is_generic(&self) -> bool {
        matches!(self.panic_kind, PanicKind::Generic)
    }
}

impl fmt::Display for TestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.panic_kind.label(), self.message)?;
        if !self.file.is_empty() {
            write!(f, " ({}:{})", self.file, self.line)?;
        }
        Ok(())
    }
}

/// Classified result of running one test
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Ran,
    Skipped,
    Errored(TestFailure),
}

impl Outcome {
    pub fn symbol(&self) -> &'static str {
        match self {
            Outcome::Ran => "✓",
            Outcome::Skipped => "○",
            Outcome::Errored(_) => "✗",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Ran)
    }

    pub fn failure(&self) -> Option<&TestFailure> {
        match self {
            Outcome::Errored(failure) => Some(failure),
            _ => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Ran => write!(f, "PASS"),
            Outcome::Skipped => write!(f, "SKIP"),
            Outcome::Errored(_) => write!(f, "FAIL"),
        }
    }
}

/// Outcome of one test as delivered by the pool
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolResult {
    pub test: Test,
    pub outcome: Outcome,
    pub duration_ms: u64,
}

impl PoolResult {
    pub fn new(test: Test, outcome: Outcome, duration_ms: u64) -> Self {
        Self {
            test,
            outcome,
            duration_ms,
        }
    }
}

impl fmt::Display for PoolResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{}ms]",
            self.outcome.symbol(),
            self.test,
            self.duration_ms
        )?;
        if let Outcome::Errored(failure) = &self.outcome {
            write!(f, " - {failure}")?;
        }
        Ok(())
    }
}

/// Aggregate counts over a finished run
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub total_duration_ms: u64,
}

impl RunSummary {
    pub fn new(results: &[PoolResult]) -> Self {
        let passed = results
            .iter()
            .filter(|r| matches!(r.outcome, Outcome::Ran))
            .count();
        let skipped = results
            .iter()
            .filter(|r| matches!(r.outcome, Outcome::Skipped))
            .count();
        let failed = results
            .iter()
            .filter(|r| matches!(r.outcome, Outcome::Errored(_)))
            .count();

        Self {
            total: results.len(),
            passed,
            failed,
            skipped,
            total_duration_ms: results.iter().map(|r| r.duration_ms).sum(),
        }
    }

    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.passed as f64 / self.total as f64) * 100.0
        }
    }

    pub fn is_all_passed(&self) -> bool {
        self.failed == 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Total: {} | Pass: {} | Fail: {} | Skip: {} | Duration: {}ms",
            self.total, self.passed, self.failed, self.skipped, self.total_duration_ms
        )
    }
}
