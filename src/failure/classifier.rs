//! Failure classification
//!
//! Turns a raised panic payload or a host error into exactly one [`Outcome`].
//! Generic runtime errors are recognised by message shape; the shapes are a
//! best-effort heuristic tied to host error wording, so they are kept as an
//! ordered, swappable rule list.

use std::any::Any;
use std::sync::LazyLock;

use regex::Regex;

use super::raised::{SkipSignal, StructuredPanic};
use crate::models::{AssertKind, Outcome, PanicKind, TestFailure};

/// One message shape: a pattern with a single capture group for the name
#[derive(Clone, Debug)]
pub struct MessageRule {
    pattern: Regex,
    prefix: String,
}

impl MessageRule {
    pub fn new(pattern: &str, prefix: impl Into<String>) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            prefix: prefix.into(),
        })
    }

    fn apply(&self, message: &str) -> Option<String> {
        let captures = self.pattern.captures(message)?;
        let name = captures.get(1)?.as_str();
        Some(format!("{}{}", self.prefix, name))
    }
}

/// Host message shapes, tried in list order for every message.
///
/// Precedence comes only from position: the first matching rule wins, so a
/// message matching both the module and the export shape reports the module.
/// Rule lists passed to [`FailureClassifier::with_rules`] follow the same order.
static HOST_RULES: LazyLock<Vec<MessageRule>> = LazyLock::new(|| {
    [
        (r#"Cannot find module ['"]([^'"]+)['"]"#, "Module not found: "),
        (
            r#"does not provide an export named ['"]([^'"]+)['"]"#,
            "Undefined function: ",
        ),
        (r"(\w+) is not a function", "Undefined function: "),
        (r"(\w+) is not defined", "Undefined: "),
    ]
    .into_iter()
    .map(|(pattern, prefix)| MessageRule::new(pattern, prefix).expect("valid host pattern"))
    .collect()
});

/// Classifies raised values into outcomes
#[derive(Clone, Debug)]
pub struct FailureClassifier {
    rules: Vec<MessageRule>,
}

impl Default for FailureClassifier {
    fn default() -> Self {
        Self {
            rules: HOST_RULES.clone(),
        }
    }
}

impl FailureClassifier {
    /// Classifier with a custom ordered rule list; the first match wins
    pub fn with_rules(rules: Vec<MessageRule>) -> Self {
        Self { rules }
    }

    /// Classify a panic payload caught around a test invocation
    pub fn classify_panic(&self, payload: Box<dyn Any + Send>) -> Outcome {
        if payload.is::<SkipSignal>() {
            return Outcome::Skipped;
        }

        match payload.downcast::<StructuredPanic>() {
            Ok(raised) => Outcome::Errored(self.classify_structured(*raised)),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                Outcome::Errored(self.classify_message(&message))
            }
        }
    }

    /// Classify a host error (for example a failed module load)
    pub fn classify_error(&self, error: &dyn std::error::Error) -> TestFailure {
        self.classify_message(&error.to_string())
    }

    /// Classify a generic runtime error message
    pub fn classify_message(&self, message: &str) -> TestFailure {
        TestFailure::generic(self.format_generic(message))
    }

    /// Rewrite a known infrastructure failure shape, or pass the message through
    pub fn format_generic(&self, message: &str) -> String {
        self.rules
            .iter()
            .find_map(|rule| rule.apply(message))
            .unwrap_or_else(|| message.to_string())
    }

    /// Map structured metadata to a failure, defaulting absent fields
    pub fn classify_structured(&self, raised: StructuredPanic) -> TestFailure {
        let start = raised.start.unwrap_or(0);
        let end = raised.end.unwrap_or(0);

        let panic_kind = match raised.origin.as_str() {
            "assert" => PanicKind::Assert {
                start,
                end,
                expression_start: raised.expression_start.unwrap_or(0),
                assert_kind: raised.assert_kind.unwrap_or_else(AssertKind::default),
            },
            "panic" => PanicKind::Panic,
            "todo" => PanicKind::Todo,
            "let_assert" => PanicKind::LetAssert {
                start,
                end,
                value: raised.value.unwrap_or_default(),
            },
            _ => PanicKind::Generic,
        };

        TestFailure {
            message: raised.message.unwrap_or_default(),
            file: raised.file.unwrap_or_default(),
            module: raised.module.unwrap_or_default(),
            function: raised.function.unwrap_or_default(),
            line: raised.line.unwrap_or(0),
            panic_kind,
        }
    }
}

/// Text of a plain panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}
