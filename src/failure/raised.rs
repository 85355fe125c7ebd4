//! Values a test can raise
//!
//! Tests fail by panicking. Besides plain `panic!` messages, a test (or the
//! assertion helpers of a test library) can raise a [`SkipSignal`] or a
//! [`StructuredPanic`] carrying source metadata.

use std::fmt::Debug;
use std::panic;
use std::sync::Once;

use crate::models::AssertKind;

/// Payload raised by [`skip`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SkipSignal;

/// Mark the running test as skipped
pub fn skip() -> ! {
    panic::panic_any(SkipSignal)
}

/// Panic payload carrying structured failure metadata.
///
/// `origin` selects the failure kind (`"assert"`, `"panic"`, `"todo"`,
/// `"let_assert"`); any other tag is treated as a generic failure. Absent
/// fields classify as `""` or `0`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StructuredPanic {
    pub origin: String,
    pub message: Option<String>,
    pub file: Option<String>,
    pub module: Option<String>,
    pub function: Option<String>,
    pub line: Option<u32>,
    pub start: Option<u32>,
    pub end: Option<u32>,
    pub expression_start: Option<u32>,
    pub assert_kind: Option<AssertKind>,
    pub value: Option<String>,
}

impl StructuredPanic {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            ..Self::default()
        }
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Set the source location of the failing expression
    pub fn location(
        mut self,
        file: impl Into<String>,
        module: impl Into<String>,
        function: impl Into<String>,
        line: u32,
    ) -> Self {
        self.file = Some(file.into());
        self.module = Some(module.into());
        self.function = Some(function.into());
        self.line = Some(line);
        self
    }

    pub fn span(mut self, start: u32, end: u32) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    pub fn expression_start(mut self, offset: u32) -> Self {
        self.expression_start = Some(offset);
        self
    }

    pub fn assert_kind(mut self, kind: AssertKind) -> Self {
        self.assert_kind = Some(kind);
        self
    }

    /// Attach the value that failed to match, rendered with [`render`]
    pub fn value(mut self, value: &impl Debug) -> Self {
        self.value = Some(render(value));
        self
    }

    /// Raise this payload as a panic
    pub fn raise(self) -> ! {
        panic::panic_any(self)
    }
}

/// Deterministic human-readable rendering of a value
pub fn render(value: &impl Debug) -> String {
    format!("{value:?}")
}

/// Raise an explicit `panic` failure
pub fn panic_with(message: impl Into<String>) -> ! {
    StructuredPanic::new("panic").message(message).raise()
}

/// Raise a `todo` failure
pub fn todo_with(message: impl Into<String>) -> ! {
    StructuredPanic::new("todo").message(message).raise()
}

/// Raise an `assert` failure describing the asserted expression
pub fn assert_failed(message: impl Into<String>, kind: AssertKind) -> ! {
    StructuredPanic::new("assert")
        .message(message)
        .assert_kind(kind)
        .raise()
}

/// Raise a `let_assert` failure for a value that did not match its pattern
pub fn let_assert_failed(message: impl Into<String>, value: &impl Debug) -> ! {
    StructuredPanic::new("let_assert")
        .message(message)
        .value(value)
        .raise()
}

static QUIET_HOOK: Once = Once::new();

/// Keep skip signals and structured failures off stderr.
///
/// Other panics are forwarded to the previously installed hook. Safe to call
/// any number of times.
pub fn install_quiet_hook() {
    QUIET_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let payload = info.payload();
            if payload.is::<SkipSignal>() || payload.is::<StructuredPanic>() {
                return;
            }
            previous(info);
        }));
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_raises_signal() {
        install_quiet_hook();
        let payload = panic::catch_unwind(|| skip()).unwrap_err();
        assert!(payload.is::<SkipSignal>());
    }

    #[test]
    fn test_builder_sets_fields() {
        let raised = StructuredPanic::new("let_assert")
            .message("Pattern match failed")
            .location("src/app.gleam", "app", "parse_test", 7)
            .span(10, 42)
            .value(&Some(3));

        assert_eq!(raised.origin, "let_assert");
        assert_eq!(raised.line, Some(7));
        assert_eq!(raised.end, Some(42));
        assert_eq!(raised.value.as_deref(), Some("Some(3)"));
        assert_eq!(raised.expression_start, None);
    }

    #[test]
    fn test_panic_with_payload() {
        install_quiet_hook();
        let payload = panic::catch_unwind(|| panic_with("stop")).unwrap_err();
        let raised = payload.downcast::<StructuredPanic>().unwrap();
        assert_eq!(raised.origin, "panic");
        assert_eq!(raised.message.as_deref(), Some("stop"));
    }

    #[test]
    fn test_render_quotes_strings() {
        assert_eq!(render(&"abc"), "\"abc\"");
        assert_eq!(render(&vec![1, 2]), "[1, 2]");
    }
}
