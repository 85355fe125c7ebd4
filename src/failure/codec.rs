//! Cross-boundary outcome codec
//!
//! Converts outcomes to and from plain JSON structures that can travel
//! between a worker thread and the scheduler. Decoding never fails: unknown
//! tags fall back to `Generic` / `Unevaluated` and missing fields to `""` / `0`.

use serde_json::{json, Map, Value};

use crate::models::{AssertKind, AssertedExpr, ExprKind, Outcome, PanicKind, TestFailure};

/// Outcome synthesised when a test's result cannot be received
pub fn crash_error(message: impl Into<String>) -> Outcome {
    Outcome::Errored(TestFailure::generic(message))
}

pub fn encode_outcome(outcome: &Outcome) -> Value {
    match outcome {
        Outcome::Ran => json!({ "kind": "ran" }),
        Outcome::Skipped => json!({ "kind": "skip" }),
        Outcome::Errored(failure) => {
            let mut encoded = encode_failure(failure);
            if let Value::Object(fields) = &mut encoded {
                fields.insert("kind".to_string(), json!("error"));
            }
            encoded
        }
    }
}

pub fn decode_outcome(value: &Value) -> Outcome {
    match str_field(value, "kind") {
        "ran" => Outcome::Ran,
        "skip" => Outcome::Skipped,
        "error" => Outcome::Errored(decode_failure(value)),
        other => crash_error(format!("Malformed test result: unknown kind '{other}'")),
    }
}

pub fn encode_failure(failure: &TestFailure) -> Value {
    json!({
        "message": failure.message,
        "file": failure.file,
        "module": failure.module,
        "fn": failure.function,
        "line": failure.line,
        "panicKind": encode_panic_kind(&failure.panic_kind),
    })
}

pub fn decode_failure(value: &Value) -> TestFailure {
    TestFailure {
        message: string_field(value, "message"),
        file: string_field(value, "file"),
        module: string_field(value, "module"),
        function: string_field(value, "fn"),
        line: int_field(value, "line"),
        panic_kind: value
            .get("panicKind")
            .map(decode_panic_kind)
            .unwrap_or(PanicKind::Generic),
    }
}

fn encode_panic_kind(kind: &PanicKind) -> Value {
    match kind {
        PanicKind::Assert {
            start,
            end,
            expression_start,
            assert_kind,
        } => json!({
            "type": "assert",
            "start": start,
            "end": end,
            "expressionStart": expression_start,
            "assertKind": encode_assert_kind(assert_kind),
        }),
        PanicKind::Panic => json!({ "type": "panic" }),
        PanicKind::Todo => json!({ "type": "todo" }),
        PanicKind::LetAssert { start, end, value } => json!({
            "type": "let_assert",
            "start": start,
            "end": end,
            "value": value,
        }),
        PanicKind::Generic => json!({ "type": "generic" }),
    }
}

fn decode_panic_kind(value: &Value) -> PanicKind {
    match str_field(value, "type") {
        "assert" => PanicKind::Assert {
            start: int_field(value, "start"),
            end: int_field(value, "end"),
            expression_start: int_field(value, "expressionStart"),
            assert_kind: value
                .get("assertKind")
                .map(decode_assert_kind)
                .unwrap_or_default(),
        },
        "panic" => PanicKind::Panic,
        "todo" => PanicKind::Todo,
        "let_assert" => PanicKind::LetAssert {
            start: int_field(value, "start"),
            end: int_field(value, "end"),
            value: string_field(value, "value"),
        },
        _ => PanicKind::Generic,
    }
}

fn encode_assert_kind(kind: &AssertKind) -> Value {
    match kind {
        AssertKind::BinaryOperator {
            operator,
            left,
            right,
        } => json!({
            "type": "binary_operator",
            "operator": operator,
            "left": encode_expr(left),
            "right": encode_expr(right),
        }),
        AssertKind::FunctionCall { arguments } => json!({
            "type": "function_call",
            "arguments": arguments.iter().map(encode_expr).collect::<Vec<_>>(),
        }),
        AssertKind::OtherExpression { expression } => json!({
            "type": "other_expression",
            "expression": encode_expr(expression),
        }),
    }
}

fn decode_assert_kind(value: &Value) -> AssertKind {
    match str_field(value, "type") {
        "binary_operator" => AssertKind::BinaryOperator {
            operator: value
                .get("operator")
                .and_then(Value::as_str)
                .unwrap_or("==")
                .to_string(),
            left: expr_field(value, "left"),
            right: expr_field(value, "right"),
        },
        "function_call" => AssertKind::FunctionCall {
            arguments: value
                .get("arguments")
                .and_then(Value::as_array)
                .map(|args| args.iter().map(decode_expr).collect())
                .unwrap_or_default(),
        },
        "other_expression" => AssertKind::OtherExpression {
            expression: expr_field(value, "expression"),
        },
        _ => AssertKind::default(),
    }
}

fn encode_expr(expr: &AssertedExpr) -> Value {
    let mut fields = Map::new();
    fields.insert("start".to_string(), json!(expr.start));
    fields.insert("end".to_string(), json!(expr.end));
    match &expr.kind {
        ExprKind::Literal(repr) => {
            fields.insert("type".to_string(), json!("literal"));
            fields.insert("value".to_string(), json!(repr));
        }
        ExprKind::Expression(repr) => {
            fields.insert("type".to_string(), json!("expression"));
            fields.insert("value".to_string(), json!(repr));
        }
        ExprKind::Unevaluated => {
            fields.insert("type".to_string(), json!("unevaluated"));
        }
    }
    Value::Object(fields)
}

fn decode_expr(value: &Value) -> AssertedExpr {
    let kind = match str_field(value, "type") {
        "literal" => ExprKind::Literal(string_field(value, "value")),
        "expression" => ExprKind::Expression(string_field(value, "value")),
        "unevaluated" => ExprKind::Unevaluated,
        _ => return AssertedExpr::unevaluated(),
    };

    AssertedExpr {
        start: int_field(value, "start"),
        end: int_field(value, "end"),
        kind,
    }
}

fn expr_field(value: &Value, key: &str) -> AssertedExpr {
    value
        .get(key)
        .map(decode_expr)
        .unwrap_or_else(AssertedExpr::unevaluated)
}

fn str_field<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or("")
}

fn string_field(value: &Value, key: &str) -> String {
    str_field(value, key).to_string()
}

fn int_field(value: &Value, key: &str) -> u32 {
    value
        .get(key)
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(0)
}
