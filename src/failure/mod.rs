//! Failure capture
//!
//! Classifies raised values into outcomes and carries them across the worker
//! boundary.

mod classifier;
mod codec;
mod raised;

pub use classifier::{panic_message, FailureClassifier, MessageRule};
pub use codec::{crash_error, decode_failure, decode_outcome, encode_failure, encode_outcome};
pub use raised::{
    assert_failed, install_quiet_hook, let_assert_failed, panic_with, render, skip, todo_with,
    SkipSignal, StructuredPanic,
};
