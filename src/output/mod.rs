//! Output formatting module
//!
//! Provides various output formats for pool results.

mod formatter;

pub use formatter::{OutputFormat, ResultFormatter};
