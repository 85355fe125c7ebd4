//! Output formatters for pool results
//!
//! Provides table, JSON, and summary output formats.

use serde_json::json;

use crate::failure::encode_outcome;
use crate::models::{Outcome, PoolResult, RunSummary};

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    JsonPretty,
    Summary,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "table" => Some(OutputFormat::Table),
            "json" => Some(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Some(OutputFormat::JsonPretty),
            "summary" => Some(OutputFormat::Summary),
            _ => None,
        }
    }
}

/// Result formatter
pub struct ResultFormatter {
    format: OutputFormat,
    colorize: bool,
}

impl ResultFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            colorize: true,
        }
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    /// Enable ANSI colours only when `enabled`, e.g. when stdout is a terminal
    pub fn with_color(mut self, enabled: bool) -> Self {
        self.colorize = enabled;
        self
    }

    /// Format a single pool result
    pub fn format_result(&self, result: &PoolResult) -> String {
        match self.format {
            OutputFormat::Table => self.format_result_table(result),
            OutputFormat::Json => result_json(result).to_string(),
            OutputFormat::JsonPretty => {
                serde_json::to_string_pretty(&result_json(result)).unwrap_or_default()
            }
            OutputFormat::Summary => self.format_result_summary(result),
        }
    }

    fn format_result_table(&self, result: &PoolResult) -> String {
        let status_str = if self.colorize {
            match result.outcome {
                Outcome::Ran => "\x1b[32m✓ PASS\x1b[0m",
                Outcome::Skipped => "\x1b[33m○ SKIP\x1b[0m",
                Outcome::Errored(_) => "\x1b[31m✗ FAIL\x1b[0m",
            }
        } else {
            match result.outcome {
                Outcome::Ran => "✓ PASS",
                Outcome::Skipped => "○ SKIP",
                Outcome::Errored(_) => "✗ FAIL",
            }
        };

        let mut line = format!(
            "{:40} {} [{:>6}ms]",
            result.test.to_string(),
            status_str,
            result.duration_ms
        );
        if let Some(failure) = result.outcome.failure() {
            line.push_str(&format!("\n      {failure}"));
        }
        line
    }

    fn format_result_summary(&self, result: &PoolResult) -> String {
        format!(
            "{} {} ({}ms)",
            result.outcome.symbol(),
            result.test,
            result.duration_ms
        )
    }

    /// Format a whole run: every result followed by the summary
    pub fn format_run(&self, results: &[PoolResult], summary: &RunSummary) -> String {
        match self.format {
            OutputFormat::Table => self.format_run_table(results, summary),
            OutputFormat::Json => run_json(results, summary).to_string(),
            OutputFormat::JsonPretty => {
                serde_json::to_string_pretty(&run_json(results, summary)).unwrap_or_default()
            }
            OutputFormat::Summary => self.format_summary_brief(summary),
        }
    }

    fn format_run_table(&self, results: &[PoolResult], summary: &RunSummary) -> String {
        let mut output = String::new();

        output.push_str("\n══════════════════════════════════════════════════════════════\n");
        for result in results {
            output.push_str(&format!("  {}\n", self.format_result_table(result)));
        }
        output.push_str("══════════════════════════════════════════════════════════════\n");

        let pass_str = if self.colorize {
            format!("\x1b[32m{}\x1b[0m", summary.passed)
        } else {
            summary.passed.to_string()
        };
        let fail_str = if self.colorize && summary.failed > 0 {
            format!("\x1b[31m{}\x1b[0m", summary.failed)
        } else {
            summary.failed.to_string()
        };

        output.push_str(&format!(
            "  Total: {} | Pass: {} | Fail: {} | Skip: {}\n",
            summary.total, pass_str, fail_str, summary.skipped
        ));
        output.push_str(&format!(
            "  Pass Rate: {:5.1}% | Duration: {}ms\n",
            summary.pass_rate(),
            summary.total_duration_ms
        ));

        output
    }

    fn format_summary_brief(&self, summary: &RunSummary) -> String {
        format!(
            "{}/{} passed ({:.1}%), {} skipped in {}ms",
            summary.passed,
            summary.total,
            summary.pass_rate(),
            summary.skipped,
            summary.total_duration_ms
        )
    }
}

impl Default for ResultFormatter {
    fn default() -> Self {
        Self::new(OutputFormat::Table)
    }
}

fn result_json(result: &PoolResult) -> serde_json::Value {
    json!({
        "test": result.test,
        "durationMillis": result.duration_ms,
        "result": encode_outcome(&result.outcome),
    })
}

fn run_json(results: &[PoolResult], summary: &RunSummary) -> serde_json::Value {
    json!({
        "results": results.iter().map(result_json).collect::<Vec<_>>(),
        "summary": summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Test, TestFailure};

    fn sample() -> Vec<PoolResult> {
        vec![
            PoolResult::new(Test::new("m", "ok"), Outcome::Ran, 4),
            PoolResult::new(
                Test::new("m", "bad"),
                Outcome::Errored(TestFailure::generic("boom")),
                6,
            ),
        ]
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(OutputFormat::from_str("table"), Some(OutputFormat::Table));
        assert_eq!(OutputFormat::from_str("JSON"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::from_str("csv"), None);
    }

    #[test]
    fn test_format_result_table() {
        let formatter = ResultFormatter::default().no_color();
        let results = sample();

        let line = formatter.format_result(&results[1]);
        assert!(line.contains("m.bad"));
        assert!(line.contains("✗ FAIL"));
        assert!(line.contains("error: boom"));
    }

    #[test]
    fn test_plain_table_has_no_escape_codes() {
        let results = sample();
        let summary = RunSummary::new(&results);

        let plain = ResultFormatter::default()
            .with_color(false)
            .format_run(&results, &summary);
        assert!(!plain.contains('\x1b'));
        assert!(plain.contains("Pass: 1 | Fail: 1"));

        let colored = ResultFormatter::default()
            .with_color(true)
            .format_run(&results, &summary);
        assert!(colored.contains("\x1b[31m"));
    }

    #[test]
    fn test_format_run_json() {
        let formatter = ResultFormatter::new(OutputFormat::Json);
        let results = sample();
        let summary = RunSummary::new(&results);

        let value: serde_json::Value =
            serde_json::from_str(&formatter.format_run(&results, &summary)).unwrap();
        assert_eq!(value["summary"]["passed"], 1);
        assert_eq!(value["summary"]["failed"], 1);
        assert_eq!(value["results"][0]["result"]["kind"], "ran");
        assert_eq!(value["results"][1]["test"]["name"], "bad");
    }

    #[test]
    fn test_format_summary_brief() {
        let formatter = ResultFormatter::new(OutputFormat::Summary);
        let results = sample();
        let summary = RunSummary::new(&results);

        assert_eq!(
            formatter.format_run(&results, &summary),
            "1/2 passed (50.0%), 0 skipped in 10ms"
        );
    }
}
