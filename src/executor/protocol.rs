//! Worker message protocol
//!
//! Plain, serde-serializable messages exchanged between the scheduler and a
//! worker thread. Outcomes travel inside `result` messages in the encoded
//! form produced by [`crate::failure::encode_outcome`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request to run one test, addressed by its global index
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    pub test_index: usize,
    pub unit_locator: String,
    /// Module identifier as named in the plan, used in failure messages
    pub module: String,
    pub function_name: String,
    pub check_results: bool,
}

/// Scheduler to worker
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Command {
    Run(RunRequest),
}

/// Worker to scheduler
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum WorkerMessage {
    Ready,
    Result {
        test_index: usize,
        #[serde(rename = "durationMillis")]
        duration_ms: u64,
        result: Value,
    },
}
