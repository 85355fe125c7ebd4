//! Test identity and batch models
//!
//! Defines the tests handed over by the plan provider and the batches the
//! scheduler dispatches.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One test case, identified by its module and function name
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Test {
    pub module: String,
    pub name: String,
}

impl Test {
    pub fn new(module: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for Test {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.module, self.name)
    }
}

/// Ordered group of tests from one module, the unit of work dispatch.
///
/// `global_start_index` is the index of the first test in the flattened plan;
/// replies coming back from a worker are addressed by
/// `global_start_index + position`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Batch {
    pub tests: Vec<Test>,
    pub global_start_index: usize,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    /// Module shared by every test in the batch
    pub fn module(&self) -> Option<&str> {
        self.tests.first().map(|t| t.module.as_str())
    }

    /// Iterate `(global_index, test)` pairs
    pub fn indexed(&self) -> impl Iterator<Item = (usize, &Test)> {
        self.tests
            .iter()
            .enumerate()
            .map(move |(i, t)| (self.global_start_index + i, t))
    }
}

/// Build batches from module groups, assigning running global indices.
///
/// Empty groups are dropped.
pub fn batches_from_groups(groups: Vec<Vec<Test>>) -> Vec<Batch> {
    let mut batches = Vec::with_capacity(groups.len());
    let mut next_index = 0;

    for tests in groups.into_iter().filter(|g| !g.is_empty()) {
        let len = tests.len();
        batches.push(Batch {
            tests,
            global_start_index: next_index,
        });
        next_index += len;
    }

    batches
}

/// Partition an ordered test list into batches of consecutive same-module tests
pub fn partition(tests: Vec<Test>) -> Vec<Batch> {
    let mut groups: Vec<Vec<Test>> = Vec::new();

    for test in tests {
        match groups.last_mut() {
            Some(group) if group[0].module == test.module => group.push(test),
            _ => groups.push(vec![test]),
        }
    }

    batches_from_groups(groups)
}

/// Flatten batches back into plan order; position equals global index
pub fn flatten(batches: &[Batch]) -> Vec<Test> {
    batches.iter().flat_map(|b| b.tests.iter().cloned()).collect()
}
