// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::TestIdentifier;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Serializable information about a computed test list.
///
/// This is the output of `devtest list --message-format json`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub struct TestListSummary {
    /// The total number of tests in the universe.
    pub test_count: usize,

    /// The number of tests that will be run.
    pub run_count: usize,

    /// The tests, in enumeration order.
    pub tests: Vec<TestCaseSummary>,
}

impl TestListSummary {
    /// Creates a new, empty summary.
    pub fn new() -> Self {
        Self {
            test_count: 0,
            run_count: 0,
            tests: Vec::new(),
        }
    }

    /// Parses JSON output produced by `devtest list --message-format json`.
    pub fn parse_json(json: impl AsRef<str>) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json.as_ref())
    }

    /// Adds a test to this summary.
    pub fn push(&mut self, id: TestIdentifier, filter_match: FilterMatch) {
        self.test_count += 1;
        if filter_match.is_match() {
            self.run_count += 1;
        }
        self.tests.push(TestCaseSummary { id, filter_match });
    }
}

impl Default for TestListSummary {
    fn default() -> Self {
        Self::new()
    }
}

/// A single test within a [`TestListSummary`].
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TestCaseSummary {
    /// The test's identifier.
    pub id: TestIdentifier,

    /// Whether the test will be run, and if not, why.
    pub filter_match: FilterMatch,
}

/// An enum describing whether a test matches a filter.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "status")]
pub enum FilterMatch {
    /// This test matches this filter.
    Matches,

    /// This test does not match this filter.
    ///
    /// The `MismatchReason` inside describes the reason this filter isn't matched.
    Mismatch {
        /// The reason the test was filtered out.
        reason: MismatchReason,
    },
}

impl FilterMatch {
    /// Returns true if the filter matches.
    pub fn is_match(&self) -> bool {
        matches!(self, FilterMatch::Matches)
    }
}

/// The reason for why a test doesn't match a filter.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum MismatchReason {
    /// The test's package, class or method matches an exclude filter.
    Excluded,

    /// Include filters were specified, and none of them match this test.
    NotIncluded,

    /// The test is in a different partition.
    Partition,
}

impl fmt::Display for MismatchReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MismatchReason::Excluded => write!(f, "matches an exclude filter"),
            MismatchReason::NotIncluded => write!(f, "does not match any include filter"),
            MismatchReason::Partition => write!(f, "is in a different partition"),
        }
    }
}
