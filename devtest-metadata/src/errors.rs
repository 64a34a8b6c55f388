// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::{error, fmt};

/// An error that occurs while parsing a [`TestIdentifier`](crate::TestIdentifier) from a
/// `class#method` string.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TestIdentifierParseError {
    input: String,
    reason: &'static str,
}

impl TestIdentifierParseError {
    pub(crate) fn new(input: impl Into<String>, reason: &'static str) -> Self {
        Self {
            input: input.into(),
            reason,
        }
    }

    /// Returns the input that failed to parse.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Returns the reason the input failed to parse.
    pub fn reason(&self) -> &'static str {
        self.reason
    }
}

impl fmt::Display for TestIdentifierParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "invalid test identifier `{}`: {}", self.input, self.reason)
    }
}

impl error::Error for TestIdentifierParseError {}
