// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced while building filters.

use crate::FilterKind;
use thiserror::Error;

/// A filter entry was malformed.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("invalid filter `{entry}`: {reason}")]
pub struct InvalidFilterError {
    entry: String,
    reason: &'static str,
}

impl InvalidFilterError {
    pub(crate) fn new(entry: impl Into<String>, reason: &'static str) -> Self {
        Self {
            entry: entry.into(),
            reason,
        }
    }

    /// Returns the entry that was rejected.
    pub fn entry(&self) -> &str {
        &self.entry
    }
}

/// An error that occurred while parsing raw `--name=value` filter arguments.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[non_exhaustive]
pub enum FilterArgParseError {
    /// The argument did not start with `--` or had no `=value` part.
    #[error("filter argument `{arg}` must be in the format `--name=value`")]
    Malformed {
        /// The argument.
        arg: String,
    },

    /// The option name is not a known filter option.
    #[error("unknown filter option `--{name}` (known options: {})", FilterKind::ALL_OPTIONS.join(", "))]
    UnknownOption {
        /// The option name, without leading dashes.
        name: String,
    },
}

/// An error that occurred while building a [`TestFilter`](crate::TestFilter).
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("failed to build {kind} filters")]
pub struct TestFilterBuildError {
    kind: FilterKind,
    #[source]
    err: InvalidFilterError,
}

impl TestFilterBuildError {
    pub(crate) fn new(kind: FilterKind, err: InvalidFilterError) -> Self {
        Self { kind, err }
    }

    /// Returns whether this error came from include or exclude filters.
    pub fn kind(&self) -> FilterKind {
        self.kind
    }
}
