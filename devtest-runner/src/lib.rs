// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for devtest, a host-side helper that selects tests out of a device test
//! module and dispatches them one at a time to an external executor.
//!
//! The basic flow of operations is:
//!
//! 1. Load a [`DevtestConfig`](config::DevtestConfig) and pick a profile.
//! 2. Build a [`TestFilter`](devtest_filtering::TestFilter) from the profile and the command line
//!    using [`test_filter::build_test_filter`].
//! 3. Enumerate tests into a [`TestList`](test_list::TestList).
//! 4. Dispatch selected tests with a [`TestRunner`](runner::TestRunner), passing each event to a
//!    [`Reporter`](reporter::Reporter).

pub mod config;
pub mod errors;
pub mod executor;
mod helpers;
pub mod partition;
pub mod reporter;
pub mod runner;
mod stopwatch;
pub mod test_filter;
pub mod test_list;
