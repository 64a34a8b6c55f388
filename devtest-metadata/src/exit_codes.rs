// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Documented exit codes for `devtest` failures.
///
/// `devtest` runs may fail for a variety of reasons. This structure documents the exit codes that
/// may occur in case of expected failures.
///
/// Unknown/unexpected failures will always result in exit code 1.
pub enum DevtestExitCode {}

impl DevtestExitCode {
    /// No errors occurred and devtest exited normally.
    pub const OK: i32 = 0;

    /// No tests were selected to run, but no other errors occurred.
    pub const NO_TESTS_RUN: i32 = 4;

    /// A user issue happened while setting up a devtest invocation: bad filter arguments, an
    /// unknown profile, or an invalid config file.
    pub const SETUP_ERROR: i32 = 96;

    /// One or more tests failed or errored.
    pub const TEST_RUN_FAILED: i32 = 100;

    /// Creating a test list produced an error.
    pub const TEST_LIST_CREATION_FAILED: i32 = 104;

    /// Writing data to stdout or stderr produced an error.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;
}
