// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The dispatcher: runs selected tests one at a time and records their outcomes.

use crate::{
    config::ExecutorConfig,
    errors::{DisplayErrorChain, ExecutorError},
    executor::TestExecutor,
    helpers::{panic_payload_to_string, plural},
    stopwatch::stopwatch,
    test_list::{TestIndex, TestList},
};
use chrono::{DateTime, Local};
use devtest_metadata::{TestIdentifier, TestOutcome};
use std::{
    convert::Infallible,
    panic::{self, AssertUnwindSafe},
    time::Duration,
};
use tracing::{debug, warn};

/// Test runner options.
#[derive(Clone, Debug)]
pub struct TestRunnerBuilder {
    connect_retries: usize,
    connect_retry_delay: Duration,
}

impl Default for TestRunnerBuilder {
    fn default() -> Self {
        Self {
            connect_retries: 3,
            connect_retry_delay: Duration::from_millis(500),
        }
    }
}

impl TestRunnerBuilder {
    /// Sets how many times a failed connection is retried, and how long to wait in between.
    pub fn set_connect_retries(&mut self, retries: usize, delay: Duration) -> &mut Self {
        self.connect_retries = retries;
        self.connect_retry_delay = delay;
        self
    }

    /// Sets connection retry options from a profile's executor settings.
    pub fn set_executor_config(&mut self, config: &ExecutorConfig<'_>) -> &mut Self {
        self.set_connect_retries(config.connect_retries(), config.connect_retry_delay())
    }

    /// Creates a new test runner for the selected tests in `test_list`.
    pub fn build<'list, E: TestExecutor>(
        &self,
        test_list: &'list TestList,
        executor: E,
    ) -> TestRunner<'list, E> {
        TestRunner {
            test_list,
            executor,
            connect_retries: self.connect_retries,
            connect_retry_delay: self.connect_retry_delay,
        }
    }
}

/// Context for running tests.
///
/// Created using [`TestRunnerBuilder::build`].
#[derive(Debug)]
pub struct TestRunner<'list, E> {
    test_list: &'list TestList,
    executor: E,
    connect_retries: usize,
    connect_retry_delay: Duration,
}

impl<'list, E: TestExecutor> TestRunner<'list, E> {
    /// Executes the selected tests sequentially, in enumeration order.
    ///
    /// The callback is called with each event as it happens.
    pub fn execute<F>(self, mut callback: F) -> RunResults
    where
        F: FnMut(TestEvent<'list>),
    {
        self.try_execute::<Infallible, _>(|event| {
            callback(event);
            Ok(())
        })
        .unwrap_or_else(|never| match never {})
    }

    /// Executes the selected tests sequentially, in enumeration order.
    ///
    /// Accepts a callback that is called with each event as it happens. If the callback returns an
    /// error, no further tests are dispatched and the error is returned.
    pub fn try_execute<Err, F>(mut self, mut callback: F) -> Result<RunResults, Err>
    where
        F: FnMut(TestEvent<'list>) -> Result<(), Err>,
    {
        let test_list = self.test_list;
        let run_stopwatch = stopwatch();
        let mut results = RunResults::new(test_list);

        callback(TestEvent::RunStarted {
            test_list,
            start_time: run_stopwatch.start_time(),
        })?;

        // If the executor can't be reached, every selected test is an error. The run still
        // finishes so that supervising processes see every test.
        let connect_error = self
            .connect()
            .err()
            .map(|error| DisplayErrorChain::new(&error).to_string());

        for (index, id) in test_list.iter_selected() {
            callback(TestEvent::TestStarted { index, id })?;

            let status = match &connect_error {
                Some(text) => TestRunStatus::not_run(text.clone()),
                None => self.run_test(id),
            };
            results.push(index, status.clone());

            callback(TestEvent::TestFinished { index, id, status })?;
        }

        let snapshot = run_stopwatch.snapshot();
        callback(TestEvent::RunFinished {
            start_time: snapshot.start_time,
            elapsed: snapshot.duration,
            run_stats: results.stats,
        })?;

        Ok(results)
    }

    // ---
    // Helper methods
    // ---

    fn connect(&mut self) -> Result<(), ExecutorError> {
        let attempts = self.connect_retries + 1;
        let mut attempt = 1;
        loop {
            let error = match self.catch_panic(|executor| executor.connect()) {
                Ok(()) => return Ok(()),
                Err(error) => error,
            };
            if attempt >= attempts {
                return Err(ExecutorError::ConnectRetriesExhausted {
                    attempts,
                    last_error: Box::new(error),
                });
            }

            warn!(
                "failed to connect to executor ({attempt}/{attempts} {}), retrying in {}: {}",
                plural::attempts_str(attempts),
                humantime::format_duration(self.connect_retry_delay),
                DisplayErrorChain::new(&error),
            );
            std::thread::sleep(self.connect_retry_delay);
            attempt += 1;
        }
    }

    // A panicking executor is treated like one that returned an error.
    fn catch_panic<T>(
        &mut self,
        f: impl FnOnce(&mut E) -> Result<T, ExecutorError>,
    ) -> Result<T, ExecutorError> {
        let executor = &mut self.executor;
        panic::catch_unwind(AssertUnwindSafe(|| f(executor))).unwrap_or_else(|payload| {
            Err(ExecutorError::Panicked {
                message: panic_payload_to_string(payload),
            })
        })
    }

    fn run_test(&mut self, id: &TestIdentifier) -> TestRunStatus {
        let test_stopwatch = stopwatch();
        let result = self.catch_panic(|executor| executor.execute(id));
        let snapshot = test_stopwatch.snapshot();

        match result {
            Ok(output) => {
                let failure_text = output.failure_text();
                TestRunStatus {
                    outcome: if output.is_success() {
                        TestOutcome::Pass
                    } else {
                        TestOutcome::Fail
                    },
                    start_time: snapshot.start_time,
                    time_taken: snapshot.duration,
                    failure_text,
                    stdout: output.stdout,
                    stderr: output.stderr,
                }
            }
            Err(error) => {
                let text = DisplayErrorChain::new(&error).to_string();
                warn!("error running {id}: {text}");
                TestRunStatus {
                    outcome: TestOutcome::Error,
                    start_time: snapshot.start_time,
                    time_taken: snapshot.duration,
                    failure_text: Some(text),
                    stdout: String::new(),
                    stderr: String::new(),
                }
            }
        }
    }
}

/// An event that occurs while dispatching tests.
#[derive(Clone, Debug)]
pub enum TestEvent<'list> {
    /// The run started.
    RunStarted {
        /// The list of tests being run.
        test_list: &'list TestList,

        /// When the run started.
        start_time: DateTime<Local>,
    },

    /// A test started running.
    TestStarted {
        /// The test's position in the list.
        index: TestIndex,

        /// The test's identifier.
        id: &'list TestIdentifier,
    },

    /// A test finished running.
    TestFinished {
        /// The test's position in the list.
        index: TestIndex,

        /// The test's identifier.
        id: &'list TestIdentifier,

        /// What happened.
        status: TestRunStatus,
    },

    /// The run finished.
    RunFinished {
        /// When the run started.
        start_time: DateTime<Local>,

        /// How long the run took.
        elapsed: Duration,

        /// Statistics for the run.
        run_stats: RunStats,
    },
}

/// Information about a test that finished running.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TestRunStatus {
    /// The outcome of the test.
    pub outcome: TestOutcome,

    /// When the test started, by the wall clock.
    pub start_time: DateTime<Local>,

    /// How long the test took, by the monotonic clock.
    pub time_taken: Duration,

    /// Why the test failed or errored, if it did.
    pub failure_text: Option<String>,

    /// Captured standard output.
    pub stdout: String,

    /// Captured standard error.
    pub stderr: String,
}

impl TestRunStatus {
    fn not_run(failure_text: String) -> Self {
        Self {
            outcome: TestOutcome::Error,
            start_time: Local::now(),
            time_taken: Duration::ZERO,
            failure_text: Some(failure_text),
            stdout: String::new(),
            stderr: String::new(),
        }
    }
}

/// The outcome of a single dispatched test.
#[derive(Clone, Debug)]
pub struct TestResult {
    /// The test's position in the list.
    pub index: TestIndex,

    /// What happened.
    pub status: TestRunStatus,
}

/// Results for a test run, in dispatch order.
///
/// Results are only ever appended; a recorded result is never changed.
#[derive(Clone, Debug)]
pub struct RunResults {
    results: Vec<TestResult>,
    stats: RunStats,
}

impl RunResults {
    fn new(test_list: &TestList) -> Self {
        Self {
            results: Vec::with_capacity(test_list.run_count()),
            stats: RunStats {
                initial_run_count: test_list.run_count(),
                filtered_out: test_list.skip_count(),
                ..RunStats::default()
            },
        }
    }

    fn push(&mut self, index: TestIndex, status: TestRunStatus) {
        self.stats.on_test_finished(status.outcome);
        debug!(
            "recorded result {} for test {index} ({} so far)",
            status.outcome, self.stats.final_run_count,
        );
        self.results.push(TestResult { index, status });
    }

    /// Returns statistics for the run.
    pub fn stats(&self) -> RunStats {
        self.stats
    }

    /// Iterates over results in dispatch order.
    pub fn iter(&self) -> impl Iterator<Item = &TestResult> + '_ {
        self.results.iter()
    }

    /// Returns the number of results recorded.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Returns true if no results were recorded.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Statistics for a test run.
#[derive(Copy, Clone, Default, Debug, Eq, PartialEq)]
pub struct RunStats {
    /// The total number of tests that were expected to be run at the beginning.
    ///
    /// If the run was interrupted, this will be more than `final_run_count`.
    pub initial_run_count: usize,

    /// The total number of tests that were actually dispatched.
    pub final_run_count: usize,

    /// The number of tests that passed.
    pub passed: usize,

    /// The number of tests that failed.
    pub failed: usize,

    /// The number of tests that couldn't be run because of an executor error.
    pub errored: usize,

    /// The number of tests that were filtered out.
    pub filtered_out: usize,
}

impl RunStats {
    /// Returns true if this run is considered a success.
    ///
    /// A run is marked as failed if any of the following are true:
    /// * the run was interrupted: the initial run count is greater than the final run count
    /// * any tests failed
    /// * any tests errored
    pub fn is_success(&self) -> bool {
        if self.initial_run_count > self.final_run_count {
            return false;
        }
        if self.failed > 0 || self.errored > 0 {
            return false;
        }
        true
    }

    fn on_test_finished(&mut self, outcome: TestOutcome) {
        self.final_run_count += 1;
        match outcome {
            TestOutcome::Pass => self.passed += 1,
            TestOutcome::Fail => self.failed += 1,
            TestOutcome::Error => self.errored += 1,
        }
    }
}
