// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Code to generate JUnit XML reports from test events.

use crate::{
    config::JunitConfig,
    errors::WriteEventError,
    runner::{TestEvent, TestRunStatus},
};
use devtest_metadata::{TestIdentifier, TestOutcome};
use indexmap::IndexMap;
use quick_junit::{NonSuccessKind, Report, TestCase, TestCaseStatus, TestSuite};
use std::fs::File;

/// Collects finished tests into one `<testsuite>` per class, and writes the report when the run
/// finishes.
#[derive(Clone, Debug)]
pub(super) struct JunitReporter<'cfg> {
    config: JunitConfig<'cfg>,
    test_suites: IndexMap<String, TestSuite>,
}

impl<'cfg> JunitReporter<'cfg> {
    pub(super) fn new(config: JunitConfig<'cfg>) -> Self {
        Self {
            config,
            test_suites: IndexMap::new(),
        }
    }

    pub(super) fn write_event(&mut self, event: &TestEvent<'_>) -> Result<(), WriteEventError> {
        match event {
            TestEvent::RunStarted { .. } | TestEvent::TestStarted { .. } => {}
            TestEvent::TestFinished { id, status, .. } => {
                let testcase = testcase_for(id, status, self.config.store_failure_output());
                self.test_suites
                    .entry(id.class_name().to_owned())
                    .or_insert_with_key(|class| TestSuite::new(class.as_str()))
                    .add_test_case(testcase);
            }
            TestEvent::RunFinished {
                start_time,
                elapsed,
                ..
            } => {
                let mut report = Report::new(self.config.report_name());
                report
                    .set_timestamp(*start_time)
                    .set_time(*elapsed)
                    .add_test_suites(self.test_suites.drain(..).map(|(_, testsuite)| testsuite));

                let junit_path = self.config.path();
                if let Some(junit_dir) = junit_path.parent() {
                    std::fs::create_dir_all(junit_dir).map_err(|error| WriteEventError::Fs {
                        file: junit_dir.to_path_buf(),
                        error,
                    })?;
                }

                let f = File::create(junit_path).map_err(|error| WriteEventError::Fs {
                    file: junit_path.to_path_buf(),
                    error,
                })?;
                report
                    .serialize(f)
                    .map_err(|error| WriteEventError::Junit {
                        file: junit_path.to_path_buf(),
                        error,
                    })?;
            }
        }

        Ok(())
    }
}

fn testcase_for(id: &TestIdentifier, status: &TestRunStatus, store_failure_output: bool) -> TestCase {
    let non_success = match status.outcome {
        TestOutcome::Pass => None,
        TestOutcome::Fail => Some((NonSuccessKind::Failure, "test failure")),
        TestOutcome::Error => Some((NonSuccessKind::Error, "execution error")),
    };
    let testcase_status = match non_success {
        None => TestCaseStatus::success(),
        Some((kind, ty)) => {
            let mut testcase_status = TestCaseStatus::non_success(kind);
            testcase_status.set_type(ty);
            if let Some(text) = &status.failure_text {
                // The first line is the message; the whole text is the description.
                testcase_status.set_message(text.lines().next().unwrap_or_default());
                if store_failure_output {
                    testcase_status.set_description(text.as_str());
                }
            }
            testcase_status
        }
    };

    let mut testcase = TestCase::new(id.method_name(), testcase_status);
    testcase
        .set_classname(id.class_name())
        .set_timestamp(status.start_time)
        .set_time(status.time_taken);
    if store_failure_output && !status.outcome.is_success() {
        if !status.stdout.is_empty() {
            testcase.set_system_out(status.stdout.as_str());
        }
        if !status.stderr.is_empty() {
            testcase.set_system_err(status.stderr.as_str());
        }
    }
    testcase
}
