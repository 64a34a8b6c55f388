// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Basic tests for the dispatcher and reporters.

use camino_tempfile::Utf8TempDir;
use color_eyre::eyre::Result;
use devtest_filtering::{FilterArgs, TestFilter};
use devtest_metadata::{TestIdentifier, TestOutcome};
use devtest_runner::{
    config::{DefaultConfigWarnings, DevtestConfig},
    errors::ExecutorError,
    executor::{ExecutionOutput, TestExecutor},
    reporter::{ReporterBuilder, RunMessageFormat},
    runner::{RunStats, TestEvent, TestRunnerBuilder},
    test_list::TestList,
};
use indoc::indoc;
use maplit::hashmap;
use pretty_assertions::assert_eq;
use std::{collections::HashMap, io, time::Duration};

#[derive(Clone, Debug)]
enum Canned {
    Pass,
    Fail(&'static str),
    Error(&'static str),
    Panic(&'static str),
}

/// An executor that returns canned results and records what it was asked to run.
#[derive(Debug, Default)]
struct FakeExecutor {
    results: HashMap<&'static str, Canned>,
    connect_failures: usize,
    connect_attempts: usize,
    executed: Vec<TestIdentifier>,
}

impl FakeExecutor {
    fn new(results: HashMap<&'static str, Canned>) -> Self {
        Self {
            results,
            ..Self::default()
        }
    }

    fn failing_connects(mut self, count: usize) -> Self {
        self.connect_failures = count;
        self
    }
}

impl TestExecutor for FakeExecutor {
    fn connect(&mut self) -> Result<(), ExecutorError> {
        self.connect_attempts += 1;
        if self.connect_attempts <= self.connect_failures {
            Err(ExecutorError::other("device offline"))
        } else {
            Ok(())
        }
    }

    fn execute(&mut self, test: &TestIdentifier) -> Result<ExecutionOutput, ExecutorError> {
        self.executed.push(test.clone());
        match self.results.get(test.method_key().as_str()) {
            None | Some(Canned::Pass) => Ok(ExecutionOutput::pass()),
            Some(Canned::Fail(text)) => Ok(ExecutionOutput::fail(*text)),
            Some(Canned::Error(message)) => Err(ExecutorError::other(*message)),
            Some(Canned::Panic(message)) => panic!("{message}"),
        }
    }
}

fn make_list(filter_args: &[&str]) -> Result<TestList> {
    let filter = if filter_args.is_empty() {
        TestFilter::any()
    } else {
        FilterArgs::parse_raw(filter_args.iter().copied())?.build(&mut NoWarnings)?
    };
    let ids = [
        "com.x.ClassA#testOne",
        "com.x.ClassA#testTwo",
        "com.x.ClassB#testThree",
        "com.y.ClassC#testFour",
    ]
    .into_iter()
    .map(|s| s.parse::<TestIdentifier>())
    .collect::<Result<Vec<_>, _>>()?;
    Ok(TestList::new(ids, &filter, None))
}

struct NoWarnings;

impl devtest_filtering::FilterWarnings for NoWarnings {
    fn filter_file_unreadable(
        &mut self,
        kind: devtest_filtering::FilterKind,
        path: &camino::Utf8Path,
        err: &io::Error,
    ) {
        panic!("unexpected unreadable {kind} filter file {path}: {err}");
    }
}

fn no_retry_delay() -> TestRunnerBuilder {
    let mut builder = TestRunnerBuilder::default();
    builder.set_connect_retries(3, Duration::ZERO);
    builder
}

#[test]
fn dispatches_selected_tests_in_order() -> Result<()> {
    let test_list = make_list(&["--include-filter=com.x", "--exclude-filter=com.x.ClassA#testTwo"])?;
    assert_eq!(test_list.run_count(), 2);
    assert_eq!(test_list.skip_count(), 2);

    let mut executor = FakeExecutor::new(hashmap! {
        "com.x.ClassA#testOne" => Canned::Pass,
    });
    let mut started = Vec::new();
    let results = no_retry_delay()
        .build(&test_list, &mut executor)
        .execute(|event| {
            if let TestEvent::TestStarted { id, .. } = event {
                started.push(id.to_string());
            }
        });

    assert_eq!(started, vec!["com.x.ClassA#testOne", "com.x.ClassB#testThree"]);
    assert_eq!(
        executor.executed,
        vec![
            TestIdentifier::new("com.x.ClassA", "testOne"),
            TestIdentifier::new("com.x.ClassB", "testThree"),
        ]
    );
    assert_eq!(
        results.stats(),
        RunStats {
            initial_run_count: 2,
            final_run_count: 2,
            passed: 2,
            failed: 0,
            errored: 0,
            filtered_out: 2,
        }
    );
    assert!(results.stats().is_success());
    Ok(())
}

#[test]
fn executor_error_is_recorded_and_run_continues() -> Result<()> {
    let test_list = make_list(&[])?;
    let mut executor = FakeExecutor::new(hashmap! {
        "com.x.ClassA#testTwo" => Canned::Error("adb: device not found"),
        "com.x.ClassB#testThree" => Canned::Fail("expected:<1> but was:<2>"),
    });

    let results = no_retry_delay()
        .build(&test_list, &mut executor)
        .execute(|_| {});

    assert_eq!(executor.executed.len(), 4, "all tests dispatched");
    let outcomes: Vec<_> = results.iter().map(|result| result.status.outcome).collect();
    assert_eq!(
        outcomes,
        vec![
            TestOutcome::Pass,
            TestOutcome::Error,
            TestOutcome::Fail,
            TestOutcome::Pass
        ]
    );

    let errored = results
        .iter()
        .find(|result| result.status.outcome == TestOutcome::Error)
        .expect("one test errored");
    assert_eq!(
        errored.status.failure_text.as_deref(),
        Some("adb: device not found")
    );

    let stats = results.stats();
    assert_eq!((stats.passed, stats.failed, stats.errored), (2, 1, 1));
    assert!(!stats.is_success());
    Ok(())
}

#[test]
fn executor_panic_is_recorded_and_run_continues() -> Result<()> {
    let test_list = make_list(&["--include-filter=com.x.ClassA"])?;
    let mut executor = FakeExecutor::new(hashmap! {
        "com.x.ClassA#testOne" => Canned::Panic("lost track of device"),
    });

    let results = no_retry_delay()
        .build(&test_list, &mut executor)
        .execute(|_| {});

    assert_eq!(
        executor.executed,
        vec![
            TestIdentifier::new("com.x.ClassA", "testOne"),
            TestIdentifier::new("com.x.ClassA", "testTwo"),
        ],
        "test after the panic still dispatched"
    );
    let statuses: Vec<_> = results
        .iter()
        .map(|result| (result.status.outcome, result.status.failure_text.clone()))
        .collect();
    assert_eq!(
        statuses,
        vec![
            (
                TestOutcome::Error,
                Some("executor panicked: lost track of device".to_owned())
            ),
            (TestOutcome::Pass, None),
        ]
    );
    assert_eq!(results.stats().errored, 1);
    Ok(())
}

#[test]
fn connect_is_retried() -> Result<()> {
    let test_list = make_list(&[])?;
    let mut executor = FakeExecutor::default().failing_connects(2);

    let results = no_retry_delay()
        .build(&test_list, &mut executor)
        .execute(|_| {});

    assert_eq!(executor.connect_attempts, 3);
    assert_eq!(results.stats().passed, 4);
    Ok(())
}

#[test]
fn connect_retries_exhausted_errors_every_test() -> Result<()> {
    let test_list = make_list(&["--include-filter=com.x.ClassA"])?;
    let mut executor = FakeExecutor::default().failing_connects(usize::MAX);

    let mut builder = TestRunnerBuilder::default();
    builder.set_connect_retries(1, Duration::ZERO);
    let results = builder.build(&test_list, &mut executor).execute(|_| {});

    assert_eq!(executor.connect_attempts, 2);
    assert!(executor.executed.is_empty(), "no test bodies were run");
    assert_eq!(results.len(), 2);
    for result in results.iter() {
        assert_eq!(result.status.outcome, TestOutcome::Error);
        let text = result.status.failure_text.as_deref().unwrap_or_default();
        assert!(
            text.contains("after 2 attempts") && text.contains("device offline"),
            "failure text names the cause: {text}"
        );
    }
    Ok(())
}

#[test]
fn callback_error_stops_dispatch() -> Result<()> {
    let test_list = make_list(&[])?;
    let mut executor = FakeExecutor::default();

    let res = no_retry_delay()
        .build(&test_list, &mut executor)
        .try_execute(|event| match event {
            TestEvent::TestFinished { index, .. } if index.as_usize() == 1 => Err("stop"),
            _ => Ok(()),
        });

    assert_eq!(res.err(), Some("stop"));
    assert_eq!(executor.executed.len(), 2);
    Ok(())
}

#[test]
fn progress_output() -> Result<()> {
    let test_list = make_list(&["--include-filter=com.x"])?;
    let mut executor = FakeExecutor::new(hashmap! {
        "com.x.ClassA#testTwo" => Canned::Fail("assertion failed\nat Foo.java:12"),
        "com.x.ClassB#testThree" => Canned::Error("instrumentation crashed"),
    });

    let mut stdout = Vec::new();
    {
        let mut reporter = ReporterBuilder::default().build(None, &mut stdout, io::sink());
        no_retry_delay()
            .build(&test_list, &mut executor)
            .try_execute(|event| reporter.report_event(&event))?;
    }

    let stdout = String::from_utf8(stdout)?;
    let mut lines: Vec<&str> = stdout.lines().collect();
    let end_run = lines.pop().expect("end-run line present");
    assert!(end_run.starts_with("end-run:"), "last line is end-run: {end_run}");
    end_run["end-run:".len()..].parse::<u128>()?;

    assert_eq!(
        lines,
        vec![
            "start-run:3",
            "start-test:com.x.ClassA#testOne",
            "end-test:com.x.ClassA#testOne",
            "start-test:com.x.ClassA#testTwo",
            "failure:assertion failed\\nat Foo.java:12",
            "end-test:com.x.ClassA#testTwo",
            "start-test:com.x.ClassB#testThree",
            "failure:instrumentation crashed",
            "end-test:com.x.ClassB#testThree",
        ]
    );
    Ok(())
}

#[test]
fn setup_failure_is_a_failed_test() -> Result<()> {
    let mut stdout = Vec::new();
    {
        let mut reporter = ReporterBuilder::default().build(None, &mut stdout, io::sink());
        reporter.report_setup_failure("profile `ci` not found")?;
    }
    assert_eq!(
        String::from_utf8(stdout)?,
        indoc! {"
            start-run:1
            start-test:devtest.Setup#initializationError
            failure:profile `ci` not found
            end-test:devtest.Setup#initializationError
            end-run:0
        "}
    );
    Ok(())
}

#[test]
fn human_output_has_summary() -> Result<()> {
    let test_list = make_list(&["--include-filter=com.y"])?;
    let mut executor = FakeExecutor::new(hashmap! {
        "com.y.ClassC#testFour" => Canned::Fail("boom"),
    });

    let mut stderr = Vec::new();
    {
        let mut builder = ReporterBuilder::default();
        builder.set_message_format(RunMessageFormat::Human);
        let mut reporter = builder.build(None, io::sink(), &mut stderr);
        no_retry_delay()
            .build(&test_list, &mut executor)
            .try_execute(|event| reporter.report_event(&event))?;
    }

    let stderr = String::from_utf8(stderr)?;
    assert!(stderr.contains("Starting 1 test (3 skipped)"), "{stderr}");
    assert!(stderr.contains("com.y.ClassC#testFour"), "{stderr}");
    assert!(stderr.contains("    boom"), "{stderr}");
    assert!(
        stderr.contains("1 test run: 0 passed, 1 failed, 3 skipped"),
        "{stderr}"
    );
    Ok(())
}

#[test]
fn junit_report_is_written() -> Result<()> {
    let dir = Utf8TempDir::new()?;
    std::fs::create_dir_all(dir.path().join(".config"))?;
    std::fs::write(
        dir.path().join(".config/devtest.toml"),
        indoc! {r#"
            [profile.ci.junit]
            path = "reports/junit.xml"
            report-name = "cts-run"
        "#},
    )?;
    let config = DevtestConfig::from_sources(dir.path(), None, &mut DefaultConfigWarnings)?;
    let profile = config.profile("ci")?;

    let test_list = make_list(&[])?;
    let mut executor = FakeExecutor::new(hashmap! {
        "com.x.ClassA#testTwo" => Canned::Fail("expected:<1> but was:<2>"),
        "com.y.ClassC#testFour" => Canned::Error("device disconnected"),
    });

    {
        let mut reporter =
            ReporterBuilder::default().build(profile.junit(), io::sink(), io::sink());
        no_retry_delay()
            .build(&test_list, &mut executor)
            .try_execute(|event| reporter.report_event(&event))?;
    }

    let xml = std::fs::read_to_string(dir.path().join("reports/junit.xml"))?;
    assert!(xml.contains(r#"name="cts-run""#), "{xml}");
    assert!(xml.contains(r#"<testsuite name="com.x.ClassA""#), "{xml}");
    assert!(xml.contains(r#"<testsuite name="com.y.ClassC""#), "{xml}");
    assert!(xml.contains("<failure"), "{xml}");
    assert!(xml.contains("<error"), "{xml}");
    assert!(xml.contains("expected:&lt;1&gt; but was:&lt;2&gt;"), "{xml}");
    Ok(())
}
