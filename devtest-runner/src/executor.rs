// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Executors: the external runtimes that actually run test bodies.
//!
//! devtest never runs a test in-process. The dispatcher hands each selected test to a
//! [`TestExecutor`], which might run a command on an attached device, start a local VM, or (in
//! tests) return canned results.

use crate::{
    config::DevtestProfile,
    errors::{ExecutorBuildError, ExecutorError},
};
use camino::{Utf8Path, Utf8PathBuf};
use devtest_metadata::TestIdentifier;
use std::process::ExitStatus;
use tracing::debug;

/// The placeholders recognized in executor command templates.
pub const PLACEHOLDERS: &[&str] = &["{class}", "{method}", "{package}", "{test}"];

/// Runs individual tests on behalf of the dispatcher.
pub trait TestExecutor {
    /// Prepares the executor before any test is run, for example by waiting for a device.
    ///
    /// The dispatcher retries this on failure. The default implementation does nothing.
    fn connect(&mut self) -> Result<(), ExecutorError> {
        Ok(())
    }

    /// Runs a single test.
    ///
    /// An `Err` means the test couldn't be run at all, and is recorded as an `ERROR` outcome. A
    /// test that ran and failed is an `Ok` with a failing [`ExecutionOutput`].
    fn execute(&mut self, test: &TestIdentifier) -> Result<ExecutionOutput, ExecutorError>;
}

impl<T: TestExecutor + ?Sized> TestExecutor for &mut T {
    fn connect(&mut self) -> Result<(), ExecutorError> {
        (**self).connect()
    }

    fn execute(&mut self, test: &TestIdentifier) -> Result<ExecutionOutput, ExecutorError> {
        (**self).execute(test)
    }
}

/// Whether an executed test passed.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ExecutionResult {
    /// The test passed.
    Pass,

    /// The test failed.
    Fail {
        /// The exit code of the process that ran the test, if there was one and it wasn't
        /// terminated by a signal.
        exit_code: Option<i32>,
    },
}

/// The result of running a single test, along with its captured output.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExecutionOutput {
    /// Whether the test passed.
    pub result: ExecutionResult,

    /// Captured standard output.
    pub stdout: String,

    /// Captured standard error.
    pub stderr: String,
}

impl ExecutionOutput {
    /// A passing result with no output.
    pub fn pass() -> Self {
        Self {
            result: ExecutionResult::Pass,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    /// A failing result with the given failure text as its standard error.
    pub fn fail(text: impl Into<String>) -> Self {
        Self {
            result: ExecutionResult::Fail { exit_code: None },
            stdout: String::new(),
            stderr: text.into(),
        }
    }

    /// Creates an output from a finished process.
    pub fn from_process(status: ExitStatus, stdout: &[u8], stderr: &[u8]) -> Self {
        let result = if status.success() {
            ExecutionResult::Pass
        } else {
            ExecutionResult::Fail {
                exit_code: status.code(),
            }
        };
        Self {
            result,
            stdout: String::from_utf8_lossy(stdout).into_owned(),
            stderr: String::from_utf8_lossy(stderr).into_owned(),
        }
    }

    /// Returns true if the test passed.
    pub fn is_success(&self) -> bool {
        self.result == ExecutionResult::Pass
    }

    /// Returns the text describing why the test failed, or `None` if it passed.
    ///
    /// This is standard error if non-empty, then standard output if non-empty, then a description
    /// of the exit status.
    pub fn failure_text(&self) -> Option<String> {
        let ExecutionResult::Fail { exit_code } = self.result else {
            return None;
        };
        let text = [&self.stderr, &self.stdout]
            .into_iter()
            .map(|s| s.trim_end())
            .find(|s| !s.is_empty());
        Some(match (text, exit_code) {
            (Some(text), _) => text.to_owned(),
            (None, Some(code)) => format!("test exited with code {code}"),
            (None, None) => "test failed".to_owned(),
        })
    }
}

/// An executor that runs a command template once per test.
///
/// Each argument of the template may contain `{class}`, `{method}`, `{package}` and `{test}`
/// (the `class#method` key). The test passes if the command exits with code 0.
#[derive(Clone, Debug)]
pub struct CommandExecutor {
    command: Vec<String>,
    connect_command: Option<Vec<String>>,
    cwd: Utf8PathBuf,
}

impl CommandExecutor {
    /// Creates a new executor for the given command template, run in `cwd`.
    pub fn new(
        command: Vec<String>,
        cwd: impl Into<Utf8PathBuf>,
    ) -> Result<Self, ExecutorBuildError> {
        if command.is_empty() {
            return Err(ExecutorBuildError::EmptyCommand);
        }
        for arg in &command {
            validate_placeholders(arg)?;
        }
        Ok(Self {
            command,
            connect_command: None,
            cwd: cwd.into(),
        })
    }

    /// Creates a new executor from the `executor` section of a profile.
    pub fn from_profile(
        profile: &DevtestProfile<'_>,
        cwd: impl Into<Utf8PathBuf>,
    ) -> Result<Self, ExecutorBuildError> {
        let config = profile.executor();
        if config.command().is_empty() {
            return Err(ExecutorBuildError::NoCommand {
                profile: profile.name().to_owned(),
            });
        }
        let executor = Self::new(config.command().to_vec(), cwd)?;
        Ok(match config.connect_command() {
            Some(connect) if !connect.is_empty() => executor.with_connect_command(connect.to_vec()),
            _ => executor,
        })
    }

    /// Sets a command to run when connecting. A non-zero exit code is a connection failure.
    pub fn with_connect_command(mut self, connect_command: Vec<String>) -> Self {
        self.connect_command = Some(connect_command);
        self
    }

    /// Returns the working directory commands are run in.
    pub fn cwd(&self) -> &Utf8Path {
        &self.cwd
    }

    /// Returns the command line that would be run for `test`.
    pub fn command_for(&self, test: &TestIdentifier) -> Vec<String> {
        self.command
            .iter()
            .map(|arg| expand_placeholders(arg, test))
            .collect()
    }

    fn run(&self, argv: &[String]) -> Result<std::process::Output, ExecutorError> {
        let command = shell_words::join(argv);
        // Constructors ensure commands are non-empty.
        let (program, args) = argv.split_first().ok_or_else(|| ExecutorError::Exec {
            command: command.clone(),
            err: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command"),
        })?;
        debug!("running `{command}`");

        duct::cmd(program, args)
            .dir(self.cwd.as_std_path())
            .stdout_capture()
            .stderr_capture()
            .unchecked()
            .run()
            .map_err(|err| ExecutorError::Exec { command, err })
    }
}

impl TestExecutor for CommandExecutor {
    fn connect(&mut self) -> Result<(), ExecutorError> {
        let Some(connect_command) = &self.connect_command else {
            return Ok(());
        };
        let output = self.run(connect_command)?;
        if output.status.success() {
            Ok(())
        } else {
            Err(ExecutorError::ConnectFailed {
                command: shell_words::join(connect_command),
                exit_code: output.status.code(),
            })
        }
    }

    fn execute(&mut self, test: &TestIdentifier) -> Result<ExecutionOutput, ExecutorError> {
        let argv = self.command_for(test);
        let output = self.run(&argv)?;
        Ok(ExecutionOutput::from_process(
            output.status,
            &output.stdout,
            &output.stderr,
        ))
    }
}

enum Segment<'a> {
    Literal(&'a str),
    /// A placeholder name, without braces.
    Placeholder(&'a str),
}

/// Splits an argument into literal text and `{name}` placeholders.
///
/// Braces that don't enclose a simple identifier are treated as literal text.
fn segments(arg: &str) -> impl Iterator<Item = Segment<'_>> {
    let mut rest = arg;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        let mut search_from = 0;
        while let Some(open) = rest[search_from..].find('{').map(|i| i + search_from) {
            let after_open = &rest[open + 1..];
            if let Some(close) = after_open.find('}') {
                let name = &after_open[..close];
                if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
                {
                    if open > 0 {
                        let literal = &rest[..open];
                        rest = &rest[open..];
                        return Some(Segment::Literal(literal));
                    }
                    rest = &after_open[close + 1..];
                    return Some(Segment::Placeholder(name));
                }
            }
            search_from = open + 1;
        }
        let literal = rest;
        rest = "";
        Some(Segment::Literal(literal))
    })
}

fn validate_placeholders(arg: &str) -> Result<(), ExecutorBuildError> {
    for segment in segments(arg) {
        if let Segment::Placeholder(name) = segment
            && !is_known_placeholder(name)
        {
            return Err(ExecutorBuildError::UnknownPlaceholder {
                placeholder: name.to_owned(),
            });
        }
    }
    Ok(())
}

fn is_known_placeholder(name: &str) -> bool {
    PLACEHOLDERS.iter().any(|placeholder| {
        placeholder
            .strip_prefix('{')
            .and_then(|p| p.strip_suffix('}'))
            == Some(name)
    })
}

fn expand_placeholders(arg: &str, test: &TestIdentifier) -> String {
    let mut out = String::with_capacity(arg.len());
    for segment in segments(arg) {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::Placeholder(name) => match placeholder_value(name, test) {
                Some(value) => out.push_str(&value),
                // Unknown placeholders are rejected at construction time.
                None => {
                    out.push('{');
                    out.push_str(name);
                    out.push('}');
                }
            },
        }
    }
    out
}

fn placeholder_value(name: &str, test: &TestIdentifier) -> Option<String> {
    match name {
        "class" => Some(test.class_name().to_owned()),
        "method" => Some(test.method_name().to_owned()),
        "package" => Some(test.package().to_owned()),
        "test" => Some(test.method_key()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn test_id() -> TestIdentifier {
        TestIdentifier::new("com.x.ClassA", "testFoo")
    }

    #[test_case("{test}", "com.x.ClassA#testFoo"; "test key")]
    #[test_case("class={class}", "class=com.x.ClassA"; "class with prefix")]
    #[test_case("{package}/{method}.log", "com.x/testFoo.log"; "package and method")]
    #[test_case("{}", "{}"; "empty braces")]
    #[test_case("{a b}", "{a b}"; "not an identifier")]
    #[test_case("{{class}}", "{com.x.ClassA}"; "nested braces")]
    #[test_case("plain", "plain"; "no placeholders")]
    fn expand(template: &str, expected: &str) {
        assert_eq!(expand_placeholders(template, &test_id()), expected);
    }

    #[test]
    fn unknown_placeholder() {
        let err = CommandExecutor::new(
            vec!["run".to_owned(), "{classname}".to_owned()],
            "/tmp",
        )
        .unwrap_err();
        assert_eq!(
            err,
            ExecutorBuildError::UnknownPlaceholder {
                placeholder: "classname".to_owned()
            }
        );
        assert_eq!(
            err.to_string(),
            "unknown placeholder `{classname}` in executor command \
             (known placeholders: {class}, {method}, {package}, {test})"
        );
        assert_eq!(
            CommandExecutor::new(vec![], "/tmp").unwrap_err(),
            ExecutorBuildError::EmptyCommand
        );
    }

    #[test]
    fn command_for() {
        let executor = CommandExecutor::new(
            vec![
                "adb".to_owned(),
                "shell".to_owned(),
                "am".to_owned(),
                "instrument".to_owned(),
                "-e".to_owned(),
                "class".to_owned(),
                "{test}".to_owned(),
            ],
            "/tmp",
        )
        .unwrap();
        assert_eq!(
            executor.command_for(&test_id()),
            vec!["adb", "shell", "am", "instrument", "-e", "class", "com.x.ClassA#testFoo"]
        );
    }

    #[test]
    fn failure_text_fallbacks() {
        assert_eq!(ExecutionOutput::pass().failure_text(), None);
        assert_eq!(
            ExecutionOutput::fail("boom\n").failure_text().as_deref(),
            Some("boom")
        );

        let mut output = ExecutionOutput {
            result: ExecutionResult::Fail { exit_code: Some(2) },
            stdout: "assertion failed".to_owned(),
            stderr: "  \n".to_owned(),
        };
        assert_eq!(output.failure_text().as_deref(), Some("assertion failed"));
        output.stdout.clear();
        assert_eq!(
            output.failure_text().as_deref(),
            Some("test exited with code 2")
        );
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use pretty_assertions::assert_eq;

        fn sh(script: &str) -> Vec<String> {
            vec!["sh".to_owned(), "-c".to_owned(), script.to_owned()]
        }

        #[test]
        fn execute_exit_codes() {
            let dir = camino_tempfile::Utf8TempDir::new().unwrap();

            let mut executor =
                CommandExecutor::new(sh("echo \"{method} failed\" >&2; exit 1"), dir.path())
                    .unwrap();
            let output = executor.execute(&test_id()).unwrap();
            assert_eq!(output.result, ExecutionResult::Fail { exit_code: Some(1) });
            assert_eq!(output.failure_text().as_deref(), Some("testFoo failed"));

            let mut executor = CommandExecutor::new(sh("exit 0"), dir.path()).unwrap();
            assert!(executor.execute(&test_id()).unwrap().is_success());
        }

        #[test]
        fn connect_command() {
            let dir = camino_tempfile::Utf8TempDir::new().unwrap();
            let mut executor = CommandExecutor::new(sh("exit 0"), dir.path())
                .unwrap()
                .with_connect_command(sh("exit 7"));
            let err = executor.connect().unwrap_err();
            assert!(
                matches!(
                    err,
                    ExecutorError::ConnectFailed {
                        exit_code: Some(7),
                        ..
                    }
                ),
                "unexpected error: {err:?}"
            );
        }

        #[test]
        fn spawn_failure_is_error() {
            let dir = camino_tempfile::Utf8TempDir::new().unwrap();
            let mut executor = CommandExecutor::new(
                vec!["/nonexistent/devtest-executor".to_owned()],
                dir.path(),
            )
            .unwrap();
            let err = executor.execute(&test_id()).unwrap_err();
            assert!(matches!(err, ExecutorError::Exec { .. }), "{err:?}");
        }
    }
}
