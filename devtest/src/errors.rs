// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{NO_HEADING_TARGET, StderrStyles};
use devtest_filtering::errors::{FilterArgParseError, TestFilterBuildError};
use devtest_metadata::DevtestExitCode;
use devtest_runner::errors::*;
use owo_colors::OwoColorize;
use std::error::Error;
use thiserror::Error;
use tracing::error;

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

/// An expected failure: a problem with the invocation, the environment or the tests being run,
/// rather than a bug in devtest.
///
/// The messages here double as the failure text reported for setup failures, so each one should
/// make sense on its own.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("could not determine the current directory")]
    CurrentDirFailed {
        #[source]
        err: std::io::Error,
    },
    #[error("current directory `{}` is not valid UTF-8", .path.display())]
    CurrentDirInvalidUtf8 { path: std::path::PathBuf },
    #[error("profile not found")]
    ProfileNotFound {
        #[from]
        err: ProfileNotFound,
    },
    #[error("config parse error")]
    ConfigParseError {
        #[from]
        err: ConfigParseError,
    },
    #[error("invalid filter arguments")]
    FilterArgParseError {
        #[from]
        err: FilterArgParseError,
    },
    #[error("invalid test filters")]
    TestFilterBuildError {
        #[from]
        err: TestFilterBuildError,
    },
    #[error("creating test list failed")]
    CreateTestListError {
        #[from]
        err: CreateTestListError,
    },
    #[error("failed to set up executor")]
    ExecutorBuildError {
        #[from]
        err: ExecutorBuildError,
    },
    #[error("test run could not be set up")]
    RunSetupFailed {
        #[source]
        err: Box<ExpectedError>,
    },
    #[error("failed to write test list to output")]
    WriteTestListError {
        #[source]
        err: std::io::Error,
    },
    #[error("failed to write event to output")]
    WriteEventError {
        #[from]
        err: WriteEventError,
    },
    #[error("no tests to run")]
    NoTestsRun,
    #[error("test run failed")]
    TestRunFailed,
}

impl ExpectedError {
    pub(crate) fn run_setup_failed(err: ExpectedError) -> Self {
        Self::RunSetupFailed { err: Box::new(err) }
    }

    /// Returns the error reported to supervising processes when a run can't be set up.
    pub(crate) fn setup_failure_text(&self) -> String {
        DisplayErrorChain::new(self.setup_cause()).to_string()
    }

    fn setup_cause(&self) -> &ExpectedError {
        match self {
            Self::RunSetupFailed { err } => err.setup_cause(),
            other => other,
        }
    }

    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::CurrentDirFailed { .. }
            | Self::CurrentDirInvalidUtf8 { .. }
            | Self::ProfileNotFound { .. }
            | Self::ConfigParseError { .. }
            | Self::FilterArgParseError { .. }
            | Self::TestFilterBuildError { .. }
            | Self::ExecutorBuildError { .. }
            | Self::RunSetupFailed { .. } => DevtestExitCode::SETUP_ERROR,
            Self::CreateTestListError { .. } => DevtestExitCode::TEST_LIST_CREATION_FAILED,
            Self::WriteTestListError { .. } | Self::WriteEventError { .. } => {
                DevtestExitCode::WRITE_OUTPUT_ERROR
            }
            Self::NoTestsRun => DevtestExitCode::NO_TESTS_RUN,
            Self::TestRunFailed => DevtestExitCode::TEST_RUN_FAILED,
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match &self {
            Self::CurrentDirFailed { err } => {
                error!("could not determine the current directory");
                Some(err as &dyn Error)
            }
            Self::CurrentDirInvalidUtf8 { path } => {
                error!(
                    "current directory `{}` is not valid UTF-8",
                    path.display().style(styles.bold)
                );
                None
            }
            Self::ProfileNotFound { err } => {
                error!("{err}");
                err.source()
            }
            Self::ConfigParseError { err } => {
                match err.kind() {
                    ConfigParseErrorKind::BuildError(build_error) => {
                        error!(
                            "failed to parse devtest config at `{}`",
                            err.config_file().style(styles.bold)
                        );
                        Some(build_error.as_ref() as &dyn Error)
                    }
                    ConfigParseErrorKind::DeserializeError(deserialize_error) => {
                        error!(
                            "failed to parse devtest config at `{}`: error at key `{}`",
                            err.config_file().style(styles.bold),
                            deserialize_error.path().style(styles.bold),
                        );
                        Some(deserialize_error.inner() as &dyn Error)
                    }
                    _ => {
                        error!("{err}");
                        err.source()
                    }
                }
            }
            Self::FilterArgParseError { err } => {
                error!("{err}");
                err.source()
            }
            Self::TestFilterBuildError { err } => {
                error!("{err}");
                err.source()
            }
            Self::CreateTestListError { err } => {
                error!("creating test list failed");
                Some(err as &dyn Error)
            }
            Self::ExecutorBuildError { err } => {
                error!("{err}");
                err.source()
            }
            Self::RunSetupFailed { err } => {
                // The underlying error says what went wrong.
                err.display_to_stderr(styles);
                return;
            }
            Self::WriteTestListError { err } => {
                error!("failed to write test list to output");
                Some(err as &dyn Error)
            }
            Self::WriteEventError { err } => {
                error!("failed to write event to output");
                Some(err as &dyn Error)
            }
            Self::NoTestsRun => {
                error!("no tests to run");
                error!(
                    target: NO_HEADING_TARGET,
                    "(hint: {} to allow an empty run)",
                    "--no-tests=pass".style(styles.bold),
                );
                None
            }
            Self::TestRunFailed => {
                error!("test run failed");
                None
            }
        };

        while let Some(err) = next_error {
            error!(target: NO_HEADING_TARGET, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}
