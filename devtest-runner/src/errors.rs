// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by devtest.

use camino::Utf8PathBuf;
use config::ConfigError;
use devtest_metadata::TestIdentifierParseError;
use std::{borrow::Cow, error::Error, fmt};
use thiserror::Error;

/// An error that occurred while parsing the config.
#[derive(Debug, Error)]
#[error("failed to parse devtest config at `{config_file}`")]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Utf8PathBuf,
    #[source]
    kind: ConfigParseErrorKind,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, kind: ConfigParseErrorKind) -> Self {
        Self {
            config_file: config_file.into(),
            kind,
        }
    }

    /// Returns the config file that failed to parse.
    pub fn config_file(&self) -> &Utf8PathBuf {
        &self.config_file
    }

    /// Returns the kind of error.
    pub fn kind(&self) -> &ConfigParseErrorKind {
        &self.kind
    }
}

/// The kind of [`ConfigParseError`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigParseErrorKind {
    /// An error occurred while building the config: the file is missing, or isn't valid TOML.
    #[error(transparent)]
    BuildError(Box<ConfigError>),

    /// An error occurred while deserializing the config.
    #[error("error at key `{}`", .0.path())]
    DeserializeError(#[source] Box<serde_path_to_error::Error<ConfigError>>),
}

/// An error which indicates that a profile was requested but not known to devtest.
#[derive(Clone, Debug, Error)]
#[error("profile `{profile}` not found (known profiles: {})", .all_profiles.join(", "))]
pub struct ProfileNotFound {
    profile: String,
    all_profiles: Vec<String>,
}

impl ProfileNotFound {
    pub(crate) fn new(
        profile: impl Into<String>,
        all_profiles: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let mut all_profiles: Vec<_> = all_profiles.into_iter().map(|s| s.into()).collect();
        all_profiles.sort_unstable();
        Self {
            profile: profile.into(),
            all_profiles,
        }
    }
}

/// An error that occurs while parsing a
/// [`PartitionerBuilder`](crate::partition::PartitionerBuilder) input.
#[derive(Clone, Debug, Error)]
pub struct PartitionerBuilderParseError {
    expected_format: Option<&'static str>,
    message: Cow<'static, str>,
}

impl PartitionerBuilderParseError {
    pub(crate) fn new(
        expected_format: Option<&'static str>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            expected_format,
            message: message.into(),
        }
    }
}

impl fmt::Display for PartitionerBuilderParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.expected_format {
            Some(format) => {
                write!(
                    f,
                    "partition must be in the format \"{}\":\n{}",
                    format, self.message
                )
            }
            None => write!(f, "{}", self.message),
        }
    }
}

/// Where a test list was read from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TestListSource {
    /// A test list file.
    File(Utf8PathBuf),

    /// The standard output of the configured list command.
    Command(String),
}

impl fmt::Display for TestListSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "test list file `{path}`"),
            Self::Command(command) => write!(f, "output of `{command}`"),
        }
    }
}

/// An error that occurred while creating a test list.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CreateTestListError {
    /// Neither a test list file nor a list command was provided.
    #[error(
        "no test list available: pass --test-list, or set `executor.list-command` in the config"
    )]
    NoSource,

    /// The test list file couldn't be read.
    #[error("failed to read test list file `{path}`")]
    ReadFile {
        /// The path to the file.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        err: std::io::Error,
    },

    /// The list command couldn't be executed.
    #[error("failed to execute list command `{command}`")]
    CommandExecFail {
        /// The command that was run.
        command: String,

        /// The underlying error.
        #[source]
        err: std::io::Error,
    },

    /// The list command exited with a non-zero code.
    #[error(
        "list command `{command}` failed{}\n--- stderr:\n{stderr}",
        .exit_code.map_or(String::new(), |code| format!(" with exit code {code}")),
    )]
    CommandFail {
        /// The command that was run.
        command: String,

        /// The exit code, if the command wasn't terminated by a signal.
        exit_code: Option<i32>,

        /// Standard error for the command.
        stderr: String,
    },

    /// The list command produced non-UTF-8 output.
    #[error("list command `{command}` produced non-UTF-8 output")]
    CommandOutputNonUtf8 {
        /// The command that was run.
        command: String,

        /// The underlying error.
        #[source]
        err: std::string::FromUtf8Error,
    },

    /// A line in the test list couldn't be parsed.
    #[error("failed to parse line {line_number} of {source_desc}")]
    ParseLine {
        /// Where the test list came from.
        source_desc: TestListSource,

        /// The 1-based line number.
        line_number: usize,

        /// The underlying error.
        #[source]
        err: TestIdentifierParseError,
    },
}

/// An error that occurred while setting up an executor from config.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[non_exhaustive]
pub enum ExecutorBuildError {
    /// No command was configured to run tests with.
    #[error("profile `{profile}` does not set `executor.command`")]
    NoCommand {
        /// The profile that was used.
        profile: String,
    },

    /// An empty command was passed in.
    #[error("executor command is empty")]
    EmptyCommand,

    /// A command template contains an unknown placeholder.
    #[error(
        "unknown placeholder `{{{placeholder}}}` in executor command (known placeholders: {})",
        crate::executor::PLACEHOLDERS.join(", ")
    )]
    UnknownPlaceholder {
        /// The placeholder name, without braces.
        placeholder: String,
    },
}

/// An error returned by an executor while connecting or running a test.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExecutorError {
    /// A process couldn't be spawned or waited for.
    #[error("failed to execute `{command}`")]
    Exec {
        /// The command that was run.
        command: String,

        /// The underlying error.
        #[source]
        err: std::io::Error,
    },

    /// The connect command exited with a non-zero code.
    #[error(
        "connect command `{command}` failed{}",
        .exit_code.map_or(String::new(), |code| format!(" with exit code {code}")),
    )]
    ConnectFailed {
        /// The command that was run.
        command: String,

        /// The exit code, if the command wasn't terminated by a signal.
        exit_code: Option<i32>,
    },

    /// All attempts to connect failed.
    #[error("failed to connect to executor after {attempts} attempts")]
    ConnectRetriesExhausted {
        /// The number of attempts made.
        attempts: usize,

        /// The error from the last attempt.
        #[source]
        last_error: Box<ExecutorError>,
    },

    /// The executor panicked.
    #[error("executor panicked: {message}")]
    Panicked {
        /// The panic message.
        message: String,
    },

    /// A custom error raised by an executor implementation.
    #[error("{message}")]
    Other {
        /// The error message.
        message: String,
    },
}

impl ExecutorError {
    /// Creates a custom executor error with the given message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

/// An error that occurs while writing an event.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WriteEventError {
    /// An error occurred while writing the event to the provided output.
    #[error("error writing to output")]
    Io(#[source] std::io::Error),

    /// An error occurred while operating on the file system.
    #[error("error operating on path {file}")]
    Fs {
        /// The file being operated on.
        file: Utf8PathBuf,

        /// The underlying IO error.
        #[source]
        error: std::io::Error,
    },

    /// An error occurred while producing JUnit XML.
    #[error("error writing JUnit output to {file}")]
    Junit {
        /// The output file.
        file: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: quick_junit::SerializeError,
    },
}

/// An error that occurs while parsing a line of the progress protocol.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("invalid progress line `{line}`: {reason}")]
pub struct ProgressEventParseError {
    line: String,
    reason: Cow<'static, str>,
}

impl ProgressEventParseError {
    pub(crate) fn new(line: impl Into<String>, reason: impl Into<Cow<'static, str>>) -> Self {
        Self {
            line: line.into(),
            reason: reason.into(),
        }
    }
}

/// Displays an error along with its chain of sources, one per line.
pub struct DisplayErrorChain<E> {
    error: E,
}

impl<E: Error> DisplayErrorChain<E> {
    /// Creates a new `DisplayErrorChain`.
    pub fn new(error: E) -> Self {
        Self { error }
    }
}

impl<E: Error> fmt::Display for DisplayErrorChain<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.error)?;

        let mut current = self.error.source();
        while let Some(err) = current {
            write!(f, "\n  caused by: {err}")?;
            current = err.source();
        }

        Ok(())
    }
}
