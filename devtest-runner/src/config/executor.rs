// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::Deserialize;
use std::time::Duration;

/// Executor settings stored within a profile.
///
/// Returned by [`DevtestProfile::executor`](crate::config::DevtestProfile::executor).
#[derive(Clone, Debug)]
pub struct ExecutorConfig<'cfg> {
    command: &'cfg [String],
    list_command: Option<&'cfg [String]>,
    connect_command: Option<&'cfg [String]>,
    connect_retries: usize,
    connect_retry_delay: Duration,
}

impl<'cfg> ExecutorConfig<'cfg> {
    pub(in crate::config) fn new(
        custom_data: Option<&'cfg ExecutorImpl>,
        default_data: &'cfg DefaultExecutorImpl,
    ) -> Self {
        Self {
            command: custom_data
                .and_then(|custom| custom.command.as_deref())
                .unwrap_or(&default_data.command),
            list_command: custom_data
                .and_then(|custom| custom.list_command.as_deref())
                .or(default_data.list_command.as_deref()),
            connect_command: custom_data
                .and_then(|custom| custom.connect_command.as_deref())
                .or(default_data.connect_command.as_deref()),
            connect_retries: custom_data
                .and_then(|custom| custom.connect_retries)
                .unwrap_or(default_data.connect_retries),
            connect_retry_delay: custom_data
                .and_then(|custom| custom.connect_retry_delay)
                .unwrap_or(default_data.connect_retry_delay),
        }
    }

    /// Returns the command template used to run a single test.
    ///
    /// Empty if no command is configured.
    pub fn command(&self) -> &'cfg [String] {
        self.command
    }

    /// Returns the command used to list the test universe, if any.
    pub fn list_command(&self) -> Option<&'cfg [String]> {
        self.list_command
    }

    /// Returns the command run before dispatching tests, if any.
    pub fn connect_command(&self) -> Option<&'cfg [String]> {
        self.connect_command
    }

    /// Returns the number of times a failed connect command is retried.
    pub fn connect_retries(&self) -> usize {
        self.connect_retries
    }

    /// Returns the delay between connect attempts.
    pub fn connect_retry_delay(&self) -> Duration {
        self.connect_retry_delay
    }
}

#[derive(Clone, Debug)]
pub(in crate::config) struct DefaultExecutorImpl {
    command: Vec<String>,
    list_command: Option<Vec<String>>,
    connect_command: Option<Vec<String>>,
    connect_retries: usize,
    connect_retry_delay: Duration,
}

impl DefaultExecutorImpl {
    // Default values have all fields defined on them.
    pub(in crate::config) fn for_default_profile(data: ExecutorImpl) -> Self {
        Self {
            command: data
                .command
                .expect("executor.command present in default profile"),
            list_command: data.list_command,
            connect_command: data.connect_command,
            connect_retries: data
                .connect_retries
                .expect("executor.connect-retries present in default profile"),
            connect_retry_delay: data
                .connect_retry_delay
                .expect("executor.connect-retry-delay present in default profile"),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(in crate::config) struct ExecutorImpl {
    #[serde(default)]
    command: Option<Vec<String>>,
    #[serde(default)]
    list_command: Option<Vec<String>>,
    #[serde(default)]
    connect_command: Option<Vec<String>>,
    #[serde(default)]
    connect_retries: Option<usize>,
    #[serde(default, with = "humantime_serde")]
    connect_retry_delay: Option<Duration>,
}
