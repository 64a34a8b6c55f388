// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Report dispatcher events to the configured sinks.
//!
//! The main structure in this module is [`Reporter`], which fans events out to the progress
//! protocol, human-readable output and JUnit XML.

mod displayer;
mod junit;
pub mod progress;

use crate::{config::JunitConfig, errors::WriteEventError, runner::TestEvent};
use displayer::DisplayReporter;
use junit::JunitReporter;
use progress::{ProgressEvent, ProgressReporter};
use std::{fmt, io};

/// How test run events are written out.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum RunMessageFormat {
    /// The line-oriented progress protocol, for supervising processes.
    #[default]
    Progress,

    /// Status lines and a summary, for people.
    Human,
}

/// Test reporter builder.
#[derive(Debug, Default)]
pub struct ReporterBuilder {
    message_format: RunMessageFormat,
    colorize: bool,
}

impl ReporterBuilder {
    /// Sets the format of the primary output.
    pub fn set_message_format(&mut self, message_format: RunMessageFormat) -> &mut Self {
        self.message_format = message_format;
        self
    }

    /// Sets whether human-readable output is colorized.
    pub fn set_colorize(&mut self, colorize: bool) -> &mut Self {
        self.colorize = colorize;
        self
    }

    /// Creates a new reporter.
    ///
    /// The progress protocol is written to `stdout`; human-readable output goes to `stderr`. A
    /// JUnit report is written at the end of the run if `junit` is set.
    pub fn build<'a>(
        &self,
        junit: Option<JunitConfig<'a>>,
        stdout: impl io::Write + 'a,
        stderr: impl io::Write + 'a,
    ) -> Reporter<'a> {
        let inner = match self.message_format {
            RunMessageFormat::Progress => {
                ReporterInner::Progress(ProgressReporter::new(
                    Box::new(stdout) as Box<dyn io::Write + 'a>
                ))
            }
            RunMessageFormat::Human => {
                let mut display = DisplayReporter::new(Box::new(stderr) as Box<dyn io::Write + 'a>);
                if self.colorize {
                    display.colorize();
                }
                ReporterInner::Human(display)
            }
        };
        Reporter {
            inner,
            junit: junit.map(JunitReporter::new),
        }
    }
}

/// Functionality to report test results to stdout, stderr, and JUnit.
pub struct Reporter<'a> {
    inner: ReporterInner<'a>,
    junit: Option<JunitReporter<'a>>,
}

enum ReporterInner<'a> {
    Progress(ProgressReporter<Box<dyn io::Write + 'a>>),
    Human(DisplayReporter<Box<dyn io::Write + 'a>>),
}

impl<'a> Reporter<'a> {
    /// Report a test event.
    pub fn report_event(&mut self, event: &TestEvent<'_>) -> Result<(), WriteEventError> {
        match &mut self.inner {
            ReporterInner::Progress(progress) => progress.write_event(event),
            ReporterInner::Human(display) => display.write_event(event),
        }
        .map_err(WriteEventError::Io)?;

        if let Some(junit) = &mut self.junit {
            junit.write_event(event)?;
        }
        Ok(())
    }

    /// Report a failure that happened before any test could be dispatched.
    ///
    /// With the progress protocol this is written as a single failed test,
    /// `devtest.Setup#initializationError`, so that supervising processes see
    /// a failure rather than an empty run. Human-readable output is left to the caller.
    pub fn report_setup_failure(&mut self, failure_text: &str) -> Result<(), WriteEventError> {
        match &mut self.inner {
            ReporterInner::Progress(progress) => {
                for event in ProgressEvent::setup_failure(failure_text) {
                    progress.write_line(&event).map_err(WriteEventError::Io)?;
                }
                Ok(())
            }
            ReporterInner::Human(_) => Ok(()),
        }
    }
}

impl fmt::Debug for Reporter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.inner {
            ReporterInner::Progress(_) => RunMessageFormat::Progress,
            ReporterInner::Human(_) => RunMessageFormat::Human,
        };
        f.debug_struct("Reporter")
            .field("message_format", &kind)
            .field("junit", &self.junit)
            .finish()
    }
}
