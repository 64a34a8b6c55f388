// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The line-oriented progress protocol read by supervising processes.
//!
//! Each event is one line:
//!
//! ```text
//! start-run:N        N = number of tests selected to run
//! start-test:ID      ID = class#method
//! failure:TEXT       only for FAIL and ERROR outcomes, between start-test and end-test
//! end-test:ID
//! end-run:MS         MS = elapsed wall milliseconds for the run
//! ```
//!
//! `TEXT` and `ID` are escaped so that every event fits on one line: `\` is written as `\\`, a
//! newline as `\n` and a carriage return as `\r`. Identifiers read from a test list never need
//! escaping, but ones built by library callers might.

use crate::{errors::ProgressEventParseError, runner::TestEvent};
use devtest_metadata::TestIdentifier;
use std::{fmt, io, str::FromStr, time::Duration};

/// The class of the test reported when devtest fails before dispatching any tests.
pub const SETUP_FAILURE_CLASS: &str = "devtest.Setup";

/// The method of the test reported when devtest fails before dispatching any tests.
pub const SETUP_FAILURE_METHOD: &str = "initializationError";

/// A single line of the progress protocol.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ProgressEvent {
    /// `start-run:N`
    StartRun {
        /// The number of tests selected to run.
        test_count: usize,
    },

    /// `start-test:ID`
    StartTest {
        /// The test that started.
        id: TestIdentifier,
    },

    /// `failure:TEXT`
    Failure {
        /// The unescaped failure text.
        text: String,
    },

    /// `end-test:ID`
    EndTest {
        /// The test that finished.
        id: TestIdentifier,
    },

    /// `end-run:MS`
    EndRun {
        /// Elapsed wall-clock milliseconds for the run.
        elapsed_ms: u128,
    },
}

impl ProgressEvent {
    /// Returns the progress lines for a dispatcher event, in order.
    pub fn from_test_event(event: &TestEvent<'_>) -> Vec<Self> {
        match event {
            TestEvent::RunStarted { test_list, .. } => vec![ProgressEvent::StartRun {
                test_count: test_list.run_count(),
            }],
            TestEvent::TestStarted { id, .. } => {
                vec![ProgressEvent::StartTest { id: (*id).clone() }]
            }
            TestEvent::TestFinished { id, status, .. } => {
                let mut events = Vec::with_capacity(2);
                if !status.outcome.is_success() {
                    events.push(ProgressEvent::Failure {
                        text: status
                            .failure_text
                            .clone()
                            .unwrap_or_else(|| status.outcome.to_string()),
                    });
                }
                events.push(ProgressEvent::EndTest { id: (*id).clone() });
                events
            }
            TestEvent::RunFinished { elapsed, .. } => vec![ProgressEvent::EndRun {
                elapsed_ms: elapsed.as_millis(),
            }],
        }
    }

    /// Returns the lines reporting a failure before any test was dispatched: a run with a single
    /// failed test, `devtest.Setup#initializationError`.
    pub fn setup_failure(text: impl Into<String>) -> Vec<Self> {
        let id = TestIdentifier::new(SETUP_FAILURE_CLASS, SETUP_FAILURE_METHOD);
        vec![
            ProgressEvent::StartRun { test_count: 1 },
            ProgressEvent::StartTest { id: id.clone() },
            ProgressEvent::Failure { text: text.into() },
            ProgressEvent::EndTest { id },
            ProgressEvent::EndRun { elapsed_ms: 0 },
        ]
    }

    /// Returns the elapsed time for an `end-run` event.
    pub fn elapsed(&self) -> Option<Duration> {
        match self {
            ProgressEvent::EndRun { elapsed_ms } => {
                Some(Duration::from_millis(u64::try_from(*elapsed_ms).unwrap_or(u64::MAX)))
            }
            _ => None,
        }
    }
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressEvent::StartRun { test_count } => write!(f, "start-run:{test_count}"),
            ProgressEvent::StartTest { id } => {
                write!(f, "start-test:{}", EscapedText(&id.to_string()))
            }
            ProgressEvent::Failure { text } => write!(f, "failure:{}", EscapedText(text)),
            ProgressEvent::EndTest { id } => {
                write!(f, "end-test:{}", EscapedText(&id.to_string()))
            }
            ProgressEvent::EndRun { elapsed_ms } => write!(f, "end-run:{elapsed_ms}"),
        }
    }
}

impl FromStr for ProgressEvent {
    type Err = ProgressEventParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let (prefix, value) = line
            .split_once(':')
            .ok_or_else(|| ProgressEventParseError::new(line, "missing `:`"))?;
        let parse_id = |value: &str| {
            unescape(value)
                .map_err(|reason| ProgressEventParseError::new(line, reason))?
                .parse::<TestIdentifier>()
                .map_err(|err| ProgressEventParseError::new(line, err.to_string()))
        };

        match prefix {
            "start-run" => {
                let test_count = value
                    .parse()
                    .map_err(|_| ProgressEventParseError::new(line, "invalid test count"))?;
                Ok(ProgressEvent::StartRun { test_count })
            }
            "start-test" => Ok(ProgressEvent::StartTest {
                id: parse_id(value)?,
            }),
            "failure" => Ok(ProgressEvent::Failure {
                text: unescape(value).map_err(|reason| ProgressEventParseError::new(line, reason))?,
            }),
            "end-test" => Ok(ProgressEvent::EndTest {
                id: parse_id(value)?,
            }),
            "end-run" => {
                let elapsed_ms = value
                    .parse()
                    .map_err(|_| ProgressEventParseError::new(line, "invalid elapsed time"))?;
                Ok(ProgressEvent::EndRun { elapsed_ms })
            }
            other => Err(ProgressEventParseError::new(
                line,
                format!("unknown event `{other}`"),
            )),
        }
    }
}

struct EscapedText<'a>(&'a str);

impl fmt::Display for EscapedText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in self.0.chars() {
            match c {
                '\\' => f.write_str("\\\\")?,
                '\n' => f.write_str("\\n")?,
                '\r' => f.write_str("\\r")?,
                c => fmt::Write::write_char(f, c)?,
            }
        }
        Ok(())
    }
}

fn unescape(text: &str) -> Result<String, &'static str> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(_) => return Err("unknown escape sequence"),
            None => return Err("trailing `\\`"),
        }
    }
    Ok(out)
}

/// Writes dispatcher events as progress protocol lines.
#[derive(Debug)]
pub struct ProgressReporter<W> {
    writer: W,
}

impl<W: io::Write> ProgressReporter<W> {
    /// Creates a new reporter writing to `writer`.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes the lines for `event`, flushing afterwards so the supervisor sees them immediately.
    pub fn write_event(&mut self, event: &TestEvent<'_>) -> io::Result<()> {
        for line in ProgressEvent::from_test_event(event) {
            writeln!(self.writer, "{line}")?;
        }
        self.writer.flush()
    }

    /// Writes a single event.
    pub fn write_line(&mut self, event: &ProgressEvent) -> io::Result<()> {
        writeln!(self.writer, "{event}")?;
        self.writer.flush()
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case("plain", "plain"; "plain")]
    #[test_case("line one\nline two", "line one\\nline two"; "newline")]
    #[test_case("C:\\path\r\n", "C:\\\\path\\r\\n"; "backslash and crlf")]
    fn escape(text: &str, escaped: &str) {
        let event = ProgressEvent::Failure {
            text: text.to_owned(),
        };
        let line = event.to_string();
        assert_eq!(line, format!("failure:{escaped}"));
        assert!(!line.contains('\n'));
        assert_eq!(line.parse::<ProgressEvent>().unwrap(), event);
    }

    #[test]
    fn identifiers_stay_on_one_line() {
        let id = TestIdentifier::new("com.x.ClassA", "test\nFoo");
        let lines = [
            ProgressEvent::StartTest { id: id.clone() }.to_string(),
            ProgressEvent::EndTest { id }.to_string(),
        ];
        assert_eq!(
            lines,
            [
                "start-test:com.x.ClassA#test\\nFoo",
                "end-test:com.x.ClassA#test\\nFoo",
            ]
        );

        let id = TestIdentifier::new("com.x.Class\\A", "testFoo");
        let line = ProgressEvent::EndTest { id: id.clone() }.to_string();
        assert_eq!(line, "end-test:com.x.Class\\\\A#testFoo");
        assert_eq!(
            line.parse::<ProgressEvent>().unwrap(),
            ProgressEvent::EndTest { id }
        );
    }

    #[test]
    fn parse_lines() {
        let lines = "start-run:2\nstart-test:com.x.A#testOne\nend-test:com.x.A#testOne\n\
                     start-test:com.x.A#testTwo\nfailure:expected:<1> but was:<2>\n\
                     end-test:com.x.A#testTwo\nend-run:1234";
        let events: Vec<ProgressEvent> = lines.lines().map(|l| l.parse().unwrap()).collect();
        assert_eq!(
            events,
            vec![
                ProgressEvent::StartRun { test_count: 2 },
                ProgressEvent::StartTest {
                    id: TestIdentifier::new("com.x.A", "testOne")
                },
                ProgressEvent::EndTest {
                    id: TestIdentifier::new("com.x.A", "testOne")
                },
                ProgressEvent::StartTest {
                    id: TestIdentifier::new("com.x.A", "testTwo")
                },
                ProgressEvent::Failure {
                    text: "expected:<1> but was:<2>".to_owned()
                },
                ProgressEvent::EndTest {
                    id: TestIdentifier::new("com.x.A", "testTwo")
                },
                ProgressEvent::EndRun { elapsed_ms: 1234 },
            ]
        );
        assert_eq!(events[6].elapsed(), Some(Duration::from_millis(1234)));
    }

    #[test]
    fn setup_failure_lines() {
        let lines: Vec<String> = ProgressEvent::setup_failure("bad filter\n  caused by: oops")
            .iter()
            .map(|event| event.to_string())
            .collect();
        assert_eq!(
            lines,
            vec![
                "start-run:1",
                "start-test:devtest.Setup#initializationError",
                "failure:bad filter\\n  caused by: oops",
                "end-test:devtest.Setup#initializationError",
                "end-run:0",
            ]
        );
    }

    #[test_case("start-run"; "missing colon")]
    #[test_case("start-run:many"; "bad count")]
    #[test_case("start-test:NoMethod"; "bad id")]
    #[test_case("failure:oops\\t"; "bad escape")]
    #[test_case("failure:oops\\"; "trailing backslash")]
    #[test_case("test-ended:com.x.A#b"; "unknown prefix")]
    fn parse_errors(line: &str) {
        line.parse::<ProgressEvent>()
            .expect_err("line should fail to parse");
    }
}
