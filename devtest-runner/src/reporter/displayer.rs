// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Human-readable output for test runs.

use crate::{
    helpers::{plural, usize_decimal_char_width},
    runner::{RunStats, TestEvent, TestRunStatus},
};
use devtest_metadata::{TestIdentifier, TestOutcome};
use owo_colors::{OwoColorize, Style};
use std::{fmt, io, time::Duration};
use swrite::{SWrite, swrite};

/// Writes status lines and a final summary for each test event.
#[derive(Debug)]
pub struct DisplayReporter<W> {
    writer: W,
    styles: Styles,
    finished: usize,
    total: usize,
    failures: Vec<(TestIdentifier, TestRunStatus)>,
}

impl<W: io::Write> DisplayReporter<W> {
    /// Creates a new reporter writing to `writer`.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            styles: Styles::default(),
            finished: 0,
            total: 0,
            failures: Vec::new(),
        }
    }

    /// Colorizes output.
    pub fn colorize(&mut self) {
        self.styles.colorize();
    }

    /// Writes the lines for `event`.
    pub fn write_event(&mut self, event: &TestEvent<'_>) -> io::Result<()> {
        match event {
            TestEvent::RunStarted { test_list, .. } => {
                self.total = test_list.run_count();
                write!(self.writer, "{:>12} ", "Starting".style(self.styles.pass))?;
                write!(
                    self.writer,
                    "{} {}",
                    test_list.run_count().style(self.styles.count),
                    plural::tests_str(test_list.run_count()),
                )?;
                if test_list.skip_count() > 0 {
                    write!(
                        self.writer,
                        " ({} {})",
                        test_list.skip_count().style(self.styles.count),
                        "skipped".style(self.styles.skip),
                    )?;
                }
                writeln!(self.writer)?;
            }
            TestEvent::TestStarted { .. } => {}
            TestEvent::TestFinished { id, status, .. } => {
                self.finished += 1;
                self.write_status_line(id, status)?;
                if !status.outcome.is_success() {
                    self.write_failure_text(status)?;
                    self.failures.push(((*id).clone(), status.clone()));
                }
            }
            TestEvent::RunFinished {
                elapsed, run_stats, ..
            } => {
                self.write_summary(*elapsed, run_stats)?;
            }
        }
        self.writer.flush()
    }

    fn write_status_line(&mut self, id: &TestIdentifier, status: &TestRunStatus) -> io::Result<()> {
        let style = match status.outcome {
            TestOutcome::Pass => self.styles.pass,
            TestOutcome::Fail | TestOutcome::Error => self.styles.fail,
        };
        let width = usize_decimal_char_width(self.total);
        writeln!(
            self.writer,
            "{:>12} {}{} {}",
            status.outcome.style(style),
            DisplayBracketedDuration(status.time_taken),
            format!("({:>width$}/{})", self.finished, self.total).style(self.styles.count),
            DisplayTestId {
                id,
                styles: &self.styles
            },
        )
    }

    fn write_failure_text(&mut self, status: &TestRunStatus) -> io::Result<()> {
        let Some(text) = &status.failure_text else {
            return Ok(());
        };
        for line in text.lines() {
            writeln!(self.writer, "    {}", line.style(self.styles.failure_text))?;
        }
        Ok(())
    }

    fn write_summary(&mut self, elapsed: Duration, run_stats: &RunStats) -> io::Result<()> {
        let summary_style = if run_stats.final_run_count == 0 {
            self.styles.skip
        } else if run_stats.is_success() {
            self.styles.pass
        } else {
            self.styles.fail
        };
        writeln!(self.writer, "{}", "-".repeat(12))?;
        write!(
            self.writer,
            "{:>12} {}",
            "Summary".style(summary_style),
            DisplayBracketedDuration(elapsed)
        )?;

        let mut summary_str = String::new();
        write_summary_str(run_stats, &self.styles, &mut summary_str);
        writeln!(
            self.writer,
            "{} {} run: {summary_str}",
            run_stats.final_run_count.style(self.styles.count),
            plural::tests_str(run_stats.final_run_count),
        )?;

        for (id, status) in &self.failures {
            writeln!(
                self.writer,
                "{:>12} {}{}",
                status.outcome.style(self.styles.fail),
                DisplayBracketedDuration(status.time_taken),
                DisplayTestId {
                    id,
                    styles: &self.styles
                },
            )?;
        }
        Ok(())
    }
}

fn write_summary_str(run_stats: &RunStats, styles: &Styles, out: &mut String) {
    // Written in this style to ensure new fields are accounted for.
    let &RunStats {
        initial_run_count: _,
        final_run_count: _,
        passed,
        failed,
        errored,
        filtered_out,
    } = run_stats;

    swrite!(out, "{} {}", passed.style(styles.count), "passed".style(styles.pass));
    if failed > 0 {
        swrite!(out, ", {} {}", failed.style(styles.count), "failed".style(styles.fail));
    }
    if errored > 0 {
        swrite!(out, ", {} {}", errored.style(styles.count), "errored".style(styles.fail));
    }
    swrite!(out, ", {} {}", filtered_out.style(styles.count), "skipped".style(styles.skip));
}

struct DisplayBracketedDuration(Duration);

impl fmt::Display for DisplayBracketedDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // * > means right-align.
        // * 8 is the number of characters to pad to.
        // * .3 means print three digits after the decimal point.
        write!(f, "[{:>8.3?}s] ", self.0.as_secs_f64())
    }
}

struct DisplayTestId<'a> {
    id: &'a TestIdentifier,
    styles: &'a Styles,
}

impl fmt::Display for DisplayTestId<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}#{}",
            self.id.class_name().style(self.styles.class),
            self.id.method_name().style(self.styles.method),
        )
    }
}

#[derive(Clone, Debug, Default)]
struct Styles {
    count: Style,
    pass: Style,
    fail: Style,
    skip: Style,
    class: Style,
    method: Style,
    failure_text: Style,
}

impl Styles {
    fn colorize(&mut self) {
        self.count = Style::new().bold();
        self.pass = Style::new().green().bold();
        self.fail = Style::new().red().bold();
        self.skip = Style::new().yellow().bold();
        self.class = Style::new().magenta().bold();
        self.method = Style::new().blue().bold();
        self.failure_text = Style::new().dimmed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_str() {
        let mut out = String::new();
        write_summary_str(
            &RunStats {
                initial_run_count: 5,
                final_run_count: 5,
                passed: 3,
                failed: 1,
                errored: 1,
                filtered_out: 2,
            },
            &Styles::default(),
            &mut out,
        );
        assert_eq!(out, "3 passed, 1 failed, 1 errored, 2 skipped");
    }

    #[test]
    fn bracketed_duration() {
        assert_eq!(
            DisplayBracketedDuration(Duration::from_millis(1500)).to_string(),
            "[   1.500s] "
        );
    }
}
