// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The test universe: every known test, in enumeration order, with its filter match status.

use crate::{
    errors::{CreateTestListError, TestListSource},
    helpers::plural,
    partition::PartitionerBuilder,
};
use camino::Utf8Path;
use devtest_filtering::TestFilter;
use devtest_metadata::{FilterMatch, MismatchReason, TestIdentifier, TestListSummary};
use itertools::Itertools;
use owo_colors::{OwoColorize, Style};
use std::{collections::HashSet, fmt, io};
use tracing::{debug, warn};

/// An index into a [`TestList`].
///
/// Results, events and reporters refer to tests by index into the list they were dispatched from.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TestIndex(usize);

impl TestIndex {
    /// Returns the position of the test in enumeration order.
    pub fn as_usize(self) -> usize {
        self.0
    }
}

impl fmt::Display for TestIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A test in a [`TestList`], along with whether it was selected to run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TestInstance {
    /// The test's identifier.
    pub id: TestIdentifier,

    /// Whether the test will be run, and if not, why.
    pub filter_match: FilterMatch,
}

/// The ordered test universe.
#[derive(Clone, Debug, Default)]
pub struct TestList {
    tests: Vec<TestInstance>,
    run_count: usize,
}

impl TestList {
    /// Creates a new test list from identifiers in enumeration order.
    ///
    /// Duplicate identifiers are dropped with a warning, keeping the first occurrence. Tests that
    /// pass `filter` are then split by `partitioner`, if any.
    pub fn new(
        tests: impl IntoIterator<Item = TestIdentifier>,
        filter: &TestFilter,
        partitioner: Option<&PartitionerBuilder>,
    ) -> Self {
        let mut seen = HashSet::new();
        let mut partitioner = partitioner.map(|builder| builder.build());
        let mut run_count = 0;

        let tests = tests
            .into_iter()
            .filter(|id| {
                let first = seen.insert(id.clone());
                if !first {
                    warn!("ignoring duplicate test `{id}` in test list");
                }
                first
            })
            .map(|id| {
                let mut filter_match = filter.filter_match(&id);
                if filter_match.is_match()
                    && let Some(partitioner) = &mut partitioner
                    && !partitioner.test_matches(&id)
                {
                    filter_match = FilterMatch::Mismatch {
                        reason: MismatchReason::Partition,
                    };
                }
                if filter_match.is_match() {
                    run_count += 1;
                }
                TestInstance { id, filter_match }
            })
            .collect();

        Self { tests, run_count }
    }

    /// Reads a test list file: one `class#method` per line, skipping blank lines and `#`
    /// comments.
    pub fn from_file(
        path: &Utf8Path,
        filter: &TestFilter,
        partitioner: Option<&PartitionerBuilder>,
    ) -> Result<Self, CreateTestListError> {
        let contents =
            std::fs::read_to_string(path).map_err(|err| CreateTestListError::ReadFile {
                path: path.to_owned(),
                err,
            })?;
        Self::from_output(
            TestListSource::File(path.to_owned()),
            &contents,
            filter,
            partitioner,
        )
    }

    /// Runs `command` once and reads the test list from its standard output.
    ///
    /// The command is run in `cwd`.
    pub fn from_command(
        command: &[String],
        cwd: &Utf8Path,
        filter: &TestFilter,
        partitioner: Option<&PartitionerBuilder>,
    ) -> Result<Self, CreateTestListError> {
        let command_str = shell_words::join(command);
        let Some((program, args)) = command.split_first() else {
            return Err(CreateTestListError::NoSource);
        };
        debug!("listing tests with `{command_str}`");

        let output = duct::cmd(program, args)
            .dir(cwd.as_std_path())
            .stdout_capture()
            .stderr_capture()
            .unchecked()
            .run()
            .map_err(|err| CreateTestListError::CommandExecFail {
                command: command_str.clone(),
                err,
            })?;
        if !output.status.success() {
            return Err(CreateTestListError::CommandFail {
                command: command_str,
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        let stdout =
            String::from_utf8(output.stdout).map_err(|err| CreateTestListError::CommandOutputNonUtf8 {
                command: command_str.clone(),
                err,
            })?;

        Self::from_output(
            TestListSource::Command(command_str),
            &stdout,
            filter,
            partitioner,
        )
    }

    /// Parses a test list out of already-read text.
    pub fn from_output(
        source: TestListSource,
        output: &str,
        filter: &TestFilter,
        partitioner: Option<&PartitionerBuilder>,
    ) -> Result<Self, CreateTestListError> {
        let mut ids = Vec::new();
        for (line_idx, line) in output.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let id = line
                .parse::<TestIdentifier>()
                .map_err(|err| CreateTestListError::ParseLine {
                    source_desc: source.clone(),
                    line_number: line_idx + 1,
                    err,
                })?;
            ids.push(id);
        }

        let list = Self::new(ids, filter, partitioner);
        debug!(
            "read {} {} from {source}, {} selected",
            list.test_count(),
            plural::tests_str(list.test_count()),
            list.run_count(),
        );
        Ok(list)
    }

    /// Returns the total number of tests in the universe.
    pub fn test_count(&self) -> usize {
        self.tests.len()
    }

    /// Returns the number of tests selected to run.
    pub fn run_count(&self) -> usize {
        self.run_count
    }

    /// Returns the number of tests that were filtered out.
    ///
    /// It is always the case that `run_count + skip_count == test_count`.
    pub fn skip_count(&self) -> usize {
        self.test_count() - self.run_count
    }

    /// Returns the test at `index`.
    pub fn get(&self, index: TestIndex) -> Option<&TestInstance> {
        self.tests.get(index.0)
    }

    /// Iterates over every test in enumeration order.
    pub fn iter(&self) -> impl Iterator<Item = (TestIndex, &TestInstance)> + '_ {
        self.tests
            .iter()
            .enumerate()
            .map(|(idx, instance)| (TestIndex(idx), instance))
    }

    /// Iterates over the tests selected to run, in enumeration order.
    pub fn iter_selected(&self) -> impl Iterator<Item = (TestIndex, &TestIdentifier)> + '_ {
        self.iter()
            .filter(|(_, instance)| instance.filter_match.is_match())
            .map(|(index, instance)| (index, &instance.id))
    }

    /// Returns a serializable summary of this list.
    pub fn to_summary(&self) -> TestListSummary {
        let mut summary = TestListSummary::new();
        for instance in &self.tests {
            summary.push(instance.id.clone(), instance.filter_match);
        }
        summary
    }

    /// Writes this list in human-readable form, grouped by class.
    ///
    /// Tests that won't run are shown with the reason they were filtered out if `verbose` is
    /// true, and omitted otherwise.
    pub fn write_human(
        &self,
        mut writer: impl io::Write,
        verbose: bool,
        colorize: bool,
    ) -> io::Result<()> {
        let mut styles = Styles::default();
        if colorize {
            styles.colorize();
        }

        let shown = self
            .tests
            .iter()
            .filter(|instance| verbose || instance.filter_match.is_match());
        for (class, instances) in &shown.chunk_by(|instance| instance.id.class_name()) {
            writeln!(writer, "{}:", class.style(styles.class))?;
            for instance in instances {
                write!(
                    writer,
                    "    {}",
                    instance.id.method_name().style(styles.method)
                )?;
                if let FilterMatch::Mismatch { reason } = instance.filter_match {
                    write!(writer, " {}", format!("(skipped: {reason})").style(styles.skipped))?;
                }
                writeln!(writer)?;
            }
        }

        Ok(())
    }
}

#[derive(Clone, Debug, Default)]
struct Styles {
    class: Style,
    method: Style,
    skipped: Style,
}

impl Styles {
    fn colorize(&mut self) {
        self.class = Style::new().magenta().bold();
        self.method = Style::new().blue().bold();
        self.skipped = Style::new().dimmed();
    }
}
