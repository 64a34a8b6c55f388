// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    FilterSet, TestFilter,
    errors::{FilterArgParseError, TestFilterBuildError},
};
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexSet;
use std::{fmt, io};

/// Whether a filter includes or excludes tests.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum FilterKind {
    /// Only tests that match are run.
    Include,

    /// Tests that match are never run.
    Exclude,
}

impl FilterKind {
    /// The option names accepted by [`FilterArgs::parse_raw`].
    pub const ALL_OPTIONS: &'static [&'static str] = &[
        "--include-filter",
        "--exclude-filter",
        "--include-filter-file",
        "--exclude-filter-file",
    ];
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterKind::Include => write!(f, "include"),
            FilterKind::Exclude => write!(f, "exclude"),
        }
    }
}

/// Receives non-fatal problems found while building filters.
pub trait FilterWarnings {
    /// A filter file could not be read. The file is treated as empty.
    fn filter_file_unreadable(&mut self, kind: FilterKind, path: &Utf8Path, err: &io::Error);
}

/// Filters as they were specified: on the command line, in config files, or as raw
/// `--name=value` option strings forwarded by a supervising process.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FilterArgs {
    /// Include filter entries.
    pub include_filters: Vec<String>,

    /// Exclude filter entries.
    pub exclude_filters: Vec<String>,

    /// Files with one include filter entry per line.
    pub include_filter_files: Vec<Utf8PathBuf>,

    /// Files with one exclude filter entry per line.
    pub exclude_filter_files: Vec<Utf8PathBuf>,
}

impl FilterArgs {
    /// Creates a new, empty set of filter arguments.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses raw option strings of the form `--include-filter=com.example.FooTest`.
    ///
    /// Recognized options are `--include-filter`, `--exclude-filter`, `--include-filter-file`
    /// and `--exclude-filter-file`.
    pub fn parse_raw<I, S>(args: I) -> Result<Self, FilterArgParseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out = Self::new();
        for arg in args {
            out.push_raw(arg.as_ref())?;
        }
        Ok(out)
    }

    /// Parses a single raw option string and adds it to this set of arguments.
    pub fn push_raw(&mut self, arg: &str) -> Result<(), FilterArgParseError> {
        let malformed = || FilterArgParseError::Malformed {
            arg: arg.to_owned(),
        };
        let (name, value) = arg
            .strip_prefix("--")
            .and_then(|rest| rest.split_once('='))
            .ok_or_else(malformed)?;

        match name {
            "include-filter" => self.include_filters.push(value.to_owned()),
            "exclude-filter" => self.exclude_filters.push(value.to_owned()),
            "include-filter-file" => self.include_filter_files.push(value.into()),
            "exclude-filter-file" => self.exclude_filter_files.push(value.into()),
            other => {
                return Err(FilterArgParseError::UnknownOption {
                    name: other.to_owned(),
                });
            }
        }
        Ok(())
    }

    /// Merges another set of arguments into this one.
    pub fn extend(&mut self, other: FilterArgs) {
        self.include_filters.extend(other.include_filters);
        self.exclude_filters.extend(other.exclude_filters);
        self.include_filter_files.extend(other.include_filter_files);
        self.exclude_filter_files.extend(other.exclude_filter_files);
    }

    /// Builds a [`TestFilter`] out of these arguments, reading any filter files.
    ///
    /// Filter files that can't be read are reported to `warnings` and treated as empty. Invalid
    /// entries, whether passed directly or read from a file, are an error.
    pub fn build(
        &self,
        warnings: &mut impl FilterWarnings,
    ) -> Result<TestFilter, TestFilterBuildError> {
        let includes = build_set(
            FilterKind::Include,
            &self.include_filters,
            &self.include_filter_files,
            warnings,
        )?;
        let excludes = build_set(
            FilterKind::Exclude,
            &self.exclude_filters,
            &self.exclude_filter_files,
            warnings,
        )?;
        Ok(TestFilter::new(includes, excludes))
    }
}

fn build_set(
    kind: FilterKind,
    entries: &[String],
    files: &[Utf8PathBuf],
    warnings: &mut impl FilterWarnings,
) -> Result<FilterSet, TestFilterBuildError> {
    let mut set = FilterSet::new();
    for entry in entries {
        set.insert(entry)
            .map_err(|err| TestFilterBuildError::new(kind, err))?;
    }

    // The same file may be named by both config and the command line. Read it once.
    let files: IndexSet<&Utf8PathBuf> = files.iter().collect();
    for path in files {
        let contents = match read_filter_file(path) {
            Ok(contents) => contents,
            Err(err) => {
                warnings.filter_file_unreadable(kind, path, &err);
                continue;
            }
        };
        for line in filter_file_lines(&contents) {
            set.insert(line)
                .map_err(|err| TestFilterBuildError::new(kind, err))?;
        }
    }

    Ok(set)
}

fn read_filter_file(path: &Utf8Path) -> io::Result<String> {
    if path.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "path is a directory",
        ));
    }
    std::fs::read_to_string(path)
}

/// Returns the entries in a filter file: one per line, skipping blank lines and `#` comments.
pub fn filter_file_lines(contents: &str) -> impl Iterator<Item = &str> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
}
