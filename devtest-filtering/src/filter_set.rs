// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::errors::InvalidFilterError;
use devtest_metadata::METHOD_SEPARATOR;
use std::collections::BTreeSet;

/// The character that delimits generated suffixes from the names they were derived from.
pub const GENERATED_NAME_DELIMITER: char = '_';

/// A set of filter entries.
///
/// Each entry is a fully qualified class name, a `class#method` pair, or a package name.
/// Insertion order is irrelevant and duplicates collapse.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FilterSet {
    entries: BTreeSet<String>,
}

impl FilterSet {
    /// Creates a new, empty filter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a filter set from the given entries, validating each one.
    pub fn from_entries<I, S>(entries: I) -> Result<Self, InvalidFilterError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for entry in entries {
            set.insert(entry.as_ref())?;
        }
        Ok(set)
    }

    /// Inserts an entry into the set.
    ///
    /// Surrounding whitespace is trimmed, and empty entries are skipped. Returns true if the entry
    /// was newly added.
    pub fn insert(&mut self, entry: &str) -> Result<bool, InvalidFilterError> {
        let entry = entry.trim();
        if entry.is_empty() {
            return Ok(false);
        }
        validate_entry(entry)?;
        Ok(self.entries.insert(entry.to_owned()))
    }

    /// Returns true if the set has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of entries in the set.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterates over the entries in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|s| s.as_str())
    }

    /// Returns the entry matching `key`, if any.
    ///
    /// An exact entry is preferred. Otherwise, the shortest entry that is a prefix of `key` and is
    /// followed by `_` in `key` is returned. A prefix followed by any other character, for
    /// example `com.foo` against `com.foobar`, does not match.
    pub fn matching_entry<'a>(&'a self, key: &str) -> Option<&'a str> {
        if let Some(entry) = self.entries.get(key) {
            return Some(entry);
        }
        // Only prefixes that end right before a delimiter can match, so probe the set with each of
        // those rather than scanning every entry.
        key.match_indices(GENERATED_NAME_DELIMITER)
            .filter(|&(idx, _)| idx > 0)
            .find_map(|(idx, _)| self.entries.get(&key[..idx]))
            .map(|entry| entry.as_str())
    }

    /// Returns true if `key` matches an entry in this set.
    pub fn matches(&self, key: &str) -> bool {
        self.matching_entry(key).is_some()
    }
}

fn validate_entry(entry: &str) -> Result<(), InvalidFilterError> {
    if entry.chars().any(char::is_whitespace) {
        return Err(InvalidFilterError::new(entry, "contains whitespace"));
    }
    let mut parts = entry.splitn(3, METHOD_SEPARATOR);
    // The first part is always present.
    let class_part = parts.next().unwrap_or_default();
    match (parts.next(), parts.next()) {
        (None, _) => Ok(()),
        (Some(_), Some(_)) => Err(InvalidFilterError::new(
            entry,
            "contains more than one `#`",
        )),
        (Some(method_part), None) => {
            if class_part.is_empty() {
                Err(InvalidFilterError::new(entry, "class name before `#` is empty"))
            } else if method_part.is_empty() {
                Err(InvalidFilterError::new(entry, "method name after `#` is empty"))
            } else {
                Ok(())
            }
        }
    }
}
