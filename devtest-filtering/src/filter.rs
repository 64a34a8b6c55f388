// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::FilterSet;
use devtest_metadata::{FilterMatch, MismatchReason, TestIdentifier};

/// Returns true if `test` should run given the include and exclude sets.
///
/// Exclusion takes priority: if the test's package, class or `class#method` key matches any
/// exclude entry, the test doesn't run. Otherwise, it runs if `includes` is empty or if any of
/// those keys matches an include entry.
pub fn should_run(test: &TestIdentifier, includes: &FilterSet, excludes: &FilterSet) -> bool {
    filter_match(test, includes, excludes).is_match()
}

fn filter_match(test: &TestIdentifier, includes: &FilterSet, excludes: &FilterSet) -> FilterMatch {
    let keys = TestKeys::new(test);

    if keys.matched_by(excludes) {
        return FilterMatch::Mismatch {
            reason: MismatchReason::Excluded,
        };
    }
    if includes.is_empty() || keys.matched_by(includes) {
        FilterMatch::Matches
    } else {
        FilterMatch::Mismatch {
            reason: MismatchReason::NotIncluded,
        }
    }
}

/// A filter for tests, built out of include and exclude sets.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TestFilter {
    includes: FilterSet,
    excludes: FilterSet,
}

impl TestFilter {
    /// Creates a new `TestFilter` from include and exclude sets.
    ///
    /// An empty include set matches every test that isn't excluded.
    pub fn new(includes: FilterSet, excludes: FilterSet) -> Self {
        Self { includes, excludes }
    }

    /// Creates a new `TestFilter` that matches every test.
    pub fn any() -> Self {
        Self::default()
    }

    /// Returns the include set.
    pub fn includes(&self) -> &FilterSet {
        &self.includes
    }

    /// Returns the exclude set.
    pub fn excludes(&self) -> &FilterSet {
        &self.excludes
    }

    /// Returns true if the test should run.
    pub fn should_run(&self, test: &TestIdentifier) -> bool {
        should_run(test, &self.includes, &self.excludes)
    }

    /// Returns an enum describing the match status of this filter, including why a test was
    /// filtered out.
    pub fn filter_match(&self, test: &TestIdentifier) -> FilterMatch {
        filter_match(test, &self.includes, &self.excludes)
    }
}

/// The keys a test is matched by.
struct TestKeys<'a> {
    package: &'a str,
    class: &'a str,
    method: String,
}

impl<'a> TestKeys<'a> {
    fn new(test: &'a TestIdentifier) -> Self {
        Self {
            package: test.package(),
            class: test.class_name(),
            method: test.method_key(),
        }
    }

    fn matched_by(&self, set: &FilterSet) -> bool {
        // Classes in the default package have no package key.
        (!self.package.is_empty() && set.matches(self.package))
            || set.matches(self.class)
            || set.matches(&self.method)
    }
}
