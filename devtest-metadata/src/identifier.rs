// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::TestIdentifierParseError;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The separator between a class name and a method name, as in `com.example.FooTest#testBar`.
pub const METHOD_SEPARATOR: char = '#';

/// Identifies a single test: a fully qualified class name and a method name.
///
/// This is the key tests are dispatched and reported by. It displays and parses as
/// `class#method`.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct TestIdentifier {
    class_name: String,
    method_name: String,
}

impl TestIdentifier {
    /// Creates a new identifier from a class name and a method name.
    ///
    /// No validation is performed: this is the constructor used for identifiers that come from a
    /// trusted source. Use [`FromStr`] for user input.
    pub fn new(class_name: impl Into<String>, method_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            method_name: method_name.into(),
        }
    }

    /// Returns the fully qualified class name.
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Returns the method name.
    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    /// Returns the package the class is in: everything before the last `.`.
    ///
    /// Classes in the default package return an empty string.
    pub fn package(&self) -> &str {
        match self.class_name.rfind('.') {
            Some(idx) => &self.class_name[..idx],
            None => "",
        }
    }

    /// Returns the `class#method` key for this test.
    pub fn method_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TestIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{METHOD_SEPARATOR}{}", self.class_name, self.method_name)
    }
}

impl FromStr for TestIdentifier {
    type Err = TestIdentifierParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.chars().any(char::is_whitespace) {
            return Err(TestIdentifierParseError::new(s, "contains whitespace"));
        }
        let Some((class_name, method_name)) = s.split_once(METHOD_SEPARATOR) else {
            return Err(TestIdentifierParseError::new(
                s,
                "expected the format `class#method`",
            ));
        };
        if method_name.contains(METHOD_SEPARATOR) {
            return Err(TestIdentifierParseError::new(s, "contains more than one `#`"));
        }
        if class_name.is_empty() {
            return Err(TestIdentifierParseError::new(s, "class name is empty"));
        }
        if method_name.is_empty() {
            return Err(TestIdentifierParseError::new(s, "method name is empty"));
        }
        Ok(Self::new(class_name, method_name))
    }
}

impl From<TestIdentifier> for String {
    fn from(id: TestIdentifier) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for TestIdentifier {
    type Error = TestIdentifierParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// The outcome of a single dispatched test.
///
/// Produced exactly once per test that was handed off to an executor.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestOutcome {
    /// The test ran and passed.
    Pass,

    /// The test ran and failed.
    Fail,

    /// The executor could not run the test, or errored out while running it.
    Error,
}

impl TestOutcome {
    /// Returns true if the test passed.
    pub fn is_success(self) -> bool {
        match self {
            TestOutcome::Pass => true,
            TestOutcome::Fail | TestOutcome::Error => false,
        }
    }
}

impl fmt::Display for TestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestOutcome::Pass => f.pad("PASS"),
            TestOutcome::Fail => f.pad("FAIL"),
            TestOutcome::Error => f.pad("ERROR"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn package_and_keys() {
        let id = TestIdentifier::new("com.x.ClassA", "testFoo");
        assert_eq!(id.package(), "com.x");
        assert_eq!(id.method_key(), "com.x.ClassA#testFoo");

        let id = TestIdentifier::new("DefaultPackageTest", "testFoo");
        assert_eq!(id.package(), "", "default package is empty");
    }

    #[test]
    fn parse_valid() {
        let id: TestIdentifier = "com.foo_Generated.Baz#test_thing".parse().unwrap();
        assert_eq!(id.class_name(), "com.foo_Generated.Baz");
        assert_eq!(id.method_name(), "test_thing");
        assert_eq!(id.package(), "com.foo_Generated");
    }

    #[test_case("com.x.ClassA"; "no separator")]
    #[test_case("#testFoo"; "empty class")]
    #[test_case("com.x.ClassA#"; "empty method")]
    #[test_case("com.x.ClassA#test#Foo"; "two separators")]
    #[test_case("com.x.Class A#testFoo"; "whitespace")]
    #[test_case(""; "empty")]
    fn parse_invalid(input: &str) {
        input
            .parse::<TestIdentifier>()
            .expect_err("input should fail to parse");
    }

    #[test]
    fn serde_as_string() {
        let id = TestIdentifier::new("com.x.ClassA", "testFoo");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, r#""com.x.ClassA#testFoo""#);
        let back: TestIdentifier = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);

        serde_json::from_str::<TestIdentifier>(r#""not-a-test""#)
            .expect_err("invalid identifier is rejected");
    }

    #[test]
    fn outcome_display() {
        assert_eq!(TestOutcome::Pass.to_string(), "PASS");
        assert_eq!(format!("{:>5}", TestOutcome::Fail), " FAIL");
        assert_eq!(TestOutcome::Error.to_string(), "ERROR");
        assert!(TestOutcome::Pass.is_success());
        assert!(!TestOutcome::Error.is_success());
    }
}
