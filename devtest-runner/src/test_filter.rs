// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Building test filters out of config and command-line arguments.

use crate::config::DevtestProfile;
use camino::Utf8Path;
use devtest_filtering::{
    FilterArgs, FilterKind, FilterWarnings, TestFilter, errors::TestFilterBuildError,
};
use std::io;
use tracing::warn;

/// Default implementation of [`FilterWarnings`] that logs warnings using the tracing crate.
#[derive(Debug, Default)]
pub struct DefaultFilterWarnings;

impl FilterWarnings for DefaultFilterWarnings {
    fn filter_file_unreadable(&mut self, kind: FilterKind, path: &Utf8Path, err: &io::Error) {
        warn!("ignoring {kind} filter file {path}: {err}");
    }
}

/// Builds the filter for a run: the profile's filters merged with those passed on the command
/// line.
pub fn build_test_filter(
    profile: &DevtestProfile<'_>,
    cli_args: FilterArgs,
    warnings: &mut impl FilterWarnings,
) -> Result<TestFilter, TestFilterBuildError> {
    let mut args = profile.filter_args();
    args.extend(cli_args);
    args.build(warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DefaultConfigWarnings, DevtestConfig};
    use camino_tempfile::Utf8TempDir;
    use devtest_metadata::TestIdentifier;
    use indoc::indoc;

    #[derive(Default)]
    struct CountWarnings(usize);

    impl FilterWarnings for CountWarnings {
        fn filter_file_unreadable(&mut self, _: FilterKind, _: &Utf8Path, _: &io::Error) {
            self.0 += 1;
        }
    }

    #[test]
    fn merges_config_and_cli() {
        let dir = Utf8TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".config")).unwrap();
        std::fs::write(
            dir.path().join(".config/devtest.toml"),
            indoc! {r#"
                [profile.default]
                exclude-filters = ["com.x.ClassA#testFlaky"]
                exclude-filter-files = ["missing-excludes.txt"]
            "#},
        )
        .unwrap();

        let config =
            DevtestConfig::from_sources(dir.path(), None, &mut DefaultConfigWarnings).unwrap();
        let profile = config.profile(DevtestConfig::DEFAULT_PROFILE).unwrap();
        let cli_args = FilterArgs::parse_raw(["--include-filter=com.x.ClassA"]).unwrap();

        let mut warnings = CountWarnings::default();
        let filter = build_test_filter(&profile, cli_args, &mut warnings).unwrap();
        assert_eq!(warnings.0, 1, "missing filter file reported once");

        assert!(filter.should_run(&TestIdentifier::new("com.x.ClassA", "testFoo")));
        assert!(!filter.should_run(&TestIdentifier::new("com.x.ClassA", "testFlaky")));
        assert!(!filter.should_run(&TestIdentifier::new("com.x.ClassB", "testFoo")));
    }
}
