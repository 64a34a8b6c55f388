// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{DefaultExecutorImpl, DefaultJunitImpl, ExecutorConfig, ExecutorImpl, JunitConfig, JunitImpl};
use crate::errors::{ConfigParseError, ConfigParseErrorKind, ProfileNotFound};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, builder::DefaultState};
use devtest_filtering::FilterArgs;
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::BTreeSet;
use tracing::warn;

/// Receives non-fatal problems found while reading config files.
pub trait ConfigWarnings {
    /// Handle unknown configuration keys found in a config file.
    fn unknown_config_keys(
        &mut self,
        config_file: &Utf8Path,
        root: &Utf8Path,
        unknown: &BTreeSet<String>,
    );
}

/// Default implementation of ConfigWarnings that logs warnings using the tracing crate.
pub struct DefaultConfigWarnings;

impl ConfigWarnings for DefaultConfigWarnings {
    fn unknown_config_keys(
        &mut self,
        config_file: &Utf8Path,
        root: &Utf8Path,
        unknown: &BTreeSet<String>,
    ) {
        let mut unknown_str = String::new();
        if let [single] = unknown.iter().collect::<Vec<_>>().as_slice() {
            // Print this on the same line.
            unknown_str.push_str("key: ");
            unknown_str.push_str(single);
        } else {
            unknown_str.push_str("keys:\n");
            for ignored_key in unknown {
                unknown_str.push('\n');
                unknown_str.push_str("  - ");
                unknown_str.push_str(ignored_key);
            }
        }

        warn!(
            "in config file {}, ignoring unknown configuration {unknown_str}",
            config_file.strip_prefix(root).unwrap_or(config_file),
        )
    }
}

/// Overall configuration for devtest.
///
/// This is the root data structure for devtest configuration. Most runner-specific configuration
/// is managed through [profiles](DevtestProfile), obtained through the [`profile`](Self::profile)
/// method.
#[derive(Clone, Debug)]
pub struct DevtestConfig {
    root: Utf8PathBuf,
    config_file: Option<Utf8PathBuf>,
    default_profile: DefaultProfileImpl,
    other_profiles: IndexMap<String, CustomProfileImpl>,
}

impl DevtestConfig {
    /// The default location of the config within the root directory: `.config/devtest.toml`.
    pub const CONFIG_PATH: &'static str = ".config/devtest.toml";

    /// Contains the default config as a TOML file.
    ///
    /// Repository-specific configuration is layered on top of the default config.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../../default-config.toml");

    /// Environment variable used to select the profile.
    pub const PROFILE_ENV: &'static str = "DEVTEST_PROFILE";

    /// The name of the default profile.
    pub const DEFAULT_PROFILE: &'static str = "default";

    /// Reads the devtest config from the given file, or if not specified from
    /// `.config/devtest.toml` under `root`.
    ///
    /// If a config file is specified and it doesn't exist, an error is returned. If no file is
    /// specified and `.config/devtest.toml` doesn't exist, the default config is used.
    pub fn from_sources(
        root: impl Into<Utf8PathBuf>,
        config_file: Option<&Utf8Path>,
        warnings: &mut impl ConfigWarnings,
    ) -> Result<Self, ConfigParseError> {
        let root = root.into();
        let (config_file, source) = match config_file {
            Some(file) => (file.to_owned(), File::new(file.as_str(), FileFormat::Toml)),
            None => {
                let config_file = root.join(Self::CONFIG_PATH);
                let source = File::new(config_file.as_str(), FileFormat::Toml).required(false);
                (config_file, source)
            }
        };
        let builder = Self::make_default_config().add_source(source);

        let (config, unknown) = Self::build_and_deserialize_config(builder)
            .map_err(|kind| ConfigParseError::new(&config_file, kind))?;
        if !unknown.is_empty() {
            warnings.unknown_config_keys(&config_file, &root, &unknown);
        }

        let config_file = config_file.exists().then_some(config_file);
        Ok(Self::from_deserialized(root, config_file, config))
    }

    #[cfg(test)]
    pub(crate) fn default_config(root: impl Into<Utf8PathBuf>) -> Self {
        let (config, _unknown) = Self::build_and_deserialize_config(Self::make_default_config())
            .expect("default config is always valid");
        Self::from_deserialized(root.into(), None, config)
    }

    /// Returns the root directory relative paths in the config are resolved against.
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Returns the config file that was read, if any.
    pub fn config_file(&self) -> Option<&Utf8Path> {
        self.config_file.as_deref()
    }

    /// Returns the profile with the given name, or an error if a profile was specified but not
    /// found.
    pub fn profile(&self, name: impl AsRef<str>) -> Result<DevtestProfile<'_>, ProfileNotFound> {
        let name = name.as_ref();
        let custom_profile = match name {
            Self::DEFAULT_PROFILE => None,
            other => Some(
                self.other_profiles
                    .get(other)
                    .ok_or_else(|| ProfileNotFound::new(name, self.all_profiles()))?,
            ),
        };
        Ok(DevtestProfile {
            name: name.to_owned(),
            root: &self.root,
            default_profile: &self.default_profile,
            custom_profile,
        })
    }

    /// Returns the names of all profiles, starting with the default profile.
    pub fn all_profiles(&self) -> impl Iterator<Item = &str> {
        std::iter::once(Self::DEFAULT_PROFILE).chain(self.other_profiles.keys().map(|k| k.as_str()))
    }

    // ---
    // Helper methods
    // ---

    fn from_deserialized(
        root: Utf8PathBuf,
        config_file: Option<Utf8PathBuf>,
        mut config: DevtestConfigDeserialize,
    ) -> Self {
        let default_profile = config
            .profiles
            .shift_remove(Self::DEFAULT_PROFILE)
            .expect("default profile should exist");
        Self {
            root,
            config_file,
            default_profile: DefaultProfileImpl::new(default_profile),
            other_profiles: config.profiles,
        }
    }

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    /// This returns a tuple of (config, ignored paths).
    fn build_and_deserialize_config(
        builder: ConfigBuilder<DefaultState>,
    ) -> Result<(DevtestConfigDeserialize, BTreeSet<String>), ConfigParseErrorKind> {
        let config = builder
            .build()
            .map_err(|error| ConfigParseErrorKind::BuildError(Box::new(error)))?;

        let mut ignored = BTreeSet::new();
        let mut cb = |path: serde_ignored::Path| {
            ignored.insert(path.to_string());
        };
        let ignored_de = serde_ignored::Deserializer::new(config, &mut cb);
        let config: DevtestConfigDeserialize = serde_path_to_error::deserialize(ignored_de)
            .map_err(|error| {
                // Both serde_path_to_error and the config crate report the key. Drop the key from
                // the config error for consistency.
                let path = error.path().clone();
                let config_error = error.into_inner();
                let error = match config_error {
                    ConfigError::At { error, .. } => *error,
                    other => other,
                };
                ConfigParseErrorKind::DeserializeError(Box::new(serde_path_to_error::Error::new(
                    path, error,
                )))
            })?;

        Ok((config, ignored))
    }
}

/// A devtest profile: the settings used for one invocation.
#[derive(Clone, Debug)]
pub struct DevtestProfile<'cfg> {
    name: String,
    root: &'cfg Utf8Path,
    default_profile: &'cfg DefaultProfileImpl,
    custom_profile: Option<&'cfg CustomProfileImpl>,
}

impl<'cfg> DevtestProfile<'cfg> {
    /// Returns the name of the profile.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the filters set in this profile, with filter file paths resolved against the root
    /// directory.
    pub fn filter_args(&self) -> FilterArgs {
        let custom = self.custom_profile;
        let default = self.default_profile;
        let resolve = |paths: &[Utf8PathBuf]| -> Vec<Utf8PathBuf> {
            paths.iter().map(|path| self.root.join(path)).collect()
        };

        FilterArgs {
            include_filters: custom
                .and_then(|p| p.include_filters.clone())
                .unwrap_or_else(|| default.include_filters.clone()),
            exclude_filters: custom
                .and_then(|p| p.exclude_filters.clone())
                .unwrap_or_else(|| default.exclude_filters.clone()),
            include_filter_files: resolve(
                custom
                    .and_then(|p| p.include_filter_files.as_deref())
                    .unwrap_or(&default.include_filter_files),
            ),
            exclude_filter_files: resolve(
                custom
                    .and_then(|p| p.exclude_filter_files.as_deref())
                    .unwrap_or(&default.exclude_filter_files),
            ),
        }
    }

    /// Returns the executor settings for this profile.
    pub fn executor(&self) -> ExecutorConfig<'cfg> {
        ExecutorConfig::new(
            self.custom_profile.map(|p| &p.executor),
            &self.default_profile.executor,
        )
    }

    /// Returns the JUnit configuration for this profile, if a report path is set.
    pub fn junit(&self) -> Option<JunitConfig<'cfg>> {
        JunitConfig::new(
            self.root,
            self.custom_profile.map(|p| &p.junit),
            &self.default_profile.junit,
        )
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DevtestConfigDeserialize {
    #[serde(rename = "profile")]
    profiles: IndexMap<String, CustomProfileImpl>,
}

#[derive(Clone, Debug)]
struct DefaultProfileImpl {
    include_filters: Vec<String>,
    exclude_filters: Vec<String>,
    include_filter_files: Vec<Utf8PathBuf>,
    exclude_filter_files: Vec<Utf8PathBuf>,
    executor: DefaultExecutorImpl,
    junit: DefaultJunitImpl,
}

impl DefaultProfileImpl {
    fn new(p: CustomProfileImpl) -> Self {
        Self {
            include_filters: p
                .include_filters
                .expect("include-filters present in default profile"),
            exclude_filters: p
                .exclude_filters
                .expect("exclude-filters present in default profile"),
            include_filter_files: p
                .include_filter_files
                .expect("include-filter-files present in default profile"),
            exclude_filter_files: p
                .exclude_filter_files
                .expect("exclude-filter-files present in default profile"),
            executor: DefaultExecutorImpl::for_default_profile(p.executor),
            junit: DefaultJunitImpl::for_default_profile(p.junit),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct CustomProfileImpl {
    #[serde(default)]
    include_filters: Option<Vec<String>>,
    #[serde(default)]
    exclude_filters: Option<Vec<String>>,
    #[serde(default)]
    include_filter_files: Option<Vec<Utf8PathBuf>>,
    #[serde(default)]
    exclude_filter_files: Option<Vec<Utf8PathBuf>>,
    #[serde(default)]
    executor: ExecutorImpl,
    #[serde(default)]
    junit: JunitImpl,
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino_tempfile::Utf8TempDir;
    use indoc::indoc;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordWarnings {
        unknown: Vec<BTreeSet<String>>,
    }

    impl ConfigWarnings for RecordWarnings {
        fn unknown_config_keys(
            &mut self,
            _config_file: &Utf8Path,
            _root: &Utf8Path,
            unknown: &BTreeSet<String>,
        ) {
            self.unknown.push(unknown.clone());
        }
    }

    fn write_config(dir: &Utf8TempDir, contents: &str) {
        let config_dir = dir.path().join(".config");
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(config_dir.join("devtest.toml"), contents).unwrap();
    }

    #[test]
    fn default_config_is_valid() {
        let config = DevtestConfig::default_config("/root");
        let profile = config.profile(DevtestConfig::DEFAULT_PROFILE).unwrap();
        assert_eq!(profile.filter_args(), FilterArgs::default());

        let executor = profile.executor();
        assert!(executor.command().is_empty());
        assert_eq!(executor.list_command(), None);
        assert_eq!(executor.connect_retries(), 3);
        assert_eq!(executor.connect_retry_delay(), Duration::from_millis(500));
        assert!(profile.junit().is_none(), "no junit path by default");
    }

    #[test]
    fn custom_profile_falls_back_to_default() {
        let dir = Utf8TempDir::new().unwrap();
        write_config(
            &dir,
            indoc! {r#"
                [profile.default]
                exclude-filters = ["com.x.Flaky"]

                [profile.default.executor]
                command = ["run-test", "{test}"]

                [profile.ci]
                include-filters = ["com.x"]
                include-filter-files = ["ci/includes.txt"]

                [profile.ci.executor]
                connect-retries = 10

                [profile.ci.junit]
                path = "out/junit.xml"
            "#},
        );

        let mut warnings = RecordWarnings::default();
        let config = DevtestConfig::from_sources(dir.path(), None, &mut warnings).unwrap();
        assert!(warnings.unknown.is_empty());
        assert_eq!(
            config.config_file(),
            Some(dir.path().join(".config/devtest.toml").as_path())
        );
        assert_eq!(config.all_profiles().collect::<Vec<_>>(), vec!["default", "ci"]);

        let ci = config.profile("ci").unwrap();
        let filter_args = ci.filter_args();
        assert_eq!(filter_args.include_filters, vec!["com.x".to_owned()]);
        assert_eq!(
            filter_args.exclude_filters,
            vec!["com.x.Flaky".to_owned()],
            "inherited from default"
        );
        assert_eq!(
            filter_args.include_filter_files,
            vec![dir.path().join("ci/includes.txt")]
        );

        let executor = ci.executor();
        assert_eq!(executor.command(), &["run-test".to_owned(), "{test}".to_owned()]);
        assert_eq!(executor.connect_retries(), 10);

        let junit = ci.junit().expect("junit path set");
        assert_eq!(junit.path(), dir.path().join("out/junit.xml"));
        assert_eq!(junit.report_name(), "devtest-run");
    }

    #[test]
    fn unknown_profile() {
        let config = DevtestConfig::default_config("/root");
        let err = config.profile("missing").unwrap_err();
        assert_eq!(
            err.to_string(),
            "profile `missing` not found (known profiles: default)"
        );
    }

    #[test]
    fn unknown_keys_warn() {
        let dir = Utf8TempDir::new().unwrap();
        write_config(
            &dir,
            indoc! {r#"
                [profile.default]
                include-filterz = ["com.x"]
            "#},
        );

        let mut warnings = RecordWarnings::default();
        DevtestConfig::from_sources(dir.path(), None, &mut warnings).unwrap();
        assert_eq!(warnings.unknown.len(), 1);
        assert!(
            warnings.unknown[0]
                .iter()
                .any(|key| key.contains("include-filterz")),
            "unknown key reported: {:?}",
            warnings.unknown
        );
    }

    #[test]
    fn invalid_value_is_error() {
        let dir = Utf8TempDir::new().unwrap();
        write_config(
            &dir,
            indoc! {r#"
                [profile.default.executor]
                connect-retry-delay = "soon"
            "#},
        );

        let err = DevtestConfig::from_sources(dir.path(), None, &mut DefaultConfigWarnings)
            .unwrap_err();
        assert!(
            matches!(err.kind(), ConfigParseErrorKind::DeserializeError(_)),
            "unexpected error: {err:?}"
        );
    }

    #[test]
    fn missing_explicit_config_file_is_error() {
        let dir = Utf8TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = DevtestConfig::from_sources(dir.path(), Some(&missing), &mut DefaultConfigWarnings)
            .unwrap_err();
        assert_eq!(err.config_file(), &missing);
        assert!(matches!(err.kind(), ConfigParseErrorKind::BuildError(_)));
    }
}
