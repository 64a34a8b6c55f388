// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    ExpectedError,
    errors::Result,
    output::{OutputContext, OutputOpts, OutputStream, OutputWriter},
};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand, ValueEnum};
use devtest_filtering::FilterArgs;
use devtest_metadata::DevtestExitCode;
use devtest_runner::{
    config::{DefaultConfigWarnings, DevtestConfig, DevtestProfile},
    errors::{CreateTestListError, DisplayErrorChain},
    executor::CommandExecutor,
    partition::PartitionerBuilder,
    reporter::{ReporterBuilder, RunMessageFormat},
    runner::TestRunnerBuilder,
    test_filter::{DefaultFilterWarnings, build_test_filter},
    test_list::TestList,
};
use std::io::{self, Write};
use supports_color::Stream;
use tracing::{debug, warn};

/// Select tests out of a device test module and dispatch them to an external executor.
///
/// devtest reads a test universe, applies include and exclude filters, and runs the selected
/// tests one at a time with the executor command configured in `.config/devtest.toml`. Progress
/// is reported on stdout for a supervising process.
#[derive(Debug, Parser)]
#[command(
    version,
    name = "devtest",
    styles = crate::output::clap_styles::style(),
    max_term_width = 100
)]
pub struct DevtestApp {
    #[command(flatten)]
    output: OutputOpts,

    #[command(flatten)]
    config_opts: ConfigOpts,

    #[command(subcommand)]
    command: Command,
}

impl DevtestApp {
    /// Initializes the output context.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app, returning the exit code on success.
    pub fn exec(self, output: OutputContext, output_writer: &mut OutputWriter) -> Result<i32> {
        match self.command {
            Command::List {
                selection,
                message_format,
            } => {
                let config = self.config_opts.make_config()?;
                let profile = config.profile(self.config_opts.profile_name())?;
                let test_list = selection.compute_test_list(&profile, config.root())?;

                let (mut stdout, _) = output_writer.split();
                write_test_list(&test_list, message_format, output, &mut *stdout)
                    .map_err(|err| ExpectedError::WriteTestListError { err })?;
                Ok(DevtestExitCode::OK)
            }
            Command::Run {
                selection,
                message_format,
                no_tests,
            } => exec_run(
                &self.config_opts,
                &selection,
                message_format,
                no_tests,
                output,
                output_writer,
            ),
        }
    }
}

#[derive(Debug, Args)]
#[command(next_help_heading = "Config options")]
struct ConfigOpts {
    /// Directory relative config paths are resolved against [default: current directory]
    #[arg(long, global = true, value_name = "DIR")]
    root_dir: Option<Utf8PathBuf>,

    /// Config file [default: <root-dir>/.config/devtest.toml]
    #[arg(long, global = true, value_name = "PATH")]
    config_file: Option<Utf8PathBuf>,

    /// Config profile to use
    #[arg(
        long,
        short = 'P',
        global = true,
        value_name = "NAME",
        env = DevtestConfig::PROFILE_ENV
    )]
    profile: Option<String>,
}

impl ConfigOpts {
    fn root_dir(&self) -> Result<Utf8PathBuf> {
        if let Some(root_dir) = &self.root_dir {
            return Ok(root_dir.clone());
        }
        let cwd =
            std::env::current_dir().map_err(|err| ExpectedError::CurrentDirFailed { err })?;
        Utf8PathBuf::try_from(cwd)
            .map_err(|err| ExpectedError::CurrentDirInvalidUtf8 { path: err.into_path_buf() })
    }

    fn make_config(&self) -> Result<DevtestConfig> {
        let root_dir = self.root_dir()?;
        let config = DevtestConfig::from_sources(
            root_dir,
            self.config_file.as_deref(),
            &mut DefaultConfigWarnings,
        )?;
        match config.config_file() {
            Some(config_file) => debug!("loaded config from {config_file}"),
            None => debug!("no config file found, using defaults"),
        }
        Ok(config)
    }

    fn profile_name(&self) -> &str {
        self.profile
            .as_deref()
            .unwrap_or(DevtestConfig::DEFAULT_PROFILE)
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List tests and whether they will be run
    ///
    /// Use --message-format json to get machine-readable output.
    List {
        #[command(flatten)]
        selection: TestSelectionOpts,

        /// Output format
        #[arg(
            short = 'T',
            long,
            value_enum,
            default_value_t,
            help_heading = "Output options",
            value_name = "FMT"
        )]
        message_format: ListMessageFormat,
    },

    /// Run selected tests one at a time with the configured executor
    ///
    /// Any failure before the first test is dispatched is reported on the progress protocol as a
    /// single failed test, `devtest.Setup#initializationError`.
    Run {
        #[command(flatten)]
        selection: TestSelectionOpts,

        /// Output format
        #[arg(
            short = 'T',
            long,
            value_enum,
            default_value_t,
            help_heading = "Output options",
            value_name = "FMT"
        )]
        message_format: RunMessageFormatOpt,

        /// Behavior if no tests are selected to run
        #[arg(
            long,
            value_enum,
            default_value_t,
            help_heading = "Runner options",
            value_name = "ACTION"
        )]
        no_tests: NoTestsBehavior,
    },
}

#[derive(Copy, Clone, Debug, Default, ValueEnum)]
enum ListMessageFormat {
    #[default]
    Human,
    Json,
    JsonPretty,
}

#[derive(Copy, Clone, Debug, Default, ValueEnum)]
enum RunMessageFormatOpt {
    /// The line-oriented progress protocol, on stdout
    #[default]
    Progress,
    /// Status lines and a summary, on stderr
    Human,
}

impl From<RunMessageFormatOpt> for RunMessageFormat {
    fn from(opt: RunMessageFormatOpt) -> Self {
        match opt {
            RunMessageFormatOpt::Progress => RunMessageFormat::Progress,
            RunMessageFormatOpt::Human => RunMessageFormat::Human,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
enum NoTestsBehavior {
    /// Silently exit with code 0.
    Pass,
    /// Produce a warning and exit with code 0.
    #[default]
    Warn,
    /// Produce an error message and exit with code 4.
    Fail,
}

#[derive(Debug, Default, Args)]
#[command(next_help_heading = "Filter options")]
struct TestSelectionOpts {
    /// Run only tests matching this package, class or class#method
    #[arg(long = "include-filter", value_name = "FILTER")]
    include_filters: Vec<String>,

    /// Skip tests matching this package, class or class#method
    #[arg(long = "exclude-filter", value_name = "FILTER")]
    exclude_filters: Vec<String>,

    /// Read include filters from a file, one per line
    #[arg(long = "include-filter-file", value_name = "PATH")]
    include_filter_files: Vec<Utf8PathBuf>,

    /// Read exclude filters from a file, one per line
    #[arg(long = "exclude-filter-file", value_name = "PATH")]
    exclude_filter_files: Vec<Utf8PathBuf>,

    /// Read tests from this file, one class#method per line [default: run
    /// executor.list-command]
    #[arg(long, value_name = "PATH")]
    test_list: Option<Utf8PathBuf>,

    /// Test partition, e.g. hash:1/2 or count:2/3
    #[arg(long, value_name = "PARTITION")]
    partition: Option<PartitionerBuilder>,

    /// Filter arguments in `--name=value` form, as passed by a supervising process
    #[arg(last = true, value_name = "FILTER-ARGS")]
    raw_filter_args: Vec<String>,
}

impl TestSelectionOpts {
    fn filter_args(&self) -> Result<FilterArgs> {
        let mut args = FilterArgs {
            include_filters: self.include_filters.clone(),
            exclude_filters: self.exclude_filters.clone(),
            include_filter_files: self.include_filter_files.clone(),
            exclude_filter_files: self.exclude_filter_files.clone(),
        };
        args.extend(FilterArgs::parse_raw(&self.raw_filter_args)?);
        Ok(args)
    }

    fn compute_test_list(&self, profile: &DevtestProfile<'_>, root: &Utf8Path) -> Result<TestList> {
        let test_filter =
            build_test_filter(profile, self.filter_args()?, &mut DefaultFilterWarnings)?;
        let partitioner = self.partition.as_ref();

        let test_list = match (&self.test_list, profile.executor().list_command()) {
            (Some(path), _) => TestList::from_file(path, &test_filter, partitioner)?,
            (None, Some(command)) if !command.is_empty() => {
                TestList::from_command(command, root, &test_filter, partitioner)?
            }
            (None, _) => return Err(CreateTestListError::NoSource.into()),
        };
        Ok(test_list)
    }
}

fn write_test_list(
    test_list: &TestList,
    message_format: ListMessageFormat,
    output: OutputContext,
    writer: &mut dyn Write,
) -> io::Result<()> {
    match message_format {
        ListMessageFormat::Human => test_list.write_human(
            &mut *writer,
            output.verbose,
            output.color.should_colorize(Stream::Stdout),
        )?,
        ListMessageFormat::Json => {
            serde_json::to_writer(&mut *writer, &test_list.to_summary())?;
            writeln!(writer)?;
        }
        ListMessageFormat::JsonPretty => {
            serde_json::to_writer_pretty(&mut *writer, &test_list.to_summary())?;
            writeln!(writer)?;
        }
    }
    writer.flush()
}

fn exec_run(
    config_opts: &ConfigOpts,
    selection: &TestSelectionOpts,
    message_format: RunMessageFormatOpt,
    no_tests: NoTestsBehavior,
    output: OutputContext,
    output_writer: &mut OutputWriter,
) -> Result<i32> {
    let mut reporter_builder = ReporterBuilder::default();
    reporter_builder
        .set_message_format(message_format.into())
        .set_colorize(output.color.should_colorize(Stream::Stderr));
    let (stdout, stderr) = output_writer.split();

    // Everything up to the first dispatched test is setup.
    let config = match config_opts.make_config() {
        Ok(config) => config,
        Err(err) => return Err(report_setup_failure(&reporter_builder, stdout, stderr, err)),
    };
    let (profile, test_list, executor) = match prepare_run(&config, config_opts, selection) {
        Ok(prepared) => prepared,
        Err(err) => return Err(report_setup_failure(&reporter_builder, stdout, stderr, err)),
    };

    let mut reporter = reporter_builder.build(profile.junit(), stdout, stderr);
    let mut runner_builder = TestRunnerBuilder::default();
    runner_builder.set_executor_config(&profile.executor());
    let runner = runner_builder.build(&test_list, executor);

    let results = runner.try_execute(|event| reporter.report_event(&event))?;
    let stats = results.stats();

    if stats.initial_run_count == 0 {
        match no_tests {
            NoTestsBehavior::Pass => {}
            NoTestsBehavior::Warn => warn!("no tests to run"),
            NoTestsBehavior::Fail => return Err(ExpectedError::NoTestsRun),
        }
    } else if !stats.is_success() {
        return Err(ExpectedError::TestRunFailed);
    }
    Ok(DevtestExitCode::OK)
}

fn prepare_run<'cfg>(
    config: &'cfg DevtestConfig,
    config_opts: &ConfigOpts,
    selection: &TestSelectionOpts,
) -> Result<(DevtestProfile<'cfg>, TestList, CommandExecutor)> {
    let profile = config.profile(config_opts.profile_name())?;
    let test_list = selection.compute_test_list(&profile, config.root())?;
    let executor = CommandExecutor::from_profile(&profile, config.root())?;
    Ok((profile, test_list, executor))
}

fn report_setup_failure(
    reporter_builder: &ReporterBuilder,
    stdout: OutputStream<'_>,
    stderr: OutputStream<'_>,
    err: ExpectedError,
) -> ExpectedError {
    let mut reporter = reporter_builder.build(None, stdout, stderr);
    if let Err(write_err) = reporter.report_setup_failure(&err.setup_failure_text()) {
        warn!(
            "failed to report setup failure: {}",
            DisplayErrorChain::new(&write_err)
        );
    }
    ExpectedError::run_setup_failed(err)
}
