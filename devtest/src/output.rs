// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Terminal output: log headings, color choices and the streams commands write to.

use clap::{Args, ValueEnum};
use owo_colors::{OwoColorize, Style, style};
use std::{
    fmt,
    io::{self, BufWriter, Write},
    sync::Once,
};
use tracing::{Event, Level, Subscriber, level_filters::LevelFilter, warn};
use tracing_subscriber::{
    Layer,
    filter::Targets,
    fmt::{FmtContext, FormatEvent, FormatFields, format::Writer},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
};

/// Log target for messages printed without an `error:`/`warning:` heading.
pub(crate) const NO_HEADING_TARGET: &str = "devtest::no_heading";

/// Overrides the log filter, in `tracing` target syntax: `info,devtest_runner=debug`.
const LOG_ENV: &str = "DEVTEST_LOG";

pub(crate) mod clap_styles {
    use clap::builder::{Styles, styling::AnsiColor};

    pub(crate) const fn style() -> Styles {
        let heading = AnsiColor::Green.on_default().bold();
        let literal = AnsiColor::Cyan.on_default().bold();
        Styles::styled()
            .header(heading)
            .usage(heading)
            .literal(literal)
            .placeholder(AnsiColor::Cyan.on_default())
            .error(AnsiColor::Red.on_default().bold())
            .valid(literal)
            .invalid(AnsiColor::Yellow.on_default().bold())
    }
}

#[derive(Copy, Clone, Debug, Args)]
#[must_use]
pub(crate) struct OutputOpts {
    /// Verbose output: debug logs, and skipped tests in listings
    #[arg(long, short, global = true, env = "DEVTEST_VERBOSE")]
    pub(crate) verbose: bool,

    /// Produce color output: auto, always, never
    #[arg(
        long,
        value_enum,
        default_value_t,
        hide_possible_values = true,
        global = true,
        value_name = "WHEN",
        env = "DEVTEST_COLOR"
    )]
    pub(crate) color: Color,
}

impl OutputOpts {
    /// Installs the logger and returns the settings commands render output with.
    pub(crate) fn init(self) -> OutputContext {
        let Self { verbose, color } = self;
        init_logging(
            verbose,
            color.should_colorize(supports_color::Stream::Stderr),
        );
        OutputContext { verbose, color }
    }
}

/// Output settings for an invocation.
#[derive(Copy, Clone, Debug)]
#[must_use]
pub struct OutputContext {
    pub(crate) verbose: bool,
    pub(crate) color: Color,
}

impl OutputContext {
    /// Returns the styles used to print errors to stderr.
    pub fn stderr_styles(&self) -> StderrStyles {
        if self.color.should_colorize(supports_color::Stream::Stderr) {
            StderrStyles {
                bold: style().bold(),
            }
        } else {
            StderrStyles::default()
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
#[must_use]
pub enum Color {
    /// Colorize if the stream supports it.
    #[default]
    Auto,
    /// Always colorize.
    Always,
    /// Never colorize.
    Never,
}

impl Color {
    pub(crate) fn should_colorize(self, stream: supports_color::Stream) -> bool {
        match self {
            Color::Auto => supports_color::on_cached(stream).is_some(),
            Color::Always => true,
            Color::Never => false,
        }
    }
}

static INIT_LOGGER: Once = Once::new();

fn init_logging(verbose: bool, colorize: bool) {
    INIT_LOGGER.call_once(|| {
        let default_targets = || {
            Targets::new().with_default(if verbose {
                LevelFilter::DEBUG
            } else {
                LevelFilter::INFO
            })
        };
        let (targets, rejected) = match std::env::var(LOG_ENV) {
            Ok(spec) if !spec.is_empty() => match spec.parse::<Targets>() {
                Ok(targets) => (targets, None),
                Err(err) => (default_targets(), Some(format!("`{spec}`: {err}"))),
            },
            _ => (default_targets(), None),
        };

        let layer = tracing_subscriber::fmt::layer()
            .event_format(HeadingFormat::new(colorize))
            .with_writer(io::stderr)
            .with_filter(targets);
        tracing_subscriber::registry().with(layer).init();

        if let Some(rejected) = rejected {
            warn!("ignoring {LOG_ENV} {rejected}");
        }
    });
}

/// Prints each event as `level: message`, the way compiler diagnostics look.
struct HeadingFormat {
    error: Style,
    warning: Style,
    info: Style,
    detail: Style,
}

impl HeadingFormat {
    fn new(colorize: bool) -> Self {
        if colorize {
            Self {
                error: style().red().bold(),
                warning: style().yellow().bold(),
                info: style().bold(),
                detail: style().dimmed(),
            }
        } else {
            Self {
                error: Style::new(),
                warning: Style::new(),
                info: Style::new(),
                detail: Style::new(),
            }
        }
    }

    fn heading(&self, level: Level) -> (&'static str, Style) {
        match level {
            Level::ERROR => ("error", self.error),
            Level::WARN => ("warning", self.warning),
            Level::INFO => ("info", self.info),
            Level::DEBUG => ("debug", self.detail),
            Level::TRACE => ("trace", self.detail),
        }
    }
}

impl<S, N> FormatEvent<S, N> for HeadingFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        if metadata.target() != NO_HEADING_TARGET {
            let (heading, style) = self.heading(*metadata.level());
            write!(writer, "{}: ", heading.style(style))?;
        }
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Styles used when printing errors to stderr.
#[derive(Debug, Default)]
pub struct StderrStyles {
    pub(crate) bold: Style,
}

/// A stream a command writes its output to.
pub(crate) type OutputStream<'a> = Box<dyn Write + 'a>;

/// Where command output goes.
#[derive(Default)]
pub enum OutputWriter {
    /// The process's stdout and stderr.
    #[default]
    Terminal,
    /// In-memory buffers, for tests.
    #[cfg(test)]
    Captured {
        /// Captured stdout.
        stdout: Vec<u8>,
        /// Captured stderr.
        stderr: Vec<u8>,
    },
}

impl OutputWriter {
    /// Returns the stdout and stderr streams, which can be written to at the same time.
    pub(crate) fn split(&mut self) -> (OutputStream<'_>, OutputStream<'_>) {
        match self {
            Self::Terminal => (
                Box::new(BufWriter::new(io::stdout())),
                Box::new(BufWriter::new(io::stderr())),
            ),
            #[cfg(test)]
            Self::Captured { stdout, stderr } => (Box::new(stdout), Box::new(stderr)),
        }
    }
}
