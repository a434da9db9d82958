// Copyright (c) The xctest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use clap::{Args, ValueEnum};
use owo_colors::{OwoColorize, Style, style};
use std::{
    fmt,
    io::{self, BufWriter, Write},
    sync::Once,
};
use tracing::{
    Event, Level, Subscriber,
    field::{Field, Visit},
    level_filters::LevelFilter,
};
use tracing_subscriber::{
    Layer,
    filter::Targets,
    fmt::{FmtContext, FormatEvent, FormatFields, format},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
};

/// Log lines sent to this target are printed without a level prefix.
pub(crate) const NO_HEADING: &str = "xctest::no_heading";

/// The environment variable holding the log filter, e.g. `xctest_runner=debug`.
const LOG_ENV: &str = "XCTEST_LOG";

#[derive(Copy, Clone, Debug, Args)]
#[must_use]
pub(crate) struct OutputOpts {
    /// Verbose output
    #[arg(long, short, global = true, env = "XCTEST_VERBOSE")]
    pub(crate) verbose: bool,

    /// Produce color output: auto, always, never
    #[arg(
        long,
        value_enum,
        default_value_t,
        hide_possible_values = true,
        global = true,
        value_name = "WHEN",
        env = "XCTEST_COLOR"
    )]
    pub(crate) color: Color,
}

impl OutputOpts {
    /// Installs the logger and returns the settings every command renders with.
    pub(crate) fn init(self) -> OutputContext {
        self.color.init();
        OutputContext {
            verbose: self.verbose,
            color: self.color,
        }
    }
}

/// Output settings shared by every command.
#[derive(Copy, Clone, Debug)]
#[must_use]
pub struct OutputContext {
    pub(crate) verbose: bool,
    pub(crate) color: Color,
}

impl OutputContext {
    /// Returns styles for error messages printed to stderr.
    pub fn stderr_styles(&self) -> StderrStyles {
        if self.color.should_colorize(supports_color::Stream::Stderr) {
            StderrStyles::colorized()
        } else {
            StderrStyles::default()
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
#[must_use]
pub enum Color {
    /// Colorize if the stream is a terminal that supports it.
    #[default]
    Auto,
    /// Always colorize.
    Always,
    /// Never colorize.
    Never,
}

static INIT_LOGGER: Once = Once::new();

impl Color {
    pub(crate) fn init(self) {
        let colorize = self.should_colorize(supports_color::Stream::Stderr);
        INIT_LOGGER.call_once(|| {
            let layer = tracing_subscriber::fmt::layer()
                .event_format(LogFormatter { colorize })
                .with_writer(io::stderr)
                .with_filter(log_targets());
            tracing_subscriber::registry().with(layer).init();
        });
    }

    pub(crate) fn should_colorize(self, stream: supports_color::Stream) -> bool {
        match self {
            Color::Auto => supports_color::on_cached(stream).is_some(),
            Color::Always => true,
            Color::Never => false,
        }
    }
}

/// Reads the log filter from the environment, defaulting to `info`.
///
/// A filter that doesn't parse is reported once and ignored.
fn log_targets() -> Targets {
    let default = Targets::new().with_default(LevelFilter::INFO);
    match std::env::var(LOG_ENV) {
        Ok(filter) if !filter.is_empty() => filter.parse().unwrap_or_else(|error| {
            eprintln!("warning: ignoring invalid {LOG_ENV} `{filter}`: {error}");
            default
        }),
        _ => default,
    }
}

/// Prints each event as `level: message`, dropping fields and spans.
struct LogFormatter {
    colorize: bool,
}

impl LogFormatter {
    fn heading(&self, level: Level) -> (&'static str, Style) {
        let (name, colored) = match level {
            Level::ERROR => ("error", style().red().bold()),
            Level::WARN => ("warning", style().yellow().bold()),
            Level::INFO => ("info", style().bold()),
            Level::DEBUG => ("debug", style().bold()),
            Level::TRACE => ("trace", style().dimmed()),
        };
        (name, if self.colorize { colored } else { Style::new() })
    }
}

impl<S, N> FormatEvent<S, N> for LogFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        if metadata.target() != NO_HEADING {
            let (name, style) = self.heading(*metadata.level());
            write!(writer, "{}: ", name.style(style))?;
        }

        let mut message = MessageField {
            writer: &mut writer,
            result: Ok(()),
        };
        event.record(&mut message);
        message.result?;

        writeln!(writer)
    }
}

/// Writes out the `message` field of an event and ignores the rest.
struct MessageField<'a, 'writer> {
    writer: &'a mut format::Writer<'writer>,
    result: fmt::Result,
}

impl Visit for MessageField<'_, '_> {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" && self.result.is_ok() {
            self.result = write!(self.writer, "{value:?}");
        }
    }
}

/// Styles for error messages printed to stderr.
#[derive(Debug, Default)]
pub struct StderrStyles {
    pub(crate) bold: Style,
    pub(crate) warning_text: Style,
}

impl StderrStyles {
    fn colorized() -> Self {
        Self {
            bold: style().bold(),
            warning_text: style().yellow(),
        }
    }
}

/// Where command output goes.
#[derive(Debug, Default)]
pub enum OutputWriter {
    /// The process's stdout and stderr.
    #[default]
    Normal,

    /// In-memory buffers, for tests.
    #[cfg(test)]
    Test {
        /// Everything written to stdout.
        stdout: Vec<u8>,

        /// Everything written to stderr.
        stderr: Vec<u8>,
    },
}

impl OutputWriter {
    /// Returns a buffered writer for command output, such as test lists.
    pub(crate) fn stdout_writer(&mut self) -> Box<dyn Write + '_> {
        match self {
            Self::Normal => Box::new(BufWriter::new(io::stdout())),
            #[cfg(test)]
            Self::Test { stdout, .. } => Box::new(stdout),
        }
    }

    /// Returns a buffered writer for progress output, such as run events.
    pub(crate) fn stderr_writer(&mut self) -> Box<dyn Write + '_> {
        match self {
            Self::Normal => Box::new(BufWriter::new(io::stderr())),
            #[cfg(test)]
            Self::Test { stderr, .. } => Box::new(stderr),
        }
    }
}
