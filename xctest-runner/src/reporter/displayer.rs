// Copyright (c) The xctest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prints out run events in a human-readable form.
//!
//! The main structure in this module is [`TestReporter`].

use super::{FailureLocation, RunEvent, RunEventKind, RunStatus, TestFailure};
use crate::{
    errors::WriteEventError,
    planner::{RunStrategy, SkipReason},
    runner::RunStats,
    tree::TestId,
};
use itertools::Itertools;
use owo_colors::{OwoColorize, Style};
use std::{
    fmt,
    io::{self, Write},
    time::Duration,
};
use xctest_metadata::TestNodeKind;

/// Builder for [`TestReporter`].
#[derive(Clone, Debug, Default)]
pub struct TestReporterBuilder {
    verbose: bool,
    colorize: bool,
}

impl TestReporterBuilder {
    /// Also print test starts, class roll-ups, and the build tool command line.
    pub fn set_verbose(&mut self, verbose: bool) -> &mut Self {
        self.verbose = verbose;
        self
    }

    /// Colorize output.
    pub fn set_colorize(&mut self, colorize: bool) -> &mut Self {
        self.colorize = colorize;
        self
    }

    /// Creates a new reporter.
    pub fn build(&self) -> TestReporter {
        let mut styles = Styles::default();
        if self.colorize {
            styles.colorize();
        }
        TestReporter {
            styles,
            verbose: self.verbose,
        }
    }
}

/// Writes run events to an output, one or more lines per event.
#[derive(Debug)]
pub struct TestReporter {
    styles: Styles,
    verbose: bool,
}

impl TestReporter {
    /// Writes a single event.
    pub fn report_event(
        &mut self,
        event: &RunEvent,
        mut writer: impl Write,
    ) -> Result<(), WriteEventError> {
        match &event.kind {
            RunEventKind::NodeSkipped { id, reason } => {
                self.write_skipped_node(id, *reason, &mut writer)?;
            }
            RunEventKind::RunStarted {
                strategy,
                selectors,
                test_count,
                command,
            } => {
                write!(writer, "{:>12} ", "Starting".style(self.styles.pass))?;
                let noun = if *test_count == 1 { "test" } else { "tests" };
                write!(
                    writer,
                    "{} {noun}",
                    test_count.style(self.styles.count)
                )?;
                match strategy {
                    RunStrategy::Single => {
                        if let Some(selector) = selectors.first() {
                            write!(writer, " in {}", selector.style(self.styles.selector))?;
                        }
                    }
                    RunStrategy::Batch => {
                        write!(
                            writer,
                            " across {} selectors",
                            selectors.len().style(self.styles.count)
                        )?;
                        if self.verbose {
                            write!(
                                writer,
                                ": {}",
                                selectors
                                    .iter()
                                    .map(|selector| selector.style(self.styles.selector))
                                    .join(", ")
                            )?;
                        }
                    }
                }
                writeln!(writer)?;
                if self.verbose {
                    writeln!(writer, "{:>12} {command}", "Command".style(self.styles.pass))?;
                }
            }
            RunEventKind::TestStarted { id } => {
                if self.verbose {
                    write!(writer, "{:>12} ", "START".style(self.styles.pass))?;
                    write_duration_column(None, &mut writer)?;
                    writeln!(writer, " {}", self.display_id(id))?;
                }
            }
            RunEventKind::TestFinished {
                id,
                status,
                duration,
                failure,
            } => {
                self.write_status_line(id, *status, *duration, &mut writer)?;
                if let Some(failure) = failure {
                    self.write_failure(failure, &mut writer)?;
                }
            }
            RunEventKind::NodeFinished { id, kind, status } => {
                if self.verbose {
                    self.write_node_finished(id, *kind, *status, &mut writer)?;
                }
            }
            RunEventKind::RunFinished { status, stats } => {
                self.write_summary(*status, stats, event.elapsed, &mut writer)?;
            }
        }
        Ok(())
    }

    fn write_skipped_node(
        &self,
        id: &TestId,
        reason: SkipReason,
        writer: &mut impl Write,
    ) -> Result<(), WriteEventError> {
        write!(writer, "{:>12} ", "SKIP".style(self.styles.skip))?;
        write_duration_column(None, writer)?;
        writeln!(writer, " {}: {reason}", self.display_id(id))?;
        Ok(())
    }

    fn write_status_line(
        &self,
        id: &TestId,
        status: RunStatus,
        duration: Option<Duration>,
        writer: &mut impl Write,
    ) -> Result<(), WriteEventError> {
        match status {
            RunStatus::Passed => write!(writer, "{:>12} ", "PASS".style(self.styles.pass))?,
            RunStatus::Failed => write!(writer, "{:>12} ", "FAIL".style(self.styles.fail))?,
            RunStatus::Skipped => write!(writer, "{:>12} ", "SKIP".style(self.styles.skip))?,
        }
        write_duration_column(duration, writer)?;
        writeln!(writer, " {}", self.display_id(id))?;
        Ok(())
    }

    fn write_failure(
        &self,
        failure: &TestFailure,
        writer: &mut impl Write,
    ) -> Result<(), WriteEventError> {
        write!(writer, "{:>12}", "")?;
        if let Some(FailureLocation { path, line }) = &failure.location {
            // Locations are stored zero-based.
            write!(
                writer,
                "{}: ",
                format!("{path}:{}", line + 1).style(self.styles.location)
            )?;
        }
        writeln!(writer, "{}", failure.message)?;
        Ok(())
    }

    fn write_node_finished(
        &self,
        id: &TestId,
        kind: TestNodeKind,
        status: RunStatus,
        writer: &mut impl Write,
    ) -> Result<(), WriteEventError> {
        let style = match status {
            RunStatus::Passed => self.styles.pass,
            RunStatus::Failed => self.styles.fail,
            RunStatus::Skipped => self.styles.skip,
        };
        writeln!(
            writer,
            "{:>12} {:>11} {}",
            status.as_str().style(style),
            kind.as_str(),
            id.style(self.styles.grouping),
        )?;
        Ok(())
    }

    fn write_summary(
        &self,
        status: RunStatus,
        stats: &RunStats,
        elapsed: Duration,
        writer: &mut impl Write,
    ) -> Result<(), WriteEventError> {
        writeln!(writer, "{}", "-".repeat(12))?;

        let summary_style = match status {
            RunStatus::Passed => self.styles.pass,
            RunStatus::Failed => self.styles.fail,
            RunStatus::Skipped => self.styles.skip,
        };
        write!(
            writer,
            "{:>12} {} ",
            "Summary".style(summary_style),
            DisplayBracketedDuration(elapsed),
        )?;
        write!(
            writer,
            "{}/{} tests run: {} passed",
            stats.finished_count().style(self.styles.count),
            stats.initial_run_count.style(self.styles.count),
            stats.passed.style(self.styles.pass),
        )?;
        if stats.failed > 0 {
            write!(writer, ", {} failed", stats.failed.style(self.styles.fail))?;
        }
        if stats.skipped > 0 {
            write!(writer, ", {} skipped", stats.skipped.style(self.styles.skip))?;
        }
        if stats.planning_skipped > 0 {
            write!(
                writer,
                ", {} not run",
                stats.planning_skipped.style(self.styles.skip)
            )?;
        }
        writeln!(writer)?;

        if stats.execution_failed {
            writeln!(
                writer,
                "{:>12} the test command failed before reporting any tests",
                "error:".style(self.styles.fail)
            )?;
        }
        if stats.cancelled {
            writeln!(writer, "{:>12} run cancelled", "note:".style(self.styles.skip))?;
        }
        Ok(())
    }

    fn display_id<'a>(&'a self, id: &'a TestId) -> DisplayTestId<'a> {
        DisplayTestId {
            id,
            styles: &self.styles,
        }
    }
}

/// Displays a method id as `grouping:Class.method`, with the class and method highlighted.
struct DisplayTestId<'a> {
    id: &'a TestId,
    styles: &'a Styles,
}

impl fmt::Display for DisplayTestId<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some((class, method)) = self.id.class_and_method() else {
            return write!(f, "{}", self.id.style(self.styles.grouping));
        };
        let prefix_len = self.id.as_str().len() - class.len() - method.len() - 1;
        write!(
            f,
            "{}{}.{}",
            (&self.id.as_str()[..prefix_len]).style(self.styles.grouping),
            class.style(self.styles.class_name),
            method.style(self.styles.method_name),
        )
    }
}

struct DisplayBracketedDuration(Duration);

impl fmt::Display for DisplayBracketedDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:>8.3?}s]", self.0.as_secs_f64())
    }
}

/// Writes a bracketed duration, or blank space of the same width so that ids line up.
fn write_duration_column(duration: Option<Duration>, writer: &mut impl Write) -> io::Result<()> {
    match duration {
        Some(duration) => write!(writer, "{}", DisplayBracketedDuration(duration)),
        None => write!(writer, "{:11}", ""),
    }
}

#[derive(Clone, Debug, Default)]
struct Styles {
    count: Style,
    pass: Style,
    fail: Style,
    skip: Style,
    grouping: Style,
    class_name: Style,
    method_name: Style,
    selector: Style,
    location: Style,
}

impl Styles {
    fn colorize(&mut self) {
        self.count = Style::new().bold();
        self.pass = Style::new().green().bold();
        self.fail = Style::new().red().bold();
        self.skip = Style::new().yellow().bold();
        self.grouping = Style::new().magenta().bold();
        self.class_name = Style::new().cyan();
        self.method_name = Style::new().blue().bold();
        self.selector = Style::new().cyan();
        self.location = Style::new().bold();
    }
}
