// Copyright (c) The xctest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{Correlation, InlineError, RunContext};
use crate::{reporter::TestFailure, tree::TestId};
use regex::{Captures, Regex};
use std::time::Duration;

/// A state transition produced by a line of build tool output.
#[derive(Clone, Debug, PartialEq)]
pub enum ParseEvent {
    /// A test started.
    Started {
        /// The method node.
        id: TestId,
    },

    /// A test passed.
    Passed {
        /// The method node.
        id: TestId,

        /// The duration reported by the build tool.
        duration: Option<Duration>,
    },

    /// A test failed.
    Failed {
        /// The method node.
        id: TestId,

        /// The duration reported by the build tool.
        duration: Option<Duration>,

        /// The inline error recorded for this test, or a generic message.
        failure: TestFailure,
    },
}

impl ParseEvent {
    /// Returns the id of the test this event is about.
    pub fn id(&self) -> &TestId {
        match self {
            Self::Started { id } | Self::Passed { id, .. } | Self::Failed { id, .. } => id,
        }
    }
}

/// Parses build tool output one line at a time.
///
/// Three kinds of lines are recognized; everything else is ignored.
///
/// * Simulator status lines:
///   `Test case 'FooTests.testBar()' passed on 'iPhone 15' (0.010 seconds)`
/// * Desktop status lines:
///   `Test Case '-[MyTargetTests.FooTests testBar]' failed (0.020 seconds).`
/// * Inline errors, which precede the status line of the failing test:
///   `/path/FooTests.swift:10: error: -[MyTargetTests.FooTests testBar] : XCTAssertEqual failed`
#[derive(Clone, Debug)]
pub struct OutputParser {
    mobile: Regex,
    desktop: Regex,
    inline_error: Regex,
}

impl Default for OutputParser {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputParser {
    /// Creates a new parser.
    pub fn new() -> Self {
        Self {
            mobile: Regex::new(
                r"^\s*Test case '(?P<qualified>[^'()]+)\(\)' (?P<status>started|passed|failed)(?: on '[^']*')?(?: \((?P<duration>[0-9.]+) seconds\))?",
            )
            .expect("mobile regex is valid"),
            desktop: Regex::new(
                r"^\s*Test Case '-\[(?P<qualified>\S+) (?P<method>[^\]\s]+)\]' (?P<status>started|passed|failed)(?: \((?P<duration>[0-9.]+) seconds\))?",
            )
            .expect("desktop regex is valid"),
            inline_error: Regex::new(
                r"^\s*(?P<file>.+?):(?P<line>\d+): error: -\[(?P<qualified>\S+) (?P<method>[^\]\s]+)\] : (?P<message>.*)$",
            )
            .expect("inline error regex is valid"),
        }
    }

    /// Consumes a single line of output, updating `cx`.
    ///
    /// Returns the resulting state transition, if any. Lines must be fed in the order the build
    /// tool produced them, since inline errors are attached to the next failure of the same test.
    pub fn consume_line(&self, line: &str, cx: &mut RunContext) -> Option<ParseEvent> {
        let line = line.trim_end_matches(['\r', '\n']);

        if let Some(captures) = self.mobile.captures(line) {
            // `Module.Class.method`: the method follows the last dot.
            let qualified = &captures["qualified"];
            let (class_path, method) = match qualified.rsplit_once('.') {
                Some((class_path, method)) => (Some(class_path), method),
                None => (None, qualified),
            };
            let class_name = class_path.map(last_component);
            return self.apply_status(&captures, class_name, method, line, cx);
        }

        if let Some(captures) = self.desktop.captures(line) {
            // `Target.Class`: the class follows the last dot.
            let class_name = last_component(&captures["qualified"]);
            let method = &captures["method"];
            return self.apply_status(&captures, Some(class_name), method, line, cx);
        }

        if let Some(captures) = self.inline_error.captures(line) {
            let class_name = last_component(&captures["qualified"]);
            let id = correlate(cx, Some(class_name), &captures["method"], line)?;
            let line_number = captures["line"].parse().ok()?;
            cx.mark_output_seen();
            cx.record_inline_error(
                id,
                InlineError {
                    file: captures["file"].into(),
                    line: line_number,
                    message: captures["message"].to_owned(),
                },
            );
        }

        None
    }

    fn apply_status(
        &self,
        captures: &Captures<'_>,
        class_name: Option<&str>,
        method: &str,
        line: &str,
        cx: &mut RunContext,
    ) -> Option<ParseEvent> {
        let id = correlate(cx, class_name, method, line)?;
        cx.mark_output_seen();
        let duration = captures
            .name("duration")
            .and_then(|duration| duration.as_str().parse::<f64>().ok())
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok());

        match &captures["status"] {
            "started" => Some(ParseEvent::Started { id }),
            "passed" => {
                cx.mark_passed(&id);
                Some(ParseEvent::Passed { id, duration })
            }
            "failed" => {
                let failure = match cx.take_inline_error(&id) {
                    Some(error) => error.into_failure(),
                    None => TestFailure::generic(TestFailure::NO_DETAILS),
                };
                cx.mark_failed(&id);
                Some(ParseEvent::Failed {
                    id,
                    duration,
                    failure,
                })
            }
            _ => None,
        }
    }
}

fn correlate(
    cx: &RunContext,
    class_name: Option<&str>,
    method: &str,
    line: &str,
) -> Option<TestId> {
    match cx.correlate(class_name, method) {
        Correlation::Unique(id) => Some(id),
        Correlation::Ambiguous(count) => {
            tracing::debug!("ignoring output line matching {count} tests: {line}");
            None
        }
        Correlation::NotFound => {
            tracing::debug!("ignoring output line for a test outside this run: {line}");
            None
        }
    }
}

fn last_component(qualified: &str) -> &str {
    qualified
        .rsplit_once('.')
        .map_or(qualified, |(_, last)| last)
}
