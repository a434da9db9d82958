// Copyright (c) The xctest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    planner::{RunStrategy, SkipReason, TestSelector},
    runner::RunStats,
    tree::TestId,
};
use camino::Utf8PathBuf;
use std::{fmt, time::Duration};
use xctest_metadata::TestNodeKind;

/// A run event.
///
/// Events are produced by a [`TestRunner`](crate::runner::TestRunner) and consumed by a
/// [`TestReporter`](crate::reporter::TestReporter), or any other callback.
#[derive(Clone, Debug)]
pub struct RunEvent {
    /// The amount of time elapsed since the start of the run.
    pub elapsed: Duration,

    /// The kind of run event this is.
    pub kind: RunEventKind,
}

/// The kind of run event this is.
///
/// Forms part of [`RunEvent`].
#[derive(Clone, Debug)]
pub enum RunEventKind {
    /// A selected node could not be run and was left out of the invocation.
    NodeSkipped {
        /// The node that was skipped.
        id: TestId,

        /// Why the node was skipped.
        reason: SkipReason,
    },

    /// The build tool is about to be invoked.
    RunStarted {
        /// Whether a single node or a batch of nodes is being run.
        strategy: RunStrategy,

        /// The selectors passed to the build tool.
        selectors: Vec<TestSelector>,

        /// The number of test methods expected to report a result.
        test_count: usize,

        /// The command line, for display.
        command: String,
    },

    /// A test method started.
    TestStarted {
        /// The method node.
        id: TestId,
    },

    /// A test method reached a final state.
    TestFinished {
        /// The method node.
        id: TestId,

        /// The final state.
        status: RunStatus,

        /// The duration reported by the build tool, if any.
        duration: Option<Duration>,

        /// Failure details, if the test failed.
        failure: Option<TestFailure>,
    },

    /// A class, or a node that was selected for the run, finished. Its status is rolled up from
    /// the methods below it.
    NodeFinished {
        /// The node.
        id: TestId,

        /// The kind of node.
        kind: TestNodeKind,

        /// The rolled-up status.
        status: RunStatus,
    },

    /// The run finished.
    RunFinished {
        /// The overall status of the run.
        status: RunStatus,

        /// Statistics for the run.
        stats: RunStats,
    },
}

/// The state a test or roll-up node ends a run in.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum RunStatus {
    /// Passed.
    Passed,

    /// Failed.
    Failed,

    /// Didn't report a result.
    Skipped,
}

impl RunStatus {
    /// Returns a string representation of this status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Details about why a test failed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TestFailure {
    /// The failure message.
    pub message: String,

    /// Where the failing assertion is, if the build tool reported it.
    pub location: Option<FailureLocation>,
}

impl TestFailure {
    /// The message used when a test failed but no details could be extracted from the output.
    pub const NO_DETAILS: &'static str = "failed, no details extracted";

    /// The message used when the build tool failed before a test reported a result.
    pub const EXECUTION_FAILED: &'static str =
        "the test command failed before this test reported a result";

    pub(crate) fn generic(message: &str) -> Self {
        Self {
            message: message.to_owned(),
            location: None,
        }
    }
}

/// A location within a source file. The line is zero-based.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FailureLocation {
    /// The source file.
    pub path: Utf8PathBuf,

    /// The zero-based line.
    pub line: usize,
}
