// Copyright (c) The xctest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Final bookkeeping once the build tool has exited.

use super::{CommandExit, RunContext};
use crate::{
    errors::ExecuteError,
    planner::PlannedNode,
    reporter::{RunStatus, TestFailure},
    tree::TestId,
};
use indexmap::IndexSet;
use xctest_metadata::TestNodeKind;

/// Statistics for a run.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RunStats {
    /// The number of test methods that were part of the invocation.
    pub initial_run_count: usize,

    /// The number of tests that passed.
    pub passed: usize,

    /// The number of tests that failed, including those marked failed because the build tool
    /// failed.
    pub failed: usize,

    /// The number of tests that never reported a result.
    pub skipped: usize,

    /// The number of selected nodes that were left out of the invocation.
    pub planning_skipped: usize,

    /// True if the build tool failed to run, or exited with an error before reporting any tests.
    pub execution_failed: bool,

    /// True if the run was cancelled.
    pub cancelled: bool,
}

impl RunStats {
    /// Computes statistics from a finished run context.
    pub(crate) fn from_context(cx: &RunContext) -> Self {
        let failed = cx.failed().len();
        let processed = cx.processed().len();
        Self {
            initial_run_count: cx.test_count(),
            passed: processed - failed,
            failed,
            skipped: cx.test_count() - processed,
            ..Default::default()
        }
    }

    /// Returns the number of tests that reached a final state.
    pub fn finished_count(&self) -> usize {
        self.passed + self.failed
    }

    /// Returns true if any test failed or the build tool could not run.
    pub fn has_failures(&self) -> bool {
        self.failed > 0 || self.execution_failed
    }
}

/// Returns true if the invocation as a whole failed: the build tool couldn't be run, or it exited
/// with an error before any test output was recognized.
pub(crate) fn is_execution_failure(
    result: &Result<CommandExit, ExecuteError>,
    cx: &RunContext,
) -> bool {
    match result {
        Ok(exit) => !exit.success() && !cx.saw_test_output(),
        Err(_) => true,
    }
}

/// A test that was given a final state by the sweep.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct SweptTest {
    pub(crate) id: TestId,
    pub(crate) status: RunStatus,
    pub(crate) failure: Option<TestFailure>,
}

/// Gives every leaf that hasn't reported a result a final state.
///
/// Normally such leaves are skipped. If the invocation failed they are marked as failed instead,
/// unless the run was cancelled.
pub(crate) fn sweep_unprocessed(
    cx: &mut RunContext,
    execution_failed: bool,
    cancelled: bool,
) -> Vec<SweptTest> {
    let unprocessed: Vec<TestId> = cx.unprocessed().map(|leaf| leaf.id.clone()).collect();
    let mark_failed = execution_failed && !cancelled;

    unprocessed
        .into_iter()
        .map(|id| {
            if mark_failed {
                cx.mark_failed(&id);
                SweptTest {
                    id,
                    status: RunStatus::Failed,
                    failure: Some(TestFailure::generic(TestFailure::EXECUTION_FAILED)),
                }
            } else {
                SweptTest {
                    id,
                    status: RunStatus::Skipped,
                    failure: None,
                }
            }
        })
        .collect()
}

/// Computes the status of a group of leaves: failed if any failed, passed if all passed, skipped
/// otherwise.
pub fn roll_up<'a>(cx: &RunContext, leaves: impl IntoIterator<Item = &'a TestId>) -> RunStatus {
    let mut all_passed = true;
    for id in leaves {
        match cx.status_of(id) {
            RunStatus::Failed => return RunStatus::Failed,
            RunStatus::Skipped => all_passed = false,
            RunStatus::Passed => {}
        }
    }
    if all_passed {
        RunStatus::Passed
    } else {
        RunStatus::Skipped
    }
}

/// Computes roll-up statuses for every class with a leaf in the run, followed by every planned
/// grouping node that isn't a class or method.
pub(crate) fn roll_ups(
    cx: &RunContext,
    planned: &[PlannedNode],
) -> Vec<(TestId, TestNodeKind, RunStatus)> {
    let classes: IndexSet<&TestId> = cx
        .method_nodes()
        .values()
        .map(|leaf| &leaf.class_id)
        .collect();

    let mut statuses: Vec<_> = classes
        .into_iter()
        .map(|class_id| {
            let leaves = cx
                .method_nodes()
                .values()
                .filter(|leaf| &leaf.class_id == class_id)
                .map(|leaf| &leaf.id);
            (class_id.clone(), TestNodeKind::Class, roll_up(cx, leaves))
        })
        .collect();

    for node in planned {
        if matches!(node.kind, TestNodeKind::Class | TestNodeKind::Method) {
            continue;
        }
        let leaves = cx
            .method_nodes()
            .keys()
            .filter(|id| node.id.is_ancestor_of(id));
        statuses.push((node.id.clone(), node.kind, roll_up(cx, leaves)));
    }

    statuses
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        planner::TestSelector,
        runner::{OutputParser, test_helpers::context},
    };
    use pretty_assertions::assert_eq;

    const A: &str = "D:C:FooTests.testA";
    const B: &str = "D:C:FooTests.testB";
    const C: &str = "D:C:BarTests.testC";

    fn run_lines(lines: &[&str]) -> RunContext {
        let parser = OutputParser::new();
        let mut cx = context(&[A, B, C]);
        for line in lines {
            parser.consume_line(line, &mut cx);
        }
        cx
    }

    #[test]
    fn only_one_passed() {
        let mut cx = run_lines(&["Test Case '-[App.FooTests testA]' passed (0.1 seconds)."]);
        let exit = Ok(CommandExit { code: Some(0) });
        assert!(!is_execution_failure(&exit, &cx));

        let swept = sweep_unprocessed(&mut cx, false, false);
        let swept: Vec<_> = swept.iter().map(|t| (t.id.as_str(), t.status)).collect();
        assert_eq!(swept, vec![(B, RunStatus::Skipped), (C, RunStatus::Skipped)]);
        assert_eq!(cx.status_of(&TestId::new(A)), RunStatus::Passed);
        assert_eq!(cx.overall_status(), RunStatus::Skipped);

        let stats = RunStats::from_context(&cx);
        assert_eq!((stats.passed, stats.failed, stats.skipped), (1, 0, 2));
    }

    #[test]
    fn failure_wins_regardless_of_order() {
        let pass_a = "Test Case '-[App.FooTests testA]' passed (0.1 seconds).";
        let fail_b = "Test Case '-[App.FooTests testB]' failed (0.1 seconds).";
        let pass_c = "Test Case '-[App.BarTests testC]' passed (0.1 seconds).";

        for lines in [
            [pass_a, fail_b, pass_c],
            [fail_b, pass_a, pass_c],
            [pass_c, pass_a, fail_b],
        ] {
            let mut cx = run_lines(&lines);
            assert!(sweep_unprocessed(&mut cx, false, false).is_empty());
            assert_eq!(cx.overall_status(), RunStatus::Failed);
        }
    }

    #[test]
    fn execution_failure_marks_unprocessed_failed() {
        let mut cx = run_lines(&["error: unable to find a destination matching the provided spec"]);
        let exit = Ok(CommandExit { code: Some(70) });
        assert!(is_execution_failure(&exit, &cx));

        let swept = sweep_unprocessed(&mut cx, true, false);
        assert!(swept.iter().all(|t| t.status == RunStatus::Failed));
        assert_eq!(
            swept[0].failure.as_ref().unwrap().message,
            TestFailure::EXECUTION_FAILED
        );
        assert_eq!(cx.failed().len(), 3);
        assert_eq!(cx.overall_status(), RunStatus::Failed);
    }

    #[test]
    fn cancellation_skips_instead_of_failing() {
        let mut cx = run_lines(&[]);
        let swept = sweep_unprocessed(&mut cx, true, true);
        assert!(swept.iter().all(|t| t.status == RunStatus::Skipped));
        assert_eq!(cx.overall_status(), RunStatus::Skipped);
    }

    #[test]
    fn non_zero_exit_with_test_output_is_not_an_execution_failure() {
        let cx = run_lines(&["Test Case '-[App.FooTests testB]' failed (0.1 seconds)."]);
        assert!(!is_execution_failure(&Ok(CommandExit { code: Some(65) }), &cx));
    }

    #[test]
    fn roll_up_classes_and_groupings() {
        let cx = run_lines(&[
            "Test Case '-[App.FooTests testA]' passed (0.1 seconds).",
            "Test Case '-[App.FooTests testB]' passed (0.1 seconds).",
        ]);
        let planned = vec![PlannedNode {
            id: TestId::new("D:C"),
            kind: TestNodeKind::Category,
            selector: TestSelector {
                build_target: "App".to_owned(),
                class_path: None,
                method_name: None,
            },
        }];

        assert_eq!(
            roll_ups(&cx, &planned),
            vec![
                (TestId::new("D:C:FooTests"), TestNodeKind::Class, RunStatus::Passed),
                (TestId::new("D:C:BarTests"), TestNodeKind::Class, RunStatus::Skipped),
                (TestId::new("D:C"), TestNodeKind::Category, RunStatus::Skipped),
            ]
        );
    }
}
