// Copyright (c) The xctest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use pretty_assertions::assert_eq;
use xctest_runner::{
    planner::{Selection, SkipReason},
    reporter::{FailureLocation, RunEvent, RunEventKind, RunStatus, TestFailure},
    signal::CancelFlag,
    tree::TestId,
};

const PASS_A: &str = "Test Case '-[AppTests.FooTests testA]' passed (0.010 seconds).";
const START_A: &str = "Test Case '-[AppTests.FooTests testA]' started.";
const ERROR_B: &str =
    "/src/FooTests.swift:12: error: -[AppTests.FooTests testB] : XCTAssertTrue failed";
const FAIL_B: &str = "Test Case '-[AppTests.FooTests testB]' failed (0.020 seconds).";

#[tokio::test]
async fn run_everything() {
    let dir = workspace();
    let runner = ScriptedCommandRunner::new(
        &[
            "Command line invocation:",
            START_A,
            PASS_A,
            ERROR_B,
            FAIL_B,
            "** TEST FAILED **",
        ],
        65,
    );
    let invocations = runner.invocations();
    let mut explorer = explorer(&dir, runner);
    assert_eq!(explorer.rescan().await.test_count(), 3);

    let mut events: Vec<RunEvent> = Vec::new();
    let outcome = explorer
        .run(&Selection::Everything, &CancelFlag::new(), |event| {
            events.push(event)
        })
        .await;

    assert_eq!(
        events.iter().map(describe).collect::<Vec<_>>(),
        vec![
            "run-started AppTests",
            "start Tests:AppTests:FooTests.testA",
            "passed Tests:AppTests:FooTests.testA",
            "failed Tests:AppTests:FooTests.testB",
            "skipped Tests:AppTests:BarTests.testC",
            "node-skipped Tests:AppTests:BarTests",
            "node-failed Tests:AppTests:FooTests",
            "node-failed Tests:AppTests",
            "run-failed",
        ]
    );

    let failure = events.iter().find_map(|event| match &event.kind {
        RunEventKind::TestFinished { failure, .. } => failure.clone(),
        _ => None,
    });
    assert_eq!(
        failure,
        Some(TestFailure {
            message: "XCTAssertTrue failed".to_owned(),
            location: Some(FailureLocation {
                path: "/src/FooTests.swift".into(),
                line: 11,
            }),
        })
    );

    assert_eq!(outcome.status, Some(RunStatus::Failed));
    assert_eq!(
        (
            outcome.stats.initial_run_count,
            outcome.stats.passed,
            outcome.stats.failed,
            outcome.stats.skipped
        ),
        (3, 1, 1, 1)
    );
    assert!(!outcome.stats.execution_failed);

    let invocations = invocations.borrow();
    assert_eq!(invocations.len(), 1);
    assert_eq!(
        invocations[0].args,
        vec!["test", "-scheme", "App", "-only-testing:AppTests"]
    );
    assert_eq!(invocations[0].cwd.as_path(), dir.path());
}

#[tokio::test]
async fn run_selection_skips_what_cannot_run() {
    let dir = workspace();
    let pass_b = FAIL_B.replace("failed", "passed");
    let runner = ScriptedCommandRunner::new(&[PASS_A, pass_b.as_str()], 0);
    let invocations = runner.invocations();
    let mut explorer = explorer(&dir, runner);
    explorer.rescan().await;

    // `Tests` is a bare domain, so it isn't runnable, and the ids below it still are.
    let selection = Selection::Ids(vec![
        TestId::new("Tests"),
        TestId::new("Tests:AppTests:MissingTests"),
        TestId::new("Tests:AppTests:FooTests.testA"),
        TestId::new("Tests:AppTests:FooTests"),
    ]);
    let mut skipped = Vec::new();
    let outcome = explorer
        .run(&selection, &CancelFlag::new(), |event| {
            if let RunEventKind::NodeSkipped { id, reason } = event.kind {
                skipped.push((id, reason));
            }
        })
        .await;

    assert_eq!(
        skipped,
        vec![
            (TestId::new("Tests"), SkipReason::NotRunnable),
            (TestId::new("Tests:AppTests:MissingTests"), SkipReason::NotFound),
        ]
    );
    assert_eq!(outcome.status, Some(RunStatus::Passed));
    assert_eq!(outcome.stats.planning_skipped, 2);
    assert_eq!(
        invocations.borrow()[0].args.last().map(String::as_str),
        Some("-only-testing:AppTests/FooTests")
    );

    let class = explorer
        .tree()
        .lookup(&TestId::new("Tests:AppTests:FooTests"))
        .expect("class is in the tree");
    assert_eq!(class.resolved_target(), Some("AppTests"));
}

#[tokio::test]
async fn spawn_failure_fails_every_test() {
    let dir = workspace();
    let mut explorer = explorer(&dir, ScriptedCommandRunner::spawn_failure());
    explorer.rescan().await;

    let mut failures = Vec::new();
    let outcome = explorer
        .run(
            &Selection::Ids(vec![TestId::new("Tests:AppTests:FooTests.testA")]),
            &CancelFlag::new(),
            |event| {
                if let RunEventKind::TestFinished {
                    id,
                    status,
                    failure,
                    ..
                } = event.kind
                {
                    failures.push((id, status, failure.map(|failure| failure.message)));
                }
            },
        )
        .await;

    assert_eq!(
        failures,
        vec![(
            TestId::new("Tests:AppTests:FooTests.testA"),
            RunStatus::Failed,
            Some(TestFailure::EXECUTION_FAILED.to_owned()),
        )]
    );
    assert_eq!(outcome.status, Some(RunStatus::Failed));
    assert!(outcome.stats.execution_failed);
}

#[tokio::test]
async fn cancelled_while_running_skips_unreported_tests() {
    let dir = workspace();
    let cancel = CancelFlag::new();
    // The build tool is interrupted before it reports any tests, and exits with an error.
    let runner = ScriptedCommandRunner::new(
        &["Command line invocation:", "** TEST INTERRUPTED **"],
        65,
    )
    .cancel_after(1, cancel.clone());
    let invocations = runner.invocations();
    let mut explorer = explorer(&dir, runner);
    explorer.rescan().await;

    let mut events = Vec::new();
    let outcome = explorer
        .run(&Selection::Everything, &cancel, |event| events.push(event))
        .await;

    assert_eq!(
        events.iter().map(describe).collect::<Vec<_>>(),
        vec![
            "run-started AppTests",
            "skipped Tests:AppTests:BarTests.testC",
            "skipped Tests:AppTests:FooTests.testA",
            "skipped Tests:AppTests:FooTests.testB",
            "node-skipped Tests:AppTests:BarTests",
            "node-skipped Tests:AppTests:FooTests",
            "node-skipped Tests:AppTests",
            "run-skipped",
        ]
    );
    assert_eq!(outcome.status, Some(RunStatus::Skipped));
    assert!(outcome.stats.cancelled);
    assert!(!outcome.stats.execution_failed);
    assert_eq!(outcome.stats.failed, 0);
    assert_eq!(invocations.borrow().len(), 1);
}

#[tokio::test]
async fn cancelled_before_start() {
    let dir = workspace();
    let runner = ScriptedCommandRunner::new(&[PASS_A], 0);
    let invocations = runner.invocations();
    let mut explorer = explorer(&dir, runner);
    explorer.rescan().await;

    let cancel = CancelFlag::new();
    cancel.cancel();
    let mut events = Vec::new();
    let outcome = explorer
        .run(&Selection::Everything, &cancel, |event| events.push(event))
        .await;

    assert_eq!(
        events.iter().map(describe).collect::<Vec<_>>(),
        vec!["skip-node Tests:AppTests: run cancelled"]
    );
    assert_eq!(outcome.status, None);
    assert!(outcome.stats.cancelled);
    assert!(invocations.borrow().is_empty());
}

#[tokio::test]
async fn empty_selection_is_a_no_op() {
    let dir = workspace();
    let mut explorer = explorer(&dir, ScriptedCommandRunner::new(&[], 0));
    explorer.rescan().await;

    let mut events = Vec::new();
    let outcome = explorer
        .run(&Selection::Ids(Vec::new()), &CancelFlag::new(), |event| {
            events.push(event)
        })
        .await;
    assert!(events.is_empty());
    assert_eq!(outcome.status, None);
}
