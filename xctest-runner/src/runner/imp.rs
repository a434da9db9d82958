// Copyright (c) The xctest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{
    CommandSpec, OutputParser, ParseEvent, RunStats, TestCommandRunner,
    aggregator::{is_execution_failure, roll_ups, sweep_unprocessed},
};
use crate::{
    config::ExecutionConfig,
    errors::DisplayErrorChain,
    planner::{RunPlanner, Selection},
    reporter::{RunEvent, RunEventKind, RunStatus},
    signal::CancelFlag,
    target_resolver::TargetResolver,
    tree::TestTree,
};
use camino::Utf8Path;
use debug_ignore::DebugIgnore;
use std::{collections::VecDeque, time::Instant};

/// The number of trailing output lines kept around to explain an execution failure.
const OUTPUT_TAIL_LINES: usize = 20;

/// The result of [`TestRunner::execute`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RunOutcome {
    /// The overall status, or `None` if nothing was run: the selection was empty, nothing in it
    /// could be run, or the run was cancelled before the build tool was invoked.
    pub status: Option<RunStatus>,

    /// Statistics for the run.
    pub stats: RunStats,
}

/// Plans and executes runs against a test tree.
#[derive(Debug)]
pub struct TestRunner<'a> {
    tree: &'a mut TestTree,
    resolver: &'a TargetResolver,
    execution: &'a ExecutionConfig,
    cwd: &'a Utf8Path,
    command_runner: &'a dyn TestCommandRunner,
}

impl<'a> TestRunner<'a> {
    /// Creates a new runner.
    ///
    /// The build tool is started in `cwd`, typically the workspace root.
    pub fn new(
        tree: &'a mut TestTree,
        resolver: &'a TargetResolver,
        execution: &'a ExecutionConfig,
        cwd: &'a Utf8Path,
        command_runner: &'a dyn TestCommandRunner,
    ) -> Self {
        Self {
            tree,
            resolver,
            execution,
            cwd,
            command_runner,
        }
    }

    /// Runs `selection`, reporting progress to `callback`.
    ///
    /// Never fails: nodes that can't be run are reported with [`RunEventKind::NodeSkipped`], and
    /// build tool failures mark the affected tests as failed.
    pub async fn execute<F>(
        &mut self,
        selection: &Selection,
        cancel: &CancelFlag,
        callback: F,
    ) -> RunOutcome
    where
        F: FnMut(RunEvent),
    {
        let mut sink = EventSink::new(callback);

        let output = RunPlanner::new(&mut *self.tree, self.resolver)
            .plan(selection, cancel)
            .await;
        let planning_skipped = output.skipped.len();
        for (id, reason) in output.skipped {
            sink.emit(RunEventKind::NodeSkipped { id, reason });
        }

        let Some(plan) = output.plan else {
            return RunOutcome {
                status: None,
                stats: RunStats {
                    planning_skipped,
                    cancelled: output.cancelled,
                    ..Default::default()
                },
            };
        };

        let selectors = plan.selectors();
        let command = CommandSpec::for_selectors(self.execution, self.cwd, &selectors);
        sink.emit(RunEventKind::RunStarted {
            strategy: plan.strategy,
            selectors,
            test_count: plan.context.test_count(),
            command: command.to_shell_string(),
        });

        let mut cx = plan.context;
        let parser = OutputParser::new();
        let mut tail = VecDeque::with_capacity(OUTPUT_TAIL_LINES);
        let result = {
            let mut on_line = |line: &str| {
                tracing::trace!(target: "xctest::output", "{line}");
                if tail.len() == OUTPUT_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line.to_owned());

                if let Some(event) = parser.consume_line(line, &mut cx) {
                    sink.emit(event_kind(event));
                }
            };
            self.command_runner.run(&command, &mut on_line).await
        };

        let cancelled = cancel.is_cancelled();
        let execution_failed = is_execution_failure(&result, &cx) && !cancelled;
        if execution_failed {
            let tail = Vec::from(tail).join("\n");
            match &result {
                Ok(exit) => tracing::warn!(
                    "`{command}` exited with code {} before reporting any tests; \
                     last lines of output:\n{tail}",
                    exit.code.map_or_else(|| "(signal)".to_owned(), |code| code.to_string()),
                ),
                Err(error) => tracing::warn!("{}", DisplayErrorChain::new(error)),
            }
        }

        for swept in sweep_unprocessed(&mut cx, execution_failed, cancelled) {
            sink.emit(RunEventKind::TestFinished {
                id: swept.id,
                status: swept.status,
                duration: None,
                failure: swept.failure,
            });
        }

        for (id, kind, status) in roll_ups(&cx, &plan.nodes) {
            sink.emit(RunEventKind::NodeFinished { id, kind, status });
        }

        let status = cx.overall_status();
        let stats = RunStats {
            planning_skipped,
            execution_failed,
            cancelled,
            ..RunStats::from_context(&cx)
        };
        sink.emit(RunEventKind::RunFinished { status, stats });

        RunOutcome {
            status: Some(status),
            stats,
        }
    }
}

fn event_kind(event: ParseEvent) -> RunEventKind {
    match event {
        ParseEvent::Started { id } => RunEventKind::TestStarted { id },
        ParseEvent::Passed { id, duration } => RunEventKind::TestFinished {
            id,
            status: RunStatus::Passed,
            duration,
            failure: None,
        },
        ParseEvent::Failed {
            id,
            duration,
            failure,
        } => RunEventKind::TestFinished {
            id,
            status: RunStatus::Failed,
            duration,
            failure: Some(failure),
        },
    }
}

#[derive(Debug)]
struct EventSink<F> {
    start: Instant,
    callback: DebugIgnore<F>,
}

impl<F: FnMut(RunEvent)> EventSink<F> {
    fn new(callback: F) -> Self {
        Self {
            start: Instant::now(),
            callback: DebugIgnore(callback),
        }
    }

    fn emit(&mut self, kind: RunEventKind) {
        let event = RunEvent {
            elapsed: self.start.elapsed(),
            kind,
        };
        (self.callback.0)(event);
    }
}
