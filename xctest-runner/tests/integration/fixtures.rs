// Copyright (c) The xctest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use async_trait::async_trait;
use camino_tempfile::{Utf8TempDir, tempdir};
use indoc::indoc;
use std::{cell::RefCell, rc::Rc};
use xctest_runner::{
    config::XcTestConfig,
    discovery::SourceScanner,
    errors::ExecuteError,
    explorer::TestExplorer,
    reporter::{RunEvent, RunEventKind},
    runner::{CommandExit, CommandSpec, TestCommandRunner},
    signal::CancelFlag,
    target_resolver::TargetResolver,
};

pub(crate) const FOO_TESTS: &str = indoc! {"
    import XCTest
    @testable import App

    final class FooTests: XCTestCase {
        func testA() {
            XCTAssertTrue(true)
        }

        func testB() {
            XCTAssertTrue(false)
        }

        func helper() {}
    }
"};

pub(crate) const BAR_TESTS: &str = indoc! {"
    import XCTest

    class BarTests: XCTestCase {
        func testC() {}
    }
"};

/// Lays out a workspace with a single category, `Tests:AppTests`.
pub(crate) fn workspace() -> Utf8TempDir {
    let dir = tempdir().expect("created temp dir");
    let category = dir.path().join("Tests/AppTests");
    std::fs::create_dir_all(&category).expect("created category dir");
    std::fs::write(category.join("FooTests.swift"), FOO_TESTS).expect("wrote FooTests");
    std::fs::write(category.join("BarTests.swift"), BAR_TESTS).expect("wrote BarTests");
    dir
}

/// A command runner that replays canned output instead of spawning the build tool.
#[derive(Debug)]
pub(crate) struct ScriptedCommandRunner {
    lines: Vec<String>,
    exit: ScriptedExit,
    invocations: Rc<RefCell<Vec<CommandSpec>>>,
    cancel_after: Option<(usize, CancelFlag)>,
}

#[derive(Clone, Copy, Debug)]
enum ScriptedExit {
    Code(i32),
    SpawnFailure,
}

impl ScriptedCommandRunner {
    pub(crate) fn new(lines: &[&str], code: i32) -> Self {
        Self {
            lines: lines.iter().map(|line| (*line).to_owned()).collect(),
            exit: ScriptedExit::Code(code),
            invocations: Rc::default(),
            cancel_after: None,
        }
    }

    pub(crate) fn spawn_failure() -> Self {
        Self {
            lines: Vec::new(),
            exit: ScriptedExit::SpawnFailure,
            invocations: Rc::default(),
            cancel_after: None,
        }
    }

    /// Sets `cancel` once `lines` lines of output have been replayed, as Ctrl-C would.
    pub(crate) fn cancel_after(mut self, lines: usize, cancel: CancelFlag) -> Self {
        self.cancel_after = Some((lines, cancel));
        self
    }

    pub(crate) fn invocations(&self) -> Rc<RefCell<Vec<CommandSpec>>> {
        self.invocations.clone()
    }
}

#[async_trait(?Send)]
impl TestCommandRunner for ScriptedCommandRunner {
    async fn run(
        &self,
        command: &CommandSpec,
        on_line: &mut dyn for<'a> FnMut(&'a str),
    ) -> Result<CommandExit, ExecuteError> {
        self.invocations.borrow_mut().push(command.clone());
        for (index, line) in self.lines.iter().enumerate() {
            if let Some((after, cancel)) = &self.cancel_after {
                if index == *after {
                    cancel.cancel();
                }
            }
            on_line(line);
        }
        match self.exit {
            ScriptedExit::Code(code) => Ok(CommandExit { code: Some(code) }),
            ScriptedExit::SpawnFailure => Err(ExecuteError::Spawn {
                command: command.to_shell_string(),
                error: std::io::ErrorKind::NotFound.into(),
            }),
        }
    }
}

pub(crate) fn explorer(dir: &Utf8TempDir, runner: ScriptedCommandRunner) -> TestExplorer {
    let mut config = XcTestConfig::default_config(dir.path());
    config.execution_mut().scheme = Some("App".to_owned());
    let scanner = SourceScanner::from_config(&config);
    let resolver = TargetResolver::from_config(config.resolution());
    TestExplorer::with_components(config, scanner, resolver, Box::new(runner))
}

/// Renders events as short strings, leaving out timings.
pub(crate) fn describe(event: &RunEvent) -> String {
    match &event.kind {
        RunEventKind::NodeSkipped { id, reason } => format!("skip-node {id}: {reason}"),
        RunEventKind::RunStarted { selectors, .. } => {
            let selectors: Vec<_> = selectors.iter().map(ToString::to_string).collect();
            format!("run-started {}", selectors.join(" "))
        }
        RunEventKind::TestStarted { id } => format!("start {id}"),
        RunEventKind::TestFinished { id, status, .. } => format!("{status} {id}"),
        RunEventKind::NodeFinished { id, status, .. } => format!("node-{status} {id}"),
        RunEventKind::RunFinished { status, .. } => format!("run-{status}"),
    }
}
