// Copyright (c) The xctest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The top-level entry point tying discovery, watching and execution together.

use crate::{
    config::XcTestConfig,
    discovery::SourceScanner,
    errors::WatchError,
    planner::Selection,
    reporter::RunEvent,
    runner::{ProcessCommandRunner, RunOutcome, TestCommandRunner, TestRunner},
    signal::CancelFlag,
    target_resolver::TargetResolver,
    tree::TestTree,
    watch::{ChangeBatch, TestWatcher},
};

/// Owns the test tree for a workspace and everything needed to refresh and run it.
///
/// The tree is empty until [`rescan`](Self::rescan) is called.
#[derive(Debug)]
pub struct TestExplorer {
    config: XcTestConfig,
    tree: TestTree,
    scanner: SourceScanner,
    resolver: TargetResolver,
    command_runner: Box<dyn TestCommandRunner>,
}

impl TestExplorer {
    /// Creates an explorer that scans, resolves and runs tests as `config` describes.
    pub fn new(config: XcTestConfig) -> Self {
        let scanner = SourceScanner::from_config(&config);
        let resolver = TargetResolver::from_config(config.resolution());
        Self::with_components(config, scanner, resolver, Box::new(ProcessCommandRunner))
    }

    /// Creates an explorer with explicit components.
    pub fn with_components(
        config: XcTestConfig,
        scanner: SourceScanner,
        resolver: TargetResolver,
        command_runner: Box<dyn TestCommandRunner>,
    ) -> Self {
        Self {
            config,
            tree: TestTree::new(),
            scanner,
            resolver,
            command_runner,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &XcTestConfig {
        &self.config
    }

    /// Returns the current test tree.
    pub fn tree(&self) -> &TestTree {
        &self.tree
    }

    /// Rebuilds the tree from a full scan of the test root.
    pub async fn rescan(&mut self) -> &TestTree {
        let discovery = self.scanner.scan().await;
        self.tree.replace_all(&discovery);
        tracing::debug!(
            tests = self.tree.test_count(),
            classes = self.tree.class_count(),
            "rebuilt test tree",
        );
        &self.tree
    }

    /// Applies a batch of file changes to the tree.
    ///
    /// Modified files are rescanned individually. Structural changes and manifest changes
    /// rebuild the whole tree, and manifest changes also forget every resolved build target.
    pub async fn apply_changes(&mut self, batch: &ChangeBatch) -> &TestTree {
        if batch.manifest_changed {
            self.resolver.clear_cache();
        }
        if batch.structural || batch.manifest_changed {
            return self.rescan().await;
        }

        for file in &batch.modified {
            let classes = self.scanner.scan_file(file).await;
            self.tree.apply_document_update(file, &classes);
        }
        &self.tree
    }

    /// Starts watching the test root.
    pub fn watcher(&self) -> Result<TestWatcher, WatchError> {
        TestWatcher::new(
            self.scanner.clone(),
            self.config.resolution().manifest_file.clone(),
        )
    }

    /// Runs `selection`, reporting progress to `callback`.
    ///
    /// The build tool is started in the workspace root. Build targets resolved along the way are
    /// remembered on the tree.
    pub async fn run<F>(
        &mut self,
        selection: &Selection,
        cancel: &CancelFlag,
        callback: F,
    ) -> RunOutcome
    where
        F: FnMut(RunEvent),
    {
        let mut runner = TestRunner::new(
            &mut self.tree,
            &self.resolver,
            self.config.execution(),
            self.config.workspace_root(),
            self.command_runner.as_ref(),
        );
        runner.execute(selection, cancel, callback).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::TestId;
    use camino::Utf8PathBuf;
    use camino_tempfile::{Utf8TempDir, tempdir};
    use indoc::indoc;
    use std::collections::BTreeSet;

    const FOO: &str = indoc! {"
        import XCTest

        final class FooTests: XCTestCase {
            func testOne() {}
        }
    "};

    fn setup() -> (Utf8TempDir, TestExplorer) {
        let dir = tempdir().unwrap();
        let category = dir.path().join("Auth/Unit");
        std::fs::create_dir_all(&category).unwrap();
        std::fs::write(category.join("FooTests.swift"), FOO).unwrap();
        let explorer = TestExplorer::new(XcTestConfig::default_config(dir.path()));
        (dir, explorer)
    }

    #[tokio::test]
    async fn rescan_and_document_update() {
        let (dir, mut explorer) = setup();
        assert!(explorer.tree().is_empty());
        assert_eq!(explorer.rescan().await.test_count(), 1);

        let file = dir.path().join("Auth/Unit/FooTests.swift");
        std::fs::write(
            &file,
            FOO.replace("func testOne() {}", "func testOne() {}\n    func testTwo() {}"),
        )
        .unwrap();
        let batch = ChangeBatch {
            modified: BTreeSet::from([file.clone()]),
            ..Default::default()
        };
        let tree = explorer.apply_changes(&batch).await;
        assert!(tree.contains(&TestId::new("Auth:Unit:FooTests.testTwo")));
        assert_eq!(tree.test_count(), 2);

        std::fs::remove_file(&file).unwrap();
        let tree = explorer.apply_changes(&batch).await;
        assert!(tree.is_empty());
    }

    #[tokio::test]
    async fn structural_changes_rescan() {
        let (dir, mut explorer) = setup();
        explorer.rescan().await;

        let other = dir.path().join("Auth/Unit/BarTests.swift");
        std::fs::write(&other, FOO.replace("FooTests", "BarTests")).unwrap();
        let batch = ChangeBatch {
            modified: BTreeSet::<Utf8PathBuf>::new(),
            structural: true,
            manifest_changed: false,
        };
        assert_eq!(explorer.apply_changes(&batch).await.class_count(), 2);
    }
}
