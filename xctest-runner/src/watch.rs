// Copyright (c) The xctest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Watching test sources for changes.
//!
//! [`TestWatcher`] turns raw file system events into debounced [`ChangeBatch`]es. Edits to an
//! existing source file are applied as document updates, while anything that changes which files
//! exist (creations, removals, renames) calls for a full rescan.

use crate::{discovery::SourceScanner, errors::WatchError};
use camino::{Utf8Path, Utf8PathBuf};
use debug_ignore::DebugIgnore;
use notify::{
    Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
    event::{CreateKind, ModifyKind, RemoveKind},
};
use std::{collections::BTreeSet, time::Duration};
use tokio::sync::mpsc;

/// Changes collected over one debounce window.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ChangeBatch {
    /// Source files whose contents changed.
    pub modified: BTreeSet<Utf8PathBuf>,

    /// True if files or directories were created, removed or renamed.
    pub structural: bool,

    /// True if a package manifest changed, so cached build targets are stale.
    pub manifest_changed: bool,
}

impl ChangeBatch {
    /// Returns true if the batch holds no changes.
    pub fn is_empty(&self) -> bool {
        self.modified.is_empty() && !self.structural && !self.manifest_changed
    }
}

/// Watches a test root and reports debounced batches of changes.
///
/// The underlying subscription is released when the watcher is dropped.
#[derive(Debug)]
pub struct TestWatcher {
    _watcher: Option<DebugIgnore<RecommendedWatcher>>,
    events: mpsc::UnboundedReceiver<notify::Result<Event>>,
    filter: ChangeFilter,
}

impl TestWatcher {
    /// Starts watching the scanner's root recursively.
    pub fn new(
        scanner: SourceScanner,
        manifest_file: impl Into<String>,
    ) -> Result<Self, WatchError> {
        let (sender, events) = mpsc::unbounded_channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                // The receiver is gone once the watcher is being dropped.
                _ = sender.send(res);
            },
            Config::default(),
        )
        .map_err(|error| WatchError::Create { error })?;

        let root = scanner.root().to_owned();
        watcher
            .watch(root.as_std_path(), RecursiveMode::Recursive)
            .map_err(|error| WatchError::Watch {
                path: root.clone(),
                error,
            })?;
        tracing::debug!("watching `{root}` for changes");

        Ok(Self {
            _watcher: Some(DebugIgnore(watcher)),
            events,
            filter: ChangeFilter {
                scanner,
                manifest_file: manifest_file.into(),
            },
        })
    }

    /// Waits for the next batch of relevant changes.
    ///
    /// Once a relevant event arrives, further events are folded into the same batch until
    /// `debounce` passes without any. Returns `None` if the event stream ends.
    pub async fn next_batch(&mut self, debounce: Duration) -> Option<ChangeBatch> {
        let mut batch = ChangeBatch::default();
        while batch.is_empty() {
            let res = self.events.recv().await?;
            self.filter.record(res, &mut batch);
        }

        loop {
            match tokio::time::timeout(debounce, self.events.recv()).await {
                Ok(Some(res)) => self.filter.record(res, &mut batch),
                Ok(None) | Err(_) => break,
            }
        }

        tracing::debug!(
            modified = batch.modified.len(),
            structural = batch.structural,
            manifest_changed = batch.manifest_changed,
            "collected file changes",
        );
        Some(batch)
    }

    #[cfg(test)]
    fn from_receiver(
        events: mpsc::UnboundedReceiver<notify::Result<Event>>,
        scanner: SourceScanner,
        manifest_file: &str,
    ) -> Self {
        Self {
            _watcher: None,
            events,
            filter: ChangeFilter {
                scanner,
                manifest_file: manifest_file.to_owned(),
            },
        }
    }
}

#[derive(Debug)]
struct ChangeFilter {
    scanner: SourceScanner,
    manifest_file: String,
}

impl ChangeFilter {
    fn record(&self, res: notify::Result<Event>, batch: &mut ChangeBatch) {
        let event = match res {
            Ok(event) => event,
            Err(error) => {
                tracing::warn!("file watcher error: {error}");
                return;
            }
        };
        if matches!(event.kind, EventKind::Access(_)) {
            return;
        }

        for path in event.paths {
            let Ok(path) = Utf8PathBuf::from_path_buf(path) else {
                continue;
            };

            if path.file_name() == Some(self.manifest_file.as_str()) {
                batch.manifest_changed = true;
                continue;
            }

            if self.scanner.is_source_file(&path) {
                match event.kind {
                    EventKind::Create(_)
                    | EventKind::Remove(_)
                    | EventKind::Modify(ModifyKind::Name(_)) => batch.structural = true,
                    _ => {
                        batch.modified.insert(path);
                    }
                }
            } else if self.is_directory_event(&event.kind, &path) {
                batch.structural = true;
            }
        }
    }

    fn is_directory_event(&self, kind: &EventKind, path: &Utf8Path) -> bool {
        if !path.starts_with(self.scanner.root()) {
            return false;
        }
        match kind {
            EventKind::Create(CreateKind::Folder) | EventKind::Remove(RemoveKind::Folder) => true,
            // Renames and removals don't always say whether the path was a directory.
            EventKind::Modify(ModifyKind::Name(_)) | EventKind::Remove(RemoveKind::Any) => {
                path.extension().is_none()
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::RegexDeclarationExtractor;
    use maplit::btreeset;
    use notify::event::{AccessKind, DataChange, RenameMode};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    const ROOT: &str = "/repo/Tests";

    fn scanner() -> SourceScanner {
        SourceScanner::new(
            ROOT,
            "swift",
            Arc::new(RegexDeclarationExtractor::new("XCTestCase", "test")),
        )
    }

    fn event(kind: EventKind, path: &str) -> notify::Result<Event> {
        Ok(Event::new(kind).add_path(path.into()))
    }

    fn modify(path: &str) -> notify::Result<Event> {
        event(EventKind::Modify(ModifyKind::Data(DataChange::Content)), path)
    }

    fn watcher() -> (mpsc::UnboundedSender<notify::Result<Event>>, TestWatcher) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let watcher = TestWatcher::from_receiver(receiver, scanner(), "Package.swift");
        (sender, watcher)
    }

    #[tokio::test(start_paused = true)]
    async fn coalesces_events_within_window() {
        let (sender, mut watcher) = watcher();
        sender.send(modify("/repo/Tests/Unit/App/FooTests.swift")).unwrap();

        let task = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            sender.send(modify("/repo/Tests/Unit/App/BarTests.swift")).unwrap();
            sender.send(modify("/repo/Tests/Unit/App/FooTests.swift")).unwrap();
            tokio::time::sleep(Duration::from_secs(1)).await;
            sender.send(modify("/repo/Tests/Unit/App/BazTests.swift")).unwrap();
        });

        let debounce = Duration::from_millis(300);
        let first = watcher.next_batch(debounce).await.unwrap();
        assert_eq!(
            first.modified,
            btreeset! {
                Utf8PathBuf::from("/repo/Tests/Unit/App/BarTests.swift"),
                Utf8PathBuf::from("/repo/Tests/Unit/App/FooTests.swift"),
            }
        );
        assert!(!first.structural);

        let second = watcher.next_batch(debounce).await.unwrap();
        assert_eq!(
            second.modified,
            btreeset! { Utf8PathBuf::from("/repo/Tests/Unit/App/BazTests.swift") }
        );

        task.await.unwrap();
        assert_eq!(watcher.next_batch(debounce).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn irrelevant_events_do_not_end_the_wait() {
        let (sender, mut watcher) = watcher();
        sender
            .send(event(
                EventKind::Access(AccessKind::Any),
                "/repo/Tests/Unit/App/FooTests.swift",
            ))
            .unwrap();
        sender.send(modify("/repo/Tests/Unit/App/README.md")).unwrap();
        sender.send(modify("/repo/Tests/FooTests.swift")).unwrap();
        sender.send(Err(notify::Error::generic("boom"))).unwrap();
        sender
            .send(event(
                EventKind::Create(CreateKind::File),
                "/repo/Tests/Unit/App/NewTests.swift",
            ))
            .unwrap();
        drop(sender);

        let batch = watcher.next_batch(Duration::from_millis(300)).await.unwrap();
        assert_eq!(
            batch,
            ChangeBatch {
                modified: BTreeSet::new(),
                structural: true,
                manifest_changed: false,
            }
        );
    }

    #[test]
    fn classifies_structural_changes() {
        let filter = ChangeFilter {
            scanner: scanner(),
            manifest_file: "Package.swift".to_owned(),
        };

        for (res, structural) in [
            (
                event(
                    EventKind::Remove(RemoveKind::File),
                    "/repo/Tests/Unit/App/FooTests.swift",
                ),
                true,
            ),
            (
                event(
                    EventKind::Modify(ModifyKind::Name(RenameMode::From)),
                    "/repo/Tests/Unit/App/FooTests.swift",
                ),
                true,
            ),
            (
                event(EventKind::Remove(RemoveKind::Folder), "/repo/Tests/Unit/App"),
                true,
            ),
            (
                event(EventKind::Create(CreateKind::Folder), "/elsewhere/Unit"),
                false,
            ),
            (
                event(EventKind::Remove(RemoveKind::Any), "/repo/Tests/Unit/notes.txt"),
                false,
            ),
        ] {
            let mut batch = ChangeBatch::default();
            filter.record(res, &mut batch);
            assert_eq!(batch.structural, structural, "{batch:?}");
        }
    }

    #[test]
    fn manifest_changes_are_flagged() {
        let filter = ChangeFilter {
            scanner: scanner(),
            manifest_file: "Package.swift".to_owned(),
        };
        let mut batch = ChangeBatch::default();
        filter.record(modify("/repo/Package.swift"), &mut batch);
        assert!(batch.manifest_changed);
        assert!(batch.modified.is_empty());
        assert!(!batch.is_empty());
    }
}
