// Copyright (c) The xctest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    reporter::{FailureLocation, RunStatus, TestFailure},
    tree::{SourceLocation, TestId},
};
use camino::Utf8PathBuf;
use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;

/// A test method taking part in a run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LeafInfo {
    /// The method node id.
    pub id: TestId,

    /// The id of the class the method belongs to.
    pub class_id: TestId,

    /// The class name, as it appears in build tool output.
    pub class_name: String,

    /// The method name.
    pub method_name: String,

    /// Where the method is declared.
    pub location: Option<SourceLocation>,
}

/// An error reported inline by the build tool, before the corresponding test finished.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InlineError {
    /// The file containing the failing assertion.
    pub file: Utf8PathBuf,

    /// The one-based line, as printed by the build tool.
    pub line: usize,

    /// The assertion message.
    pub message: String,
}

impl InlineError {
    pub(crate) fn into_failure(self) -> TestFailure {
        TestFailure {
            message: self.message,
            location: Some(FailureLocation {
                path: self.file,
                line: self.line.saturating_sub(1),
            }),
        }
    }
}

/// The result of matching a class and method name from build tool output against the leaves of a
/// run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Correlation {
    /// Exactly one leaf matched.
    Unique(TestId),

    /// More than one leaf matched, so the line can't be attributed.
    Ambiguous(usize),

    /// No leaf matched.
    NotFound,
}

/// The state of a single execution.
///
/// The set of leaves is fixed at creation. Leaves move into `processed` once they pass or fail, and
/// failed leaves are also recorded in `failed`; methods that aren't part of the run are never
/// recorded, so `failed ⊆ processed ⊆ leaves` always holds.
#[derive(Clone, Debug, Default)]
pub struct RunContext {
    method_nodes: IndexMap<TestId, LeafInfo>,
    processed: IndexSet<TestId>,
    failed: IndexSet<TestId>,
    inline_errors: HashMap<TestId, InlineError>,
    saw_test_output: bool,
}

impl RunContext {
    /// Creates a new context for the given leaves. Duplicates are ignored.
    pub fn new(leaves: impl IntoIterator<Item = LeafInfo>) -> Self {
        let method_nodes = leaves
            .into_iter()
            .map(|leaf| (leaf.id.clone(), leaf))
            .collect();
        Self {
            method_nodes,
            ..Default::default()
        }
    }

    /// Returns the leaves in this run, in the order they were added.
    pub fn method_nodes(&self) -> &IndexMap<TestId, LeafInfo> {
        &self.method_nodes
    }

    /// Returns the number of leaves in this run.
    pub fn test_count(&self) -> usize {
        self.method_nodes.len()
    }

    /// Returns the leaves that reached a terminal state.
    pub fn processed(&self) -> &IndexSet<TestId> {
        &self.processed
    }

    /// Returns the leaves that failed.
    pub fn failed(&self) -> &IndexSet<TestId> {
        &self.failed
    }

    /// Returns the status of a leaf: failed, passed, or skipped if it hasn't finished yet.
    pub fn status_of(&self, id: &TestId) -> RunStatus {
        if self.failed.contains(id) {
            RunStatus::Failed
        } else if self.processed.contains(id) {
            RunStatus::Passed
        } else {
            RunStatus::Skipped
        }
    }

    /// Iterates over the leaves that haven't finished, in order.
    pub fn unprocessed(&self) -> impl Iterator<Item = &LeafInfo> + '_ {
        self.method_nodes
            .values()
            .filter(|leaf| !self.processed.contains(&leaf.id))
    }

    /// Returns true if any line of test output was recognized during this run.
    pub fn saw_test_output(&self) -> bool {
        self.saw_test_output
    }

    /// The overall status: failed if anything failed, passed if every leaf finished, otherwise
    /// skipped.
    pub fn overall_status(&self) -> RunStatus {
        if !self.failed.is_empty() {
            RunStatus::Failed
        } else if self.processed.len() == self.method_nodes.len() {
            RunStatus::Passed
        } else {
            RunStatus::Skipped
        }
    }

    /// Matches a class and method name against the leaves of this run.
    ///
    /// Leaves whose class and method both match are preferred. If there are none, a leaf whose
    /// method name alone matches is accepted as long as it's the only one.
    pub fn correlate(&self, class_name: Option<&str>, method_name: &str) -> Correlation {
        if let Some(class_name) = class_name {
            let qualified = self.matching(|leaf| {
                leaf.class_name == class_name && leaf.method_name == method_name
            });
            if qualified != Correlation::NotFound {
                return qualified;
            }
        }
        self.matching(|leaf| leaf.method_name == method_name)
    }

    // ---
    // State transitions, driven by the output parser and the aggregator
    // ---

    pub(crate) fn mark_output_seen(&mut self) {
        self.saw_test_output = true;
    }

    pub(crate) fn mark_passed(&mut self, id: &TestId) -> bool {
        if !self.method_nodes.contains_key(id) {
            return false;
        }
        self.processed.insert(id.clone());
        // A re-run that passes supersedes an earlier failure.
        self.failed.shift_remove(id);
        true
    }

    pub(crate) fn mark_failed(&mut self, id: &TestId) -> bool {
        if !self.method_nodes.contains_key(id) {
            return false;
        }
        self.processed.insert(id.clone());
        self.failed.insert(id.clone());
        true
    }

    /// Records an inline error. Only the first error for each test is kept.
    pub(crate) fn record_inline_error(&mut self, id: TestId, error: InlineError) {
        if self.method_nodes.contains_key(&id) {
            self.inline_errors.entry(id).or_insert(error);
        }
    }

    pub(crate) fn take_inline_error(&mut self, id: &TestId) -> Option<InlineError> {
        self.inline_errors.remove(id)
    }

    fn matching(&self, mut pred: impl FnMut(&LeafInfo) -> bool) -> Correlation {
        let mut matches = self.method_nodes.values().filter(|leaf| pred(leaf));
        match (matches.next(), matches.next()) {
            (Some(leaf), None) => Correlation::Unique(leaf.id.clone()),
            (Some(_), Some(_)) => Correlation::Ambiguous(2 + matches.count()),
            (None, _) => Correlation::NotFound,
        }
    }
}
