// Copyright (c) The xctest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turning a selection of tree nodes into a build tool invocation.
//!
//! Planning happens in four steps:
//!
//! 1. **Normalize**: nodes that have a selected runnable ancestor are dropped, since running the
//!    ancestor already runs them. A selected domain never runs, so it covers nothing.
//! 2. **Validate**: ids that aren't in the tree, or that don't have at least two segments, are
//!    skipped.
//! 3. **Resolve**: each node's build target is looked up, using the value cached on the tree if
//!    there is one. Nodes without a target are skipped.
//! 4. **Strategy**: a single remaining node is run on its own, several are run as one batch.
//!
//! None of these steps fail: anything that can't be run is reported as a [`SkipReason`].

use crate::{
    runner::{LeafInfo, RunContext},
    signal::CancelFlag,
    target_resolver::TargetResolver,
    tree::{TestId, TestTree},
};
use camino::Utf8PathBuf;
use std::fmt;
use xctest_metadata::TestNodeKind;

/// The nodes a user asked to run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Selection {
    /// Every test in the tree.
    Everything,

    /// The given nodes, in order.
    Ids(Vec<TestId>),
}

/// Scopes a build tool invocation to a target, a class within it, or a single method.
///
/// Displayed as `target`, `target/class` or `target/class/method`.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct TestSelector {
    /// The build target.
    pub build_target: String,

    /// The class, if the selector is narrower than a target.
    pub class_path: Option<String>,

    /// The method, if the selector is a single test.
    pub method_name: Option<String>,
}

impl fmt::Display for TestSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.build_target)?;
        if let Some(class_path) = &self.class_path {
            write!(f, "/{class_path}")?;
            if let Some(method_name) = &self.method_name {
                write!(f, "/{method_name}")?;
            }
        }
        Ok(())
    }
}

/// Whether a run covers one node or several.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RunStrategy {
    /// A single node.
    Single,

    /// Several nodes, run through a single invocation.
    Batch,
}

/// Why a selected node was left out of a run.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SkipReason {
    /// The id isn't in the tree.
    NotFound,

    /// The id has fewer than two segments, so no selector can be built for it.
    NotRunnable,

    /// The node's build target couldn't be determined.
    UnresolvedTarget,

    /// The run was cancelled before the build tool was invoked.
    Cancelled,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not found in the test tree"),
            Self::NotRunnable => write!(f, "not a runnable node"),
            Self::UnresolvedTarget => write!(f, "build target could not be resolved"),
            Self::Cancelled => write!(f, "run cancelled"),
        }
    }
}

/// A node that will be run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PlannedNode {
    /// The node id.
    pub id: TestId,

    /// The kind of node.
    pub kind: TestNodeKind,

    /// The selector passed to the build tool.
    pub selector: TestSelector,
}

/// Everything needed to invoke the build tool once.
#[derive(Clone, Debug)]
pub struct RunPlan {
    /// Whether one or several nodes are run.
    pub strategy: RunStrategy,

    /// The nodes to run, in selection order.
    pub nodes: Vec<PlannedNode>,

    /// The run state, covering every method below `nodes`.
    pub context: RunContext,
}

impl RunPlan {
    /// Returns the selectors for the build tool, in selection order.
    pub fn selectors(&self) -> Vec<TestSelector> {
        self.nodes.iter().map(|node| node.selector.clone()).collect()
    }
}

/// The result of planning.
#[derive(Clone, Debug)]
pub struct PlanOutput {
    /// The plan, or `None` if there is nothing to run.
    pub plan: Option<RunPlan>,

    /// Nodes that were selected but won't run.
    pub skipped: Vec<(TestId, SkipReason)>,

    /// True if planning was aborted by cancellation.
    pub cancelled: bool,
}

/// Drops every id that has a runnable ancestor (or a duplicate) earlier or later in the list,
/// keeping the order of the remaining ids.
///
/// Ids that aren't runnable are kept, and are skipped later on. They don't cover their
/// descendants, since nothing would run in their place.
pub fn normalize_selection(ids: &[TestId]) -> Vec<TestId> {
    let mut normalized: Vec<TestId> = Vec::with_capacity(ids.len());
    for (index, id) in ids.iter().enumerate() {
        let covered = ids
            .iter()
            .any(|other| other.is_runnable() && other.is_ancestor_of(id))
            || ids[..index].contains(id);
        if !covered {
            normalized.push(id.clone());
        }
    }
    normalized
}

/// Plans runs against a test tree.
///
/// Targets resolved while planning are written back onto the tree.
#[derive(Debug)]
pub struct RunPlanner<'a> {
    tree: &'a mut TestTree,
    resolver: &'a TargetResolver,
}

impl<'a> RunPlanner<'a> {
    /// Creates a new planner.
    pub fn new(tree: &'a mut TestTree, resolver: &'a TargetResolver) -> Self {
        Self { tree, resolver }
    }

    /// Plans a run for `selection`.
    pub async fn plan(&mut self, selection: &Selection, cancel: &CancelFlag) -> PlanOutput {
        let candidates = match selection {
            Selection::Everything => self
                .tree
                .roots()
                .flat_map(|root| root.children())
                .map(|category| category.id().clone())
                .collect(),
            Selection::Ids(ids) => normalize_selection(ids),
        };

        let mut skipped = Vec::new();
        let mut nodes = Vec::new();
        for id in &candidates {
            if cancel.is_cancelled() {
                return Self::cancelled(&candidates);
            }
            match self.plan_node(id).await {
                Ok(node) => nodes.push(node),
                Err(reason) => {
                    tracing::debug!("skipping `{id}`: {reason}");
                    skipped.push((id.clone(), reason));
                }
            }
        }
        if cancel.is_cancelled() {
            return Self::cancelled(&candidates);
        }

        if nodes.is_empty() {
            return PlanOutput {
                plan: None,
                skipped,
                cancelled: false,
            };
        }

        let strategy = if nodes.len() == 1 {
            RunStrategy::Single
        } else {
            RunStrategy::Batch
        };
        let context = RunContext::new(nodes.iter().flat_map(|node| self.leaves(&node.id)));
        PlanOutput {
            plan: Some(RunPlan {
                strategy,
                nodes,
                context,
            }),
            skipped,
            cancelled: false,
        }
    }

    // ---
    // Helper methods
    // ---

    async fn plan_node(&mut self, id: &TestId) -> Result<PlannedNode, SkipReason> {
        if !id.is_runnable() {
            return Err(SkipReason::NotRunnable);
        }
        let (kind, cached, path) = {
            let node = self.tree.lookup(id).ok_or(SkipReason::NotFound)?;
            (
                node.kind(),
                node.resolved_target().map(str::to_owned),
                node.resolution_path().map(Utf8PathBuf::from),
            )
        };
        if kind == TestNodeKind::Domain {
            return Err(SkipReason::NotRunnable);
        }

        let build_target = match cached {
            Some(target) => target,
            None => {
                let path = path.ok_or(SkipReason::UnresolvedTarget)?;
                let target = self
                    .resolver
                    .resolve(&path)
                    .await
                    .ok_or(SkipReason::UnresolvedTarget)?;
                self.tree.set_resolved_target(id, target.clone());
                target
            }
        };

        let selector = self.selector_for(id, kind, build_target);
        Ok(PlannedNode {
            id: id.clone(),
            kind,
            selector,
        })
    }

    fn selector_for(&self, id: &TestId, kind: TestNodeKind, build_target: String) -> TestSelector {
        let (class_path, method_name) = match kind {
            TestNodeKind::Domain | TestNodeKind::Category => (None, None),
            TestNodeKind::Class => {
                let label = self.tree.lookup(id).map(|node| node.label().to_owned());
                (label, None)
            }
            TestNodeKind::Method => match id.class_and_method() {
                Some((class, method)) => (Some(class.to_owned()), Some(method.to_owned())),
                None => (None, None),
            },
        };
        TestSelector {
            build_target,
            class_path,
            method_name,
        }
    }

    fn leaves(&self, id: &TestId) -> Vec<LeafInfo> {
        self.tree
            .leaves_under(id)
            .into_iter()
            .filter_map(|leaf| {
                let class = leaf.parent()?;
                Some(LeafInfo {
                    id: leaf.id().clone(),
                    class_id: class.id().clone(),
                    class_name: class.label().to_owned(),
                    method_name: leaf.label().to_owned(),
                    location: leaf.location().cloned(),
                })
            })
            .collect()
    }

    fn cancelled(candidates: &[TestId]) -> PlanOutput {
        PlanOutput {
            plan: None,
            skipped: candidates
                .iter()
                .map(|id| (id.clone(), SkipReason::Cancelled))
                .collect(),
            cancelled: true,
        }
    }
}
