// Copyright (c) The xctest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of a node in the test tree.
///
/// The tree is always four levels deep: domains contain categories, categories contain classes and
/// classes contain methods.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestNodeKind {
    /// The first path segment below the test root, e.g. `Tests`.
    Domain,

    /// The second path segment below the test root, typically named after a test target.
    Category,

    /// A test class.
    Class,

    /// A test method. This is the only kind of node that is a leaf.
    Method,
}

impl TestNodeKind {
    /// Returns true if nodes of this kind never have children.
    pub fn is_leaf(self) -> bool {
        matches!(self, Self::Method)
    }

    /// Returns a string representation of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Domain => "domain",
            Self::Category => "category",
            Self::Class => "class",
            Self::Method => "method",
        }
    }
}

impl fmt::Display for TestNodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A position within a source file. Lines and columns are zero-based.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct SourceLocationSummary {
    /// The path to the source file.
    pub path: Utf8PathBuf,

    /// The zero-based line number.
    pub line: usize,

    /// The zero-based column, counted in characters.
    pub column: usize,
}

/// A node in a [`TestListSummary`].
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct TestNodeSummary {
    /// The unique identifier for this node, e.g. `Tests:AppTests:LoginTests.testLogin`.
    pub id: String,

    /// The kind of node.
    pub kind: TestNodeKind,

    /// The display name of this node.
    pub label: String,

    /// Where the node is declared. Only present for classes and methods.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocationSummary>,

    /// The build target, if it has already been resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_target: Option<String>,

    /// Child nodes, in insertion order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TestNodeSummary>,
}

/// Root element for a serializable list of discovered tests.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct TestListSummary {
    /// The number of test methods in the tree.
    pub test_count: usize,

    /// The number of test classes in the tree.
    pub class_count: usize,

    /// The domain-level roots of the tree.
    pub roots: Vec<TestNodeSummary>,
}

impl TestListSummary {
    /// Parse JSON output from `xctest list --message-format json`.
    pub fn parse_json(json: impl AsRef<str>) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json.as_ref())
    }

    /// Iterates over all the method nodes in this summary, depth-first.
    pub fn iter_methods(&self) -> impl Iterator<Item = &TestNodeSummary> + '_ {
        let mut stack: Vec<&TestNodeSummary> = self.roots.iter().rev().collect();
        std::iter::from_fn(move || {
            while let Some(node) = stack.pop() {
                if node.kind.is_leaf() {
                    return Some(node);
                }
                stack.extend(node.children.iter().rev());
            }
            None
        })
    }
}
