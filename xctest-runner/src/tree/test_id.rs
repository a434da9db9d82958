// Copyright (c) The xctest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};
use std::{borrow::Borrow, fmt};

/// The unique identifier of a node in the test tree.
///
/// Ids are built by joining the segments of a node's ancestors:
///
/// | kind     | id                             |
/// |----------|--------------------------------|
/// | domain   | `domain`                       |
/// | category | `domain:category`              |
/// | class    | `domain:category:Class`        |
/// | method   | `domain:category:Class.method` |
///
/// Every id is therefore an extension of its parent's id.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestId(String);

impl TestId {
    /// The separator between the domain, category and class segments.
    pub const SEGMENT_SEPARATOR: char = ':';

    /// The separator between a class and a method.
    pub const METHOD_SEPARATOR: char = '.';

    /// Creates a new id from an arbitrary string, for example one passed in on the command line.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id of a domain node.
    pub fn domain(domain: &str) -> Self {
        Self(domain.to_owned())
    }

    /// Returns the id of a category node within a domain.
    pub fn category(domain: &str, category: &str) -> Self {
        Self(format!("{domain}:{category}"))
    }

    /// Returns the id of a class node.
    pub fn class(domain: &str, category: &str, class: &str) -> Self {
        Self(format!("{domain}:{category}:{class}"))
    }

    /// Returns the id of a method of the class identified by `self`.
    pub fn method(&self, method: &str) -> Self {
        Self(format!("{}.{method}", self.0))
    }

    /// Returns the id as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the `:`-separated segments of this id.
    pub fn segments(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.split(Self::SEGMENT_SEPARATOR)
    }

    /// Returns true if this id can be turned into a test selector: it has at least two non-empty
    /// segments. Bare domain ids and malformed ids aren't runnable.
    pub fn is_runnable(&self) -> bool {
        let mut count = 0;
        for segment in self.segments() {
            if segment.is_empty() {
                return false;
            }
            count += 1;
        }
        count >= 2
    }

    /// For a method id, returns the class and method names.
    pub fn class_and_method(&self) -> Option<(&str, &str)> {
        if self.segments().count() != 3 {
            return None;
        }
        let (_, last) = self.0.rsplit_once(Self::SEGMENT_SEPARATOR)?;
        last.split_once(Self::METHOD_SEPARATOR)
    }

    /// Returns true if `self` is a strict ancestor of `other`.
    pub fn is_ancestor_of(&self, other: &TestId) -> bool {
        match other.0.strip_prefix(self.0.as_str()) {
            Some(rest) if rest.starts_with(Self::SEGMENT_SEPARATOR) => true,
            // Only class ids have method children. Path segments may contain dots themselves.
            Some(rest) if rest.starts_with(Self::METHOD_SEPARATOR) => {
                self.segments().count() == 3 && !rest.contains(Self::SEGMENT_SEPARATOR)
            }
            _ => false,
        }
    }
}

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TestId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TestId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for TestId {
    fn borrow(&self) -> &str {
        &self.0
    }
}
