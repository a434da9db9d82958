// Copyright (c) The xctest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Discovery of test classes and methods in a source tree.
//!
//! The main entry point is [`SourceScanner`], which walks a test root and produces a list of
//! [`DiscoveredClass`] instances. Recognizing declarations within a single file is delegated to a
//! [`DeclarationExtractor`].

mod declarations;
mod scanner;

pub use declarations::*;
pub use scanner::*;

use camino::Utf8PathBuf;

/// A zero-based position within a source file.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SourcePosition {
    /// The zero-based line.
    pub line: usize,

    /// The zero-based column, counted in characters.
    pub column: usize,
}

/// A test class found by the scanner, along with the grouping derived from its path.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DiscoveredClass {
    /// The first path segment relative to the test root.
    pub domain: String,

    /// The second path segment relative to the test root.
    pub category: String,

    /// The directory corresponding to `category`.
    pub category_dir: Utf8PathBuf,

    /// The name of the class.
    pub class_name: String,

    /// The file the class is declared in.
    pub source_file: Utf8PathBuf,

    /// The position of the class name.
    pub position: SourcePosition,

    /// Test methods declared in the class body, in source order.
    pub methods: Vec<DiscoveredMethod>,
}

/// A test method found within a [`DiscoveredClass`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DiscoveredMethod {
    /// The name of the method.
    pub name: String,

    /// The position of the method name.
    pub position: SourcePosition,
}

/// The result of a full scan: every test class under the test root, in path order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DiscoveryResult {
    /// The classes that were found.
    pub classes: Vec<DiscoveredClass>,
}

impl DiscoveryResult {
    /// Returns the total number of test methods found.
    pub fn test_count(&self) -> usize {
        self.classes.iter().map(|class| class.methods.len()).sum()
    }
}
