// Copyright (c) The xctest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

/// The subset of a Swift package description that xctest cares about.
///
/// Obtained by running `swift package describe --type json` in a directory containing a
/// `Package.swift` manifest. Unknown fields are ignored.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct PackageDescription {
    /// The name of the package.
    #[serde(default)]
    pub name: Option<String>,

    /// The targets declared by the package.
    #[serde(default)]
    pub targets: Vec<PackageTarget>,
}

impl PackageDescription {
    /// Parses the JSON output of `swift package describe --type json`.
    pub fn parse_json(json: impl AsRef<str>) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json.as_ref())
    }

    /// Iterates over the test targets declared by this package.
    pub fn test_targets(&self) -> impl Iterator<Item = &PackageTarget> + '_ {
        self.targets
            .iter()
            .filter(|target| target.kind == PackageTargetKind::Test)
    }
}

/// A single target within a [`PackageDescription`].
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct PackageTarget {
    /// The target name, as passed to the build tool.
    pub name: String,

    /// The kind of target.
    #[serde(rename = "type")]
    pub kind: PackageTargetKind,

    /// The target's source directory, relative to the package root. If not declared, the
    /// conventional location is used: see [`Self::source_dir`].
    #[serde(default)]
    pub path: Option<Utf8PathBuf>,
}

impl PackageTarget {
    /// Returns the directory containing this target's sources, relative to the package root.
    ///
    /// Test targets default to `Tests/<name>`, all other targets to `Sources/<name>`.
    pub fn source_dir(&self) -> Utf8PathBuf {
        match &self.path {
            Some(path) => path.clone(),
            None => {
                let parent = match self.kind {
                    PackageTargetKind::Test => "Tests",
                    _ => "Sources",
                };
                Utf8Path::new(parent).join(&self.name)
            }
        }
    }
}

/// The kind of a [`PackageTarget`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageTargetKind {
    /// A test target.
    Test,

    /// A library (regular) target.
    Library,

    /// An executable target.
    Executable,

    /// Any other target kind (macros, plugins, snippets, ...).
    #[serde(other)]
    Other,
}
