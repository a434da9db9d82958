// Copyright (c) The xctest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping source paths to build targets.
//!
//! The build tool addresses tests as `<target>/<class>/<method>`, so before a node can be run the
//! name of the target that compiles its source file must be known. [`TargetResolver`] answers
//! this in two ways:
//!
//! 1. If an ancestor directory contains a package manifest, the package is described (see
//!    [`PackageDescriber`]) and the unique test target whose source directory contains the path
//!    is picked.
//! 2. Otherwise, the path segment following a `Tests` directory is used.

use crate::{config::ResolutionConfig, errors::DescribePackageError};
use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex},
};
use xctest_metadata::PackageDescription;

/// Produces a description of the package rooted at a directory.
#[async_trait(?Send)]
pub trait PackageDescriber: fmt::Debug {
    /// Describes the package whose manifest lives in `dir`.
    async fn describe(&self, dir: &Utf8Path) -> Result<PackageDescription, DescribePackageError>;
}

/// A [`PackageDescriber`] that runs an external command, by default
/// `swift package describe --type json`, in the package directory.
#[derive(Clone, Debug)]
pub struct CommandPackageDescriber {
    command: Vec<String>,
}

impl CommandPackageDescriber {
    /// Creates a new describer running `command` (program followed by arguments).
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

#[async_trait(?Send)]
impl PackageDescriber for CommandPackageDescriber {
    async fn describe(&self, dir: &Utf8Path) -> Result<PackageDescription, DescribePackageError> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or(DescribePackageError::NoCommand)?;
        let command_str = shell_words::join(&self.command);

        let output = tokio::process::Command::new(program)
            .args(args)
            .current_dir(dir)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|error| DescribePackageError::Exec {
                command: command_str.clone(),
                dir: dir.to_owned(),
                error,
            })?;

        if !output.status.success() {
            return Err(DescribePackageError::CommandFailed {
                command: command_str,
                dir: dir.to_owned(),
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        PackageDescription::parse_json(stdout).map_err(|error| DescribePackageError::Json {
            dir: dir.to_owned(),
            error,
        })
    }
}

/// Resolves build target names for source paths.
///
/// Cloning a resolver is cheap, and clones share their caches. If two resolutions of the same path
/// race, the last writer wins.
#[derive(Clone, Debug)]
pub struct TargetResolver {
    manifest_file: String,
    tests_directory_name: String,
    describer: Arc<dyn PackageDescriber>,
    cache: Arc<Mutex<ResolverCache>>,
}

#[derive(Debug, Default)]
struct ResolverCache {
    // Whether each directory contains a manifest.
    has_manifest: HashMap<Utf8PathBuf, bool>,
    // Package descriptions by package root. `None` records a failed query.
    packages: HashMap<Utf8PathBuf, Option<Arc<PackageDescription>>>,
    // Final answers.
    resolved: HashMap<Utf8PathBuf, Option<String>>,
}

impl TargetResolver {
    /// Creates a new resolver.
    pub fn new(config: &ResolutionConfig, describer: Arc<dyn PackageDescriber>) -> Self {
        Self {
            manifest_file: config.manifest_file.clone(),
            tests_directory_name: config.tests_directory_name.clone(),
            describer,
            cache: Arc::default(),
        }
    }

    /// Creates a resolver that describes packages with the configured command.
    pub fn from_config(config: &ResolutionConfig) -> Self {
        let describer = CommandPackageDescriber::new(config.describe_command.clone());
        Self::new(config, Arc::new(describer))
    }

    /// Returns the build target for `path`, or `None` if it can't be determined.
    pub async fn resolve(&self, path: &Utf8Path) -> Option<String> {
        if let Some(resolved) = self.cache().resolved.get(path) {
            return resolved.clone();
        }

        let mut resolved = None;
        if let Some(package_root) = self.find_package_root(path).await {
            resolved = self.resolve_from_package(&package_root, path).await;
        }
        if resolved.is_none() {
            resolved = self.resolve_from_segments(path);
        }

        tracing::debug!(
            "resolved build target for `{path}`: {}",
            resolved.as_deref().unwrap_or("(none)"),
        );
        self.cache()
            .resolved
            .insert(path.to_owned(), resolved.clone());
        resolved
    }

    /// Forgets everything learned so far, e.g. after a manifest changes.
    pub fn clear_cache(&self) {
        *self.cache() = ResolverCache::default();
    }

    // ---
    // Helper methods
    // ---

    fn cache(&self) -> std::sync::MutexGuard<'_, ResolverCache> {
        // Never held across an await point.
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn find_package_root(&self, path: &Utf8Path) -> Option<Utf8PathBuf> {
        for dir in path.ancestors().skip(1) {
            if dir.as_str().is_empty() {
                continue;
            }
            let cached = self.cache().has_manifest.get(dir).copied();
            let has_manifest = match cached {
                Some(has_manifest) => has_manifest,
                None => {
                    let has_manifest = tokio::fs::try_exists(dir.join(&self.manifest_file))
                        .await
                        .unwrap_or(false);
                    self.cache()
                        .has_manifest
                        .insert(dir.to_owned(), has_manifest);
                    has_manifest
                }
            };
            if has_manifest {
                return Some(dir.to_owned());
            }
        }
        None
    }

    async fn resolve_from_package(
        &self,
        package_root: &Utf8Path,
        path: &Utf8Path,
    ) -> Option<String> {
        let cached = self.cache().packages.get(package_root).cloned();
        let package = match cached {
            Some(package) => package,
            None => {
                let package = match self.describer.describe(package_root).await {
                    Ok(package) => Some(Arc::new(package)),
                    Err(error) => {
                        tracing::warn!(
                            "failed to describe package at `{package_root}`, \
                             falling back to directory names: {error}"
                        );
                        None
                    }
                };
                self.cache()
                    .packages
                    .insert(package_root.to_owned(), package.clone());
                package
            }
        }?;

        let mut matches = package
            .test_targets()
            .filter(|target| path.starts_with(package_root.join(target.source_dir())));
        match (matches.next(), matches.next()) {
            (Some(target), None) => Some(target.name.clone()),
            (Some(_), Some(_)) => {
                tracing::debug!("multiple test targets in `{package_root}` contain `{path}`");
                None
            }
            (None, _) => None,
        }
    }

    fn resolve_from_segments(&self, path: &Utf8Path) -> Option<String> {
        let segments: Vec<&str> = path.iter().collect();
        segments.windows(2).enumerate().find_map(|(index, pair)| {
            if pair[0] != self.tests_directory_name {
                return None;
            }
            // A trailing file name isn't a target.
            let is_last = index + 2 == segments.len();
            if is_last && Utf8Path::new(pair[1]).extension().is_some() {
                return None;
            }
            Some(pair[1].to_owned())
        })
    }
}
