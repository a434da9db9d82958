// Copyright (c) The xctest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{
    DeclarationExtractor, DiscoveredClass, DiscoveredMethod, DiscoveryResult,
    RegexDeclarationExtractor,
};
use crate::config::XcTestConfig;
use camino::{Utf8Path, Utf8PathBuf};
use std::sync::Arc;
use walkdir::{DirEntry, WalkDir};

/// Walks a test root and collects test classes.
///
/// Files are grouped by their path relative to the root: the first segment is the *domain*, the
/// second the *category*. Files fewer than three segments deep are ignored.
#[derive(Clone, Debug)]
pub struct SourceScanner {
    root: Utf8PathBuf,
    extension: String,
    extractor: Arc<dyn DeclarationExtractor>,
}

impl SourceScanner {
    /// Creates a new scanner with an explicit declaration extractor.
    pub fn new(
        root: impl Into<Utf8PathBuf>,
        extension: impl Into<String>,
        extractor: Arc<dyn DeclarationExtractor>,
    ) -> Self {
        Self {
            root: root.into(),
            extension: extension.into(),
            extractor,
        }
    }

    /// Creates a scanner using the regex extractor and the discovery settings in `config`.
    pub fn from_config(config: &XcTestConfig) -> Self {
        let discovery = config.discovery();
        let extractor = RegexDeclarationExtractor::new(
            discovery.base_test_type.clone(),
            &discovery.test_method_prefix,
        );
        Self::new(
            config.test_root(),
            discovery.file_extension.clone(),
            Arc::new(extractor),
        )
    }

    /// Returns the root directory being scanned.
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Returns true if `path` is a file this scanner would look at.
    pub fn is_source_file(&self, path: &Utf8Path) -> bool {
        path.extension() == Some(self.extension.as_str()) && self.grouping(path).is_some()
    }

    /// Scans the whole tree.
    ///
    /// Never fails: directories and files that can't be read are logged and skipped.
    pub async fn scan(&self) -> DiscoveryResult {
        let mut classes = Vec::new();
        for path in self.source_files() {
            classes.extend(self.scan_file(&path).await);
        }
        tracing::debug!(
            root = %self.root,
            classes = classes.len(),
            "finished scanning test sources",
        );
        DiscoveryResult { classes }
    }

    /// Scans a single file. Returns an empty list if the file is outside the grouping structure,
    /// can't be read, or declares no test classes.
    pub async fn scan_file(&self, path: &Utf8Path) -> Vec<DiscoveredClass> {
        let Some((domain, category, category_dir)) = self.grouping(path) else {
            return Vec::new();
        };

        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(error) => {
                tracing::warn!("skipping unreadable test source `{path}`: {error}");
                return Vec::new();
            }
        };

        self.extractor
            .extract(&text)
            .into_iter()
            .map(|class| DiscoveredClass {
                domain: domain.clone(),
                category: category.clone(),
                category_dir: category_dir.clone(),
                class_name: class.name,
                source_file: path.to_owned(),
                position: class.position,
                methods: class
                    .methods
                    .into_iter()
                    .map(|method| DiscoveredMethod {
                        name: method.name,
                        position: method.position,
                    })
                    .collect(),
            })
            .collect()
    }

    // ---
    // Helper methods
    // ---

    fn source_files(&self) -> Vec<Utf8PathBuf> {
        let walker = WalkDir::new(&self.root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(error) => {
                    tracing::warn!("skipping part of test root `{}`: {error}", self.root);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            match Utf8PathBuf::from_path_buf(entry.into_path()) {
                Ok(path) if path.extension() == Some(self.extension.as_str()) => files.push(path),
                Ok(_) => {}
                Err(path) => {
                    tracing::warn!("skipping non-UTF-8 path `{}`", path.display());
                }
            }
        }
        files
    }

    /// Returns the domain, category and category directory for a path under the root.
    fn grouping(&self, path: &Utf8Path) -> Option<(String, String, Utf8PathBuf)> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let mut components = relative.components();
        let domain = components.next()?.as_str();
        let category = components.next()?.as_str();
        // At least one more segment: the file itself.
        components.next()?;

        let category_dir = self.root.join(domain).join(category);
        Some((domain.to_owned(), category.to_owned(), category_dir))
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::SourcePosition;
    use camino_tempfile::{Utf8TempDir, tempdir};
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    const LOGIN_TESTS: &str = indoc! {r#"
        import XCTest

        class LoginTests: XCTestCase {
            func testValidLogin() {}
            func testInvalidLogin() {}
        }
    "#};

    fn write(dir: &Utf8TempDir, relative: &str, contents: &str) -> Utf8PathBuf {
        let path = dir.path().join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn scanner(dir: &Utf8TempDir) -> SourceScanner {
        SourceScanner::new(
            dir.path(),
            "swift",
            Arc::new(RegexDeclarationExtractor::new("XCTestCase", "test")),
        )
    }

    #[tokio::test]
    async fn groups_by_first_two_segments() {
        let dir = tempdir().unwrap();
        let login = write(&dir, "Auth/Unit/Login/LoginTests.swift", LOGIN_TESTS);
        write(
            &dir,
            "Auth/Unit/AccountTests.swift",
            "class AccountTests: XCTestCase {\n    func testCreate() {}\n}\n",
        );

        let result = scanner(&dir).scan().await;
        let summary: Vec<_> = result
            .classes
            .iter()
            .map(|class| {
                (
                    class.domain.as_str(),
                    class.category.as_str(),
                    class.class_name.as_str(),
                    class.methods.len(),
                )
            })
            .collect();
        // Entries are sorted by file name at each level: `AccountTests.swift` < `Login`.
        assert_eq!(
            summary,
            vec![
                ("Auth", "Unit", "AccountTests", 1),
                ("Auth", "Unit", "LoginTests", 2),
            ]
        );

        let login_class = &result.classes[1];
        assert_eq!(login_class.source_file, login);
        assert_eq!(login_class.category_dir, dir.path().join("Auth/Unit"));
        assert_eq!(login_class.position, SourcePosition { line: 2, column: 6 });
        assert_eq!(result.test_count(), 3);
    }

    #[tokio::test]
    async fn shallow_hidden_and_foreign_files_are_skipped() {
        let dir = tempdir().unwrap();
        write(&dir, "Auth/LoginTests.swift", LOGIN_TESTS);
        write(&dir, "TopLevelTests.swift", LOGIN_TESTS);
        write(&dir, "Auth/.build/Checkouts/LoginTests.swift", LOGIN_TESTS);
        write(&dir, "Auth/Unit/LoginTests.m", LOGIN_TESTS);
        write(&dir, "Auth/Unit/Helpers.swift", "struct Helper {}\n");

        let result = scanner(&dir).scan().await;
        assert_eq!(result, DiscoveryResult::default());
    }

    #[tokio::test]
    async fn scan_file_outside_root_is_empty() {
        let dir = tempdir().unwrap();
        let other = tempdir().unwrap();
        let path = write(&other, "Auth/Unit/LoginTests.swift", LOGIN_TESTS);

        let scanner = scanner(&dir);
        assert!(!scanner.is_source_file(&path));
        assert!(scanner.scan_file(&path).await.is_empty());
    }

    #[tokio::test]
    async fn missing_root_yields_nothing() {
        let dir = tempdir().unwrap();
        let scanner = SourceScanner::new(
            dir.path().join("does-not-exist"),
            "swift",
            Arc::new(RegexDeclarationExtractor::new("XCTestCase", "test")),
        );
        assert_eq!(scanner.scan().await, DiscoveryResult::default());
    }
}
