// Copyright (c) The xctest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for `xctest`, a test explorer for XCTest suites.
//!
//! The basic flow of operations is:
//!
//! 1. A [`SourceScanner`](discovery::SourceScanner) walks the test root and finds test classes
//!    and methods.
//! 2. The results are arranged into a [`TestTree`](tree::TestTree) of domains, categories,
//!    classes and methods.
//! 3. A [`RunPlanner`](planner::RunPlanner) turns a selection of tree nodes into selectors for
//!    the build tool, using a [`TargetResolver`](target_resolver::TargetResolver) to find each
//!    node's build target.
//! 4. A [`TestRunner`](runner::TestRunner) invokes the build tool, parses its output line by
//!    line, and reports [`RunEvent`](reporter::RunEvent)s.
//!
//! [`TestExplorer`](explorer::TestExplorer) owns all of these for a workspace, and can keep the
//! tree up to date through a [`TestWatcher`](watch::TestWatcher).

pub mod config;
pub mod discovery;
pub mod errors;
pub mod explorer;
pub mod planner;
pub mod reporter;
pub mod runner;
pub mod signal;
pub mod target_resolver;
pub mod tree;
pub mod watch;
