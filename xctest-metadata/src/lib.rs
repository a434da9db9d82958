// Copyright (c) The xctest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Structured access to the machine-readable output of the `xctest` test explorer.
//!
//! This crate contains the serializable data structures shared between the engine
//! (`xctest-runner`) and its consumers:
//!
//! * [`TestListSummary`] describes a discovered test tree, as printed by
//!   `xctest list --message-format json`.
//! * [`PackageDescription`] is the subset of `swift package describe --type json` needed to map a
//!   source path to a test target.
//! * [`XcTestExitCode`] documents the exit codes of the `xctest` binary.

mod exit_codes;
mod package;
mod test_list;

pub use exit_codes::*;
pub use package::*;
pub use test_list::*;
