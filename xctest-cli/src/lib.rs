// Copyright (c) The xctest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A test explorer for XCTest suites.
//!
//! `xctest` finds test classes and methods in a source tree, runs selections of them through the
//! build tool, and maps the tool's output back onto individual tests.

#![warn(missing_docs)]

mod dispatch;
mod errors;
mod output;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
#[doc(hidden)]
pub use output::OutputWriter;
