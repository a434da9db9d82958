// Copyright (c) The xctest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The test runner.
//!
//! The main structure in this module is [`TestRunner`]. It plans a run, invokes the build tool
//! through a [`TestCommandRunner`], feeds its output to an [`OutputParser`], and reports
//! [`RunEvent`](crate::reporter::RunEvent)s as tests start and finish.

mod aggregator;
mod command;
mod context;
mod imp;
mod parser;

pub use aggregator::{RunStats, roll_up};
pub use command::*;
pub use context::*;
pub use imp::*;
pub use parser::*;

#[cfg(test)]
pub(crate) use context::test_helpers;
