// Copyright (c) The xctest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reporting run events.
//!
//! A [`TestRunner`](crate::runner::TestRunner) describes everything that happens during a run as
//! a stream of [`RunEvent`]s. [`TestReporter`] renders them for a terminal.

mod displayer;
mod events;

pub use displayer::*;
pub use events::*;
