// Copyright (c) The xctest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The test tree: domains, categories, classes and methods, addressed by [`TestId`].

mod output_format;
mod test_id;
mod test_tree;

pub use output_format::*;
pub use test_id::*;
pub use test_tree::*;
