// Copyright (c) The xctest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Documented exit codes for `xctest` failures.
///
/// `xctest` runs may fail for a variety of reasons. This structure documents the exit codes that
/// may occur in case of expected failures.
///
/// Unknown/unexpected failures will always result in exit code 1.
pub enum XcTestExitCode {}

impl XcTestExitCode {
    /// No errors occurred and xctest exited normally.
    pub const OK: i32 = 0;

    /// No tests were selected to run, but no other errors occurred.
    pub const NO_TESTS_RUN: i32 = 4;

    /// One or more tests failed.
    pub const TEST_RUN_FAILED: i32 = 100;

    /// The build tool could not be started, or exited before producing any test output.
    pub const EXECUTION_FAILED: i32 = 101;

    /// No test failed, but some selected tests never reported a result (for example because the
    /// run was cancelled, or the tests were skipped).
    pub const RUN_INCOMPLETE: i32 = 102;

    /// A user issue happened while setting up an xctest invocation.
    pub const SETUP_ERROR: i32 = 96;

    /// Writing data to stdout or stderr produced an error.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;
}
