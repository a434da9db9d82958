// Copyright (c) The xctest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{NO_HEADING, StderrStyles};
use camino::Utf8PathBuf;
use owo_colors::OwoColorize;
use std::{error::Error, path::PathBuf};
use thiserror::Error;
use xctest_metadata::XcTestExitCode;
use xctest_runner::errors::*;

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

// The #[error()] strings are mostly placeholders: errors are expected to be printed with
// display_to_stderr, which colorizes them.

/// An error that xctest expects to be able to hit, as opposed to a bug.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("could not determine the current directory")]
    CurrentDirFailed {
        #[source]
        err: std::io::Error,
    },
    #[error("workspace root is not valid UTF-8")]
    WorkspaceRootInvalidUtf8 { path: PathBuf },
    #[error("workspace root is invalid")]
    WorkspaceRootInvalid { workspace_root: Utf8PathBuf },
    #[error("config parse error")]
    ConfigParseError {
        #[from]
        err: ConfigParseError,
    },
    #[error("failed to create tokio runtime")]
    TokioRuntimeCreateError {
        #[source]
        err: std::io::Error,
    },
    #[error("failed to set up file watcher")]
    WatchError {
        #[from]
        err: WatchError,
    },
    #[error("failed to write test list")]
    WriteTestListError {
        #[from]
        err: WriteTestListError,
    },
    #[error("failed to write event")]
    WriteEventError {
        #[from]
        err: WriteEventError,
    },
    #[error("failed to write output")]
    WriteOutputError {
        #[source]
        err: std::io::Error,
    },
}

impl ExpectedError {
    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::CurrentDirFailed { .. }
            | Self::WorkspaceRootInvalidUtf8 { .. }
            | Self::WorkspaceRootInvalid { .. }
            | Self::ConfigParseError { .. }
            | Self::TokioRuntimeCreateError { .. }
            | Self::WatchError { .. } => XcTestExitCode::SETUP_ERROR,
            Self::WriteTestListError { .. }
            | Self::WriteEventError { .. }
            | Self::WriteOutputError { .. } => XcTestExitCode::WRITE_OUTPUT_ERROR,
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match &self {
            Self::CurrentDirFailed { err } => {
                tracing::error!("could not determine the current directory");
                Some(err as &dyn Error)
            }
            Self::WorkspaceRootInvalidUtf8 { path } => {
                tracing::error!(
                    "workspace root `{}` is not valid UTF-8",
                    path.display().style(styles.bold)
                );
                None
            }
            Self::WorkspaceRootInvalid { workspace_root } => {
                tracing::error!(
                    "workspace root `{}` is not a directory",
                    workspace_root.style(styles.bold)
                );
                tracing::info!(
                    "{}",
                    "(hint: pass in an existing directory with --workspace-root)"
                        .style(styles.warning_text)
                );
                None
            }
            Self::ConfigParseError { err } => {
                tracing::error!(
                    "failed to parse config file at `{}`",
                    err.config_file().style(styles.bold)
                );
                err.source()
            }
            Self::TokioRuntimeCreateError { err } => {
                tracing::error!("failed to create tokio runtime");
                Some(err as &dyn Error)
            }
            Self::WatchError { err } => {
                tracing::error!("{err}");
                err.source()
            }
            Self::WriteTestListError { err } => {
                tracing::error!("failed to write test list to output");
                Some(err as &dyn Error)
            }
            Self::WriteEventError { err } => {
                tracing::error!("failed to write run event to output");
                Some(err as &dyn Error)
            }
            Self::WriteOutputError { err } => {
                tracing::error!("failed to write output");
                Some(err as &dyn Error)
            }
        };

        while let Some(err) = next_error {
            tracing::error!(target: NO_HEADING, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}
