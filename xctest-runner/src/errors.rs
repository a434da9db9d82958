// Copyright (c) The xctest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by xctest.
//!
//! Most failures inside the engine are recoverable and never show up here: unreadable source files
//! are skipped during discovery, and unresolvable targets are reported as skipped nodes. The types
//! in this module cover setup failures and the transport errors of external commands.

use camino::Utf8PathBuf;
use config::ConfigError;
use std::{error, fmt};
use thiserror::Error;

/// Displays an error along with its chain of sources, one per line.
#[derive(Clone, Debug)]
pub struct DisplayErrorChain<E> {
    error: E,
}

impl<E: error::Error> DisplayErrorChain<E> {
    /// Creates a new `DisplayErrorChain`.
    pub fn new(error: E) -> Self {
        Self { error }
    }
}

impl<E: error::Error> fmt::Display for DisplayErrorChain<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        let mut source = self.error.source();
        if source.is_some() {
            write!(f, "\n  caused by:")?;
        }
        while let Some(error) = source {
            write!(f, "\n  - {error}")?;
            source = error.source();
        }
        Ok(())
    }
}

/// An error that occurred while parsing the config.
#[derive(Debug, Error)]
#[error("failed to parse xctest config at `{config_file}`")]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Utf8PathBuf,
    #[source]
    err: ConfigError,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, err: ConfigError) -> Self {
        Self {
            config_file: config_file.into(),
            err,
        }
    }

    /// Returns the config file for this error.
    pub fn config_file(&self) -> &Utf8PathBuf {
        &self.config_file
    }
}

/// An error that occurs while querying package metadata for a directory.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DescribePackageError {
    /// The describe command was not configured.
    #[error("no package describe command configured")]
    NoCommand,

    /// The describe command could not be executed.
    #[error("running `{command}` in `{dir}` failed")]
    Exec {
        /// The command that was run.
        command: String,

        /// The directory the command was run in.
        dir: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// The describe command exited with a failure.
    #[error("`{command}` in `{dir}` exited with {}", display_exit_code(.exit_code))]
    CommandFailed {
        /// The command that was run.
        command: String,

        /// The directory the command was run in.
        dir: Utf8PathBuf,

        /// The exit code, if the process was not terminated by a signal.
        exit_code: Option<i32>,

        /// Standard error produced by the command.
        stderr: String,
    },

    /// The output of the describe command was not valid JSON.
    #[error("parsing package description for `{dir}` failed")]
    Json {
        /// The directory the command was run in.
        dir: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: serde_json::Error,
    },
}

/// An error that occurs while executing the external build tool.
///
/// Execution errors never abort the host: they abort the current run, and every test that had not
/// reported a result is marked as failed.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExecuteError {
    /// The process could not be spawned.
    #[error("failed to start `{command}`")]
    Spawn {
        /// The command line that failed to start.
        command: String,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// Reading output from the process failed.
    #[error("failed to read output of `{command}`")]
    ReadOutput {
        /// The command line that was running.
        command: String,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// Waiting for the process to exit failed.
    #[error("failed to wait for `{command}` to exit")]
    Wait {
        /// The command line that was running.
        command: String,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },
}

/// An error that occurs while setting up a file system watcher.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WatchError {
    /// Creating the platform watcher failed.
    #[error("failed to create file system watcher")]
    Create {
        /// The underlying error.
        #[source]
        error: notify::Error,
    },

    /// Registering a directory with the watcher failed.
    #[error("failed to watch `{path}`")]
    Watch {
        /// The directory that could not be watched.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: notify::Error,
    },
}

/// An error that occurs while writing list output.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WriteTestListError {
    /// An error occurred while writing the list to the provided output.
    #[error("error writing to output")]
    Io(#[source] std::io::Error),

    /// An error occurred while serializing JSON, or while writing it to the provided output.
    #[error("error serializing to JSON")]
    Json(#[source] serde_json::Error),
}

/// An error that occurs while writing a run event.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WriteEventError {
    /// An error occurred while writing the event to the provided output.
    #[error("error writing to output")]
    Io(#[from] std::io::Error),
}

fn display_exit_code(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("exit code {code}"),
        None => "a signal".to_owned(),
    }
}
