// Copyright (c) The xctest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{config::ExecutionConfig, errors::ExecuteError, planner::TestSelector};
use async_trait::async_trait;
use camino::Utf8PathBuf;
use std::{fmt, process::Stdio};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

/// A fully specified invocation of the build tool.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandSpec {
    /// The program to run.
    pub program: String,

    /// Arguments to the program.
    pub args: Vec<String>,

    /// The working directory.
    pub cwd: Utf8PathBuf,
}

impl CommandSpec {
    /// Builds the build tool invocation for the given selectors:
    ///
    /// ```text
    /// <command> <action> [-workspace W | -project P] [-scheme S] [-destination D]
    ///     <extra args...> -only-testing:<selector>...
    /// ```
    pub fn for_selectors(
        config: &ExecutionConfig,
        cwd: impl Into<Utf8PathBuf>,
        selectors: &[TestSelector],
    ) -> Self {
        let mut args = vec![config.action.clone()];
        if let Some(workspace) = &config.workspace {
            args.extend(["-workspace".to_owned(), workspace.clone()]);
        } else if let Some(project) = &config.project {
            args.extend(["-project".to_owned(), project.clone()]);
        }
        if let Some(scheme) = &config.scheme {
            args.extend(["-scheme".to_owned(), scheme.clone()]);
        }
        if let Some(destination) = &config.destination {
            args.extend(["-destination".to_owned(), destination.clone()]);
        }
        args.extend(config.extra_args.iter().cloned());
        args.extend(
            selectors
                .iter()
                .map(|selector| format!("-only-testing:{selector}")),
        );

        Self {
            program: config.command.clone(),
            args,
            cwd: cwd.into(),
        }
    }

    /// Returns the command line, quoted for a shell.
    pub fn to_shell_string(&self) -> String {
        shell_words::join(std::iter::once(&self.program).chain(&self.args))
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_shell_string())
    }
}

/// How the build tool exited.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CommandExit {
    /// The exit code, or `None` if the process was terminated by a signal.
    pub code: Option<i32>,
}

impl CommandExit {
    /// Returns true if the process exited with code 0.
    pub fn success(self) -> bool {
        self.code == Some(0)
    }
}

/// Runs the build tool, reporting each line of output as it arrives.
#[async_trait(?Send)]
pub trait TestCommandRunner: fmt::Debug {
    /// Runs `command`, calling `on_line` for each line written to standard output or standard
    /// error, in arrival order and without trailing newlines.
    async fn run(
        &self,
        command: &CommandSpec,
        on_line: &mut dyn for<'a> FnMut(&'a str),
    ) -> Result<CommandExit, ExecuteError>;
}

/// A [`TestCommandRunner`] that spawns a child process.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessCommandRunner;

#[async_trait(?Send)]
impl TestCommandRunner for ProcessCommandRunner {
    async fn run(
        &self,
        command: &CommandSpec,
        on_line: &mut dyn for<'a> FnMut(&'a str),
    ) -> Result<CommandExit, ExecuteError> {
        let command_str = command.to_shell_string();
        tracing::debug!("running `{command_str}` in `{}`", command.cwd);

        let mut child = tokio::process::Command::new(&command.program)
            .args(&command.args)
            .current_dir(&command.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|error| ExecuteError::Spawn {
                command: command_str.clone(),
                error,
            })?;

        let streams = child.stdout.take().zip(child.stderr.take());
        if let Some((stdout, stderr)) = streams {
            forward_lines(BufReader::new(stdout), BufReader::new(stderr), on_line)
                .await
                .map_err(|error| ExecuteError::ReadOutput {
                    command: command_str.clone(),
                    error,
                })?;
        }

        let status = child.wait().await.map_err(|error| ExecuteError::Wait {
            command: command_str,
            error,
        })?;
        Ok(CommandExit {
            code: status.code(),
        })
    }
}

/// Reads both streams to completion, forwarding complete lines as soon as either stream produces
/// one.
async fn forward_lines(
    mut stdout: impl AsyncBufRead + Unpin,
    mut stderr: impl AsyncBufRead + Unpin,
    on_line: &mut dyn FnMut(&str),
) -> std::io::Result<()> {
    // Partial lines are kept in these buffers across select! iterations.
    let mut out_buf = Vec::new();
    let mut err_buf = Vec::new();
    let mut out_done = false;
    let mut err_done = false;

    while !out_done || !err_done {
        tokio::select! {
            res = stdout.read_until(b'\n', &mut out_buf), if !out_done => {
                out_done = res? == 0;
                emit_line(&mut out_buf, on_line);
            }
            res = stderr.read_until(b'\n', &mut err_buf), if !err_done => {
                err_done = res? == 0;
                emit_line(&mut err_buf, on_line);
            }
        }
    }

    Ok(())
}

fn emit_line(buf: &mut Vec<u8>, on_line: &mut dyn FnMut(&str)) {
    if buf.is_empty() {
        return;
    }
    let line = String::from_utf8_lossy(buf);
    on_line(line.trim_end_matches(['\r', '\n']));
    buf.clear();
}
