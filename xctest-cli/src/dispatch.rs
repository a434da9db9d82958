// Copyright (c) The xctest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    ExpectedError,
    errors::Result,
    output::{OutputContext, OutputOpts, OutputWriter},
};
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io::Write;
use tokio::runtime::Runtime;
use xctest_metadata::XcTestExitCode;
use xctest_runner::{
    config::XcTestConfig,
    explorer::TestExplorer,
    planner::Selection,
    reporter::{RunStatus, TestReporterBuilder},
    runner::RunOutcome,
    signal::{CancelFlag, cancel_on_ctrl_c},
    tree::{OutputFormat, SerializableFormat, TestId, TestTree},
};

/// A test explorer for XCTest suites.
///
/// Finds test classes and methods below the workspace root, and runs them through the build tool.
#[derive(Debug, Parser)]
#[command(version, bin_name = "xctest", max_term_width = 100)]
pub struct XcTestApp {
    #[clap(flatten)]
    common: CommonOpts,

    #[clap(subcommand)]
    command: Command,
}

impl XcTestApp {
    /// Initializes the output context.
    pub fn init_output(&self) -> OutputContext {
        self.common.output.init()
    }

    /// Executes the app.
    ///
    /// Returns the process exit code on success.
    pub fn exec(self, output: OutputContext, output_writer: &mut OutputWriter) -> Result<i32> {
        let config = self.common.load_config()?;
        match self.command {
            Command::List(opts) => opts.exec(config, output, output_writer),
            Command::Run(opts) => opts.exec(config, output, output_writer),
            Command::Watch(opts) => opts.exec(config, output, output_writer),
        }
    }
}

#[derive(Debug, Args)]
struct CommonOpts {
    /// Workspace root [default: the current directory]
    #[arg(long, global = true, value_name = "DIR")]
    workspace_root: Option<Utf8PathBuf>,

    /// Config file [default: <workspace-root>/.config/xctest.toml]
    #[arg(long, global = true, value_name = "PATH")]
    config_file: Option<Utf8PathBuf>,

    #[clap(flatten)]
    output: OutputOpts,
}

impl CommonOpts {
    fn load_config(&self) -> Result<XcTestConfig> {
        let workspace_root = match &self.workspace_root {
            Some(root) => root.clone(),
            None => {
                let dir = std::env::current_dir()
                    .map_err(|err| ExpectedError::CurrentDirFailed { err })?;
                Utf8PathBuf::try_from(dir).map_err(|err| {
                    ExpectedError::WorkspaceRootInvalidUtf8 {
                        path: err.into_path_buf(),
                    }
                })?
            }
        };
        if !workspace_root.is_dir() {
            return Err(ExpectedError::WorkspaceRootInvalid { workspace_root });
        }

        Ok(XcTestConfig::from_sources(
            workspace_root,
            self.config_file.as_deref(),
        )?)
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List tests found below the workspace root
    List(ListOpts),

    /// Run tests
    ///
    /// Tests are selected by id: `Domain:Category:Class.method`. Selecting a category or class
    /// runs every test below it. A bare domain can't be run on its own. With no ids, every test
    /// is run.
    Run(RunOpts),

    /// Watch test sources and keep the test list up to date
    Watch(WatchOpts),
}

#[derive(Debug, Args)]
struct ListOpts {
    /// Output format
    #[arg(long, value_enum, default_value_t, value_name = "FMT")]
    message_format: MessageFormat,
}

impl ListOpts {
    fn exec(
        self,
        config: XcTestConfig,
        output: OutputContext,
        output_writer: &mut OutputWriter,
    ) -> Result<i32> {
        let runtime = make_runtime()?;
        let mut explorer = TestExplorer::new(config);
        runtime.block_on(explorer.rescan());

        let format = self.message_format.to_output_format(output.verbose);
        write_tree(explorer.tree(), format, output, output_writer)?;
        Ok(XcTestExitCode::OK)
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, ValueEnum)]
enum MessageFormat {
    /// A human-readable tree
    #[default]
    Human,
    /// JSON with no whitespace
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

impl MessageFormat {
    fn to_output_format(self, verbose: bool) -> OutputFormat {
        match self {
            Self::Human => OutputFormat::Human { verbose },
            Self::Json => OutputFormat::Serializable(SerializableFormat::Json),
            Self::JsonPretty => OutputFormat::Serializable(SerializableFormat::JsonPretty),
        }
    }
}

/// Build tool settings that override the config.
#[derive(Debug, Default, Args)]
#[command(next_help_heading = "Build tool options")]
struct ExecutionOpts {
    /// Workspace to pass to the build tool
    #[arg(long, value_name = "PATH", conflicts_with = "project")]
    workspace: Option<String>,

    /// Project to pass to the build tool
    #[arg(long, value_name = "PATH")]
    project: Option<String>,

    /// Scheme to build and test
    #[arg(long, value_name = "NAME")]
    scheme: Option<String>,

    /// Destination to run tests on, e.g. `platform=macOS`
    #[arg(long, value_name = "SPEC")]
    destination: Option<String>,
}

impl ExecutionOpts {
    fn apply(self, config: &mut XcTestConfig) {
        let execution = config.execution_mut();
        if let Some(workspace) = self.workspace {
            execution.workspace = Some(workspace);
            execution.project = None;
        }
        if let Some(project) = self.project {
            execution.project = Some(project);
            execution.workspace = None;
        }
        if let Some(scheme) = self.scheme {
            execution.scheme = Some(scheme);
        }
        if let Some(destination) = self.destination {
            execution.destination = Some(destination);
        }
    }
}

#[derive(Debug, Args)]
struct RunOpts {
    /// Ids of the tests to run
    #[arg(value_name = "IDS")]
    ids: Vec<String>,

    #[clap(flatten)]
    execution: ExecutionOpts,
}

impl RunOpts {
    fn exec(
        self,
        mut config: XcTestConfig,
        output: OutputContext,
        output_writer: &mut OutputWriter,
    ) -> Result<i32> {
        self.execution.apply(&mut config);
        let selection = if self.ids.is_empty() {
            Selection::Everything
        } else {
            Selection::Ids(self.ids.into_iter().map(TestId::new).collect())
        };

        let runtime = make_runtime()?;
        let mut explorer = TestExplorer::new(config);
        runtime.block_on(async {
            explorer.rescan().await;
            let outcome = run_once(&mut explorer, &selection, output, output_writer).await?;
            if outcome.status.is_none() {
                tracing::warn!("no tests to run");
            }
            Ok::<_, ExpectedError>(final_exit_code(&outcome))
        })
    }
}

#[derive(Debug, Args)]
struct WatchOpts {
    /// Run every test after each change
    #[arg(long)]
    run: bool,

    #[clap(flatten)]
    execution: ExecutionOpts,
}

impl WatchOpts {
    fn exec(
        self,
        mut config: XcTestConfig,
        output: OutputContext,
        output_writer: &mut OutputWriter,
    ) -> Result<i32> {
        let run = self.run;
        self.execution.apply(&mut config);
        let debounce = config.watch().debounce;

        let runtime = make_runtime()?;
        let mut explorer = TestExplorer::new(config);
        runtime.block_on(async {
            explorer.rescan().await;
            log_tree_summary(explorer.tree());
            let mut watcher = explorer.watcher()?;
            tracing::info!(
                "watching `{}` for changes (debounce: {})",
                explorer.config().test_root(),
                humantime::format_duration(debounce),
            );
            if run {
                run_once(&mut explorer, &Selection::Everything, output, output_writer).await?;
            }

            loop {
                tokio::select! {
                    batch = watcher.next_batch(debounce) => {
                        let Some(batch) = batch else {
                            break;
                        };
                        let tree = explorer.apply_changes(&batch).await;
                        log_tree_summary(tree);
                        if run {
                            run_once(&mut explorer, &Selection::Everything, output, output_writer)
                                .await?;
                        }
                    }
                    _ = tokio::signal::ctrl_c() => break,
                }
            }
            Ok::<_, ExpectedError>(XcTestExitCode::OK)
        })
    }
}

/// Runs `selection` once, rendering events to stderr. Ctrl-C cancels the run.
async fn run_once(
    explorer: &mut TestExplorer,
    selection: &Selection,
    output: OutputContext,
    output_writer: &mut OutputWriter,
) -> Result<RunOutcome> {
    let mut reporter = TestReporterBuilder::default()
        .set_verbose(output.verbose)
        .set_colorize(output.color.should_colorize(supports_color::Stream::Stderr))
        .build();

    let cancel = CancelFlag::new();
    let ctrl_c = cancel_on_ctrl_c(cancel.clone());

    let mut stderr = output_writer.stderr_writer();
    let mut write_error = None;
    let outcome = explorer
        .run(selection, &cancel, |event| {
            if write_error.is_some() {
                return;
            }
            let res = reporter
                .report_event(&event, &mut stderr)
                .and_then(|()| stderr.flush().map_err(Into::into));
            if let Err(err) = res {
                write_error = Some(err);
            }
        })
        .await;
    ctrl_c.abort();

    match write_error {
        Some(err) => Err(ExpectedError::WriteEventError { err }),
        None => Ok(outcome),
    }
}

fn final_exit_code(outcome: &RunOutcome) -> i32 {
    match outcome.status {
        None => XcTestExitCode::NO_TESTS_RUN,
        Some(RunStatus::Passed) => XcTestExitCode::OK,
        Some(RunStatus::Failed) if outcome.stats.execution_failed => {
            XcTestExitCode::EXECUTION_FAILED
        }
        Some(RunStatus::Failed) => XcTestExitCode::TEST_RUN_FAILED,
        Some(RunStatus::Skipped) => XcTestExitCode::RUN_INCOMPLETE,
    }
}

fn write_tree(
    tree: &TestTree,
    format: OutputFormat,
    output: OutputContext,
    output_writer: &mut OutputWriter,
) -> Result<()> {
    let colorize = output.color.should_colorize(supports_color::Stream::Stdout);
    let mut writer = output_writer.stdout_writer();
    tree.write(format, &mut writer, colorize)?;
    if matches!(format, OutputFormat::Serializable(_)) {
        writeln!(writer).map_err(|err| ExpectedError::WriteOutputError { err })?;
    }
    writer
        .flush()
        .map_err(|err| ExpectedError::WriteOutputError { err })
}

fn log_tree_summary(tree: &TestTree) {
    let files = tree.files().len();
    tracing::info!(
        "found {} tests in {} classes across {files} {}",
        tree.test_count(),
        tree.class_count(),
        if files == 1 { "file" } else { "files" },
    );
}

fn make_runtime() -> Result<Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| ExpectedError::TokioRuntimeCreateError { err })
}
