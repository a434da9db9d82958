// Copyright (c) The xctest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration support for xctest.
//!
//! The embedded [default config](XcTestConfig::DEFAULT_CONFIG) is always loaded first, and a
//! repository config (`.config/xctest.toml`, or a file passed in explicitly) is layered on top.

use crate::errors::ConfigParseError;
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, ConfigBuilder, File, FileFormat, builder::DefaultState};
use serde::Deserialize;
use std::time::Duration;

/// Overall configuration for xctest.
#[derive(Clone, Debug)]
pub struct XcTestConfig {
    workspace_root: Utf8PathBuf,
    inner: XcTestConfigImpl,
}

impl XcTestConfig {
    /// The default location of the config within the workspace root: `.config/xctest.toml`.
    pub const CONFIG_PATH: &'static str = ".config/xctest.toml";

    /// Contains the default config as a TOML file.
    ///
    /// Repository-specific configuration is layered on top of the default config.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// Reads the xctest config from the given file, or if not specified from
    /// `.config/xctest.toml` in the workspace root.
    ///
    /// If no config file is specified and the workspace root doesn't have `.config/xctest.toml`,
    /// uses the default config options.
    pub fn from_sources(
        workspace_root: impl Into<Utf8PathBuf>,
        config_file: Option<&Utf8Path>,
    ) -> Result<Self, ConfigParseError> {
        let workspace_root = workspace_root.into();
        let (config_file, source) = match config_file {
            Some(file) => (file.to_owned(), File::new(file.as_str(), FileFormat::Toml)),
            None => {
                let config_file = workspace_root.join(Self::CONFIG_PATH);
                let source = File::new(config_file.as_str(), FileFormat::Toml).required(false);
                (config_file, source)
            }
        };

        let inner = Self::make_default_config()
            .add_source(source)
            .build()
            .and_then(|config| config.try_deserialize())
            .map_err(|err| ConfigParseError::new(config_file, err))?;

        Ok(Self {
            workspace_root,
            inner,
        })
    }

    /// Returns the default xctest config.
    pub fn default_config(workspace_root: impl Into<Utf8PathBuf>) -> Self {
        let inner = Self::make_default_config()
            .build()
            .and_then(|config| config.try_deserialize())
            .expect("default config is always valid");
        Self {
            workspace_root: workspace_root.into(),
            inner,
        }
    }

    /// Returns the workspace root this config was read for.
    pub fn workspace_root(&self) -> &Utf8Path {
        &self.workspace_root
    }

    /// Returns the directory that test sources are discovered in.
    pub fn test_root(&self) -> Utf8PathBuf {
        // Collecting components drops `.` segments, so the default root is the workspace root.
        self.workspace_root
            .join(&self.inner.discovery.test_root)
            .components()
            .collect()
    }

    /// Returns discovery settings.
    pub fn discovery(&self) -> &DiscoveryConfig {
        &self.inner.discovery
    }

    /// Returns target resolution settings.
    pub fn resolution(&self) -> &ResolutionConfig {
        &self.inner.resolution
    }

    /// Returns execution settings.
    pub fn execution(&self) -> &ExecutionConfig {
        &self.inner.execution
    }

    /// Returns mutable execution settings, for command-line overrides.
    pub fn execution_mut(&mut self) -> &mut ExecutionConfig {
        &mut self.inner.execution
    }

    /// Returns watch-mode settings.
    pub fn watch(&self) -> &WatchConfig {
        &self.inner.watch
    }

    // ---
    // Helper methods
    // ---

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct XcTestConfigImpl {
    discovery: DiscoveryConfig,
    resolution: ResolutionConfig,
    execution: ExecutionConfig,
    watch: WatchConfig,
}

/// Settings controlling how test sources are discovered.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct DiscoveryConfig {
    /// The directory containing test sources, relative to the workspace root.
    pub test_root: Utf8PathBuf,

    /// The extension of test source files, without the leading dot.
    pub file_extension: String,

    /// The base type that marks a class as a test class.
    pub base_test_type: String,

    /// The prefix that marks a method as a test method.
    pub test_method_prefix: String,
}

/// Settings controlling how source paths are mapped to build targets.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ResolutionConfig {
    /// The name of a package manifest file.
    pub manifest_file: String,

    /// The command (program followed by arguments) that prints a package description as JSON.
    pub describe_command: Vec<String>,

    /// The directory name whose following path segment names the build target.
    pub tests_directory_name: String,
}

/// Settings controlling how the build tool is invoked.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ExecutionConfig {
    /// The program to run.
    pub command: String,

    /// The build action, e.g. `test` or `test-without-building`.
    pub action: String,

    /// The workspace to pass in as `-workspace`.
    #[serde(default)]
    pub workspace: Option<String>,

    /// The project to pass in as `-project`.
    #[serde(default)]
    pub project: Option<String>,

    /// The scheme to pass in as `-scheme`.
    #[serde(default)]
    pub scheme: Option<String>,

    /// The destination to pass in as `-destination`.
    #[serde(default)]
    pub destination: Option<String>,

    /// Extra arguments passed before the test selectors.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

/// Settings for watch mode.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct WatchConfig {
    /// The window within which file system events are coalesced.
    #[serde(with = "humantime_serde")]
    pub debounce: Duration,
}
