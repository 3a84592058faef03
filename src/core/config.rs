//! Configuration structures and types for pypi-publisher
//!
//! Every field is optional so that layers (global file, project file,
//! environment, CLI) can be merged; accessors supply the defaults.

use crate::core::traits::{PublishStep, StepCommand};
use serde::{Deserialize, Serialize};

/// Default package manifest checked before anything runs
pub const DEFAULT_MANIFEST: &str = "pyproject.toml";

/// Default directory the build step writes archives to
pub const DEFAULT_DIST_DIR: &str = "dist";

/// Registry name shown when no repository is configured
pub const DEFAULT_REGISTRY: &str = "PyPI";

/// Root configuration object
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PublishConfig {
    /// Base configuration file, relative to the including file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,

    /// Manifest file that marks the project root (default: pyproject.toml)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest: Option<String>,

    /// Build output directory (default: dist)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dist_dir: Option<String>,

    /// Package name for the install hint (auto-detected from the manifest)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,

    /// twine repository name (e.g. testpypi); PyPI when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,

    /// Ask before uploading (default: true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirm: Option<bool>,

    /// Per-command timeout in seconds (default: none)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Step command overrides
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commands: Option<CommandsConfig>,
}

/// Command overrides for each pipeline step
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CommandsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clean: Option<StepCommand>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<StepCommand>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub check: Option<StepCommand>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload: Option<StepCommand>,
}

impl CommandsConfig {
    fn get(&self, step: PublishStep) -> Option<&StepCommand> {
        match step {
            PublishStep::Clean => self.clean.as_ref(),
            PublishStep::Build => self.build.as_ref(),
            PublishStep::Check => self.check.as_ref(),
            PublishStep::Upload => self.upload.as_ref(),
        }
    }

    pub(crate) fn steps_mut(&mut self) -> [&mut Option<StepCommand>; 4] {
        [
            &mut self.clean,
            &mut self.build,
            &mut self.check,
            &mut self.upload,
        ]
    }
}

/// Built-in command for a step
///
/// Clean removes `dist_dir` along with `build/`.
pub fn default_command(step: PublishStep, dist_dir: &str) -> StepCommand {
    match step {
        PublishStep::Clean => {
            let dist = format!("{}/", dist_dir.trim_end_matches('/'));
            StepCommand::new("rm", &["-rf", dist.as_str(), "build/"])
        }
        PublishStep::Build => StepCommand::new("python", &["-m", "build"]),
        PublishStep::Check => StepCommand::new("twine", &["check"]),
        PublishStep::Upload => StepCommand::new("twine", &["upload"]),
    }
}

impl PublishConfig {
    /// Configuration with every field filled in with its default
    pub fn with_defaults() -> Self {
        Self {
            extends: None,
            manifest: Some(DEFAULT_MANIFEST.to_string()),
            dist_dir: Some(DEFAULT_DIST_DIR.to_string()),
            package_name: None,
            repository: None,
            confirm: Some(true),
            timeout_secs: None,
            commands: Some(CommandsConfig {
                clean: Some(default_command(PublishStep::Clean, DEFAULT_DIST_DIR)),
                build: Some(default_command(PublishStep::Build, DEFAULT_DIST_DIR)),
                check: Some(default_command(PublishStep::Check, DEFAULT_DIST_DIR)),
                upload: Some(default_command(PublishStep::Upload, DEFAULT_DIST_DIR)),
            }),
        }
    }

    pub fn manifest(&self) -> &str {
        self.manifest.as_deref().unwrap_or(DEFAULT_MANIFEST)
    }

    pub fn dist_dir(&self) -> &str {
        self.dist_dir.as_deref().unwrap_or(DEFAULT_DIST_DIR)
    }

    pub fn confirm(&self) -> bool {
        self.confirm.unwrap_or(true)
    }

    /// Name of the registry used in console messages
    pub fn registry_name(&self) -> &str {
        self.repository.as_deref().unwrap_or(DEFAULT_REGISTRY)
    }

    /// Command configured for a step, or the built-in one for `dist_dir()`
    pub fn command(&self, step: PublishStep) -> StepCommand {
        self.commands
            .as_ref()
            .and_then(|c| c.get(step))
            .cloned()
            .unwrap_or_else(|| default_command(step, self.dist_dir()))
    }
}
