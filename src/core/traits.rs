//! Core traits and types for package publishing
//!
//! This module defines the seams of the publish pipeline: how step commands
//! are executed and how the operator is asked for confirmation.

use crate::security::command_executor::CommandError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Steps
// ============================================================================

/// Pipeline step, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishStep {
    Clean,
    Build,
    Check,
    Upload,
}

impl PublishStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clean => "clean",
            Self::Build => "build",
            Self::Check => "check",
            Self::Upload => "upload",
        }
    }

    /// Whether a failure of this step aborts the pipeline.
    ///
    /// Clean targets may not exist on a first run, so clean is never checked.
    pub fn is_checked(&self) -> bool {
        !matches!(self, Self::Clean)
    }
}

// ============================================================================
// Commands
// ============================================================================

/// An external command: program plus arguments, never interpreted by a shell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl StepCommand {
    pub fn new<S: Into<String>>(program: S, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Return a copy with extra arguments appended
    pub fn with_args<I, S>(&self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut command = self.clone();
        command.args.extend(extra.into_iter().map(Into::into));
        command
    }
}

impl fmt::Display for StepCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Outcome of one executed command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    /// Human-readable command line
    pub command: String,
    /// True only for a zero exit status
    pub success: bool,
    /// Exit code, if the process exited normally
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
}

impl CommandResult {
    pub fn from_exit_code(command: &StepCommand, exit_code: Option<i32>) -> Self {
        Self {
            command: command.to_string(),
            success: exit_code == Some(0),
            exit_code,
        }
    }

    /// Short description of the exit status for error messages
    pub fn status_detail(&self) -> String {
        match self.exit_code {
            Some(code) => format!("exit status {}", code),
            None => "terminated by signal".to_string(),
        }
    }
}

// ============================================================================
// Seams
// ============================================================================

/// Executes step commands
///
/// Implementations block (asynchronously) until the command has exited.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &StepCommand) -> Result<CommandResult, CommandError>;
}

/// Asks the operator a yes/no question
#[async_trait]
pub trait Prompter: Send + Sync {
    /// Returns true only for an affirmative answer
    async fn confirm(&self, message: &str) -> std::io::Result<bool>;
}
