//! SafeCommandExecutor: whitelisted, shell-free execution of pipeline commands
//!
//! # Security Features
//!
//! - **Whitelist-based validation**: Only the Python packaging toolchain can run
//! - **Injection prevention**: Programs are spawned directly, never through a shell
//! - **Argument sanitization**: Arguments passed as Vec, never interpolated into shell strings
//! - **Working directory validation**: Validates existence before execution
//! - **Timeout control**: Optional limit for hanging processes
//!
//! Child processes inherit stdin, stdout and stderr, so build and upload
//! output streams straight to the operator.
//!
//! # Example
//!
//! ```rust,no_run
//! use pypi_publisher::{SafeCommandExecutor, StepCommand};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let executor = SafeCommandExecutor::new(".")?;
//! let result = executor.execute(&StepCommand::new("twine", &["--version"])).await?;
//! println!("{} -> {}", result.command, result.success);
//! # Ok(())
//! # }
//! ```

use crate::core::traits::{CommandResult, CommandRunner, StepCommand};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// Allowed commands whitelist for security.
///
/// Only these programs can be executed via SafeCommandExecutor.
const ALLOWED_COMMANDS: &[&str] = &["rm", "python", "python3", "py", "pip", "twine", "uv"];

/// Errors that can occur during command execution
#[derive(Error, Debug)]
pub enum CommandError {
    /// Command is not in the allowed whitelist
    #[error("Command '{0}' is not in the allowed whitelist")]
    CommandNotAllowed(String),

    /// Working directory does not exist or is not accessible
    #[error("Working directory does not exist: {0}")]
    InvalidWorkingDirectory(PathBuf),

    /// Command execution failed (e.g., binary not found, permission denied)
    #[error("Command execution failed: {0}")]
    ExecutionFailed(String),

    /// Command exceeded the timeout duration
    #[error("Command timeout after {0:?}")]
    Timeout(Duration),
}

/// Safe command executor with security controls
#[derive(Debug)]
pub struct SafeCommandExecutor {
    /// Working directory where commands will be executed
    working_dir: PathBuf,
    /// Optional timeout for command execution
    timeout: Option<Duration>,
}

impl SafeCommandExecutor {
    /// Create a new SafeCommandExecutor with working directory validation.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::InvalidWorkingDirectory` if the directory does not exist.
    pub fn new<P: AsRef<Path>>(working_dir: P) -> Result<Self, CommandError> {
        let working_dir = working_dir.as_ref().to_path_buf();

        if !working_dir.is_dir() {
            return Err(CommandError::InvalidWorkingDirectory(working_dir));
        }

        Ok(Self {
            working_dir,
            timeout: None,
        })
    }

    /// Set command execution timeout.
    ///
    /// Commands exceeding this duration are killed.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = Some(timeout);
    }

    /// Execute a command and wait for it to exit.
    ///
    /// # Errors
    ///
    /// - `CommandError::CommandNotAllowed` - Program not in whitelist
    /// - `CommandError::ExecutionFailed` - Binary not found or execution error
    /// - `CommandError::Timeout` - Timeout elapsed before the process exited
    ///
    /// A process that runs and exits non-zero is not an error; it is
    /// reported through `CommandResult::success`.
    pub async fn execute(&self, command: &StepCommand) -> Result<CommandResult, CommandError> {
        if !ALLOWED_COMMANDS.contains(&command.program.as_str()) {
            return Err(CommandError::CommandNotAllowed(command.program.clone()));
        }

        tracing::debug!(
            command = %command,
            cwd = %self.working_dir.display(),
            "spawning command"
        );

        let mut child = Command::new(&command.program)
            .args(&command.args)
            .current_dir(&self.working_dir)
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CommandError::ExecutionFailed(format!("{}: {}", command.program, e)))?;

        let status = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, child.wait())
                .await
                .map_err(|_| CommandError::Timeout(timeout))?,
            None => child.wait().await,
        }
        .map_err(|e| CommandError::ExecutionFailed(e.to_string()))?;

        tracing::debug!(command = %command, code = ?status.code(), "command exited");

        Ok(CommandResult::from_exit_code(command, status.code()))
    }
}

#[async_trait]
impl CommandRunner for SafeCommandExecutor {
    async fn run(&self, command: &StepCommand) -> Result<CommandResult, CommandError> {
        self.execute(command).await
    }
}
