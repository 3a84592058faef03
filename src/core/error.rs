//! Error handling for package publishing
//!
//! This module provides the error taxonomy of the publish pipeline with
//! recovery guidance, using the thiserror crate for ergonomic error handling.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for package publishing operations
#[derive(Error, Debug)]
pub enum PublishError {
    // Precondition errors
    #[error("{} not found. Run this command from the project root.", manifest.display())]
    ManifestNotFound { manifest: PathBuf },

    // Tool failures
    #[error("Build failed! ({detail})")]
    BuildFailed { detail: String },

    #[error("Package check failed! ({detail})")]
    CheckFailed { detail: String },

    #[error("[{registry}] Upload failed! ({detail})")]
    UploadFailed { registry: String, detail: String },

    // Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // Interaction errors
    #[error("Failed to read confirmation: {0}")]
    PromptFailed(String),
}

impl PublishError {
    /// Get suggested actions for this error
    pub fn suggested_actions(&self) -> Vec<&'static str> {
        match self {
            Self::ManifestNotFound { .. } => vec![
                "Run the command from the directory containing pyproject.toml",
                "Or pass the project path as an argument",
            ],
            Self::BuildFailed { .. } => vec![
                "Check the build output above",
                "Make sure the build package is installed (pip install build)",
            ],
            Self::CheckFailed { .. } => vec![
                "Fix the metadata problems reported by twine check",
                "Make sure twine is installed (pip install twine)",
            ],
            Self::UploadFailed { .. } => vec![
                "Check your registry credentials (~/.pypirc or TWINE_* variables)",
                "A version that already exists on the registry cannot be re-uploaded",
                "The built archives were kept in the dist directory",
            ],
            Self::ConfigError(_) => vec!["Check .publish-config.yaml for syntax errors"],
            Self::PromptFailed(_) => vec!["Use --yes to skip the confirmation prompt"],
        }
    }

    /// Get error code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::ManifestNotFound { .. } => "MANIFEST_NOT_FOUND",
            Self::BuildFailed { .. } => "BUILD_FAILED",
            Self::CheckFailed { .. } => "CHECK_FAILED",
            Self::UploadFailed { .. } => "UPLOAD_FAILED",
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::PromptFailed(_) => "PROMPT_FAILED",
        }
    }
}
