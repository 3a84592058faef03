//! Orchestration layer for package publishing
//!
//! This module provides the publish pipeline and the operator prompt it
//! uses before uploading.

pub mod package_publisher;
pub mod prompt;

// Re-export main types for convenience
pub use package_publisher::{PackagePublisher, PublishOutcome, PublishReport};
pub use prompt::{LinePrompter, is_affirmative};
