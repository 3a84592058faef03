//! Manifest Validator - Reads package metadata from pyproject.toml
//!
//! The publish pipeline only requires the manifest to exist. The metadata read
//! here (name, version) feeds console messages and the install hint, so an
//! unreadable manifest yields warnings rather than errors.
//!
//! # Example
//!
//! ```no_run
//! use pypi_publisher::validation::ManifestValidator;
//! use std::path::Path;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let validator = ManifestValidator::new();
//! let result = validator.validate(Path::new("pyproject.toml")).await?;
//!
//! if let Some(name) = result.metadata.name {
//!     println!("pip install {}", name);
//! }
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

/// Result of manifest validation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    /// List of validation warnings
    pub warnings: Vec<String>,
    /// Metadata that could be extracted
    pub metadata: ManifestMetadata,
}

/// Metadata extracted from manifest
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestMetadata {
    pub name: Option<String>,
    pub version: Option<String>,
}

/// Validator for pyproject.toml files
pub struct ManifestValidator;

impl Default for ManifestValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl ManifestValidator {
    pub fn new() -> Self {
        Self
    }

    /// Read and inspect a manifest file
    ///
    /// # Errors
    ///
    /// Only I/O errors are returned; malformed content becomes warnings.
    pub async fn validate(&self, path: &Path) -> anyhow::Result<ValidationResult> {
        let content = fs::read_to_string(path).await?;
        Ok(self.validate_pyproject(&content))
    }

    /// Inspect pyproject.toml content
    ///
    /// `[project]` (PEP 621) takes precedence over `[tool.poetry]`.
    pub fn validate_pyproject(&self, content: &str) -> ValidationResult {
        let mut warnings = Vec::new();

        let parsed: toml::Value = match toml::from_str(content) {
            Ok(v) => v,
            Err(e) => {
                warnings.push(format!("Invalid TOML: {}", e));
                return ValidationResult {
                    warnings,
                    metadata: ManifestMetadata::default(),
                };
            }
        };

        let project = parsed.get("project");
        let poetry = parsed.get("tool").and_then(|t| t.get("poetry"));

        if project.is_none() && poetry.is_none() {
            warnings.push("Missing [project] section".to_string());
        }

        let field = |key: &str| {
            [project, poetry]
                .into_iter()
                .flatten()
                .find_map(|table| table.get(key).and_then(|v| v.as_str()))
                .map(String::from)
        };

        let name = field("name");
        let version = field("version");

        if project.is_some() && name.is_none() {
            warnings.push("Missing field: project.name".to_string());
        }
        if version.is_none() {
            let dynamic_version = project
                .and_then(|p| p.get("dynamic"))
                .and_then(|d| d.as_array())
                .is_some_and(|d| d.iter().any(|v| v.as_str() == Some("version")));
            if !dynamic_version {
                warnings.push("Missing field: project.version".to_string());
            }
        }

        ValidationResult {
            warnings,
            metadata: ManifestMetadata { name, version },
        }
    }
}
