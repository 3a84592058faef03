pub mod manifest_validator;

pub use manifest_validator::{ManifestMetadata, ManifestValidator, ValidationResult};
