pub mod core;
pub mod orchestration;
pub mod security;
pub mod validation;

pub use self::core::*;
pub use orchestration::{LinePrompter, PackagePublisher, PublishOutcome, PublishReport};
pub use security::{CommandError, SafeCommandExecutor};
