pub mod command_executor;

pub use command_executor::{CommandError, SafeCommandExecutor};
