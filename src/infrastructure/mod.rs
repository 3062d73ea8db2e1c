pub mod cli_runner;

pub use cli_runner::{CliRunner, ResponseType, ToolOutput};
