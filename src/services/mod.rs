pub mod pdf_validator;
pub mod prompt_builder;
pub mod settings_store;
pub mod tool_discovery;

pub use pdf_validator::{validate_and_stage, StagedPdf};
pub use settings_store::SettingsStore;
pub use tool_discovery::{CliLocator, CliStatus};
