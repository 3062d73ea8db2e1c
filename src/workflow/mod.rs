pub mod quiz_session;
pub mod settings_debounce;

pub use quiz_session::{
    flush_settings_after_quiet, ApplyResult, GenerationTicket, QuizPhase, QuizSession,
};
pub use settings_debounce::{SettingsDebouncer, SETTINGS_DEBOUNCE_MS};
