pub mod demo;
pub mod question;
pub mod settings;

pub use question::{GenerationMode, GenerationRequest, Question, QuizSource, QuizState};
pub use settings::{Difficulty, QuizSettings, QuizStyle, SettingsPatch};
