pub mod names;
pub mod recognizer;
pub mod types;

pub use names::{Denylists, PersonNameExtractor};
pub use recognizer::{
    EntityRecognizer, OllamaRecognizer, RecognizerConfig, RecognizerError, StaticRecognizer,
};
pub use types::*;

// Module-level constants
pub const TARGET_ENTITY: &str = "entity";
