pub mod classifier;
pub mod dataset;
pub mod entity;
pub mod environment;
pub mod error;
pub mod logging;
pub mod patterns;
pub mod prompts;
pub mod report;

pub use classifier::{ClassificationLabel, ClassifiedRecord, Classifier, RecordOutcome};
pub use error::TriageError;

pub const TARGET_PATTERNS: &str = "patterns";
pub const TARGET_CLASSIFIER: &str = "classifier";
pub const TARGET_LLM_REQUEST: &str = "llm_request";

pub const DEFAULT_TEXT_FIELD: &str = "Texto Mascarado";
pub const DEFAULT_ID_FIELD: &str = "ID";
pub const DEFAULT_OUTPUT_FILE: &str = "resultado_classificacao.csv";
