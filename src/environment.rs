use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

use crate::entity::{Denylists, RecognizerConfig};

pub const OLLAMA_HOST_ENV: &str = "OLLAMA_HOST";
pub const OLLAMA_PORT_ENV: &str = "OLLAMA_PORT";
pub const NER_MODEL_ENV: &str = "NER_MODEL";
pub const NER_TIMEOUT_SECS_ENV: &str = "NER_TIMEOUT_SECS";
pub const NER_MAX_RETRIES_ENV: &str = "NER_MAX_RETRIES";
pub const TEXT_COLUMN_ENV: &str = "TRIAGE_TEXT_COLUMN";
pub const ID_COLUMN_ENV: &str = "TRIAGE_ID_COLUMN";
pub const OUTPUT_ENV: &str = "TRIAGE_OUTPUT";
pub const CONCURRENCY_ENV: &str = "TRIAGE_CONCURRENCY";
pub const EXTRA_FALSE_POSITIVES_ENV: &str = "TRIAGE_EXTRA_FALSE_POSITIVES";
pub const EXTRA_INVALID_TOKENS_ENV: &str = "TRIAGE_EXTRA_INVALID_TOKENS";

/// Retrieves an environment variable and splits it into a vector of strings based on a delimiter.
///
/// # Arguments
/// - `var`: The name of the environment variable.
/// - `delimiter`: The character to split the environment variable's value by.
///
/// # Returns
/// - `Vec<String>` of trimmed, non-empty entries; empty when the variable is unset.
pub fn get_env_var_as_vec(var: &str, delimiter: char) -> Vec<String> {
    env::var(var)
        .unwrap_or_default()
        .split(delimiter)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse an environment variable, falling back to `default` when unset or invalid.
pub fn get_env_var_or<T: FromStr>(var: &str, default: T) -> T {
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => match value.trim().parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!("Ignoring invalid value for {}: {}", var, value);
                default
            }
        },
        _ => default,
    }
}

/// Recognizer settings from `OLLAMA_HOST`, `OLLAMA_PORT`, `NER_MODEL`, `NER_TIMEOUT_SECS`
/// and `NER_MAX_RETRIES`.
pub fn recognizer_config_from_env() -> RecognizerConfig {
    let defaults = RecognizerConfig::default();
    RecognizerConfig {
        host: get_env_var_or(OLLAMA_HOST_ENV, defaults.host),
        port: get_env_var_or(OLLAMA_PORT_ENV, defaults.port),
        model: get_env_var_or(NER_MODEL_ENV, defaults.model),
        temperature: defaults.temperature,
        timeout: Duration::from_secs(get_env_var_or(
            NER_TIMEOUT_SECS_ENV,
            defaults.timeout.as_secs(),
        )),
        max_retries: get_env_var_or(NER_MAX_RETRIES_ENV, defaults.max_retries),
        retry_backoff: defaults.retry_backoff,
    }
}

/// Built-in denylists extended with `;`-separated entries from the environment.
pub fn denylists_from_env() -> Denylists {
    Denylists::default()
        .with_extra_phrases(get_env_var_as_vec(EXTRA_FALSE_POSITIVES_ENV, ';'))
        .with_extra_tokens(get_env_var_as_vec(EXTRA_INVALID_TOKENS_ENV, ';'))
}
