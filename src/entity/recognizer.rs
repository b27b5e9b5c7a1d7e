use async_trait::async_trait;
use ollama_rs::generation::completion::request::GenerationRequest;
use ollama_rs::generation::options::GenerationOptions;
use ollama_rs::generation::parameters::FormatType;
use ollama_rs::Ollama;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use super::types::{EntityHit, EntityType};
use super::TARGET_ENTITY;
use crate::prompts;
use crate::TARGET_LLM_REQUEST;

/// Upper bound for the pause between two recognizer attempts.
pub const MAX_RETRY_BACKOFF: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum RecognizerError {
    #[error("Entity recognizer unavailable: {0}")]
    Unavailable(String),
    #[error("Entity recognizer timed out after {0:?}")]
    Timeout(Duration),
    #[error("Invalid entity recognizer response: {0}")]
    InvalidResponse(String),
    #[error("Entity recognizer request failed: {0}")]
    Request(String),
}

/// The external named-entity recognition capability.
///
/// Implementations are acquired once at startup and shared for the process lifetime.
#[async_trait]
pub trait EntityRecognizer: Send + Sync {
    /// Return every entity found in `text`, in text order.
    async fn recognize(&self, text: &str) -> Result<Vec<EntityHit>, RecognizerError>;

    fn name(&self) -> &str;
}

#[derive(Debug, Clone)]
pub struct RecognizerConfig {
    pub host: String,
    pub port: u16,
    pub model: String,
    pub temperature: f32,
    pub timeout: Duration,
    pub max_retries: u32,
    /// Pause before the first retry; doubled after every failed attempt.
    pub retry_backoff: Duration,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost".to_string(),
            port: 11434,
            model: "llama3.1".to_string(),
            temperature: 0.0,
            timeout: Duration::from_secs(60),
            max_retries: 3,
            retry_backoff: Duration::from_secs(2),
        }
    }
}

impl RecognizerConfig {
    /// Host with an explicit scheme, as the Ollama client expects.
    pub fn base_url(&self) -> String {
        if self.host.starts_with("http://") || self.host.starts_with("https://") {
            self.host.clone()
        } else {
            format!("http://{}", self.host)
        }
    }
}

/// Entity recognizer backed by a local model served by Ollama.
pub struct OllamaRecognizer {
    ollama: Ollama,
    config: RecognizerConfig,
}

impl OllamaRecognizer {
    /// Connect to the Ollama endpoint and confirm the configured model is installed.
    pub async fn connect(config: RecognizerConfig) -> Result<Self, RecognizerError> {
        info!(
            target: TARGET_ENTITY,
            "Connecting to Ollama at {}:{}",
            config.base_url(),
            config.port
        );

        let recognizer = Self::with_config(config);
        recognizer.check_model().await?;
        Ok(recognizer)
    }

    fn with_config(config: RecognizerConfig) -> Self {
        let ollama = Ollama::new(config.base_url(), config.port);
        Self { ollama, config }
    }

    async fn check_model(&self) -> Result<(), RecognizerError> {
        let config = &self.config;
        let models = match timeout(config.timeout, self.ollama.list_local_models()).await {
            Ok(Ok(models)) => models,
            Ok(Err(e)) => return Err(RecognizerError::Unavailable(format!("API error: {}", e))),
            Err(_) => return Err(RecognizerError::Timeout(config.timeout)),
        };

        let available: Vec<String> = models.iter().map(|m| m.name.clone()).collect();
        if !model_is_available(&config.model, &available) {
            error!(
                target: TARGET_ENTITY,
                "Model {} not found, available models: {}",
                config.model,
                available.join(", ")
            );
            return Err(RecognizerError::Unavailable(format!(
                "model '{}' is not installed",
                config.model
            )));
        }

        info!(target: TARGET_ENTITY, "Using entity recognition model {}", config.model);
        Ok(())
    }

    async fn generate(&self, prompt: &str) -> Result<String, RecognizerError> {
        let response = with_retries(&self.config, move || {
            let mut request = GenerationRequest::new(self.config.model.clone(), prompt.to_string());
            request.options =
                Some(GenerationOptions::default().temperature(self.config.temperature));
            request.format = Some(FormatType::Json);
            self.ollama.generate(request)
        })
        .await?;

        debug!(
            target: TARGET_LLM_REQUEST,
            "LLM response received ({} bytes)",
            response.response.len()
        );
        Ok(response.response)
    }
}

/// Run `attempt` until it succeeds, at most `config.max_retries` times (always at least
/// once). Each attempt is bounded by `config.timeout`; failed attempts are followed by an
/// exponentially growing pause capped at [`MAX_RETRY_BACKOFF`].
async fn with_retries<T, E, F, Fut>(
    config: &RecognizerConfig,
    mut attempt: F,
) -> Result<T, RecognizerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let attempts = config.max_retries.max(1);
    let mut backoff = config.retry_backoff;
    let mut last_error = RecognizerError::Request("no attempt made".to_string());

    for retry_count in 0..attempts {
        match timeout(config.timeout, attempt()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => {
                warn!(target: TARGET_LLM_REQUEST, "Error generating response: {}", e);
                last_error = RecognizerError::Request(e.to_string());
            }
            Err(_) => {
                warn!(target: TARGET_LLM_REQUEST, "LLM request timed out");
                last_error = RecognizerError::Timeout(config.timeout);
            }
        }

        if retry_count + 1 < attempts {
            info!(
                target: TARGET_LLM_REQUEST,
                "Retrying LLM request in {:?}... ({}/{})",
                backoff,
                retry_count + 1,
                attempts
            );
            sleep(backoff).await;
            backoff = next_backoff(backoff);
        }
    }

    error!(
        target: TARGET_LLM_REQUEST,
        "Failed to generate response after {} attempts", attempts
    );
    Err(last_error)
}

fn next_backoff(current: Duration) -> Duration {
    current.saturating_mul(2).min(MAX_RETRY_BACKOFF)
}

#[async_trait]
impl EntityRecognizer for OllamaRecognizer {
    async fn recognize(&self, text: &str) -> Result<Vec<EntityHit>, RecognizerError> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let prompt = prompts::entity_recognition_prompt(text);
        let response = self.generate(&prompt).await?;
        parse_entity_response(&response)
    }

    fn name(&self) -> &str {
        &self.config.model
    }
}

/// Accepts `llama3.1` for an installed `llama3.1:latest`.
fn model_is_available(model: &str, available: &[String]) -> bool {
    available
        .iter()
        .any(|name| name == model || name.strip_suffix(":latest") == Some(model))
}

/// Parse a recognizer JSON reply: an object with an `entities` array, or a bare array.
pub fn parse_entity_response(json_str: &str) -> Result<Vec<EntityHit>, RecognizerError> {
    let json: Value = serde_json::from_str(json_str.trim()).map_err(|e| {
        error!(target: TARGET_ENTITY, "Failed to parse JSON: {}", e);
        RecognizerError::InvalidResponse(format!("invalid JSON: {}", e))
    })?;

    let entities = match &json {
        Value::Array(entities) => entities,
        Value::Object(obj) => match obj.get("entities") {
            Some(Value::Array(entities)) => entities,
            Some(Value::Null) => return Ok(Vec::new()),
            Some(_) => {
                return Err(RecognizerError::InvalidResponse(
                    "the 'entities' field is not an array".to_string(),
                ))
            }
            None => {
                return Err(RecognizerError::InvalidResponse(format!(
                    "no 'entities' field, top-level fields: {}",
                    obj.keys().cloned().collect::<Vec<_>>().join(", ")
                )))
            }
        },
        _ => {
            return Err(RecognizerError::InvalidResponse(
                "response is neither an object nor an array".to_string(),
            ))
        }
    };

    let hits: Vec<EntityHit> = entities.iter().filter_map(parse_entity_object).collect();

    debug!(target: TARGET_ENTITY, "Parsed {} entities from recognizer response", hits.len());

    Ok(hits)
}

fn parse_entity_object(entity_value: &Value) -> Option<EntityHit> {
    let text = entity_value
        .get("text")
        .or_else(|| entity_value.get("name"))
        .and_then(Value::as_str)?;
    if text.trim().is_empty() {
        return None;
    }

    let type_str = entity_value
        .get("type")
        .or_else(|| entity_value.get("label"))
        .and_then(Value::as_str)
        .unwrap_or("MISC");

    Some(EntityHit::new(text, EntityType::from(type_str)))
}

/// Recognizer answering from a fixed table, used as a test double.
///
/// Texts not in the table yield no entities. Texts registered with
/// [`StaticRecognizer::with_failure`] return [`RecognizerError::Unavailable`].
#[derive(Debug, Default)]
pub struct StaticRecognizer {
    responses: HashMap<String, Vec<EntityHit>>,
    failures: HashMap<String, String>,
    calls: AtomicUsize,
}

impl StaticRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, text: &str, hits: Vec<EntityHit>) -> Self {
        self.responses.insert(text.to_string(), hits);
        self
    }

    pub fn with_failure(mut self, text: &str, reason: &str) -> Self {
        self.failures.insert(text.to_string(), reason.to_string());
        self
    }

    /// Number of `recognize` calls served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EntityRecognizer for StaticRecognizer {
    async fn recognize(&self, text: &str) -> Result<Vec<EntityHit>, RecognizerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(reason) = self.failures.get(text) {
            return Err(RecognizerError::Unavailable(reason.clone()));
        }

        Ok(self.responses.get(text).cloned().unwrap_or_default())
    }

    fn name(&self) -> &str {
        "static"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::net::TcpListener;
    use tokio::time::Instant;

    #[test]
    fn test_parse_entities_object() {
        let response = r#"{"entities": [
            {"text": "João da Silva", "type": "PER"},
            {"text": "Secretaria de Saúde", "type": "ORG"},
            {"text": "Brasília", "type": "LOC"}
        ]}"#;
        let hits = parse_entity_response(response).unwrap();
        assert_eq!(
            hits,
            vec![
                EntityHit::person("João da Silva"),
                EntityHit::new("Secretaria de Saúde", EntityType::Organization),
                EntityHit::new("Brasília", EntityType::Location),
            ]
        );
    }

    #[test]
    fn test_parse_bare_array_and_alternate_keys() {
        let response = r#"[{"name": "Maria Souza", "label": "PERSON"}, {"text": "", "type": "PER"}, {"type": "PER"}]"#;
        let hits = parse_entity_response(response).unwrap();
        assert_eq!(hits, vec![EntityHit::person("Maria Souza")]);
    }

    #[test]
    fn test_parse_missing_type_defaults_to_other() {
        let hits = parse_entity_response(r#"{"entities": [{"text": "Algo"}]}"#).unwrap();
        assert_eq!(hits[0].entity_type, EntityType::Other);
    }

    #[test]
    fn test_parse_empty_and_null_entities() {
        assert!(parse_entity_response(r#"{"entities": []}"#).unwrap().is_empty());
        assert!(parse_entity_response(r#"{"entities": null}"#).unwrap().is_empty());
    }

    #[test]
    fn test_parse_invalid_responses() {
        assert!(matches!(
            parse_entity_response("not json"),
            Err(RecognizerError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_entity_response(r#"{"people": []}"#),
            Err(RecognizerError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_entity_response(r#"{"entities": "João"}"#),
            Err(RecognizerError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_entity_response("42"),
            Err(RecognizerError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_model_is_available() {
        let installed = vec!["llama3.1:latest".to_string(), "qwen2.5:7b".to_string()];
        assert!(model_is_available("llama3.1", &installed));
        assert!(model_is_available("llama3.1:latest", &installed));
        assert!(model_is_available("qwen2.5:7b", &installed));
        assert!(!model_is_available("qwen2.5", &installed));
    }

    #[test]
    fn test_base_url_adds_scheme() {
        let mut config = RecognizerConfig::default();
        assert_eq!(config.base_url(), "http://localhost");
        config.host = "ollama.internal".to_string();
        assert_eq!(config.base_url(), "http://ollama.internal");
        config.host = "https://ollama.internal".to_string();
        assert_eq!(config.base_url(), "https://ollama.internal");
    }

    fn quick_config(port: u16) -> RecognizerConfig {
        RecognizerConfig {
            host: "http://127.0.0.1".to_string(),
            port,
            timeout: Duration::from_millis(200),
            max_retries: 2,
            retry_backoff: Duration::from_millis(10),
            ..RecognizerConfig::default()
        }
    }

    /// Listener that accepts connections and never answers, counting accepted sockets.
    async fn silent_server() -> (u16, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let accepted = Arc::new(AtomicUsize::new(0));
        let counter = accepted.clone();
        tokio::spawn(async move {
            let mut open = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                open.push(socket);
            }
        });
        (port, accepted)
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_time_out_with_exponential_backoff() {
        let config = RecognizerConfig {
            timeout: Duration::from_secs(1),
            max_retries: 3,
            retry_backoff: Duration::from_secs(2),
            ..RecognizerConfig::default()
        };
        let attempts = AtomicUsize::new(0);
        let started = Instant::now();

        let result: Result<(), RecognizerError> = with_retries(&config, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            std::future::pending::<Result<(), String>>()
        })
        .await;

        assert!(matches!(result, Err(RecognizerError::Timeout(t)) if t == Duration::from_secs(1)));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        // Three 1s timeouts plus pauses of 2s and 4s.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(9), "elapsed {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(10), "elapsed {:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_succeeds_after_request_error() {
        let config = RecognizerConfig::default();
        let attempts = AtomicUsize::new(0);

        let result = with_retries(&config, || {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    Err("connection refused".to_string())
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_retries_still_attempts_once() {
        let config = RecognizerConfig {
            max_retries: 0,
            ..RecognizerConfig::default()
        };
        let attempts = AtomicUsize::new(0);

        let result: Result<(), RecognizerError> = with_retries(&config, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>("model not loaded".to_string()) }
        })
        .await;

        match result {
            Err(RecognizerError::Request(message)) => assert_eq!(message, "model not loaded"),
            other => panic!("expected Request error, got {:?}", other),
        }
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_backoff_is_capped() {
        assert_eq!(next_backoff(Duration::from_secs(2)), Duration::from_secs(4));
        assert_eq!(next_backoff(Duration::from_secs(40)), MAX_RETRY_BACKOFF);

        let mut backoff = Duration::from_secs(2);
        for _ in 0..200 {
            backoff = next_backoff(backoff);
        }
        assert_eq!(backoff, MAX_RETRY_BACKOFF);
        assert_eq!(next_backoff(Duration::MAX), MAX_RETRY_BACKOFF);
    }

    #[tokio::test]
    async fn test_unresponsive_server_times_out_after_every_attempt() {
        let (port, accepted) = silent_server().await;
        let recognizer = OllamaRecognizer::with_config(quick_config(port));

        let result = recognizer.recognize("Pedido de João da Silva").await;

        assert!(
            matches!(result, Err(RecognizerError::Timeout(t)) if t == Duration::from_millis(200)),
            "got {:?}",
            result
        );
        assert_eq!(accepted.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_blank_text_skips_the_model() {
        let (port, accepted) = silent_server().await;
        let recognizer = OllamaRecognizer::with_config(quick_config(port));

        assert!(recognizer.recognize("  \n\t ").await.unwrap().is_empty());
        assert!(recognizer.recognize("").await.unwrap().is_empty());
        assert_eq!(accepted.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_static_recognizer() {
        let recognizer = StaticRecognizer::new()
            .with_response("oi Ana Lima", vec![EntityHit::person("Ana Lima")])
            .with_failure("quebra", "offline");

        assert_eq!(
            recognizer.recognize("oi Ana Lima").await.unwrap(),
            vec![EntityHit::person("Ana Lima")]
        );
        assert!(recognizer.recognize("desconhecido").await.unwrap().is_empty());
        assert!(matches!(
            recognizer.recognize("quebra").await,
            Err(RecognizerError::Unavailable(_))
        ));
        assert_eq!(recognizer.calls(), 3);
    }
}
