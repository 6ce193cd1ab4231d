//! The AI Oracle Client — confirmation and scoring calls against an
//! OpenAI-compatible chat completions endpoint.
//!
//! Grounded on Go's `internal/ai/client.go` and `internal/ai/confidence.go`:
//! `{{TEXT}}` substitution (or append when the template has no placeholder),
//! a "starts-with" match against the expected response, and a 24-hour
//! confidence cache keyed by `sha256(text)`. No internal retry logic — a
//! failed call surfaces as an error and the Detector treats the AI score as
//! absent, never as zero (see `SPEC_FULL.md` §7).

use crate::cache::{Cache, keys};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by an [`OracleClient`].
#[derive(Debug, Error)]
pub enum OracleError {
    /// The HTTP request itself failed (network, TLS, timeout).
    #[error("AI oracle request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The oracle responded but without a usable message body.
    #[error("AI oracle returned an empty completion")]
    EmptyCompletion,
    /// The oracle's confidence response could not be parsed as a float.
    #[error("AI oracle confidence response was not a number: {0}")]
    UnparseableConfidence(String),
}

/// The AI Oracle Client contract.
#[async_trait]
pub trait OracleClient: Send + Sync {
    /// Ask a yes/no-style question about `text` using `prompt_template`
    /// (with `{{TEXT}}` substituted, or appended if the template has no
    /// placeholder), and report whether the response starts with
    /// `expected_response` (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`OracleError`] if the request fails or the completion is
    /// empty.
    async fn check(
        &self,
        text: &str,
        prompt_template: &str,
        expected_response: &str,
    ) -> Result<bool, OracleError>;

    /// Ask the oracle to score `text` for `label` as a bare float in
    /// `[0.0, 1.0]`, using the 24-hour confidence cache.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError`] if the request fails or the response cannot
    /// be parsed as a number.
    async fn confidence(&self, text: &str, label: &str) -> Result<f64, OracleError>;
}

const TEXT_PLACEHOLDER: &str = "{{TEXT}}";
const CONFIDENCE_CACHE_TTL: Duration = Duration::from_secs(24 * 3600);

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// A real [`OracleClient`] backed by an OpenAI-compatible `/chat/completions`
/// endpoint.
pub struct HttpOracleClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    cache: Arc<dyn Cache>,
}

impl HttpOracleClient {
    /// Construct a client pointed at `base_url` (no trailing slash), with an
    /// optional bearer token and a chat model name.
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        cache: Arc<dyn Cache>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key,
            model: model.into(),
            cache,
        }
    }

    fn render_prompt(template: &str, text: &str) -> String {
        if template.contains(TEXT_PLACEHOLDER) {
            template.replace(TEXT_PLACEHOLDER, text)
        } else {
            format!("{template}\n\n{text}")
        }
    }

    async fn complete(&self, prompt: String) -> Result<String, OracleError> {
        let mut request = self.http.post(format!("{}/chat/completions", self.base_url)).json(
            &ChatRequest {
                model: &self.model,
                messages: vec![ChatMessage {
                    role: "user",
                    content: prompt,
                }],
            },
        );

        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response: ChatResponse = request.send().await?.json().await?;
        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(OracleError::EmptyCompletion)
    }
}

#[async_trait]
impl OracleClient for HttpOracleClient {
    async fn check(
        &self,
        text: &str,
        prompt_template: &str,
        expected_response: &str,
    ) -> Result<bool, OracleError> {
        let prompt = Self::render_prompt(prompt_template, text);
        let completion = self.complete(prompt).await?;
        Ok(completion
            .trim()
            .to_uppercase()
            .starts_with(&expected_response.trim().to_uppercase()))
    }

    async fn confidence(&self, text: &str, label: &str) -> Result<f64, OracleError> {
        let text_hash = {
            let mut hasher = Sha256::new();
            hasher.update(text.as_bytes());
            hex::encode(hasher.finalize())
        };
        let cache_key = keys::ai_confidence(label, &text_hash);

        if let Some(cached) = self.cache.get(&cache_key).await {
            if let Ok(value) = cached.parse::<f64>() {
                return Ok(value);
            }
        }

        let prompt = format!(
            "Rate how confidently the following text matches the category '{label}' \
             as a single number between 0 and 1, with no other text.\n\n{text}"
        );
        let completion = self.complete(prompt).await?;
        let value: f64 = completion
            .trim()
            .parse()
            .map_err(|_| OracleError::UnparseableConfidence(completion.clone()))?;
        let value = value.clamp(0.0, 1.0);

        self.cache
            .set(&cache_key, value.to_string(), CONFIDENCE_CACHE_TTL)
            .await;

        Ok(value)
    }
}

/// A no-op oracle used when no AI backend is configured. `check` always
/// returns `false`; `confidence` always errors, since "no score available"
/// is meaningfully different from "score of zero" to callers.
#[derive(Default)]
pub struct NullOracleClient;

#[async_trait]
impl OracleClient for NullOracleClient {
    async fn check(&self, _text: &str, _prompt_template: &str, _expected: &str) -> Result<bool, OracleError> {
        Ok(false)
    }

    async fn confidence(&self, _text: &str, _label: &str) -> Result<f64, OracleError> {
        Err(OracleError::EmptyCompletion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCache;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn chat_body(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{ "message": { "content": content } }]
        })
    }

    #[test]
    fn render_prompt_substitutes_placeholder() {
        let rendered = HttpOracleClient::render_prompt("Is this bad? {{TEXT}}", "hello");
        assert_eq!(rendered, "Is this bad? hello");
    }

    #[test]
    fn render_prompt_appends_when_no_placeholder() {
        let rendered = HttpOracleClient::render_prompt("Is this bad?", "hello");
        assert_eq!(rendered, "Is this bad?\n\nhello");
    }

    #[tokio::test]
    async fn check_matches_on_case_insensitive_prefix() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("yes, clearly a secret")))
            .mount(&server)
            .await;

        let client = HttpOracleClient::new(
            server.uri(),
            None,
            "test-model",
            Arc::new(InMemoryCache::new()),
        );

        let result = client
            .check("some text", "Is this a secret? {{TEXT}}", "yes")
            .await
            .unwrap();
        assert!(result);
    }

    #[tokio::test]
    async fn check_rejects_non_matching_prefix() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("no")))
            .mount(&server)
            .await;

        let client = HttpOracleClient::new(
            server.uri(),
            None,
            "test-model",
            Arc::new(InMemoryCache::new()),
        );

        let result = client
            .check("some text", "Is this a secret? {{TEXT}}", "yes")
            .await
            .unwrap();
        assert!(!result);
    }

    #[tokio::test]
    async fn confidence_is_cached_after_first_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("0.73")))
            .expect(1)
            .mount(&server)
            .await;

        let cache = Arc::new(InMemoryCache::new());
        let client = HttpOracleClient::new(server.uri(), None, "test-model", cache.clone());

        let first = client.confidence("some text", "SECRET").await.unwrap();
        let second = client.confidence("some text", "SECRET").await.unwrap();
        assert!((first - 0.73).abs() < 1e-9);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn null_client_check_is_always_false() {
        let client = NullOracleClient;
        assert!(!client.check("x", "t", "yes").await.unwrap());
    }

    #[tokio::test]
    async fn null_client_confidence_errors() {
        let client = NullOracleClient;
        assert!(client.confidence("x", "SECRET").await.is_err());
    }
}
