//! Chat-completion API access and failure classification.
//!
//! # Architecture
//!
//! - [`ChatCompletion`]: the async seam the summarizer calls, one model per call
//! - [`GroqClient`]: OpenAI-compatible `/chat/completions` client over `reqwest`
//! - [`classify_status`]: maps HTTP failures onto the transient/permanent split
//!
//! No call is retried here. A failed call is reported once, classified, and
//! the summarizer decides whether the next model is worth trying.

use crate::config::{ApiKey, Config};
use crate::error::{ModelError, PermanentKind, TransientKind};
use crate::utils::truncate_for_log;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    /// Instruction message setting the model's role.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// The prompt itself.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Generation knobs sent with every request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Trait for one chat completion against one named model.
///
/// Implementors must classify their failures: a [`ModelError::Permanent`]
/// stops the whole fallback chain.
pub trait ChatCompletion {
    /// Send `messages` to `model` and return the reply text.
    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        params: CompletionParams,
    ) -> Result<String, ModelError>;
}

/// Client for Groq's OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone)]
pub struct GroqClient {
    client: Client,
    endpoint: String,
    api_key: ApiKey,
}

impl GroqClient {
    /// Build a client from the startup configuration.
    ///
    /// The request timeout is the per-model completion timeout.
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(config.completion_timeout)
            .build()?;
        let endpoint = format!(
            "{}/chat/completions",
            config.api_base.as_str().trim_end_matches('/')
        );
        Ok(Self {
            client,
            endpoint,
            api_key: config.api_key.clone(),
        })
    }

    /// Full `/chat/completions` url requests are posted to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

impl ChatCompletion for GroqClient {
    #[instrument(level = "info", skip(self, messages, params))]
    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        params: CompletionParams,
    ) -> Result<String, ModelError> {
        let t0 = Instant::now();
        let request = CompletionRequest {
            model,
            messages,
            max_tokens: params.max_tokens,
            temperature: params.temperature,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose())
            .json(&request)
            .send()
            .await
            .map_err(|e| classify_transport(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = classify_status(status, &body);
            warn!(
                %status,
                elapsed_ms = t0.elapsed().as_millis() as u64,
                error = %err,
                "Completion request rejected"
            );
            return Err(err);
        }

        let parsed: CompletionResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                classify_transport(&e)
            } else {
                ModelError::transient(
                    TransientKind::MalformedResponse,
                    format!("unreadable completion body: {e}"),
                )
            }
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| {
                ModelError::transient(TransientKind::MalformedResponse, "completion had no content")
            })?;

        debug!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            bytes = content.len(),
            "Completion received"
        );
        Ok(content)
    }
}

fn classify_transport(e: &reqwest::Error) -> ModelError {
    if e.is_timeout() {
        ModelError::transient(TransientKind::Timeout, e.to_string())
    } else {
        ModelError::transient(TransientKind::Transport, e.to_string())
    }
}

#[derive(Debug, Default, Deserialize)]
struct ProviderErrorBody {
    #[serde(default)]
    error: ProviderError,
}

#[derive(Debug, Default, Deserialize)]
struct ProviderError {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

/// Classify a non-success completion response.
///
/// Credential problems and malformed requests apply to every model, so they
/// are permanent. A decommissioned or unknown model only concerns that
/// model, so it is transient even though it arrives as a 4xx.
pub fn classify_status(status: StatusCode, body: &str) -> ModelError {
    let provider: ProviderErrorBody = serde_json::from_str(body).unwrap_or_default();
    let code = provider.error.code.unwrap_or_default();
    let message = provider
        .error
        .message
        .unwrap_or_else(|| truncate_for_log(body.trim(), 200));
    let detail = if message.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {message}")
    };

    let model_gone = code.contains("model_decommissioned")
        || code.contains("model_not_found")
        || message.contains("decommissioned")
        || message.contains("does not exist");

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ModelError::permanent(PermanentKind::Unauthorized, detail)
        }
        StatusCode::TOO_MANY_REQUESTS => ModelError::transient(TransientKind::RateLimited, detail),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            ModelError::transient(TransientKind::Timeout, detail)
        }
        StatusCode::NOT_FOUND => ModelError::transient(TransientKind::ModelUnavailable, detail),
        s if s.is_client_error() && model_gone => {
            ModelError::transient(TransientKind::ModelUnavailable, detail)
        }
        s if s.is_client_error() => ModelError::permanent(PermanentKind::InvalidRequest, detail),
        _ => ModelError::transient(TransientKind::ServerError, detail),
    }
}
