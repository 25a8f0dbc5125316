//! OpenAI provider implementation
//!
//! Native chat format: `system` / `user` / `assistant` roles map one to one.

use crate::{
    error::{retry_hint_ms, ProviderError},
    providers::{build_client, error_body},
    r#trait::{Provider, ProviderMetadata, ProviderResponse, TokenUsage},
    Message,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// OpenAI chat completions provider
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    model: String,
    metadata: ProviderMetadata,
}

impl OpenAiProvider {
    /// Create a new OpenAI provider
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, ProviderError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(ProviderError::NotConfigured(
                "OpenAI requires an API key".to_string(),
            ));
        }

        Ok(Self {
            client: build_client(Duration::from_secs(DEFAULT_TIMEOUT_SECS))?,
            api_key,
            model: model.into(),
            metadata: ProviderMetadata {
                id: "openai".to_string(),
                display_name: "OpenAI".to_string(),
                base_url: DEFAULT_BASE_URL.to_string(),
                json_mode: true,
            },
        })
    }

    /// Create with custom base URL (for OpenAI-compatible APIs like Azure, LocalAI, etc.)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.metadata.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set custom timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, ProviderError> {
        self.client = build_client(timeout)?;
        Ok(self)
    }

    /// Toggle the `json_object` response format
    pub fn with_json_mode(mut self, enabled: bool) -> Self {
        self.metadata.json_mode = enabled;
        self
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.metadata.base_url)
    }

    fn build_request(&self, history: &[Message]) -> OpenAiRequest {
        OpenAiRequest {
            model: self.model.clone(),
            messages: history.iter().map(OpenAiMessage::from).collect(),
            response_format: self.metadata.json_mode.then(|| ResponseFormat {
                format_type: "json_object".to_string(),
            }),
        }
    }

    /// Parse error response from OpenAI API
    fn parse_error_response(status: reqwest::StatusCode, body: &str) -> ProviderError {
        if let Ok(error_response) = serde_json::from_str::<OpenAiErrorResponse>(body) {
            let error = error_response.error;
            let message = error.message;

            return match error.code.as_deref() {
                Some("rate_limit_exceeded") => ProviderError::RateLimited {
                    retry_after_ms: retry_hint_ms(body),
                },
                Some("invalid_api_key") => ProviderError::Authentication(message),
                Some("model_not_found") => ProviderError::ModelNotFound(message),
                _ => ProviderError::from_http_status(status.as_u16(), &message),
            };
        }

        ProviderError::from_http_status(status.as_u16(), body)
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn metadata(&self) -> &ProviderMetadata {
        &self.metadata
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, history: &[Message]) -> Result<ProviderResponse, ProviderError> {
        let request = self.build_request(history);
        debug!(model = %self.model, messages = history.len(), "OpenAI request");

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, body) = error_body(response).await;
            return Err(Self::parse_error_response(status, &body));
        }

        let api_response: OpenAiResponse = response.json().await?;

        let choice =
            api_response.choices.into_iter().next().ok_or_else(|| {
                ProviderError::InvalidResponse("No choices in response".to_string())
            })?;

        let content = choice.message.content.unwrap_or_default();
        if content.trim().is_empty() {
            return Err(ProviderError::InvalidResponse(format!(
                "Empty message content (finish_reason: {})",
                choice.finish_reason.as_deref().unwrap_or("unknown")
            )));
        }

        let usage = api_response.usage.unwrap_or_default();

        Ok(ProviderResponse {
            content,
            usage: TokenUsage::new(usage.prompt_tokens, usage.completion_tokens),
            model: api_response.model.unwrap_or_else(|| self.model.clone()),
        })
    }
}

// ============================================================================
// OpenAI API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

// Error types
#[derive(Debug, Deserialize)]
struct OpenAiErrorResponse {
    error: OpenAiError,
}

#[derive(Debug, Deserialize)]
struct OpenAiError {
    message: String,
    code: Option<String>,
}

// ============================================================================
// Conversions
// ============================================================================

impl From<&Message> for OpenAiMessage {
    fn from(msg: &Message) -> Self {
        OpenAiMessage {
            role: msg.role.as_str().to_string(),
            content: Some(msg.content.clone()),
        }
    }
}
