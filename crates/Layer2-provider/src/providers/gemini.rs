//! Google Gemini provider implementation
//!
//! Gemini은 `user` / `model` 두 역할만 허용하고 같은 역할이 연속되면 거부한다.
//! - system 메시지는 첫 user 턴 + model 확인 응답으로 구성된 가상 교환으로 앞에 붙인다
//! - 같은 역할의 연속 메시지는 하나의 content에 여러 part로 합친다

use crate::{
    error::{retry_hint_ms, ProviderError},
    providers::{build_client, error_body},
    r#trait::{Provider, ProviderMetadata, ProviderResponse, TokenUsage},
    message::joined_system,
    Message, MessageRole,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_TIMEOUT_SECS: u64 = 300;
const SYSTEM_ACK: &str = r#"{"step":"think","content":"Understood. I will follow these instructions and reply with exactly one JSON step per message."}"#;

const ROLE_USER: &str = "user";
const ROLE_MODEL: &str = "model";

/// Google Gemini provider
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    model: String,
    metadata: ProviderMetadata,
}

impl GeminiProvider {
    /// Create a new Gemini provider
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, ProviderError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(ProviderError::NotConfigured(
                "Gemini requires an API key".to_string(),
            ));
        }

        Ok(Self {
            client: build_client(Duration::from_secs(DEFAULT_TIMEOUT_SECS))?,
            api_key,
            model: model.into(),
            metadata: ProviderMetadata {
                id: "gemini".to_string(),
                display_name: "Google Gemini".to_string(),
                base_url: DEFAULT_BASE_URL.to_string(),
                json_mode: true,
            },
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.metadata.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set custom timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, ProviderError> {
        self.client = build_client(timeout)?;
        Ok(self)
    }

    /// Toggle `responseMimeType: application/json`
    pub fn with_json_mode(mut self, enabled: bool) -> Self {
        self.metadata.json_mode = enabled;
        self
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.metadata.base_url, self.model
        )
    }

    fn build_request(&self, history: &[Message]) -> GeminiRequest {
        GeminiRequest {
            contents: to_contents(history),
            generation_config: self.metadata.json_mode.then(|| GeminiGenerationConfig {
                response_mime_type: Some("application/json".to_string()),
            }),
        }
    }

    fn parse_error_response(status: reqwest::StatusCode, body: &str) -> ProviderError {
        if let Ok(error_response) = serde_json::from_str::<GeminiErrorResponse>(body) {
            let error = error_response.error;
            let message = error.message;

            return match error.status.as_deref() {
                Some("RESOURCE_EXHAUSTED") => ProviderError::RateLimited {
                    retry_after_ms: retry_hint_ms(body),
                },
                Some("INVALID_ARGUMENT") => ProviderError::InvalidRequest(message),
                Some("PERMISSION_DENIED") | Some("UNAUTHENTICATED") => {
                    ProviderError::Authentication(message)
                }
                Some("NOT_FOUND") => ProviderError::ModelNotFound(message),
                Some("DEADLINE_EXCEEDED") => ProviderError::Timeout(message),
                Some("UNAVAILABLE") | Some("INTERNAL") => ProviderError::ServerError(message),
                _ => ProviderError::from_http_status(status.as_u16(), &message),
            };
        }

        ProviderError::from_http_status(status.as_u16(), body)
    }
}

/// Uniform history → Gemini contents
fn to_contents(history: &[Message]) -> Vec<GeminiContent> {
    let mut contents: Vec<GeminiContent> = vec![];

    if let Some(system) = joined_system(history) {
        push_merged(&mut contents, ROLE_USER, system);
        push_merged(&mut contents, ROLE_MODEL, SYSTEM_ACK.to_string());
    }

    for msg in history {
        let role = match msg.role {
            MessageRole::System => continue,
            MessageRole::User => ROLE_USER,
            MessageRole::Assistant => ROLE_MODEL,
        };
        push_merged(&mut contents, role, msg.content.clone());
    }

    contents
}

fn push_merged(contents: &mut Vec<GeminiContent>, role: &str, text: String) {
    match contents.last_mut() {
        Some(last) if last.role == role => last.parts.push(GeminiPart { text }),
        _ => contents.push(GeminiContent {
            role: role.to_string(),
            parts: vec![GeminiPart { text }],
        }),
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    fn metadata(&self) -> &ProviderMetadata {
        &self.metadata
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, history: &[Message]) -> Result<ProviderResponse, ProviderError> {
        let request = self.build_request(history);
        debug!(model = %self.model, contents = request.contents.len(), "Gemini request");

        let response = self
            .client
            .post(self.generate_url())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, body) = error_body(response).await;
            return Err(Self::parse_error_response(status, &body));
        }

        let api_response: GeminiResponse = response.json().await?;

        let candidate = api_response.candidates.into_iter().next().ok_or_else(|| {
            ProviderError::InvalidResponse("No candidates in response".to_string())
        })?;

        let content: String = candidate
            .content
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(ProviderError::InvalidResponse(format!(
                "Empty candidate (finishReason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            )));
        }

        let usage = api_response.usage_metadata.unwrap_or_default();

        Ok(ProviderResponse {
            content,
            usage: TokenUsage::new(
                usage.prompt_token_count.unwrap_or(0),
                usage.candidates_token_count.unwrap_or(0),
            ),
            model: api_response
                .model_version
                .unwrap_or_else(|| self.model.clone()),
        })
    }
}

// ============================================================================
// Gemini API Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

// Response types
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: Option<GeminiUsageMetadata>,
    #[serde(default)]
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
}

// Error types
#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
    status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn roles(contents: &[GeminiContent]) -> Vec<&str> {
        contents.iter().map(|c| c.role.as_str()).collect()
    }

    #[test]
    fn test_generate_url() {
        let provider = GeminiProvider::new("test-key", "gemini-1.5-flash").unwrap();
        let url = provider.generate_url();
        assert!(url.ends_with("/models/gemini-1.5-flash:generateContent"));
        assert!(!url.contains("test-key"));
    }

    #[test]
    fn test_system_prompt_becomes_first_exchange() {
        let history = vec![
            Message::system("You are a step machine."),
            Message::user("What is the weather of Delhi?"),
        ];

        let contents = to_contents(&history);
        assert_eq!(roles(&contents), vec!["user", "model", "user"]);
        assert_eq!(contents[0].parts[0].text, "You are a step machine.");
        assert_eq!(contents[1].parts[0].text, SYSTEM_ACK);
        assert_eq!(contents[2].parts[0].text, "What is the weather of Delhi?");
    }

    #[test]
    fn test_consecutive_roles_are_merged() {
        let history = vec![
            Message::system("rules"),
            Message::user("query"),
            Message::assistant(r#"{"step":"think","content":"a"}"#),
            Message::assistant(r#"{"step":"action","tool":"getWeatherInfo","input":"Delhi"}"#),
            Message::assistant(r#"{"step":"observe","content":"Delhi has 43 Degree C"}"#),
        ];

        let contents = to_contents(&history);
        assert_eq!(roles(&contents), vec!["user", "model", "user", "model"]);
        assert_eq!(contents[3].parts.len(), 3);
    }

    #[test]
    fn test_history_without_system() {
        let contents = to_contents(&[Message::user("hi")]);
        assert_eq!(roles(&contents), vec!["user"]);
    }

    #[test]
    fn test_request_json_mode() {
        let provider = GeminiProvider::new("k", "gemini-1.5-flash").unwrap();
        let request = serde_json::to_value(provider.build_request(&[Message::user("hi")])).unwrap();
        assert_eq!(
            request["generationConfig"]["responseMimeType"],
            "application/json"
        );

        let provider = provider.with_json_mode(false);
        let request = serde_json::to_value(provider.build_request(&[Message::user("hi")])).unwrap();
        assert!(request.get("generationConfig").is_none());
    }

    #[tokio::test]
    async fn test_generate_joins_parts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-1.5-flash:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": {
                        "role": "model",
                        "parts": [{ "text": "{\"step\":\"think\"," }, { "text": "\"content\":\"ok\"}" }]
                    },
                    "finishReason": "STOP"
                }],
                "usageMetadata": { "promptTokenCount": 40, "candidatesTokenCount": 9 }
            })))
            .mount(&server)
            .await;

        let provider = GeminiProvider::new("test-key", "gemini-1.5-flash")
            .unwrap()
            .with_base_url(server.uri());
        let response = provider.generate(&[Message::user("hi")]).await.unwrap();

        assert_eq!(response.content, r#"{"step":"think","content":"ok"}"#);
        assert_eq!(response.usage, TokenUsage::new(40, 9));
        assert_eq!(response.model, "gemini-1.5-flash");
    }

    #[tokio::test]
    async fn test_generate_error_status_mapping() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": { "code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED" }
            })))
            .mount(&server)
            .await;

        let provider = GeminiProvider::new("test-key", "gemini-1.5-flash")
            .unwrap()
            .with_base_url(server.uri());
        let err = provider.generate(&[Message::user("hi")]).await.unwrap_err();

        assert!(matches!(err, ProviderError::RateLimited { .. }));
    }

    #[tokio::test]
    async fn test_generate_no_candidates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
            .mount(&server)
            .await;

        let provider = GeminiProvider::new("test-key", "gemini-1.5-flash")
            .unwrap()
            .with_base_url(server.uri());
        let err = provider.generate(&[Message::user("hi")]).await.unwrap_err();

        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }
}
