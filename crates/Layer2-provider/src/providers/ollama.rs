//! Ollama provider implementation (local LLM)
//!
//! Non-streaming `/api/chat`. No auth, and JSON output is requested through `format: "json"`.

use crate::{
    error::ProviderError,
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

const DEFAULT_BASE_URL: &str = "http://localhost:11434";
const DEFAULT_TIMEOUT_SECS: u64 = 600; // 로컬 모델은 느릴 수 있음

/// Ollama provider for local models
pub struct OllamaProvider {
    client: Client,
    model: String,
    metadata: ProviderMetadata,
}

impl OllamaProvider {
    /// Create a new Ollama provider
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self, ProviderError> {
        let base_url = base_url.into();
        let base_url = if base_url.is_empty() {
            DEFAULT_BASE_URL.to_string()
        } else {
            base_url.trim_end_matches('/').to_string()
        };

        Ok(Self {
            client: build_client(Duration::from_secs(DEFAULT_TIMEOUT_SECS))?,
            model: model.into(),
            metadata: ProviderMetadata {
                id: "ollama".to_string(),
                display_name: "Ollama (Local)".to_string(),
                base_url,
                json_mode: true,
            },
        })
    }

    /// Set custom timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, ProviderError> {
        self.client = build_client(timeout)?;
        Ok(self)
    }

    /// Toggle `format: "json"`
    pub fn with_json_mode(mut self, enabled: bool) -> Self {
        self.metadata.json_mode = enabled;
        self
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.metadata.base_url)
    }

    fn build_request(&self, history: &[Message]) -> OllamaRequest {
        OllamaRequest {
            model: self.model.clone(),
            messages: to_messages(history),
            stream: false,
            format: self.metadata.json_mode.then(|| "json".to_string()),
        }
    }
}

/// system 메시지는 맨 앞 하나로 합치고 나머지는 순서대로 전달
fn to_messages(history: &[Message]) -> Vec<OllamaMessage> {
    let mut messages = Vec::with_capacity(history.len());
    if let Some(system) = joined_system(history) {
        messages.push(OllamaMessage {
            role: MessageRole::System.as_str().to_string(),
            content: system,
        });
    }

    messages.extend(
        history
            .iter()
            .filter(|m| !m.is_system())
            .map(|m| OllamaMessage {
                role: m.role.as_str().to_string(),
                content: m.content.clone(),
            }),
    );
    messages
}

#[async_trait]
impl Provider for OllamaProvider {
    fn metadata(&self) -> &ProviderMetadata {
        &self.metadata
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, history: &[Message]) -> Result<ProviderResponse, ProviderError> {
        let request = self.build_request(history);
        debug!(model = %self.model, messages = request.messages.len(), "Ollama request");

        let response = self.client.post(self.chat_url()).json(&request).send().await?;

        if !response.status().is_success() {
            let (status, body) = error_body(response).await;
            return Err(match status.as_u16() {
                404 => ProviderError::ModelNotFound(format!(
                    "Model '{}' not found. Run 'ollama pull {}' first.",
                    self.model, self.model
                )),
                code => ProviderError::from_http_status(code, &format!("Ollama error: {}", body)),
            });
        }

        let api_response: OllamaResponse = response.json().await?;

        if api_response.message.content.trim().is_empty() {
            return Err(ProviderError::InvalidResponse(
                "Empty message content".to_string(),
            ));
        }

        Ok(ProviderResponse {
            content: api_response.message.content,
            usage: TokenUsage::new(
                api_response.prompt_eval_count.unwrap_or(0),
                api_response.eval_count.unwrap_or(0),
            ),
            model: api_response.model.unwrap_or_else(|| self.model.clone()),
        })
    }
}

// ============================================================================
// Ollama API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    #[serde(default)]
    model: Option<String>,
    message: OllamaMessage,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_chat_url() {
        let provider = OllamaProvider::new("http://localhost:11434/", "llama3").unwrap();
        assert_eq!(provider.chat_url(), "http://localhost:11434/api/chat");
    }

    #[test]
    fn test_empty_base_url_uses_default() {
        let provider = OllamaProvider::new("", "llama3").unwrap();
        assert_eq!(provider.metadata().base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_system_messages_collapsed_to_front() {
        let history = vec![
            Message::system("rule one"),
            Message::user("query"),
            Message::system("rule two"),
        ];
        let messages = to_messages(&history);

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[0].content, "rule one\n\nrule two");
        assert_eq!(messages[1].role, "user");
    }

    #[tokio::test]
    async fn test_generate_requests_json_format() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(json!({ "model": "llama3", "stream": false, "format": "json" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "llama3",
                "message": { "role": "assistant", "content": "{\"step\":\"output\",\"content\":\"hi\"}" },
                "done": true,
                "prompt_eval_count": 20,
                "eval_count": 5
            })))
            .mount(&server)
            .await;

        let provider = OllamaProvider::new(server.uri(), "llama3").unwrap();
        let response = provider.generate(&[Message::user("hi")]).await.unwrap();

        assert_eq!(response.content, r#"{"step":"output","content":"hi"}"#);
        assert_eq!(response.usage, TokenUsage::new(20, 5));
    }

    #[tokio::test]
    async fn test_generate_model_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404).set_body_string("model not found"))
            .mount(&server)
            .await;

        let provider = OllamaProvider::new(server.uri(), "llama9").unwrap();
        let err = provider.generate(&[Message::user("hi")]).await.unwrap_err();

        match err {
            ProviderError::ModelNotFound(msg) => assert!(msg.contains("ollama pull llama9")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport() {
        // 127.0.0.1:9 (discard) 는 보통 닫혀 있음
        let provider = OllamaProvider::new("http://127.0.0.1:9", "llama3")
            .unwrap()
            .with_timeout(Duration::from_secs(2))
            .unwrap();
        let err = provider.generate(&[Message::user("hi")]).await.unwrap_err();
        assert!(err.is_transport());
    }
}
