//! LLM Provider implementations

pub mod gemini;
pub mod ollama;
pub mod openai;

use crate::error::ProviderError;
use reqwest::Client;
use std::time::Duration;

/// 타임아웃이 설정된 HTTP 클라이언트 생성
///
/// 모든 어댑터는 이 함수로만 클라이언트를 만든다. 타임아웃 없는 요청은 없다.
pub(crate) fn build_client(timeout: Duration) -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::NotConfigured(format!("Failed to create HTTP client: {}", e)))
}

/// 실패 응답의 상태 코드와 본문 읽기
pub(crate) async fn error_body(response: reqwest::Response) -> (reqwest::StatusCode, String) {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    (status, body)
}
