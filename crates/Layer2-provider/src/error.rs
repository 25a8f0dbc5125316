//! Provider-specific error types
//!
//! ProviderError는 LLM 제공자 호출의 세부 에러를 관리합니다.
//! 전송 실패(도달 불가, 인증, 타임아웃)와 응답 내용 불량을 구분합니다.

use thiserror::Error;

/// Errors that can occur during provider operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// API key is missing or invalid
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded{}", .retry_after_ms.map(|ms| format!(", retry after {}ms", ms)).unwrap_or_default())]
    RateLimited { retry_after_ms: Option<u64> },

    /// Server error (5xx)
    #[error("Server error: {0}")]
    ServerError(String),

    /// Network error (connection failed, DNS, etc.)
    #[error("Network error: {0}")]
    Network(String),

    /// Request exceeded the client timeout
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Invalid request (bad parameters)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Model not found
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// Provider not configured
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    /// Unexpected HTTP status
    #[error("Unexpected status: {0}")]
    Unknown(String),

    /// The provider answered, but the body is unusable
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Create from HTTP status code and body
    pub fn from_http_status(status: u16, body: &str) -> Self {
        match status {
            401 | 403 => ProviderError::Authentication(body.to_string()),
            429 => ProviderError::RateLimited {
                retry_after_ms: retry_hint_ms(body),
            },
            400 | 422 => ProviderError::InvalidRequest(body.to_string()),
            404 => ProviderError::ModelNotFound(body.to_string()),
            408 | 504 => ProviderError::Timeout(format!("HTTP {}: {}", status, body)),
            500..=599 => ProviderError::ServerError(body.to_string()),
            _ => ProviderError::Unknown(format!("HTTP {}: {}", status, body)),
        }
    }

    /// "provider could not be reached" 계열인지 확인
    ///
    /// `false`이면 provider가 응답했지만 내용이 잘못된 경우다.
    pub fn is_transport(&self) -> bool {
        !matches!(self, ProviderError::InvalidResponse(_))
    }

    /// 같은 요청을 다시 보내면 성공할 수 있는지
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimited { .. }
                | ProviderError::ServerError(_)
                | ProviderError::Network(_)
                | ProviderError::Timeout(_)
                | ProviderError::InvalidResponse(_)
        )
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout(err.to_string())
        } else if err.is_decode() {
            ProviderError::InvalidResponse(err.to_string())
        } else if err.is_builder() {
            ProviderError::NotConfigured(err.to_string())
        } else {
            ProviderError::Network(err.to_string())
        }
    }
}

/// 429 본문에서 재시도 대기 시간(ms) 힌트를 찾는다
///
/// - Gemini: `"retryDelay": "30s"` (RetryInfo detail)
/// - `{"error": {"retry_after": 1.5}}` (초 단위 숫자)
/// - OpenAI 메시지: "Please try again in 20s" / "in 350ms" / "retry in 2 seconds"
pub(crate) fn retry_hint_ms(body: &str) -> Option<u64> {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(secs) = json
            .get("error")
            .and_then(|e| e.get("retry_after"))
            .and_then(|v| v.as_f64())
        {
            return Some((secs * 1000.0) as u64);
        }
    }

    let lower = body.to_ascii_lowercase();
    ["retrydelay", "try again in", "retry in", "retry after"]
        .iter()
        .filter_map(|marker| lower.find(marker).map(|idx| &lower[idx + marker.len()..]))
        .find_map(parse_duration_ms)
}

/// "1.5s", "350ms", "2 seconds" 형태의 첫 숫자+단위 (단위 없으면 초)
fn parse_duration_ms(text: &str) -> Option<u64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    // 숫자가 한참 뒤에 나오면 다른 문맥이다
    if start > 8 {
        return None;
    }
    let rest = &text[start..];
    let number_len = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(rest.len());
    let value: f64 = rest[..number_len].parse().ok()?;
    let unit = rest[number_len..].trim_start();

    let ms = if unit.starts_with("ms") || unit.starts_with("milli") {
        value
    } else {
        value * 1000.0
    };
    Some(ms as u64)
}
