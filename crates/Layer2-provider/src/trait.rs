//! Provider trait and common types

use crate::error::ProviderError;
use crate::Message;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Token usage reported by the backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }

    /// 누적
    pub fn add(&mut self, other: &TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

/// Provider metadata
#[derive(Debug, Clone)]
pub struct ProviderMetadata {
    /// Provider ID (e.g., "gemini")
    pub id: String,

    /// Display name (e.g., "Google Gemini")
    pub display_name: String,

    /// Base URL requests are sent to
    pub base_url: String,

    /// Whether requests carry a JSON-only response constraint
    pub json_mode: bool,
}

/// Complete response from provider
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResponse {
    /// Raw text content, expected to hold one JSON step
    pub content: String,

    /// Token usage
    pub usage: TokenUsage,

    /// Model that produced the response
    pub model: String,
}

/// LLM Provider trait
///
/// Implement this trait to add support for a new text-generation backend.
/// Adapters translate the uniform history into their wire shape and never retry.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Get provider metadata
    fn metadata(&self) -> &ProviderMetadata;

    /// Current model ID
    fn model(&self) -> &str;

    /// Send the full history and get one raw response
    async fn generate(&self, history: &[Message]) -> Result<ProviderResponse, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_accumulate() {
        let mut usage = TokenUsage::default();
        usage.add(&TokenUsage::new(10, 4));
        usage.add(&TokenUsage::new(3, 2));
        assert_eq!(usage, TokenUsage::new(13, 6));
        assert_eq!(usage.total(), 19);
    }
}
