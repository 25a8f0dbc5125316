//! # stepwise-provider
//!
//! Model backend adapter layer for Stepwise.
//! One uniform message history in, one raw text response out.
//!
//! ## Features
//! - Hosted providers (Gemini, OpenAI) and a local provider (Ollama)
//! - JSON-only response constraint where the backend supports it
//! - Transport failures kept apart from malformed-content failures
//! - Mandatory request timeouts; no retry inside adapters

pub mod error;
pub mod factory;
pub mod message;
pub mod providers;
pub mod r#trait;

// Core traits and types
pub use factory::create_provider;
pub use message::{Message, MessageRole};
pub use r#trait::{Provider, ProviderMetadata, ProviderResponse, TokenUsage};

// Error
pub use error::ProviderError;

// Provider implementations
pub use providers::gemini::GeminiProvider;
pub use providers::ollama::OllamaProvider;
pub use providers::openai::OpenAiProvider;
