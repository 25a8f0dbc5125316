//! Provider factory - 저장된 선택 레코드로 어댑터 생성

use crate::{
    providers::{gemini::GeminiProvider, ollama::OllamaProvider, openai::OpenAiProvider},
    Provider, ProviderError,
};
use stepwise_foundation::{ProviderSelection, ProviderType};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Create the adapter described by `selection`
///
/// 타임아웃은 선택 레코드의 값(또는 프로바이더 기본값)을 쓴다.
pub fn create_provider(selection: &ProviderSelection) -> Result<Arc<dyn Provider>, ProviderError> {
    selection
        .validate()
        .map_err(|e| ProviderError::NotConfigured(e.to_string()))?;

    let model = selection.effective_model();
    let base_url = selection.effective_base_url();
    let timeout = Duration::from_secs(selection.effective_timeout());
    let api_key = selection.api_key.as_deref().unwrap_or("");

    let provider: Arc<dyn Provider> = match selection.provider {
        ProviderType::Openai => Arc::new(
            OpenAiProvider::new(api_key, model)?
                .with_base_url(base_url)
                .with_timeout(timeout)?,
        ),
        ProviderType::Gemini => Arc::new(
            GeminiProvider::new(api_key, model)?
                .with_base_url(base_url)
                .with_timeout(timeout)?,
        ),
        ProviderType::Ollama => {
            Arc::new(OllamaProvider::new(base_url, model)?.with_timeout(timeout)?)
        }
    };

    info!(
        provider = %selection.provider,
        model = provider.model(),
        timeout_secs = timeout.as_secs(),
        "Provider ready"
    );
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_each_provider() {
        let gemini = create_provider(&ProviderSelection::new(ProviderType::Gemini).api_key("k")).unwrap();
        assert_eq!(gemini.metadata().id, "gemini");
        assert_eq!(gemini.model(), "gemini-1.5-flash");

        let openai = create_provider(
            &ProviderSelection::new(ProviderType::Openai)
                .api_key("sk")
                .model("gpt-4.1"),
        )
        .unwrap();
        assert_eq!(openai.metadata().id, "openai");
        assert_eq!(openai.model(), "gpt-4.1");

        let ollama = create_provider(
            &ProviderSelection::new(ProviderType::Ollama).base_url("http://gpu-box:11434"),
        )
        .unwrap();
        assert_eq!(ollama.metadata().base_url, "http://gpu-box:11434");
    }

    #[test]
    fn test_missing_key_is_not_configured() {
        let err = create_provider(&ProviderSelection::new(ProviderType::Openai)).err().unwrap();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }
}
