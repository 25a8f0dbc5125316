//! Provider selection - CLI 플래그, 설정 파일, 환경변수 병합
//!
//! 우선순위: CLI 플래그 > 환경변수(키가 비어 있을 때만) > 프로젝트 > 글로벌

use anyhow::Context;
use stepwise_foundation::{
    AgentSettings, JsonStore, ProviderSelection, ProviderType, PROVIDER_FILE,
};

/// Provider-related flags shared by the main command and `config`
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ProviderFlags {
    /// Provider to use (gemini, openai, ollama)
    #[arg(long)]
    pub provider: Option<String>,

    /// Model to use
    #[arg(long)]
    pub model: Option<String>,

    /// API key for the provider (overrides env and config)
    #[arg(long)]
    pub api_key: Option<String>,

    /// Base URL for the provider (for ollama or custom endpoints)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

impl ProviderFlags {
    fn provider_type(&self) -> anyhow::Result<Option<ProviderType>> {
        self.provider
            .as_deref()
            .map(str::parse::<ProviderType>)
            .transpose()
            .map_err(Into::into)
    }

    fn is_empty(&self) -> bool {
        self.provider.is_none()
            && self.model.is_none()
            && self.api_key.is_none()
            && self.base_url.is_none()
            && self.timeout.is_none()
    }

    fn to_selection(&self, provider: ProviderType) -> ProviderSelection {
        ProviderSelection {
            provider,
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            base_url: self.base_url.clone(),
            timeout_secs: self.timeout,
        }
    }
}

/// 저장된 선택에 플래그를 덮어쓴다 (환경변수는 보지 않음)
///
/// `--provider`가 저장된 것과 다르면 저장된 키/모델은 버린다.
pub fn apply_flags(
    stored: Option<ProviderSelection>,
    flags: &ProviderFlags,
) -> anyhow::Result<ProviderSelection> {
    let requested = flags.provider_type()?;
    let mut selection =
        stored.unwrap_or_else(|| ProviderSelection::new(requested.unwrap_or_default()));
    let provider = requested.unwrap_or(selection.provider);

    selection.merge(flags.to_selection(provider));
    Ok(selection)
}

/// 실행에 쓸 최종 선택
pub fn resolve_selection(
    stored: Option<ProviderSelection>,
    flags: &ProviderFlags,
    settings: &AgentSettings,
) -> anyhow::Result<ProviderSelection> {
    let mut selection = apply_flags(stored, flags)?;
    selection.apply_env_overrides();
    if selection.timeout_secs.is_none() {
        selection.timeout_secs = settings.request_timeout_secs;
    }
    Ok(selection)
}

/// `stepwise config`
pub fn run_config(flags: &ProviderFlags, project: bool, show: bool) -> anyhow::Result<()> {
    if !flags.is_empty() {
        let store = if project {
            JsonStore::current_project()?
        } else {
            JsonStore::global()?
        };
        let stored = store
            .load_optional::<ProviderSelection>(PROVIDER_FILE)
            .context("Failed to read the saved provider selection")?;
        let updated = apply_flags(stored, flags)?;
        warn_if_invalid(&updated);
        store.save(PROVIDER_FILE, &updated)?;
        println!(
            "✓ Saved {} to {}",
            updated.provider,
            store.file_path(PROVIDER_FILE).display()
        );
    } else if !show {
        println!("Nothing to change. Use --show to print the current selection.");
    }

    if show {
        let settings = AgentSettings::load()?;
        let selection = resolve_selection(ProviderSelection::load()?, &ProviderFlags::default(), &settings)?;
        println!("{}", describe(&selection));
        println!("{}", describe_settings(&settings));
    }

    Ok(())
}

/// 저장은 하되, 실행 시 실패할 설정이면 알려준다
fn warn_if_invalid(selection: &ProviderSelection) {
    let mut resolved = selection.clone();
    resolved.apply_env_overrides();
    if let Err(e) = resolved.validate() {
        eprintln!("⚠ {}", e);
    }
}

/// 사람이 읽는 선택 요약 (API 키는 마스킹)
pub fn describe(selection: &ProviderSelection) -> String {
    let api_key = match selection.masked_api_key() {
        Some(masked) => masked,
        None if selection.provider.requires_api_key() => "(not set)".to_string(),
        None => "(not required)".to_string(),
    };

    format!(
        "provider: {}\nmodel:    {}\nbaseUrl:  {}\napiKey:   {}\ntimeout:  {}s",
        selection.provider,
        selection.effective_model(),
        selection.effective_base_url(),
        api_key,
        selection.effective_timeout()
    )
}

fn describe_settings(settings: &AgentSettings) -> String {
    format!(
        "maxIterations: {}\ntransportRetries: {}\nrepairAttempts: {}\ntoolTimeoutSecs: {}",
        settings.max_iterations,
        settings.transport_retries,
        settings.repair_attempts,
        settings.tool_timeout_secs
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn flags(provider: Option<&str>, model: Option<&str>) -> ProviderFlags {
        ProviderFlags {
            provider: provider.map(String::from),
            model: model.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_apply_flags_without_stored() {
        let selection = apply_flags(None, &flags(Some("ollama"), Some("qwen3:8b"))).unwrap();
        assert_eq!(selection.provider, ProviderType::Ollama);
        assert_eq!(selection.model.as_deref(), Some("qwen3:8b"));

        let default = apply_flags(None, &ProviderFlags::default()).unwrap();
        assert_eq!(default.provider, ProviderType::default());
    }

    #[test]
    fn test_apply_flags_keeps_stored_fields() {
        let stored = ProviderSelection::new(ProviderType::Openai)
            .api_key("sk-stored")
            .model("gpt-4.1");

        let selection = apply_flags(Some(stored), &flags(None, Some("gpt-4.1-mini"))).unwrap();
        assert_eq!(selection.provider, ProviderType::Openai);
        assert_eq!(selection.api_key.as_deref(), Some("sk-stored"));
        assert_eq!(selection.model.as_deref(), Some("gpt-4.1-mini"));
    }

    #[test]
    fn test_switching_provider_drops_stored_key() {
        let stored = ProviderSelection::new(ProviderType::Openai).api_key("sk-stored");

        let selection = apply_flags(Some(stored), &flags(Some("ollama"), None)).unwrap();
        assert_eq!(selection.provider, ProviderType::Ollama);
        assert_eq!(selection.api_key, None);
    }

    #[test]
    fn test_unknown_provider_is_error() {
        assert!(apply_flags(None, &flags(Some("anthropic"), None)).is_err());
    }

    #[test]
    fn test_resolve_uses_settings_timeout() {
        let settings = AgentSettings {
            request_timeout_secs: Some(42),
            ..Default::default()
        };
        let selection = resolve_selection(None, &flags(Some("ollama"), None), &settings).unwrap();
        assert_eq!(selection.effective_timeout(), 42);

        let explicit = ProviderFlags {
            timeout: Some(7),
            ..flags(Some("ollama"), None)
        };
        let selection = resolve_selection(None, &explicit, &settings).unwrap();
        assert_eq!(selection.effective_timeout(), 7);
    }

    #[test]
    fn test_describe_masks_key() {
        let text = describe(&ProviderSelection::new(ProviderType::Gemini).api_key("AIzaSecretKey"));
        assert!(text.contains("provider: gemini"));
        assert!(text.contains("AIza****"));
        assert!(!text.contains("SecretKey"));

        let text = describe(&ProviderSelection::new(ProviderType::Ollama));
        assert!(text.contains("(not required)"));
    }

    #[test]
    fn test_saved_selection_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(dir.path());

        let updated = apply_flags(None, &flags(Some("ollama"), Some("llama3"))).unwrap();
        store.save(PROVIDER_FILE, &updated).unwrap();

        let raw = std::fs::read_to_string(store.file_path(PROVIDER_FILE)).unwrap();
        assert!(raw.contains("\"provider\": \"ollama\""));
        assert!(!raw.contains("apiKey"));

        let loaded = store
            .load_optional::<ProviderSelection>(PROVIDER_FILE)
            .unwrap();
        assert_eq!(loaded, Some(updated));
    }
}
