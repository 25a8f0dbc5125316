use crate::storage::JsonStore;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::provider_type::ProviderType;

/// 이 길이 이하의 키는 앞부분도 보여주지 않는다
const MASK_MIN_LEN: usize = 8;

/// 설정 파일명
pub const PROVIDER_FILE: &str = "provider.json";

/// 저장된 프로바이더 선택
///
/// `provider.json` 형식:
///
/// ```json
/// { "provider": "gemini", "apiKey": "..." }
/// { "provider": "ollama", "model": "llama3" }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSelection {
    /// 프로바이더 타입
    pub provider: ProviderType,

    /// API 키
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// 모델 ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Base URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// 요청 타임아웃 (초)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl ProviderSelection {
    pub fn new(provider: ProviderType) -> Self {
        Self {
            provider,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.provider.requires_api_key() && self.api_key.as_deref().map_or(true, str::is_empty) {
            return Err(Error::missing_credentials(
                self.provider.name(),
                self.provider.api_key_env().unwrap_or("API key"),
            ));
        }
        if self.timeout_secs == Some(0) {
            return Err(Error::Validation("timeoutSecs must be greater than 0".to_string()));
        }
        Ok(())
    }

    // effective 값들
    pub fn effective_base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.provider.default_base_url())
    }

    pub fn effective_model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }

    pub fn effective_timeout(&self) -> u64 {
        self.timeout_secs
            .unwrap_or_else(|| self.provider.default_timeout())
    }

    /// 표시용 API 키 (앞 4자리만 노출, 짧은 키는 전부 가림)
    pub fn masked_api_key(&self) -> Option<String> {
        self.api_key.as_ref().map(|key| {
            if key.chars().count() <= MASK_MIN_LEN {
                return "****".to_string();
            }
            let visible: String = key.chars().take(4).collect();
            format!("{}****", visible)
        })
    }

    // 빌더
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    // ========================================================================
    // Load / Save
    // ========================================================================

    /// 글로벌 + 프로젝트 + 환경변수 병합 로드
    ///
    /// 저장된 선택이 없으면 `None`.
    pub fn load() -> Result<Option<Self>> {
        let mut selection: Option<Self> = None;

        for store in JsonStore::layered() {
            if let Some(found) = store.load_optional::<ProviderSelection>(PROVIDER_FILE)? {
                selection = Some(match selection {
                    Some(mut current) => {
                        current.merge(found);
                        current
                    }
                    None => found,
                });
            }
        }

        Ok(selection.map(|mut s| {
            s.apply_env_overrides();
            s
        }))
    }

    /// 환경변수에서 API 키 채우기 (저장된 키가 우선)
    pub fn apply_env_overrides(&mut self) {
        self.apply_env_with(|name| std::env::var(name).ok());
    }

    pub(crate) fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_some() {
            return;
        }
        if let Some(var) = self.provider.api_key_env() {
            if let Some(key) = lookup(var).filter(|k| !k.is_empty()) {
                debug!("Using {} from environment", var);
                self.api_key = Some(key);
            }
        }
    }

    /// 다른 선택과 병합 (other가 우선)
    ///
    /// 프로바이더가 다르면 통째로 교체한다. 다른 프로바이더의 키나 모델을 이어받지 않는다.
    pub fn merge(&mut self, other: ProviderSelection) {
        if other.provider != self.provider {
            *self = other;
            return;
        }
        if other.api_key.is_some() {
            self.api_key = other.api_key;
        }
        if other.model.is_some() {
            self.model = other.model;
        }
        if other.base_url.is_some() {
            self.base_url = other.base_url;
        }
        if other.timeout_secs.is_some() {
            self.timeout_secs = other.timeout_secs;
        }
    }
}
