//! Agent Settings - 루프 제한 및 재시도 설정
//!
//! 모든 값은 경험적으로 정한 기본값이다. `settings.json`에서 필드 단위로 덮어쓸 수 있다.

use crate::storage::JsonStore;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 설정 파일명
pub const SETTINGS_FILE: &str = "settings.json";

/// Agent 루프 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentSettings {
    /// 한 턴에서 허용하는 최대 모델 호출 횟수
    pub max_iterations: u32,
    /// 전송 실패 시 재시도 횟수 (첫 호출 제외)
    pub transport_retries: u32,
    /// 첫 재시도 대기 시간 (ms), 이후 지수적으로 증가
    pub retry_initial_delay_ms: u64,
    /// 재시도 대기 상한 (ms)
    pub retry_max_delay_ms: u64,
    /// 모델 기반 JSON 복구 시도 횟수
    pub repair_attempts: u32,
    /// 도구 실행 타임아웃 (초)
    pub tool_timeout_secs: u64,
    /// 모델 요청 타임아웃 (초). 없으면 프로바이더 기본값
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_iterations: 20,
            transport_retries: 3,
            retry_initial_delay_ms: 1000,
            retry_max_delay_ms: 30_000,
            repair_attempts: 2,
            tool_timeout_secs: 60,
            request_timeout_secs: None,
        }
    }
}

impl AgentSettings {
    /// 글로벌 + 프로젝트 병합 로드 (프로젝트 우선)
    pub fn load() -> Result<Self> {
        let stores = JsonStore::layered();
        Self::load_from(&stores)
    }

    /// 주어진 저장소를 순서대로 병합
    ///
    /// 파일에 적힌 필드만 덮어쓴다.
    pub fn load_from(stores: &[JsonStore]) -> Result<Self> {
        let mut merged = serde_json::to_value(Self::default())?;

        for store in stores {
            if let Some(Value::Object(layer)) = store.load_optional::<Value>(SETTINGS_FILE)? {
                if let Value::Object(base) = &mut merged {
                    base.extend(layer);
                }
            }
        }

        let settings: Self = serde_json::from_value(merged)
            .map_err(|e| Error::Config(format!("Invalid {}: {}", SETTINGS_FILE, e)))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(Error::Validation("maxIterations must be at least 1".to_string()));
        }
        if self.tool_timeout_secs == 0 {
            return Err(Error::Validation("toolTimeoutSecs must be greater than 0".to_string()));
        }
        if self.request_timeout_secs == Some(0) {
            return Err(Error::Validation(
                "requestTimeoutSecs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    // 빌더
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_transport_retries(mut self, retries: u32) -> Self {
        self.transport_retries = retries;
        self
    }

    pub fn with_repair_attempts(mut self, attempts: u32) -> Self {
        self.repair_attempts = attempts;
        self
    }

    pub fn with_retry_delay_ms(mut self, initial: u64) -> Self {
        self.retry_initial_delay_ms = initial;
        self
    }
}
