//! Error types for Stepwise
//!
//! 설정 / 저장소 계층의 에러를 중앙에서 관리

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Stepwise foundation 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 설정 관련
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing credentials for {provider}: set {env_var} or pass --api-key")]
    MissingCredentials { provider: String, env_var: String },

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    // ========================================================================
    // 일반
    // ========================================================================
    #[error("Validation error: {0}")]
    Validation(String),

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// 자격 증명 누락 에러 생성 헬퍼
    pub fn missing_credentials(provider: impl Into<String>, env_var: impl Into<String>) -> Self {
        Error::MissingCredentials {
            provider: provider.into(),
            env_var: env_var.into(),
        }
    }
}
