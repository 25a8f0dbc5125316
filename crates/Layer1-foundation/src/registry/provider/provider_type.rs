use crate::Error;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 프로바이더 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    Gemini,
    Openai,
    Ollama,
}

impl ProviderType {
    pub const ALL: [ProviderType; 3] = [Self::Gemini, Self::Openai, Self::Ollama];

    /// 표시 이름
    pub fn name(&self) -> &'static str {
        match self {
            Self::Gemini => "Gemini",
            Self::Openai => "OpenAI",
            Self::Ollama => "Ollama",
        }
    }

    /// API Key 필요 여부
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, Self::Ollama)
    }

    /// 로컬 서비스 여부
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Ollama)
    }

    /// API Key 환경변수 이름
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            Self::Gemini => Some("GEMINI_API_KEY"),
            Self::Openai => Some("OPENAI_API_KEY"),
            Self::Ollama => None,
        }
    }

    /// 기본 Base URL
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::Gemini => "https://generativelanguage.googleapis.com/v1beta",
            Self::Openai => "https://api.openai.com/v1",
            Self::Ollama => "http://localhost:11434",
        }
    }

    /// 기본 모델
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini-1.5-flash",
            Self::Openai => "gpt-4.1-mini",
            Self::Ollama => "llama3",
        }
    }

    /// 기본 타임아웃 (초)
    pub fn default_timeout(&self) -> u64 {
        match self {
            Self::Ollama => 600,
            _ => 300,
        }
    }
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name().to_lowercase())
    }
}

impl Default for ProviderType {
    fn default() -> Self {
        Self::Gemini
    }
}

impl FromStr for ProviderType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "openai" => Ok(Self::Openai),
            "ollama" => Ok(Self::Ollama),
            other => Err(Error::UnknownProvider(other.to_string())),
        }
    }
}
