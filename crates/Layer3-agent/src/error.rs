//! Agent error types
//!
//! 턴을 끝내는 에러만 여기 있다. 도구 에러(ToolError)는 Observe로 바뀌어 루프 안에서 처리된다.

use stepwise_provider::ProviderError;
use thiserror::Error;

/// 모델 출력을 Step으로 바꾸지 못한 이유
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// JSON 객체를 찾을 수 없음
    #[error("No JSON object found: {0}")]
    Syntax(String),

    /// JSON이지만 Step 형태가 아님 (step 필드 없음, 필수 필드 누락 등)
    #[error("Not a valid step: {0}")]
    Shape(String),

    /// 복구 예산 소진
    #[error("Could not parse a step after {attempts} repair attempt(s): {reason}")]
    Exhausted {
        attempts: u32,
        reason: String,
        last_raw: String,
    },
}

/// 턴 실패
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AgentError {
    /// provider에 도달하지 못함 (재시도 후)
    #[error("Transport error after {attempts} attempt(s): {source}")]
    Transport {
        attempts: u32,
        #[source]
        source: ProviderError,
    },

    /// provider가 응답했지만 쓸 수 없는 내용 (재시도 후)
    #[error("Backend returned an unusable response after {attempts} attempt(s): {source}")]
    BadResponse {
        attempts: u32,
        #[source]
        source: ProviderError,
    },

    /// JSON 복구 실패
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// 알려진 step 태그가 아님
    #[error("Unrecognized step '{tag}': {raw}")]
    UnrecognizedStep { tag: String, raw: String },

    /// 반복 한도 초과
    #[error("Turn did not finish within {0} iterations")]
    MaxIterations(u32),

    /// 사용자 중단
    #[error("Cancelled: {0}")]
    Cancelled(String),
}

impl AgentError {
    /// provider 호출 실패를 종류에 맞는 변형으로 감싼다
    pub fn backend(source: ProviderError, attempts: u32) -> Self {
        if source.is_transport() {
            AgentError::Transport { attempts, source }
        } else {
            AgentError::BadResponse { attempts, source }
        }
    }

    /// 진단용 원본 모델 출력 (있으면)
    pub fn raw_output(&self) -> Option<&str> {
        match self {
            AgentError::UnrecognizedStep { raw, .. } => Some(raw),
            AgentError::Parse(ParseError::Exhausted { last_raw, .. }) => Some(last_raw),
            _ => None,
        }
    }
}
