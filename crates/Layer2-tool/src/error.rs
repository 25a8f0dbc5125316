//! Tool error types

use thiserror::Error;

/// 도구 조회/실행 에러
///
/// Agent 루프는 이 에러를 중단 사유로 쓰지 않는다. 모두 Observe 메시지로 모델에게 돌려준다.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    /// 등록되지 않은 도구 이름
    #[error("Tool '{name}' not found. Available tools: {}", format_names(.available))]
    NotFound { name: String, available: Vec<String> },

    /// 같은 이름이 이미 등록됨
    #[error("Tool '{0}' is already registered")]
    Duplicate(String),

    /// 입력 형태가 도구 계약과 맞지 않음
    #[error("Invalid input for {tool}: {message}")]
    InvalidInput { tool: String, message: String },

    /// 도구가 실행되었지만 실패함
    #[error("{tool} failed: {message}")]
    Execution { tool: String, message: String },

    /// 실행 시간 초과
    #[error("{tool} timed out after {secs}s")]
    Timeout { tool: String, secs: u64 },
}

impl ToolError {
    pub fn invalid_input(tool: impl Into<String>, message: impl Into<String>) -> Self {
        ToolError::InvalidInput {
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn execution(tool: impl Into<String>, message: impl Into<String>) -> Self {
        ToolError::Execution {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

fn format_names(names: &[String]) -> String {
    if names.is_empty() {
        "(none)".to_string()
    } else {
        names.join(", ")
    }
}
