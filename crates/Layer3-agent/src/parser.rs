//! JSON Step Parser & Repair Engine
//!
//! 모델 출력은 신뢰할 수 없다. 잘리거나, 설명문에 감싸이거나, 코드 펜스 안에 들어 있다.
//!
//! 순서:
//! 1. 전체 텍스트를 그대로 decode (코드 펜스만 벗긴다)
//! 2. 텍스트 안의 균형 잡힌 `{...}` 구간을 순서대로 decode
//! 3. 그래도 실패하면 모델에게 단독 요청으로 JSON 복구를 맡기고 1부터 다시
//! 4. 복구 횟수는 제한된다. 소진되면 `ParseError::Exhausted`

use crate::error::{AgentError, ParseError};
use crate::prompt;
use crate::retry::{with_retry, RetryConfig};
use crate::step::{Step, StepKind};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;
use stepwise_provider::{Message, Provider, TokenUsage};
use stepwise_tool::ToolInput;
use thiserror::Error;
use tracing::{debug, warn};

/// 한 응답에서 시도할 `{` 시작 위치 수 상한 (짝이 맞지 않는 시작도 센다)
const MAX_CANDIDATES: usize = 64;

/// 문자열 안에 인코딩된 JSON을 한 단계까지만 풀어본다
const MAX_NESTING: u8 = 1;

// ============================================================================
// Local decoding
// ============================================================================

/// Why a piece of text is not a step
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// JSON 자체가 아님
    #[error("{0}")]
    Syntax(String),

    /// JSON이지만 step 형태가 아님
    #[error("{0}")]
    Shape(String),

    /// step 태그를 모름 (복구 대상 아님)
    #[error("unrecognized step '{tag}'")]
    Unrecognized { tag: String },
}

impl DecodeError {
    /// 여러 후보가 실패했을 때 보고할 에러 우선순위
    fn rank(&self) -> u8 {
        match self {
            DecodeError::Syntax(_) => 0,
            DecodeError::Shape(_) => 1,
            DecodeError::Unrecognized { .. } => 2,
        }
    }
}

/// Decode raw model text into a step without contacting the model
pub fn decode(raw: &str) -> Result<Step, DecodeError> {
    decode_at(raw, 0)
}

fn decode_at(raw: &str, depth: u8) -> Result<Step, DecodeError> {
    let text = strip_code_fence(raw.trim());
    if text.is_empty() {
        return Err(DecodeError::Syntax("empty response".to_string()));
    }

    // 1. 전체 텍스트
    let mut best = match serde_json::from_str::<Value>(text) {
        Ok(Value::String(inner)) if depth < MAX_NESTING => {
            return decode_at(&inner, depth + 1);
        }
        Ok(value) => match step_from_value(value) {
            Ok(step) => return Ok(step),
            Err(e @ DecodeError::Unrecognized { .. }) => return Err(e),
            Err(e) => e,
        },
        Err(e) => DecodeError::Syntax(e.to_string()),
    };

    // 2. 균형 잡힌 `{...}` 구간
    for span in object_spans(text) {
        let Ok(value) = serde_json::from_str::<Value>(span) else {
            continue;
        };
        match step_from_value(value) {
            Ok(step) => {
                debug!("Recovered step from embedded JSON ({} bytes)", span.len());
                return Ok(step);
            }
            Err(e) if e.rank() > best.rank() => best = e,
            Err(_) => {}
        }
    }

    Err(best)
}

/// 텍스트 전체가 ```json ... ``` 로 감싸져 있으면 안쪽만 반환
fn strip_code_fence(text: &str) -> &str {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    let fence = FENCE.get_or_init(|| Regex::new(r"(?s)^```[A-Za-z0-9_-]*\s*(.*?)\s*```$").ok());

    fence
        .as_ref()
        .and_then(|re| re.captures(text))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(text)
}

/// 앞쪽 `{` 위치들에서 시작하는 균형 잡힌 객체 구간
///
/// 시작 위치마다 끝까지 스캔하므로 시작 위치 수를 먼저 자른다.
fn object_spans(text: &str) -> impl Iterator<Item = &str> {
    text.char_indices()
        .filter(|(_, ch)| *ch == '{')
        .take(MAX_CANDIDATES)
        .filter_map(move |(start, _)| {
            find_object_end(&text[start..]).map(|len| &text[start..start + len])
        })
}

/// `{`로 시작하는 입력에서 짝이 맞는 `}` 다음 위치 (문자열/이스케이프 인식)
fn find_object_end(input: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in input.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + ch.len_utf8());
                }
            }
            _ => {}
        }
    }

    None
}

fn step_from_value(value: Value) -> Result<Step, DecodeError> {
    match value {
        Value::Object(map) => step_from_object(map),
        other => Err(DecodeError::Shape(format!(
            "expected a JSON object, got {}",
            type_name(&other)
        ))),
    }
}

fn step_from_object(map: Map<String, Value>) -> Result<Step, DecodeError> {
    let tag = match map.get("step") {
        Some(Value::String(tag)) if !tag.trim().is_empty() => tag.clone(),
        Some(Value::String(_)) => {
            return Err(DecodeError::Shape("\"step\" is empty".to_string()));
        }
        Some(other) => {
            return Err(DecodeError::Shape(format!(
                "\"step\" must be a string, got {}",
                type_name(other)
            )));
        }
        None => {
            return Err(DecodeError::Shape(
                "missing required field \"step\"".to_string(),
            ));
        }
    };

    let kind = StepKind::from_tag(&tag).ok_or_else(|| DecodeError::Unrecognized {
        tag: tag.trim().to_string(),
    })?;
    let content = text_field(&map, "content");

    match kind {
        StepKind::Think => Ok(Step::Think {
            content: content.unwrap_or_default(),
        }),
        StepKind::Observe => Ok(Step::Observe {
            content: content.unwrap_or_default(),
        }),
        StepKind::Output => content
            .map(|content| Step::Output { content })
            .ok_or_else(|| DecodeError::Shape("output step requires \"content\"".to_string())),
        StepKind::Action => {
            let tool = text_field(&map, "tool")
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .ok_or_else(|| DecodeError::Shape("action step requires \"tool\"".to_string()))?;
            let input = map
                .get("input")
                .cloned()
                .map(ToolInput::from)
                .unwrap_or_default();
            Ok(Step::Action { tool, input })
        }
    }
}

/// 문자열은 그대로, 다른 값은 JSON 텍스트로. null/없음은 None
fn text_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ============================================================================
// Repair
// ============================================================================

/// Parse result with repair bookkeeping
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedStep {
    pub step: Step,
    /// 최종적으로 decode된 원본 텍스트
    pub raw: String,
    /// 사용한 복구 요청 수
    pub repairs: u32,
    /// 복구 요청에 쓴 토큰
    pub repair_usage: TokenUsage,
}

/// Step parser with model-assisted repair
#[derive(Debug, Clone)]
pub struct StepParser {
    repair_attempts: u32,
    retry: RetryConfig,
}

impl Default for StepParser {
    fn default() -> Self {
        Self::new(2)
    }
}

impl StepParser {
    pub fn new(repair_attempts: u32) -> Self {
        Self {
            repair_attempts,
            retry: RetryConfig::no_retry(),
        }
    }

    /// 복구 요청의 transport 재시도 정책
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn repair_attempts(&self) -> u32 {
        self.repair_attempts
    }

    /// Parse raw text, asking `provider` to repair it when local decoding fails
    pub async fn parse(&self, raw: &str, provider: &dyn Provider) -> Result<ParsedStep, AgentError> {
        self.parse_with(raw, provider, |_, _| {}).await
    }

    /// `on_repair(attempt, reason)`는 각 복구 요청 직전에 호출된다
    pub async fn parse_with<F>(
        &self,
        raw: &str,
        provider: &dyn Provider,
        mut on_repair: F,
    ) -> Result<ParsedStep, AgentError>
    where
        F: FnMut(u32, &str),
    {
        let mut current = raw.to_string();
        let mut repair_usage = TokenUsage::default();
        let mut attempt = 0;

        loop {
            let reason = match decode(&current) {
                Ok(step) => {
                    return Ok(ParsedStep {
                        step,
                        raw: current,
                        repairs: attempt,
                        repair_usage,
                    });
                }
                Err(DecodeError::Unrecognized { tag }) => {
                    return Err(AgentError::UnrecognizedStep { tag, raw: current });
                }
                Err(e) => e.to_string(),
            };

            if attempt >= self.repair_attempts {
                warn!(
                    "Giving up on step after {} repair attempt(s): {}",
                    attempt, reason
                );
                return Err(ParseError::Exhausted {
                    attempts: attempt,
                    reason,
                    last_raw: current,
                }
                .into());
            }

            attempt += 1;
            warn!(
                "Invalid step ({}), requesting repair {}/{}",
                reason, attempt, self.repair_attempts
            );
            on_repair(attempt, &reason);

            // 대화 기록 없이 단독 요청
            let request = [
                Message::system(prompt::repair_prompt()),
                Message::user(prompt::repair_request(&current, &reason)),
            ];
            let response = with_retry(
                &self.retry,
                "repair",
                || provider.generate(&request),
                |_, _, _| {},
            )
            .await
            .map_err(|e| AgentError::backend(e.error, e.attempts))?;

            debug!("Repair response: {}", response.content);
            repair_usage.add(&response.usage);
            current = response.content;
        }
    }
}
