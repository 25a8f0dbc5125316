//! Agent Loop - JSON step state machine
//!
//! ```text
//! AwaitingModel ──think──▶ Thinking ──────────────▶ AwaitingModel
//!               ──action─▶ Acting ──▶ Observing ──▶ AwaitingModel
//!               ──output─▶ Done
//!               ──error──▶ Failed
//! ```
//!
//! 한 번에 하나의 backend 호출 또는 도구 호출만 진행된다.
//! 도구 에러와 알 수 없는 도구는 Observe로 바꿔서 모델에게 돌려준다.

use crate::error::AgentError;
use crate::history::Conversation;
use crate::parser::StepParser;
use crate::prompt::{SystemPromptBuilder, OBSERVE_NUDGE};
use crate::retry::{with_retry, RetryConfig};
use crate::steering::StopHandle;
use crate::step::Step;
use std::sync::Arc;
use std::time::Duration;
use stepwise_foundation::AgentSettings;
use stepwise_provider::{Provider, ProviderResponse, TokenUsage};
use stepwise_tool::{ToolError, ToolInput, ToolRegistry};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

// ============================================================================
// State & Events
// ============================================================================

/// Loop state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    /// backend 응답 대기
    AwaitingModel,
    Thinking,
    /// 도구 실행 중
    Acting,
    /// 도구 결과를 기록하는 중
    Observing,
    Done,
    Failed,
}

impl AgentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentState::AwaitingModel => "awaiting_model",
            AgentState::Thinking => "thinking",
            AgentState::Acting => "acting",
            AgentState::Observing => "observing",
            AgentState::Done => "done",
            AgentState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentState::Done | AgentState::Failed)
    }
}

/// Events emitted by the agent during a turn
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    /// State transition
    StateChanged(AgentState),

    /// Think step content
    Thought(String),

    /// Tool execution started
    ToolStart { tool: String, input: String },

    /// Tool execution completed
    ToolComplete {
        tool: String,
        result: String,
        success: bool,
    },

    /// Observation fed back to the model
    Observation(String),

    /// Backend call failed and will be retried
    Retry {
        attempt: u32,
        delay_ms: u64,
        error: String,
    },

    /// Model-assisted JSON repair requested
    Repair { attempt: u32, reason: String },

    /// Something was ignored but the turn continues
    Warning(String),

    /// Token usage update (per backend call)
    Usage {
        input_tokens: u32,
        output_tokens: u32,
    },

    /// Final answer
    Output(String),
}

// ============================================================================
// Turn result
// ============================================================================

/// Successful turn
#[derive(Debug, Clone)]
pub struct TurnReport {
    /// Output step content
    pub output: String,

    /// 사용한 backend 호출 수 (복구 요청 제외)
    pub iterations: u32,

    /// 복구 요청 포함 누적 토큰
    pub usage: TokenUsage,

    pub conversation: Conversation,
}

/// Failed turn, with the history kept for diagnostics
#[derive(Error, Debug, Clone)]
#[error("{error}")]
pub struct TurnFailure {
    pub error: AgentError,
    pub iterations: u32,
    pub usage: TokenUsage,
    pub conversation: Conversation,
}

// ============================================================================
// Agent
// ============================================================================

/// Drives one user turn through the step protocol
pub struct Agent {
    provider: Arc<dyn Provider>,
    tools: Arc<ToolRegistry>,
    settings: AgentSettings,
    system_prompt: String,
    parser: StepParser,
    retry: RetryConfig,
    event_tx: Option<mpsc::Sender<AgentEvent>>,
    stop: StopHandle,
}

impl Agent {
    /// Create a new agent. system prompt는 registry의 도구 정의로 만든다
    pub fn new(provider: Arc<dyn Provider>, tools: Arc<ToolRegistry>, settings: AgentSettings) -> Self {
        let system_prompt = SystemPromptBuilder::new()
            .with_tools(tools.definitions())
            .build();
        let retry = RetryConfig::from_settings(&settings);
        let parser = StepParser::new(settings.repair_attempts).with_retry(retry.clone());

        Self {
            provider,
            tools,
            settings,
            system_prompt,
            parser,
            retry,
            event_tx: None,
            stop: StopHandle::new(),
        }
    }

    /// Override the backoff policy (backend calls and repair requests)
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.parser = StepParser::new(self.settings.repair_attempts).with_retry(retry.clone());
        self.retry = retry;
        self
    }

    pub fn with_event_sender(mut self, tx: mpsc::Sender<AgentEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// Handle for stopping the running turn from elsewhere
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    /// Run one user turn to completion
    ///
    /// 성공하든 실패하든 이번 턴의 대화 기록을 돌려준다. 다음 턴은 새 기록으로 시작한다.
    pub async fn run(&self, query: &str) -> Result<TurnReport, TurnFailure> {
        let mut conversation = Conversation::new(self.system_prompt.as_str());
        conversation.push_user(query);

        info!(
            "Starting turn {}: provider={}, model={}, max_iterations={}",
            conversation.id(),
            self.provider.metadata().id,
            self.provider.model(),
            self.settings.max_iterations
        );

        let mut usage = TokenUsage::default();
        let mut iterations = 0;
        let result = self
            .drive(&mut conversation, &mut usage, &mut iterations)
            .await;

        match result {
            Ok(output) => {
                self.set_state(AgentState::Done).await;
                info!(
                    "Turn {} done in {} iteration(s), {} tokens",
                    conversation.id(),
                    iterations,
                    usage.total()
                );
                Ok(TurnReport {
                    output,
                    iterations,
                    usage,
                    conversation,
                })
            }
            Err(error) => {
                self.set_state(AgentState::Failed).await;
                warn!(
                    "Turn {} failed after {} iteration(s): {}",
                    conversation.id(),
                    iterations,
                    error
                );
                Err(TurnFailure {
                    error,
                    iterations,
                    usage,
                    conversation,
                })
            }
        }
    }

    async fn drive(
        &self,
        conversation: &mut Conversation,
        usage: &mut TokenUsage,
        iterations: &mut u32,
    ) -> Result<String, AgentError> {
        let max_iterations = self.settings.max_iterations;

        loop {
            // 진행 중인 호출이 끝난 뒤에만 중단 요청을 반영한다
            if self.stop.is_stopped() {
                return Err(AgentError::Cancelled("stop requested".to_string()));
            }
            if *iterations >= max_iterations {
                return Err(AgentError::MaxIterations(max_iterations));
            }
            *iterations += 1;

            self.set_state(AgentState::AwaitingModel).await;
            let response = self.generate(conversation).await?;
            usage.add(&response.usage);
            self.emit(AgentEvent::Usage {
                input_tokens: response.usage.input_tokens,
                output_tokens: response.usage.output_tokens,
            })
            .await;
            debug!("Model response: {}", response.content);

            let parsed = self
                .parser
                .parse_with(&response.content, self.provider.as_ref(), |attempt, reason| {
                    conversation.record_repair();
                    self.try_emit(AgentEvent::Repair {
                        attempt,
                        reason: reason.to_string(),
                    });
                })
                .await?;
            usage.add(&parsed.repair_usage);

            let step = parsed.step;
            match &step {
                Step::Think { content } => {
                    self.set_state(AgentState::Thinking).await;
                    info!("Think: {}", content);
                    conversation.push_assistant(step.to_json());
                    self.emit(AgentEvent::Thought(content.clone())).await;
                }
                Step::Action { tool, input } => {
                    self.set_state(AgentState::Acting).await;
                    conversation.push_assistant(step.to_json());

                    let observation = self.dispatch(tool, input.clone()).await;

                    self.set_state(AgentState::Observing).await;
                    conversation.push_assistant(Step::observe(observation.as_str()).to_json());
                    self.emit(AgentEvent::Observation(observation)).await;
                }
                Step::Observe { content } => {
                    // observe는 루프만 만든다. 모델이 보낸 것은 기록하지 않고 다시 요청
                    warn!("Ignoring observe step emitted by the model: {}", content);
                    conversation.push_user(OBSERVE_NUDGE);
                    self.emit(AgentEvent::Warning(
                        "model emitted an observe step; re-prompting".to_string(),
                    ))
                    .await;
                }
                Step::Output { content } => {
                    conversation.push_assistant(step.to_json());
                    self.emit(AgentEvent::Output(content.clone())).await;
                    return Ok(content.clone());
                }
            }
        }
    }

    /// backend 호출 (transport 실패만 재시도)
    async fn generate(&self, conversation: &mut Conversation) -> Result<ProviderResponse, AgentError> {
        let history = conversation.messages();
        let mut retries = 0u32;

        let result = with_retry(
            &self.retry,
            "generate",
            || self.provider.generate(history),
            |attempt, delay, error| {
                retries += 1;
                self.try_emit(AgentEvent::Retry {
                    attempt,
                    delay_ms: delay.as_millis() as u64,
                    error: error.to_string(),
                });
            },
        )
        .await;

        for _ in 0..retries {
            conversation.record_retry();
        }

        result.map_err(|e| AgentError::backend(e.error, e.attempts))
    }

    /// 도구 실행 결과를 observation 텍스트로
    async fn dispatch(&self, tool: &str, input: ToolInput) -> String {
        info!("Calling tool {}({})", tool, input);
        self.emit(AgentEvent::ToolStart {
            tool: tool.to_string(),
            input: input.as_text(),
        })
        .await;

        let result = match self.tools.resolve(tool) {
            Ok(handle) => {
                let limit = tool_limit(
                    Duration::from_secs(self.settings.tool_timeout_secs),
                    handle.time_limit(&input),
                );
                match tokio::time::timeout(limit, handle.execute(input)).await {
                    Ok(result) => result,
                    Err(_) => Err(ToolError::Timeout {
                        tool: tool.to_string(),
                        secs: limit.as_secs(),
                    }),
                }
            }
            Err(e) => Err(e),
        };

        let (observation, success) = match result {
            Ok(output) => (output, true),
            Err(e) => {
                warn!("Tool {} failed: {}", tool, e);
                (format!("Error: {}", e), false)
            }
        };

        self.emit(AgentEvent::ToolComplete {
            tool: tool.to_string(),
            result: observation.clone(),
            success,
        })
        .await;

        observation
    }

    async fn set_state(&self, state: AgentState) {
        debug!("State -> {}", state.as_str());
        self.emit(AgentEvent::StateChanged(state)).await;
    }

    async fn emit(&self, event: AgentEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event).await;
        }
    }

    /// 동기 콜백 안에서 쓰는 전송 (채널이 가득 차면 버린다)
    fn try_emit(&self, event: AgentEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.try_send(event);
        }
    }
}

/// 도구가 자체 제한 시간을 걸면 그 값에 여유를 더해 바깥 제한으로 쓴다
///
/// 도구 쪽 타임아웃이 먼저 끝나야 도구가 만든 에러 메시지가 모델에게 간다.
const TOOL_LIMIT_GRACE: Duration = Duration::from_secs(5);

fn tool_limit(default: Duration, own: Option<Duration>) -> Duration {
    match own {
        Some(own) if own + TOOL_LIMIT_GRACE > default => own + TOOL_LIMIT_GRACE,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_limit_prefers_longer_tool_timeout() {
        let default = Duration::from_secs(60);
        assert_eq!(tool_limit(default, None), default);
        assert_eq!(tool_limit(default, Some(Duration::from_secs(10))), default);
        assert_eq!(
            tool_limit(default, Some(Duration::from_secs(300))),
            Duration::from_secs(305)
        );
    }

    #[test]
    fn test_state_names() {
        assert_eq!(AgentState::AwaitingModel.as_str(), "awaiting_model");
        assert!(AgentState::Done.is_terminal());
        assert!(AgentState::Failed.is_terminal());
        assert!(!AgentState::Acting.is_terminal());
    }

    #[test]
    fn test_turn_failure_display() {
        let failure = TurnFailure {
            error: AgentError::MaxIterations(3),
            iterations: 3,
            usage: TokenUsage::default(),
            conversation: Conversation::new("system"),
        };
        assert_eq!(failure.to_string(), "Turn did not finish within 3 iterations");
    }
}
