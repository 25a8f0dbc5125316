//! # stepwise-agent
//!
//! JSON step protocol 기반 Agent Loop입니다.
//! 모델은 한 번에 하나의 step(think / action / observe / output)을 JSON으로 출력하고,
//! 루프는 각 step을 해석해서 도구를 호출하거나 턴을 끝냅니다.
//!
//! ## 핵심 컴포넌트
//!
//! - **Step**: 프로토콜 단위 (`Think`, `Action`, `Observe`, `Output`)
//! - **StepParser**: 직접 decode → `{...}` 구간 추출 → 모델 기반 복구 (횟수 제한)
//! - **Agent**: 상태 머신. 반복 횟수 제한, transport 재시도, 도구 에러를 Observe로 변환
//! - **StopHandle**: 진행 중인 호출이 끝난 뒤 턴을 멈춘다
//!
//! ## 사용 예
//!
//! ```ignore
//! use stepwise_agent::{Agent, AgentEvent};
//! use stepwise_foundation::AgentSettings;
//! use stepwise_tool::ToolRegistry;
//! use std::sync::Arc;
//!
//! let tools = Arc::new(ToolRegistry::with_builtins());
//! let (tx, mut rx) = tokio::sync::mpsc::channel(100);
//! let agent = Agent::new(provider, tools, AgentSettings::default()).with_event_sender(tx);
//!
//! // 이벤트 전송은 채널이 비기를 기다린다. 턴이 도는 동안 반드시 받아 줘야 한다
//! let printer = tokio::spawn(async move {
//!     while let Some(event) = rx.recv().await {
//!         if let AgentEvent::Thought(content) = event {
//!             println!("🧠: {}", content);
//!         }
//!     }
//! });
//!
//! match agent.run("What is the weather of Paris?").await {
//!     Ok(report) => println!("{}", report.output),
//!     Err(failure) => eprintln!("{}", failure.error),
//! }
//! drop(agent);
//! printer.await?;
//! ```

pub mod agent;
pub mod error;
pub mod history;
pub mod parser;
pub mod prompt;
pub mod retry;
pub mod steering;
pub mod step;

// ============================================================================
// Agent Loop
// ============================================================================

pub use agent::{Agent, AgentEvent, AgentState, TurnFailure, TurnReport};
pub use history::Conversation;
pub use steering::StopHandle;

// ============================================================================
// Step protocol
// ============================================================================

pub use parser::{decode, DecodeError, ParsedStep, StepParser};
pub use prompt::{PromptExample, SystemPromptBuilder};
pub use step::{Step, StepKind};

// ============================================================================
// Errors & Retry
// ============================================================================

pub use error::{AgentError, ParseError};
pub use retry::{with_retry, RetryConfig, RetryDecision, RetryError, RetryableError};
