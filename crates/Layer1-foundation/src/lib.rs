//! # stepwise-foundation
//!
//! Foundation layer for Stepwise:
//! - Error: 공통 에러 타입
//! - Storage: JsonStore (글로벌 / 프로젝트 설정 파일)
//! - Registry: Provider 선택 레코드 (provider.json)
//! - Config: Agent 루프 설정 (settings.json)
//!
//! ## 설정 우선순위
//!
//! ```text
//! 글로벌 (~/.config/stepwise/)  →  프로젝트 (.stepwise/)  →  환경변수  →  CLI 플래그
//!          (낮음)                                                        (높음)
//! ```

pub mod config;
pub mod error;
pub mod registry;
pub mod storage;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Config (설정)
// ============================================================================
pub use config::{AgentSettings, SETTINGS_FILE};

// ============================================================================
// Registry (레지스트리)
// ============================================================================
pub use registry::{ProviderSelection, ProviderType, PROVIDER_FILE};

// ============================================================================
// Storage (저장소)
// ============================================================================
pub use storage::JsonStore;
