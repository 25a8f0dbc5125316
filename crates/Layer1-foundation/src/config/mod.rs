//! Config - Agent 루프 설정
//!
//! - `settings.rs` - 반복 횟수, 재시도, 타임아웃 기본값 (settings.json)

mod settings;

pub use settings::{AgentSettings, SETTINGS_FILE};
