//! Registry - Provider 선택 관리
//!
//! - `provider/` - LLM Provider 종류와 저장된 선택 레코드 (자체 load/save)

pub mod provider;

// Provider
pub use provider::{ProviderSelection, ProviderType, PROVIDER_FILE};
