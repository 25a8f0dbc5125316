mod provider;
mod provider_type;

pub use provider::{ProviderSelection, PROVIDER_FILE};
pub use provider_type::ProviderType;
