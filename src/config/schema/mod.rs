mod core;
mod llm;
mod observability;

pub use core::Config;
pub use llm::{
    AgentConfig, CustomProviderConfig, GenerationConfig, ReliabilityConfig, RemoteConfig,
};
pub use observability::ObservabilityConfig;
