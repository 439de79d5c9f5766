pub mod schema;

pub use schema::{
    AgentConfig, Config, CustomProviderConfig, GenerationConfig, ObservabilityConfig,
    ReliabilityConfig, RemoteConfig,
};
