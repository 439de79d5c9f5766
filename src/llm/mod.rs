pub mod backoff;
pub mod classifier;
pub mod compatible;
pub mod echo;
pub mod http_client;
pub mod reliable;
pub mod tiers;
pub mod traits;
pub mod types;

pub use backoff::BackoffPolicy;
pub use classifier::{FailureAction, FailureClassifier, ThrottleClassifier};
pub use compatible::OpenAiCompatibleClient;
pub use echo::EchoClient;
pub use reliable::ResilientInvoker;
pub use tiers::{ModelTier, ProviderConfig, TierRegistry};
pub use traits::{ModelClient, ModelFuture};
pub use types::{
    AttemptOutcome, GenerationParams, Invocation, InvocationAttempt, InvocationSuccess,
    ModelRequest, ModelResponse, TokenUsage,
};
