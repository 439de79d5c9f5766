pub mod aggregator;
pub mod document;
pub mod types;
pub mod writer;

pub use aggregator::{assemble, explain, overall_status};
pub use types::{ExecutionResult, NodeReport, RunMetadata, RunStatus};
pub use writer::{WrittenOutputs, write_outputs};
