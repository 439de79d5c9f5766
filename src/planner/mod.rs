mod dag_contract;
mod executor;
mod graph;
mod node;

pub use dag_contract::{DagContract, DagEdge, DagNode};
pub use executor::GraphExecutor;
pub use graph::TaskGraph;
pub use node::{CONTEXT_KEY, NodeOutcome, NodeState, TaskNode, UPSTREAM_KEY};
