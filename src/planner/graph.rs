use super::dag_contract::DagContract;
use super::node::TaskNode;
use crate::error::ConfigError;
use crate::llm::tiers::ModelTier;
use crate::prompt::PromptEngine;
use std::collections::BTreeSet;

/// A validated set of task nodes ready to execute.
///
/// Construction is where malformed graphs are rejected: duplicate or blank
/// names, unknown dependencies, cycles and templates that do not compile.
pub struct TaskGraph {
    title: String,
    nodes: Vec<TaskNode>,
    order: Vec<String>,
    layers: Vec<Vec<String>>,
    final_node: String,
    engine: PromptEngine,
}

impl std::fmt::Debug for TaskGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskGraph")
            .field("title", &self.title)
            .field("order", &self.order)
            .field("final_node", &self.final_node)
            .finish_non_exhaustive()
    }
}

impl TaskGraph {
    /// The final node defaults to the last node in topological order.
    pub fn new(title: impl Into<String>, nodes: Vec<TaskNode>) -> Result<Self, ConfigError> {
        if nodes.is_empty() {
            return Err(ConfigError::EmptyGraph);
        }

        let contract = DagContract::from_dependencies(nodes.iter().map(|node| {
            (
                node.name.as_str(),
                node.depends_on.iter().map(String::as_str),
            )
        }));
        let order = contract.topological_sort()?;
        let layers = contract.layers()?;

        let mut engine = PromptEngine::new();
        for node in &nodes {
            engine
                .add_template(&node.name, &node.template)
                .map_err(|message| ConfigError::InvalidTemplate {
                    node: node.name.clone(),
                    message,
                })?;
        }

        let final_node = order.last().cloned().ok_or(ConfigError::EmptyGraph)?;

        Ok(Self {
            title: title.into(),
            nodes,
            order,
            layers,
            final_node,
            engine,
        })
    }

    pub fn with_final_node(mut self, name: &str) -> Result<Self, ConfigError> {
        if self.node(name).is_none() {
            return Err(ConfigError::UnknownFinalNode(name.to_string()));
        }
        self.final_node = name.to_string();
        Ok(self)
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Nodes in declaration order.
    pub fn nodes(&self) -> &[TaskNode] {
        &self.nodes
    }

    pub fn node(&self, name: &str) -> Option<&TaskNode> {
        self.nodes.iter().find(|node| node.name == name)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn topological_order(&self) -> &[String] {
        &self.order
    }

    pub fn layers(&self) -> &[Vec<String>] {
        &self.layers
    }

    pub fn final_node(&self) -> &str {
        &self.final_node
    }

    pub fn engine(&self) -> &PromptEngine {
        &self.engine
    }

    /// Every tier some node runs on.
    pub fn tiers(&self) -> BTreeSet<ModelTier> {
        self.nodes.iter().map(|node| node.tier).collect()
    }
}
