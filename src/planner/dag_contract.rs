use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DagNode {
    pub id: String,
}

impl DagNode {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// `from` must finish before `to` may start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DagEdge {
    pub from: String,
    pub to: String,
}

impl DagEdge {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Shape of a task graph, checked independently of what the nodes do.
///
/// Ordering ties are broken by declaration order, so a graph always sorts
/// the same way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DagContract {
    pub nodes: Vec<DagNode>,
    pub edges: Vec<DagEdge>,
}

impl DagContract {
    pub fn new(nodes: Vec<DagNode>, edges: Vec<DagEdge>) -> Self {
        Self { nodes, edges }
    }

    /// Build from `(node, dependencies)` pairs.
    pub fn from_dependencies<'a, I, D>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, D)>,
        D: IntoIterator<Item = &'a str>,
    {
        let mut nodes = Vec::new();
        let mut edges = Vec::new();
        for (node, dependencies) in entries {
            nodes.push(DagNode::new(node));
            edges.extend(
                dependencies
                    .into_iter()
                    .map(|dependency| DagEdge::new(dependency, node)),
            );
        }
        Self { nodes, edges }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let node_ids = self.validate_nodes()?;
        let adjacency = self.validate_edges(&node_ids)?;
        validate_cycle_free(&node_ids, &adjacency)
    }

    pub fn topological_sort(&self) -> Result<Vec<String>, ConfigError> {
        Ok(self.layered_sort()?.into_iter().map(|(_, id)| id).collect())
    }

    /// Node ids grouped by depth: layer 0 has no dependencies, and every other
    /// node sits one layer below its deepest dependency.
    pub fn layers(&self) -> Result<Vec<Vec<String>>, ConfigError> {
        let mut layers: Vec<Vec<String>> = Vec::new();
        for (depth, id) in self.layered_sort()? {
            if layers.len() <= depth {
                layers.resize_with(depth + 1, Vec::new);
            }
            layers[depth].push(id);
        }
        Ok(layers)
    }

    /// Kahn's algorithm; yields `(depth, id)` in topological order.
    fn layered_sort(&self) -> Result<Vec<(usize, String)>, ConfigError> {
        self.validate()?;

        let position = self
            .nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (node.id.as_str(), index))
            .collect::<BTreeMap<_, _>>();

        let mut in_degree = BTreeMap::new();
        let mut adjacency = BTreeMap::new();
        for node in &self.nodes {
            in_degree.insert(node.id.as_str(), 0_usize);
            adjacency.insert(node.id.as_str(), Vec::new());
        }

        for edge in &self.edges {
            if let Some(degree) = in_degree.get_mut(edge.to.as_str()) {
                *degree += 1;
            }
            if let Some(neighbors) = adjacency.get_mut(edge.from.as_str()) {
                neighbors.push(edge.to.as_str());
            }
        }

        let mut depth = BTreeMap::new();
        let mut queue = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .filter_map(|(node_id, _)| position.get(node_id).map(|index| (*index, *node_id)))
            .collect::<BTreeSet<_>>();

        let mut sorted = Vec::with_capacity(self.nodes.len());
        while let Some((_, node_id)) = queue.pop_first() {
            let node_depth = depth.get(node_id).copied().unwrap_or(0);
            sorted.push((node_depth, node_id.to_string()));

            if let Some(neighbors) = adjacency.get(node_id) {
                for neighbor in neighbors {
                    let entry = depth.entry(*neighbor).or_insert(0);
                    *entry = (*entry).max(node_depth + 1);
                    if let Some(degree) = in_degree.get_mut(neighbor)
                        && let Some(index) = position.get(neighbor)
                    {
                        *degree -= 1;
                        if *degree == 0 {
                            queue.insert((*index, *neighbor));
                        }
                    }
                }
            }
        }

        if sorted.len() != self.nodes.len() {
            return Err(ConfigError::Cycle("graph could not be fully sorted".into()));
        }

        Ok(sorted)
    }

    fn validate_nodes(&self) -> Result<BTreeSet<String>, ConfigError> {
        let mut node_ids = BTreeSet::new();

        for node in &self.nodes {
            if node.id.is_empty() || node.id.chars().any(char::is_whitespace) {
                return Err(ConfigError::InvalidNodeName(node.id.clone()));
            }

            if !node_ids.insert(node.id.clone()) {
                return Err(ConfigError::DuplicateNode(node.id.clone()));
            }
        }

        Ok(node_ids)
    }

    fn validate_edges(
        &self,
        node_ids: &BTreeSet<String>,
    ) -> Result<BTreeMap<String, Vec<String>>, ConfigError> {
        let mut adjacency = BTreeMap::new();
        let mut seen_edges = BTreeSet::new();

        for node_id in node_ids {
            adjacency.entry(node_id.clone()).or_insert_with(Vec::new);
        }

        for edge in &self.edges {
            let unknown = if node_ids.contains(&edge.from) {
                (!node_ids.contains(&edge.to)).then_some(&edge.to)
            } else {
                Some(&edge.from)
            };
            if let Some(unknown) = unknown {
                let node = if unknown == &edge.from { &edge.to } else { &edge.from };
                return Err(ConfigError::UnknownDependency {
                    node: node.clone(),
                    dependency: unknown.clone(),
                    known: node_ids.iter().cloned().collect::<Vec<_>>().join(", "),
                });
            }

            if !seen_edges.insert((edge.from.clone(), edge.to.clone())) {
                return Err(ConfigError::DuplicateDependency {
                    node: edge.to.clone(),
                    dependency: edge.from.clone(),
                });
            }

            adjacency
                .entry(edge.from.clone())
                .or_insert_with(Vec::new)
                .push(edge.to.clone());
        }

        for neighbors in adjacency.values_mut() {
            neighbors.sort_unstable();
            neighbors.dedup();
        }

        Ok(adjacency)
    }
}

fn validate_cycle_free(
    node_ids: &BTreeSet<String>,
    adjacency: &BTreeMap<String, Vec<String>>,
) -> Result<(), ConfigError> {
    let mut states = BTreeMap::new();
    let mut stack = Vec::new();

    for node_id in node_ids {
        if states.contains_key(node_id) {
            continue;
        }

        if let Some(path) = detect_cycle(node_id, adjacency, &mut states, &mut stack) {
            return Err(ConfigError::Cycle(path.join(" -> ")));
        }
    }

    Ok(())
}

fn detect_cycle(
    node_id: &str,
    adjacency: &BTreeMap<String, Vec<String>>,
    states: &mut BTreeMap<String, VisitState>,
    stack: &mut Vec<String>,
) -> Option<Vec<String>> {
    states.insert(node_id.to_string(), VisitState::Visiting);
    stack.push(node_id.to_string());

    if let Some(neighbors) = adjacency.get(node_id) {
        for neighbor in neighbors {
            match states.get(neighbor.as_str()) {
                Some(VisitState::Visiting) => {
                    if let Some(index) = stack.iter().position(|entry| entry == neighbor) {
                        let mut cycle = stack[index..].to_vec();
                        cycle.push(neighbor.clone());
                        return Some(cycle);
                    }
                    return Some(vec![neighbor.clone(), neighbor.clone()]);
                }
                Some(VisitState::Visited) => {}
                None => {
                    if let Some(path) = detect_cycle(neighbor, adjacency, states, stack) {
                        return Some(path);
                    }
                }
            }
        }
    }

    stack.pop();
    states.insert(node_id.to_string(), VisitState::Visited);
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Visiting,
    Visited,
}
