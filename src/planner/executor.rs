use super::graph::TaskGraph;
use super::node::{NodeOutcome, NodeState};
use crate::error::{ConfigError, NodeError};
use crate::llm::{ProviderConfig, ResilientInvoker, TierRegistry};
use crate::observability::{NoopObserver, Observer, ObserverEvent};
use crate::prompt::CallerInput;
use crate::report::{self, ExecutionResult, NodeReport, RunMetadata};
use chrono::{DateTime, Utc};
use futures_util::stream::{FuturesUnordered, StreamExt};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Runs a [`TaskGraph`] against one provider.
///
/// Scheduling is completion driven: a node starts as soon as all of its
/// dependencies have succeeded, so independent nodes overlap. A failed node
/// fails its transitive dependents on the spot, without calling the model,
/// and the run carries on with whatever is still runnable.
pub struct GraphExecutor {
    registry: Arc<TierRegistry>,
    provider: Arc<ProviderConfig>,
    invoker: Arc<ResilientInvoker>,
    observer: Arc<dyn Observer>,
}

impl GraphExecutor {
    pub fn new(
        registry: Arc<TierRegistry>,
        provider: Arc<ProviderConfig>,
        invoker: Arc<ResilientInvoker>,
    ) -> Self {
        Self {
            registry,
            provider,
            invoker,
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    pub fn provider(&self) -> &ProviderConfig {
        &self.provider
    }

    pub async fn run(
        &self,
        graph: &TaskGraph,
        input: &CallerInput,
    ) -> Result<ExecutionResult, ConfigError> {
        self.run_with_cancel(graph, input, CancellationToken::new())
            .await
    }

    /// Like [`Self::run`], but nodes still pending or running when `cancel`
    /// fires end as `cancelled`. In-flight model calls are dropped.
    pub async fn run_with_cancel(
        &self,
        graph: &TaskGraph,
        input: &CallerInput,
        cancel: CancellationToken,
    ) -> Result<ExecutionResult, ConfigError> {
        self.registry.validate_tiers(&self.provider, graph.tiers())?;

        let run_id = format!("run_{}", Uuid::new_v4().simple());
        let started_at = Utc::now();
        let clock = Instant::now();
        self.observer.record_event(&ObserverEvent::RunStart {
            run_id: run_id.clone(),
            graph: graph.title().to_string(),
            provider: self.provider.name.clone(),
            nodes: graph.len(),
        });
        tracing::info!(
            run_id = run_id.as_str(),
            graph = graph.title(),
            provider = self.provider.name.as_str(),
            nodes = graph.len(),
            "Starting task graph"
        );

        let mut run = RunState::new(graph);
        let mut in_flight = FuturesUnordered::new();
        let mut cancelled = false;

        loop {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            while let Some(index) = run.ready.pop_front() {
                let node = &graph.nodes()[index];
                run.mark_running(index);
                self.observer.record_event(&ObserverEvent::NodeStart {
                    node: node.name.clone(),
                    tier: node.tier,
                });
                tracing::debug!(node = node.name.as_str(), tier = %node.tier, "Node started");

                match node.render_prompt(graph.engine(), input, &run.outputs) {
                    Ok(prompt) => {
                        let invoker = self.invoker.as_ref();
                        let provider = self.provider.as_ref();
                        in_flight.push(async move {
                            let outcome = node.execute(invoker, provider, &prompt).await;
                            (index, outcome)
                        });
                    }
                    Err(error) => {
                        tracing::warn!(node = node.name.as_str(), "{error}");
                        self.settle(&mut run, index, NodeOutcome::failed(error.into()));
                    }
                }
            }

            if in_flight.is_empty() {
                break;
            }

            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    cancelled = true;
                    break;
                }
                Some((index, outcome)) = in_flight.next() => {
                    self.settle(&mut run, index, outcome);
                }
            }
        }
        drop(in_flight);

        if cancelled {
            tracing::warn!(run_id = run_id.as_str(), "Run cancelled");
            for index in 0..graph.len() {
                if !run.slots[index].state.is_terminal() {
                    self.finish(&mut run, index, NodeOutcome::failed(NodeError::Cancelled));
                }
            }
        }

        let nodes = graph
            .topological_order()
            .iter()
            .filter_map(|name| run.index.get(name.as_str()).copied())
            .map(|index| run.report(index))
            .collect::<Vec<_>>();

        let duration = clock.elapsed();
        let metadata = RunMetadata {
            run_id: run_id.clone(),
            provider: self.provider.name.clone(),
            started_at,
            finished_at: Utc::now(),
            duration_ms: millis(duration),
            completed: Vec::new(),
            failed: Vec::new(),
            cancelled,
        };
        let result = report::assemble(graph.title(), graph.final_node(), nodes, metadata);

        self.observer.record_event(&ObserverEvent::RunEnd {
            run_id: run_id.clone(),
            status: result.status.to_string(),
            duration,
        });
        self.observer.flush();
        tracing::info!(
            run_id = run_id.as_str(),
            status = %result.status,
            completed = result.metadata.completed.len(),
            failed = result.metadata.failed.len(),
            duration_ms = result.metadata.duration_ms,
            "Task graph finished"
        );

        Ok(result)
    }

    /// Record a terminal outcome, fail dependents of a failure and queue
    /// dependents whose last dependency just finished.
    fn settle(&self, run: &mut RunState<'_>, index: usize, outcome: NodeOutcome) {
        if !self.finish(run, index, outcome) {
            self.fail_dependents(run, index);
        }

        for position in 0..run.dependents[index].len() {
            let child = run.dependents[index][position];
            run.waiting_on[child] = run.waiting_on[child].saturating_sub(1);
            if run.waiting_on[child] == 0 && run.slots[child].state == NodeState::Pending {
                run.ready.push_back(child);
            }
        }
    }

    /// Store the outcome and emit `NODE_END`. Returns whether the node succeeded.
    fn finish(&self, run: &mut RunState<'_>, index: usize, outcome: NodeOutcome) -> bool {
        let graph = run.graph;
        let node = &graph.nodes()[index];
        match &outcome.result {
            Ok(output) => {
                run.outputs.insert(node.name.clone(), output.clone());
            }
            Err(error) if !matches!(error, NodeError::Cancelled) => {
                tracing::warn!(node = node.name.as_str(), "Node failed: {error}");
            }
            Err(_) => {}
        }

        let slot = &mut run.slots[index];
        slot.duration = slot.started.map(|started| started.elapsed()).unwrap_or_default();
        slot.state = outcome.state();
        self.observer.record_event(&ObserverEvent::NodeEnd {
            node: node.name.clone(),
            status: slot.state.to_string(),
            model: outcome.model.clone(),
            attempts: outcome.attempts,
            duration: slot.duration,
        });
        let succeeded = outcome.succeeded();
        slot.outcome = Some(outcome);
        succeeded
    }

    fn fail_dependents(&self, run: &mut RunState<'_>, root: usize) {
        let graph = run.graph;
        let mut queue = VecDeque::from([root]);
        while let Some(current) = queue.pop_front() {
            for position in 0..run.dependents[current].len() {
                let child = run.dependents[current][position];
                match run.slots[child].state {
                    NodeState::Pending => {
                        let error = NodeError::DependencyFailed {
                            dependencies: run.failed_dependencies(child),
                        };
                        let name = &graph.nodes()[child].name;
                        tracing::warn!(node = name.as_str(), "Skipping node: {error}");
                        self.observer.record_event(&ObserverEvent::NodeEnd {
                            node: name.clone(),
                            status: NodeState::Failed.to_string(),
                            model: None,
                            attempts: 0,
                            duration: Duration::ZERO,
                        });
                        let slot = &mut run.slots[child];
                        slot.state = NodeState::Failed;
                        slot.outcome = Some(NodeOutcome::failed(error));
                        queue.push_back(child);
                    }
                    NodeState::Failed => {
                        let dependencies = run.failed_dependencies(child);
                        if let Some(NodeOutcome {
                            result: Err(NodeError::DependencyFailed { dependencies: known }),
                            ..
                        }) = run.slots[child].outcome.as_mut()
                        {
                            *known = dependencies;
                        }
                    }
                    NodeState::Running | NodeState::Succeeded => {}
                }
            }
        }
    }
}

#[derive(Default)]
struct NodeSlot {
    state: NodeState,
    outcome: Option<NodeOutcome>,
    started: Option<Instant>,
    started_at: Option<DateTime<Utc>>,
    duration: Duration,
}

/// Mutable per-run bookkeeping. Owned by one `run_with_cancel` call.
struct RunState<'g> {
    graph: &'g TaskGraph,
    index: BTreeMap<&'g str, usize>,
    dependents: Vec<Vec<usize>>,
    waiting_on: Vec<usize>,
    slots: Vec<NodeSlot>,
    outputs: BTreeMap<String, String>,
    ready: VecDeque<usize>,
}

impl<'g> RunState<'g> {
    fn new(graph: &'g TaskGraph) -> Self {
        let nodes = graph.nodes();
        let index = nodes
            .iter()
            .enumerate()
            .map(|(position, node)| (node.name.as_str(), position))
            .collect::<BTreeMap<_, _>>();

        let mut dependents = vec![Vec::new(); nodes.len()];
        let mut waiting_on = vec![0; nodes.len()];
        for (position, node) in nodes.iter().enumerate() {
            for dependency in &node.depends_on {
                if let Some(parent) = index.get(dependency.as_str()) {
                    dependents[*parent].push(position);
                    waiting_on[position] += 1;
                }
            }
        }

        let ready = graph
            .topological_order()
            .iter()
            .filter_map(|name| index.get(name.as_str()).copied())
            .filter(|position| waiting_on[*position] == 0)
            .collect();

        Self {
            graph,
            index,
            dependents,
            waiting_on,
            slots: nodes.iter().map(|_| NodeSlot::default()).collect(),
            outputs: BTreeMap::new(),
            ready,
        }
    }

    fn mark_running(&mut self, index: usize) {
        let slot = &mut self.slots[index];
        slot.state = NodeState::Running;
        slot.started = Some(Instant::now());
        slot.started_at = Some(Utc::now());
    }

    /// Dependencies of `index` that have failed, in declared order.
    fn failed_dependencies(&self, index: usize) -> Vec<String> {
        self.graph.nodes()[index]
            .depends_on
            .iter()
            .filter(|name| {
                self.index
                    .get(name.as_str())
                    .is_some_and(|parent| self.slots[*parent].state == NodeState::Failed)
            })
            .cloned()
            .collect()
    }

    fn report(&self, index: usize) -> NodeReport {
        let node = &self.graph.nodes()[index];
        let slot = &self.slots[index];
        let outcome = slot.outcome.as_ref();
        let (output, error) = match outcome.map(|outcome| &outcome.result) {
            Some(Ok(text)) => (Some(text.clone()), None),
            Some(Err(error)) => (None, Some(error.clone())),
            None => (None, Some(NodeError::Cancelled)),
        };

        NodeReport {
            name: node.name.clone(),
            agent: node.agent.clone(),
            tier: node.tier,
            state: slot.state,
            output,
            error,
            explanation: None,
            model: outcome.and_then(|outcome| outcome.model.clone()),
            attempts: outcome.map_or(0, |outcome| outcome.attempts),
            fallbacks: outcome.map_or(0, |outcome| outcome.fallbacks),
            usage: outcome.and_then(|outcome| outcome.usage),
            started_at: slot.started_at,
            duration_ms: millis(slot.duration),
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
