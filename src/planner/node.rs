use crate::error::{InvokeError, NodeError, TemplateError};
use crate::llm::tiers::{ModelTier, ProviderConfig};
use crate::llm::types::{Invocation, InvocationAttempt, TokenUsage};
use crate::llm::ResilientInvoker;
use crate::prompt::{CallerInput, PromptEngine};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Template key holding a map of dependency name to its output.
pub const UPSTREAM_KEY: &str = "upstream";
/// Template key holding all dependency outputs as one markdown block.
pub const CONTEXT_KEY: &str = "context";

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NodeState {
    #[default]
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl NodeState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// One unit of work in a task graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskNode {
    pub name: String,
    /// Agent the node speaks as; used for overrides and reporting.
    pub agent: String,
    pub tier: ModelTier,
    pub template: String,
    /// Dependencies in declared order. Their outputs are rendered in this order.
    pub depends_on: Vec<String>,
    pub system_prompt: Option<String>,
    pub pinned_model: Option<String>,
}

impl TaskNode {
    pub fn new(name: impl Into<String>, tier: ModelTier, template: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            agent: name.clone(),
            name,
            tier,
            template: template.into(),
            depends_on: Vec::new(),
            system_prompt: None,
            pinned_model: None,
        }
    }

    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = agent.into();
        self
    }

    pub fn depends_on<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on = dependencies.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_pinned_model(mut self, model: Option<String>) -> Self {
        self.pinned_model = model.filter(|model| !model.trim().is_empty());
        self
    }

    pub fn with_tier(mut self, tier: ModelTier) -> Self {
        self.tier = tier;
        self
    }

    /// Substitute caller input and dependency outputs into the template.
    ///
    /// Uses the compiled template registered under the node's name when the
    /// engine has one, otherwise renders the raw template. Only outputs of
    /// declared dependencies are visible; the result depends on nothing but
    /// the arguments.
    pub fn render_prompt(
        &self,
        engine: &PromptEngine,
        input: &CallerInput,
        upstream: &BTreeMap<String, String>,
    ) -> Result<String, TemplateError> {
        let mut context = input.to_context();

        let mut visible = serde_json::Map::new();
        let mut sections = Vec::with_capacity(self.depends_on.len());
        for dependency in &self.depends_on {
            if let Some(output) = upstream.get(dependency) {
                visible.insert(dependency.clone(), output.clone().into());
                sections.push(format!("## {dependency}\n\n{}", output.trim_end()));
            }
        }
        context.insert(UPSTREAM_KEY, &visible);
        context.insert(CONTEXT_KEY, &sections.join("\n\n"));

        let rendered = if engine.has_template(&self.name) {
            engine.render(&self.name, &context)
        } else {
            engine.render_string(&self.template, &context)
        };

        rendered.map_err(|message| TemplateError {
            node: self.name.clone(),
            message,
        })
    }

    /// Hand the rendered prompt to the invoker. The node never retries on its
    /// own; whatever the invoker returns is final for this run.
    pub async fn execute(
        &self,
        invoker: &ResilientInvoker,
        provider: &ProviderConfig,
        prompt: &str,
    ) -> NodeOutcome {
        let invocation = Invocation::new(&self.name, self.tier, prompt)
            .with_system_prompt(self.system_prompt.as_deref())
            .with_pinned_model(self.pinned_model.as_deref());

        match invoker.invoke(invocation, provider).await {
            Ok(success) => NodeOutcome {
                result: Ok(success.text),
                model: Some(success.model),
                attempts: success.total_attempts,
                fallbacks: success.fallbacks,
                usage: success.usage,
                history: success.history,
            },
            Err(InvokeError::Exhausted(error)) => NodeOutcome {
                model: Some(error.last_model.clone()),
                attempts: error.total_attempts,
                fallbacks: error.fallbacks,
                usage: None,
                history: error.history.clone(),
                result: Err(error.into()),
            },
            Err(InvokeError::Config(error)) => NodeOutcome::failed(NodeError::ModelInvocation {
                code: "configuration".into(),
                message: error.to_string(),
                tier: self.tier,
                model: self.pinned_model.clone().unwrap_or_default(),
                attempts: 0,
            }),
        }
    }
}

/// What running a node produced.
#[derive(Debug, Clone)]
pub struct NodeOutcome {
    pub result: Result<String, NodeError>,
    /// Model that answered, or the last one tried on failure.
    pub model: Option<String>,
    pub attempts: u32,
    pub fallbacks: u32,
    pub usage: Option<TokenUsage>,
    pub history: Vec<InvocationAttempt>,
}

impl NodeOutcome {
    /// Failure that never reached the model.
    pub fn failed(error: NodeError) -> Self {
        Self {
            attempts: error.attempts(),
            result: Err(error),
            model: None,
            fallbacks: 0,
            usage: None,
            history: Vec::new(),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }

    pub fn state(&self) -> NodeState {
        if self.succeeded() {
            NodeState::Succeeded
        } else {
            NodeState::Failed
        }
    }
}
