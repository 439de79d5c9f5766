use super::llm::{
    AgentConfig, CustomProviderConfig, GenerationConfig, ReliabilityConfig, RemoteConfig,
};
use super::observability::ObservabilityConfig;
use crate::crew::agents;
use crate::error::ConfigError;
use crate::llm::tiers::{ModelTier, ProviderConfig, TierRegistry};
use crate::llm::{BackoffPolicy, GenerationParams, ThrottleClassifier};
use anyhow::{Context, Result};
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_DIR: &str = ".hotel-revenue-crew";

// ── Top-level config ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to config.toml - computed, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Active provider: a builtin preset (`amazon`, `anthropic`, `hybrid`) or
    /// a name under `[providers]`.
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default)]
    pub remote: RemoteConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub reliability: ReliabilityConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub agents: BTreeMap<String, AgentConfig>,

    #[serde(default)]
    pub providers: BTreeMap<String, CustomProviderConfig>,
}

fn default_provider() -> String {
    "amazon".into()
}

impl Default for Config {
    fn default() -> Self {
        let home =
            UserDirs::new().map_or_else(|| PathBuf::from("."), |u| u.home_dir().to_path_buf());

        Self {
            config_path: home.join(CONFIG_DIR).join("config.toml"),
            provider: default_provider(),
            remote: RemoteConfig::default(),
            generation: GenerationConfig::default(),
            reliability: ReliabilityConfig::default(),
            observability: ObservabilityConfig::default(),
            agents: BTreeMap::new(),
            providers: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Load `~/.hotel-revenue-crew/config.toml`, writing the defaults there
    /// on first use.
    pub fn load_or_init() -> Result<Self> {
        let home = UserDirs::new()
            .map(|u| u.home_dir().to_path_buf())
            .context("Could not find home directory")?;
        let config_dir = home.join(CONFIG_DIR);
        let config_path = config_dir.join("config.toml");

        if config_path.exists() {
            return Self::load_from(&config_path);
        }

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create {}", config_dir.display()))?;
        }
        let config = Self {
            config_path,
            ..Self::default()
        };
        config.save()?;
        Ok(config)
    }

    /// Load an explicit config file. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        let path = PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned());
        if !path.exists() {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self {
                config_path: path,
                ..Self::default()
            });
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::Load(e.to_string()))
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.config_path = path;
        config.normalize_agent_keys();
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&self.config_path, toml_str).context("Failed to write config file")?;
        Ok(())
    }

    /// Apply environment variable overrides to config
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides read through `lookup`. Empty values are ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        // Provider: REVCREW_PROVIDER or MODEL_PROVIDER
        if let Some(provider) = get("REVCREW_PROVIDER").or_else(|| get("MODEL_PROVIDER")) {
            self.provider = provider.trim().to_ascii_lowercase();
        }

        if let Some(key) = get("REVCREW_API_KEY") {
            self.remote.api_key = Some(key);
        }

        if let Some(url) = get("REVCREW_BASE_URL") {
            self.remote.base_url = url;
        }

        if let Some(temp_str) = get("REVCREW_TEMPERATURE")
            && let Ok(temp) = temp_str.trim().parse::<f64>()
            && (0.0..=2.0).contains(&temp)
        {
            self.generation.temperature = temp;
        }

        // Per agent: <AGENT>_LLM_TIER and MODEL_<AGENT>
        for agent in &agents::CREW {
            let upper = agent.key.to_ascii_uppercase();

            if let Some(raw) = get(&format!("{upper}_LLM_TIER")) {
                match raw.parse::<ModelTier>() {
                    Ok(tier) => self.agents.entry(agent.key.to_string()).or_default().tier = Some(tier),
                    Err(e) => tracing::warn!(agent = agent.key, "Ignoring {upper}_LLM_TIER: {e}"),
                }
            }

            if let Some(model) = get(&format!("MODEL_{upper}")) {
                self.agents.entry(agent.key.to_string()).or_default().model =
                    Some(model.trim().to_string());
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reliability.max_attempts == 0 {
            return Err(ConfigError::Validation(
                "reliability.max_attempts must be at least 1".into(),
            ));
        }
        if self.reliability.base_backoff_ms > self.reliability.max_backoff_ms {
            return Err(ConfigError::Validation(format!(
                "reliability.base_backoff_ms ({}) exceeds max_backoff_ms ({})",
                self.reliability.base_backoff_ms, self.reliability.max_backoff_ms
            )));
        }
        if !(0.0..=2.0).contains(&self.generation.temperature) {
            return Err(ConfigError::Validation(format!(
                "generation.temperature must be within 0.0..=2.0, got {}",
                self.generation.temperature
            )));
        }
        if self.generation.max_tokens == 0 {
            return Err(ConfigError::Validation(
                "generation.max_tokens must be at least 1".into(),
            ));
        }
        if let Some(unknown) = self.agents.keys().find(|key| agents::find(key).is_none()) {
            let known: Vec<_> = agents::CREW.iter().map(|agent| agent.key).collect();
            return Err(ConfigError::Validation(format!(
                "unknown agent {unknown} (known agents: [{}])",
                known.join(", ")
            )));
        }
        Ok(())
    }

    /// Builtin presets plus `[providers]` tables, with the configured
    /// cross-tier depth.
    pub fn tier_registry(&self) -> Result<TierRegistry, ConfigError> {
        let mut registry =
            TierRegistry::builtin().with_cross_tier_depth(self.reliability.cross_tier_depth);
        for (name, custom) in &self.providers {
            let mut provider = ProviderConfig::new(name.to_ascii_lowercase());
            for (tier, models) in &custom.tiers {
                provider = provider.with_tier(*tier, models.iter().cloned());
            }
            registry = registry.with_provider(provider)?;
        }
        Ok(registry)
    }

    /// The provider selected by `provider`, looked up in `registry`.
    pub fn active_provider(&self, registry: &TierRegistry) -> Result<ProviderConfig, ConfigError> {
        registry.provider(&self.provider).cloned()
    }

    pub fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy::new(
            self.reliability.max_attempts,
            Duration::from_millis(self.reliability.base_backoff_ms),
            Duration::from_millis(self.reliability.max_backoff_ms),
        )
    }

    pub fn classifier(&self) -> ThrottleClassifier {
        ThrottleClassifier::new(self.reliability.throttling_codes.iter().cloned())
            .retry_transient(self.reliability.retry_transient)
    }

    pub fn generation_params(&self) -> GenerationParams {
        GenerationParams {
            temperature: self.generation.temperature,
            max_tokens: self.generation.max_tokens,
        }
    }

    fn normalize_agent_keys(&mut self) {
        let agents = std::mem::take(&mut self.agents);
        self.agents = agents
            .into_iter()
            .map(|(key, value)| (key.trim().to_ascii_lowercase(), value))
            .collect();
    }
}
