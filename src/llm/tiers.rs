//! Capability tiers and the provider tier tables they resolve through.

use crate::error::ConfigError;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub const NOVA_PREMIER: &str = "bedrock/amazon.nova-premier-v1:0";
pub const NOVA_PRO: &str = "bedrock/amazon.nova-pro-v1:0";
pub const NOVA_LITE: &str = "bedrock/amazon.nova-lite-v1:0";
pub const NOVA_MICRO: &str = "bedrock/amazon.nova-micro-v1:0";
pub const CLAUDE_SONNET_37: &str = "bedrock/anthropic.claude-3-7-sonnet-20250219-v1:0";
pub const CLAUDE_HAIKU_35: &str = "bedrock/anthropic.claude-3-5-haiku-20241022-v1:0";
pub const CLAUDE_HAIKU_3: &str = "bedrock/anthropic.claude-3-haiku-20240307-v1:0";

/// Capability level. `tier1` is the most capable; larger numbers are cheaper
/// and less capable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModelTier(u8);

impl ModelTier {
    pub const HIGHEST: Self = Self(1);

    pub fn new(level: u8) -> Result<Self, ConfigError> {
        if level == 0 {
            return Err(ConfigError::InvalidTier("tier levels start at 1".into()));
        }
        Ok(Self(level))
    }

    pub const fn level(self) -> u8 {
        self.0
    }
}

impl fmt::Display for ModelTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tier{}", self.0)
    }
}

impl FromStr for ModelTier {
    type Err = ConfigError;

    /// Accepts `tier2`, `Tier_2`, `TIER-2` and bare `2`.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let lower = raw.trim().to_ascii_lowercase();
        let digits = lower
            .strip_prefix("tier")
            .unwrap_or(&lower)
            .trim_start_matches(['_', '-', ' ']);
        let level = digits
            .parse::<u8>()
            .map_err(|_| ConfigError::InvalidTier(raw.to_string()))?;
        Self::new(level).map_err(|_| ConfigError::InvalidTier(raw.to_string()))
    }
}

impl Serialize for ModelTier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ModelTier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Level(u8),
            Name(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Level(level) => Self::new(level).map_err(de::Error::custom),
            Raw::Name(name) => name.parse().map_err(de::Error::custom),
        }
    }
}

/// A named assignment of concrete models to tiers.
///
/// The first model listed for a tier is its primary; the rest are fallbacks
/// in the order they should be tried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderConfig {
    pub name: String,
    pub tiers: BTreeMap<ModelTier, Vec<String>>,
}

impl ProviderConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tiers: BTreeMap::new(),
        }
    }

    pub fn with_tier<I, S>(mut self, tier: ModelTier, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tiers
            .insert(tier, models.into_iter().map(Into::into).collect());
        self
    }

    pub fn models(&self, tier: ModelTier) -> Option<&[String]> {
        self.tiers
            .get(&tier)
            .map(Vec::as_slice)
            .filter(|models| !models.is_empty())
    }

    pub fn amazon() -> Self {
        Self::new("amazon")
            .with_tier(ModelTier(1), [NOVA_PREMIER])
            .with_tier(ModelTier(2), [NOVA_PRO])
            .with_tier(ModelTier(3), [NOVA_LITE])
            .with_tier(ModelTier(4), [NOVA_MICRO])
    }

    pub fn anthropic() -> Self {
        Self::new("anthropic")
            .with_tier(ModelTier(1), [CLAUDE_SONNET_37])
            .with_tier(ModelTier(2), [CLAUDE_SONNET_37])
            .with_tier(ModelTier(3), [CLAUDE_HAIKU_35])
            .with_tier(ModelTier(4), [CLAUDE_HAIKU_3])
    }

    pub fn hybrid() -> Self {
        Self::new("hybrid")
            .with_tier(ModelTier(1), [CLAUDE_SONNET_37])
            .with_tier(ModelTier(2), [NOVA_PRO])
            .with_tier(ModelTier(3), [NOVA_LITE])
            .with_tier(ModelTier(4), [NOVA_MICRO])
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Validation("provider name cannot be empty".into()));
        }
        for (tier, models) in &self.tiers {
            if models.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "provider {} lists no models for {tier}",
                    self.name
                )));
            }
            if models.iter().any(|model| model.trim().is_empty()) {
                return Err(ConfigError::Validation(format!(
                    "provider {} has an empty model id in {tier}",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

/// Read-only lookup from `(tier, provider)` to an ordered model chain.
#[derive(Debug, Clone)]
pub struct TierRegistry {
    providers: BTreeMap<String, ProviderConfig>,
    cross_tier_depth: usize,
}

impl Default for TierRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TierRegistry {
    pub fn empty() -> Self {
        Self {
            providers: BTreeMap::new(),
            cross_tier_depth: 1,
        }
    }

    /// Registry preloaded with the `amazon`, `anthropic` and `hybrid` presets.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for preset in [
            ProviderConfig::amazon(),
            ProviderConfig::anthropic(),
            ProviderConfig::hybrid(),
        ] {
            registry.providers.insert(preset.name.clone(), preset);
        }
        registry
    }

    /// Register a provider, replacing any existing one with the same name.
    pub fn with_provider(mut self, provider: ProviderConfig) -> Result<Self, ConfigError> {
        provider.validate()?;
        self.providers
            .insert(provider.name.to_ascii_lowercase(), provider);
        Ok(self)
    }

    /// Number of lower tiers whose primary model is appended to a chain.
    pub fn with_cross_tier_depth(mut self, depth: usize) -> Self {
        self.cross_tier_depth = depth;
        self
    }

    pub fn cross_tier_depth(&self) -> usize {
        self.cross_tier_depth
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }

    pub fn provider(&self, name: &str) -> Result<&ProviderConfig, ConfigError> {
        self.providers
            .get(&name.trim().to_ascii_lowercase())
            .ok_or_else(|| ConfigError::UnknownProvider {
                name: name.to_string(),
                known: self.provider_names().join(", "),
            })
    }

    /// Ordered candidate models for `tier`: the tier's own models, then the
    /// primary of each of the next `cross_tier_depth` lower tiers. Duplicates
    /// keep their first position.
    pub fn resolve(
        &self,
        tier: ModelTier,
        provider: &ProviderConfig,
    ) -> Result<Vec<String>, ConfigError> {
        let own = provider
            .models(tier)
            .ok_or_else(|| ConfigError::TierNotResolvable {
                provider: provider.name.clone(),
                tier,
            })?;

        let lower_primaries = provider
            .tiers
            .range(tier..)
            .filter(|(candidate, _)| **candidate > tier)
            .filter_map(|(_, models)| models.first())
            .take(self.cross_tier_depth);

        let mut chain: Vec<String> =
            Vec::with_capacity(own.len() + self.cross_tier_depth.min(provider.tiers.len()));
        for model in own.iter().chain(lower_primaries) {
            if !chain.iter().any(|existing| existing == model) {
                chain.push(model.clone());
            }
        }
        Ok(chain)
    }

    /// Like [`Self::resolve`], with `pinned` moved to the front of the chain.
    /// A blank pin is ignored.
    pub fn resolve_pinned(
        &self,
        tier: ModelTier,
        pinned: Option<&str>,
        provider: &ProviderConfig,
    ) -> Result<Vec<String>, ConfigError> {
        let mut chain = self.resolve(tier, provider)?;
        if let Some(pinned) = pinned.map(str::trim).filter(|model| !model.is_empty()) {
            chain.retain(|model| model != pinned);
            chain.insert(0, pinned.to_string());
        }
        Ok(chain)
    }

    /// Fail fast when any tier in `tiers` has no mapping under `provider`.
    pub fn validate_tiers<I>(&self, provider: &ProviderConfig, tiers: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = ModelTier>,
    {
        for tier in tiers {
            self.resolve(tier, provider)?;
        }
        Ok(())
    }
}
