//! The four specialists that make up the revenue crew.

use crate::llm::tiers::ModelTier;

/// A crew member: who the model is asked to be, and at which tier it runs
/// unless overridden.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentProfile {
    /// Stable key used by config sections and `<AGENT>_LLM_TIER` overrides.
    pub key: &'static str,
    pub role: &'static str,
    pub goal: &'static str,
    pub backstory: &'static str,
    pub default_tier: u8,
}

impl AgentProfile {
    pub fn tier(&self) -> ModelTier {
        ModelTier::new(self.default_tier).unwrap_or(ModelTier::HIGHEST)
    }

    pub fn system_prompt(&self) -> String {
        format!(
            "You are the {role}.\n\nGoal: {goal}\n\n{backstory}\n\n\
             Answer in markdown. Be specific and quantitative, and state the assumptions behind every number.",
            role = self.role,
            goal = self.goal,
            backstory = self.backstory,
        )
    }
}

pub const MARKET_ANALYST: AgentProfile = AgentProfile {
    key: "market_analyst",
    role: "Hotel Market Intelligence Analyst",
    goal: "Analyze market conditions, competitor pricing and demand drivers for the hotel",
    backstory: "You have spent fifteen years benchmarking hotels against their competitive sets. \
                You read rate shops, event calendars and seasonality patterns and turn them into \
                clear statements about where the market is heading.",
    default_tier: 2,
};

pub const DEMAND_FORECASTER: AgentProfile = AgentProfile {
    key: "demand_forecaster",
    role: "Hotel Demand Forecasting Specialist",
    goal: "Forecast occupancy and demand by segment for the requested period",
    backstory: "You build occupancy forecasts from booking pace, historical occupancy and \
                local events. You are careful to separate weekday from weekend demand and \
                transient from group business.",
    default_tier: 2,
};

pub const PRICING_STRATEGIST: AgentProfile = AgentProfile {
    key: "pricing_strategist",
    role: "Hotel Pricing Strategy Expert",
    goal: "Design room rate recommendations that grow RevPAR without eroding occupancy",
    backstory: "You have priced rooms for independent and branded hotels. You combine market \
                intelligence with demand forecasts into rate ladders, length-of-stay rules and \
                channel-specific pricing.",
    default_tier: 1,
};

pub const REVENUE_MANAGER: AgentProfile = AgentProfile {
    key: "revenue_manager",
    role: "Hotel Revenue Management Director",
    goal: "Combine the team's findings into one actionable revenue optimization plan",
    backstory: "You run revenue strategy for a portfolio of hotels. You turn analysis into an \
                implementation plan with owners, timelines and the KPIs that show whether it works.",
    default_tier: 2,
};

/// Crew members in declaration order.
pub static CREW: [AgentProfile; 4] = [
    MARKET_ANALYST,
    DEMAND_FORECASTER,
    PRICING_STRATEGIST,
    REVENUE_MANAGER,
];

pub fn find(key: &str) -> Option<&'static AgentProfile> {
    CREW.iter()
        .find(|agent| agent.key.eq_ignore_ascii_case(key.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pricing_strategist_runs_on_top_tier() {
        assert_eq!(PRICING_STRATEGIST.tier(), ModelTier::HIGHEST);
        assert_eq!(MARKET_ANALYST.tier().to_string(), "tier2");
    }

    #[test]
    fn system_prompt_names_role_and_goal() {
        let prompt = REVENUE_MANAGER.system_prompt();
        assert!(prompt.starts_with("You are the Hotel Revenue Management Director."));
        assert!(prompt.contains("Goal: Combine the team's findings"));
    }

    #[test]
    fn find_is_case_insensitive() {
        assert_eq!(find("Demand_Forecaster"), Some(&DEMAND_FORECASTER));
        assert!(find("concierge").is_none());
    }

    #[test]
    fn agent_keys_are_unique() {
        let mut keys: Vec<_> = CREW.iter().map(|agent| agent.key).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), CREW.len());
    }
}
