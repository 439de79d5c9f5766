//! Prompt templates for the crew's tasks.
//!
//! Hotel fields come from the prepared caller input. Dependency outputs are
//! reachable as `upstream.<node>` or, all at once, as `context`.

pub const MARKET_ANALYSIS: &str = r#"Analyze the market position of {{ hotel_name }}, a {{ hotel_rating }}-star hotel in {{ hotel_location }}, for the {{ analysis_period | lower }}.
Today is {{ current_date }}.

Hotel profile:
- Room types: {{ room_types }}
- Historical occupancy: {{ historical_occupancy }}
- Current ADR: {{ current_adr }}
- Current RevPAR: {{ current_revpar }}
- Current challenges: {{ current_challenges }}

Cover:
1. Market demand drivers and seasonality for {{ hotel_location }}
2. Events and conferences that will move demand during the period
3. Positioning against the competitive set
{%- set competitor = include_competitor_analysis | default(value="false") %}
{%- if competitor == "true" %}
4. A competitor pricing table: competitor name, estimated ADR by room type, and how {{ hotel_name }} compares
{%- endif %}

Finish with the three market factors that matter most for pricing."#;

pub const DEMAND_FORECAST: &str = r#"Forecast demand for {{ hotel_name }} in {{ hotel_location }} over the {{ forecast_period | lower }}, starting from {{ current_date }}.

Known figures:
- Historical occupancy: {{ historical_occupancy }}
- Current ADR: {{ current_adr }}
- Room types: {{ room_types }}
- Current challenges: {{ current_challenges }}

Provide:
1. Expected occupancy by month, split into weekdays and weekends
2. Demand by segment (leisure, business, group)
3. High and low demand dates and what drives them
4. Risks to the forecast"#;

pub const PRICING_STRATEGY: &str = r#"Design a pricing strategy for {{ hotel_name }} ({{ hotel_location }}) that moves RevPAR from {{ current_revpar }} toward {{ target_revpar }}.

Current ADR is {{ current_adr }} at {{ historical_occupancy }} occupancy. Room types: {{ room_types }}.

Market analysis:

{{ upstream.market_analysis }}

Demand forecast:

{{ upstream.demand_forecast }}

Recommend:
1. Base rates per room type for high, shoulder and low demand periods
2. Weekday and weekend differentials
3. Length-of-stay and advance purchase rules
4. Channel pricing and how to reduce OTA dependency
5. The expected ADR, occupancy and RevPAR if the strategy is followed"#;

pub const REVENUE_MANAGEMENT: &str = r#"Write the revenue optimization plan for {{ hotel_name }} in {{ hotel_location }}.

Current performance: occupancy {{ historical_occupancy }}, ADR {{ current_adr }}, RevPAR {{ current_revpar }}. Target RevPAR: {{ target_revpar }}.
Challenges: {{ current_challenges }}

The team's findings:

{{ context }}

Structure the plan as:
## Executive Summary
## Market Position
## Demand Outlook
## Pricing Recommendations
## Implementation Timeline
Start implementation on {{ implementation_start_date }} and lay out the first 90 days week by week.
## KPIs and Monitoring
## Risks and Mitigations"#;
