//! Turning a caller payload into the field map the crew prompts expect.
//!
//! Payloads are either structured (a JSON object of fields) or natural
//! language (a string, or `{"prompt": ...}` / `{"message": ...}`). Natural
//! language is mined with regular expressions; anything not found falls back
//! to a default, and requests that are off-topic or too vague are rejected.

use crate::error::{CrewError, InputRejection};
use crate::prompt::CallerInput;
use anyhow::Context as _;
use chrono::{Datelike, Duration, NaiveDate};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

/// Field defaults, in the order fields are reported.
pub const DEFAULTS: [(&str, &str); 11] = [
    ("hotel_name", "Grand Pacific Resort"),
    ("hotel_location", "Miami, FL"),
    ("hotel_rating", "4.5"),
    ("room_types", "Standard, Deluxe, Suite"),
    ("analysis_period", "Next 90 days"),
    ("forecast_period", "Next 90 days"),
    ("historical_occupancy", "72%"),
    ("current_adr", "$245"),
    ("current_revpar", "$176"),
    ("target_revpar", "$195"),
    ("current_challenges", "Weekday occupancy below target, OTA dependency"),
];

/// Natural-language requests with more defaulted fields than this are
/// rejected as too vague.
pub const MAX_DEFAULTED_FIELDS: usize = 8;

const HOTEL_KEYWORDS: &[&str] = &[
    "hotel", "resort", "inn", "lodge", "motel", "property", "accommodation", "revenue", "pricing",
    "occupancy", "adr", "revpar", "room", "guest", "mountain", "ski", "chalet", "suite", "deluxe",
    "luxury", "standard", "festival", "event", "conference", "convention", "season", "hiking",
];

const OFF_TOPIC_KEYWORDS: &[&str] = &[
    "politics", "political", "election", "president", "government", "news", "weather",
    "celebrity", "movie", "food", "recipe", "health", "medical", "stock", "investment",
];

const BOOKING_KEYWORDS: &[&str] = &["book", "booking", "reserve", "reservation"];

const CITY_STATES: &[(&str, &str)] = &[
    ("new york", "New York, NY"),
    ("los angeles", "Los Angeles, CA"),
    ("chicago", "Chicago, IL"),
    ("houston", "Houston, TX"),
    ("phoenix", "Phoenix, AZ"),
    ("philadelphia", "Philadelphia, PA"),
    ("san antonio", "San Antonio, TX"),
    ("san diego", "San Diego, CA"),
    ("dallas", "Dallas, TX"),
    ("san jose", "San Jose, CA"),
    ("austin", "Austin, TX"),
    ("jacksonville", "Jacksonville, FL"),
    ("fort worth", "Fort Worth, TX"),
    ("columbus", "Columbus, OH"),
    ("san francisco", "San Francisco, CA"),
    ("charlotte", "Charlotte, NC"),
    ("indianapolis", "Indianapolis, IN"),
    ("seattle", "Seattle, WA"),
    ("denver", "Denver, CO"),
    ("washington", "Washington, DC"),
    ("boston", "Boston, MA"),
    ("el paso", "El Paso, TX"),
    ("nashville", "Nashville, TN"),
    ("detroit", "Detroit, MI"),
    ("portland", "Portland, OR"),
    ("las vegas", "Las Vegas, NV"),
    ("memphis", "Memphis, TN"),
    ("louisville", "Louisville, KY"),
    ("baltimore", "Baltimore, MD"),
    ("milwaukee", "Milwaukee, WI"),
    ("albuquerque", "Albuquerque, NM"),
    ("tucson", "Tucson, AZ"),
    ("fresno", "Fresno, CA"),
    ("sacramento", "Sacramento, CA"),
    ("kansas city", "Kansas City, MO"),
    ("miami", "Miami, FL"),
    ("orlando", "Orlando, FL"),
    ("atlanta", "Atlanta, GA"),
];

const FIELD_PATTERNS: &[(&str, &[&str])] = &[
    (
        "hotel_name",
        &[
            r"(?:for|optimize|analyze)\s+(?:revenue\s+for\s+)?(?:the\s+)?([A-Za-z\s]+?)(?:\s+in\s+[A-Za-z\s,]+)",
            r#"(?:hotel|property|resort|inn)(?:\s+named|\s+called)?\s+["']?([^"'.,;]+)["']?"#,
            r"for\s+(?:the\s+)?([^,.]+?)(?:\s+hotel|\s+resort|\s+inn)",
            r"(?:analyze|forecast|optimize)\s+(?:for\s+)?(?:the\s+)?([^,.]+?)(?:\s+in\s+|$|\s+hotel|\s+resort)",
        ],
    ),
    (
        "hotel_location",
        &[
            r"(?:in|at|located\s+in)\s+([A-Za-z\s]+,\s*[A-Z]{2})",
            r"(?:in|at|located\s+in)\s+([A-Za-z\s]+)",
        ],
    ),
    (
        "hotel_rating",
        &[
            r"(\d+(?:\.\d+)?)\s*(?:star|stars|-star|-stars)",
            r"rating(?:\s+of)?\s+(\d+(?:\.\d+)?)",
        ],
    ),
    (
        "room_types",
        &[
            r"room\s+types?(?:\s+include|\s+are|\s*:)?\s+([^.]+)",
            r"(?:with|having|offering)\s+([^,.]+?)\s+rooms?",
        ],
    ),
    (
        "analysis_period",
        &[
            r"(?:analysis|analyze)(?:\s+for|\s+over|\s+period)?\s+(?:the\s+)?(?:next|coming)\s+(\d+\s+(?:days|weeks|months|quarters|years))",
            r"(?:for|over|during)(?:\s+the)?\s+(?:next|coming)\s+(\d+\s+(?:days|weeks|months|quarters|years))",
        ],
    ),
    (
        "forecast_period",
        &[
            r"(?:forecast|prediction|projections?)(?:\s+for|\s+over|\s+period)?\s+(?:the\s+)?(?:next|coming)\s+(\d+\s+(?:days|weeks|months|quarters|years))",
            r"(?:next|coming)\s+(\d+\s+(?:days|weeks|months|quarters|years))",
        ],
    ),
    (
        "historical_occupancy",
        &[
            r"(?:historical\s+)?occupancy(?:\s+(?:is|of|at))?\s+(\d+(?:\.\d+)?%)",
            r"(\d+(?:\.\d+)?%)\s+occupancy",
            r"with\s+(\d+(?:\.\d+)?%)\s+occupancy",
        ],
    ),
    (
        "current_adr",
        &[
            r"(?:current\s+)?adr(?:\s+(?:of|at|is))?\s+(\$\d+(?:\.\d+)?)",
            r"average\s+daily\s+rate(?:\s+(?:of|at|is))?\s+(\$\d+(?:\.\d+)?)",
            r"adr\s+(\$\d+(?:\.\d+)?)",
            r"and\s+(\$\d+(?:\.\d+)?)\s+adr",
            r"with.*?(\$\d+(?:\.\d+)?)\s+adr",
        ],
    ),
    (
        "current_revpar",
        &[
            r"(?:current\s+)?revpar(?:\s+of|\s+at|\s+is|\s*:)?\s+(\$\d+(?:\.\d+)?)",
            r"revenue\s+per\s+available\s+room(?:\s+of|\s+at|\s+is|\s*:)?\s+(\$\d+(?:\.\d+)?)",
        ],
    ),
    (
        "target_revpar",
        &[
            r"target\s+revpar(?:\s+of|\s+at|\s+is|\s*:)?\s+(\$\d+(?:\.\d+)?)",
            r"goal\s+revpar(?:\s+of|\s+at|\s+is|\s*:)?\s+(\$\d+(?:\.\d+)?)",
        ],
    ),
    (
        "current_challenges",
        &[
            r"challenges?(?:\s+include|\s+are|\s*:)?\s+([^.]+)",
            r"issues?(?:\s+include|\s+are|\s*:)?\s+([^.]+)",
            r"problems?(?:\s+include|\s+are|\s*:)?\s+([^.]+)",
        ],
    ),
];

/// Request shapes recognised ahead of field extraction, with the challenge
/// text each one implies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestKind {
    CompetitorPricing,
    DemandForecast,
    RevenueOptimization,
    PricingStrategy,
    OccupancyForecast,
}

impl RequestKind {
    const PATTERNS: [(Self, &'static str); 5] = [
        (Self::CompetitorPricing, r"(?:analyze|study)\s+competitor\s+pricing"),
        (Self::DemandForecast, r"forecast\s+demand"),
        (Self::RevenueOptimization, r"optimize\s+revenue"),
        (Self::PricingStrategy, r"pricing\s+strategy"),
        (Self::OccupancyForecast, r"occupancy\s+(?:forecast|prediction)"),
    ];

    fn challenge(self) -> &'static str {
        match self {
            Self::CompetitorPricing => {
                "Competitive pricing environment, need competitor pricing analysis"
            }
            Self::DemandForecast => "Need accurate demand forecasting for effective planning",
            Self::RevenueOptimization => "Revenue optimization needed, balancing occupancy and ADR",
            Self::PricingStrategy => "Need effective pricing strategy to maximize revenue",
            Self::OccupancyForecast => {
                "Need accurate occupancy forecasting for effective planning"
            }
        }
    }

    fn reads_period(self) -> bool {
        matches!(self, Self::DemandForecast | Self::OccupancyForecast)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum InputFormat {
    Defaults,
    Structured,
    NaturalLanguage,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreparedInput {
    pub input: CallerInput,
    pub format: InputFormat,
    /// Known fields that fell back to their default.
    pub defaulted: Vec<String>,
}

/// Example requests shown to a caller whose input was rejected.
pub fn guidance(rejection: &InputRejection) -> &'static [&'static str] {
    match rejection {
        InputRejection::IrrelevantQuery => &[
            "Optimize revenue for [Hotel Name] in [City] with [occupancy]% occupancy and $[amount] ADR",
        ],
        InputRejection::InsufficientInformation { .. } => &[
            "Optimize revenue for Seaside Resort in Miami, FL with 75% occupancy and $250 ADR",
            "Improve RevPAR for Downtown Business Hotel in Chicago with current RevPAR $180, targeting $200",
            "Analyze pricing strategy for 4-star boutique hotel in San Francisco with luxury suites and standard rooms",
        ],
    }
}

/// Normalise `payload` into crew input and add the run dates derived from
/// `today`.
pub fn prepare_input(payload: &Value, today: NaiveDate) -> Result<PreparedInput, CrewError> {
    let mut prepared = match payload {
        Value::Null => PreparedInput {
            input: defaults(),
            format: InputFormat::Defaults,
            defaulted: DEFAULTS.iter().map(|(key, _)| (*key).to_string()).collect(),
        },
        Value::String(text) if text.trim().is_empty() => {
            return prepare_input(&Value::Null, today);
        }
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => structured(&map),
            _ => natural_language(text)?,
        },
        Value::Object(map) if map.is_empty() => return prepare_input(&Value::Null, today),
        Value::Object(map) => match message_text(map) {
            Some(text) => natural_language(text)?,
            None => structured(map),
        },
        other => {
            tracing::warn!(payload = %other, "Unsupported payload shape, using defaults");
            return prepare_input(&Value::Null, today);
        }
    };

    prepared
        .input
        .insert("current_date", today.format("%B %d, %Y").to_string());
    prepared.input.insert(
        "implementation_start_date",
        next_monday(today).format("%B %d, %Y").to_string(),
    );

    tracing::info!(
        format = %prepared.format,
        defaulted = prepared.defaulted.len(),
        "Caller input prepared"
    );
    Ok(prepared)
}

/// The first Monday strictly after `date`.
pub fn next_monday(date: NaiveDate) -> NaiveDate {
    let from_monday = i64::from(date.weekday().num_days_from_monday());
    date + Duration::days(7 - from_monday)
}

fn defaults() -> CallerInput {
    DEFAULTS.iter().map(|(key, value)| (*key, *value)).collect()
}

fn message_text(map: &serde_json::Map<String, Value>) -> Option<&str> {
    if map.len() != 1 {
        return None;
    }
    ["prompt", "message"]
        .iter()
        .find_map(|key| map.get(*key))
        .and_then(Value::as_str)
        .filter(|text| !text.trim().is_empty())
}

fn structured(map: &serde_json::Map<String, Value>) -> PreparedInput {
    let mut input = defaults();
    let mut defaulted = Vec::new();
    for (key, _) in DEFAULTS {
        if !map.contains_key(key) {
            defaulted.push(key.to_string());
        }
    }
    for (key, value) in map {
        input.insert(key.clone(), value.clone());
    }
    PreparedInput {
        input,
        format: InputFormat::Structured,
        defaulted,
    }
}

fn natural_language(text: &str) -> Result<PreparedInput, CrewError> {
    let extractor = Extractor::new().context("Failed to compile input patterns")?;
    let fields = extractor.extract(text);

    let lower = text.to_lowercase();
    let on_topic = HOTEL_KEYWORDS.iter().any(|keyword| lower.contains(keyword));
    let off_topic = OFF_TOPIC_KEYWORDS.iter().any(|keyword| lower.contains(keyword));
    let booking_only = !on_topic && BOOKING_KEYWORDS.iter().any(|keyword| lower.contains(keyword));
    if off_topic || booking_only {
        tracing::info!("Rejected off-topic request");
        return Err(InputRejection::IrrelevantQuery.into());
    }

    let is_default = |key: &str| {
        let default = DEFAULTS.iter().find(|(name, _)| *name == key).map(|(_, value)| *value);
        fields.iter().find(|(name, _)| *name == key).map(|(_, value)| value.as_str()) == default
    };
    let defaulted = DEFAULTS
        .iter()
        .filter(|(key, _)| is_default(*key))
        .map(|(key, _)| (*key).to_string())
        .collect::<Vec<_>>();

    if defaulted.len() > MAX_DEFAULTED_FIELDS {
        let mut missing = Vec::new();
        if is_default("hotel_name") {
            missing.push("hotel name".to_string());
        }
        if is_default("hotel_location") {
            missing.push("location".to_string());
        }
        if is_default("current_adr") && is_default("current_revpar") {
            missing.push("current financial metrics (ADR or RevPAR)".to_string());
        }
        tracing::info!(defaulted = defaulted.len(), "Rejected underspecified request");
        return Err(InputRejection::InsufficientInformation {
            missing_critical_info: missing,
        }
        .into());
    }

    let mut input: CallerInput = fields.into_iter().collect();
    if extractor.competitor_analysis.is_match(text) {
        input.insert("include_competitor_analysis", "true");
    }

    Ok(PreparedInput {
        input,
        format: InputFormat::NaturalLanguage,
        defaulted,
    })
}

struct Extractor {
    fields: Vec<(&'static str, Vec<Regex>)>,
    kinds: Vec<(RequestKind, Regex)>,
    segment: Regex,
    location_in: Regex,
    location_in_or_for: Regex,
    request_period: Regex,
    competitor_analysis: Regex,
    state_suffix: Regex,
    number: Regex,
}

impl Extractor {
    fn new() -> Result<Self, regex::Error> {
        let fields = FIELD_PATTERNS
            .iter()
            .map(|(field, patterns)| -> Result<_, regex::Error> {
                let compiled = patterns
                    .iter()
                    .map(|pattern| Regex::new(&format!("(?i){pattern}")))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((*field, compiled))
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;
        let kinds = RequestKind::PATTERNS
            .iter()
            .map(|(kind, pattern)| -> Result<_, regex::Error> {
                Ok((*kind, Regex::new(&format!("(?i){pattern}"))?))
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;

        Ok(Self {
            fields,
            kinds,
            segment: Regex::new(r"(?i)(luxury|budget|business|boutique|resort)\s+hotels?")?,
            location_in: Regex::new(r"(?i)in\s+([A-Za-z\s,]+)")?,
            location_in_or_for: Regex::new(r"(?i)(?:in|for)\s+([A-Za-z\s,]+)")?,
            request_period: Regex::new(
                r"(?i)(?:for|next|coming)\s+(\d+\s+(?:days|weeks|months|quarters?|years?))",
            )?,
            competitor_analysis: Regex::new(
                r"(?i)(?:include|with|add)\s+competitor\s+analysis|competitor\s+analysis\s+included",
            )?,
            state_suffix: Regex::new(r"[A-Za-z\s]+,\s*[A-Z]{2}")?,
            number: Regex::new(r"\d+")?,
        })
    }

    /// Every known field, extracted or defaulted, after normalisation.
    fn extract(&self, text: &str) -> Vec<(&'static str, String)> {
        let mut fields = DEFAULTS
            .iter()
            .map(|(key, value)| (*key, (*value).to_string()))
            .collect::<Vec<_>>();
        let set = |fields: &mut Vec<(&'static str, String)>, key: &str, value: String| {
            if let Some(slot) = fields.iter_mut().find(|(name, _)| *name == key) {
                slot.1 = value;
            }
        };

        if let Some(kind) = self
            .kinds
            .iter()
            .find(|(_, pattern)| pattern.is_match(text))
            .map(|(kind, _)| *kind)
        {
            for (key, value) in self.request_defaults(kind, text) {
                set(&mut fields, key, value);
            }
        }

        for (field, patterns) in &self.fields {
            if let Some(value) = patterns.iter().find_map(|pattern| capture(pattern, text)) {
                set(&mut fields, field, value);
            }
        }

        for (key, value) in &mut fields {
            *value = match *key {
                "hotel_location" => self.city_state(value),
                "hotel_name" => hotel_name(value),
                "analysis_period" | "forecast_period" => self.period(value),
                "historical_occupancy" if !value.contains('%') => format!("{value}%"),
                "current_adr" | "current_revpar" | "target_revpar" if !value.contains('$') => {
                    format!("${value}")
                }
                _ => continue,
            };
        }
        fields
    }

    fn request_defaults(&self, kind: RequestKind, text: &str) -> Vec<(&'static str, String)> {
        let mut values = Vec::new();

        let location = if kind == RequestKind::CompetitorPricing {
            &self.location_in
        } else {
            &self.location_in_or_for
        };
        if let Some(found) = capture(location, text) {
            values.push(("hotel_location", found));
        }

        if let Some(segment) = capture(&self.segment, text) {
            let segment = segment.to_lowercase();
            let rating = match segment.as_str() {
                "luxury" => Some("5.0"),
                "business" => Some("4.0"),
                "boutique" => Some("4.5"),
                "budget" => Some("3.0"),
                _ => None,
            };
            if kind == RequestKind::CompetitorPricing
                && let Some(rating) = rating
            {
                values.push(("hotel_rating", rating.to_string()));
            }
            values.push(("hotel_name", format!("{} Hotel", capitalize(&segment))));
        }

        if kind.reads_period() {
            let period = capture(&self.request_period, text)
                .map(|period| format!("Next {period}"))
                .or_else(|| {
                    text.to_lowercase()
                        .contains("quarter")
                        .then(|| "Next 90 days".to_string())
                });
            if let Some(period) = period {
                values.push(("analysis_period", period.clone()));
                values.push(("forecast_period", period));
            }
        }

        values.push(("current_challenges", kind.challenge().to_string()));
        values
    }

    fn city_state(&self, location: &str) -> String {
        if self.state_suffix.is_match(location) {
            return location.to_string();
        }
        let lower = location.to_lowercase();
        CITY_STATES
            .iter()
            .find(|(city, _)| lower.contains(city))
            .map_or_else(|| location.to_string(), |(_, city_state)| (*city_state).to_string())
    }

    fn period(&self, period: &str) -> String {
        let lower = period.to_lowercase();
        let count = self
            .number
            .find(&lower)
            .and_then(|found| found.as_str().parse::<u32>().ok());
        if lower.contains("quarter") {
            "Next 90 days".to_string()
        } else if lower.contains("month") {
            format!("Next {} days", count.map_or(30, |n| n.saturating_mul(30)))
        } else if lower.contains("week") {
            format!("Next {} days", count.map_or(7, |n| n.saturating_mul(7)))
        } else if lower.contains("year") {
            "Next 365 days".to_string()
        } else if period.is_empty() {
            "Next 90 days".to_string()
        } else {
            period.to_string()
        }
    }
}

fn capture(pattern: &Regex, text: &str) -> Option<String> {
    pattern
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map(|found| found.as_str().trim().to_string())
        .filter(|found| !found.is_empty())
}

fn hotel_name(name: &str) -> String {
    const MARKERS: [&str; 5] = ["hotel", "resort", "inn", "suites", "plaza"];
    let lower = name.to_lowercase();
    if MARKERS.iter().any(|marker| lower.contains(marker)) {
        name.to_string()
    } else {
        format!("{name} Hotel")
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}
