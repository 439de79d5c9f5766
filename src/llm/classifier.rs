use crate::error::ModelCallError;

/// What the invoker does after a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum FailureAction {
    /// Back off and call the same model again, budget permitting.
    RetrySameModel,
    /// Give up on this model and move down the fallback chain.
    NextModel,
}

/// Decides whether a failure is a throttling signal worth waiting out.
///
/// Throttling signals differ between providers, so the invoker takes this as
/// a collaborator instead of matching on error strings itself.
pub trait FailureClassifier: Send + Sync {
    fn classify(&self, error: &ModelCallError) -> FailureAction;
}

impl<F> FailureClassifier for F
where
    F: Fn(&ModelCallError) -> FailureAction + Send + Sync,
{
    fn classify(&self, error: &ModelCallError) -> FailureAction {
        self(error)
    }
}

/// Default classifier: rate-limit variants, known throttling codes and
/// throttling phrases retry the same model; everything else falls back.
#[derive(Debug, Clone)]
pub struct ThrottleClassifier {
    throttling_codes: Vec<String>,
    message_markers: Vec<String>,
    retry_transient: bool,
}

const DEFAULT_THROTTLING_CODES: &[&str] = &[
    "ThrottlingException",
    "TooManyRequestsException",
    "TooManyRequests",
    "429",
];

const DEFAULT_MESSAGE_MARKERS: &[&str] = &[
    "rate limit",
    "rate exceeded",
    "too many requests",
    "throttl",
];

impl Default for ThrottleClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_THROTTLING_CODES.iter().copied())
    }
}

impl ThrottleClassifier {
    pub fn new<I, S>(throttling_codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            throttling_codes: throttling_codes.into_iter().map(Into::into).collect(),
            message_markers: DEFAULT_MESSAGE_MARKERS
                .iter()
                .map(|marker| (*marker).to_string())
                .collect(),
            retry_transient: false,
        }
    }

    /// Also retry transient (5xx, timeout) failures on the same model.
    pub fn retry_transient(mut self, enabled: bool) -> Self {
        self.retry_transient = enabled;
        self
    }

    pub fn with_message_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.message_markers = markers
            .into_iter()
            .map(|marker| marker.into().to_ascii_lowercase())
            .collect();
        self
    }

    fn is_throttling_code(&self, code: &str) -> bool {
        self.throttling_codes
            .iter()
            .any(|known| known.eq_ignore_ascii_case(code))
    }

    fn mentions_throttling(&self, message: &str) -> bool {
        let lower = message.to_ascii_lowercase();
        self.message_markers
            .iter()
            .any(|marker| lower.contains(marker.as_str()))
    }
}

fn is_quota_exhausted(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("insufficient_quota")
        || lower.contains("exceeded your current quota")
        || lower.contains("billing")
}

impl FailureClassifier for ThrottleClassifier {
    fn classify(&self, error: &ModelCallError) -> FailureAction {
        // An exhausted quota will not recover by waiting.
        if is_quota_exhausted(error.message()) {
            return FailureAction::NextModel;
        }

        let throttled = matches!(error, ModelCallError::RateLimited { .. })
            || self.is_throttling_code(error.code())
            || self.mentions_throttling(error.message());
        if throttled {
            return FailureAction::RetrySameModel;
        }

        if self.retry_transient && matches!(error, ModelCallError::Transient { .. }) {
            return FailureAction::RetrySameModel;
        }

        FailureAction::NextModel
    }
}
