use rand::Rng;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub type JitterFn = Arc<dyn Fn() -> f64 + Send + Sync>;

/// Retry budget and delay schedule for one model in the fallback chain.
///
/// The delay before retry `n` (0-based) is
/// `min(max_delay, base_delay * 2^n) * jitter()`, where the default jitter
/// draws uniformly from `0.5..1.5`.
#[derive(Clone)]
pub struct BackoffPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    jitter: JitterFn,
}

impl fmt::Debug for BackoffPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackoffPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish_non_exhaustive()
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1), Duration::from_secs(60))
    }
}

impl BackoffPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: max_delay.max(base_delay),
            jitter: Arc::new(random_jitter),
        }
    }

    /// Replace the jitter source, e.g. with a constant for deterministic tests.
    pub fn with_jitter<F>(mut self, jitter: F) -> Self
    where
        F: Fn() -> f64 + Send + Sync + 'static,
    {
        self.jitter = Arc::new(jitter);
        self
    }

    pub fn without_jitter(self) -> Self {
        self.with_jitter(|| 1.0)
    }

    /// Attempts allowed per model, including the first call.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Undithered delay before 0-based retry `retry`.
    pub fn capped_delay(&self, retry: u32) -> Duration {
        let factor = 2_u32.checked_pow(retry).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = (self.jitter)();
        if !factor.is_finite() || factor <= 0.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(self.capped_delay(retry).as_secs_f64() * factor)
            .unwrap_or(self.max_delay)
    }

    pub fn has_attempts_left(&self, attempts_made: u32) -> bool {
        attempts_made < self.max_attempts
    }
}

fn random_jitter() -> f64 {
    rand::rng().random_range(0.5..1.5)
}
