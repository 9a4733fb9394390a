use async_trait::async_trait;
use harvest_core::{CoreError, ErrorClass, ErrorExt, RetryError, RetrySettings};
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Exponential backoff with proportional jitter.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    /// Base delay for transient failures and empty results
    pub base_delay: Duration,
    /// Base delay once the source reports throttling
    pub rate_limit_base_delay: Duration,
    /// Ceiling applied before jitter, regardless of class
    pub max_delay: Duration,
    /// Lower bound of the jitter fraction
    pub jitter_min: f64,
    /// Upper bound (exclusive) of the jitter fraction
    pub jitter_max: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            rate_limit_base_delay: Duration::from_secs(60),
            max_delay: Duration::from_secs(300),
            jitter_min: 0.1,
            jitter_max: 0.3,
        }
    }
}

impl From<&RetrySettings> for BackoffPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            base_delay: Duration::from_secs_f64(settings.base_delay_secs),
            rate_limit_base_delay: Duration::from_secs_f64(settings.rate_limit_base_delay_secs),
            max_delay: Duration::from_secs_f64(settings.max_delay_secs),
            jitter_min: settings.jitter_min,
            jitter_max: settings.jitter_max,
        }
    }
}

impl BackoffPolicy {
    /// `min(base * 2^attempt, max_delay)` for the class, before jitter.
    pub fn capped_delay(&self, attempt: u32, class: ErrorClass) -> Duration {
        let base = match class {
            ErrorClass::Transient => self.base_delay,
            ErrorClass::RateLimited => self.rate_limit_base_delay,
        };
        let multiplier = 2f64.powi(attempt.min(64) as i32);
        let delay_secs = (base.as_secs_f64() * multiplier).min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(delay_secs)
    }

    /// Delay for the given attempt using `unit` in `[0, 1)` as the jitter draw.
    pub fn delay_with_unit(&self, attempt: u32, class: ErrorClass, unit: f64) -> Duration {
        let capped = self.capped_delay(attempt, class);
        let unit = unit.clamp(0.0, 1.0 - f64::EPSILON);
        let fraction = self.jitter_min + (self.jitter_max - self.jitter_min) * unit;
        let delay = capped + capped.mul_f64(fraction);

        // mul_f64 rounds to whole nanoseconds; keep the upper bound exclusive
        let upper = capped.mul_f64(1.0 + self.jitter_max);
        if !capped.is_zero() && delay >= upper {
            upper.saturating_sub(Duration::from_nanos(1))
        } else {
            delay
        }
    }

    /// Calculate delay with exponential backoff and jitter
    pub fn delay(&self, attempt: u32, class: ErrorClass) -> Duration {
        self.delay_with_unit(attempt, class, fastrand::f64())
    }
}

/// Every wait in a run goes through this seam.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Records requested waits and returns immediately.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    slept: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recorded(&self) -> Vec<Duration> {
        self.slept
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn count(&self) -> usize {
        self.slept
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.slept
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(duration);
    }
}

/// A call result that may carry no data without being an error.
pub trait Payload {
    type Data;

    fn into_data(self) -> Option<Self::Data>;
}

impl<T> Payload for Vec<T> {
    type Data = Vec<T>;

    fn into_data(self) -> Option<Vec<T>> {
        if self.is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

impl<T> Payload for Option<T> {
    type Data = T;

    fn into_data(self) -> Option<T> {
        self
    }
}

/// Per-call progress, discarded when the call settles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryState {
    pub attempt: u32,
    pub last_class: Option<ErrorClass>,
}

/// Retry executor that wraps operations with retry logic
pub struct RetryExecutor {
    policy: BackoffPolicy,
    max_attempts: u32,
    sleeper: Arc<dyn Sleeper>,
}

impl std::fmt::Debug for RetryExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryExecutor")
            .field("policy", &self.policy)
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

impl RetryExecutor {
    pub fn new(policy: BackoffPolicy, max_attempts: u32, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            policy,
            max_attempts: max_attempts.max(1),
            sleeper,
        }
    }

    pub fn from_settings(settings: &RetrySettings, sleeper: Arc<dyn Sleeper>) -> Self {
        Self::new(BackoffPolicy::from(settings), settings.max_attempts, sleeper)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Execute an operation until it yields data or attempts run out.
    ///
    /// Empty results and ordinary errors back off from the transient base;
    /// errors mentioning a rate limit back off from the rate-limit base.
    pub async fn execute<F, Fut, P>(
        &self,
        operation_name: &str,
        mut operation: F,
    ) -> Result<P::Data, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<P, CoreError>>,
        P: Payload,
    {
        let mut state = RetryState::default();

        while state.attempt < self.max_attempts {
            let attempt = state.attempt;
            let has_more = attempt + 1 < self.max_attempts;

            match operation().await {
                Ok(payload) => match payload.into_data() {
                    Some(data) => {
                        if attempt > 0 {
                            info!(
                                "Operation {} succeeded after {} retries",
                                operation_name, attempt
                            );
                        }
                        return Ok(data);
                    }
                    None => {
                        state.last_class = Some(ErrorClass::Transient);
                        if has_more {
                            let delay = self.policy.delay(attempt, ErrorClass::Transient);
                            warn!(
                                "No data returned for {}, retrying in {:.1}s... (attempt {}/{})",
                                operation_name,
                                delay.as_secs_f64(),
                                attempt + 1,
                                self.max_attempts
                            );
                            self.sleeper.sleep(delay).await;
                        }
                    }
                },
                Err(error) => {
                    let class = error.error_class();
                    state.last_class = Some(class);
                    debug!(
                        "Attempt {} failed for {} ({:?}): {}",
                        attempt + 1,
                        operation_name,
                        class,
                        error
                    );

                    match (class, has_more) {
                        (ErrorClass::RateLimited, true) => {
                            let delay = self.policy.delay(attempt, class);
                            warn!(
                                "Rate limit hit for {}, waiting {:.1}s... (attempt {}/{})",
                                operation_name,
                                delay.as_secs_f64(),
                                attempt + 1,
                                self.max_attempts
                            );
                            self.sleeper.sleep(delay).await;
                        }
                        (ErrorClass::RateLimited, false) => {
                            error!(
                                "Max retries reached for rate limit on {}: {}",
                                operation_name, error
                            );
                            return Err(RetryError::RateLimitExhausted {
                                attempts: attempt + 1,
                                message: error.to_string(),
                            });
                        }
                        (ErrorClass::Transient, true) => {
                            let delay = self.policy.delay(attempt, class);
                            warn!(
                                "Error occurred for {}: {}. Retrying in {:.1}s... (attempt {}/{})",
                                operation_name,
                                error,
                                delay.as_secs_f64(),
                                attempt + 1,
                                self.max_attempts
                            );
                            self.sleeper.sleep(delay).await;
                        }
                        (ErrorClass::Transient, false) => {
                            error!(
                                "Operation {} failed after {} attempts: {}",
                                operation_name,
                                attempt + 1,
                                error
                            );
                            return Err(RetryError::Failed {
                                attempts: attempt + 1,
                                source: Box::new(error),
                            });
                        }
                    }
                }
            }

            state.attempt += 1;
        }

        error!(
            "Operation {} returned no data after {} attempts (last outcome: {:?})",
            operation_name, self.max_attempts, state.last_class
        );
        Err(RetryError::NoData {
            attempts: self.max_attempts,
        })
    }
}
