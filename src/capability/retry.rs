/// Retry/Backoff Policy for directory queries
use crate::{
    capability::{DirectoryClient, FailureKind, OrgId, QueryOutcome},
    config::CapabilityConfig,
    metrics,
};
use std::{fmt, time::Duration};
use tokio::time::sleep;
use tracing::warn;

/// Bounded exponential backoff around `DirectoryClient::query`
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of queries issued for one resolution
    pub max_attempts: u32,
    /// Initial delay between attempts
    pub initial_delay: Duration,
    /// Upper bound for any single wait
    pub max_delay: Duration,
    /// Exponential backoff multiplier
    pub multiplier: f64,
    /// Add up to 30% random jitter to each wait
    pub jitter: bool,
    /// How many timeout/network failures are retried before giving up
    pub max_transient_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            multiplier: 2.0,
            jitter: true,
            max_transient_retries: 2,
        }
    }
}

/// A resolution that produced no confirmed answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveFailure {
    /// Retry budget used up on rate limits or transient failures
    ExhaustedRetries { attempts: u32 },
    /// Non-retryable failure on the given attempt
    Failed(FailureKind),
}

impl fmt::Display for ResolveFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveFailure::ExhaustedRetries { attempts } => {
                write!(f, "exhausted retries after {} attempts", attempts)
            }
            ResolveFailure::Failed(kind) => write!(f, "{}", kind),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &CapabilityConfig) -> Self {
        Self {
            max_attempts: config.retry_max_attempts.max(1),
            initial_delay: Duration::from_millis(config.retry_initial_delay_ms),
            max_delay: Duration::from_millis(config.retry_max_delay_ms),
            max_transient_retries: config.retry_transient,
            ..Self::default()
        }
    }

    /// Query until a confirmed answer, a non-retryable failure, or the budget runs out
    pub async fn run(
        &self,
        client: &dyn DirectoryClient,
        org_id: &OrgId,
    ) -> Result<bool, ResolveFailure> {
        let mut attempt = 0;
        let mut transient_failures = 0;
        let mut delay = self.initial_delay;

        loop {
            attempt += 1;

            let outcome = client.query(org_id).await;
            let reason = outcome.label();
            let wait = match outcome {
                QueryOutcome::Positive => return Ok(true),
                QueryOutcome::Negative => return Ok(false),
                QueryOutcome::RateLimited { retry_after } => {
                    if attempt >= self.max_attempts {
                        return Err(ResolveFailure::ExhaustedRetries { attempts: attempt });
                    }
                    retry_after.map_or(delay, |hint| hint.max(delay))
                }
                QueryOutcome::Failed(kind) if kind.is_transient() => {
                    transient_failures += 1;
                    if transient_failures > self.max_transient_retries
                        || attempt >= self.max_attempts
                    {
                        return Err(ResolveFailure::ExhaustedRetries { attempts: attempt });
                    }
                    delay
                }
                QueryOutcome::Failed(kind) => return Err(ResolveFailure::Failed(kind)),
            };

            let wait = self.with_jitter(wait).min(self.max_delay);

            metrics::record_directory_retry(reason);
            warn!(
                org_id = %org_id,
                attempt,
                max_attempts = self.max_attempts,
                reason,
                wait_ms = wait.as_millis() as u64,
                "directory_retry_scheduled"
            );

            sleep(wait).await;

            // Calculate next delay with exponential backoff
            delay = Duration::from_millis((delay.as_millis() as f64 * self.multiplier) as u64)
                .min(self.max_delay);
        }
    }

    fn with_jitter(&self, delay: Duration) -> Duration {
        if !self.jitter {
            return delay;
        }
        let jitter = Duration::from_millis(
            (delay.as_millis() as f64 * rand::random::<f64>() * 0.3) as u64,
        );
        delay + jitter
    }
}
