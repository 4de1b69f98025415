//! Run-level configuration shared across a generation run.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

use crate::llm::LlmError;

fn default_max_retries() -> u32 {
    15
}

fn default_max_wait_secs() -> u64 {
    600
}

fn default_unit_size() -> usize {
    10
}

fn default_true() -> bool {
    true
}

/// Options governing one generation run.
///
/// The retry budget applies inside each strategy invocation (around
/// model calls); the execution units themselves never retry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Maximum retry attempts per model call.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Upper bound on a single backoff wait, in seconds.
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,
    /// Run each execution unit's tasks cooperatively (`true`) or
    /// strictly one after another (`false`).
    #[serde(default = "default_true")]
    pub is_async: bool,
    /// Fail-fast (`true`) aborts the run on the first task failure;
    /// tolerant mode (`false`) drops failed rows silently.
    #[serde(default = "default_true")]
    pub raise_exceptions: bool,
    /// Tasks registered per execution unit. Bounds concurrent
    /// outbound model calls regardless of the total task count.
    #[serde(default = "default_unit_size")]
    pub max_concurrency: usize,
    /// Seed for the scheduling RNG. Backfill draws and corpus sampling
    /// become reproducible when set.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            max_retries: default_max_retries(),
            max_wait_secs: default_max_wait_secs(),
            is_async: true,
            raise_exceptions: true,
            max_concurrency: default_unit_size(),
            seed: None,
        }
    }
}

impl RunConfig {
    /// Exponential backoff for the given attempt, capped at `max_wait_secs`.
    fn retry_interval(&self, attempt: u32) -> Duration {
        let secs = 1u64 << attempt.min(6);
        Duration::from_secs(secs.min(self.max_wait_secs))
    }
}

/// Retry a model call under the run's retry budget.
///
/// Only retryable failures are re-attempted; the terminal error is
/// returned unchanged so callers see the real cause.
pub(crate) async fn with_retry<F, Fut, T>(config: &RunConfig, mut op: F) -> Result<T, LlmError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let mut last_error = None;
    for attempt in 0..=config.max_retries {
        match op().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                if attempt >= config.max_retries || !error.is_retryable() {
                    return Err(error);
                }
                let wait = config.retry_interval(attempt);
                tracing::debug!(
                    attempt,
                    wait_secs = wait.as_secs(),
                    error = %error,
                    "retrying model call"
                );
                tokio::time::sleep(wait).await;
                last_error = Some(error);
            }
        }
    }
    // Unreachable: the loop always returns on the final attempt.
    Err(last_error.unwrap_or(LlmError::Timeout))
}
