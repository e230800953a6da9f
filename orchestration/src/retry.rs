//! Retry controller with bounded exponential backoff.
//!
//! ```text
//! attempt 1 ── ok ─────────────────────────────► T
//!    │ err
//!    ├─ fatal (400/401/403/…) ─────────────────► E   (no wait)
//!    ├─ retries exhausted ─────────────────────► E   (last error)
//!    └─ transient: sleep(delay); delay *= factor; attempt += 1
//! ```
//!
//! The controller never classifies into user messages; it only decides
//! whether to wait and try again. Classification happens downstream.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::classifier;
use crate::errors::ClassifiedError;
use crate::raw::RawError;

/// Failures the controller knows how to judge.
pub trait Retryable {
    /// Whether waiting and trying again could help.
    fn is_transient(&self) -> bool;

    /// Status code for log fields, if the failure carries one.
    fn status_code(&self) -> Option<u16> {
        None
    }
}

impl Retryable for RawError {
    fn is_transient(&self) -> bool {
        classifier::is_transient(self)
    }

    fn status_code(&self) -> Option<u16> {
        RawError::status_code(self)
    }
}

// A classified error already carries the verdict; a fatal one is never retried.
impl Retryable for ClassifiedError {
    fn is_transient(&self) -> bool {
        self.retryable()
    }

    fn status_code(&self) -> Option<u16> {
        self.http_status()
    }
}

/// Backoff parameters for one family of calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt (total attempts = `max_retries + 1`).
    pub max_retries: u32,
    /// Delay before the first retry, in milliseconds.
    pub initial_delay_ms: u64,
    /// Multiplier applied to the delay after every retry.
    pub backoff_factor: f64,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_delay_ms: u64, backoff_factor: f64) -> Self {
        Self {
            max_retries,
            initial_delay_ms,
            backoff_factor,
        }
    }

    /// Text generation: 3 retries, 2 s, ×2 (2 s, 4 s, 8 s).
    pub fn text() -> Self {
        Self::new(3, 2_000, 2.0)
    }

    /// Image generation: 5 retries, 5 s, ×2 (5 s … 80 s).
    pub fn image() -> Self {
        Self::new(5, 5_000, 2.0)
    }

    /// Total number of invocations the controller may make.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before retry number `retry` (0-indexed).
    pub fn delay_ms(&self, retry: u32) -> u64 {
        let delay = self.initial_delay_ms as f64 * self.backoff_factor.powi(retry as i32);
        delay.round() as u64
    }

    /// Every delay the controller would sleep when all attempts fail.
    pub fn schedule(&self) -> Vec<u64> {
        (0..self.max_retries).map(|retry| self.delay_ms(retry)).collect()
    }

    /// Sum of the full schedule.
    pub fn total_delay(&self) -> Duration {
        Duration::from_millis(self.schedule().iter().sum())
    }

    /// Validate the policy; return an error string if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if !self.backoff_factor.is_finite() || self.backoff_factor < 1.0 {
            return Err(format!(
                "backoff_factor must be >= 1.0, got {}",
                self.backoff_factor
            ));
        }
        Ok(())
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::text()
    }
}

/// Run `operation` under `policy`.
///
/// Returns the first success, the first fatal error, or the last error once
/// all `max_retries + 1` attempts are used.
pub async fn execute<T, E, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + Display,
{
    let mut current_delay = policy.initial_delay_ms as f64;
    let mut attempt: u32 = 1;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if attempt > policy.max_retries {
            warn!(
                retries = policy.max_retries,
                status = ?err.status_code(),
                "retries exhausted; returning last error"
            );
            return Err(err);
        }

        if !err.is_transient() {
            debug!(attempt, status = ?err.status_code(), "fatal error; not retrying");
            return Err(err);
        }

        let delay_ms = current_delay.round() as u64;
        warn!(
            attempt,
            max_retries = policy.max_retries,
            status = ?err.status_code(),
            delay_ms,
            "transient failure; backing off"
        );
        debug!(error = %err, "error causing retry");

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        current_delay *= policy.backoff_factor;
        attempt += 1;
    }
}

/// [`execute`] with the parameters spelled out.
pub async fn retry_with_backoff<T, E, F, Fut>(
    operation: F,
    max_retries: u32,
    initial_delay_ms: u64,
    backoff_factor: f64,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + Display,
{
    let policy = RetryPolicy::new(max_retries, initial_delay_ms, backoff_factor);
    execute(&policy, operation).await
}
