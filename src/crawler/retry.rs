//! Retry policy wrapped around every page fetch
//!
//! The policy owns both delays that surround an attempt: the request delay
//! that throttles load on the origin (applied before every attempt) and the
//! backoff between a failed attempt and the next one.

use crate::config::{BackoffKind, ScraperConfig};
use crate::crawler::FetchError;
use std::future::Future;
use std::time::Duration;

/// Delay between a failed attempt and the next one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Constant(Duration),
    /// `base * 2^(n-1)` after the n-th failure, capped at `max`
    Exponential { base: Duration, max: Duration },
}

impl Backoff {
    /// Delay after the `failed_attempt`-th failure (1-based)
    pub fn delay_for(&self, failed_attempt: u32) -> Duration {
        match *self {
            Self::Constant(delay) => delay,
            Self::Exponential { base, max } => {
                let shift = failed_attempt.saturating_sub(1).min(16);
                base.saturating_mul(1u32 << shift).min(max)
            }
        }
    }
}

/// Bounded retry of a single fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first one included
    pub max_attempts: u32,
    pub backoff: Backoff,
    /// Sleep before every attempt
    pub request_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &ScraperConfig) -> Self {
        let delay = Duration::from_millis(config.retry.delay_ms);
        let backoff = match config.retry.backoff {
            BackoffKind::Constant => Backoff::Constant(delay),
            BackoffKind::Exponential => Backoff::Exponential {
                base: delay,
                max: Duration::from_millis(config.retry.max_delay_ms),
            },
        };

        Self {
            max_attempts: config.max_retries.max(1),
            backoff,
            request_delay: Duration::from_millis(config.request_delay_ms),
        }
    }

    /// Runs `op` until it succeeds, fails permanently, or attempts run out
    ///
    /// Non-retryable errors are returned after the attempt that produced
    /// them; the last retryable error is returned once `max_attempts`
    /// attempts have failed.
    pub async fn run<T, F, Fut>(&self, url: &str, mut op: F) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            if !self.request_delay.is_zero() {
                tokio::time::sleep(self.request_delay).await;
            }

            let error = match op().await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if !error.is_retryable() {
                tracing::warn!("Permanent failure for {}: {}", url, error);
                return Err(error);
            }

            if attempt >= max_attempts {
                tracing::warn!("Max retries reached for {} after {} attempts", url, attempt);
                return Err(error);
            }

            let delay = self.backoff.delay_for(attempt);
            tracing::warn!(
                "Attempt {}/{} failed for {}: {} (retrying in {:?})",
                attempt,
                max_attempts,
                url,
                error,
                delay
            );
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }
}
