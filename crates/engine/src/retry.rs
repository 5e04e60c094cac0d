// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Exponential backoff around phase attempts
//!
//! Transient errors are retried until the elapsed-time budget runs out;
//! anything else is returned after the first attempt.

use crate::error::PhaseError;
use orbit_core::RetryConfig;
use rand::Rng;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Decides whether an error is worth another attempt
pub type TransientPredicate = Arc<dyn Fn(&PhaseError) -> bool + Send + Sync>;

#[derive(Clone)]
pub struct RetryPolicy {
    pub initial_interval: Duration,
    pub multiplier: f64,
    pub max_interval: Duration,
    /// Attempts stop once the next wait would end past this budget
    pub max_elapsed_time: Duration,
    pub randomization_factor: f64,
    is_transient: TransientPredicate,
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("initial_interval", &self.initial_interval)
            .field("multiplier", &self.multiplier)
            .field("max_interval", &self.max_interval)
            .field("max_elapsed_time", &self.max_elapsed_time)
            .field("randomization_factor", &self.randomization_factor)
            .finish_non_exhaustive()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            initial_interval: config.initial_interval,
            multiplier: config.multiplier.max(1.0),
            max_interval: config.max_interval,
            max_elapsed_time: config.max_elapsed_time,
            randomization_factor: sanitize_factor(config.randomization_factor),
            is_transient: Arc::new(PhaseError::is_transient),
        }
    }

    pub fn with_max_elapsed_time(mut self, budget: Duration) -> Self {
        self.max_elapsed_time = budget;
        self
    }

    pub fn with_initial_interval(mut self, interval: Duration) -> Self {
        self.initial_interval = interval;
        self
    }

    pub fn with_max_interval(mut self, interval: Duration) -> Self {
        self.max_interval = interval;
        self
    }

    /// Replace the default `PhaseError::is_transient` classification
    pub fn with_transient_predicate(
        mut self,
        predicate: impl Fn(&PhaseError) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.is_transient = Arc::new(predicate);
        self
    }

    pub fn is_transient(&self, err: &PhaseError) -> bool {
        (self.is_transient)(err)
    }

    /// Un-randomized interval that follows `current`
    pub fn next_interval(&self, current: Duration) -> Duration {
        let next = current.as_secs_f64() * self.multiplier;
        Duration::from_secs_f64(next.min(self.max_interval.as_secs_f64()))
    }

    /// `interval` spread uniformly by +/- the randomization factor
    pub fn randomize(&self, interval: Duration) -> Duration {
        if self.randomization_factor <= 0.0 || interval.is_zero() {
            return interval;
        }
        let delta = self.randomization_factor;
        let factor = rand::thread_rng().gen_range((1.0 - delta)..=(1.0 + delta));
        Duration::from_secs_f64(interval.as_secs_f64() * factor)
    }

    /// Run `attempt` until it succeeds, fails permanently, runs out of
    /// budget or is cancelled
    pub async fn run<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        name: &str,
        mut attempt: F,
    ) -> Result<T, PhaseError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, PhaseError>>,
    {
        let start = Instant::now();
        let mut interval = self.initial_interval;
        let mut attempts = 0u32;

        loop {
            if cancel.is_cancelled() {
                return Err(PhaseError::Cancelled);
            }
            attempts += 1;

            let err = match attempt().await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };
            if err.is_cancelled() {
                return Err(err);
            }
            if !self.is_transient(&err) {
                return Err(err);
            }

            let delay = self.randomize(interval);
            let elapsed = start.elapsed();
            if elapsed + delay > self.max_elapsed_time {
                tracing::warn!(
                    operation = name,
                    attempts,
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %err,
                    "retry budget exhausted"
                );
                return Err(err);
            }

            tracing::warn!(
                operation = name,
                attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "transient failure, retrying"
            );
            tokio::select! {
                _ = cancel.cancelled() => return Err(PhaseError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
            interval = self.next_interval(interval);
        }
    }
}

/// Clamp into `[0, 1]`; a NaN or infinite factor disables jitter
fn sanitize_factor(factor: f64) -> f64 {
    if factor.is_finite() {
        factor.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
