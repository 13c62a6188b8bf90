//! Bounded retry with a fixed pause between attempts

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Returned when every attempt failed
#[derive(Debug, Error)]
#[error("{attempts} attempts failed, last error: {last_error}")]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub last_error: E,
}

/// How often and how patiently to retry an operation
///
/// The delay is fixed, not exponential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// `max_attempts` is clamped to at least one
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `op` until it succeeds or the attempts are used up
    ///
    /// `op` receives the 1-based attempt number. The first success
    /// short-circuits the remaining attempts; there is no sleep after the
    /// final failure.
    pub async fn run<T, E, F, Fut>(&self, what: &str, mut op: F) -> Result<T, RetryExhausted<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 1;

        loop {
            debug!("{} attempt {}/{}", what, attempt, self.max_attempts);

            match op(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        info!("{} attempt {}/{} succeeded", what, attempt, self.max_attempts);
                    }
                    return Ok(value);
                },
                Err(e) if attempt < self.max_attempts => {
                    warn!(
                        "{} attempt {}/{} failed: {}. Retrying in {}s...",
                        what,
                        attempt,
                        self.max_attempts,
                        e,
                        self.delay.as_secs_f64()
                    );
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                },
                Err(e) => {
                    return Err(RetryExhausted {
                        attempts: attempt,
                        last_error: e,
                    });
                },
            }
        }
    }
}
