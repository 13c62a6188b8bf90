//! Resolution of the incremental-upload watermark

use crate::error::{IngestError, Result};
use crate::retry::RetryPolicy;
use asa_common::types::Watermark;
use async_trait::async_trait;
use tracing::info;

/// Anything that can report the newest telegram timestamp it holds
#[async_trait]
pub trait WatermarkSource: Send + Sync {
    /// `Ok(None)` when the destination holds no telegrams yet
    async fn latest_timestamp(&self) -> Result<Option<Watermark>>;
}

/// Queries a [`WatermarkSource`] under a bounded retry policy
pub struct WatermarkResolver<'a> {
    source: &'a dyn WatermarkSource,
    policy: RetryPolicy,
}

impl<'a> WatermarkResolver<'a> {
    pub fn new(source: &'a dyn WatermarkSource, policy: RetryPolicy) -> Self {
        Self { source, policy }
    }

    /// Fetch the watermark once for the whole run
    ///
    /// Exhausting the retry policy yields [`IngestError::WatermarkExhausted`],
    /// which ends the run before any file is touched.
    pub async fn resolve(&self) -> Result<Option<Watermark>> {
        let watermark = self
            .policy
            .run("Watermark query", |_| self.source.latest_timestamp())
            .await
            .map_err(|e| IngestError::WatermarkExhausted {
                attempts: e.attempts,
                last_error: e.last_error.to_string(),
            })?;

        match watermark {
            Some(mark) => info!(
                timestamp_ms = mark.timestamp_ms(),
                watermark = %mark,
                "Last data point in InfluxDB"
            ),
            None => info!("InfluxDB holds no telegrams yet, accepting all records"),
        }

        Ok(watermark)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Fails `failures` times, then answers with `answer`
    struct Flaky {
        failures: u32,
        answer: Option<Watermark>,
        calls: AtomicU32,
    }

    impl Flaky {
        fn new(failures: u32, answer: Option<Watermark>) -> Self {
            Self {
                failures,
                answer,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl WatermarkSource for Flaky {
        async fn latest_timestamp(&self) -> Result<Option<Watermark>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.failures {
                Err(IngestError::QueryResponse(format!("timeout #{}", call)))
            } else {
                Ok(self.answer)
            }
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_secs(10))
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolves_after_transient_failures() {
        let source = Flaky::new(2, Some(Watermark::new(1_700_000_000_000)));
        let watermark = WatermarkResolver::new(&source, policy())
            .resolve()
            .await
            .unwrap();

        assert_eq!(watermark, Some(Watermark::new(1_700_000_000_000)));
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_destination_is_not_an_error() {
        let source = Flaky::new(0, None);
        let watermark = WatermarkResolver::new(&source, policy())
            .resolve()
            .await
            .unwrap();
        assert_eq!(watermark, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_is_fatal() {
        let source = Flaky::new(3, None);
        let err = WatermarkResolver::new(&source, policy())
            .resolve()
            .await
            .unwrap_err();

        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
        match err {
            IngestError::WatermarkExhausted {
                attempts,
                last_error,
            } => {
                assert_eq!(attempts, 3);
                assert!(last_error.contains("timeout #3"));
            },
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
