//! Provider retry: bounded re-attempts with a per-attempt timeout.
//!
//! Wraps a single provider. Only transient failures (network, timeout, rate
//! limit, 5xx) are retried; everything else is returned on the first attempt.

use async_trait::async_trait;
use churnguard_core::error::ProviderError;
use churnguard_core::provider::*;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// A provider that re-sends a failed request up to `max_retries` times.
pub struct RetryProvider {
    inner: Arc<dyn churnguard_core::Provider>,
    max_retries: u32,
    timeout: Duration,
    backoff: Duration,
}

impl RetryProvider {
    /// Wrap `inner` with no retries and the default timeout (120s).
    pub fn new(inner: Arc<dyn churnguard_core::Provider>) -> Self {
        Self {
            inner,
            max_retries: 0,
            timeout: Duration::from_secs(120),
            backoff: Duration::from_millis(500),
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Base delay; attempt `n` waits `n * backoff` before re-sending.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }
}

#[async_trait]
impl churnguard_core::Provider for RetryProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let mut attempt: u32 = 0;

        loop {
            let result = match tokio::time::timeout(self.timeout, self.inner.complete(request.clone()))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout(format!(
                    "Provider '{}' timed out after {}s",
                    self.inner.name(),
                    self.timeout.as_secs()
                ))),
            };

            let error = match result {
                Ok(response) => return Ok(response),
                Err(e) => e,
            };

            if !error.is_transient() || attempt >= self.max_retries {
                return Err(error);
            }

            attempt += 1;
            let delay = self.backoff * attempt;
            warn!(
                provider = %self.inner.name(),
                error = %error,
                attempt,
                max_retries = self.max_retries,
                delay_ms = delay.as_millis() as u64,
                "Retry: transient provider failure"
            );
            tokio::time::sleep(delay).await;
            info!(provider = %self.inner.name(), attempt, "Retry: re-sending request");
        }
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        self.inner.health_check().await
    }
}
