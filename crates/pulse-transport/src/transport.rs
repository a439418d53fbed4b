use std::time::Duration;

use pulse_core::{current_unix_timestamp, CancellationToken};
use tracing::{debug, warn};

use crate::error::{truncate_for_error, TransportError};
use crate::retry::{
    classify_response, is_retryable_http_error, rate_limit_delay_ms, ResponseDisposition,
    RetryPolicy,
};

/// Header carrying the 0-based attempt index on every outbound request.
pub const RETRY_ATTEMPT_HEADER: &str = "x-pulse-retry-attempt";

const ERROR_BODY_MAX_CHARS: usize = 800;

#[derive(Debug, Clone, Default)]
/// Stateless retry executor; safe to share between concurrent workers.
pub struct RetryTransport {
    policy: RetryPolicy,
}

impl RetryTransport {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Sends the request produced by `request_builder`, re-building it for every attempt.
    ///
    /// Returns the first 2xx response. Non-retryable statuses return
    /// [`TransportError::Status`] at once; exhausted retries return
    /// [`TransportError::RetriesExhausted`] wrapping the last failure.
    pub async fn send<F>(
        &self,
        operation: &str,
        cancel: &CancellationToken,
        mut request_builder: F,
    ) -> Result<reqwest::Response, TransportError>
    where
        F: FnMut() -> reqwest::RequestBuilder,
    {
        let max_retries = self.policy.max_retries;
        let mut attempt = 0_usize;
        loop {
            if cancel.is_cancelled() {
                return Err(cancelled(operation));
            }
            let has_retry_left = attempt < max_retries;
            let request = request_builder().header(RETRY_ATTEMPT_HEADER, attempt.to_string());
            let outcome = tokio::select! {
                _ = cancel.cancelled() => return Err(cancelled(operation)),
                outcome = request.send() => outcome,
            };

            let delay_ms = match outcome {
                Ok(response) => {
                    let status = response.status().as_u16();
                    let disposition = classify_response(status, response.headers());
                    let delay_ms = match disposition {
                        ResponseDisposition::Success => return Ok(response),
                        ResponseDisposition::Terminal => {
                            return Err(status_error(operation, response).await);
                        }
                        ResponseDisposition::RateLimited => rate_limit_delay_ms(
                            response.headers(),
                            &self.policy,
                            current_unix_timestamp(),
                        ),
                        ResponseDisposition::Retryable => self.policy.backoff_delay_ms(attempt),
                    };
                    if !has_retry_left {
                        let last = status_error(operation, response).await;
                        warn!(operation, status, attempts = attempt + 1, "retries exhausted");
                        return Err(exhausted(operation, attempt, last));
                    }
                    debug!(operation, status, attempt, delay_ms, ?disposition, "retrying request");
                    delay_ms
                }
                Err(error) => {
                    if !is_retryable_http_error(&error) {
                        return Err(TransportError::Http {
                            operation: operation.to_string(),
                            source: error,
                        });
                    }
                    let last = TransportError::Http {
                        operation: operation.to_string(),
                        source: error,
                    };
                    if !has_retry_left {
                        warn!(operation, attempts = attempt + 1, error = %last, "retries exhausted");
                        return Err(exhausted(operation, attempt, last));
                    }
                    let delay_ms = self.policy.backoff_delay_ms(attempt);
                    debug!(operation, attempt, delay_ms, error = %last, "retrying after network error");
                    delay_ms
                }
            };

            tokio::select! {
                _ = cancel.cancelled() => return Err(cancelled(operation)),
                _ = tokio::time::sleep(Duration::from_millis(delay_ms)) => {}
            }
            attempt = attempt.saturating_add(1);
        }
    }
}

fn cancelled(operation: &str) -> TransportError {
    TransportError::Cancelled {
        operation: operation.to_string(),
    }
}

fn exhausted(operation: &str, attempt: usize, last: TransportError) -> TransportError {
    TransportError::RetriesExhausted {
        operation: operation.to_string(),
        attempts: attempt.saturating_add(1),
        last: Box::new(last),
    }
}

async fn status_error(operation: &str, response: reqwest::Response) -> TransportError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    TransportError::Status {
        operation: operation.to_string(),
        status,
        body: truncate_for_error(&body, ERROR_BODY_MAX_CHARS),
    }
}
