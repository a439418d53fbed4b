//! Retry transport shared by every outbound pulse HTTP call.
//!
//! [`RetryTransport`] re-issues a request built fresh for each attempt,
//! backing off exponentially with jitter on network failures and 5xx
//! responses, honouring rate-limit headers on 429 and rate-limited 403
//! responses, and short-circuiting on authorization or not-found errors.
//! Every wait between attempts races the caller's cancellation token.
mod error;
mod retry;
mod transport;

pub use error::{truncate_for_error, TransportError};
pub use retry::{
    apply_jitter_ms, classify_response, has_rate_limit_evidence, is_retryable_http_error,
    next_backoff_ms, parse_rate_limit_reset_ms, parse_retry_after_ms, rate_limit_delay_ms,
    ResponseDisposition, RetryPolicy, AI_JITTER_FRACTION, DEFAULT_BASE_DELAY_MS,
    DEFAULT_JITTER_FRACTION, DEFAULT_MAX_RETRIES, DEFAULT_RATE_LIMIT_WAIT_MS,
    RATE_LIMIT_RESET_BUFFER_MS,
};
pub use transport::{RetryTransport, RETRY_ATTEMPT_HEADER};
