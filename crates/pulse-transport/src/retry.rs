use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;

pub const DEFAULT_MAX_RETRIES: usize = 3;
pub const DEFAULT_BASE_DELAY_MS: u64 = 1_000;
pub const DEFAULT_RATE_LIMIT_WAIT_MS: u64 = 60_000;
pub const RATE_LIMIT_RESET_BUFFER_MS: u64 = 1_000;
pub const DEFAULT_JITTER_FRACTION: f64 = 0.25;
pub const AI_JITTER_FRACTION: f64 = 0.10;

const MAX_BACKOFF_SHIFT: usize = 16;

static JITTER_COUNTER: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, PartialEq)]
/// Retry knobs for one client. `max_retries` counts re-issues, not total attempts.
pub struct RetryPolicy {
    pub max_retries: usize,
    pub base_delay_ms: u64,
    /// Symmetric jitter applied to plain backoff, e.g. `0.25` for ±25%.
    pub jitter_fraction: f64,
    /// Wait used for a rate-limited response that names neither a delay nor a reset.
    pub rate_limit_wait_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            jitter_fraction: DEFAULT_JITTER_FRACTION,
            rate_limit_wait_ms: DEFAULT_RATE_LIMIT_WAIT_MS,
        }
    }
}

impl RetryPolicy {
    /// Policy tuned for completion backends: tighter ±10% jitter.
    pub fn for_ai() -> Self {
        Self {
            jitter_fraction: AI_JITTER_FRACTION,
            ..Self::default()
        }
    }

    pub fn total_attempts(&self) -> usize {
        self.max_retries.saturating_add(1)
    }

    /// Jittered exponential delay before re-issuing after `attempt` (0-based) failed.
    pub fn backoff_delay_ms(&self, attempt: usize) -> u64 {
        apply_jitter_ms(
            next_backoff_ms(self.base_delay_ms, attempt),
            self.jitter_fraction,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// How the transport treats a received response.
pub enum ResponseDisposition {
    Success,
    /// 5xx: retry with jittered backoff.
    Retryable,
    /// 429, or 403 carrying rate-limit headers: retry after the advertised delay.
    RateLimited,
    /// Anything else, including 401 and plain 403/404.
    Terminal,
}

/// Classifies a response from its status and headers alone; the body is never needed.
pub fn classify_response(status: u16, headers: &HeaderMap) -> ResponseDisposition {
    match status {
        200..=299 => ResponseDisposition::Success,
        429 => ResponseDisposition::RateLimited,
        403 if has_rate_limit_evidence(headers) => ResponseDisposition::RateLimited,
        500..=599 => ResponseDisposition::Retryable,
        _ => ResponseDisposition::Terminal,
    }
}

/// True when the response advertises a retry delay or an exhausted quota.
pub fn has_rate_limit_evidence(headers: &HeaderMap) -> bool {
    if headers.contains_key("retry-after") {
        return true;
    }
    header_str(headers, "x-ratelimit-remaining")
        .and_then(|raw| raw.parse::<u64>().ok())
        .is_some_and(|remaining| remaining == 0)
}

pub fn next_backoff_ms(base_delay_ms: u64, attempt: usize) -> u64 {
    let shift = attempt.min(MAX_BACKOFF_SHIFT);
    base_delay_ms.saturating_mul(1_u64 << shift)
}

/// Spreads `delay_ms` uniformly over `[delay·(1-f), delay·(1+f)]`.
pub fn apply_jitter_ms(delay_ms: u64, fraction: f64) -> u64 {
    if delay_ms == 0 || !fraction.is_finite() || fraction <= 0.0 {
        return delay_ms;
    }
    let spread = (delay_ms as f64 * fraction.min(1.0)) as u64;
    if spread == 0 {
        return delay_ms;
    }
    let low = delay_ms.saturating_sub(spread);
    let width = spread.saturating_mul(2);
    let seed = JITTER_COUNTER.fetch_add(1, Ordering::Relaxed);
    let mixed = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15).rotate_left(17) ^ 0xA24B_AED4_963E_E407;
    low.saturating_add(mixed % width.saturating_add(1))
}

pub fn parse_retry_after_ms(headers: &HeaderMap) -> Option<u64> {
    let raw = header_str(headers, "retry-after")?;
    if let Ok(seconds) = raw.parse::<u64>() {
        return Some(seconds.saturating_mul(1000));
    }

    let retry_at = DateTime::parse_from_rfc2822(raw).ok()?.with_timezone(&Utc);
    let delay_ms = retry_at
        .signed_duration_since(Utc::now())
        .num_milliseconds();
    if delay_ms <= 0 {
        return Some(0);
    }
    u64::try_from(delay_ms).ok()
}

/// Delay until the advertised `x-ratelimit-reset` instant plus a safety buffer.
pub fn parse_rate_limit_reset_ms(headers: &HeaderMap, now_unix: u64) -> Option<u64> {
    let reset_unix = header_str(headers, "x-ratelimit-reset")?
        .parse::<u64>()
        .ok()?;
    let wait_ms = reset_unix.saturating_sub(now_unix).saturating_mul(1000);
    Some(wait_ms.saturating_add(RATE_LIMIT_RESET_BUFFER_MS))
}

/// Retry-After wins, then the reset instant, then the policy's fixed wait.
pub fn rate_limit_delay_ms(headers: &HeaderMap, policy: &RetryPolicy, now_unix: u64) -> u64 {
    parse_retry_after_ms(headers)
        .or_else(|| parse_rate_limit_reset_ms(headers, now_unix))
        .unwrap_or(policy.rate_limit_wait_ms)
}

pub fn is_retryable_http_error(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect() || error.is_request() || error.is_body()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)?
        .to_str()
        .ok()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
