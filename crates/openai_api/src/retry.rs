use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

/// Maximum retry attempts after an initial request attempt.
pub const MAX_RETRIES: u32 = 3;
/// Base delay before the first retry.
pub const BASE_DELAY_MS: u64 = 1000;
/// Upper bound applied to server-provided `retry-after` hints.
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

fn transient_error_regex() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    CACHED.get_or_init(|| {
        Regex::new(r"(?i)rate.?limit|overloaded|service.?unavailable|server.?error|upstream.?connect|connection.?(refused|reset|closed)|timed?.?out")
            .expect("retry regex must compile")
    })
}

/// Status and error-text policy for transient failures.
///
/// `insufficient_quota` is never retried even though it arrives as a 429.
pub fn is_retryable_http_error(status: u16, error_text: &str) -> bool {
    if error_text.contains("insufficient_quota") {
        return false;
    }
    matches!(status, 408 | 409 | 429 | 500 | 502 | 503 | 504)
        || transient_error_regex().is_match(error_text)
}

/// Exponential backoff delay for a retry attempt.
pub fn retry_delay_ms(attempt: u32) -> Duration {
    let exponent = attempt.min(30);
    Duration::from_millis(BASE_DELAY_MS * 2u64.saturating_pow(exponent))
}

/// Delay before the next attempt, preferring a `retry-after` header expressed in seconds.
///
/// Unparseable hints fall back to [`retry_delay_ms`]; parsed hints are capped at
/// [`MAX_RETRY_AFTER`].
pub fn next_retry_delay(attempt: u32, retry_after: Option<&str>) -> Duration {
    retry_after
        .and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|seconds| seconds.is_finite() && *seconds >= 0.0)
        .map(|seconds| Duration::from_secs_f64(seconds.min(MAX_RETRY_AFTER.as_secs_f64())))
        .unwrap_or_else(|| retry_delay_ms(attempt))
}
