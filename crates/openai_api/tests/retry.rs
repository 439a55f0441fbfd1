use std::time::Duration;

use openai_api::retry::*;

#[test]
fn retry_http_status_is_retryable() {
    for status in [408, 409, 429, 500, 502, 503, 504] {
        assert!(is_retryable_http_error(status, ""), "status {status}");
    }
    assert!(!is_retryable_http_error(400, ""));
    assert!(!is_retryable_http_error(401, ""));
}

#[test]
fn retry_http_error_pattern_is_retryable() {
    assert!(is_retryable_http_error(400, "rate limit exceeded"));
    assert!(is_retryable_http_error(400, "connection reset by peer"));
    assert!(is_retryable_http_error(400, "request timed out"));
}

#[test]
fn insufficient_quota_is_never_retried() {
    let body = r#"{"error":{"code":"insufficient_quota"}}"#;
    assert!(!is_retryable_http_error(429, body));
}

#[test]
fn retry_delay_is_exponential() {
    assert_eq!(retry_delay_ms(0).as_millis(), 1000);
    assert_eq!(retry_delay_ms(1).as_millis(), 2000);
    assert_eq!(retry_delay_ms(2).as_millis(), 4000);
}

#[test]
fn retry_after_hint_overrides_backoff_and_is_capped() {
    assert_eq!(next_retry_delay(2, Some("0")), Duration::ZERO);
    assert_eq!(next_retry_delay(0, Some("1.5")), Duration::from_millis(1500));
    assert_eq!(next_retry_delay(0, Some("3600")), MAX_RETRY_AFTER);
    assert_eq!(next_retry_delay(1, Some("soon")), retry_delay_ms(1));
    assert_eq!(next_retry_delay(1, None), retry_delay_ms(1));
}
