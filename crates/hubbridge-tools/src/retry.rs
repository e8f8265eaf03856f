//! Retry orchestration for hub requests.
//!
//! Only timeouts are retried: the request may or may not have reached the
//! hub, and trying again is the caller's decision. Every other failure is
//! returned on first occurrence.

use hubbridge_mcp::McpResult;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Retries used when the caller does not ask for a specific count.
pub const DEFAULT_RETRIES: u32 = 1;

/// Upper bound on retries per call.
pub const MAX_RETRIES: u32 = 3;

/// Delay step between retries in milliseconds.
pub const RETRY_STEP_MS: u64 = 250;

/// Number of steps after which the delay stops growing.
pub const RETRY_MAX_STEPS: u32 = 8;

/// Clamp a requested retry count to `0..=MAX_RETRIES`.
pub fn clamp_retries(requested: u32) -> u32 {
    requested.min(MAX_RETRIES)
}

/// Delay before retry `retry` (0-based): 250ms, 500ms, 750ms, ... capped at 2s.
pub fn backoff_delay(retry: u32) -> Duration {
    let steps = retry.saturating_add(1).min(RETRY_MAX_STEPS);
    Duration::from_millis(RETRY_STEP_MS * u64::from(steps))
}

/// Run `operation`, retrying retryable failures up to `max_retries` times.
///
/// The operation runs at most `max_retries + 1` times; when every attempt
/// fails the last error is returned.
pub async fn with_retries<T, F, Fut>(max_retries: u32, mut operation: F) -> McpResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = McpResult<T>>,
{
    let max_retries = clamp_retries(max_retries);
    let mut retry = 0;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && retry < max_retries => {
                let delay = backoff_delay(retry);
                debug!(
                    retry = retry + 1,
                    max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Retrying hub request"
                );
                tokio::time::sleep(delay).await;
                retry += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hubbridge_mcp::{McpError, REQUEST_TIMEOUT_CODE};
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[test]
    fn test_backoff_schedule() {
        let delays: Vec<u64> = (0..10)
            .map(|n| backoff_delay(n).as_millis() as u64)
            .collect();
        assert_eq!(
            delays,
            vec![250, 500, 750, 1000, 1250, 1500, 1750, 2000, 2000, 2000]
        );
    }

    #[test]
    fn test_backoff_does_not_overflow() {
        assert_eq!(backoff_delay(u32::MAX), Duration::from_millis(2000));
    }

    #[test]
    fn test_clamp_retries() {
        assert_eq!(clamp_retries(0), 0);
        assert_eq!(clamp_retries(2), 2);
        assert_eq!(clamp_retries(3), 3);
        assert_eq!(clamp_retries(50), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_returns_immediately() {
        let attempts = AtomicU32::new(0);
        let start = Instant::now();

        let value = with_retries(3, || async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Ok::<_, McpError>(7)
        })
        .await
        .unwrap();

        assert_eq!(value, 7);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeouts_exhaust_budget() {
        for max_retries in 0..=3 {
            let attempts = AtomicU32::new(0);
            let result: McpResult<()> = with_retries(max_retries, || async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(McpError::Timeout)
            })
            .await;

            assert!(matches!(result, Err(McpError::Timeout)));
            assert_eq!(attempts.load(Ordering::SeqCst), max_retries + 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_fails_once() {
        let attempts = AtomicU32::new(0);
        let result: McpResult<()> = with_retries(3, || async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(McpError::AuthRequired)
        })
        .await;

        assert!(matches!(result, Err(McpError::AuthRequired)));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_between_retries() {
        let start = Instant::now();
        let result: McpResult<()> = with_retries(3, || async {
            Err(McpError::Rpc {
                code: REQUEST_TIMEOUT_CODE,
                message: "slow".to_string(),
            })
        })
        .await;

        assert!(result.is_err());
        // 250 + 500 + 750
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(1500), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(1510), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_timeout() {
        let attempts = AtomicU32::new(0);
        let value = with_retries(1, || async {
            if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(McpError::protocol_error("upstream timed out"))
            } else {
                Ok("done")
            }
        })
        .await
        .unwrap();

        assert_eq!(value, "done");
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_requested_retries_are_clamped() {
        let attempts = AtomicU32::new(0);
        let _: McpResult<()> = with_retries(10, || async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(McpError::Timeout)
        })
        .await;
        assert_eq!(attempts.load(Ordering::SeqCst), MAX_RETRIES + 1);
    }
}
