use crate::utils::error::Result;
use std::future::Future;

/// 每個週期最多嘗試次數
pub const MAX_ATTEMPTS: u32 = 3;

/// Runs `action` up to `max_attempts` times back to back and returns the first
/// success, or the last error once attempts are exhausted.
pub async fn retry_on_failure<T, F, Fut>(operation: &str, max_attempts: u32, mut action: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match action().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!("✅ {} succeeded on attempt {}", operation, attempt);
                }
                return Ok(value);
            }
            Err(e) if attempt >= max_attempts => {
                tracing::error!(
                    category = ?e.category(),
                    "❌ {} failed after {} attempts: {}",
                    operation,
                    attempt,
                    e
                );
                return Err(e);
            }
            Err(e) => {
                tracing::warn!(
                    "🔄 {} attempt {}/{} failed: {}",
                    operation,
                    attempt,
                    max_attempts,
                    e
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::KrabotError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn failure(n: u32) -> KrabotError {
        KrabotError::scraping(format!("failure #{}", n))
    }

    #[tokio::test]
    async fn test_succeeds_after_two_failures() {
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result = retry_on_failure("test", MAX_ATTEMPTS, move || async move {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 {
                Err(failure(n))
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_propagates_last_error_after_three_failures() {
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: Result<()> = retry_on_failure("test", MAX_ATTEMPTS, move || async move {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            Err(failure(n))
        })
        .await;

        match result {
            Err(KrabotError::ScrapingError { message }) => assert_eq!(message, "failure #3"),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_first_success_runs_once() {
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result = retry_on_failure("test", MAX_ATTEMPTS, move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok("done")
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: Result<()> = retry_on_failure("test", 0, move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(failure(1))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
