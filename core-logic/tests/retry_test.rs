use core_logic::{with_retry, with_retry_if, RetryConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_retry_success_first_try() {
    let counter = Arc::new(AtomicUsize::new(0));
    let config = RetryConfig::new(3, 10);

    let result: Result<String, String> = with_retry(config, "test_op", || async {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok("success".to_string())
    })
    .await;

    assert_eq!(result.unwrap(), "success");
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_retry_success_after_failures_returns_final_payload() {
    let counter = Arc::new(AtomicUsize::new(0));
    let config = RetryConfig::new(3, 10);

    let result: Result<String, String> = with_retry(config, "test_op", || async {
        let count = counter.fetch_add(1, Ordering::SeqCst) + 1;
        if count < 3 {
            Err("temporary error".to_string())
        } else {
            Ok("payload".to_string())
        }
    })
    .await;

    assert_eq!(result.unwrap(), "payload");
    assert_eq!(counter.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_retry_all_failures_returns_last_error() {
    let counter = Arc::new(AtomicUsize::new(0));
    let config = RetryConfig::new(3, 10);

    let result: Result<String, String> = with_retry(config, "test_op", || async {
        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
        Err(format!("error #{}", n))
    })
    .await;

    assert_eq!(result.unwrap_err(), "error #4");
    assert_eq!(counter.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn test_retry_sleeps_fixed_delay_between_attempts() {
    let counter = Arc::new(AtomicUsize::new(0));
    let config = RetryConfig::new(2, 50);

    let start = tokio::time::Instant::now();
    let _: Result<String, String> = with_retry(config, "test_op", || async {
        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
        if n < 3 {
            Err("temp".to_string())
        } else {
            Ok("done".to_string())
        }
    })
    .await;

    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(100));
    assert!(elapsed < Duration::from_millis(150));
}

#[tokio::test]
async fn test_non_retryable_error_stops_immediately() {
    let counter = Arc::new(AtomicUsize::new(0));
    let config = RetryConfig::new(5, 10);

    let result: Result<(), String> = with_retry_if(
        config,
        "test_op",
        || async {
            counter.fetch_add(1, Ordering::SeqCst);
            Err("fatal".to_string())
        },
        |e: &String| e != "fatal",
    )
    .await;

    assert_eq!(result.unwrap_err(), "fatal");
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn test_attempts_counts_first_try() {
    assert_eq!(RetryConfig::new(1, 0).attempts(), 2);
    assert_eq!(RetryConfig::default().attempts(), 2);
}
