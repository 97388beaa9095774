//! Tests for the retry executor.

use super::*;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
struct FlakyError {
    attempt: u32,
    decision: RetryDecision,
}

impl Display for FlakyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "attempt {} failed", self.attempt)
    }
}

impl Retryable for FlakyError {
    fn retry_decision(&self) -> RetryDecision {
        self.decision
    }
}

fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::fixed(max_attempts, Duration::from_millis(10))
}

#[tokio::test(start_paused = true)]
async fn test_succeeds_after_n_failures_with_n_plus_one_calls() {
    for failures in 0..4u32 {
        let mut calls = 0u32;
        let result: Result<u32, String> = retry(&fast_policy(failures + 1), "flaky", || {
            calls += 1;
            let current = calls;
            async move {
                if current <= failures {
                    Err(format!("failure {current}"))
                } else {
                    Ok(current)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(failures + 1));
        assert_eq!(calls, failures + 1);
    }
}

#[tokio::test(start_paused = true)]
async fn test_always_failing_operation_is_called_max_attempts_times() {
    let mut calls = 0u32;
    let result: Result<(), FlakyError> = retry(&fast_policy(4), "always failing", || {
        calls += 1;
        let attempt = calls;
        async move {
            Err(FlakyError {
                attempt,
                decision: RetryDecision::Retry,
            })
        }
    })
    .await;

    assert_eq!(calls, 4);
    // The error of the last attempt comes back untouched.
    assert_eq!(
        result,
        Err(FlakyError {
            attempt: 4,
            decision: RetryDecision::Retry
        })
    );
}

#[tokio::test(start_paused = true)]
async fn test_single_attempt_behaves_like_direct_call() {
    let direct: Result<u32, String> = async { Err("boom".to_string()) }.await;

    let mut calls = 0u32;
    let wrapped: Result<u32, String> = retry(&RetryPolicy::no_retry(), "once", || {
        calls += 1;
        async { Err("boom".to_string()) }
    })
    .await;

    assert_eq!(calls, 1);
    assert_eq!(wrapped, direct);

    let once = RetryPolicy::fixed(1, Duration::from_secs(5));
    let ok: Result<u32, String> = retry(&once, "once", || async { Ok(7) }).await;
    assert_eq!(ok, Ok(7));
}

#[tokio::test(start_paused = true)]
async fn test_zero_attempts_is_treated_as_one() {
    let mut calls = 0u32;
    let result: Result<(), String> = retry(&fast_policy(0), "zero", || {
        calls += 1;
        async { Err("nope".to_string()) }
    })
    .await;

    assert_eq!(calls, 1);
    assert!(result.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_linear_backoff_waits_attempt_times_base() {
    let base = Duration::from_secs(2);
    let policy = RetryPolicy::linear(4, base).with_max_wait(Duration::from_secs(60));
    let mut started: Vec<Instant> = Vec::new();

    let _: Result<(), String> = retry(&policy, "linear", || {
        started.push(Instant::now());
        async { Err("still failing".to_string()) }
    })
    .await;

    assert_eq!(started.len(), 4);
    let gaps: Vec<Duration> = started.windows(2).map(|w| w[1] - w[0]).collect();
    for (index, gap) in gaps.iter().enumerate() {
        let expected = base * (index as u32 + 1);
        assert!(*gap >= expected, "gap {index} was {gap:?}, expected {expected:?}");
        assert!(*gap < expected + Duration::from_millis(50));
    }
    assert!(gaps.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[tokio::test(start_paused = true)]
async fn test_policy_delay_never_exceeds_max_wait() {
    let policy =
        RetryPolicy::linear(3, Duration::from_secs(40)).with_max_wait(Duration::from_secs(50));
    let mut started: Vec<Instant> = Vec::new();

    let _: Result<(), String> = retry(&policy, "capped", || {
        started.push(Instant::now());
        async { Err("still failing".to_string()) }
    })
    .await;

    assert_eq!(started.len(), 3);
    let second_gap = started[2] - started[1];
    assert!(second_gap >= Duration::from_secs(50));
    assert!(second_gap < Duration::from_secs(51));
}

#[tokio::test(start_paused = true)]
async fn test_suggested_delay_is_honoured() {
    let policy = fast_policy(3).with_max_wait(Duration::from_secs(30));
    let mut started: Vec<Instant> = Vec::new();

    let result: Result<u32, FlakyError> = retry_classified(&policy, "rate limited", || {
        started.push(Instant::now());
        let attempt = started.len() as u32;
        async move {
            if attempt == 1 {
                Err(FlakyError {
                    attempt,
                    decision: RetryDecision::RetryAfter(Duration::from_secs(20)),
                })
            } else {
                Ok(attempt)
            }
        }
    })
    .await;

    assert_eq!(result, Ok(2));
    assert!(started[1] - started[0] >= Duration::from_secs(20));
}

#[tokio::test(start_paused = true)]
async fn test_suggested_delay_above_max_wait_gives_up_immediately() {
    let policy = fast_policy(5).with_max_wait(Duration::from_secs(30));
    let begin = Instant::now();
    let mut calls = 0u32;

    let result: Result<(), FlakyError> = retry_classified(&policy, "throttled", || {
        calls += 1;
        let attempt = calls;
        async move {
            Err(FlakyError {
                attempt,
                decision: RetryDecision::RetryAfter(Duration::from_secs(3600)),
            })
        }
    })
    .await;

    assert_eq!(calls, 1);
    assert_eq!(result.unwrap_err().attempt, 1);
    assert!(begin.elapsed() < Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn test_stop_decision_is_not_retried() {
    let mut calls = 0u32;
    let result: Result<(), FlakyError> = retry_classified(&fast_policy(5), "not found", || {
        calls += 1;
        let attempt = calls;
        async move {
            Err(FlakyError {
                attempt,
                decision: RetryDecision::Stop,
            })
        }
    })
    .await;

    assert_eq!(calls, 1);
    assert!(result.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_retry_if_uses_custom_classifier() {
    let mut calls = 0u32;
    let result: Result<(), String> = retry_if(
        &fast_policy(5),
        "classified",
        || {
            calls += 1;
            let attempt = calls;
            async move { Err(format!("status {}", if attempt < 3 { 503 } else { 404 })) }
        },
        |error: &String| {
            if error.contains("404") {
                RetryDecision::Stop
            } else {
                RetryDecision::Retry
            }
        },
    )
    .await;

    assert_eq!(calls, 3);
    assert_eq!(result, Err("status 404".to_string()));
}
