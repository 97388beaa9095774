use super::*;

#[test]
fn test_fixed_delay_is_constant() {
    let policy = DelayPolicy::Fixed(Duration::from_secs(10));
    assert_eq!(policy.delay_after(1), Duration::from_secs(10));
    assert_eq!(policy.delay_after(5), Duration::from_secs(10));
}

#[test]
fn test_linear_delay_multiplies_attempt_index() {
    let policy = DelayPolicy::Linear {
        base: Duration::from_millis(500),
    };
    assert_eq!(policy.delay_after(1), Duration::from_millis(500));
    assert_eq!(policy.delay_after(2), Duration::from_millis(1000));
    assert_eq!(policy.delay_after(4), Duration::from_millis(2000));
}

#[test]
fn test_linear_delay_is_non_decreasing() {
    let policy = DelayPolicy::Linear {
        base: Duration::from_secs(3),
    };
    let delays: Vec<Duration> = (1..=8).map(|attempt| policy.delay_after(attempt)).collect();
    assert!(delays.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[test]
fn test_linear_delay_saturates_instead_of_overflowing() {
    let policy = DelayPolicy::Linear { base: Duration::MAX };
    assert_eq!(policy.delay_after(3), Duration::MAX);
}

#[test]
fn test_none_delay_is_zero() {
    assert_eq!(DelayPolicy::None.delay_after(7), Duration::ZERO);
}

#[test]
fn test_default_policy() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.max_attempts, DEFAULT_MAX_ATTEMPTS);
    assert_eq!(policy.delay, DelayPolicy::Fixed(DEFAULT_DELAY));
    assert_eq!(policy.max_wait, DEFAULT_MAX_WAIT);
}

#[test]
fn test_policy_delay_is_capped_at_max_wait() {
    let policy =
        RetryPolicy::linear(10, Duration::from_secs(30)).with_max_wait(Duration::from_secs(45));
    assert_eq!(policy.delay_after(1), Duration::from_secs(30));
    assert_eq!(policy.delay_after(2), Duration::from_secs(45));
    assert_eq!(policy.delay_after(9), Duration::from_secs(45));
}

#[test]
fn test_zero_attempts_still_runs_once() {
    let policy = RetryPolicy::fixed(0, Duration::from_secs(1));
    assert_eq!(policy.attempts(), 1);
}

#[test]
fn test_no_retry_policy() {
    let policy = RetryPolicy::no_retry();
    assert_eq!(policy.attempts(), 1);
    assert_eq!(policy.delay_after(1), Duration::ZERO);
}
