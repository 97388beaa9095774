use super::*;
use tempfile::TempDir;

fn fast_policy(attempts: u32) -> RetryPolicy {
    RetryPolicy::fixed(attempts, Duration::from_millis(10))
}

#[cfg(unix)]
#[tokio::test]
async fn test_exec_captures_stdout_and_stderr() {
    let output = exec("echo hello && echo warning 1>&2", &ExecOptions::new())
        .await
        .unwrap();

    assert!(output.success());
    assert_eq!(output.stdout.trim(), "hello");
    assert_eq!(output.stderr.trim(), "warning");
}

#[cfg(unix)]
#[tokio::test]
async fn test_exec_reports_exit_code() {
    let result = exec("echo partial; echo broken >&2; exit 3", &ExecOptions::new()).await;

    match result {
        Err(Error::Failed {
            code,
            stdout,
            stderr,
            ..
        }) => {
            assert_eq!(code, 3);
            assert_eq!(stdout.trim(), "partial");
            assert_eq!(stderr.trim(), "broken");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[cfg(unix)]
#[tokio::test]
async fn test_exec_applies_cwd_and_env() {
    let dir = TempDir::new().unwrap();
    let options = ExecOptions::new()
        .with_cwd(dir.path())
        .with_env("TEAMSFX_TEST_VALUE", "from-env");

    let output = exec("pwd && echo $TEAMSFX_TEST_VALUE", &options)
        .await
        .unwrap();

    let lines: Vec<&str> = output.stdout.lines().collect();
    let expected = dir.path().canonicalize().unwrap();
    assert_eq!(
        std::path::Path::new(lines[0]).canonicalize().unwrap(),
        expected
    );
    assert_eq!(lines[1], "from-env");
}

#[cfg(unix)]
#[tokio::test]
async fn test_exec_kills_command_on_timeout() {
    let options = ExecOptions::new().with_timeout(Duration::from_millis(200));
    let started = std::time::Instant::now();

    let result = exec("sleep 10", &options).await;

    assert!(matches!(result, Err(Error::Timeout { .. })));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[cfg(unix)]
#[tokio::test]
async fn test_exec_with_retry_succeeds_on_third_attempt() {
    let dir = TempDir::new().unwrap();
    let options = ExecOptions::new().with_cwd(dir.path());
    let command = concat!(
        "n=$(cat counter 2>/dev/null || echo 0); n=$((n+1)); echo $n > counter; ",
        "echo attempt $n; [ $n -ge 3 ]"
    );

    let output = exec_with_retry(command, &options, &fast_policy(5), None)
        .await
        .unwrap();

    assert_eq!(output.stdout.trim(), "attempt 3");
    let counter = std::fs::read_to_string(dir.path().join("counter")).unwrap();
    assert_eq!(counter.trim(), "3");
}

#[cfg(unix)]
#[tokio::test]
async fn test_exec_with_retry_returns_last_failure() {
    let dir = TempDir::new().unwrap();
    let options = ExecOptions::new().with_cwd(dir.path());
    let command = concat!(
        "n=$(cat counter 2>/dev/null || echo 0); n=$((n+1)); echo $n > counter; ",
        "echo failure $n >&2; exit 1"
    );

    let result = exec_with_retry(command, &options, &fast_policy(2), None).await;

    match result {
        Err(Error::Failed { stderr, .. }) => assert_eq!(stderr.trim(), "failure 2"),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[cfg(unix)]
#[tokio::test]
async fn test_exec_with_retry_switches_to_fallback() {
    let output = exec_with_retry(
        "echo primary; exit 1",
        &ExecOptions::new(),
        &fast_policy(3),
        Some("echo fallback"),
    )
    .await
    .unwrap();

    assert_eq!(output.stdout.trim(), "fallback");
}

#[cfg(unix)]
#[tokio::test]
async fn test_missing_working_directory_is_a_spawn_error() {
    let options = ExecOptions::new().with_cwd("/definitely/not/a/real/dir");

    let result = exec("echo hi", &options).await;

    assert!(matches!(result, Err(Error::Spawn { .. })));
}
