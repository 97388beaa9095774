use super::*;
use std::error::Error as StdError;

#[test]
fn test_timeout_message_mentions_kill() {
    let error = Error::Timeout {
        command: "teamsapp provision".to_string(),
        timeout: Duration::from_secs(100),
    };

    assert_eq!(
        error.to_string(),
        "Command `teamsapp provision` killed due to timeout 100s"
    );
    assert!(error.source().is_none());
}

#[test]
fn test_failed_error_searches_captured_output() {
    let error = Error::Failed {
        command: "teamsapp provision".to_string(),
        code: 1,
        stdout: "(×) Error: AadManifestLoadError".to_string(),
        stderr: "Unknown permission 'invalid'".to_string(),
    };

    assert!(error.mentions("AadManifestLoadError"));
    assert!(error.mentions("Unknown permission"));
    assert!(error.mentions("exit code 1"));
    assert!(!error.mentions("InvalidObjectId"));
}

#[test]
fn test_spawn_error_keeps_source() {
    let error = Error::Spawn {
        command: "teamsapp".to_string(),
        source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
    };

    assert!(error.source().is_some());
    assert!(error.mentions("no such file"));
}
