//! Offline lifecycle tests against a scripted stand-in for the `teamsapp` CLI.
#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::time::Duration;

use backoff_executor::RetryPolicy;
use e2e_tests::{init_test_logging, TestProject};
use teamsapp_cli::{Capability, ProgrammingLanguage, TeamsAppCli};
use tempfile::TempDir;
use test_utils::project_files::write_malformed_permissions;

/// Mimics the parts of the CLI the lifecycle touches: `new` scaffolds a
/// folder, `provision` appends outputs, `package` writes a zip.
const FAKE_TEAMSAPP: &str = r#"#!/bin/sh
if [ -f permissions.json ] && [ "$(tail -c 1 permissions.json)" != "]" ]; then
  echo "Failed to parse permission file" >&2
  exit 1
fi
case "$1" in
  new)
    mkdir -p "$5/env"
    echo "version: v1.5" > "$5/teamsapp.yml"
    echo "TEAMSFX_ENV=dev" > "$5/env/.env.dev"
    ;;
  provision)
    printf 'BOT_ID=bot-client\nTEAMS_APP_ID=teams-app\n' >> "env/.env.$3"
    printf 'AAD_APP_OBJECT_ID=aad-object\n' >> "env/.env.$3"
    echo "SECRET_BOT_PASSWORD=crypto_value" > "env/.env.$3.user"
    ;;
  package)
    mkdir -p appPackage/build
    echo zip > "appPackage/build/appPackage.$3.zip"
    ;;
  deploy|validate|publish)
    echo "$1 succeeded"
    ;;
  *)
    echo "unknown command $1" >&2
    exit 2
    ;;
esac
"#;

fn fake_cli(bin_dir: &TempDir) -> TeamsAppCli {
    let script = bin_dir.path().join("teamsapp");
    std::fs::write(&script, FAKE_TEAMSAPP).unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

    let path = format!(
        "{}:{}",
        bin_dir.path().display(),
        std::env::var("PATH").unwrap_or_default()
    );
    TeamsAppCli::new()
        .with_envs([("PATH", path)])
        .with_retry_policy(RetryPolicy::fixed(2, Duration::from_millis(1)))
}

#[tokio::test]
async fn test_bot_project_lifecycle() {
    init_test_logging();
    let bin_dir = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    let project = TestProject::in_folder(
        workspace.path().join("test-folder"),
        "fxE2Elifecycle",
        fake_cli(&bin_dir),
    );

    project
        .create(Capability::Bot, Some(ProgrammingLanguage::TypeScript), "")
        .await
        .unwrap();
    assert!(project.project_path().join("teamsapp.yml").exists());

    project.provision("").await.unwrap();
    let outputs = project.outputs().unwrap();
    assert_eq!(outputs.get("BOT_ID").map(String::as_str), Some("bot-client"));
    assert_eq!(
        outputs.get("SECRET_BOT_PASSWORD").map(String::as_str),
        Some("crypto_value")
    );

    let deployed = project.deploy("").await.unwrap();
    assert!(deployed.stdout.contains("deploy succeeded"));

    project.validate("").await.unwrap();
    project.package().await.unwrap();
    assert!(project
        .project_path()
        .join("appPackage/build/appPackage.dev.zip")
        .exists());

    project.publish().await.unwrap();

    let options = project.cleanup_options(Default::default());
    assert_eq!(options.teams_app_id.as_deref(), Some("teams-app"));
}

#[tokio::test]
async fn test_malformed_permissions_fail_provision() {
    init_test_logging();
    let bin_dir = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    let project = TestProject::in_folder(workspace.path(), "fxE2Enegative", fake_cli(&bin_dir));

    project.create(Capability::Tab, None, "").await.unwrap();
    write_malformed_permissions(project.project_path()).unwrap();

    let cli = project.cli();
    let err = cli
        .run_once(&cli.provision_args("dev", ""), project.project_path())
        .await
        .unwrap_err();

    assert!(err.mentions("Failed to parse permission file"), "{err}");
    assert!(project.outputs().unwrap().get("BOT_ID").is_none());
}
