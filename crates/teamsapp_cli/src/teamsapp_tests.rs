use super::*;

#[test]
fn test_command_line_prefixes_binary() {
    let cli = TeamsAppCli::new();
    assert_eq!(cli.command_line("account show"), "teamsapp account show");

    let npx = TeamsAppCli::new().with_npx(true);
    assert_eq!(npx.command_line("account show"), "npx teamsapp account show");

    let legacy = TeamsAppCli::new().with_flavour(CliFlavour::TeamsFx);
    assert_eq!(legacy.command_line("config get"), "teamsfx config get");
}

#[test]
fn test_new_project_args() {
    let cli = TeamsAppCli::new();

    assert_eq!(
        cli.new_project_args(
            "fxE2E1",
            Capability::Notification,
            Some(ProgrammingLanguage::TypeScript),
            "--bot-host-type-trigger http-restify"
        ),
        concat!(
            "new --interactive false --app-name fxE2E1 --capability notification",
            " --programming-language typescript --bot-host-type-trigger http-restify"
        )
    );
    assert_eq!(
        cli.new_project_args("fxE2E2", Capability::Tab, None, ""),
        "new --interactive false --app-name fxE2E2 --capability tab-non-sso"
    );
}

#[test]
fn test_legacy_cli_uses_plural_capabilities_flag() {
    let cli = TeamsAppCli::new().with_flavour(CliFlavour::TeamsFx);

    assert_eq!(
        cli.new_project_args("fxE2E3", Capability::Bot, None, ""),
        "new --interactive false --app-name fxE2E3 --capabilities bot"
    );
}

#[test]
fn test_lifecycle_args() {
    let cli = TeamsAppCli::new();

    assert_eq!(
        cli.provision_args("dev", ""),
        "provision --env dev --interactive false --verbose"
    );
    assert_eq!(
        cli.provision_args("dev", "--resource-group my-rg"),
        "provision --env dev --interactive false --verbose --resource-group my-rg"
    );
    assert_eq!(
        cli.deploy_args("staging", ""),
        "deploy --env staging --interactive false --verbose"
    );
    assert_eq!(
        cli.validate_args("dev", "--manifest-file appPackage/manifest.json"),
        "validate --env dev --interactive false --manifest-file appPackage/manifest.json"
    );
    assert_eq!(cli.package_args("dev"), "package --env dev --interactive false");
    assert_eq!(cli.publish_args("dev"), "publish --env dev --interactive false");
}

#[test]
fn test_environment_and_permission_args() {
    let cli = TeamsAppCli::new();

    assert_eq!(
        cli.env_add_args("staging", "dev"),
        "env add staging --env dev --interactive false"
    );
    assert_eq!(
        cli.permission_grant_args("dev", "collaborator@contoso.com"),
        "permission grant --env dev --email collaborator@contoso.com --interactive false"
    );
    assert_eq!(
        cli.permission_status_args("dev"),
        "permission status --env dev --list-all-collaborators --interactive false"
    );
    assert_eq!(
        cli.entra_app_update_args("dev", "--manifest-file ./aad.manifest.json"),
        "entra-app update --env dev --interactive false --manifest-file ./aad.manifest.json"
    );
    assert_eq!(
        cli.add_args("spfx-web-part", ""),
        "add spfx-web-part --interactive false"
    );
    assert_eq!(
        cli.new_sample_args("hello-world-tab"),
        "new sample hello-world-tab --interactive false"
    );
}

#[test]
fn test_capability_spellings() {
    assert_eq!(Capability::SsoTab.to_string(), "sso-launch-page");
    assert_eq!(Capability::MessageExtension.to_string(), "message-extension");
    assert_eq!(Capability::AiBot.as_cli_arg(), "custom-copilot-basic");
    assert_eq!(ProgrammingLanguage::CSharp.to_string(), "csharp");
}

#[test]
fn test_env_overrides_reach_exec_options() {
    let cli = TeamsAppCli::new().with_envs([("__TEAMSFX_INSIDER_PREVIEW", "true")]);
    let options = cli.options(Path::new("/tmp"));

    assert_eq!(
        options.env.get("__TEAMSFX_INSIDER_PREVIEW").map(String::as_str),
        Some("true")
    );
    assert_eq!(options.cwd.as_deref(), Some(Path::new("/tmp")));
}

#[cfg(unix)]
mod fake_binary {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    /// Puts an executable `teamsapp` script on a private PATH.
    fn cli_with_script(dir: &TempDir, body: &str) -> TeamsAppCli {
        let script = dir.path().join("teamsapp");
        std::fs::write(&script, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let path = format!(
            "{}:{}",
            dir.path().display(),
            std::env::var("PATH").unwrap_or_default()
        );
        TeamsAppCli::new()
            .with_envs([("PATH", path)])
            .with_retry_policy(RetryPolicy::fixed(3, Duration::from_millis(1)))
    }

    #[tokio::test]
    async fn test_run_once_passes_arguments() {
        let dir = TempDir::new().unwrap();
        let cli = cli_with_script(&dir, "echo \"args: $*\"");

        let output = cli.account_show(dir.path()).await.unwrap();

        assert_eq!(output.stdout.trim(), "args: account show");
    }

    #[tokio::test]
    async fn test_failure_exposes_cli_output() {
        let dir = TempDir::new().unwrap();
        let cli = cli_with_script(&dir, "echo 'Failed to parse permission file' >&2; exit 1");

        let err = cli
            .update_entra_app(dir.path(), "dev", "")
            .await
            .unwrap_err();

        assert!(err.mentions("Failed to parse permission file"));
    }

    #[tokio::test]
    async fn test_fallback_arguments_used_on_retry() {
        let dir = TempDir::new().unwrap();
        // Fails unless called with --force.
        let cli = cli_with_script(
            &dir,
            "case \"$*\" in *--force*) echo forced ;; *) exit 2 ;; esac",
        );

        let output = cli
            .run_with_retry("deploy --env dev", dir.path(), Some("deploy --env dev --force"))
            .await
            .unwrap();

        assert_eq!(output.stdout.trim(), "forced");
    }

    #[tokio::test]
    async fn test_create_sample_project_renames_folder() {
        let dir = TempDir::new().unwrap();
        let cli = cli_with_script(&dir, "mkdir \"$3\"");

        cli.create_sample_project(dir.path(), "hello-world-tab", "fxE2Esample")
            .await
            .unwrap();

        assert!(dir.path().join("fxE2Esample").is_dir());
        assert!(!dir.path().join("hello-world-tab").exists());
    }
}
