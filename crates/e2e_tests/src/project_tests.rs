use super::*;

use tempfile::TempDir;

fn project_in(dir: &TempDir) -> TestProject {
    TestProject::in_folder(dir.path(), "fxE2Eproject", TeamsAppCli::new())
}

fn write_env(project: &TestProject, content: &str) {
    let env_dir = project.project_path().join("env");
    std::fs::create_dir_all(&env_dir).unwrap();
    std::fs::write(
        env_dir.join(format!(".env.{}", project.env_name())),
        content,
    )
    .unwrap();
}

#[test]
fn test_layout_and_names() {
    let dir = TempDir::new().unwrap();
    let project = project_in(&dir).with_env("staging");

    assert_eq!(project.app_name(), "fxE2Eproject");
    assert_eq!(project.test_folder(), dir.path());
    assert_eq!(project.project_path(), dir.path().join("fxE2Eproject"));
    assert_eq!(project.env_name(), "staging");
    assert_eq!(project.resource_group_name(), "fxE2Eproject-staging-rg");
}

#[test]
fn test_outputs_read_env_file() {
    let dir = TempDir::new().unwrap();
    let project = project_in(&dir);
    write_env(&project, "TEAMS_APP_ID=app-1\nAAD_APP_OBJECT_ID=obj-1\n");

    let outputs = project.outputs().unwrap();
    assert_eq!(outputs.get("AAD_APP_OBJECT_ID").map(String::as_str), Some("obj-1"));
}

#[test]
fn test_outputs_missing_env_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let err = project_in(&dir).outputs().unwrap_err();

    assert!(format!("{err:#}").contains("fxE2Eproject"));
}

#[test]
fn test_cleanup_options_pick_up_teams_app() {
    let dir = TempDir::new().unwrap();
    let project = project_in(&dir);
    write_env(&project, "TEAMS_APP_ID=app-1\n");

    let options = project.cleanup_options(AadAppsToClean {
        aad: true,
        bot: true,
        apim: false,
    });
    assert_eq!(options.env_name, "dev");
    assert_eq!(options.teams_app_id.as_deref(), Some("app-1"));
    assert!(options.aad_apps.bot);
    assert_eq!(options.shared_apim, None);
}

#[test]
fn test_cleanup_options_carry_shared_resources() {
    let dir = TempDir::new().unwrap();
    let options = project_in(&dir)
        .with_bot_registration(SharedResource::new("fxE2Eshared-rg", "fxE2Ebot"))
        .with_shared_apim(SharedResource::new("fxE2Eshared-rg", "fxE2Eapim"))
        .cleanup_options(AadAppsToClean::default());

    assert_eq!(
        options.bot_registration,
        Some(SharedResource::new("fxE2Eshared-rg", "fxE2Ebot"))
    );
    assert_eq!(
        options.shared_apim.map(|service| service.name).as_deref(),
        Some("fxE2Eapim")
    );
}

#[test]
fn test_cleanup_options_without_outputs() {
    let dir = TempDir::new().unwrap();
    let options = project_in(&dir).cleanup_options(AadAppsToClean::default());

    assert_eq!(options.teams_app_id, None);
}
