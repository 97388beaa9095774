//! Tearing down what one test created: AAD apps, its resource group, the
//! local project folder, catalog submissions and leftovers in shared
//! Azure resources.

use std::future::Future;
use std::path::Path;

use anyhow::{Context, Result, bail};
use cloud_client::{
    ApimClient, BotServiceClient, DevPortalClient, GraphClient, ResourceGroupManager,
};
use test_utils::dotenv;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::best_effort::{CleanupReport, CleanupTask, run_best_effort};

#[cfg(test)]
#[path = "project_tests.rs"]
mod tests;

/// Env file key holding the object id of the app's own AAD registration.
pub const AAD_OBJECT_ID_KEY: &str = "AAD_APP_OBJECT_ID";

/// Env file key holding the client id of the bot's AAD registration.
pub const BOT_ID_KEY: &str = "BOT_ID";

/// Env file key holding the object id of the APIM client AAD registration.
pub const APIM_CLIENT_OBJECT_ID_KEY: &str = "APIM_CLIENT_AAD_OBJECT_ID";

/// Which AAD registrations a project owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AadAppsToClean {
    pub aad: bool,
    pub bot: bool,
    /// The client registration API Management uses to call the app.
    pub apim: bool,
}

impl Default for AadAppsToClean {
    fn default() -> Self {
        Self {
            aad: true,
            bot: false,
            apim: false,
        }
    }
}

/// Outcome of [`clean_up_resource_group`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceGroupCleanup {
    /// The group is gone, or never existed.
    Deleted,
    /// The group was still visible once the poll budget ran out.
    StillExists,
    /// No app name was given, so there is no group to derive.
    Skipped,
}

/// Clients needed to tear down a project.
#[derive(Debug, Clone)]
pub struct CleanupContext {
    pub graph: GraphClient,
    pub resource_groups: ResourceGroupManager,
    pub dev_portal: DevPortalClient,
    pub bot_services: BotServiceClient,
    pub apim: ApimClient,
}

/// A named resource living outside the project's own resource group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedResource {
    pub resource_group: String,
    pub name: String,
}

impl SharedResource {
    pub fn new(resource_group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource_group: resource_group.into(),
            name: name.into(),
        }
    }
}

/// What [`clean_up`] should remove besides the resource group and local folder.
#[derive(Debug, Clone)]
pub struct CleanupOptions {
    pub env_name: String,
    pub aad_apps: AadAppsToClean,
    /// Teams app whose catalog submission should be withdrawn.
    pub teams_app_id: Option<String>,
    /// Bot registration created outside the project's resource group.
    pub bot_registration: Option<SharedResource>,
    /// Shared API Management service whose subscriptions named after the
    /// app should be removed.
    pub shared_apim: Option<SharedResource>,
}

impl Default for CleanupOptions {
    fn default() -> Self {
        Self {
            env_name: "dev".to_string(),
            aad_apps: AadAppsToClean::default(),
            teams_app_id: None,
            bot_registration: None,
            shared_apim: None,
        }
    }
}

/// Deletes the AAD apps recorded in the project's `.env.<env>` file.
///
/// The app registration is found through `AAD_APP_OBJECT_ID`; the bot
/// registration is found by resolving `BOT_ID` to its object id and the
/// APIM client registration through `APIM_CLIENT_AAD_OBJECT_ID`. The
/// deletions run concurrently. A project without an env file has nothing
/// to clean and yields an empty report.
pub async fn clean_up_aad_apps(
    graph: &GraphClient,
    project: &Path,
    env_name: &str,
    apps: AadAppsToClean,
) -> Result<CleanupReport> {
    let env_file = dotenv::env_file_path(project, env_name);
    if !env_file.exists() {
        debug!(path = %env_file.display(), "No env file, skipping AAD cleanup");
        return Ok(CleanupReport::default());
    }
    let outputs = dotenv::read_dot_env_file(&env_file)?;

    let mut tasks = Vec::new();
    if apps.aad {
        let object_id = outputs.get(AAD_OBJECT_ID_KEY).cloned();
        tasks.push(CleanupTask::new("delete AAD app", async move {
            let object_id = object_id
                .filter(|id| !id.is_empty())
                .with_context(|| format!("{AAD_OBJECT_ID_KEY} not found in env file"))?;
            graph.delete_aad_app(&object_id).await?;
            Ok(())
        }));
    }
    if apps.bot {
        let bot_id = outputs.get(BOT_ID_KEY).cloned();
        tasks.push(CleanupTask::new("delete bot AAD app", async move {
            let bot_id = bot_id
                .filter(|id| !id.is_empty())
                .with_context(|| format!("{BOT_ID_KEY} not found in env file"))?;
            let object_id = graph
                .find_object_id_by_app_id(&bot_id)
                .await?
                .with_context(|| format!("No AAD app with client id {bot_id}"))?;
            graph.delete_aad_app(&object_id).await?;
            Ok(())
        }));
    }
    if apps.apim {
        let object_id = outputs.get(APIM_CLIENT_OBJECT_ID_KEY).cloned();
        tasks.push(CleanupTask::new("delete APIM client AAD app", async move {
            let object_id = object_id
                .filter(|id| !id.is_empty())
                .with_context(|| format!("{APIM_CLIENT_OBJECT_ID_KEY} not found in env file"))?;
            graph.delete_aad_app(&object_id).await?;
            Ok(())
        }));
    }

    Ok(run_best_effort(tasks).await)
}

/// Deletes `name` and waits for it to disappear.
///
/// Returns `Ok(true)` when the group is gone (or never existed) and
/// `Ok(false)` when it was still visible once the poll budget ran out.
pub async fn delete_resource_group_by_name(
    manager: &ResourceGroupManager,
    name: &str,
) -> Result<bool> {
    if name.is_empty() {
        return Ok(true);
    }

    let deleted = manager
        .delete_resource_group(name)
        .await
        .with_context(|| format!("Failed to delete resource group {name}"))?;
    if deleted {
        info!(
            resource_group = name,
            "[Successfully] clean up the Azure resource group"
        );
    } else {
        error!(
            resource_group = name,
            "[Failed] clean up the Azure resource group"
        );
    }
    Ok(deleted)
}

/// Deletes the `{app}-{env}-rg` group the CLI provisioned.
pub async fn clean_up_resource_group(
    manager: &ResourceGroupManager,
    app_name: &str,
    env_name: &str,
) -> Result<ResourceGroupCleanup> {
    if app_name.is_empty() {
        return Ok(ResourceGroupCleanup::Skipped);
    }
    let name = test_utils::resource_group_name(app_name, env_name);
    if delete_resource_group_by_name(manager, &name).await? {
        Ok(ResourceGroupCleanup::Deleted)
    } else {
        Ok(ResourceGroupCleanup::StillExists)
    }
}

/// Deletes the subscriptions of a shared APIM service whose name or
/// display name starts with `app_name`, returning how many were removed.
///
/// Every matching subscription is attempted; the first failure is reported
/// after the rest have run.
pub async fn clean_up_apim_subscriptions(
    apim: &ApimClient,
    service: &SharedResource,
    app_name: &str,
) -> Result<usize> {
    if app_name.is_empty() {
        return Ok(0);
    }
    let subscriptions = apim
        .list_subscriptions(&service.resource_group, &service.name)
        .await
        .with_context(|| format!("Failed to list subscriptions of {}", service.name))?;

    let mut removed = 0;
    let mut first_error = None;
    for subscription in subscriptions.iter().filter(|s| {
        s.name.starts_with(app_name)
            || s.properties
                .display_name
                .as_deref()
                .is_some_and(|name| name.starts_with(app_name))
    }) {
        match apim
            .delete_subscription(&service.resource_group, &service.name, &subscription.name)
            .await
        {
            Ok(()) => removed += 1,
            Err(e) => {
                warn!(
                    subscription = subscription.name,
                    error = %e,
                    "[Failed] delete APIM subscription"
                );
                if first_error.is_none() {
                    let message = format!("Failed to delete subscription {}", subscription.name);
                    first_error = Some(anyhow::Error::new(e).context(message));
                }
            }
        }
    }

    if let Some(e) = first_error {
        return Err(e);
    }
    info!(
        service = service.name,
        removed = removed,
        "[Successfully] clean up APIM subscriptions"
    );
    Ok(removed)
}

/// Removes the project folder once `after` has completed.
///
/// A folder that is already gone counts as removed.
pub async fn clean_up_local_project<F>(project: &Path, after: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    after.await;

    match tokio::fs::remove_dir_all(project).await {
        Ok(()) => {
            info!(path = %project.display(), "[Successfully] clean up the local folder");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %project.display(), "Local folder already removed");
            Ok(())
        }
        Err(e) => {
            warn!(path = %project.display(), error = %e, "[Failed] clean up the local folder");
            Err(e).with_context(|| format!("Failed to remove {}", project.display()))
        }
    }
}

/// Tears down everything a test created.
///
/// AAD apps, the resource group, the local folder, the staged catalog
/// submission and any shared bot registration or APIM subscriptions are
/// cleaned concurrently and independently. The local folder
/// is removed only after the AAD cleanup has read the env file inside it.
pub async fn clean_up(
    ctx: &CleanupContext,
    app_name: &str,
    project: &Path,
    options: &CleanupOptions,
) -> CleanupReport {
    let env_name = options.env_name.as_str();
    let (aad_done, aad_finished) = oneshot::channel::<()>();

    let mut tasks = vec![
        CleanupTask::new("clean up AAD apps", async move {
            let result =
                clean_up_aad_apps(&ctx.graph, project, env_name, options.aad_apps).await;
            let _ = aad_done.send(());
            let report = result?;
            if !report.is_clean() {
                let failures: Vec<String> = report
                    .failed
                    .iter()
                    .map(|(task, error)| format!("{task}: {error}"))
                    .collect();
                bail!("{}", failures.join("; "));
            }
            Ok(())
        }),
        CleanupTask::new(
            format!("clean up resource group of {app_name}"),
            async move {
                match clean_up_resource_group(&ctx.resource_groups, app_name, env_name).await? {
                    ResourceGroupCleanup::Deleted => Ok(()),
                    ResourceGroupCleanup::Skipped => {
                        debug!("No app name, skipping resource group cleanup");
                        Ok(())
                    }
                    ResourceGroupCleanup::StillExists => bail!("resource group still exists"),
                }
            },
        ),
        CleanupTask::new(
            "clean up local folder",
            clean_up_local_project(project, async move {
                // A dropped sender means the AAD task is over too.
                let _ = aad_finished.await;
            }),
        ),
    ];

    if let Some(teams_app_id) = options.teams_app_id.as_deref() {
        tasks.push(CleanupTask::new("cancel staged app", async move {
            ctx.dev_portal.cancel_staged_app(teams_app_id).await?;
            Ok(())
        }));
    }
    if let Some(bot) = options.bot_registration.as_ref() {
        tasks.push(CleanupTask::new("delete bot registration", async move {
            ctx.bot_services
                .delete_bot(&bot.resource_group, &bot.name)
                .await?;
            Ok(())
        }));
    }
    if let Some(service) = options.shared_apim.as_ref() {
        tasks.push(CleanupTask::new("clean up APIM subscriptions", async move {
            clean_up_apim_subscriptions(&ctx.apim, service, app_name).await?;
            Ok(())
        }));
    }

    run_best_effort(tasks).await
}
