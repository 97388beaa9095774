//! Sweeping up resources left behind by interrupted test runs.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use cloud_client::{GraphClient, ResourceGroupManager};
use tracing::{debug, info};

use crate::best_effort::{CleanupReport, CleanupTask, run_best_effort};

#[cfg(test)]
#[path = "orphans_tests.rs"]
mod tests;

/// Deletes test resources older than a cutoff.
///
/// A resource is an orphan when its name starts with the test prefix and it
/// was created before the cutoff. Resources without a creation time are
/// treated as new and left alone.
#[derive(Debug, Clone)]
pub struct OrphanSweeper {
    graph: GraphClient,
    resource_groups: ResourceGroupManager,
    prefix: String,
}

impl OrphanSweeper {
    pub fn new(graph: GraphClient, resource_groups: ResourceGroupManager) -> Self {
        Self {
            graph,
            resource_groups,
            prefix: test_utils::APP_NAME_PREFIX.to_string(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn is_orphan(
        &self,
        name: &str,
        created: Option<DateTime<Utc>>,
        cutoff: DateTime<Utc>,
    ) -> bool {
        name.starts_with(&self.prefix) && created.is_some_and(|created| created < cutoff)
    }

    /// Deletes prefixed resource groups older than `max_age`.
    pub async fn sweep_resource_groups(&self, max_age: Duration) -> Result<CleanupReport> {
        let cutoff = Utc::now() - max_age;
        info!(
            prefix = self.prefix,
            cutoff = %cutoff,
            "Searching for orphaned resource groups"
        );

        let groups = self
            .resource_groups
            .search_resource_groups(&self.prefix)
            .await
            .context("Failed to list resource groups")?;

        let mut tasks = Vec::new();
        for group in groups {
            if !self.is_orphan(&group.name, group.created_time, cutoff) {
                debug!(
                    resource_group = group.name,
                    "Resource group is too new or not ours, skipping"
                );
                continue;
            }
            let manager = &self.resource_groups;
            tasks.push(CleanupTask::new(
                format!("delete resource group {}", group.name),
                async move {
                    if !manager.delete_resource_group(&group.name).await? {
                        anyhow::bail!("resource group still exists");
                    }
                    Ok(())
                },
            ));
        }

        let report = run_best_effort(tasks).await;
        info!(
            deleted_count = report.succeeded.len(),
            failed_count = report.failed.len(),
            "Resource group sweep completed"
        );
        Ok(report)
    }

    /// Deletes prefixed AAD apps older than `max_age`.
    pub async fn sweep_aad_apps(&self, max_age: Duration) -> Result<CleanupReport> {
        let cutoff = Utc::now() - max_age;
        info!(
            prefix = self.prefix,
            cutoff = %cutoff,
            "Searching for orphaned AAD apps"
        );

        let apps = self
            .graph
            .list_aad_apps_by_name_prefix(&self.prefix)
            .await
            .context("Failed to list AAD apps")?;

        let graph = &self.graph;
        let tasks = apps
            .into_iter()
            .filter(|app| self.is_orphan(&app.display_name, app.created_date_time, cutoff))
            .map(|app| {
                CleanupTask::new(format!("delete AAD app {}", app.display_name), async move {
                    graph.delete_aad_app(&app.id).await?;
                    Ok(())
                })
            })
            .collect();

        let report = run_best_effort(tasks).await;
        info!(
            deleted_count = report.succeeded.len(),
            failed_count = report.failed.len(),
            "AAD app sweep completed"
        );
        Ok(report)
    }

    /// Runs both sweeps concurrently.
    pub async fn sweep(&self, max_age: Duration) -> Result<CleanupReport> {
        let (groups, apps) = tokio::join!(
            self.sweep_resource_groups(max_age),
            self.sweep_aad_apps(max_age)
        );
        let mut report = groups?;
        report.merge(apps?);
        Ok(report)
    }
}
