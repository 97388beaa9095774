//! SQL servers and their firewall rules.

use tracing::{info, instrument};

use crate::models::{FirewallRule, SqlServer};
use crate::{arm_resource_path, CloudClient, Error, Result};

#[cfg(test)]
#[path = "sql_tests.rs"]
mod tests;

pub const SQL_API_VERSION: &str = "2021-11-01";

#[derive(Debug, Clone)]
pub struct SqlClient {
    client: CloudClient,
    subscription_id: String,
}

impl SqlClient {
    pub fn new(client: CloudClient, subscription_id: impl Into<String>) -> Self {
        Self {
            client,
            subscription_id: subscription_id.into(),
        }
    }

    fn path(&self, resource_group: &str, server_name: &str, child: &str) -> String {
        arm_resource_path(
            &self.subscription_id,
            resource_group,
            &format!("Microsoft.Sql/servers/{server_name}{child}"),
            SQL_API_VERSION,
        )
    }

    pub async fn get_server(&self, resource_group: &str, server_name: &str) -> Result<SqlServer> {
        self.client
            .get(&self.path(resource_group, server_name, ""))
            .await
    }

    pub async fn list_firewall_rules(
        &self,
        resource_group: &str,
        server_name: &str,
    ) -> Result<Vec<FirewallRule>> {
        self.client
            .get_paged(&self.path(resource_group, server_name, "/firewallRules"))
            .await
    }

    /// Opens the server firewall for `[start_ip, end_ip]`.
    #[instrument(skip(self))]
    pub async fn create_or_update_firewall_rule(
        &self,
        resource_group: &str,
        server_name: &str,
        rule_name: &str,
        start_ip: &str,
        end_ip: &str,
    ) -> Result<FirewallRule> {
        let body = serde_json::json!({
            "properties": {
                "startIpAddress": start_ip,
                "endIpAddress": end_ip,
            }
        });
        let rule = self
            .client
            .put_json(
                &self.path(
                    resource_group,
                    server_name,
                    &format!("/firewallRules/{rule_name}"),
                ),
                &body,
            )
            .await?;
        info!(
            server_name = server_name,
            rule_name = rule_name,
            "[Successfully] Added SQL firewall rule"
        );
        Ok(rule)
    }

    /// Deletes a firewall rule. A missing rule counts as deleted.
    pub async fn delete_firewall_rule(
        &self,
        resource_group: &str,
        server_name: &str,
        rule_name: &str,
    ) -> Result<()> {
        match self
            .client
            .delete(&self.path(
                resource_group,
                server_name,
                &format!("/firewallRules/{rule_name}"),
            ))
            .await
        {
            Ok(()) | Err(Error::NotFound) => Ok(()),
            Err(e) => Err(e),
        }
    }
}
