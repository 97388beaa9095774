//! Bot channel registrations.

use tracing::{info, instrument};

use crate::models::BotService;
use crate::{arm_resource_path, CloudClient, Error, Result};

#[cfg(test)]
#[path = "bot_service_tests.rs"]
mod tests;

pub const BOT_SERVICE_API_VERSION: &str = "2022-09-15";

#[derive(Debug, Clone)]
pub struct BotServiceClient {
    client: CloudClient,
    subscription_id: String,
}

impl BotServiceClient {
    pub fn new(client: CloudClient, subscription_id: impl Into<String>) -> Self {
        Self {
            client,
            subscription_id: subscription_id.into(),
        }
    }

    fn path(&self, resource_group: &str, bot_name: &str) -> String {
        arm_resource_path(
            &self.subscription_id,
            resource_group,
            &format!("Microsoft.BotService/botServices/{bot_name}"),
            BOT_SERVICE_API_VERSION,
        )
    }

    pub async fn get_bot(&self, resource_group: &str, bot_name: &str) -> Result<BotService> {
        self.client.get(&self.path(resource_group, bot_name)).await
    }

    /// Deletes a registration. A missing registration counts as deleted.
    #[instrument(skip(self))]
    pub async fn delete_bot(&self, resource_group: &str, bot_name: &str) -> Result<()> {
        match self.client.delete(&self.path(resource_group, bot_name)).await {
            Ok(()) | Err(Error::NotFound) => {
                info!(bot_name = bot_name, "[Successfully] Deleted bot registration");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
