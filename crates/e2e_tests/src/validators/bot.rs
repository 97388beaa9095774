//! Bot registration and hosting checks.

use std::collections::HashMap;

use anyhow::Result;
use cloud_client::resource_id::{get_resource_group_name, get_site_name};
use cloud_client::{BotServiceClient, Error as CloudError, WebAppClient};
use tracing::info;

use super::output;
use crate::Verification;

#[cfg(test)]
#[path = "bot_tests.rs"]
mod tests;

/// App setting holding the bot's client secret.
pub const BOT_PASSWORD_SETTING: &str = "BOT_PASSWORD";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotExpectations {
    pub resource_group: String,
    pub site_name: String,
    /// Defaults to the site name, which is how the templates name both.
    pub bot_name: String,
    /// Client id of the bot's AAD app.
    pub bot_id: String,
}

impl BotExpectations {
    /// Reads `BOT_AZURE_APP_SERVICE_RESOURCE_ID` and `BOT_ID` from env outputs.
    pub fn from_outputs(outputs: &HashMap<String, String>) -> Result<Self> {
        let site_id = output(outputs, "BOT_AZURE_APP_SERVICE_RESOURCE_ID")?;
        let site_name = get_site_name(site_id)?;
        Ok(Self {
            resource_group: get_resource_group_name(site_id)?,
            bot_name: site_name.clone(),
            site_name,
            bot_id: output(outputs, "BOT_ID")?.to_string(),
        })
    }

    pub fn with_bot_name(mut self, bot_name: impl Into<String>) -> Self {
        self.bot_name = bot_name.into();
        self
    }
}

#[derive(Debug, Clone)]
pub struct BotValidator {
    bots: BotServiceClient,
    web_apps: WebAppClient,
}

impl BotValidator {
    pub fn new(bots: BotServiceClient, web_apps: WebAppClient) -> Self {
        Self { bots, web_apps }
    }

    /// Checks the registration points at the hosting site and the site
    /// carries the bot's credentials.
    pub async fn validate(&self, expected: &BotExpectations) -> Result<Verification> {
        info!(
            bot = expected.bot_name,
            resource_group = expected.resource_group,
            "Validating bot"
        );
        let mut verification = Verification::new();

        let site = match self
            .web_apps
            .get_site(&expected.resource_group, &expected.site_name)
            .await
        {
            Ok(site) => Some(site),
            Err(CloudError::NotFound) => {
                verification.fail(format!("Bot site {} does not exist", expected.site_name));
                None
            }
            Err(e) => return Err(e.into()),
        };

        match self
            .bots
            .get_bot(&expected.resource_group, &expected.bot_name)
            .await
        {
            Ok(bot) => {
                verification.check_eq(
                    "bot MSA app id",
                    Some(expected.bot_id.as_str()),
                    bot.properties.msa_app_id.as_deref(),
                );
                if let Some(host) = site
                    .as_ref()
                    .and_then(|s| s.properties.default_host_name.as_deref())
                {
                    let endpoint = format!("https://{host}/api/messages");
                    verification.check_eq(
                        "bot messaging endpoint",
                        Some(endpoint.as_str()),
                        bot.properties.endpoint.as_deref(),
                    );
                }
            }
            Err(CloudError::NotFound) => {
                verification.fail(format!("Bot registration {} does not exist", expected.bot_name));
            }
            Err(e) => return Err(e.into()),
        }

        if site.is_some() {
            let settings = self
                .web_apps
                .list_app_settings(&expected.resource_group, &expected.site_name)
                .await?;
            verification.check_eq(
                "BOT_ID app setting",
                Some(expected.bot_id.as_str()),
                settings.get("BOT_ID").map(String::as_str),
            );
            verification.check(
                settings.contains_key(BOT_PASSWORD_SETTING),
                format!("App setting {BOT_PASSWORD_SETTING} is missing"),
            );
        }

        Ok(verification)
    }
}
